//! HTML fragment parsing and serialization.

use crate::document::{ElementData, NodeId, NodeKind, Tree};
use crate::error::{DomError, Result};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

pub(crate) fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Parses `source` and inserts the resulting nodes into `parent` starting at
/// `index` (`None` appends). Returns the inserted top-level nodes.
pub(crate) fn parse_at(
    tree: &mut Tree,
    parent: NodeId,
    index: Option<usize>,
    source: &str,
) -> Result<Vec<NodeId>> {
    let holder = tree.create(NodeKind::Element(ElementData::new("template")));
    if let Err(err) = parse_children(tree, holder, source) {
        tree.free(holder);
        return Err(err);
    }
    let nodes = std::mem::take(&mut tree.node_mut(holder)?.children);
    tree.free(holder);

    let mut at = index;
    for &node in &nodes {
        tree.node_mut(node)?.parent = None;
        tree.insert_child(parent, node, at)?;
        at = at.map(|i| i + 1);
    }
    Ok(nodes.into_vec())
}

pub(crate) fn parse_into(tree: &mut Tree, parent: NodeId, source: &str) -> Result<Vec<NodeId>> {
    parse_at(tree, parent, None, source)
}

fn append_raw(tree: &mut Tree, parent: NodeId, child: NodeId) -> Result<()> {
    tree.node_mut(parent)?.children.push(child);
    tree.node_mut(child)?.parent = Some(parent);
    Ok(())
}

fn parse_children(tree: &mut Tree, holder: NodeId, source: &str) -> Result<()> {
    let bytes = source.as_bytes();
    let mut stack = vec![holder];
    let mut i = 0usize;

    while i < bytes.len() {
        let top = *stack.last().unwrap_or(&holder);

        if source[i..].starts_with("<!--") {
            let end = source[i + 4..]
                .find("-->")
                .ok_or_else(|| DomError::Html("unclosed comment".into()))?;
            i += 4 + end + 3;
            continue;
        }

        if source[i..].starts_with("</") {
            let end = source[i..]
                .find('>')
                .ok_or_else(|| DomError::Html("unterminated end tag".into()))?;
            let name = source[i + 2..i + end].trim().to_ascii_lowercase();
            i += end + 1;
            if let Some(pos) = stack
                .iter()
                .rposition(|&n| tree.element(n).is_ok_and(|el| el.tag == name))
            {
                if pos > 0 {
                    stack.truncate(pos);
                }
            }
            continue;
        }

        if source[i..].starts_with("<!") {
            let end = source[i..]
                .find('>')
                .ok_or_else(|| DomError::Html("unterminated declaration".into()))?;
            i += end + 1;
            continue;
        }

        if bytes[i] == b'<' && bytes.get(i + 1).is_some_and(u8::is_ascii_alphabetic) {
            let (data, self_closing, next) = parse_start_tag(source, i)?;
            i = next;
            let tag = data.tag.clone();
            let node = tree.create(NodeKind::Element(data));
            append_raw(tree, top, node)?;

            if RAW_TEXT_ELEMENTS.contains(&tag.as_str()) && !self_closing {
                let close = find_end_tag(source, i, &tag)
                    .ok_or_else(|| DomError::Html(format!("unclosed <{tag}>")))?;
                if close > i {
                    let text = tree.create(NodeKind::Text(source[i..close].to_string()));
                    append_raw(tree, node, text)?;
                }
                let end = source[close..]
                    .find('>')
                    .ok_or_else(|| DomError::Html("unterminated end tag".into()))?;
                i = close + end + 1;
                continue;
            }

            if !self_closing && !is_void(&tag) {
                stack.push(node);
            }
            continue;
        }

        let search_from = if bytes[i] == b'<' { i + 1 } else { i };
        let next = source[search_from..]
            .find('<')
            .map(|off| search_from + off)
            .unwrap_or(bytes.len());
        let text = decode_entities(&source[i..next]);
        if !text.is_empty() {
            let node = tree.create(NodeKind::Text(text));
            append_raw(tree, top, node)?;
        }
        i = next;
    }
    Ok(())
}

fn parse_start_tag(source: &str, start: usize) -> Result<(ElementData, bool, usize)> {
    let bytes = source.as_bytes();
    let unterminated = || DomError::Html("unterminated start tag".into());
    let mut i = start + 1;
    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' && bytes[i] != b'/'
    {
        i += 1;
    }
    let mut data = ElementData::new(&source[start + 1..i]);

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match bytes.get(i) {
            None => return Err(unterminated()),
            Some(b'>') => return Ok((data, false, i + 1)),
            Some(b'/') => {
                if bytes.get(i + 1) == Some(&b'>') {
                    return Ok((data, true, i + 2));
                }
                i += 1;
                continue;
            }
            Some(_) => {}
        }

        let name_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
        {
            i += 1;
        }
        let name = source[name_start..i].to_ascii_lowercase();
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }

        let mut value = String::new();
        if bytes.get(i) == Some(&b'=') {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            match bytes.get(i) {
                Some(&quote @ (b'"' | b'\'')) => {
                    let close = source[i + 1..]
                        .find(quote as char)
                        .ok_or_else(unterminated)?;
                    value = decode_entities(&source[i + 1..i + 1 + close]);
                    i += close + 2;
                }
                Some(_) => {
                    let value_start = i;
                    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                        i += 1;
                    }
                    value = decode_entities(&source[value_start..i]);
                }
                None => return Err(unterminated()),
            }
        }
        if !name.is_empty() && data.attr(&name).is_none() {
            data.set_attr(&name, &value);
        }
    }
}

fn find_end_tag(source: &str, from: usize, tag: &str) -> Option<usize> {
    let needle = format!("</{tag}");
    source[from..]
        .to_ascii_lowercase()
        .find(&needle)
        .map(|off| from + off)
}

pub(crate) fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest[1..].find(';').filter(|&end| end <= 10).and_then(|end| {
            let entity = &rest[1..1 + end];
            decode_entity(entity).map(|ch| (ch, end + 2))
        });
        match decoded {
            Some((ch, len)) => {
                out.push(ch);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    if let Some(num) = entity.strip_prefix('#') {
        let code = match num.strip_prefix(|c| c == 'x' || c == 'X') {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code);
    }
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => None,
    }
}

pub fn escape_text(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '&' => output.push_str("&amp;"),
            _ => output.push(c),
        }
    }
    output
}

pub fn escape_attr(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '&' => output.push_str("&amp;"),
            '"' => output.push_str("&quot;"),
            _ => output.push(c),
        }
    }
    output
}

enum RenderOp {
    Visit(NodeId),
    Close(String),
}

fn render(tree: &Tree, start: Vec<NodeId>) -> String {
    let mut out = String::new();
    let mut stack: Vec<RenderOp> = start.into_iter().rev().map(RenderOp::Visit).collect();

    while let Some(op) = stack.pop() {
        let id = match op {
            RenderOp::Close(tag) => {
                out.push_str("</");
                out.push_str(&tag);
                out.push('>');
                continue;
            }
            RenderOp::Visit(id) => id,
        };
        let Some(node) = tree.nodes.get(id) else {
            continue;
        };
        match &node.kind {
            NodeKind::Element(el) => {
                out.push('<');
                out.push_str(&el.tag);
                for attr in &el.attrs {
                    out.push(' ');
                    out.push_str(&attr.name);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(&attr.value));
                    out.push('"');
                }
                out.push('>');
                if is_void(&el.tag) {
                    continue;
                }
                stack.push(RenderOp::Close(el.tag.clone()));
                if RAW_TEXT_ELEMENTS.contains(&el.tag.as_str()) {
                    out.push_str(&tree.text_content(id));
                    continue;
                }
                for &child in node.children.iter().rev() {
                    stack.push(RenderOp::Visit(child));
                }
            }
            NodeKind::Text(text) => out.push_str(&escape_text(text)),
            NodeKind::Root => {
                for &child in node.children.iter().rev() {
                    stack.push(RenderOp::Visit(child));
                }
            }
        }
    }
    out
}

pub(crate) fn serialize_children(tree: &Tree, id: NodeId) -> String {
    let children = tree
        .nodes
        .get(id)
        .map(|n| n.children.to_vec())
        .unwrap_or_default();
    render(tree, children)
}

pub(crate) fn serialize_node(tree: &Tree, id: NodeId) -> String {
    render(tree, vec![id])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_named_and_numeric_entities() {
        assert_eq!(decode_entities("a &lt;b&gt; &amp; &#65;&#x42;"), "a <b> & AB");
        assert_eq!(decode_entities("AT&T; & co"), "AT&T; & co");
    }

    #[test]
    fn escapes_attribute_quotes() {
        assert_eq!(escape_attr("say \"hi\" & <go>"), "say &quot;hi&quot; &amp; &lt;go&gt;");
    }
}
