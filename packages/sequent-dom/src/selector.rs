//! A small CSS selector matcher covering the selectors chains actually use:
//! compound steps, attribute conditions, structural pseudo-classes and the four
//! combinators.

use crate::document::{NodeId, NodeKind, Tree};
use crate::error::{DomError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrCondition {
    Exists,
    Eq(String),
    StartsWith(String),
    EndsWith(String),
    Contains(String),
    Includes(String),
    DashMatch(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pseudo {
    FirstChild,
    LastChild,
    OnlyChild,
    Empty,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, AttrCondition)>,
    pseudos: Vec<Pseudo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
    AdjacentSibling,
    GeneralSibling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Part {
    compound: Compound,
    // Relation to the part on the left.
    combinator: Option<Combinator>,
}

/// A parsed selector list (`a, b > c`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList(Vec<Vec<Part>>);

fn invalid(selector: &str, reason: &str) -> DomError {
    DomError::Selector {
        selector: selector.to_string(),
        reason: reason.to_string(),
    }
}

pub fn parse(selector: &str) -> Result<SelectorList> {
    let trimmed = selector.trim();
    if trimmed.is_empty() {
        return Err(invalid(selector, "empty selector"));
    }
    let groups = split_outside_brackets(trimmed, ',')
        .into_iter()
        .map(|group| parse_chain(selector, group.trim()))
        .collect::<Result<Vec<_>>>()?;
    Ok(SelectorList(groups))
}

fn split_outside_brackets(input: &str, sep: char) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut quote = None;
    let mut start = 0;
    for (i, ch) in input.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '[' | '(') => depth += 1,
            (None, ']' | ')') => depth = depth.saturating_sub(1),
            (None, c) if c == sep && depth == 0 => {
                out.push(&input[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    out.push(&input[start..]);
    out
}

fn parse_chain(selector: &str, group: &str) -> Result<Vec<Part>> {
    if group.is_empty() {
        return Err(invalid(selector, "empty selector group"));
    }

    let mut parts = Vec::new();
    let mut pending: Option<Combinator> = None;
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote = None;

    let flush = |current: &mut String,
                 pending: &mut Option<Combinator>,
                 parts: &mut Vec<Part>|
     -> Result<()> {
        if current.is_empty() {
            return Ok(());
        }
        let compound = parse_compound(selector, current)?;
        let combinator = if parts.is_empty() {
            if pending.is_some() {
                return Err(invalid(selector, "selector starts with a combinator"));
            }
            None
        } else {
            Some(pending.take().unwrap_or(Combinator::Descendant))
        };
        parts.push(Part {
            compound,
            combinator,
        });
        current.clear();
        Ok(())
    };

    for ch in group.chars() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            current.push(ch);
            continue;
        }
        match ch {
            '"' | '\'' if depth > 0 => {
                quote = Some(ch);
                current.push(ch);
            }
            '[' | '(' => {
                depth += 1;
                current.push(ch);
            }
            ']' | ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            c if depth == 0 && (c == '>' || c == '+' || c == '~') => {
                flush(&mut current, &mut pending, &mut parts)?;
                if pending.is_some() || parts.is_empty() {
                    return Err(invalid(selector, "misplaced combinator"));
                }
                pending = Some(match c {
                    '>' => Combinator::Child,
                    '+' => Combinator::AdjacentSibling,
                    _ => Combinator::GeneralSibling,
                });
            }
            c if depth == 0 && c.is_whitespace() => {
                flush(&mut current, &mut pending, &mut parts)?;
            }
            c => current.push(c),
        }
    }
    flush(&mut current, &mut pending, &mut parts)?;

    if parts.is_empty() || pending.is_some() {
        return Err(invalid(selector, "dangling combinator"));
    }
    Ok(parts)
}

fn parse_compound(selector: &str, token: &str) -> Result<Compound> {
    let mut compound = Compound::default();
    let bytes = token.as_bytes();
    let mut i = 0;

    let ident_end = |from: usize| {
        let mut end = from;
        while end < bytes.len() && !matches!(bytes[end], b'#' | b'.' | b'[' | b':') {
            end += 1;
        }
        end
    };

    if bytes.first() == Some(&b'*') {
        i = 1;
    } else if bytes.first().is_some_and(|b| b.is_ascii_alphabetic()) {
        let end = ident_end(0);
        compound.tag = Some(token[..end].to_ascii_lowercase());
        i = end;
    }

    while i < bytes.len() {
        match bytes[i] {
            b'#' => {
                let end = ident_end(i + 1);
                if end == i + 1 {
                    return Err(invalid(selector, "empty id"));
                }
                compound.id = Some(token[i + 1..end].to_string());
                i = end;
            }
            b'.' => {
                let end = ident_end(i + 1);
                if end == i + 1 {
                    return Err(invalid(selector, "empty class"));
                }
                compound.classes.push(token[i + 1..end].to_string());
                i = end;
            }
            b'[' => {
                let close = token[i..]
                    .find(']')
                    .map(|off| i + off)
                    .ok_or_else(|| invalid(selector, "unclosed attribute selector"))?;
                compound
                    .attrs
                    .push(parse_attr(selector, &token[i + 1..close])?);
                i = close + 1;
            }
            b':' => {
                let end = ident_end(i + 1);
                let pseudo = match &token[i + 1..end] {
                    "first-child" => Pseudo::FirstChild,
                    "last-child" => Pseudo::LastChild,
                    "only-child" => Pseudo::OnlyChild,
                    "empty" => Pseudo::Empty,
                    _ => return Err(invalid(selector, "unsupported pseudo-class")),
                };
                compound.pseudos.push(pseudo);
                i = end;
            }
            _ => return Err(invalid(selector, "unexpected character")),
        }
    }
    Ok(compound)
}

fn parse_attr(selector: &str, body: &str) -> Result<(String, AttrCondition)> {
    const OPERATORS: &[&str] = &["^=", "$=", "*=", "~=", "|=", "="];
    let Some((op, at)) = OPERATORS
        .iter()
        .filter_map(|op| body.find(op).map(|at| (*op, at)))
        .min_by_key(|&(_, at)| at)
    else {
        let name = body.trim();
        if name.is_empty() {
            return Err(invalid(selector, "empty attribute name"));
        }
        return Ok((name.to_ascii_lowercase(), AttrCondition::Exists));
    };

    let name = body[..at].trim().to_ascii_lowercase();
    if name.is_empty() {
        return Err(invalid(selector, "empty attribute name"));
    }
    let raw = body[at + op.len()..].trim();
    let value = raw
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| raw.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(raw)
        .to_string();
    let condition = match op {
        "^=" => AttrCondition::StartsWith(value),
        "$=" => AttrCondition::EndsWith(value),
        "*=" => AttrCondition::Contains(value),
        "~=" => AttrCondition::Includes(value),
        "|=" => AttrCondition::DashMatch(value),
        _ => AttrCondition::Eq(value),
    };
    Ok((name, condition))
}

/// `true` if the element `id` matches any group of `list`.
pub(crate) fn matches(tree: &Tree, id: NodeId, list: &SelectorList) -> bool {
    list.0.iter().any(|parts| matches_chain(tree, id, parts))
}

fn matches_chain(tree: &Tree, id: NodeId, parts: &[Part]) -> bool {
    let Some((last, rest)) = parts.split_last() else {
        return false;
    };
    if !matches_compound(tree, id, &last.compound) {
        return false;
    }
    match last.combinator {
        None => rest.is_empty(),
        Some(Combinator::Child) => tree
            .element_parent(id)
            .is_some_and(|parent| matches_chain(tree, parent, rest)),
        Some(Combinator::Descendant) => {
            let mut current = tree.element_parent(id);
            while let Some(ancestor) = current {
                if matches_chain(tree, ancestor, rest) {
                    return true;
                }
                current = tree.element_parent(ancestor);
            }
            false
        }
        Some(Combinator::AdjacentSibling) => tree
            .adjacent_element(id, false)
            .is_some_and(|prev| matches_chain(tree, prev, rest)),
        Some(Combinator::GeneralSibling) => {
            let mut current = tree.adjacent_element(id, false);
            while let Some(prev) = current {
                if matches_chain(tree, prev, rest) {
                    return true;
                }
                current = tree.adjacent_element(prev, false);
            }
            false
        }
    }
}

fn matches_compound(tree: &Tree, id: NodeId, compound: &Compound) -> bool {
    let Ok(el) = tree.element(id) else {
        return false;
    };
    if compound.tag.as_ref().is_some_and(|tag| *tag != el.tag) {
        return false;
    }
    if compound
        .id
        .as_ref()
        .is_some_and(|want| el.attr("id") != Some(want.as_str()))
    {
        return false;
    }
    let classes: Vec<&str> = el.attr("class").unwrap_or("").split_whitespace().collect();
    if !compound
        .classes
        .iter()
        .all(|class| classes.contains(&class.as_str()))
    {
        return false;
    }
    let attrs_ok = compound.attrs.iter().all(|(name, condition)| {
        let Some(value) = el.attr(name) else {
            return false;
        };
        match condition {
            AttrCondition::Exists => true,
            AttrCondition::Eq(want) => value == want,
            AttrCondition::StartsWith(want) => !want.is_empty() && value.starts_with(want.as_str()),
            AttrCondition::EndsWith(want) => !want.is_empty() && value.ends_with(want.as_str()),
            AttrCondition::Contains(want) => !want.is_empty() && value.contains(want.as_str()),
            AttrCondition::Includes(want) => value.split_whitespace().any(|v| v == want),
            AttrCondition::DashMatch(want) => {
                value == want || value.starts_with(&format!("{want}-"))
            }
        }
    });
    if !attrs_ok {
        return false;
    }
    compound.pseudos.iter().all(|pseudo| match pseudo {
        Pseudo::FirstChild => tree.adjacent_element(id, false).is_none(),
        Pseudo::LastChild => tree.adjacent_element(id, true).is_none(),
        Pseudo::OnlyChild => {
            tree.adjacent_element(id, false).is_none() && tree.adjacent_element(id, true).is_none()
        }
        Pseudo::Empty => tree.nodes.get(id).is_some_and(|node| {
            node.children.iter().all(|&c| {
                matches!(tree.nodes.get(c).map(|n| &n.kind), Some(NodeKind::Text(t)) if t.is_empty())
            })
        }),
    })
}
