//! Inline `style` attribute parsing.

pub(crate) fn parse_declarations(style: Option<&str>) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let Some(style) = style else {
        return out;
    };

    let bytes = style.as_bytes();
    let mut start = 0usize;
    let mut paren_depth = 0isize;
    let mut quote: Option<u8> = None;

    for (i, &ch) in bytes.iter().enumerate() {
        match (quote, ch) {
            (Some(q), _) if ch == q => quote = None,
            (Some(_), _) => {}
            (None, b'\'') | (None, b'"') => quote = Some(ch),
            (None, b'(') => paren_depth += 1,
            (None, b')') => paren_depth = (paren_depth - 1).max(0),
            (None, b';') if paren_depth == 0 => {
                push_declaration(&style[start..i], &mut out);
                start = i + 1;
            }
            _ => {}
        }
    }
    push_declaration(&style[start..], &mut out);
    out
}

fn push_declaration(raw: &str, out: &mut Vec<(String, String)>) {
    let Some((name, value)) = raw.split_once(':') else {
        return;
    };
    let name = name.trim().to_ascii_lowercase();
    let value = value.trim();
    if name.is_empty() || value.is_empty() {
        return;
    }
    match out.iter_mut().find(|(n, _)| *n == name) {
        Some(existing) => existing.1 = value.to_string(),
        None => out.push((name, value.to_string())),
    }
}

pub(crate) fn serialize(decls: &[(String, String)]) -> String {
    decls
        .iter()
        .map(|(name, value)| format!("{name}: {value};"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `backgroundColor` -> `background-color`; already dashed names pass through.
pub(crate) fn property_name(prop: &str) -> String {
    let mut out = String::with_capacity(prop.len() + 4);
    for ch in prop.trim().chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
