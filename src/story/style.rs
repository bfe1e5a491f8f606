/// Split an inline `style` attribute into lower-cased property/value pairs.
pub fn parse_inline_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            let prop = prop.trim().to_ascii_lowercase();
            let value = value.trim();
            if prop.is_empty() || value.is_empty() {
                None
            } else {
                Some((prop, value.to_string()))
            }
        })
        .collect()
}

/// Last declaration wins, like in a browser.
pub fn style_value(style: &str, property: &str) -> Option<String> {
    parse_inline_style(style)
        .into_iter()
        .rev()
        .find(|(prop, _)| prop == property)
        .map(|(_, value)| value)
}

/// Build `prop: value; prop: value`, skipping absent values. Empty when nothing is set.
pub fn build_style(declarations: &[(&str, Option<&str>)]) -> String {
    declarations
        .iter()
        .filter_map(|(prop, value)| value.map(|v| format!("{}: {}", prop, v)))
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}
