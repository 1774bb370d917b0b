//! Intermediate markup emitted by the pre-processor.

/// Element wrapping one decorator and its raw expression text
pub const DECORATOR_TAG: &str = "dp:decorator";

/// Empty anchor the runtime replaces with evaluated template content
pub const TARGET_TAG: &str = "dp:target";

/// Escape `<` and `>` so expression text survives as element content
pub fn escape_angle_brackets(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Append `<tag a="b" ...>`; attributes with `None` values are skipped
pub fn open_tag(out: &mut String, tag: &str, attributes: &[(&str, Option<&str>)]) {
    out.push('<');
    out.push_str(tag);
    for (name, value) in attributes {
        if let Some(value) = value {
            out.push_str(&format!(" {}=\"{}\"", name, value));
        }
    }
    out.push('>');
}

pub fn close_tag(out: &mut String, tag: &str) {
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}
