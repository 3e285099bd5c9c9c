//! Formatting helpers shared by the linker and the layer code generator.

/// Format a float as a GLSL float literal.
///
/// Trailing zeros are trimmed but a fractional part is always kept, so the
/// literal never reads as an integer (`1.0`, not `1`).
pub fn fmt_f32(v: f32) -> String {
    if !v.is_finite() {
        return "0.0".to_string();
    }
    let s = format!("{v:.9}");
    let s = s.trim_end_matches('0');
    if let Some(int_part) = s.strip_suffix('.') {
        format!("{int_part}.0")
    } else {
        s.to_string()
    }
}

/// Sanitize a string to be a valid GLSL identifier.
pub fn sanitize_glsl_ident(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 1);
    for ch in s.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    // Double underscores are reserved in GLSL.
    while out.contains("__") {
        out = out.replace("__", "_");
    }
    out
}

/// Upper-case the first character (`normal` -> `Normal`), used when deriving
/// accessor names from layer names.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Re-indent opaque stage body text by `indent_levels` levels of four spaces.
///
/// Line endings are normalized and trailing whitespace is dropped; blank
/// lines stay blank.
pub fn indent_body(source: &str, indent_levels: usize) -> String {
    let indent = "    ".repeat(indent_levels);
    source
        .replace("\r\n", "\n")
        .lines()
        .map(|line| {
            let line = line.trim_end();
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("{indent}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prefix every line of `source` with its 1-based line number.
///
/// Driver compile logs refer to line numbers; this makes emitted sources easy
/// to read next to them.
pub fn number_lines(source: &str) -> String {
    let mut output = String::new();
    for (line_num, line) in source.lines().enumerate() {
        output.push_str(&format!("{:4} | {}\n", line_num + 1, line));
    }
    output
}
