//! Output normalization.
//!
//! Every text produced through the adapter passes through [`normalize`], so
//! the same logical template rendered by two implementations compares equal
//! even when the engines format whitespace differently:
//!
//! - `\r\n` and lone `\r` become `\n`
//! - tabs in leading indentation become two spaces
//! - trailing whitespace is removed from every line
//! - runs of blank lines collapse into one blank line
//! - leading and trailing blank lines are removed
//!
//! The pass is idempotent.
//!
//! Normalization is whitespace-only and markup-agnostic. It never re-indents
//! or re-flows tags: two engines emitting the same markup at different
//! indentation depths, or with different line breaks between tags, still
//! produce different text.

/// Canonicalizes rendered text.
///
/// ```rust
/// use templar_render::normalize;
///
/// let raw = "\n\n<ul>\r\n\t<li>a</li>   \n\n\n\t<li>b</li>\n</ul>\n\n";
/// assert_eq!(normalize(raw), "<ul>\n  <li>a</li>\n\n  <li>b</li>\n</ul>");
/// assert_eq!(normalize(&normalize(raw)), normalize(raw));
/// ```
pub fn normalize(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut lines: Vec<String> = Vec::new();
    let mut previous_blank = false;

    for line in unified.split('\n') {
        let line = expand_indentation(line.trim_end());
        if line.is_empty() {
            if !lines.is_empty() && !previous_blank {
                lines.push(String::new());
            }
            previous_blank = true;
        } else {
            lines.push(line);
            previous_blank = false;
        }
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    lines.join("\n")
}

fn expand_indentation(line: &str) -> String {
    let indent_len = line
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(line.len());
    let (indent, rest) = line.split_at(indent_len);

    let mut out = String::with_capacity(line.len() + indent.len());
    for c in indent.chars() {
        if c == '\t' {
            out.push_str("  ");
        } else {
            out.push(c);
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_whitespace() {
        assert_eq!(normalize("a  \nb\t\n"), "a\nb");
    }

    #[test]
    fn test_blank_runs_collapse() {
        assert_eq!(normalize("a\n\n\n\nb"), "a\n\nb");
        assert_eq!(normalize("a\n   \n\t\nb"), "a\n\nb");
    }

    #[test]
    fn test_leading_and_trailing_blank_lines() {
        assert_eq!(normalize("\n\n  x\n\n"), "  x");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("\n\n"), "");
    }

    #[test]
    fn test_tabs_in_indentation_only() {
        assert_eq!(normalize("\t\ta\tb"), "    a\tb");
        assert_eq!(normalize(" \tx"), "   x");
    }

    #[test]
    fn test_carriage_returns() {
        assert_eq!(normalize("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_markup_structure_is_kept() {
        assert_eq!(normalize("<ul>\n    <li>a</li>\n</ul>"), "<ul>\n    <li>a</li>\n</ul>");
        assert_eq!(normalize("<p>a</p><p>b</p>"), "<p>a</p><p>b</p>");
    }

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(normalize("Hello, World!"), "Hello, World!");
    }
}
