//! Source preprocessing.
//!
//! A [`Middleware`] rewrites template source before compilation and may
//! contribute data. Middleware run in the order named by the `use` option;
//! each sees the content produced by the previous one, and the data they
//! return is deep-merged into the call's data.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Result, TemplarError};

/// Output of one middleware step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Processed {
    pub content: String,
    pub data: Value,
}

impl Processed {
    /// Content unchanged, no data.
    pub fn unchanged(source: &str) -> Self {
        Self {
            content: source.to_string(),
            data: Value::Object(Map::new()),
        }
    }
}

pub trait Middleware: Send + Sync {
    /// Name used in the `use` option.
    fn name(&self) -> &str;

    fn process(&self, source: &str) -> Result<Processed>;
}

/// YAML front matter between `---` fences at the top of the source.
///
/// ```rust
/// use serde_json::json;
/// use templar::{FrontMatter, Middleware};
///
/// let processed = FrontMatter.process("---\ntitle: Home\n---\n<h1>{{ title }}</h1>\n").unwrap();
/// assert_eq!(processed.content, "<h1>{{ title }}</h1>\n");
/// assert_eq!(processed.data, json!({"title": "Home"}));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FrontMatter;

impl FrontMatter {
    pub const NAME: &'static str = "frontmatter";
    const FENCE: &'static str = "---";
}

impl Middleware for FrontMatter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn process(&self, source: &str) -> Result<Processed> {
        let Some((matter, content)) = split_front_matter(source) else {
            return Ok(Processed::unchanged(source));
        };

        let data = if matter.trim().is_empty() {
            Value::Object(Map::new())
        } else {
            serde_yaml::from_str::<Value>(matter).map_err(|e| TemplarError::Middleware {
                name: Self::NAME.to_string(),
                message: e.to_string(),
            })?
        };

        Ok(Processed {
            content: content.to_string(),
            data,
        })
    }
}

// Returns (front matter, rest) when `source` opens with a fence line that is
// closed by another fence line.
fn split_front_matter(source: &str) -> Option<(&str, &str)> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let rest = strip_fence_line(source)?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FrontMatter::FENCE {
            let matter = &rest[..offset];
            let content = &rest[offset + line.len()..];
            return Some((matter, content));
        }
        offset += line.len();
    }
    None
}

fn strip_fence_line(source: &str) -> Option<&str> {
    let rest = source.strip_prefix(FrontMatter::FENCE)?;
    let line_end = rest.find('\n').map(|i| i + 1).unwrap_or(rest.len());
    if rest[..line_end].trim().is_empty() {
        Some(&rest[line_end..])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_no_front_matter() {
        let out = FrontMatter.process("<p>hi</p>").unwrap();
        assert_eq!(out, Processed::unchanged("<p>hi</p>"));
    }

    #[test]
    fn test_nested_yaml() {
        let out = FrontMatter
            .process("---\nauthor:\n  name: Ann\ntags: [a, b]\n---\nbody")
            .unwrap();
        assert_eq!(out.content, "body");
        assert_eq!(out.data, json!({"author": {"name": "Ann"}, "tags": ["a", "b"]}));
    }

    #[test]
    fn test_unclosed_fence_is_content() {
        let source = "---\ntitle: x\nno closing fence";
        assert_eq!(FrontMatter.process(source).unwrap().content, source);
    }

    #[test]
    fn test_horizontal_rule_is_not_front_matter() {
        let source = "---- not a fence\n---\n";
        assert_eq!(FrontMatter.process(source).unwrap().content, source);
    }

    #[test]
    fn test_empty_front_matter() {
        let out = FrontMatter.process("---\n---\nx").unwrap();
        assert_eq!(out.content, "x");
        assert_eq!(out.data, json!({}));
    }

    #[test]
    fn test_crlf_fences() {
        let out = FrontMatter.process("---\r\ntitle: T\r\n---\r\nbody").unwrap();
        assert_eq!(out.content, "body");
        assert_eq!(out.data, json!({"title": "T"}));
    }

    #[test]
    fn test_invalid_yaml() {
        let err = FrontMatter.process("---\n: : :\n  - [\n---\nx").unwrap_err();
        assert!(matches!(err, TemplarError::Middleware { .. }));
    }
}
