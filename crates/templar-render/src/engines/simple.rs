//! Brace-substitution templates with partial includes.
//!
//! # Syntax
//!
//! - `{name}` - Variable substitution
//! - `{user.name}` - Nested property access via dot notation
//! - `{items.0}` - Array index access
//! - `{> header}` - Include a partial, rendered with the same locals
//! - `{{` and `}}` - Escaped braces (render as `{` and `}`)
//!
//! Unknown variables are left in place as `{name}` so they show up in output.
//!
//! # Call shapes
//!
//! `compile(str)` returns a [`SimpleTemplate`] object whose
//! `render(locals, partials)` takes the partial set. `render(str, locals,
//! partials, callback)` answers through the callback only.

use std::sync::Arc;

use serde_json::Value;

use crate::implementation::{
    Arguments, CompiledObject, ImplError, Output, RenderingImplementation,
};
use crate::partials::PartialSet;
use crate::signature::{Descriptor, Method, ParameterSignature};

// Includes nested deeper than this are treated as a cycle.
const MAX_INCLUDE_DEPTH: usize = 16;

/// The brace-substitution implementation.
pub struct Simple {
    descriptor: Descriptor,
}

impl Simple {
    pub fn new() -> Self {
        let descriptor = Descriptor::new("simple")
            .method(Method::Compile, &["str"])
            .method(Method::Render, &["str", "locals", "partials", "callback"]);
        Self { descriptor }
    }
}

impl Default for Simple {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderingImplementation for Simple {
    fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    fn invoke(&self, method: Method, args: Arguments) -> Result<Output, ImplError> {
        match method {
            Method::Compile => {
                let template = SimpleTemplate::new(args.text(0)?);
                Ok(Output::Object(Arc::new(template)))
            }
            Method::Render => {
                let source = args.text(0)?;
                let locals = args.value(1);
                let empty = PartialSet::new();
                let partials = args.partials(2).unwrap_or(&empty);
                let callback = args
                    .callback(3)
                    .ok_or_else(|| ImplError::new("simple render expects a callback"))?;
                callback.complete(render_source(source, &locals, partials, 0));
                Ok(Output::Pending)
            }
            other => Err(ImplError::new(format!("simple has no {other}"))),
        }
    }
}

/// A compiled template object.
pub struct SimpleTemplate {
    source: String,
    signature: ParameterSignature,
}

impl SimpleTemplate {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            signature: ParameterSignature::infer(&["locals", "partials"]),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl CompiledObject for SimpleTemplate {
    fn signature(&self) -> &ParameterSignature {
        &self.signature
    }

    fn render(&self, args: Arguments) -> Result<Option<String>, ImplError> {
        let empty = PartialSet::new();
        let partials = args.partials(1).unwrap_or(&empty);
        render_source(&self.source, &args.value(0), partials, 0).map(Some)
    }
}

fn render_source(
    template: &str,
    data: &Value,
    partials: &PartialSet,
    depth: usize,
) -> Result<String, ImplError> {
    if depth > MAX_INCLUDE_DEPTH {
        return Err(ImplError::new("partials include each other too deeply"));
    }

    let mut result = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '{' {
            if chars.peek() == Some(&'{') {
                // Escaped brace: {{ -> {
                chars.next();
                result.push('{');
                continue;
            }

            let mut tag = String::new();
            let mut found_close = false;
            for inner_ch in chars.by_ref() {
                if inner_ch == '}' {
                    found_close = true;
                    break;
                }
                tag.push(inner_ch);
            }

            if !found_close {
                return Err(ImplError::new(format!(
                    "Unclosed variable substitution: {{{}",
                    tag
                )));
            }

            let tag = tag.trim();
            if let Some(name) = tag.strip_prefix('>') {
                let name = name.trim();
                let partial = partials
                    .lookup(name)
                    .ok_or_else(|| ImplError::new(format!("unknown partial `{name}`")))?;
                result.push_str(&render_source(partial, data, partials, depth + 1)?);
                continue;
            }

            if tag.is_empty() {
                return Err(ImplError::new("Empty variable name in template"));
            }

            match resolve_path(data, tag) {
                Some(v) => result.push_str(&format_value(v)),
                // Left in place for debugging
                None => result.push_str(&format!("{{{}}}", tag)),
            }
        } else if ch == '}' {
            if chars.peek() == Some(&'}') {
                chars.next();
            }
            result.push('}');
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

fn resolve_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;

    for part in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(arr) => {
                let index: usize = part.parse().ok()?;
                arr.get(index)?
            }
            _ => return None,
        };
    }

    Some(current)
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
