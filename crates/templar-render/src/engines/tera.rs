//! Tera behind a render-only call shape.
//!
//! With three parameters and no callback, the adapter merges locals and
//! options into one context object, so options such as `autoescape` arrive as
//! context keys.

use tera::{Context, Tera};

use super::describe;
use crate::implementation::{Arguments, ImplError, Output, RenderingImplementation};
use crate::signature::{Descriptor, Method};

/// Stateless Tera implementation.
pub struct TeraImpl {
    descriptor: Descriptor,
}

impl TeraImpl {
    pub fn new() -> Self {
        Self {
            descriptor: Descriptor::new("tera").method(
                Method::Render,
                &["source", "locals", "options"],
            ),
        }
    }
}

impl Default for TeraImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderingImplementation for TeraImpl {
    fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    fn invoke(&self, method: Method, args: Arguments) -> Result<Output, ImplError> {
        if method != Method::Render {
            return Err(ImplError::new(format!("tera has no {method}")));
        }

        let source = args.text(0)?;
        let context_value = serde_json::Value::Object(args.object(1));
        let autoescape = context_value
            .get("autoescape")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let context = Context::from_value(context_value).map_err(|e| describe(&e))?;

        Tera::one_off(source, &context, autoescape)
            .map(Output::Text)
            .map_err(|e| describe(&e))
    }
}
