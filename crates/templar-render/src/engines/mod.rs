//! Bundled rendering implementations.
//!
//! Each wraps a template crate behind a different native call shape, so every
//! adaptation path of [`Adapter`] is taken by a real engine:
//!
//! | Implementation | Native methods | Shape |
//! |----------------|----------------|-------|
//! | [`MiniJinja`] | `render(name, data)`, `renderString(str, data)`, `configure(templates, options)` | stateful, named templates |
//! | [`HandlebarsImpl`] | `compile(template, options)`, `registerPartial(name, partial)`, `configure(templates, options)` | stateful, returns a function |
//! | [`TeraImpl`] | `render(source, locals, options)` | stateless, render only |
//! | [`Simple`] | `compile(str)`, `render(str, locals, partials, callback)` | template objects, callback |

use std::error::Error as StdError;

use crate::adapter::Adapter;
use crate::error::Result;
use crate::implementation::ImplError;
use crate::resolver::CandidatePackage;

mod handlebars;
mod minijinja;
mod simple;
mod tera;

pub use self::handlebars::HandlebarsImpl;
pub use self::minijinja::MiniJinja;
pub use self::simple::{Simple, SimpleTemplate};
pub use self::tera::TeraImpl;

/// Package metadata of the bundled implementations, in registration order.
pub fn builtin_manifests() -> Vec<CandidatePackage> {
    vec![
        CandidatePackage::new(
            "minijinja",
            "a powerful template engine for Rust with minimal dependencies",
            &["jinja", "jinja2", "templates"],
        ),
        CandidatePackage::new(
            "handlebars",
            "Handlebars templating implemented in Rust.",
            &["handlebars", "templating", "web"],
        ),
        CandidatePackage::new(
            "tera",
            "Template engine based on Jinja2/Django templates",
            &["template", "html", "django", "markup", "jinja2"],
        ),
        CandidatePackage::new(
            "simple",
            "Brace substitution templates with partial includes",
            &["template", "format"],
        ),
    ]
}

/// Adapters over every bundled implementation, in registration order.
pub fn builtin_adapters() -> Result<Vec<Adapter>> {
    Ok(vec![
        Adapter::wrap(MiniJinja::new())?,
        Adapter::wrap(HandlebarsImpl::new())?,
        Adapter::wrap(TeraImpl::new())?,
        Adapter::wrap(Simple::new())?,
    ])
}

// Flattens an error and its sources into one message.
pub(crate) fn describe(err: &dyn StdError) -> ImplError {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    ImplError::new(message)
}
