//! # Templar - Render Any Template With The Engine That Fits It
//!
//! Templar renders template files and strings through whichever registered
//! template engine fits them best. It picks the engine from the filename,
//! merges global defaults with per-call options, loads template data, and
//! runs source middleware such as YAML front matter.
//!
//! The per-engine plumbing lives in [`templar_render`], re-exported here as
//! [`render`].
//!
//! ## Core Concepts
//!
//! - [`Engine`]: the facade; owns defaults, a registry, a resolver and middleware
//! - [`Registry`]: implementation name → [`Adapter`](render::Adapter)
//! - [`Template`]: a compiled template carrying its call's data
//! - [`Middleware`]: rewrites source before compilation ([`FrontMatter`] is built in)
//! - [`load_data`]: `data` option as inline JSON or a directory of `*.json` files
//!
//! ## Quick Start
//!
//! ```rust
//! use serde_json::json;
//! use templar::{Engine, Options};
//!
//! let views = tempfile::tempdir().unwrap();
//! let engine = Engine::builtin().unwrap();
//!
//! // Picked by filename: `.hbs` resolves to handlebars.
//! let options = Options::new().filename(views.path().join("card.hbs"));
//! let out = engine
//!     .render("<b>{{name}}</b>\n\n\n", &json!({"name": "Ann"}), &options)
//!     .unwrap();
//! assert_eq!(out, "<b>Ann</b>");
//! ```
//!
//! ## Front Matter And Data
//!
//! Data from the `data` option and from middleware wins over the locals passed
//! at render time:
//!
//! ```rust
//! use serde_json::json;
//! use templar::{Engine, Options};
//!
//! let engine = Engine::builtin().unwrap();
//! let options = Options::new().engine("tera").middleware("frontmatter");
//!
//! let template = engine
//!     .compile("---\ntitle: Home\n---\n{{ title }} / {{ user }}", &options)
//!     .unwrap();
//! let out = template.render(&json!({"title": "ignored", "user": "ann"})).unwrap();
//! assert_eq!(out, "Home / ann");
//! ```

mod data;
mod engine;
mod error;
mod merge;
mod middleware;
mod registry;

pub use templar_render as render;

// Error type
pub use error::{Result, TemplarError};

// Facade exports
pub use engine::{Engine, Template};
pub use registry::Registry;

// Data and middleware
pub use data::{load_data, load_data_dir};
pub use merge::{deep_merge, merged};
pub use middleware::{FrontMatter, Middleware, Processed};

// Most-used core types
pub use templar_render::{DataSource, Options, TemplateEngine};
