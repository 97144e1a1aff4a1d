//! # Templar Render - One Contract Over Many Template Engines
//!
//! `templar-render` lets callers compile and render templates through a single
//! contract while the rendering is done by any of several independently
//! written template engines, each with its own native call shapes.
//!
//! This crate is the core of the `templar` facade, but can be used on its own.
//!
//! ## Core Concepts
//!
//! - [`TemplateEngine`]: the uniform `configure` / `compile` / `render` /
//!   `compile_file` / `render_file` contract
//! - [`RenderingImplementation`]: what an engine exposes natively, described by
//!   a [`Descriptor`] of [`Method`]s and their [`ParameterSignature`]s
//! - [`Adapter`]: implements [`TemplateEngine`] over any implementation,
//!   synthesizing missing methods and reshaping arguments
//! - [`Resolver`]: picks an implementation for a filename from package metadata
//! - [`Settings`]: fully resolved per-call options (absolute `basedir`)
//! - [`normalize`]: canonical whitespace for all produced text
//!
//! ## Quick Start
//!
//! ```rust
//! use templar_render::engines::TeraImpl;
//! use templar_render::{Adapter, Options, Settings, TemplateEngine};
//! use serde_json::json;
//!
//! // Tera here only exposes `render`; `compile` is synthesized.
//! let engine = Adapter::wrap(TeraImpl::new()).unwrap();
//! let settings = Settings::resolve(&Options::new()).unwrap();
//!
//! let template = engine.compile("Hello, {{ name }}!   \n\n\n", &settings).unwrap();
//! assert_eq!(template.render(&json!({"name": "World"})).unwrap(), "Hello, World!");
//! ```
//!
//! ## Choosing an Engine by Filename
//!
//! ```rust
//! use templar_render::engines::builtin_manifests;
//! use templar_render::Resolver;
//!
//! let resolver = Resolver::new(builtin_manifests(), |_name: &str| true);
//! assert_eq!(resolver.resolve(Some("page.hbs".as_ref())).unwrap().as_deref(), Some("handlebars"));
//! assert_eq!(resolver.resolve(Some("page.tera".as_ref())).unwrap().as_deref(), Some("tera"));
//! ```

mod adapter;
pub mod engines;
mod error;
mod implementation;
mod normalize;
mod partials;
mod resolver;
mod settings;
mod signature;

// Error type
pub use error::{RenderError, Result};

// Adapter exports
pub use adapter::{read_template, Adapter, CompiledTemplate, TemplateEngine};

// Native implementation contract
pub use implementation::{
    Arg, Arguments, CompiledObject, Completion, ImplError, Output, RenderingImplementation,
    TemplateFn,
};
pub use signature::{Descriptor, Method, Parameter, ParameterRole, ParameterSignature};

// Settings exports
pub use settings::{DataSource, Options, Settings};

// Filesystem and text helpers
pub use normalize::normalize;
pub use partials::{strip_extension, PartialSet, EXCLUDED_DIRS};

// Resolver exports
pub use resolver::{
    file_terms, mime_type, similarity, CandidatePackage, ManifestDir, ManifestSource, Resolver,
    MIME_TYPES,
};
