//! The orchestration facade.
//!
//! An [`Engine`] owns everything a call needs besides the template itself:
//! a [`Registry`] of adapters, a [`Resolver`] choosing among them, global
//! default [`Options`], and a catalog of [`Middleware`].
//!
//! A compile goes through these steps:
//!
//! 1. Merge the defaults with the per-call options (per-call wins).
//! 2. Resolve them into [`Settings`] (absolute `basedir`).
//! 3. Load `data`, inline or from a directory.
//! 4. Run the middleware named by `use` over the source, merging their data.
//! 5. Pick the implementation: the `engine` option, else the resolver on
//!    `filename`, else the resolver's first candidate.
//! 6. Compile through the adapter.
//!
//! Rendering the result deep-merges the call's data over the caller's locals.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use templar_render::engines::builtin_manifests;
use templar_render::{
    read_template, Adapter, CompiledTemplate, ManifestSource, Options, Resolver, Settings,
    TemplateEngine,
};

use crate::data::load_data;
use crate::error::{Result, TemplarError};
use crate::merge::merged;
use crate::middleware::{FrontMatter, Middleware};
use crate::registry::Registry;

/// A compiled template bound to the data of its compile call.
#[derive(Debug, Clone)]
pub struct Template {
    compiled: CompiledTemplate,
    data: Value,
    implementation: String,
}

impl Template {
    /// Renders with `locals`; the call's data wins on conflicting keys.
    pub fn render(&self, locals: &Value) -> Result<String> {
        let context = merged(locals, &self.data);
        Ok(self.compiled.render(&context)?)
    }

    /// Data gathered from the `data` option and middleware.
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Name of the implementation that compiled this template.
    pub fn implementation(&self) -> &str {
        &self.implementation
    }
}

pub struct Engine {
    registry: Arc<Registry>,
    resolver: Resolver,
    defaults: Options,
    middleware: BTreeMap<String, Arc<dyn Middleware>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("registry", &self.registry)
            .field("defaults", &self.defaults)
            .field("middleware", &self.middleware.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// An engine over `registry`, discovering candidates from `manifests`.
    ///
    /// Only registered implementations able to compile or render are ever
    /// resolved.
    pub fn new(registry: Registry, manifests: impl ManifestSource + 'static) -> Self {
        let registry = Arc::new(registry);
        let capable = Arc::clone(&registry);
        let resolver = Resolver::new(manifests, move |name: &str| capable.is_capable(name));

        let mut middleware: BTreeMap<String, Arc<dyn Middleware>> = BTreeMap::new();
        middleware.insert(FrontMatter::NAME.to_string(), Arc::new(FrontMatter));

        Self {
            registry,
            resolver,
            defaults: Options::default(),
            middleware,
        }
    }

    /// An engine with the bundled implementations and their manifests.
    pub fn builtin() -> Result<Self> {
        Ok(Self::new(Registry::builtin()?, builtin_manifests()))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Global defaults applied to every call.
    pub fn defaults(&self) -> &Options {
        &self.defaults
    }

    /// Replaces the global defaults.
    pub fn configure(&mut self, options: Options) -> &mut Self {
        self.defaults = options;
        self
    }

    /// Replaces the global defaults with a YAML document.
    pub fn configure_yaml(&mut self, yaml: &str) -> Result<&mut Self> {
        let options = Options::from_yaml(yaml)?;
        Ok(self.configure(options))
    }

    /// Replaces the global defaults with a YAML (or JSON) file.
    pub fn configure_file(&mut self, path: &Path) -> Result<&mut Self> {
        let content = std::fs::read_to_string(path).map_err(|e| TemplarError::io(path, e))?;
        self.configure_yaml(&content)
    }

    /// Adds a middleware to the catalog and to the default `use` list.
    ///
    /// A middleware with the same name replaces the catalog entry and is not
    /// listed twice.
    pub fn use_middleware(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        let name = middleware.name().to_string();
        if !self.defaults.middleware.contains(&name) {
            self.defaults.middleware.push(name.clone());
        }
        self.middleware.insert(name, Arc::new(middleware));
        self
    }

    /// Compiles template source.
    pub fn compile(&self, source: &str, options: &Options) -> Result<Template> {
        let options = self.defaults.merged_with(options);
        let settings = Settings::resolve(&options)?;

        let mut data = load_data(settings.data(), settings.basedir())?;
        let mut source = source.to_string();
        for name in unique(settings.middleware()) {
            let middleware = self
                .middleware
                .get(name)
                .ok_or_else(|| TemplarError::UnknownMiddleware(name.to_string()))?;
            let processed = middleware.process(&source)?;
            source = processed.content;
            data = merged(&data, &processed.data);
        }

        let adapter = self.pick(&settings)?;
        tracing::debug!(
            implementation = adapter.name(),
            filename = ?settings.filename(),
            "compiling template"
        );
        let compiled = adapter.compile(&source, &settings)?;

        Ok(Template {
            compiled,
            data,
            implementation: adapter.name().to_string(),
        })
    }

    /// `compile(source, options)` rendered with `locals`.
    pub fn render(&self, source: &str, locals: &Value, options: &Options) -> Result<String> {
        self.compile(source, options)?.render(locals)
    }

    /// Reads and compiles the file at `path`, with `filename` set to it.
    pub fn compile_file(&self, path: &Path, options: &Options) -> Result<Template> {
        let source = read_template(path)?;
        let options = options.clone().filename(path);
        self.compile(&source, &options)
    }

    pub fn render_file(&self, path: &Path, locals: &Value, options: &Options) -> Result<String> {
        self.compile_file(path, options)?.render(locals)
    }

    fn pick(&self, settings: &Settings) -> Result<&Adapter> {
        let name = match settings.engine() {
            Some(name) => name.to_string(),
            None => self.resolver.require(settings.filename())?,
        };
        self.registry
            .get(&name)
            .ok_or(TemplarError::UnknownEngine(name))
    }
}

// Names in first-seen order, without repeats.
fn unique(names: &[String]) -> Vec<&str> {
    let mut seen = Vec::new();
    for name in names {
        if !seen.contains(&name.as_str()) {
            seen.push(name.as_str());
        }
    }
    seen
}
