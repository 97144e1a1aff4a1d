//! The call adapter: one uniform contract over any rendering implementation.
//!
//! [`TemplateEngine`] is the contract callers program against. [`Adapter`]
//! implements it over a [`RenderingImplementation`], whatever that
//! implementation's native call shapes are.
//!
//! ## Method synthesis
//!
//! | Missing | Synthesized as |
//! |---------|----------------|
//! | `compile` | a deferred function calling `render(source, locals, options)` |
//! | `render` | `compile(source, options)(locals)` |
//! | `compileFile` / `renderFile` | read the file, then `compile` / `render` with `filename` set |
//!
//! ## Call construction
//!
//! Native methods receive `[source, locals, options]` (`[source, options]` for
//! compile), reshaped after the method's [`ParameterSignature`]:
//!
//! 1. Fewer than 3 parameters, or fewer than 4 without a callback: locals and
//!    options are merged into one object (options win).
//! 2. `compile` without an options parameter: options are dropped.
//! 3. A partials parameter receives the [`PartialSet`] of `basedir`,
//!    replacing whatever the caller put there.
//! 4. A callback parameter receives a [`Completion`]; a result delivered
//!    through it is returned directly.
//!
//! When an implementation fails with a "not found" message (it expected a
//! file, not inline source), the `<method>String` sibling is tried once with
//! the same arguments, if the implementation has one.
//!
//! All text leaving the adapter passes through [`normalize`].
//!
//! ## Stateful implementations
//!
//! Implementations whose [`Descriptor`] is marked stateful keep their own
//! configuration (`basedir`, registered partials). For those, applying the
//! call's settings and the call itself run inside one critical section, and
//! compiled functions re-apply their settings before each render.

use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::{RenderError, Result};
use crate::implementation::{
    merge_objects, Arg, Arguments, CompiledObject, Completion, ImplError, Output,
    RenderingImplementation, TemplateFn,
};
use crate::normalize::normalize;
use crate::partials::PartialSet;
use crate::settings::Settings;
use crate::signature::{Descriptor, Method, ParameterRole, ParameterSignature};

static NOT_FOUND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)not\s+found").expect("not-found pattern is valid"));

/// A compiled template: call [`render`](Self::render) with locals.
#[derive(Clone)]
pub struct CompiledTemplate {
    render: Arc<dyn Fn(&Value) -> Result<String> + Send + Sync>,
}

impl CompiledTemplate {
    pub fn new(render: impl Fn(&Value) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            render: Arc::new(render),
        }
    }

    pub fn render(&self, locals: &Value) -> Result<String> {
        (self.render)(locals)
    }
}

impl fmt::Debug for CompiledTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CompiledTemplate(..)")
    }
}

/// The uniform contract.
///
/// `render`, `compile_file` and `render_file` have default implementations in
/// terms of `compile`.
pub trait TemplateEngine: Send + Sync {
    /// Name of the underlying implementation.
    fn name(&self) -> &str;

    /// Applies settings to the underlying implementation.
    fn configure(&self, settings: &Settings) -> Result<()>;

    /// Compiles template source into a function of locals.
    fn compile(&self, source: &str, settings: &Settings) -> Result<CompiledTemplate>;

    /// Renders template source with locals.
    fn render(&self, source: &str, locals: &Value, settings: &Settings) -> Result<String> {
        self.compile(source, settings)?.render(locals)
    }

    /// Compiles the template file at `path`.
    fn compile_file(&self, path: &Path, settings: &Settings) -> Result<CompiledTemplate> {
        let source = read_template(path)?;
        self.compile(&source, &settings.for_file(path)?)
    }

    /// Renders the template file at `path`.
    fn render_file(&self, path: &Path, locals: &Value, settings: &Settings) -> Result<String> {
        let source = read_template(path)?;
        self.render(&source, locals, &settings.for_file(path)?)
    }
}

/// Reads a template file as UTF-8 text.
pub fn read_template(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| RenderError::io(path, e))
}

/// Adapts a [`RenderingImplementation`] to [`TemplateEngine`].
///
/// Cloning is cheap; clones share the implementation and its gate.
#[derive(Clone)]
pub struct Adapter {
    inner: Arc<Inner>,
}

struct Inner {
    implementation: Arc<dyn RenderingImplementation>,
    gate: Mutex<()>,
}

impl fmt::Debug for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter")
            .field("implementation", &self.name())
            .finish()
    }
}

// Which entry point a compile/render call came through. For `File`, the
// "source" string is the template path.
#[derive(Clone, Copy)]
enum Entry {
    Source,
    File,
}

impl Adapter {
    /// Wraps an implementation.
    ///
    /// # Errors
    ///
    /// [`RenderError::CapabilityGap`] if the implementation exposes none of
    /// `compile`, `render`, `compileFile`, `renderFile`.
    pub fn new(implementation: Arc<dyn RenderingImplementation>) -> Result<Self> {
        let descriptor = implementation.descriptor();
        let usable = [
            Method::Compile,
            Method::Render,
            Method::CompileFile,
            Method::RenderFile,
        ]
        .iter()
        .any(|m| descriptor.exposes(*m));
        if !usable {
            return Err(RenderError::gap(
                descriptor.name(),
                "render",
                "exposes none of compile, render, compileFile, renderFile",
            ));
        }

        Ok(Self {
            inner: Arc::new(Inner {
                implementation,
                gate: Mutex::new(()),
            }),
        })
    }

    /// Wraps an owned implementation.
    pub fn wrap<I: RenderingImplementation + 'static>(implementation: I) -> Result<Self> {
        Self::new(Arc::new(implementation))
    }

    pub fn descriptor(&self) -> &Descriptor {
        self.inner.implementation.descriptor()
    }

    fn gate(&self) -> Option<MutexGuard<'_, ()>> {
        if self.descriptor().is_stateful() {
            Some(
                self.inner
                    .gate
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner),
            )
        } else {
            None
        }
    }

    fn adapt(&self, source: ImplError) -> RenderError {
        RenderError::Adaptation {
            implementation: self.name().to_string(),
            source,
        }
    }

    // Configuration propagation. Callers hold the gate.
    fn apply(&self, settings: &Settings) -> Result<()> {
        let descriptor = self.descriptor();

        if let Some(signature) = descriptor.signature(Method::Configure) {
            if signature.has(ParameterRole::TemplatePath) {
                tracing::trace!(
                    implementation = descriptor.name(),
                    basedir = %settings.basedir().display(),
                    "configuring implementation"
                );
                let args = Arguments::new(vec![
                    Arg::Text(settings.basedir_string()),
                    Arg::Value(settings.remaining_value()),
                ]);
                self.raw(Method::Configure, args)?;
            }
        }

        if descriptor.exposes(Method::RegisterPartial) {
            let partials = PartialSet::scan(settings.basedir())?;
            for (name, source) in partials.iter() {
                let args = Arguments::new(vec![Arg::Text(name.into()), Arg::Text(source.into())]);
                self.raw(Method::RegisterPartial, args)?;
            }
        }

        Ok(())
    }

    fn raw(&self, method: Method, args: Arguments) -> Result<Output> {
        self.inner
            .implementation
            .invoke(method, args)
            .map_err(|e| self.adapt(e))
    }

    // Invokes a native method, retrying once through `<method>String` when
    // the implementation reports "not found".
    fn call(&self, method: Method, args: Arguments) -> Result<Output> {
        let alternate = method
            .string_variant()
            .filter(|m| self.descriptor().exposes(*m));
        let retry_args = alternate.map(|_| args.clone());

        match self.inner.implementation.invoke(method, args) {
            Ok(output) => Ok(output),
            Err(err) if NOT_FOUND.is_match(err.message()) => match (alternate, retry_args) {
                (Some(alternate), Some(args)) => {
                    tracing::debug!(
                        implementation = self.name(),
                        %method,
                        %alternate,
                        error = err.message(),
                        "retrying with string variant"
                    );
                    self.raw(alternate, args)
                }
                _ => Err(self.adapt(err)),
            },
            Err(err) => Err(self.adapt(err)),
        }
    }

    // Reshapes caller arguments after a native signature.
    fn shape(
        &self,
        signature: &ParameterSignature,
        args: Vec<Arg>,
        compiling: bool,
        settings: &Settings,
    ) -> Result<(Arguments, Option<Completion>)> {
        let mut args = args;

        let has_callback = signature.has(ParameterRole::Callback);
        if signature.len() < 3 || (signature.len() < 4 && !has_callback) {
            let mut rest = args.into_iter();
            let source = rest.next().unwrap_or(Arg::Missing);
            let locals = arg_value(rest.next());
            let options = arg_value(rest.next());
            args = vec![source, Arg::Value(merge_objects(&locals, &options))];
            args.extend(rest);
        }

        // `[source, options, ..]` becomes `[source, ..]`
        if compiling && !signature.has(ParameterRole::Options) && args.len() > 1 {
            args.remove(1);
        }

        let mut args = Arguments::new(args);

        if let Some(index) = signature.position(ParameterRole::Partials) {
            args.set(index, Arg::Partials(PartialSet::scan(settings.basedir())?));
        }

        let completion = signature.position(ParameterRole::Callback).map(|index| {
            let completion = Completion::new();
            args.set(index, Arg::Callback(completion.clone()));
            completion
        });

        Ok((args, completion))
    }

    // Native compile or compileFile; `entry` selects which.
    fn compile_at(
        &self,
        source: &str,
        settings: &Settings,
        entry: Entry,
        depth: u8,
    ) -> Result<CompiledTemplate> {
        let method = match entry {
            Entry::Source => Method::Compile,
            Entry::File => Method::CompileFile,
        };

        let Some(signature) = self.descriptor().signature(method).cloned() else {
            return self.synthesize_compile(source, settings, depth);
        };

        let initial = vec![Arg::Text(source.to_string()), Arg::Value(settings.to_value())];
        let (args, completion) = self.shape(&signature, initial, true, settings)?;

        let output = {
            let _guard = self.gate();
            self.apply(settings)?;
            self.call(method, args)?
        };

        let output = match output {
            Output::Pending => match completion.and_then(|c| c.take()) {
                Some(result) => Output::Text(result.map_err(|e| self.adapt(e))?),
                None => Output::Null,
            },
            other => other,
        };

        match output {
            Output::Text(text) => {
                let text = normalize(&text);
                Ok(CompiledTemplate::new(move |_| Ok(text.clone())))
            }
            Output::Function(function) => Ok(self.wrap_function(function, settings)),
            Output::Object(object) => Ok(self.wrap_object(object, source, settings, entry, depth)),
            Output::Pending | Output::Null => Err(RenderError::gap(
                self.name(),
                "compile",
                "implementation returned no template",
            )),
        }
    }

    fn synthesize_compile(
        &self,
        source: &str,
        settings: &Settings,
        depth: u8,
    ) -> Result<CompiledTemplate> {
        if !self.descriptor().exposes(Method::Render) {
            return Err(RenderError::gap(
                self.name(),
                "compile",
                "neither compile nor render is available",
            ));
        }

        let adapter = self.clone();
        let source = source.to_string();
        let settings = settings.clone();
        Ok(CompiledTemplate::new(move |locals| {
            adapter.render_at(&source, locals, &settings, Entry::Source, depth)
        }))
    }

    fn wrap_function(&self, function: TemplateFn, settings: &Settings) -> CompiledTemplate {
        let adapter = self.clone();
        let settings = settings.clone();
        CompiledTemplate::new(move |locals| {
            let guard = adapter.gate();
            if guard.is_some() {
                adapter.apply(&settings)?;
            }
            function(locals)
                .map(|text| normalize(&text))
                .map_err(|e| adapter.adapt(e))
        })
    }

    fn wrap_object(
        &self,
        object: Arc<dyn CompiledObject>,
        source: &str,
        settings: &Settings,
        entry: Entry,
        depth: u8,
    ) -> CompiledTemplate {
        let adapter = self.clone();
        let source = source.to_string();
        let settings = settings.clone();
        CompiledTemplate::new(move |locals| {
            let mut args = Arguments::new(vec![Arg::Value(locals.clone())]);
            if let Some(index) = object.signature().position(ParameterRole::Partials) {
                args.set(index, Arg::Partials(PartialSet::scan(settings.basedir())?));
            }

            // The gate is released before any fallback, which takes it again.
            let rendered = {
                let guard = adapter.gate();
                if guard.is_some() {
                    adapter.apply(&settings)?;
                }
                object.render(args).map_err(|e| adapter.adapt(e))?
            };

            match rendered {
                Some(text) => Ok(normalize(&text)),
                None if depth == 0 => {
                    tracing::debug!(
                        implementation = adapter.name(),
                        "compiled template produced no output, rendering from source"
                    );
                    match entry {
                        Entry::Source => {
                            adapter.render_at(&source, locals, &settings, Entry::Source, 1)
                        }
                        Entry::File => adapter.render_path(Path::new(&source), locals, &settings, 1),
                    }
                }
                None => Err(RenderError::gap(
                    adapter.name(),
                    "render",
                    "compiled template produced no output twice",
                )),
            }
        })
    }

    // Native render or renderFile; `entry` selects which.
    fn render_at(
        &self,
        source: &str,
        locals: &Value,
        settings: &Settings,
        entry: Entry,
        depth: u8,
    ) -> Result<String> {
        let method = match entry {
            Entry::Source => Method::Render,
            Entry::File => Method::RenderFile,
        };

        let Some(signature) = self.descriptor().signature(method).cloned() else {
            return self.synthesize_render(source, locals, settings, depth);
        };

        let initial = vec![
            Arg::Text(source.to_string()),
            Arg::Value(locals.clone()),
            Arg::Value(settings.to_value()),
        ];
        let (args, completion) = self.shape(&signature, initial, false, settings)?;

        let _guard = self.gate();
        self.apply(settings)?;

        match self.call(method, args)? {
            Output::Text(text) => Ok(normalize(&text)),
            Output::Function(function) => function(locals)
                .map(|text| normalize(&text))
                .map_err(|e| self.adapt(e)),
            Output::Pending | Output::Null => match completion.and_then(|c| c.take()) {
                Some(result) => result
                    .map(|text| normalize(&text))
                    .map_err(|e| self.adapt(e)),
                None => Err(RenderError::gap(
                    self.name(),
                    "render",
                    "implementation returned no result",
                )),
            },
            Output::Object(_) => Err(RenderError::gap(
                self.name(),
                "render",
                "implementation returned a template object instead of text",
            )),
        }
    }

    fn synthesize_render(
        &self,
        source: &str,
        locals: &Value,
        settings: &Settings,
        depth: u8,
    ) -> Result<String> {
        if !self.descriptor().exposes(Method::Compile) {
            return Err(RenderError::gap(
                self.name(),
                "render",
                "neither render nor compile is available",
            ));
        }
        self.compile_at(source, settings, Entry::Source, depth)?
            .render(locals)
    }

    // compileFile: native, else read and compile, else defer to renderFile.
    fn compile_path(&self, path: &Path, settings: &Settings, depth: u8) -> Result<CompiledTemplate> {
        let descriptor = self.descriptor();
        if descriptor.exposes(Method::CompileFile) {
            return self.compile_at(&path.to_string_lossy(), settings, Entry::File, depth);
        }
        if descriptor.can_compile_or_render() {
            let source = read_template(path)?;
            return self.compile_at(&source, settings, Entry::Source, depth);
        }

        let adapter = self.clone();
        let path = path.to_path_buf();
        let settings = settings.clone();
        Ok(CompiledTemplate::new(move |locals| {
            adapter.render_path(&path, locals, &settings, depth)
        }))
    }

    // renderFile: native, else read and render, else compileFile then call.
    fn render_path(
        &self,
        path: &Path,
        locals: &Value,
        settings: &Settings,
        depth: u8,
    ) -> Result<String> {
        let descriptor = self.descriptor();
        if descriptor.exposes(Method::RenderFile) {
            return self.render_at(&path.to_string_lossy(), locals, settings, Entry::File, depth);
        }
        if descriptor.can_compile_or_render() {
            let source = read_template(path)?;
            return self.render_at(&source, locals, settings, Entry::Source, depth);
        }
        self.compile_at(&path.to_string_lossy(), settings, Entry::File, depth)?
            .render(locals)
    }
}

fn arg_value(arg: Option<Arg>) -> Value {
    match arg {
        Some(Arg::Value(value)) => value,
        _ => Value::Null,
    }
}

impl TemplateEngine for Adapter {
    fn name(&self) -> &str {
        self.descriptor().name()
    }

    fn configure(&self, settings: &Settings) -> Result<()> {
        let _guard = self.gate();
        self.apply(settings)
    }

    fn compile(&self, source: &str, settings: &Settings) -> Result<CompiledTemplate> {
        self.compile_at(source, settings, Entry::Source, 0)
    }

    fn render(&self, source: &str, locals: &Value, settings: &Settings) -> Result<String> {
        self.render_at(source, locals, settings, Entry::Source, 0)
    }

    fn compile_file(&self, path: &Path, settings: &Settings) -> Result<CompiledTemplate> {
        self.compile_path(path, &settings.for_file(path)?, 0)
    }

    fn render_file(&self, path: &Path, locals: &Value, settings: &Settings) -> Result<String> {
        self.render_path(path, locals, &settings.for_file(path)?, 0)
    }
}
