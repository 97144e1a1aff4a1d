//! Handlebars behind a compile-returns-function call shape.
//!
//! Partials live in the registry, so `configure` starts a fresh registry for
//! every base directory and the adapter re-registers that directory's
//! partials right after. Compiled functions render with whatever registry is
//! current when they run, which is the one their own settings just installed.

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use handlebars::{Handlebars, Template};

use super::describe;
use crate::implementation::{Arguments, ImplError, Output, RenderingImplementation, TemplateFn};
use crate::partials::strip_extension;
use crate::signature::{Descriptor, Method};

/// Stateful Handlebars implementation.
pub struct HandlebarsImpl {
    descriptor: Descriptor,
    state: Arc<RwLock<State>>,
}

struct State {
    registry: Handlebars<'static>,
    root: Option<PathBuf>,
}

impl HandlebarsImpl {
    pub fn new() -> Self {
        let descriptor = Descriptor::new("handlebars")
            .method(Method::Compile, &["template", "options"])
            .method(Method::RegisterPartial, &["name", "partial"])
            .method(Method::Configure, &["templates", "options"])
            .stateful();
        Self {
            descriptor,
            state: Arc::new(RwLock::new(State {
                registry: Handlebars::new(),
                root: None,
            })),
        }
    }

    pub fn has_partial(&self, name: &str) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .registry
            .has_template(name)
    }

    /// Directory the current partials were registered from.
    pub fn root(&self) -> Option<PathBuf> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .root
            .clone()
    }

    // Always a fresh registry: files removed from the same root must not
    // linger as partials either.
    fn configure(&self, args: &Arguments) -> Result<Output, ImplError> {
        let root = PathBuf::from(args.text(0)?);
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.registry = Handlebars::new();
        state.root = Some(root);
        Ok(Output::Null)
    }

    fn compile(&self, args: &Arguments) -> Result<Output, ImplError> {
        let source = args.text(0)?.to_string();
        Template::compile(&source).map_err(|e| describe(&e))?;

        let strict = args
            .object(1)
            .get("strict")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let state = Arc::clone(&self.state);
        let function: TemplateFn = Arc::new(move |locals: &serde_json::Value| {
            let mut state = state.write().unwrap_or_else(PoisonError::into_inner);
            state.registry.set_strict_mode(strict);
            state
                .registry
                .render_template(&source, locals)
                .map_err(|e| describe(&e))
        });
        Ok(Output::Function(function))
    }

    fn register_partial(&self, args: &Arguments) -> Result<Output, ImplError> {
        let name = args.text(0)?;
        let partial = args.text(1)?;
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let registry = &mut state.registry;

        registry
            .register_partial(name, partial)
            .map_err(|e| describe(&e))?;
        let stem = strip_extension(name);
        if stem != name {
            registry
                .register_partial(stem, partial)
                .map_err(|e| describe(&e))?;
        }
        Ok(Output::Null)
    }
}

impl Default for HandlebarsImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderingImplementation for HandlebarsImpl {
    fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    fn invoke(&self, method: Method, args: Arguments) -> Result<Output, ImplError> {
        match method {
            Method::Configure => self.configure(&args),
            Method::Compile => self.compile(&args),
            Method::RegisterPartial => self.register_partial(&args),
            other => Err(ImplError::new(format!("handlebars has no {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::implementation::Arg;
    use serde_json::json;

    #[test]
    fn test_compile_returns_function() {
        let engine = HandlebarsImpl::new();
        let output = engine
            .invoke(
                Method::Compile,
                Arguments::new(vec![Arg::Text("Hi {{name}}".into()), Arg::Value(json!({}))]),
            )
            .unwrap();
        let Output::Function(function) = output else {
            panic!("expected a function");
        };
        assert_eq!(function(&json!({"name": "Ann"})).unwrap(), "Hi Ann");
    }

    #[test]
    fn test_compile_rejects_bad_syntax() {
        let engine = HandlebarsImpl::new();
        let result = engine.invoke(
            Method::Compile,
            Arguments::new(vec![Arg::Text("{{#if ready}}unclosed".into())]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_register_partial_with_and_without_extension() {
        let engine = HandlebarsImpl::new();
        engine
            .invoke(
                Method::RegisterPartial,
                Arguments::new(vec![Arg::Text("header.hbs".into()), Arg::Text("<h1/>".into())]),
            )
            .unwrap();
        assert!(engine.has_partial("header.hbs"));
        assert!(engine.has_partial("header"));
    }

    #[test]
    fn test_configure_drops_partials_of_previous_root() {
        let engine = HandlebarsImpl::new();
        let configure = |root: &str| {
            engine
                .invoke(
                    Method::Configure,
                    Arguments::new(vec![Arg::Text(root.into()), Arg::Value(json!({}))]),
                )
                .unwrap();
        };

        configure("/views/a/");
        engine
            .invoke(
                Method::RegisterPartial,
                Arguments::new(vec![Arg::Text("header.hbs".into()), Arg::Text("A".into())]),
            )
            .unwrap();
        assert!(engine.has_partial("header"));

        configure("/views/b/");
        assert!(!engine.has_partial("header"));
        assert!(!engine.has_partial("header.hbs"));
        assert_eq!(engine.root(), Some(PathBuf::from("/views/b/")));
    }

    #[test]
    fn test_strict_mode_from_options() {
        let engine = HandlebarsImpl::new();
        let output = engine
            .invoke(
                Method::Compile,
                Arguments::new(vec![
                    Arg::Text("{{missing}}".into()),
                    Arg::Value(json!({"strict": true})),
                ]),
            )
            .unwrap();
        let Output::Function(function) = output else {
            panic!("expected a function");
        };
        assert!(function(&json!({})).is_err());
    }
}
