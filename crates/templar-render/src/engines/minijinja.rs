//! MiniJinja behind a named-template call shape.
//!
//! `render` takes a template *name*, looked up through a loader rooted at the
//! configured base directory. Inline source is not a name the loader knows,
//! so it fails with "template not found" and the adapter retries through
//! `renderString`.

use std::path::{Component, Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use minijinja::{Environment, Value};

use super::describe;
use crate::implementation::{Arguments, ImplError, Output, RenderingImplementation};
use crate::signature::{Descriptor, Method};

/// Stateful MiniJinja implementation.
pub struct MiniJinja {
    descriptor: Descriptor,
    state: RwLock<State>,
}

struct State {
    env: Environment<'static>,
    root: Option<PathBuf>,
}

impl MiniJinja {
    pub fn new() -> Self {
        let descriptor = Descriptor::new("minijinja")
            .method(Method::Render, &["name", "data"])
            .method(Method::RenderString, &["str", "data"])
            .method(Method::Configure, &["templates", "options"])
            .stateful();
        Self {
            descriptor,
            state: RwLock::new(State {
                env: Environment::new(),
                root: None,
            }),
        }
    }

    /// Directory templates are currently loaded from.
    pub fn root(&self) -> Option<PathBuf> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .root
            .clone()
    }

    fn configure(&self, args: &Arguments) -> Result<Output, ImplError> {
        let root = PathBuf::from(args.text(0)?);
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.root.as_ref() != Some(&root) {
            // A fresh environment drops templates cached from the old root.
            let mut env = Environment::new();
            let loader_root = root.clone();
            env.set_loader(move |name| Ok(load(&loader_root, name)));
            state.env = env;
            state.root = Some(root);
        }
        Ok(Output::Null)
    }

    fn render(&self, args: &Arguments) -> Result<Output, ImplError> {
        let name = args.text(0)?;
        let context = Value::from_serialize(args.value(1));
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let template = state.env.get_template(name).map_err(|e| describe(&e))?;
        let text = template.render(context).map_err(|e| describe(&e))?;
        Ok(Output::Text(text))
    }

    fn render_string(&self, args: &Arguments) -> Result<Output, ImplError> {
        let source = args.text(0)?;
        let context = Value::from_serialize(args.value(1));
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let text = state
            .env
            .render_str(source, context)
            .map_err(|e| describe(&e))?;
        Ok(Output::Text(text))
    }
}

impl Default for MiniJinja {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderingImplementation for MiniJinja {
    fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    fn invoke(&self, method: Method, args: Arguments) -> Result<Output, ImplError> {
        match method {
            Method::Configure => self.configure(&args),
            Method::Render => self.render(&args),
            Method::RenderString => self.render_string(&args),
            other => Err(ImplError::new(format!("minijinja has no {other}"))),
        }
    }
}

// Anything that is not a readable file below `root` is simply unknown.
fn load(root: &Path, name: &str) -> Option<String> {
    if name.contains('\n') {
        return None;
    }
    let relative = Path::new(name);
    let safe = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !safe {
        return None;
    }
    std::fs::read_to_string(root.join(relative)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::implementation::Arg;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn args(items: Vec<Arg>) -> Arguments {
        Arguments::new(items)
    }

    #[test]
    fn test_inline_source_is_not_found() {
        let engine = MiniJinja::new();
        let err = engine
            .invoke(
                Method::Render,
                args(vec![Arg::Text("Hello {{ name }}".into()), Arg::Value(json!({}))]),
            )
            .unwrap_err();
        assert!(err.message().contains("not found"), "{}", err.message());
    }

    #[test]
    fn test_render_string() {
        let engine = MiniJinja::new();
        let output = engine
            .invoke(
                Method::RenderString,
                args(vec![
                    Arg::Text("Hello {{ name }}".into()),
                    Arg::Value(json!({"name": "World"})),
                ]),
            )
            .unwrap();
        assert!(matches!(output, Output::Text(text) if text == "Hello World"));
    }

    #[test]
    fn test_configure_then_render_named() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("page.j2"), "{{ title }}!").unwrap();

        let engine = MiniJinja::new();
        engine
            .invoke(
                Method::Configure,
                args(vec![
                    Arg::Text(dir.path().to_string_lossy().into_owned()),
                    Arg::Value(json!({})),
                ]),
            )
            .unwrap();
        assert_eq!(engine.root().as_deref(), Some(dir.path()));

        let output = engine
            .invoke(
                Method::Render,
                args(vec![Arg::Text("page.j2".into()), Arg::Value(json!({"title": "Hi"}))]),
            )
            .unwrap();
        assert!(matches!(output, Output::Text(text) if text == "Hi!"));
    }

    #[test]
    fn test_loader_rejects_escaping_names() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("views")).unwrap();
        fs::write(dir.path().join("secret.txt"), "x").unwrap();

        let root = dir.path().join("views");
        assert_eq!(load(&root, "../secret.txt"), None);
        assert_eq!(load(&root, "/etc/passwd"), None);
        assert_eq!(load(&root, "missing.j2"), None);
    }
}
