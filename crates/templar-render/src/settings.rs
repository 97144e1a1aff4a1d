//! Options and resolved settings.
//!
//! [`Options`] is what callers write: every field optional, unknown keys kept
//! as implementation options. [`Settings`] is what the adapter accepts: the
//! same data with `basedir` resolved to an absolute, lexically normalized
//! directory. Keeping the two apart means no implementation ever sees a
//! relative or unresolved base directory.
//!
//! # Base directory
//!
//! - With a `filename`, `basedir` is the directory containing that file.
//! - Otherwise it is `basedir`, or the current directory when unset.
//! - Relative paths are resolved against the current directory, `.` and `..`
//!   are removed, and trailing separators are dropped. Implementations receive
//!   it with exactly one trailing separator ([`Settings::basedir_string`]).
//!
//! # Example
//!
//! ```rust
//! use templar_render::{Options, Settings};
//!
//! let a = Settings::resolve(&Options::new().basedir("/tmp/views/")).unwrap();
//! let b = Settings::resolve(&Options::new().basedir("/tmp/views")).unwrap();
//! assert_eq!(a.basedir(), b.basedir());
//! assert_eq!(a.basedir_string(), "/tmp/views/");
//! ```

use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{RenderError, Result};

/// Where template data comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataSource {
    /// A directory of JSON files, relative to `basedir`.
    Directory(PathBuf),
    /// Inline data.
    Inline(Value),
}

/// Caller-supplied options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Options {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basedir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DataSource>,

    /// Middleware names, applied in order.
    #[serde(rename = "use", default, skip_serializing_if = "Vec::is_empty")]
    pub middleware: Vec<String>,

    /// Explicit implementation name; skips resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,

    /// Everything else, passed through to implementations.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn basedir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.basedir = Some(dir.into());
        self
    }

    pub fn filename(mut self, path: impl Into<PathBuf>) -> Self {
        self.filename = Some(path.into());
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(DataSource::Inline(data));
        self
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data = Some(DataSource::Directory(dir.into()));
        self
    }

    pub fn middleware(mut self, name: impl Into<String>) -> Self {
        self.middleware.push(name.into());
        self
    }

    pub fn engine(mut self, name: impl Into<String>) -> Self {
        self.engine = Some(name.into());
        self
    }

    /// Sets an implementation-specific option.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Parses options from YAML (or JSON, which is valid YAML).
    pub fn from_yaml(source: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(source)?)
    }

    /// Converts a JSON object into options.
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Returns `self` overridden by `overrides`; keys set in `overrides` win.
    pub fn merged_with(&self, overrides: &Options) -> Options {
        let mut extra = self.extra.clone();
        for (key, value) in &overrides.extra {
            extra.insert(key.clone(), value.clone());
        }
        Options {
            basedir: overrides.basedir.clone().or_else(|| self.basedir.clone()),
            filename: overrides.filename.clone().or_else(|| self.filename.clone()),
            data: overrides.data.clone().or_else(|| self.data.clone()),
            middleware: if overrides.middleware.is_empty() {
                self.middleware.clone()
            } else {
                overrides.middleware.clone()
            },
            engine: overrides.engine.clone().or_else(|| self.engine.clone()),
            extra,
        }
    }
}

/// Fully resolved settings for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    basedir: PathBuf,
    filename: Option<PathBuf>,
    data: Option<DataSource>,
    middleware: Vec<String>,
    engine: Option<String>,
    extra: Map<String, Value>,
}

impl Settings {
    /// Resolves options against the process's current directory.
    pub fn resolve(options: &Options) -> Result<Self> {
        let cwd = std::env::current_dir().map_err(|e| RenderError::io(".", e))?;
        Ok(Self::resolve_from(options, &cwd))
    }

    /// Resolves options against an explicit working directory.
    pub fn resolve_from(options: &Options, cwd: &Path) -> Self {
        let dir = match (&options.filename, &options.basedir) {
            (Some(file), _) => file.parent().map(Path::to_path_buf).unwrap_or_default(),
            (None, Some(dir)) => dir.clone(),
            (None, None) => cwd.to_path_buf(),
        };

        Self {
            basedir: absolute(&dir, cwd),
            filename: options.filename.clone(),
            data: options.data.clone(),
            middleware: options.middleware.clone(),
            engine: options.engine.clone(),
            extra: options.extra.clone(),
        }
    }

    /// Settings for rendering the file at `path`: `filename` is set and
    /// `basedir` becomes the file's directory.
    pub fn for_file(&self, path: &Path) -> Result<Self> {
        let cwd = std::env::current_dir().map_err(|e| RenderError::io(".", e))?;
        Ok(self.for_file_from(path, &cwd))
    }

    /// Like [`for_file`](Self::for_file), with an explicit working directory.
    pub fn for_file_from(&self, path: &Path, cwd: &Path) -> Self {
        let mut settings = self.clone();
        let file = absolute(path, cwd);
        if let Some(parent) = file.parent() {
            settings.basedir = parent.to_path_buf();
        }
        settings.filename = Some(path.to_path_buf());
        settings
    }

    /// Absolute base directory without trailing separator.
    pub fn basedir(&self) -> &Path {
        &self.basedir
    }

    /// Base directory with exactly one trailing separator.
    pub fn basedir_string(&self) -> String {
        let dir = self.basedir.to_string_lossy();
        if dir.ends_with(MAIN_SEPARATOR) {
            dir.into_owned()
        } else {
            format!("{dir}{MAIN_SEPARATOR}")
        }
    }

    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    pub fn data(&self) -> Option<&DataSource> {
        self.data.as_ref()
    }

    pub fn middleware(&self) -> &[String] {
        &self.middleware
    }

    pub fn engine(&self) -> Option<&str> {
        self.engine.as_deref()
    }

    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// The options object handed to implementations.
    pub fn to_value(&self) -> Value {
        let mut map = self.remaining();
        map.insert("basedir".into(), Value::String(self.basedir_string()));
        Value::Object(map)
    }

    /// Everything except `basedir`, as passed next to it to `configure`.
    pub fn remaining_value(&self) -> Value {
        Value::Object(self.remaining())
    }

    fn remaining(&self) -> Map<String, Value> {
        let mut map = self.extra.clone();
        if let Some(filename) = &self.filename {
            map.insert(
                "filename".into(),
                Value::String(filename.to_string_lossy().into_owned()),
            );
        }
        map
    }
}

fn absolute(path: &Path, cwd: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };
    clean(&joined)
}

// Lexical normalization, like path.resolve: no filesystem access.
fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
