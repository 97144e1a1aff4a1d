//! The native side of the adapter: what a rendering implementation exposes.
//!
//! A [`RenderingImplementation`] publishes a [`Descriptor`] and answers one
//! positional entry point, [`RenderingImplementation::invoke`]. Arguments
//! arrive already reshaped by the adapter into the implementation's declared
//! call shape, so an implementation only unpacks positions:
//!
//! ```rust
//! use templar_render::{
//!     Arguments, Descriptor, ImplError, Method, Output, RenderingImplementation,
//! };
//!
//! struct Shout {
//!     descriptor: Descriptor,
//! }
//!
//! impl RenderingImplementation for Shout {
//!     fn descriptor(&self) -> &Descriptor {
//!         &self.descriptor
//!     }
//!
//!     fn invoke(&self, method: Method, args: Arguments) -> Result<Output, ImplError> {
//!         match method {
//!             Method::Render => Ok(Output::Text(args.text(0)?.to_uppercase())),
//!             other => Err(ImplError::new(format!("{other} not supported"))),
//!         }
//!     }
//! }
//!
//! let shout = Shout {
//!     descriptor: Descriptor::new("shout").method(Method::Render, &["str", "data"]),
//! };
//! assert!(shout.descriptor().can_compile_or_render());
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::{Map, Value};
use thiserror::Error;

use crate::partials::PartialSet;
use crate::signature::{Descriptor, Method, ParameterSignature};

/// An error raised by a rendering implementation.
///
/// Only the message matters to the adapter: a message containing a
/// "not found" phrase triggers the `<method>String` fallback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ImplError {
    message: String,
}

impl ImplError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Callable produced by a native `compile`.
pub type TemplateFn = Arc<dyn Fn(&Value) -> Result<String, ImplError> + Send + Sync>;

/// A compiled template object exposing its own `render` method.
///
/// Returning `Ok(None)` from [`render`](Self::render) signals that the object
/// cannot produce inline output; the adapter then falls back to its own
/// `render` path with the original source.
pub trait CompiledObject: Send + Sync {
    /// Call shape of [`render`](Self::render).
    fn signature(&self) -> &ParameterSignature;

    fn render(&self, args: Arguments) -> Result<Option<String>, ImplError>;
}

/// Result of a native invocation.
pub enum Output {
    /// Rendered text.
    Text(String),
    /// A callable taking locals.
    Function(TemplateFn),
    /// An object with a `render` method.
    Object(Arc<dyn CompiledObject>),
    /// The result was delivered through the callback argument.
    Pending,
    /// No result.
    Null,
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Output::Function(_) => f.write_str("Function(..)"),
            Output::Object(_) => f.write_str("Object(..)"),
            Output::Pending => f.write_str("Pending"),
            Output::Null => f.write_str("Null"),
        }
    }
}

/// Callback handle passed at a callback-classified position.
///
/// Implementations answering through a callback call [`complete`](Self::complete)
/// and return [`Output::Pending`]. The adapter turns the completed value back
/// into a direct return.
#[derive(Clone, Default)]
pub struct Completion {
    slot: Arc<Mutex<Option<Result<String, ImplError>>>>,
}

impl Completion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn complete(&self, result: Result<String, ImplError>) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(result);
    }

    pub fn take(&self) -> Option<Result<String, ImplError>> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Completion(..)")
    }
}

/// One positional argument.
#[derive(Debug, Clone)]
pub enum Arg {
    Text(String),
    Value(Value),
    Partials(PartialSet),
    Callback(Completion),
    Missing,
}

/// Positional argument list for a native call.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    args: Vec<Arg>,
}

impl Arguments {
    pub fn new(args: Vec<Arg>) -> Self {
        Self { args }
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arg> {
        self.args.get(index)
    }

    pub fn as_slice(&self) -> &[Arg] {
        &self.args
    }

    /// Replaces the argument at `index`, padding with [`Arg::Missing`].
    pub fn set(&mut self, index: usize, arg: Arg) {
        if self.args.len() <= index {
            self.args.resize(index + 1, Arg::Missing);
        }
        self.args[index] = arg;
    }

    /// Text at `index`; errors if the position holds anything else.
    pub fn text(&self, index: usize) -> Result<&str, ImplError> {
        match self.args.get(index) {
            Some(Arg::Text(text)) => Ok(text),
            _ => Err(ImplError::new(format!("expected text at argument {index}"))),
        }
    }

    /// Value at `index`; a missing position reads as `null`.
    pub fn value(&self, index: usize) -> Value {
        match self.args.get(index) {
            Some(Arg::Value(value)) => value.clone(),
            Some(Arg::Text(text)) => Value::String(text.clone()),
            _ => Value::Null,
        }
    }

    /// Object at `index`; anything that is not an object reads as empty.
    pub fn object(&self, index: usize) -> Map<String, Value> {
        match self.args.get(index) {
            Some(Arg::Value(Value::Object(map))) => map.clone(),
            _ => Map::new(),
        }
    }

    pub fn partials(&self, index: usize) -> Option<&PartialSet> {
        match self.args.get(index) {
            Some(Arg::Partials(partials)) => Some(partials),
            _ => None,
        }
    }

    pub fn callback(&self, index: usize) -> Option<&Completion> {
        match self.args.get(index) {
            Some(Arg::Callback(completion)) => Some(completion),
            _ => None,
        }
    }
}

impl From<Vec<Arg>> for Arguments {
    fn from(args: Vec<Arg>) -> Self {
        Self::new(args)
    }
}

/// A third-party rendering implementation.
pub trait RenderingImplementation: Send + Sync {
    /// Which methods exist and their call shapes.
    fn descriptor(&self) -> &Descriptor;

    /// Invokes `method` with an argument list shaped after its signature.
    fn invoke(&self, method: Method, args: Arguments) -> Result<Output, ImplError>;
}

/// Shallow merge of two JSON objects; keys of `right` win.
pub(crate) fn merge_objects(left: &Value, right: &Value) -> Value {
    let mut merged = match left {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    if let Value::Object(map) = right {
        for (key, value) in map {
            merged.insert(key.clone(), value.clone());
        }
    }
    Value::Object(merged)
}
