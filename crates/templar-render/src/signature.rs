//! Parameter signatures and capability descriptors.
//!
//! Every rendering implementation publishes a [`Descriptor`]: the set of
//! [`Method`]s it exposes, each with the ordered parameter list of its native
//! call shape. The adapter reads the *roles* of those parameters (where the
//! options go, where locals go, whether a callback or a partials map is
//! expected) and builds argument lists accordingly.
//!
//! Roles are normally declared by the author of an implementation with
//! [`ParameterSignature::declared`]. For implementations whose authors only
//! know the parameter *names*, [`ParameterSignature::infer`] classifies each
//! name against a fixed set of patterns. Inference is best-effort: a name such
//! as `metadata` is read as locals because it contains `data`.
//!
//! | Role | Name pattern (case-insensitive substring) |
//! |------|--------------------------------------------|
//! | [`ParameterRole::Partials`] | `partials` |
//! | [`ParameterRole::Callback`] | `callback`, `cb` |
//! | [`ParameterRole::Options`] | `options`, `opts` |
//! | [`ParameterRole::Locals`] | `locals`, `data` |
//! | [`ParameterRole::TemplatePath`] | `templates`, `views` |
//! | [`ParameterRole::TemplateString`] | `str` |

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

/// Semantic classification of one parameter position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterRole {
    /// Engine options (`options`, `opts`).
    Options,
    /// Template locals / data (`locals`, `data`).
    Locals,
    /// Completion callback (`callback`, `cb`).
    Callback,
    /// Map of partial name to partial source (`partials`).
    Partials,
    /// Raw template source (`str`).
    TemplateString,
    /// Directory templates are loaded from (`templates`, `views`).
    TemplatePath,
    /// Nothing matched.
    Unclassified,
}

// Checked in order; the first match wins.
static ROLE_PATTERNS: Lazy<Vec<(ParameterRole, Regex)>> = Lazy::new(|| {
    [
        (ParameterRole::Partials, r"(?i)partials"),
        (ParameterRole::Callback, r"(?i)(callback|cb)"),
        (ParameterRole::Options, r"(?i)(options|opts)"),
        (ParameterRole::Locals, r"(?i)(locals|data)"),
        (ParameterRole::TemplatePath, r"(?i)(templates|views)"),
        (ParameterRole::TemplateString, r"(?i)str"),
    ]
    .into_iter()
    .map(|(role, pattern)| (role, Regex::new(pattern).expect("role pattern is valid")))
    .collect()
});

impl ParameterRole {
    /// Classifies a declared parameter name.
    pub fn classify(name: &str) -> Self {
        ROLE_PATTERNS
            .iter()
            .find(|(_, pattern)| pattern.is_match(name))
            .map(|(role, _)| *role)
            .unwrap_or(ParameterRole::Unclassified)
    }
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub role: ParameterRole,
}

/// Ordered parameter list of a native method, with a role per position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSignature {
    params: Vec<Parameter>,
}

impl ParameterSignature {
    /// Builds a signature from parameter names, classifying each by name.
    ///
    /// This is the fallback for implementations that do not declare roles.
    pub fn infer<S: AsRef<str>>(names: &[S]) -> Self {
        let params = names
            .iter()
            .map(|name| Parameter {
                name: name.as_ref().to_string(),
                role: ParameterRole::classify(name.as_ref()),
            })
            .collect();
        Self { params }
    }

    /// Builds a signature from explicitly declared roles.
    pub fn declared(params: &[(&str, ParameterRole)]) -> Self {
        let params = params
            .iter()
            .map(|(name, role)| Parameter {
                name: (*name).to_string(),
                role: *role,
            })
            .collect();
        Self { params }
    }

    /// Number of declared parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    /// Index of the first parameter with the given role.
    pub fn position(&self, role: ParameterRole) -> Option<usize> {
        self.params.iter().position(|p| p.role == role)
    }

    pub fn has(&self, role: ParameterRole) -> bool {
        self.position(role).is_some()
    }
}

/// A method of the native contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Method {
    Compile,
    Render,
    CompileFile,
    RenderFile,
    CompileString,
    RenderString,
    Configure,
    RegisterPartial,
}

impl Method {
    /// The `<method>String` sibling tried when a method reports "not found".
    pub fn string_variant(self) -> Option<Method> {
        match self {
            Method::Compile => Some(Method::CompileString),
            Method::Render => Some(Method::RenderString),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Compile => "compile",
            Method::Render => "render",
            Method::CompileFile => "compileFile",
            Method::RenderFile => "renderFile",
            Method::CompileString => "compileString",
            Method::RenderString => "renderString",
            Method::Configure => "configure",
            Method::RegisterPartial => "registerPartial",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability descriptor of a rendering implementation.
///
/// # Example
///
/// ```rust
/// use templar_render::{Descriptor, Method, ParameterRole};
///
/// let descriptor = Descriptor::new("pug")
///     .method(Method::Compile, &["str", "options"])
///     .method(Method::Render, &["str", "options", "fn"]);
///
/// let compile = descriptor.signature(Method::Compile).unwrap();
/// assert_eq!(compile.position(ParameterRole::Options), Some(1));
/// assert!(!descriptor.exposes(Method::Configure));
/// ```
#[derive(Debug, Clone)]
pub struct Descriptor {
    name: String,
    methods: BTreeMap<Method, ParameterSignature>,
    stateful: bool,
}

impl Descriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: BTreeMap::new(),
            stateful: false,
        }
    }

    /// Adds a method whose roles are inferred from parameter names.
    pub fn method(self, method: Method, params: &[&str]) -> Self {
        self.with_signature(method, ParameterSignature::infer(params))
    }

    /// Adds a method with an explicit signature.
    pub fn with_signature(mut self, method: Method, signature: ParameterSignature) -> Self {
        self.methods.insert(method, signature);
        self
    }

    /// Marks the implementation as keeping configuration between calls.
    ///
    /// The adapter serializes "configure then call" for stateful
    /// implementations.
    pub fn stateful(mut self) -> Self {
        self.stateful = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_stateful(&self) -> bool {
        self.stateful
    }

    pub fn exposes(&self, method: Method) -> bool {
        self.methods.contains_key(&method)
    }

    pub fn signature(&self, method: Method) -> Option<&ParameterSignature> {
        self.methods.get(&method)
    }

    /// Whether the implementation can compile or render inline source.
    pub fn can_compile_or_render(&self) -> bool {
        self.exposes(Method::Compile) || self.exposes(Method::Render)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_names() {
        assert_eq!(ParameterRole::classify("options"), ParameterRole::Options);
        assert_eq!(ParameterRole::classify("opts"), ParameterRole::Options);
        assert_eq!(ParameterRole::classify("Locals"), ParameterRole::Locals);
        assert_eq!(ParameterRole::classify("data"), ParameterRole::Locals);
        assert_eq!(ParameterRole::classify("callback"), ParameterRole::Callback);
        assert_eq!(ParameterRole::classify("cb"), ParameterRole::Callback);
        assert_eq!(ParameterRole::classify("partials"), ParameterRole::Partials);
        assert_eq!(ParameterRole::classify("str"), ParameterRole::TemplateString);
        assert_eq!(ParameterRole::classify("views"), ParameterRole::TemplatePath);
        assert_eq!(ParameterRole::classify("template"), ParameterRole::Unclassified);
        assert_eq!(ParameterRole::classify("fn"), ParameterRole::Unclassified);
    }

    #[test]
    fn test_classify_is_substring_match() {
        assert_eq!(ParameterRole::classify("renderOptions"), ParameterRole::Options);
        assert_eq!(ParameterRole::classify("templateData"), ParameterRole::Locals);
        assert_eq!(ParameterRole::classify("PARTIALS"), ParameterRole::Partials);
    }

    #[test]
    fn test_infer_positions() {
        let sig = ParameterSignature::infer(&["template", "locals", "partials", "callback"]);
        assert_eq!(sig.len(), 4);
        assert_eq!(sig.position(ParameterRole::Locals), Some(1));
        assert_eq!(sig.position(ParameterRole::Partials), Some(2));
        assert_eq!(sig.position(ParameterRole::Callback), Some(3));
        assert_eq!(sig.position(ParameterRole::Options), None);
    }

    #[test]
    fn test_declared_overrides_names() {
        let sig = ParameterSignature::declared(&[
            ("a", ParameterRole::TemplateString),
            ("b", ParameterRole::Options),
        ]);
        assert_eq!(sig.position(ParameterRole::Options), Some(1));
        assert_eq!(sig.params()[0].name, "a");
    }

    #[test]
    fn test_string_variant() {
        assert_eq!(Method::Render.string_variant(), Some(Method::RenderString));
        assert_eq!(Method::Compile.string_variant(), Some(Method::CompileString));
        assert_eq!(Method::Configure.string_variant(), None);
        assert_eq!(Method::RenderString.to_string(), "renderString");
    }

    #[test]
    fn test_descriptor_capabilities() {
        let d = Descriptor::new("only-file").method(Method::RenderFile, &["path", "locals"]);
        assert!(!d.can_compile_or_render());
        assert!(!d.is_stateful());

        let d = Descriptor::new("eco").method(Method::Render, &["str", "data"]).stateful();
        assert!(d.can_compile_or_render());
        assert!(d.is_stateful());
        assert_eq!(d.name(), "eco");
    }
}
