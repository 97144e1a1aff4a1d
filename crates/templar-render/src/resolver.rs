//! Engine resolution: picking an implementation for a template file.
//!
//! Discovery reads package manifests from a [`ManifestSource`] once and keeps
//! the candidates whose metadata looks template-related and whose module can
//! compile or render. Selection then scores each candidate's *name* against
//! terms derived from the filename:
//!
//! - the extension (`hbs`)
//! - the MIME subtype of that extension with `text/`, `x-` and `-template`
//!   stripped (`text/x-handlebars-template` → `handlebars`)
//!
//! | Term vs. name | Similarity |
//! |---------------|------------|
//! | equal | `1.0` |
//! | term is a substring of name | `0.85` |
//! | otherwise | `(len(name) - len(term)) / levenshtein(term, name)` |
//!
//! The file score is the mean over terms. Ties keep discovery order, so the
//! first-registered candidate wins.
//!
//! # Example
//!
//! ```rust
//! use templar_render::{CandidatePackage, Resolver};
//!
//! let resolver = Resolver::new(
//!     vec![
//!         CandidatePackage::new("pug", "", &["template"]),
//!         CandidatePackage::new("handlebars", "", &["templating"]),
//!     ],
//!     |_name: &str| true,
//! );
//!
//! assert_eq!(resolver.resolve(Some("view.hbs".as_ref())).unwrap().as_deref(), Some("handlebars"));
//! assert_eq!(resolver.resolve(None).unwrap().as_deref(), Some("pug"));
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{RenderError, Result};

static ENGINE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new("template").expect("engine pattern is valid"));

/// Known template-related extensions and their MIME types.
pub const MIME_TYPES: &[(&str, &str)] = &[
    ("hbs", "text/x-handlebars-template"),
    ("handlebars", "text/x-handlebars-template"),
    ("mustache", "text/x-mustache"),
    ("jinja", "text/x-jinja"),
    ("j2", "text/x-jinja"),
    ("njk", "text/x-nunjucks"),
    ("tera", "text/x-tera"),
    ("pug", "text/x-pug"),
    ("jade", "text/jade"),
    ("ejs", "text/x-ejs-template"),
    ("liquid", "text/x-liquid"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("xml", "text/xml"),
    ("css", "text/css"),
    ("csv", "text/csv"),
    ("md", "text/markdown"),
    ("markdown", "text/markdown"),
    ("txt", "text/plain"),
    ("text", "text/plain"),
    ("json", "application/json"),
    ("yaml", "text/yaml"),
    ("yml", "text/yaml"),
];

/// MIME type registered for an extension (case-insensitive).
pub fn mime_type(extension: &str) -> Option<&'static str> {
    MIME_TYPES
        .iter()
        .find(|(ext, _)| ext.eq_ignore_ascii_case(extension))
        .map(|(_, mime)| *mime)
}

/// Declared metadata of an installed package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidatePackage {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl CandidatePackage {
    pub fn new(name: impl Into<String>, description: impl Into<String>, keywords: &[&str]) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// 1 for a template-related description, plus 1 per template-related keyword.
    pub fn package_score(&self) -> usize {
        usize::from(ENGINE_PATTERN.is_match(&self.description))
            + self
                .keywords
                .iter()
                .filter(|k| ENGINE_PATTERN.is_match(k))
                .count()
    }

    /// Fitness of this package for `filename`; 0 when no term can be derived.
    pub fn file_score(&self, filename: &Path) -> f64 {
        let terms = file_terms(filename);
        if terms.is_empty() {
            return 0.0;
        }
        let total: f64 = terms.iter().map(|term| similarity(term, &self.name)).sum();
        total / terms.len() as f64
    }
}

/// Unique, non-empty scoring terms for a filename.
pub fn file_terms(filename: &Path) -> Vec<String> {
    let extension = filename
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();

    let mime_term = MIME_TYPES
        .iter()
        .find(|(ext, _)| ext.eq_ignore_ascii_case(extension))
        .filter(|(ext, _)| *ext == extension)
        .map(|(_, mime)| mime_subtype(mime))
        .unwrap_or_default();

    let mut seen = BTreeSet::new();
    [extension.to_string(), mime_term]
        .into_iter()
        .filter(|term| !term.is_empty() && seen.insert(term.clone()))
        .collect()
}

fn mime_subtype(mime: &str) -> String {
    let subtype = mime.strip_prefix("text/").unwrap_or(mime);
    let subtype = subtype.strip_prefix("x-").unwrap_or(subtype);
    subtype.strip_suffix("-template").unwrap_or(subtype).to_string()
}

/// Similarity of a filename term to a package name.
pub fn similarity(term: &str, name: &str) -> f64 {
    if name == term {
        1.0
    } else if name.contains(term) {
        0.85
    } else {
        let distance = strsim::levenshtein(term, name);
        (name.chars().count() as f64 - term.chars().count() as f64) / distance as f64
    }
}

/// Where package manifests come from.
pub trait ManifestSource: Send + Sync {
    fn manifests(&self) -> Result<Vec<CandidatePackage>>;
}

impl ManifestSource for Vec<CandidatePackage> {
    fn manifests(&self) -> Result<Vec<CandidatePackage>> {
        Ok(self.clone())
    }
}

/// Manifests stored as `<root>/<package>/manifest.json`.
///
/// Packages are discovered in directory-name order.
#[derive(Debug, Clone)]
pub struct ManifestDir {
    root: PathBuf,
}

impl ManifestDir {
    pub const MANIFEST_FILE: &'static str = "manifest.json";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ManifestSource for ManifestDir {
    fn manifests(&self) -> Result<Vec<CandidatePackage>> {
        let entries = std::fs::read_dir(&self.root).map_err(|e| RenderError::io(&self.root, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| RenderError::io(&self.root, e))?;
            let manifest = entry.path().join(Self::MANIFEST_FILE);
            if manifest.is_file() {
                files.push(manifest);
            }
        }
        files.sort();

        files
            .iter()
            .map(|path| {
                let content =
                    std::fs::read_to_string(path).map_err(|e| RenderError::io(path, e))?;
                Ok(serde_json::from_str(&content)?)
            })
            .collect()
    }
}

type Capability = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Chooses an implementation name for a file.
///
/// `capable` answers whether the module named by a package exposes `compile`
/// or `render`; packages failing it are never candidates.
pub struct Resolver {
    source: Box<dyn ManifestSource>,
    capable: Capability,
    candidates: OnceCell<Vec<CandidatePackage>>,
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("candidates", &self.candidates.get())
            .finish_non_exhaustive()
    }
}

impl Resolver {
    pub fn new(
        source: impl ManifestSource + 'static,
        capable: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            source: Box::new(source),
            capable: Box::new(capable),
            candidates: OnceCell::new(),
        }
    }

    /// Discovered candidates in discovery order; computed on first use.
    pub fn candidates(&self) -> Result<&[CandidatePackage]> {
        let candidates = self.candidates.get_or_try_init(|| {
            let discovered: Vec<CandidatePackage> = self
                .source
                .manifests()?
                .into_iter()
                .filter(|package| package.package_score() > 0 && (self.capable)(&package.name))
                .collect();
            tracing::debug!(
                candidates = ?discovered.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
                "discovered rendering implementations"
            );
            Ok::<_, RenderError>(discovered)
        })?;
        Ok(candidates)
    }

    /// Name of the best implementation for `filename`.
    ///
    /// Without a filename, the first discovered candidate. `None` when nothing
    /// qualifies.
    pub fn resolve(&self, filename: Option<&Path>) -> Result<Option<String>> {
        let candidates = self.candidates()?;

        let Some(filename) = filename else {
            return Ok(candidates.first().map(|p| p.name.clone()));
        };

        let mut scored: Vec<(f64, &CandidatePackage)> = candidates
            .iter()
            .map(|package| (package.file_score(filename), package))
            .collect();
        // Stable: equal scores keep discovery order.
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        let pick = scored
            .first()
            .filter(|(score, _)| *score > 0.0)
            .map(|(_, package)| package.name.clone());
        tracing::debug!(filename = %filename.display(), pick = ?pick, "resolved implementation");
        Ok(pick)
    }

    /// Like [`resolve`](Self::resolve), but an empty resolution is an error.
    pub fn require(&self, filename: Option<&Path>) -> Result<String> {
        self.resolve(filename)?
            .ok_or_else(|| RenderError::NoImplementation {
                filename: filename.map(Path::to_path_buf),
            })
    }
}
