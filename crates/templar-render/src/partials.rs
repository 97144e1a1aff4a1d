//! Partial discovery.
//!
//! A [`PartialSet`] maps the relative path of every text file below a base
//! directory to its contents. Names always use `/` as separator, so
//! `views/shared/header.hbs` scanned from `views/` is named `shared/header.hbs`.
//!
//! Dependency and vendor subtrees ([`EXCLUDED_DIRS`]) are skipped, as are
//! files without an extension and files that look binary (a NUL byte, or
//! content that is not UTF-8).

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{RenderError, Result};
use crate::resolver::mime_type;

/// Directory names never descended into while scanning.
pub const EXCLUDED_DIRS: &[&str] = &["node_modules", "vendor", "target", ".git"];

/// Named template fragments loaded from a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialSet {
    entries: BTreeMap<String, String>,
}

impl PartialSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans `dir` recursively for partials.
    ///
    /// A directory that does not exist yields an empty set.
    pub fn scan(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut set = PartialSet::new();
        if !dir.is_dir() {
            return Ok(set);
        }
        scan_recursive(dir, dir, &mut set)?;
        tracing::trace!(dir = %dir.display(), count = set.len(), "scanned partials");
        Ok(set)
    }

    pub fn insert(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.entries.insert(name.into(), source.into());
    }

    /// Exact lookup by relative path.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Lookup by relative path, with or without extension.
    ///
    /// When several files share a stem (`header.hbs`, `header.txt`), the
    /// first in name order wins.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.get(name).or_else(|| {
            self.entries
                .iter()
                .find(|(key, _)| strip_extension(key) == name)
                .map(|(_, source)| source.as_str())
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, source)| (name.as_str(), source.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PartialSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = PartialSet::new();
        for (name, source) in iter {
            set.insert(name, source);
        }
        set
    }
}

/// Removes the last extension of a relative name (`a/b.hbs` → `a/b`).
pub fn strip_extension(name: &str) -> &str {
    let file_start = name.rfind('/').map(|i| i + 1).unwrap_or(0);
    match name[file_start..].rfind('.') {
        Some(dot) if dot > 0 => &name[..file_start + dot],
        _ => name,
    }
}

fn scan_recursive(current: &Path, root: &Path, set: &mut PartialSet) -> Result<()> {
    let entries = std::fs::read_dir(current).map_err(|e| RenderError::io(current, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| RenderError::io(current, e))?;
        let path = entry.path();
        // `file_type` does not follow links, so a link back up the tree is
        // never descended. Linked files are still read.
        let file_type = entry.file_type().map_err(|e| RenderError::io(&path, e))?;

        if file_type.is_dir() {
            let excluded = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| EXCLUDED_DIRS.contains(&n));
            if !excluded {
                scan_recursive(&path, root, set)?;
            }
        } else if file_type.is_file() || (file_type.is_symlink() && path.is_file()) {
            if let Some((name, source)) = read_partial(&path, root)? {
                set.insert(name, source);
            }
        }
    }

    Ok(())
}

fn read_partial(path: &Path, root: &Path) -> Result<Option<(String, String)>> {
    let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
        return Ok(None);
    };
    let Ok(relative) = path.strip_prefix(root) else {
        return Ok(None);
    };

    let bytes = std::fs::read(path).map_err(|e| RenderError::io(path, e))?;
    let declared_text = mime_type(extension).is_some_and(|mime| mime.starts_with("text/"));
    if !declared_text && looks_binary(&bytes) {
        return Ok(None);
    }
    let Ok(source) = String::from_utf8(bytes) else {
        return Ok(None);
    };

    let name = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    Ok(Some((name, source)))
}

// Same heuristic as most binary sniffers: a NUL byte early in the file.
fn looks_binary(bytes: &[u8]) -> bool {
    bytes.iter().take(8000).any(|b| *b == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("shared")).unwrap();
        fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        fs::write(dir.path().join("header.hbs"), "<h1>{{title}}</h1>").unwrap();
        fs::write(dir.path().join("shared/footer.html"), "<footer/>").unwrap();
        fs::write(dir.path().join("node_modules/pkg/index.hbs"), "ignored").unwrap();
        fs::write(dir.path().join("logo.png"), [0x89u8, 0x50, 0x00, 0x01]).unwrap();
        fs::write(dir.path().join("README"), "no extension").unwrap();
        dir
    }

    #[test]
    fn test_scan_collects_text_files() {
        let dir = fixture();
        let set = PartialSet::scan(dir.path()).unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.get("header.hbs"), Some("<h1>{{title}}</h1>"));
        assert_eq!(set.get("shared/footer.html"), Some("<footer/>"));
    }

    #[test]
    fn test_scan_skips_dependencies_and_binaries() {
        let dir = fixture();
        let set = PartialSet::scan(dir.path()).unwrap();

        assert!(set.get("node_modules/pkg/index.hbs").is_none());
        assert!(set.get("logo.png").is_none());
        assert!(set.get("README").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_does_not_follow_directory_links() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.hbs"), "a").unwrap();
        fs::write(dir.path().join("target.txt"), "linked").unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("loop")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("target.txt"), dir.path().join("alias.txt"))
            .unwrap();

        let set = PartialSet::scan(dir.path()).unwrap();
        let names: Vec<_> = set.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a.hbs", "alias.txt", "target.txt"]);
    }

    #[test]
    fn test_scan_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let set = PartialSet::scan(dir.path().join("nope")).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_lookup_without_extension() {
        let set: PartialSet = [("shared/footer.html", "f"), ("header.hbs", "h")]
            .into_iter()
            .collect();
        assert_eq!(set.lookup("header"), Some("h"));
        assert_eq!(set.lookup("shared/footer"), Some("f"));
        assert_eq!(set.lookup("header.hbs"), Some("h"));
        assert_eq!(set.lookup("footer"), None);
    }

    #[test]
    fn test_strip_extension() {
        assert_eq!(strip_extension("a/b.hbs"), "a/b");
        assert_eq!(strip_extension("b.tar.gz"), "b.tar");
        assert_eq!(strip_extension("dir.d/file"), "dir.d/file");
        assert_eq!(strip_extension(".hidden"), ".hidden");
    }
}
