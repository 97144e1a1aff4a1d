//! Template data loading.
//!
//! The `data` option is either inline JSON or a directory of `*.json` files.
//! A directory is read into one object where each file lands at the key path
//! of its relative location:
//!
//! | File | Key path |
//! |------|----------|
//! | `site.json` | `site` |
//! | `nav/main.json` | `nav.main` |
//! | `nav/index.json` | `nav` |
//! | `index.json` | (root) |
//!
//! Files are merged in path order with [`deep_merge`]. A file that is not
//! valid JSON is skipped with a warning.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use templar_render::{DataSource, EXCLUDED_DIRS};

use crate::error::{Result, TemplarError};
use crate::merge::deep_merge;

const DATA_EXTENSION: &str = "json";
const INDEX_STEM: &str = "index";

/// Loads the data for a call; relative directories resolve against `basedir`.
pub fn load_data(source: Option<&DataSource>, basedir: &Path) -> Result<Value> {
    match source {
        None => Ok(Value::Object(Map::new())),
        Some(DataSource::Inline(value)) => Ok(value.clone()),
        Some(DataSource::Directory(dir)) => load_data_dir(&basedir.join(dir)),
    }
}

/// Reads every JSON file below `dir` into one object.
///
/// A directory that does not exist yields an empty object.
pub fn load_data_dir(dir: &Path) -> Result<Value> {
    let mut data = Value::Object(Map::new());
    if !dir.is_dir() {
        tracing::debug!(dir = %dir.display(), "data directory does not exist");
        return Ok(data);
    }

    let mut files = Vec::new();
    walk_json_files(dir, &mut files)?;
    files.sort();

    for path in files {
        let content = std::fs::read_to_string(&path).map_err(|e| TemplarError::io(&path, e))?;
        let value: Value = match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unparseable data file");
                continue;
            }
        };

        let keys = key_path(&path, dir);
        let nested = keys
            .into_iter()
            .rev()
            .fold(value, |inner, key| Value::Object(Map::from_iter([(key, inner)])));
        deep_merge(&mut data, nested);
    }

    Ok(data)
}

fn walk_json_files(current: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let entries = std::fs::read_dir(current).map_err(|e| TemplarError::io(current, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| TemplarError::io(current, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| TemplarError::io(&path, e))?;

        if file_type.is_dir() {
            let excluded = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| EXCLUDED_DIRS.contains(&n));
            if !excluded {
                walk_json_files(&path, files)?;
            }
        } else if (file_type.is_file() || (file_type.is_symlink() && path.is_file()))
            && path.extension().and_then(|e| e.to_str()) == Some(DATA_EXTENSION)
        {
            files.push(path);
        }
    }

    Ok(())
}

// `nav/main.json` → ["nav", "main"]; a trailing `index` is dropped.
fn key_path(path: &Path, root: &Path) -> Vec<String> {
    let relative = path.strip_prefix(root).unwrap_or(path).with_extension("");
    let mut keys: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if keys.last().is_some_and(|k| k == INDEX_STEM) {
        keys.pop();
    }
    keys
}
