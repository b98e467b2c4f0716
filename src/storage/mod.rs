//! JSON record store.
//!
//! One captured element per file under the store's base directory. Names are
//! sanitised to `[A-Za-z0-9_-]` and never overwrite: a clash becomes `name(2).json`.

use log::debug;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::mapper::revalidate::validate_record;
use crate::mapper::{ElementRecord, MapperError};

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_\-]").unwrap());

/// Replace anything outside `[A-Za-z0-9_-]` with `_`
pub fn sanitize_name(name: &str) -> String {
    let trimmed = name.trim();
    let stem = trimmed.strip_suffix(".json").unwrap_or(trimmed);
    let clean = UNSAFE_CHARS.replace_all(stem, "_").to_string();
    if clean.is_empty() {
        "element".to_string()
    } else {
        clean
    }
}

#[derive(Debug, Clone)]
pub struct RecordStore {
    base: PathBuf,
}

impl RecordStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// First free path for `name`: `name.json`, then `name(2).json`, ...
    fn free_path(&self, stem: &str) -> PathBuf {
        let first = self.base.join(format!("{}.json", stem));
        if !first.exists() {
            return first;
        }
        (2..)
            .map(|n| self.base.join(format!("{}({}).json", stem, n)))
            .find(|p| !p.exists())
            .unwrap_or(first)
    }

    /// Write a record as pretty JSON and return the path used
    pub fn save(&self, record: &ElementRecord, name: &str) -> Result<PathBuf, MapperError> {
        std::fs::create_dir_all(&self.base)?;
        let path = self.free_path(&sanitize_name(name));
        let json = serde_json::to_string_pretty(record)?;
        std::fs::write(&path, json)?;
        debug!("Record written to {}", path.display());
        Ok(path)
    }

    /// Resolve a user-supplied name: an existing path as-is, otherwise a file
    /// in the store, with `.json` appended when missing
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let direct = PathBuf::from(name);
        if direct.is_file() {
            return Some(direct);
        }
        let in_store = self.base.join(name);
        if in_store.is_file() {
            return Some(in_store);
        }
        let with_ext = self.base.join(format!("{}.json", name));
        with_ext.is_file().then_some(with_ext)
    }

    /// Load and validate a record
    pub fn load(&self, name: &str) -> Result<ElementRecord, MapperError> {
        let path = self
            .resolve(name)
            .ok_or_else(|| MapperError::NotFound(name.to_string()))?;
        let content = std::fs::read_to_string(&path)?;
        parse_record(&content)
    }

    /// Record file names in the store, sorted
    pub fn list(&self) -> Result<Vec<String>, MapperError> {
        if !self.base.is_dir() {
            return Ok(Vec::new());
        }
        let mut names: Vec<String> = std::fs::read_dir(&self.base)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.extension().is_some_and(|e| e == "json"))
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
            .collect();
        names.sort();
        Ok(names)
    }
}

/// Parse a record body, rejecting anything without `element.tag` and
/// `element.selectors.xpath`
pub fn parse_record(content: &str) -> Result<ElementRecord, MapperError> {
    let value: serde_json::Value = serde_json::from_str(content)
        .map_err(|e| MapperError::MalformedRecord(format!("not JSON: {}", e)))?;

    let element = value
        .get("element")
        .filter(|e| e.is_object())
        .ok_or_else(|| MapperError::MalformedRecord("missing element".into()))?;
    if !element.get("tag").is_some_and(|t| t.is_string()) {
        return Err(MapperError::MalformedRecord("missing element.tag".into()));
    }
    if !element
        .get("selectors")
        .and_then(|s| s.get("xpath"))
        .is_some_and(|x| x.is_string())
    {
        return Err(MapperError::MalformedRecord(
            "missing element.selectors.xpath".into(),
        ));
    }

    let record: ElementRecord = serde_json::from_value(value)
        .map_err(|e| MapperError::MalformedRecord(e.to_string()))?;
    validate_record(&record)?;
    Ok(record)
}
