//! Package resolution: which package owns a module, and what it declares.
//!
//! - [`classifier`]: module filtering, loader stripping, path substitution and
//!   `package.json` lookup.
//! - [`PackageCache`]: parses each `package.json` once per run and resolves
//!   its license field.

pub mod classifier;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::license::LicenseResolver;
use crate::models::{FileRef, PackageRecord};

/// Lowercased file name prefixes of the ancillary files attached to a package.
const ANCILLARY_FILES: &[&str] = &[
    "license",
    "licence",
    "copying",
    "notice",
    "authors",
    "code_of_conduct",
];

/// Memoized `package.json` metadata for one build run.
#[derive(Debug)]
pub struct PackageCache {
    context: PathBuf,
    include_license_files: bool,
    records: HashMap<PathBuf, PackageRecord>,
    /// (directory, file prefix) → build-relative path of the first match.
    text_files: HashMap<(PathBuf, &'static str), Option<String>>,
}

impl PackageCache {
    pub fn new(context: &Path, include_license_files: bool) -> Self {
        Self {
            context: context.to_path_buf(),
            include_license_files,
            records: HashMap::new(),
            text_files: HashMap::new(),
        }
    }

    /// Metadata for the manifest at `manifest_path` (absolute).
    pub fn get(&mut self, manifest_path: &Path, resolver: &LicenseResolver) -> Result<&PackageRecord> {
        if !self.records.contains_key(manifest_path) {
            let record = self.parse(manifest_path, resolver)?;
            self.records.insert(manifest_path.to_path_buf(), record);
        }
        Ok(&self.records[manifest_path])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn parse(&mut self, manifest_path: &Path, resolver: &LicenseResolver) -> Result<PackageRecord> {
        let content = std::fs::read_to_string(manifest_path)
            .map_err(|e| Error::fs("failed to read", manifest_path, e))?;
        let json: Value = serde_json::from_str(&content).map_err(|source| Error::ManifestParse {
            path: manifest_path.to_path_buf(),
            source,
        })?;
        debug!("parsed package manifest {}", manifest_path.display());

        let name = string_field(&json, "name");
        let context = format!("module {}", name.as_deref().unwrap_or("<unnamed>"));
        let licenses = match license_expression(&json) {
            Some(expr) => resolver.resolve(&expr, &context),
            None => {
                warn!("{} ({}) declares no license", context, manifest_path.display());
                Vec::new()
            }
        };

        let files = if self.include_license_files {
            let dir = manifest_path.parent().unwrap_or(Path::new(""));
            let mut files = Vec::new();
            for &prefix in ANCILLARY_FILES {
                if let Some(file) = self.find_text_file(dir, prefix)? {
                    files.push(FileRef::Path(file));
                }
            }
            files
        } else {
            Vec::new()
        };

        Ok(PackageRecord {
            name,
            version: string_field(&json, "version"),
            homepage: string_field(&json, "homepage"),
            repository: repository_url(&json),
            licenses,
            files,
        })
    }

    /// First file in `dir` whose lowercased name starts with `prefix`.
    /// Entries are sorted so the pick does not depend on directory order.
    fn find_text_file(&mut self, dir: &Path, prefix: &'static str) -> Result<Option<String>> {
        let key = (dir.to_path_buf(), prefix);
        if let Some(found) = self.text_files.get(&key) {
            return Ok(found.clone());
        }

        let mut names = Vec::new();
        let entries = std::fs::read_dir(dir).map_err(|e| Error::fs("failed to list", dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| Error::fs("failed to list", dir, e))?;
            if entry.path().is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();

        let found = names
            .into_iter()
            .find(|name| name.to_lowercase().starts_with(prefix))
            .map(|name| self.build_relative(&dir.join(name)));
        self.text_files.insert(key, found.clone());
        Ok(found)
    }

    /// `./`-prefixed path relative to the build context, or the absolute path
    /// for files outside of it.
    fn build_relative(&self, path: &Path) -> String {
        match path.strip_prefix(&self.context) {
            Ok(rel) => format!("./{}", rel.to_string_lossy().replace('\\', "/")),
            Err(_) => path.to_string_lossy().into_owned(),
        }
    }
}

fn string_field(json: &Value, key: &str) -> Option<String> {
    json.get(key).and_then(Value::as_str).map(str::to_string)
}

/// The manifest's license as a single expression string.
///
/// Handles the `license` string, the legacy `license: { type }` object and the
/// deprecated `licenses` field (an object or an array of `{ type }`, joined
/// with OR).
fn license_expression(json: &Value) -> Option<String> {
    fn license_type(v: &Value) -> Option<String> {
        match v {
            Value::String(s) => Some(s.clone()),
            Value::Object(_) => v.get("type").and_then(Value::as_str).map(str::to_string),
            _ => None,
        }
    }

    if let Some(license) = json.get("license").and_then(license_type) {
        return Some(license);
    }

    match json.get("licenses")? {
        Value::Array(items) => {
            let types: Vec<String> = items.iter().filter_map(license_type).collect();
            if types.is_empty() {
                None
            } else {
                Some(types.join(" OR "))
            }
        }
        other => license_type(other),
    }
}

fn repository_url(json: &Value) -> Option<String> {
    match json.get("repository")? {
        Value::String(url) => Some(url.clone()),
        descriptor => descriptor.get("url").and_then(Value::as_str).map(str::to_string),
    }
}
