use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::{FileRef, LicenseLabel};

/// Matches the file extensions of script sources worth attributing.
pub const DEFAULT_SOURCE_PATTERN: &str = r"\.(js|jsx|mjs|cjs|ts|tsx|coffee|lua)$";

/// Root configuration structure, deserialized from `.license-listr/config.toml`.
///
/// ```toml
/// output_dir = "licenses"
/// include_license_files = true
///
/// [src_replace]
/// "./src/generated/icons.js" = "./src/icons/index.js"
///
/// [sources]
/// react = "https://github.com/facebook/react/archive/v%{version}.tar.gz"
///
/// [[override]]
/// prefix = "pkg-x"
/// replace = true
/// license = "GPL-3.0"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory, relative to the bundler output path, receiving the manifest
    /// and the copied files.
    pub output_dir: PathBuf,
    /// Manifest file name.
    pub filename: String,
    /// Replaces the bundler's `publicPath` in every emitted URL.
    pub public_path: Option<String>,
    /// Copy LICENSE/COPYING/NOTICE/AUTHORS/CODE_OF_CONDUCT files of each package.
    pub include_license_files: bool,
    /// Copy every bundled source file and list it under `sources`.
    pub include_source_files: bool,
    /// Regex a module path must match to be considered a source file.
    pub source_pattern: String,
    /// Module path prefixes to ignore. Bare package names expand to
    /// `./node_modules/<name>`.
    pub exclude: Vec<String>,
    /// External SPDX `licenses.json` replacing the bundled list.
    pub license_database: Option<PathBuf>,
    /// Exact module path → real source path.
    pub src_replace: BTreeMap<String, String>,
    /// Package name → source location template(s), see [`crate::template`].
    pub sources: BTreeMap<String, SourceTemplates>,
    /// Metadata overrides, applied in declaration order.
    #[serde(rename = "override")]
    pub overrides: Vec<OverrideConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SourceTemplates {
    One(String),
    Many(Vec<String>),
}

impl SourceTemplates {
    pub fn as_slice(&self) -> &[String] {
        match self {
            SourceTemplates::One(t) => std::slice::from_ref(t),
            SourceTemplates::Many(ts) => ts,
        }
    }
}

/// One `[[override]]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverrideConfig {
    /// Source path prefix. Bare package names expand to `./node_modules/<name>`.
    pub prefix: String,
    /// Discard the manifest's metadata before applying this override.
    #[serde(default)]
    pub replace: bool,
    pub name: Option<String>,
    pub version: Option<String>,
    pub homepage: Option<String>,
    pub repository: Option<String>,
    /// License expression, resolved once when the engine is built.
    pub license: Option<String>,
    /// Pre-resolved labels, listed before those of `license`.
    pub licenses: Option<Vec<LicenseLabel>>,
    pub files: Option<Vec<FileRef>>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            output_dir: PathBuf::from("licenses"),
            filename: "licenses.json".to_string(),
            public_path: None,
            include_license_files: false,
            include_source_files: false,
            source_pattern: DEFAULT_SOURCE_PATTERN.to_string(),
            exclude: Vec::new(),
            license_database: None,
            src_replace: BTreeMap::new(),
            sources: BTreeMap::new(),
            overrides: Vec::new(),
        }
    }
}

/// Expand a bare package name into a `./node_modules/` path prefix.
pub fn expand_prefix(prefix: &str) -> String {
    if prefix.starts_with('.') {
        prefix.to_string()
    } else {
        format!("./node_modules/{}", prefix.trim_start_matches('/'))
    }
}

fn read_config(path: &Path) -> Result<Config> {
    let content =
        std::fs::read_to_string(path).map_err(|e| Error::fs("failed to read", path, e))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
}

/// Load the configuration, searching in order:
///
/// 1. `config_override`: path passed via `--config`
/// 2. `<project_path>/.license-listr/config.toml`
/// 3. `~/.config/license-listr/config.toml`
/// 4. Built-in [`Config::default`]
pub fn load_config(project_path: &Path, config_override: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_override {
        return read_config(path);
    }

    let project_config = project_path.join(".license-listr").join("config.toml");
    if project_config.exists() {
        return read_config(&project_config);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home
            .join(".config")
            .join("license-listr")
            .join("config.toml");
        if home_config.exists() {
            return read_config(&home_config);
        }
    }

    Ok(Config::default())
}
