use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use regex::Regex;
use tracing::debug;

use crate::config::{expand_prefix, Config};
use crate::error::{Error, Result};

/// Module paths under the build context start with this marker; anything else
/// (externals, runtime modules, `webpack/...`) has no source file.
pub const BUILD_RELATIVE_MARKER: &str = "./";

pub const MANIFEST_FILENAME: &str = "package.json";

/// Filters bundler modules down to source files and maps them to real paths.
#[derive(Debug, Clone)]
pub struct ModuleClassifier {
    source_pattern: Regex,
    exclude: Vec<String>,
    src_replace: BTreeMap<String, String>,
}

impl ModuleClassifier {
    pub fn new(config: &Config) -> Result<Self> {
        let source_pattern = Regex::new(&config.source_pattern).map_err(|e| {
            Error::Config(format!("invalid source_pattern '{}': {}", config.source_pattern, e))
        })?;
        Ok(Self {
            source_pattern,
            exclude: config.exclude.iter().map(|p| expand_prefix(p)).collect(),
            src_replace: config.src_replace.clone(),
        })
    }

    /// The build-relative source path of a module, or `None` when the module
    /// is not a source file or is excluded.
    pub fn classify(&self, module_name: &str) -> Option<String> {
        if !self.source_pattern.is_match(module_name)
            || !module_name.starts_with(BUILD_RELATIVE_MARKER)
        {
            debug!("skipping non-source module {}", module_name);
            return None;
        }

        let path = strip_loaders(module_name);
        if self.exclude.iter().any(|prefix| path.starts_with(prefix.as_str())) {
            debug!("skipping excluded module {}", path);
            return None;
        }

        match self.src_replace.get(path) {
            Some(replacement) => Some(replacement.clone()),
            None => Some(path.to_string()),
        }
    }
}

/// Drop a loader chain (`./node_modules/babel-loader/lib/index.js!./src/app.js`).
pub fn strip_loaders(path: &str) -> &str {
    match path.rfind('!') {
        Some(pos) => &path[pos + 1..],
        None => path,
    }
}

/// Join a build-relative path onto the context directory, dropping `.` segments
/// so the same file always maps to the same cache key.
pub fn resolve_path(context: &Path, rel: &str) -> PathBuf {
    let mut path = context.to_path_buf();
    for component in Path::new(rel).components() {
        match component {
            Component::CurDir => {}
            other => path.push(other),
        }
    }
    path
}

/// Locate the `package.json` owning `src_path`.
///
/// First-party sources belong to the project manifest. Dependencies are
/// searched from the package root following the innermost `node_modules`
/// segment (`@scope/name` for scoped packages), one directory deeper at a
/// time.
pub fn find_package_manifest(context: &Path, src_path: &str) -> Option<PathBuf> {
    let segments: Vec<&str> = src_path.split('/').collect();
    let Some(nm) = segments.iter().rposition(|s| *s == "node_modules") else {
        return Some(context.join(MANIFEST_FILENAME));
    };

    let mut depth = nm + 2;
    if segments.get(nm + 1).is_some_and(|s| s.starts_with('@')) {
        depth += 1;
    }

    (depth..segments.len())
        .map(|end| resolve_path(context, &segments[..end].join("/")).join(MANIFEST_FILENAME))
        .find(|candidate| candidate.is_file())
}
