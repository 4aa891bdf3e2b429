use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::package::classifier::resolve_path;

/// Leading `./`, `node_modules/` or `./node_modules/` of a build-relative path.
const DEPENDENCY_ROOT: &str = r"^([./]*node_modules|\.)/";

/// Appended to license files that have no extension so browsers render them.
const TEXT_EXTENSION: &str = ".txt";

/// Join URL segments with exactly one `/` between them. An empty base yields
/// a relative URL.
pub fn join_url(base: &str, rel: &str) -> String {
    let rel = rel.trim_start_matches('/');
    if base.is_empty() {
        rel.to_string()
    } else {
        format!("{}/{}", base.trim_end_matches('/'), rel)
    }
}

/// Keep only the normal components of `path`, so the result always stays
/// below the directory it is joined onto (`../shared/x.js` → `shared/x.js`).
fn contained_path(path: &str) -> String {
    Path::new(path)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Copies license and source files into the output tree, at most once each.
#[derive(Debug)]
pub struct FileCopier {
    context: PathBuf,
    dependency_root: Regex,
    output_dir: PathBuf,
    public_url: String,
    copied: HashMap<PathBuf, String>,
}

impl FileCopier {
    /// `output_dir` receives the files; `public_url` is its public location.
    pub fn new(context: &Path, output_dir: PathBuf, public_url: String) -> Result<Self> {
        let dependency_root = Regex::new(DEPENDENCY_ROOT)
            .map_err(|e| Error::Config(format!("invalid dependency root pattern: {}", e)))?;
        Ok(Self {
            context: context.to_path_buf(),
            dependency_root,
            output_dir,
            public_url,
            copied: HashMap::new(),
        })
    }

    /// Copy a build-relative file and return its public URL.
    ///
    /// Returns `Ok(None)` for remote resources and missing files.
    pub fn copy_file_to_output_path(&mut self, source: &str) -> Result<Option<String>> {
        self.copy(source, "")
    }

    /// Like [`copy_file_to_output_path`](Self::copy_file_to_output_path), but
    /// appends `.txt` when the file name has no extension.
    pub fn copy_text_file(&mut self, source: &str) -> Result<Option<String>> {
        let file_name = source.rsplit('/').next().unwrap_or(source);
        let ext = if file_name.contains('.') { "" } else { TEXT_EXTENSION };
        self.copy(source, ext)
    }

    /// Number of files copied so far.
    pub fn len(&self) -> usize {
        self.copied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.copied.is_empty()
    }

    fn copy(&mut self, source: &str, ext: &str) -> Result<Option<String>> {
        if source.contains("://") {
            return Ok(None);
        }
        let src = resolve_path(&self.context, source);
        if let Some(url) = self.copied.get(&src) {
            return Ok(Some(url.clone()));
        }
        if !src.is_file() {
            debug!("not copying missing file {}", src.display());
            return Ok(None);
        }

        let relative = format!(
            "{}{}",
            contained_path(&self.dependency_root.replace(source, "")),
            ext
        );
        let dest = resolve_path(&self.output_dir, &relative);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::fs("failed to create directory", parent, e))?;
        }
        std::fs::copy(&src, &dest).map_err(|e| Error::fs("failed to copy", &src, e))?;
        debug!("copied {} to {}", src.display(), dest.display());

        let url = join_url(&self.public_url, &relative);
        self.copied.insert(src, url.clone());
        Ok(Some(url))
    }
}
