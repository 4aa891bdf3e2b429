use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::copier::FileCopier;
use crate::error::{Error, Result};
use crate::models::{
    EntryContents, FileEntry, FileRef, ModuleRef, OutputManifest, PackageEntry, PackageRecord,
};
use crate::template::SourceTemplate;

/// Package root of a build-relative path (`./`, `./node_modules/pkg/` or
/// `./node_modules/@scope/pkg/`); stripped to form module identifiers.
const MODULE_ROOT: &str = r"^([./]*node_modules/(@[^/]+/)?[^/]+|\.)/";

/// Receives the finished manifest; its return value is written instead. A
/// JSON string is written verbatim.
pub type ManifestTransform = Box<dyn Fn(OutputManifest) -> Value>;

/// Accumulates package entries per chunk while modules are visited.
#[derive(Debug)]
pub struct ManifestBuilder {
    include_source_files: bool,
    templates: BTreeMap<String, Vec<SourceTemplate>>,
    module_root: Regex,
    output: OutputManifest,
}

impl ManifestBuilder {
    pub fn new(
        include_source_files: bool,
        templates: BTreeMap<String, Vec<SourceTemplate>>,
    ) -> Result<Self> {
        let module_root = Regex::new(MODULE_ROOT)
            .map_err(|e| Error::Config(format!("invalid module root pattern: {}", e)))?;
        Ok(Self {
            include_source_files,
            templates,
            module_root,
            output: OutputManifest::new(),
        })
    }

    /// Identifier of a module within its package.
    pub fn module_id(&self, src_path: &str) -> String {
        self.module_root.replace(src_path, "").into_owned()
    }

    /// Record that `src_path`, owned by `package`, is bundled in `chunk_url`.
    pub fn add_module(
        &mut self,
        src_path: &str,
        chunk_url: &str,
        package: &PackageRecord,
        copier: &mut FileCopier,
    ) -> Result<()> {
        let id = self.module_id(src_path);
        let template = package
            .name
            .as_ref()
            .and_then(|name| self.templates.get(name));
        let copy_sources = self.include_source_files && template.is_none();

        let entries = self.output.entry(chunk_url.to_string()).or_default();
        let pos = match entries.iter().position(|e| e.name == package.name) {
            Some(pos) => pos,
            None => {
                let source_urls = match template {
                    Some(templates) if self.include_source_files => templates
                        .iter()
                        .map(|t| t.render(package.name.as_deref(), package.version.as_deref()))
                        .collect(),
                    _ => Vec::new(),
                };
                let contents = if copy_sources {
                    EntryContents::Sources(Vec::new())
                } else {
                    EntryContents::Modules(Vec::new())
                };
                entries.push(PackageEntry {
                    name: package.name.clone(),
                    url: package.homepage.clone(),
                    version: package.version.clone(),
                    licenses: package.licenses.clone(),
                    files: publish_files(&package.files, copier)?,
                    repository: package.repository.clone(),
                    source_urls,
                    contents,
                });
                entries.len() - 1
            }
        };

        let refs = entries[pos].contents.refs_mut();
        if refs.iter().any(|m| m.name == id) {
            return Ok(());
        }
        let url = if copy_sources {
            copier.copy_file_to_output_path(src_path)?
        } else {
            None
        };
        refs.push(ModuleRef { name: id, url });
        Ok(())
    }

    /// Sort everything that depends on module traversal order.
    pub fn finish(mut self) -> OutputManifest {
        for entries in self.output.values_mut() {
            entries.sort_by(|a, b| a.name.cmp(&b.name));
            for entry in entries.iter_mut() {
                entry.contents.refs_mut().sort_by(|a, b| a.name.cmp(&b.name));
            }
        }
        self.output
    }
}

/// Copy a package's ancillary files, keeping already-published references.
fn publish_files(files: &[FileRef], copier: &mut FileCopier) -> Result<Vec<FileEntry>> {
    let mut published = Vec::with_capacity(files.len());
    for file in files {
        match file {
            FileRef::Published { id, url } => published.push(FileEntry {
                id: id.clone(),
                url: url.clone(),
            }),
            FileRef::Path(path) => match copier.copy_text_file(path)? {
                Some(url) => published.push(FileEntry {
                    id: file_id(path),
                    url,
                }),
                None => warn!("license file {} could not be copied; it is not listed", path),
            },
        }
    }
    Ok(published)
}

/// `./node_modules/foo/LICENSE.md` → `LICENSE`.
fn file_id(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_uppercase())
        .unwrap_or_else(|| path.to_uppercase())
}

/// Apply the optional transform and write the payload to `path`.
pub fn write_manifest(
    path: &Path,
    manifest: OutputManifest,
    transform: Option<&ManifestTransform>,
) -> Result<()> {
    let payload = match transform {
        Some(transform) => transform(manifest),
        None => serde_json::to_value(manifest)?,
    };
    let text = match payload {
        Value::String(text) => text,
        other => serde_json::to_string_pretty(&other)?,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::fs("failed to create directory", parent, e))?;
    }
    std::fs::write(path, text).map_err(|e| Error::fs("failed to write", path, e))?;
    debug!("wrote license manifest {}", path.display());
    Ok(())
}
