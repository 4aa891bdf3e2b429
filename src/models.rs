use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Bundler stats (input)
// ---------------------------------------------------------------------------

/// The subset of the bundler's stats JSON the engine reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStats {
    #[serde(default)]
    pub output_path: Option<PathBuf>,
    #[serde(default)]
    pub public_path: Option<String>,
    #[serde(default)]
    pub assets: Vec<StatsAsset>,
    /// Chunk name → asset file name or list of names. Key order is the
    /// bundler's order and is significant (positional aliases).
    #[serde(default)]
    pub assets_by_chunk_name: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub modules: Vec<StatsModule>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsAsset {
    pub name: String,
    #[serde(default)]
    pub chunks: Vec<ChunkId>,
    #[serde(default)]
    pub chunk_names: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatsModule {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub chunks: Vec<ChunkId>,
}

/// Chunk ids are numbers in production builds and strings in named builds;
/// both are normalized to their string form so `0` and `"0"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "RawChunkId")]
pub struct ChunkId(pub String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawChunkId {
    Number(u64),
    Name(String),
}

impl From<RawChunkId> for ChunkId {
    fn from(raw: RawChunkId) -> Self {
        match raw {
            RawChunkId::Number(n) => ChunkId(n.to_string()),
            RawChunkId::Name(s) => ChunkId(s),
        }
    }
}

impl From<&str> for ChunkId {
    fn from(id: &str) -> Self {
        ChunkId(id.to_string())
    }
}

impl std::fmt::Display for ChunkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Package metadata
// ---------------------------------------------------------------------------

/// A license as it appears in the manifest: canonical identifier plus a
/// reference URL (empty when the identifier is unknown).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseLabel {
    pub name: String,
    #[serde(default)]
    pub url: String,
}

impl std::fmt::Display for LicenseLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// An ancillary file attached to a package.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FileRef {
    /// Already published elsewhere; emitted as-is.
    Published { id: String, url: String },
    /// Local path (relative to the build context) copied into the output tree.
    Path(String),
}

/// Resolved metadata for one package manifest, after license resolution and
/// (for a given source path) after overrides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageRecord {
    pub name: Option<String>,
    pub version: Option<String>,
    pub homepage: Option<String>,
    pub repository: Option<String>,
    pub licenses: Vec<LicenseLabel>,
    pub files: Vec<FileRef>,
}

// ---------------------------------------------------------------------------
// Output manifest
// ---------------------------------------------------------------------------

/// Chunk asset URL → packages bundled in that chunk.
pub type OutputManifest = BTreeMap<String, Vec<PackageEntry>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Package homepage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub licenses: Vec<LicenseLabel>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    /// Source locations produced from a per-package source template.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_urls: Vec<String>,
    #[serde(flatten)]
    pub contents: EntryContents,
}

/// Either bare module identifiers or identifiers with a copied-source URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryContents {
    Modules(Vec<ModuleRef>),
    Sources(Vec<ModuleRef>),
}

impl EntryContents {
    pub fn refs(&self) -> &[ModuleRef] {
        match self {
            EntryContents::Modules(refs) | EntryContents::Sources(refs) => refs,
        }
    }

    pub fn refs_mut(&mut self) -> &mut Vec<ModuleRef> {
        match self {
            EntryContents::Modules(refs) | EntryContents::Sources(refs) => refs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub id: String,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_accepts_numeric_and_named_chunk_ids() {
        let json = r#"{
  "publicPath": "/static/",
  "assets": [{ "name": "main.js", "chunks": [0, "vendors"], "chunkNames": ["main", "vendors"] }],
  "assetsByChunkName": { "main": "main.js", "vendors": ["vendors.js", "vendors.js.map"] },
  "modules": [{ "name": "./src/index.js", "size": 120, "chunks": [0] }]
}"#;
        let stats: BuildStats = serde_json::from_str(json).unwrap();
        assert_eq!(stats.assets[0].chunks[0], ChunkId::from("0"));
        assert_eq!(stats.assets[0].chunks[1], ChunkId::from("vendors"));
        assert_eq!(stats.modules[0].size, 120);
        let keys: Vec<_> = stats.assets_by_chunk_name.keys().cloned().collect();
        assert_eq!(keys, vec!["main", "vendors"]);
    }

    #[test]
    fn test_file_ref_forms() {
        let refs: Vec<FileRef> =
            serde_json::from_str(r#"["./LICENSE", { "id": "NOTICE", "url": "https://x/NOTICE" }]"#)
                .unwrap();
        assert_eq!(refs[0], FileRef::Path("./LICENSE".into()));
        assert!(matches!(refs[1], FileRef::Published { .. }));
    }

    #[test]
    fn test_entry_serializes_single_contents_key() {
        let entry = PackageEntry {
            name: Some("left-pad".into()),
            url: None,
            version: Some("1.3.0".into()),
            licenses: vec![LicenseLabel {
                name: "WTFPL".into(),
                url: String::new(),
            }],
            files: Vec::new(),
            repository: None,
            source_urls: Vec::new(),
            contents: EntryContents::Modules(vec![ModuleRef {
                name: "index.js".into(),
                url: None,
            }]),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["modules"][0]["name"], "index.js");
        assert!(value.get("sources").is_none());
        assert!(value.get("url").is_none());
        assert!(value.get("files").is_none());
    }
}
