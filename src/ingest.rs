use std::collections::HashMap;

use serde_json::Value;
use tracing::warn;

use crate::models::{BuildStats, ChunkId};

/// Extension of the bundle's executable script assets.
const SCRIPT_EXTENSION: &str = ".js";

/// Chunk lookup tables derived once per build from the bundler stats.
#[derive(Debug, Clone, Default)]
pub struct ChunkIndex {
    id_to_name: HashMap<ChunkId, String>,
    /// Chunk name, or the chunk's position in `assetsByChunkName`, → script asset.
    name_to_asset: HashMap<String, String>,
}

impl ChunkIndex {
    pub fn from_stats(stats: &BuildStats) -> Self {
        let mut index = ChunkIndex::default();

        for asset in &stats.assets {
            if asset.chunks.len() != asset.chunk_names.len() {
                warn!(
                    "asset '{}' lists {} chunk ids but {} chunk names; ignoring its chunk mapping",
                    asset.name,
                    asset.chunks.len(),
                    asset.chunk_names.len()
                );
                continue;
            }
            for (id, name) in asset.chunks.iter().zip(&asset.chunk_names) {
                index.id_to_name.insert(id.clone(), name.clone());
            }
        }

        for (i, (chunk_name, assets)) in stats.assets_by_chunk_name.iter().enumerate() {
            if let Some(script) = primary_script(assets) {
                index
                    .name_to_asset
                    .insert(chunk_name.clone(), script.to_string());
                index.name_to_asset.insert(i.to_string(), script.to_string());
            }
        }

        index
    }

    pub fn chunk_name(&self, id: &ChunkId) -> Option<&str> {
        self.id_to_name.get(id).map(String::as_str)
    }

    /// Script asset for a chunk name (or positional alias).
    pub fn script_asset(&self, chunk_name: &str) -> Option<&str> {
        self.name_to_asset.get(chunk_name).map(String::as_str)
    }

    /// Script asset of the chunk with the given id.
    pub fn asset_for_chunk(&self, id: &ChunkId) -> Option<&str> {
        self.chunk_name(id)
            .and_then(|name| self.script_asset(name))
    }
}

/// First script in a chunk's asset list (a single name or an array).
fn primary_script(assets: &Value) -> Option<&str> {
    match assets {
        Value::String(name) => Some(name.as_str()).filter(|n| n.ends_with(SCRIPT_EXTENSION)),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .find(|n| n.ends_with(SCRIPT_EXTENSION)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(json: &str) -> BuildStats {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_chunk_ids_resolve_to_script_assets() {
        let index = ChunkIndex::from_stats(&stats(
            r#"{
  "assets": [
    { "name": "main.js", "chunks": [0], "chunkNames": ["main"] },
    { "name": "vendors.js", "chunks": [1], "chunkNames": ["vendors"] }
  ],
  "assetsByChunkName": {
    "main": ["main.css", "main.js", "main.js.map"],
    "vendors": "vendors.js"
  }
}"#,
        ));
        assert_eq!(index.chunk_name(&ChunkId::from("0")), Some("main"));
        assert_eq!(index.asset_for_chunk(&ChunkId::from("0")), Some("main.js"));
        assert_eq!(index.asset_for_chunk(&ChunkId::from("1")), Some("vendors.js"));
        assert_eq!(index.asset_for_chunk(&ChunkId::from("7")), None);
    }

    #[test]
    fn test_numeric_and_string_ids_are_equivalent() {
        let index = ChunkIndex::from_stats(&stats(
            r#"{
  "assets": [{ "name": "main.js", "chunks": [3], "chunkNames": ["main"] }],
  "assetsByChunkName": { "main": "main.js" }
}"#,
        ));
        let module: crate::models::StatsModule =
            serde_json::from_str(r#"{ "name": "./a.js", "chunks": ["3"] }"#).unwrap();
        assert_eq!(index.asset_for_chunk(&module.chunks[0]), Some("main.js"));
    }

    #[test]
    fn test_positional_alias() {
        let index = ChunkIndex::from_stats(&stats(
            r#"{ "assetsByChunkName": { "main": "main.js", "styles": "styles.css", "admin": ["admin.js"] } }"#,
        ));
        assert_eq!(index.script_asset("0"), Some("main.js"));
        assert_eq!(index.script_asset("1"), None);
        assert_eq!(index.script_asset("2"), Some("admin.js"));
        assert_eq!(index.script_asset("styles"), None);
    }

    #[test]
    fn test_mismatched_asset_arrays_are_skipped() {
        let index = ChunkIndex::from_stats(&stats(
            r#"{
  "assets": [
    { "name": "broken.js", "chunks": [0, 1], "chunkNames": ["main"] },
    { "name": "ok.js", "chunks": ["lazy"], "chunkNames": ["lazy"] }
  ]
}"#,
        ));
        assert_eq!(index.chunk_name(&ChunkId::from("0")), None);
        assert_eq!(index.chunk_name(&ChunkId::from("lazy")), Some("lazy"));
    }
}
