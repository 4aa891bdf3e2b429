//! The license engine and its per-build run context.
//!
//! [`Engine`] holds everything validated at setup (configuration, license
//! database, overrides, templates). [`BuildRun`] holds everything scoped to one
//! build: chunk tables, the package and copied-file caches, and the manifest
//! under construction.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::copier::{join_url, FileCopier};
use crate::error::{Error, Result};
use crate::ingest::ChunkIndex;
use crate::license::{LicenseDatabase, LicenseResolver};
use crate::models::{BuildStats, OutputManifest, StatsModule};
use crate::output::{write_manifest, ManifestBuilder, ManifestTransform};
use crate::overrides::OverrideRules;
use crate::package::classifier::{find_package_manifest, resolve_path, ModuleClassifier};
use crate::package::PackageCache;
use crate::template::SourceTemplate;

/// Directory, under the output directory, receiving copied files.
const SOURCES_DIR: &str = "sources";

pub struct Engine {
    config: Config,
    context: PathBuf,
    resolver: LicenseResolver,
    classifier: ModuleClassifier,
    overrides: OverrideRules,
    templates: BTreeMap<String, Vec<SourceTemplate>>,
    transform: Option<ManifestTransform>,
}

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub manifest_path: PathBuf,
    /// The manifest before any transform was applied.
    pub manifest: OutputManifest,
    pub modules: usize,
    pub packages: usize,
    pub copied_files: usize,
}

impl Engine {
    /// Validate `config`. `context` is the directory module paths are
    /// relative to (the project root).
    pub fn new(config: Config, context: &Path) -> Result<Self> {
        let db = match &config.license_database {
            Some(path) => LicenseDatabase::from_path(&context.join(path))?,
            None => LicenseDatabase::bundled()?,
        };
        let resolver = LicenseResolver::new(db);
        let classifier = ModuleClassifier::new(&config)?;
        let overrides = OverrideRules::new(&config.overrides, &resolver)?;

        let mut templates = BTreeMap::new();
        for (name, raw) in &config.sources {
            let parsed = raw
                .as_slice()
                .iter()
                .map(|t| SourceTemplate::parse(t))
                .collect::<Result<Vec<_>>>()?;
            templates.insert(name.clone(), parsed);
        }

        if config.filename.trim().is_empty() {
            return Err(Error::Config("manifest filename is empty".to_string()));
        }
        debug!(
            "engine ready: {} license identifiers, {} overrides, {} source templates",
            resolver.database().len(),
            config.overrides.len(),
            templates.len()
        );

        Ok(Self {
            config,
            context: context.to_path_buf(),
            resolver,
            classifier,
            overrides,
            templates,
            transform: None,
        })
    }

    /// Replace the written payload with the output of `transform`.
    pub fn with_transform(mut self, transform: impl Fn(OutputManifest) -> Value + 'static) -> Self {
        self.transform = Some(Box::new(transform));
        self
    }

    /// Ingest `stats` and prepare a run. Modules are then fed through
    /// [`BuildRun::visit`].
    pub fn start(&self, stats: &BuildStats) -> Result<BuildRun<'_>> {
        let output_root = match &stats.output_path {
            Some(path) => self.context.join(path),
            None => self.context.clone(),
        };
        let output_dir = output_root.join(&self.config.output_dir);
        let public_path = self
            .config
            .public_path
            .clone()
            .or_else(|| stats.public_path.clone())
            .unwrap_or_default();

        let output_dir_url = self.config.output_dir.to_string_lossy().replace('\\', "/");
        let sources_url = join_url(&join_url(&public_path, &output_dir_url), SOURCES_DIR);
        let copier = FileCopier::new(&self.context, output_dir.join(SOURCES_DIR), sources_url)?;

        Ok(BuildRun {
            engine: self,
            manifest_path: output_dir.join(&self.config.filename),
            public_path,
            chunks: ChunkIndex::from_stats(stats),
            packages: PackageCache::new(&self.context, self.config.include_license_files),
            copier,
            builder: ManifestBuilder::new(self.config.include_source_files, self.templates.clone())?,
            modules: 0,
        })
    }

    /// Process a whole build in one call.
    pub fn run(&self, stats: &BuildStats) -> Result<RunSummary> {
        let mut run = self.start(stats)?;
        for module in &stats.modules {
            run.visit(module)?;
        }
        run.finish()
    }
}

/// State of a single build run.
pub struct BuildRun<'a> {
    engine: &'a Engine,
    manifest_path: PathBuf,
    public_path: String,
    chunks: ChunkIndex,
    packages: PackageCache,
    copier: FileCopier,
    builder: ManifestBuilder,
    modules: usize,
}

impl BuildRun<'_> {
    /// Attribute one bundler module to its package in every chunk containing
    /// it. Returns `false` when the module is not a source file.
    pub fn visit(&mut self, module: &StatsModule) -> Result<bool> {
        let engine = self.engine;
        let Some(src_path) = engine.classifier.classify(&module.name) else {
            return Ok(false);
        };

        let manifest = find_package_manifest(&engine.context, &src_path).ok_or_else(|| {
            Error::fs(
                "no package.json found for",
                resolve_path(&engine.context, &src_path),
                std::io::ErrorKind::NotFound.into(),
            )
        })?;
        let record = self.packages.get(&manifest, &engine.resolver)?.clone();
        let record = engine.overrides.apply(&src_path, record);

        for chunk in &module.chunks {
            match self.chunks.asset_for_chunk(chunk) {
                Some(asset) => {
                    let chunk_url = format!("{}{}", self.public_path, asset);
                    self.builder
                        .add_module(&src_path, &chunk_url, &record, &mut self.copier)?;
                }
                None => warn!(
                    "module {} belongs to chunk {} which has no script asset; skipping that chunk",
                    src_path, chunk
                ),
            }
        }

        self.modules += 1;
        Ok(true)
    }

    /// Sort, transform and write the manifest.
    pub fn finish(self) -> Result<RunSummary> {
        let manifest = self.builder.finish();
        write_manifest(
            &self.manifest_path,
            manifest.clone(),
            self.engine.transform.as_ref(),
        )?;
        info!(
            "wrote license manifest for {} chunks to {}",
            manifest.len(),
            self.manifest_path.display()
        );

        Ok(RunSummary {
            manifest_path: self.manifest_path,
            manifest,
            modules: self.modules,
            packages: self.packages.len(),
            copied_files: self.copier.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OverrideConfig, SourceTemplates};
    use crate::models::{EntryContents, FileRef, LicenseLabel};
    use crate::test_support::capture_logs;
    use serde_json::json;
    use tempfile::TempDir;

    struct Project {
        dir: TempDir,
    }

    impl Project {
        fn new() -> Self {
            let p = Project {
                dir: TempDir::new().unwrap(),
            };
            p.write(
                "package.json",
                r#"{ "name": "my-app", "version": "0.1.0", "license": "MIT" }"#,
            );
            p
        }

        fn root(&self) -> &Path {
            self.dir.path()
        }

        fn write(&self, rel: &str, content: &str) {
            let path = self.root().join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }

        fn read_manifest(&self, summary: &RunSummary) -> Value {
            serde_json::from_str(&std::fs::read_to_string(&summary.manifest_path).unwrap())
                .unwrap()
        }
    }

    fn stats(value: Value) -> BuildStats {
        serde_json::from_value(value).unwrap()
    }

    fn single_chunk_stats(modules: Value) -> BuildStats {
        stats(json!({
            "outputPath": "dist",
            "publicPath": "/",
            "assets": [{ "name": "main.js", "chunks": [0], "chunkNames": ["main"] }],
            "assetsByChunkName": { "main": ["main.js"] },
            "modules": modules,
        }))
    }

    #[test]
    fn test_two_packages_in_one_chunk() {
        let project = Project::new();
        project.write(
            "node_modules/a/package.json",
            r#"{ "name": "a", "version": "1.0.0", "license": "MIT" }"#,
        );
        project.write(
            "node_modules/b/package.json",
            r#"{ "name": "b", "version": "2.0.0", "license": " bsd " }"#,
        );

        let engine = Engine::new(Config::default(), project.root()).unwrap();
        let summary = engine
            .run(&single_chunk_stats(json!([
                { "name": "./node_modules/b/index.js", "size": 10, "chunks": [0] },
                { "name": "./node_modules/a/index.js", "size": 10, "chunks": [0] },
            ])))
            .unwrap();

        assert_eq!(
            summary.manifest_path,
            project.root().join("dist/licenses/licenses.json")
        );
        let written = project.read_manifest(&summary);
        assert_eq!(
            written,
            json!({
                "/main.js": [
                    {
                        "name": "a",
                        "version": "1.0.0",
                        "licenses": [{ "name": "MIT", "url": "http://www.jclark.com/xml/copying.txt" }],
                        "modules": [{ "name": "index.js" }],
                    },
                    {
                        "name": "b",
                        "version": "2.0.0",
                        "licenses": [{ "name": "BSD-3-Clause", "url": "http://opensource.org/licenses/BSD-3-Clause" }],
                        "modules": [{ "name": "index.js" }],
                    },
                ]
            })
        );
        assert_eq!(summary.modules, 2);
        assert_eq!(summary.packages, 2);
    }

    #[test]
    fn test_replace_override_discards_manifest() {
        let project = Project::new();
        project.write(
            "node_modules/pkg-x/package.json",
            r#"{ "name": "pkg-x", "version": "3.1.4", "homepage": "https://pkg-x.dev", "license": "MIT" }"#,
        );
        let mut config = Config::default();
        config.overrides.push(OverrideConfig {
            prefix: "pkg-x".into(),
            replace: true,
            license: Some("GPL-3.0".into()),
            ..Default::default()
        });

        let engine = Engine::new(config, project.root()).unwrap();
        let summary = engine
            .run(&single_chunk_stats(json!([
                { "name": "./node_modules/pkg-x/lib/index.js", "size": 1, "chunks": [0] },
            ])))
            .unwrap();

        let entry = &summary.manifest["/main.js"][0];
        assert_eq!(entry.name, None);
        assert_eq!(entry.version, None);
        assert_eq!(entry.url, None);
        assert_eq!(
            entry.licenses,
            vec![LicenseLabel {
                name: "GPL-3.0".into(),
                url: "http://www.gnu.org/licenses/gpl-3.0.html".into(),
            }]
        );
        let written = project.read_manifest(&summary);
        assert!(written["/main.js"][0].get("name").is_none());
    }

    #[test]
    fn test_module_in_several_chunks_with_loaders_and_first_party() {
        let project = Project::new();
        project.write(
            "node_modules/shared/package.json",
            r#"{ "name": "shared", "licenses": [{ "type": "MIT" }, { "type": "Apache-2.0" }] }"#,
        );

        let engine = Engine::new(Config::default(), project.root()).unwrap();
        let summary = engine
            .run(&stats(json!({
                "publicPath": "https://cdn.example.org/",
                "assets": [
                    { "name": "main.js", "chunks": [0], "chunkNames": ["main"] },
                    { "name": "admin.js", "chunks": [1], "chunkNames": ["admin"] },
                ],
                "assetsByChunkName": { "main": "main.js", "admin": ["admin.css", "admin.js"] },
                "modules": [
                    { "name": "./node_modules/shared/index.js", "size": 1, "chunks": [0, 1] },
                    { "name": "./node_modules/babel-loader/lib/index.js!./src/app.jsx", "size": 1, "chunks": [0] },
                    { "name": "./src/styles.css", "size": 1, "chunks": [0] },
                    { "name": "webpack/runtime/chunk loaded", "size": 1, "chunks": [0] },
                ],
            })))
            .unwrap();

        let main = &summary.manifest["https://cdn.example.org/main.js"];
        let admin = &summary.manifest["https://cdn.example.org/admin.js"];
        assert_eq!(main.len(), 2);
        assert_eq!(main[0].name.as_deref(), Some("my-app"));
        assert_eq!(main[0].contents.refs()[0].name, "src/app.jsx");
        assert_eq!(main[1].name.as_deref(), Some("shared"));
        assert_eq!(admin.len(), 1);
        let names: Vec<_> = admin[0].licenses.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["MIT", "Apache-2.0"]);
        assert_eq!(summary.modules, 2);
    }

    #[test]
    fn test_include_files_and_sources() {
        let project = Project::new();
        project.write(
            "node_modules/foo/package.json",
            r#"{ "name": "foo", "version": "1.0.0", "license": "ISC", "repository": { "url": "https://git/foo" } }"#,
        );
        project.write("node_modules/foo/LICENSE", "ISC text");
        project.write("node_modules/foo/lib/b.js", "b");
        project.write("node_modules/foo/lib/a.js", "a");
        project.write(
            "node_modules/bar/package.json",
            r#"{ "name": "bar", "version": "2.0.0", "license": "MIT" }"#,
        );

        let mut config = Config::default();
        config.include_license_files = true;
        config.include_source_files = true;
        config.public_path = Some("/static/".into());
        config.sources.insert(
            "bar".into(),
            SourceTemplates::One("https://src.example.org/%{name}/%{version}.tgz".into()),
        );

        let engine = Engine::new(config, project.root()).unwrap();
        let summary = engine
            .run(&single_chunk_stats(json!([
                { "name": "./node_modules/foo/lib/b.js", "size": 1, "chunks": [0] },
                { "name": "./node_modules/bar/index.js", "size": 1, "chunks": [0] },
                { "name": "./node_modules/foo/lib/a.js", "size": 1, "chunks": [0] },
            ])))
            .unwrap();

        let entries = &summary.manifest["/static/main.js"];
        let bar = &entries[0];
        assert_eq!(bar.source_urls, vec!["https://src.example.org/bar/2.0.0.tgz"]);
        assert!(matches!(bar.contents, EntryContents::Modules(_)));

        let foo = &entries[1];
        assert_eq!(foo.repository.as_deref(), Some("https://git/foo"));
        assert_eq!(foo.files[0].id, "LICENSE");
        assert_eq!(foo.files[0].url, "/static/licenses/sources/foo/LICENSE.txt");
        let EntryContents::Sources(sources) = &foo.contents else {
            panic!("expected sources");
        };
        let urls: Vec<_> = sources.iter().map(|s| s.url.as_deref().unwrap()).collect();
        assert_eq!(
            urls,
            vec![
                "/static/licenses/sources/foo/lib/a.js",
                "/static/licenses/sources/foo/lib/b.js",
            ]
        );
        let out = project.root().join("dist/licenses/sources");
        assert!(out.join("foo/LICENSE.txt").is_file());
        assert!(out.join("foo/lib/a.js").is_file());
        assert_eq!(summary.copied_files, 3);
    }

    #[test]
    fn test_transform_output_is_written() {
        let project = Project::new();
        let engine = Engine::new(Config::default(), project.root())
            .unwrap()
            .with_transform(|manifest| json!({ "chunks": manifest.keys().collect::<Vec<_>>() }));
        let summary = engine
            .run(&single_chunk_stats(json!([
                { "name": "./src/index.js", "size": 1, "chunks": [0] },
            ])))
            .unwrap();
        assert_eq!(project.read_manifest(&summary), json!({ "chunks": ["/main.js"] }));
    }

    #[test]
    fn test_broken_dependency_manifest_aborts() {
        let project = Project::new();
        project.write("node_modules/broken/package.json", "{ \"name\": \"broken\", ");
        let engine = Engine::new(Config::default(), project.root()).unwrap();
        let err = engine
            .run(&single_chunk_stats(json!([
                { "name": "./node_modules/broken/index.js", "size": 1, "chunks": [0] },
            ])))
            .unwrap_err();
        assert!(matches!(err, Error::ManifestParse { .. }));
    }

    #[test]
    fn test_invalid_configuration_fails_setup() {
        let project = Project::new();

        let mut config = Config::default();
        config
            .sources
            .insert("x".into(), SourceTemplates::One("%{nope}".into()));
        assert!(matches!(
            Engine::new(config, project.root()),
            Err(Error::Config(_))
        ));

        let mut config = Config::default();
        config.overrides.push(OverrideConfig::default());
        assert!(matches!(
            Engine::new(config, project.root()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_unresolvable_chunk_is_skipped() {
        let project = Project::new();
        let engine = Engine::new(Config::default(), project.root()).unwrap();
        let summary = engine
            .run(&single_chunk_stats(json!([
                { "name": "./src/index.js", "size": 1, "chunks": [0, 9] },
            ])))
            .unwrap();
        assert_eq!(summary.manifest.len(), 1);
        assert!(summary.manifest.contains_key("/main.js"));
    }

    #[test]
    fn test_degraded_inputs_are_logged() {
        let project = Project::new();
        project.write("node_modules/bare/package.json", r#"{ "name": "bare", "version": "1.0.0" }"#);
        let mut config = Config::default();
        config.overrides.push(OverrideConfig {
            prefix: "bare".into(),
            files: Some(vec![FileRef::Path("./node_modules/bare/NOTICE".into())]),
            ..Default::default()
        });

        let engine = Engine::new(config, project.root()).unwrap();
        let stats = single_chunk_stats(json!([
            { "name": "./node_modules/bare/index.js", "size": 1, "chunks": [0, 9] },
        ]));
        let (summary, logs) = capture_logs(|| engine.run(&stats));
        let summary = summary.unwrap();

        let entry = &summary.manifest["/main.js"][0];
        assert!(entry.licenses.is_empty());
        assert!(entry.files.is_empty());

        let warnings = logs.warnings();
        assert_eq!(warnings.len(), 3, "{:?}", warnings);
        assert!(warnings.iter().any(|w| w.contains("declares no license")));
        assert!(warnings.iter().any(|w| w.contains("no script asset")));
        assert!(warnings.iter().any(|w| w.contains("could not be copied")));
    }
}
