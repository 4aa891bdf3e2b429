use tracing::debug;

use crate::config::{expand_prefix, OverrideConfig};
use crate::error::{Error, Result};
use crate::license::LicenseResolver;
use crate::models::{FileRef, LicenseLabel, PackageRecord};

/// A validated `[[override]]` entry with its license already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideRule {
    pub prefix: String,
    pub replace: bool,
    pub name: Option<String>,
    pub version: Option<String>,
    pub homepage: Option<String>,
    pub repository: Option<String>,
    pub licenses: Option<Vec<LicenseLabel>>,
    pub files: Option<Vec<FileRef>>,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.trim().is_empty()).cloned()
}

impl OverrideRule {
    pub fn from_config(config: &OverrideConfig, resolver: &LicenseResolver) -> Result<Self> {
        if config.prefix.trim().is_empty() {
            return Err(Error::Config("override with an empty prefix".to_string()));
        }

        let mut licenses = config.licenses.clone();
        if let Some(expr) = &config.license {
            if expr.trim().is_empty() {
                return Err(Error::Config(format!(
                    "override '{}' has an empty license",
                    config.prefix
                )));
            }
            let resolved = resolver.resolve(expr, &format!("override {}", config.prefix));
            licenses.get_or_insert_with(Vec::new).extend(resolved);
        }

        let rule = OverrideRule {
            prefix: expand_prefix(&config.prefix),
            replace: config.replace,
            name: non_empty(&config.name),
            version: non_empty(&config.version),
            homepage: non_empty(&config.homepage),
            repository: non_empty(&config.repository),
            licenses,
            files: config.files.clone(),
        };

        if !rule.replace
            && rule.name.is_none()
            && rule.version.is_none()
            && rule.homepage.is_none()
            && rule.repository.is_none()
            && rule.licenses.is_none()
            && rule.files.is_none()
        {
            return Err(Error::Config(format!(
                "override '{}' does not change anything",
                config.prefix
            )));
        }

        Ok(rule)
    }

    /// Literal string-prefix match on the build-relative source path.
    pub fn matches(&self, src_path: &str) -> bool {
        src_path.starts_with(&self.prefix)
    }

    pub fn apply(&self, record: &mut PackageRecord) {
        if self.replace {
            *record = PackageRecord::default();
        }
        if let Some(name) = &self.name {
            record.name = Some(name.clone());
        }
        if let Some(version) = &self.version {
            record.version = Some(version.clone());
        }
        if let Some(homepage) = &self.homepage {
            record.homepage = Some(homepage.clone());
        }
        if let Some(repository) = &self.repository {
            record.repository = Some(repository.clone());
        }
        if let Some(licenses) = &self.licenses {
            record.licenses.extend(licenses.iter().cloned());
        }
        if let Some(files) = &self.files {
            record.files.extend(files.iter().cloned());
        }
    }
}

/// Every configured override, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct OverrideRules {
    rules: Vec<OverrideRule>,
}

impl OverrideRules {
    pub fn new(configs: &[OverrideConfig], resolver: &LicenseResolver) -> Result<Self> {
        let rules = configs
            .iter()
            .map(|c| OverrideRule::from_config(c, resolver))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Apply every rule matching `src_path` to `record`. Later rules win for
    /// scalar fields; licenses and files accumulate.
    pub fn apply(&self, src_path: &str, mut record: PackageRecord) -> PackageRecord {
        for rule in self.rules.iter().filter(|r| r.matches(src_path)) {
            debug!("applying override '{}' to {}", rule.prefix, src_path);
            rule.apply(&mut record);
        }
        record
    }
}
