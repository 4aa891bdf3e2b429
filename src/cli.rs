use std::path::PathBuf;

use clap::Parser;

use license_listr::config::Config;

#[derive(Parser, Debug)]
#[command(
    name = "license-listr",
    about = "Build a per-chunk license manifest from bundler stats",
    version
)]
pub struct Cli {
    /// Bundler stats JSON (e.g. `webpack --json > stats.json`)
    pub stats: PathBuf,

    /// Directory module paths are relative to
    #[arg(long, default_value = ".")]
    pub context: PathBuf,

    /// Config file [default: <context>/.license-listr/config.toml, fallback ~/.config/license-listr/config.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output directory, relative to the bundler output path
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Manifest file name
    #[arg(long, value_name = "NAME")]
    pub filename: Option<String>,

    /// Public path prefixed to every emitted URL (overrides the stats value)
    #[arg(long, value_name = "URL")]
    pub public_path: Option<String>,

    /// Copy LICENSE/NOTICE/AUTHORS files of every package
    #[arg(long)]
    pub include_license_files: bool,

    /// Copy every bundled source file next to the manifest
    #[arg(long)]
    pub include_source_files: bool,

    /// Show every package in the summary and debug logs
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print warnings and a one-line summary
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Apply command-line settings on top of the loaded configuration.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(filename) = &self.filename {
            config.filename = filename.clone();
        }
        if let Some(public_path) = &self.public_path {
            config.public_path = Some(public_path.clone());
        }
        if self.include_license_files {
            config.include_license_files = true;
        }
        if self.include_source_files {
            config.include_source_files = true;
        }
    }

    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "license-listr",
            "stats.json",
            "--output-dir",
            "weblabels",
            "--public-path",
            "/static/",
            "--include-source-files",
        ]);
        let mut config = Config::default();
        config.include_license_files = true;
        cli.apply_to(&mut config);
        assert_eq!(config.output_dir, PathBuf::from("weblabels"));
        assert_eq!(config.public_path.as_deref(), Some("/static/"));
        assert!(config.include_source_files);
        assert!(config.include_license_files);
        assert_eq!(config.filename, "licenses.json");
    }

    #[test]
    fn test_log_filter() {
        assert_eq!(Cli::parse_from(["license-listr", "s.json", "-v"]).log_filter(), "debug");
        assert_eq!(Cli::parse_from(["license-listr", "s.json", "-q"]).log_filter(), "warn");
        assert_eq!(Cli::parse_from(["license-listr", "s.json"]).log_filter(), "info");
    }
}
