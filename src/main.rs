//! `license-listr` writes a per-chunk license manifest for a finished bundle.
//!
//! # Flow
//! 1. Parse CLI arguments ([`cli`]) and set up logging.
//! 2. Load config ([`license_listr::config::load_config`]) and apply flags on top.
//! 3. Read the bundler stats JSON.
//! 4. Feed every module through a [`license_listr::BuildRun`].
//! 5. Write the manifest and print a summary ([`license_listr::report::terminal`]).

mod cli;

use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use cli::Cli;
use license_listr::config::load_config;
use license_listr::models::BuildStats;
use license_listr::report;
use license_listr::Engine;

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter())),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Resolve project path
    let context = cli
        .context
        .canonicalize()
        .unwrap_or_else(|_| cli.context.clone());

    let mut config = load_config(&context, cli.config.as_deref())?;
    cli.apply_to(&mut config);

    let raw = fs::read_to_string(&cli.stats)
        .with_context(|| format!("Failed to read {}", cli.stats.display()))?;
    let stats: BuildStats = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse bundler stats {}", cli.stats.display()))?;

    let engine = Engine::new(config, &context)?;
    let mut run = engine.start(&stats)?;

    let pb = if !cli.quiet {
        let pb = ProgressBar::new(stats.modules.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    for module in &stats.modules {
        pb.set_message(module.name.clone());
        run.visit(module)
            .with_context(|| format!("Failed to process module {}", module.name))?;
        pb.inc(1);
    }
    pb.finish_and_clear();

    let summary = run.finish()?;
    report::terminal::render(&summary, cli.verbose, cli.quiet);

    Ok(())
}
