//! `license-listr` attributes every module of a bundle to its package and
//! license, per output chunk.
//!
//! # Flow
//! 1. Build an [`engine::Engine`] from a validated [`config::Config`]; the
//!    license database is loaded and overrides are resolved here.
//! 2. [`engine::Engine::start`] ingests the bundler stats ([`ingest`]) and
//!    returns a [`engine::BuildRun`] holding every per-build cache.
//! 3. Each module is classified and mapped to its `package.json`
//!    ([`package::classifier`]), whose metadata is parsed once
//!    ([`package::PackageCache`]) and adjusted by [`overrides`].
//! 4. The module is added to the entry of its package in every chunk it
//!    belongs to ([`output`]), copying license and source files as configured
//!    ([`copier`]).
//! 5. [`engine::BuildRun::finish`] sorts, transforms and writes the manifest.

pub mod config;
pub mod copier;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod license;
pub mod models;
pub mod output;
pub mod overrides;
pub mod package;
pub mod report;
pub mod template;

#[cfg(test)]
mod test_support;

pub use engine::{BuildRun, Engine, RunSummary};
pub use error::{Error, Result};
