//! Report renderers for finished runs.
//!
//! - [`terminal`]: colored summary box and package tables; respects `--verbose` / `--quiet`.

pub mod terminal;
