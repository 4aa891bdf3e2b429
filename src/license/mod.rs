//! License expression handling.
//!
//! - [`database`]: canonical SPDX identifiers with FSF status and reference URLs.
//! - [`spdx`]: correction of informal license strings into SPDX expressions.
//! - [`expression`]: expression tree and strict parser.
//! - [`resolver`]: raw string → manifest labels, with graceful degradation.

pub mod database;
pub mod expression;
pub mod resolver;
pub mod spdx;

pub use database::LicenseDatabase;
pub use resolver::LicenseResolver;
