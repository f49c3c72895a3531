#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Config-driven report table format definitions.
//!
//! Every table type the engine can recover from a report is described by a
//! [`FormatDefinition`]: section start/end patterns, expected header labels,
//! the natural-key contract, the field schema, and the assembly strategy.
//! A single generic engine implementation handles all formats, eliminating
//! per-report parser functions.
//!
//! Definitions are TOML files under `formats/`, baked into the binary at
//! compile time via the [`registry`] module.

pub mod format_def;
pub mod registry;

pub use format_def::{
    AssemblerConfig, FieldDef, FormatDefinition, HeaderConfig, KeyConfig, RowTokenizer, SortOrder,
    parse_format_toml,
};
pub use registry::{all_formats, format_by_id};

/// Errors produced while loading or validating format definitions.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// The TOML config failed to deserialize.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A section or key pattern failed to compile.
    #[error("Invalid pattern in format '{format}': {source}")]
    Pattern {
        /// The format id the bad pattern belongs to.
        format: String,
        /// The underlying regex compile error.
        #[source]
        source: regex::Error,
    },

    /// The definition violates a structural invariant.
    #[error("Invalid format '{format}': {message}")]
    Invalid {
        /// The offending format id.
        format: String,
        /// What is wrong with it.
        message: String,
    },
}
