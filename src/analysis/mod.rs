//! Usage attribution module for modscope.
//!
//! This module takes the static-analysis results for one module version
//! (how often each class, function and resource type is used) and decides
//! which declared dependency most likely provides each element.
//!
//! # Features
//!
//! - Load `kind → element → count` tables in document order
//! - Normalize plural kinds (`classes` → `class`)
//! - Attribute namespaced (`mysql::password`) and flat (`mysql_password`) names
//! - One output row per observation, unresolved elements keep an empty source
//!
//! # Example
//!
//! ```
//! use modscope::analysis::{resolve, ObservationTable};
//!
//! let table = ObservationTable::parse_str(r#"{"classes": {"mysql::server": 2}}"#).unwrap();
//! let rows = resolve("acme-db", "1.2.0", &["puppetlabs-mysql"], table.observations());
//!
//! assert_eq!(rows[0].source.as_deref(), Some("puppetlabs-mysql"));
//! assert_eq!(rows[0].kind, "class");
//! ```

pub mod attribution;
pub mod observations;

// Re-export main types for convenience
pub use attribution::{
    bare_name, find_source, guess_depname, normalize_kind, resolve, version_marker,
    UsageObservation, UsageRow, NAMESPACE_SEPARATOR,
};
pub use observations::{ObservationError, ObservationResult, ObservationTable};
