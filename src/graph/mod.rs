//! Unit dependency graph.
//!
//! Provides the dependency index built from scanned sources, the uses graph
//! with cycle and reverse-trace queries, and directory walking helpers.

pub mod builder;
pub mod engine;
pub mod index;
pub mod types;

pub use builder::{build_index, scan_stats, search_path_from_root, ScanStats};
pub use engine::{format_path, GraphStats, UsesGraph};
pub use index::DependencyIndex;
pub use types::{include_name, name_key, unit_name_of, EdgeKind, Section, UnitUses};
