//! Core types for the unit dependency graph.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Section of a unit a `uses` reference appears in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    /// Public surface, up to the `implementation` keyword.
    Interface,
    /// Private body.
    Implementation,
}

/// The kind of an edge in the uses graph. Mirrors [`Section`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Unit uses another unit from its interface section.
    Interface,
    /// Unit uses another unit from its implementation section.
    Implementation,
}

impl From<Section> for EdgeKind {
    fn from(section: Section) -> Self {
        match section {
            Section::Interface => EdgeKind::Interface,
            Section::Implementation => EdgeKind::Implementation,
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Interface => write!(f, "interface"),
            EdgeKind::Implementation => write!(f, "implementation"),
        }
    }
}

/// The units one unit depends on, split by section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitUses {
    /// Name of the unit as first referenced.
    pub unit: String,
    /// Interface uses; case-insensitively sorted, no duplicates.
    pub interface: Vec<String>,
    /// Implementation uses; case-insensitively sorted, no duplicates.
    pub implementation: Vec<String>,
}

impl UnitUses {
    pub fn new(unit: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            interface: Vec::new(),
            implementation: Vec::new(),
        }
    }

    /// Records a use in the given section.
    pub fn add(&mut self, section: Section, name: &str) {
        match section {
            Section::Interface => include_name(&mut self.interface, name),
            Section::Implementation => include_name(&mut self.implementation, name),
        }
    }

    /// All uses tagged with their edge kind, interface first.
    pub fn edges(&self) -> impl Iterator<Item = (&str, EdgeKind)> {
        self.interface
            .iter()
            .map(|u| (u.as_str(), EdgeKind::Interface))
            .chain(
                self.implementation
                    .iter()
                    .map(|u| (u.as_str(), EdgeKind::Implementation)),
            )
    }

    pub fn is_empty(&self) -> bool {
        self.interface.is_empty() && self.implementation.is_empty()
    }
}

/// Case-insensitive lookup key for a unit or include name.
pub fn name_key(name: &str) -> String {
    name.to_ascii_lowercase()
}

/// Inserts `item` into a case-insensitively sorted list unless an equal name
/// (ignoring case) is already present. The first spelling wins.
pub fn include_name(list: &mut Vec<String>, item: &str) {
    let key = name_key(item);
    match list.binary_search_by(|probe| name_key(probe).cmp(&key)) {
        Ok(_) => {}
        Err(at) => list.insert(at, item.to_string()),
    }
}

/// File name without directory and extension: `src/Main.dpr` -> `Main`.
pub fn unit_name_of(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}
