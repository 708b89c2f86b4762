//! Report writers for a built dependency index.
//!
//! Every writer walks units in key order so reports are reproducible. Uses are
//! printed with the spelling of the unit they name, not the spelling at the
//! use site.

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::Path;

use crate::error::{Result, UnitGraphError};
use crate::graph::{name_key, DependencyIndex, EdgeKind, UsesGraph};

/// Report format, chosen by output file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Per-unit listing with cycle warnings.
    Txt,
    /// Graphviz digraph.
    Dot,
    /// Trivial Graph Format.
    Tgf,
    /// Plain edge list.
    Glay,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "txt" => Ok(Self::Txt),
            "dot" => Ok(Self::Dot),
            "tgf" => Ok(Self::Tgf),
            "glay" => Ok(Self::Glay),
            _ => Err(UnitGraphError::UnknownFormat(ext)),
        }
    }
}

/// Writes `index` in the given format.
pub fn write_report<W: Write>(format: OutputFormat, w: &mut W, index: &DependencyIndex) -> io::Result<()> {
    match format {
        OutputFormat::Txt => {
            let cycles = UsesGraph::from_index(index).find_cycles();
            write_txt(w, index, &cycles)
        }
        OutputFormat::Dot => write_dot(w, index),
        OutputFormat::Tgf => write_tgf(w, index),
        OutputFormat::Glay => write_glay(w, index),
    }
}

pub fn write_txt<W: Write>(w: &mut W, index: &DependencyIndex, cycles: &[Vec<String>]) -> io::Result<()> {
    if !cycles.is_empty() {
        writeln!(w, "Circular interface uses:")?;
        for cycle in cycles {
            writeln!(w, "\t{}", cycle.join(", "))?;
        }
        writeln!(w)?;
    }

    for uses in index.uses().values() {
        writeln!(w, "# {}", uses.unit)?;
        for (name, kind) in uses.edges() {
            let marker = match kind {
                EdgeKind::Interface => '+',
                EdgeKind::Implementation => '-',
            };
            writeln!(w, "\t{} {}", marker, display_name(index, name))?;
        }
        writeln!(w)?;
    }
    Ok(())
}

pub fn write_dot<W: Write>(w: &mut W, index: &DependencyIndex) -> io::Result<()> {
    writeln!(w, "digraph G{{")?;
    for uses in index.uses().values() {
        for (name, kind) in uses.edges() {
            let target = display_name(index, name);
            match kind {
                EdgeKind::Interface => writeln!(w, "\t{} -> {};", uses.unit, target)?,
                EdgeKind::Implementation => writeln!(
                    w,
                    "\t{} -> {} [style=dashed;dir=both;weight=0];",
                    uses.unit, target
                )?,
            }
        }
    }
    writeln!(w, "}}")
}

/// Node lines `id name` with ids from 1, a `#` line, then edge lines
/// `from to`. Uses of units that were never loaded have no id and are left out.
pub fn write_tgf<W: Write>(w: &mut W, index: &DependencyIndex) -> io::Result<()> {
    let mut ids: HashMap<&str, usize> = HashMap::with_capacity(index.uses().len());
    for (id, (key, uses)) in index.uses().iter().enumerate() {
        ids.insert(key.as_str(), id + 1);
        writeln!(w, "{} {}", id + 1, uses.unit)?;
    }

    writeln!(w, "#")?;

    for (key, uses) in index.uses() {
        let from = ids[key.as_str()];
        for (name, _) in uses.edges() {
            if let Some(to) = ids.get(name_key(name).as_str()) {
                writeln!(w, "{} {}", from, to)?;
            }
        }
    }
    Ok(())
}

pub fn write_glay<W: Write>(w: &mut W, index: &DependencyIndex) -> io::Result<()> {
    for uses in index.uses().values() {
        for (name, _) in uses.edges() {
            writeln!(w, "\t{} -> {};", uses.unit, display_name(index, name))?;
        }
    }
    Ok(())
}

fn display_name<'a>(index: &'a DependencyIndex, name: &'a str) -> &'a str {
    index.normal_name(name).unwrap_or(name)
}
