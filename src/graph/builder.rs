//! Index builder: registers source directories and builds the dependency index.
//!
//! Walks directories with `ignore`, registering units and include files, then
//! loads everything reachable from the root files.

use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::index::DependencyIndex;
use crate::config::UnitGraphConfig;
use crate::error::{Result, UnitGraphError};

/// Builds a dependency index for `roots`.
///
/// Roots naming existing files are registered before anything else, so an
/// explicitly given project file wins over a same-named unit in the search
/// path. `root_dir`, when given, must exist; its whole tree is registered
/// next. Search directories that cannot be walked are skipped with a warning.
pub fn build_index<S: AsRef<str>>(
    config: &UnitGraphConfig,
    roots: &[S],
    root_dir: Option<&Path>,
    search: &[PathBuf],
) -> Result<DependencyIndex> {
    let mut index = DependencyIndex::with_config(config);

    for root in roots {
        let path = Path::new(root.as_ref());
        if path.is_file() {
            index.add_source_path(path.canonicalize().map_err(|e| UnitGraphError::io(path, e))?);
        }
    }
    if let Some(dir) = root_dir {
        index.add_source_dir(dir)?;
    }
    for dir in search {
        if let Err(e) = index.add_source_dir(dir) {
            warn!(dir = %dir.display(), error = %e, "skipping search directory");
        }
    }

    info!(units = index.known_units(), "registered sources");
    index.build(roots);
    Ok(index)
}

/// Directories below `root` holding `.pas` or `.inc` files, in walk order.
///
/// Directories are compared case-insensitively; the first spelling is kept.
pub fn search_path_from_root(root: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();

    for entry in source_files(root) {
        let path = entry.path();
        let wanted = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pas") || ext.eq_ignore_ascii_case("inc"));
        if !wanted {
            continue;
        }
        let Some(dir) = path.parent() else {
            continue;
        };
        let seen = dirs
            .iter()
            .any(|d| d.to_string_lossy().eq_ignore_ascii_case(&dir.to_string_lossy()));
        if !seen {
            dirs.push(dir.to_path_buf());
        }
    }

    dirs
}

/// Counts the files a directory would contribute to an index.
pub fn scan_stats(config: &UnitGraphConfig, root: &Path) -> ScanStats {
    let mut stats = ScanStats::default();

    for entry in source_files(root) {
        let path = entry.path();
        if config.is_unit_file(path) {
            stats.unit_files += 1;
        } else if config.is_include_file(path) {
            stats.include_files += 1;
        }
    }

    stats
}

fn source_files(root: &Path) -> impl Iterator<Item = ignore::DirEntry> {
    WalkBuilder::new(root)
        .standard_filters(false)
        .hidden(true)
        .sort_by_file_path(|a, b| a.cmp(b))
        .build()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_some_and(|ft| ft.is_file()))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub unit_files: usize,
    pub include_files: usize,
}

impl std::fmt::Display for ScanStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Found {} source files (units: {}, includes: {})",
            self.unit_files + self.include_files,
            self.unit_files,
            self.include_files
        )
    }
}
