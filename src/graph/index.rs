//! Dependency index: which units each unit uses.
//!
//! Unit and include files are registered up front by base name. Building
//! from a set of root files then loads units on demand: each unit's source is
//! scanned once, every identifier that names a known unit becomes a use in the
//! current section, and `{$I file}` directives are followed into include files.

use ignore::WalkBuilder;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::types::{name_key, unit_name_of, Section, UnitUses};
use crate::config::UnitGraphConfig;
use crate::error::{Result, UnitGraphError};
use crate::scanner::{self, Mode};
use crate::token::{Position, Token};

/// Maps unit names to their files and their uses.
pub struct DependencyIndex {
    /// Skip uses found in implementation sections.
    pub interface_only: bool,
    config: UnitGraphConfig,

    root_files: Vec<String>,
    /// Index: lowercase unit name -> source path.
    paths: HashMap<String, PathBuf>,
    /// Index: lowercase include name -> include path.
    include_paths: HashMap<String, PathBuf>,
    /// Index: lowercase unit name -> uses. Present once a unit is loaded.
    uses: BTreeMap<String, UnitUses>,
    /// Implementation uses of the last loaded unit that `interface_only`
    /// kept out of its `UnitUses`. `build` still follows them.
    unrecorded: Vec<String>,
}

impl DependencyIndex {
    pub fn new() -> Self {
        Self::with_config(&UnitGraphConfig::default())
    }

    pub fn with_config(config: &UnitGraphConfig) -> Self {
        Self {
            interface_only: config.interface_only,
            config: config.clone(),
            root_files: Vec::new(),
            paths: HashMap::new(),
            include_paths: HashMap::new(),
            uses: BTreeMap::new(),
            unrecorded: Vec::new(),
        }
    }

    // ─── Registration ───────────────────────────────────────────

    /// Registers every unit and include file below `dir`.
    ///
    /// Entries whose name starts with `.` or `~`, or ends with `~`, are
    /// skipped along with everything below them.
    pub fn add_source_dir(&mut self, dir: &Path) -> Result<()> {
        if !dir.is_dir() {
            return Err(UnitGraphError::io(
                dir,
                std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            ));
        }

        let walker = WalkBuilder::new(dir)
            .standard_filters(false)
            .filter_entry(|entry| !is_temp_name(&entry.file_name().to_string_lossy()))
            .build();

        let mut added = 0usize;
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let path = entry
                .path()
                .canonicalize()
                .unwrap_or_else(|_| entry.path().to_path_buf());
            if self.config.is_include_file(&path) {
                self.add_include_path(path);
                added += 1;
            } else if self.config.is_unit_file(&path) {
                self.add_source_path(path);
                added += 1;
            }
        }

        debug!(dir = %dir.display(), files = added, "registered source directory");
        Ok(())
    }

    /// Registers a unit source file. The first file registered for a name wins.
    pub fn add_source_path(&mut self, path: PathBuf) {
        register(&mut self.paths, path);
    }

    /// Registers an include file. The first file registered for a name wins.
    pub fn add_include_path(&mut self, path: PathBuf) {
        register(&mut self.include_paths, path);
    }

    // ─── Building ───────────────────────────────────────────────

    /// Loads the root files and, transitively, every unit they use.
    ///
    /// Implementation uses are followed even with `interface_only` set; they
    /// are only left out of the recorded uses.
    pub fn build<S: AsRef<str>>(&mut self, root_files: &[S]) {
        let mut queue: Vec<String> = Vec::new();
        for root in root_files {
            let name = unit_name_of(root.as_ref());
            self.root_files.push(name.clone());
            queue.push(name);
        }

        while let Some(unit) = queue.pop() {
            let mut used: Vec<String> = match self.load(&unit) {
                Some(uses) => uses.edges().map(|(name, _)| name.to_string()).collect(),
                None => continue,
            };
            used.append(&mut self.unrecorded);
            queue.extend(used.into_iter().filter(|name| !self.is_loaded(name)));
        }

        info!(
            roots = self.root_files.len(),
            units = self.uses.len(),
            "dependency index built"
        );
    }

    pub fn is_loaded(&self, unit: &str) -> bool {
        self.uses.contains_key(&name_key(unit))
    }

    /// Scans a unit and records its uses.
    ///
    /// Returns `None` when the unit was already loaded or has no known source
    /// file. Either way the unit counts as loaded afterwards, so it is never
    /// scanned twice.
    pub fn load(&mut self, unit: &str) -> Option<&UnitUses> {
        let key = name_key(unit);
        self.unrecorded.clear();
        if self.uses.contains_key(&key) {
            return None;
        }
        // Placeholder first: a unit that uses itself through a cycle finds
        // itself loaded.
        self.uses.insert(key.clone(), UnitUses::new(unit));

        let Some(path) = self.paths.get(&key).cloned() else {
            warn!(unit, "did not find path for unit");
            return None;
        };

        let mut uses = UnitUses::new(unit);
        let mut unrecorded = Vec::new();
        self.scan_uses(&mut uses, &mut unrecorded, &path, Section::Interface, 0);
        self.unrecorded = unrecorded;
        self.uses.insert(key.clone(), uses);
        self.uses.get(&key)
    }

    fn scan_uses(
        &self,
        uses: &mut UnitUses,
        unrecorded: &mut Vec<String>,
        path: &Path,
        mut section: Section,
        depth: usize,
    ) {
        let src = match fs::read(path) {
            Ok(src) => src,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read source");
                return;
            }
        };

        let unit_key = name_key(&uses.unit);
        let on_err: scanner::ErrorHandler = Box::new(|pos: &Position, msg: &str| {
            debug!(path = %path.display(), %pos, msg, "scan error");
        });

        let result = scanner::scan(
            &src,
            Mode::empty(),
            |tok, lit| {
                match tok {
                    Token::Directive => {
                        if is_include_directive(lit) {
                            self.handle_include(uses, unrecorded, lit, section, depth);
                        }
                    }
                    Token::Implementation => section = Section::Implementation,
                    Token::Ident => {
                        let key = name_key(lit);
                        if key != unit_key && self.paths.contains_key(&key) {
                            if section == Section::Interface || !self.interface_only {
                                uses.add(section, lit);
                            } else {
                                unrecorded.push(lit.to_string());
                            }
                        }
                    }
                    _ => {}
                }
                ControlFlow::Continue(())
            },
            Some(on_err),
        );

        if let Err(e) = result {
            warn!(path = %path.display(), error = %e, "scan aborted");
        }
    }

    fn handle_include(
        &self,
        uses: &mut UnitUses,
        unrecorded: &mut Vec<String>,
        directive: &str,
        section: Section,
        depth: usize,
    ) {
        let name = include_target(directive);
        if depth >= self.config.max_include_depth {
            warn!(include = name, unit = %uses.unit, "include nesting too deep");
            return;
        }
        let Some(path) = self.include_paths.get(&name_key(&unit_name_of(name))) else {
            debug!(include = name, directive, "failed to include");
            return;
        };
        self.scan_uses(uses, unrecorded, path, section, depth + 1);
    }

    // ─── Query Operations ───────────────────────────────────────

    /// The unit's name as first referenced, looked up case-insensitively.
    pub fn normal_name(&self, unit: &str) -> Option<&str> {
        self.uses.get(&name_key(unit)).map(|u| u.unit.as_str())
    }

    pub fn get(&self, unit: &str) -> Option<&UnitUses> {
        self.uses.get(&name_key(unit))
    }

    /// Loaded units keyed by lowercase name, in key order.
    pub fn uses(&self) -> &BTreeMap<String, UnitUses> {
        &self.uses
    }

    /// Base names of the root files, as given to [`DependencyIndex::build`].
    pub fn root_files(&self) -> &[String] {
        &self.root_files
    }

    pub fn unit_path(&self, unit: &str) -> Option<&Path> {
        self.paths.get(&name_key(unit)).map(PathBuf::as_path)
    }

    pub fn include_path(&self, name: &str) -> Option<&Path> {
        self.include_paths.get(&name_key(name)).map(PathBuf::as_path)
    }

    pub fn known_units(&self) -> usize {
        self.paths.len()
    }
}

impl Default for DependencyIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn register(map: &mut HashMap<String, PathBuf>, path: PathBuf) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let key = name_key(&unit_name_of(&name));
    if map.contains_key(&key) {
        debug!(name, path = %path.display(), "duplicate entry");
        return;
    }
    map.insert(key, path);
}

/// Editor backups and hidden entries.
fn is_temp_name(name: &str) -> bool {
    (name.starts_with('.') && name != "." && name != "..")
        || name.starts_with('~')
        || name.ends_with('~')
}

/// `{$I file}` and `{$INCLUDE file}`, in any case.
fn is_include_directive(directive: &str) -> bool {
    let lower = directive.to_ascii_lowercase();
    lower.starts_with("{$i ") || lower.starts_with("{$include ")
}

/// File named by an include directive: `{$I 'defs.inc'}` -> `defs.inc`.
fn include_target(directive: &str) -> &str {
    let rest = directive
        .find(' ')
        .map_or(directive, |at| &directive[at..]);
    rest.trim_matches(|c| matches!(c, '{' | '}' | '\'' | '"' | ' '))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn index_for(dir: &TempDir) -> DependencyIndex {
        let mut index = DependencyIndex::new();
        index.add_source_dir(dir.path()).unwrap();
        index
    }

    #[test]
    fn test_include_directive_parsing() {
        assert!(is_include_directive("{$I defs.inc}"));
        assert!(is_include_directive("{$include 'defs.inc'}"));
        assert!(!is_include_directive("{$IFDEF DEBUG}"));
        assert!(!is_include_directive("{$I+}"));
        assert_eq!(include_target("{$I defs.inc}"), "defs.inc");
        assert_eq!(include_target("{$INCLUDE 'my defs.inc' }"), "my defs.inc");
        assert_eq!(include_target("{$I \"x.inc\"}"), "x.inc");
    }

    #[test]
    fn test_temp_names() {
        assert!(is_temp_name(".git"));
        assert!(is_temp_name("~backup.pas"));
        assert!(is_temp_name("Unit1.pas~"));
        assert!(!is_temp_name("Unit1.pas"));
        assert!(!is_temp_name("."));
    }

    #[test]
    fn test_sections_and_self_reference() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "Main.dpr",
            "program Main;\nuses SysUtils, Utils;\nbegin Main; end.",
        );
        write(
            dir.path(),
            "Utils.pas",
            "unit Utils;\ninterface\nuses sysutils;\nimplementation\nuses Helpers, SYSUTILS;\nend.",
        );
        write(dir.path(), "SysUtils.pas", "unit SysUtils;\ninterface\nimplementation\nend.");
        write(dir.path(), "Helpers.pas", "unit Helpers;\ninterface\nimplementation\nuses Utils;\nend.");
        write(dir.path(), "Unused.pas", "unit Unused;\nend.");

        let mut index = index_for(&dir);
        index.build(&["Main.dpr"]);

        let main = index.get("main").unwrap();
        assert_eq!(main.interface, vec!["SysUtils", "Utils"]);
        assert!(main.implementation.is_empty());

        let utils = index.get("Utils").unwrap();
        assert_eq!(utils.interface, vec!["sysutils"]);
        assert_eq!(utils.implementation, vec!["Helpers", "SYSUTILS"]);

        assert_eq!(index.get("helpers").unwrap().implementation, vec!["Utils"]);
        assert!(index.is_loaded("SYSUTILS"));
        assert!(!index.is_loaded("Unused"));
        assert_eq!(index.uses().len(), 4);
        assert_eq!(index.root_files(), ["Main"]);
    }

    #[test]
    fn test_interface_only_still_loads_units() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "R.dpr", "unit R;\ninterface\nimplementation\nuses A;\nend.");
        write(dir.path(), "A.pas", "unit A;\ninterface\nuses B;\nimplementation\nuses C;\nend.");
        write(dir.path(), "B.pas", "unit B; end.");
        write(dir.path(), "C.pas", "unit C; end.");

        let mut index = index_for(&dir);
        index.interface_only = true;
        index.build(&["R"]);

        let r = index.get("R").unwrap();
        assert!(r.implementation.is_empty());
        assert!(r.interface.is_empty());
        assert!(index.is_loaded("A"));

        let a = index.get("A").unwrap();
        assert_eq!(a.interface, vec!["B"]);
        assert!(a.implementation.is_empty());
        assert!(index.is_loaded("B"));
        assert!(index.is_loaded("C"));
        assert_eq!(index.uses().len(), 4);
    }

    #[test]
    fn test_include_files_carry_section() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "Main.pas",
            "unit Main;\ninterface\n{$I head.inc}\nimplementation\n{$INCLUDE 'body.inc'}\nend.",
        );
        write(dir.path(), "head.inc", "uses Alpha;");
        write(dir.path(), "body.inc", "uses Beta; {$I missing.inc}");
        write(dir.path(), "Alpha.pas", "unit Alpha; end.");
        write(dir.path(), "Beta.pas", "unit Beta; end.");

        let mut index = index_for(&dir);
        index.build(&["Main.pas"]);

        let main = index.get("main").unwrap();
        assert_eq!(main.interface, vec!["Alpha"]);
        assert_eq!(main.implementation, vec!["Beta"]);
        assert!(index.include_path("HEAD").is_some());
    }

    #[test]
    fn test_recursive_include_is_bounded() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "Main.pas", "unit Main; interface {$I loop.inc} end.");
        write(dir.path(), "loop.inc", "uses Alpha; {$I loop.inc}");
        write(dir.path(), "Alpha.pas", "unit Alpha; end.");

        let mut index = index_for(&dir);
        index.build(&["Main"]);
        assert_eq!(index.get("Main").unwrap().interface, vec!["Alpha"]);
    }

    #[test]
    fn test_missing_unit_is_loaded_but_empty() {
        let mut index = DependencyIndex::new();
        assert!(index.load("Ghost").is_none());
        assert!(index.is_loaded("ghost"));
        assert!(index.get("GHOST").unwrap().is_empty());
        assert!(index.load("Ghost").is_none());
    }

    #[test]
    fn test_normal_name() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "main.dpr", "program main; uses MyUnit; end.");
        write(dir.path(), "myunit.pas", "unit MyUnit; end.");

        let mut index = index_for(&dir);
        assert_eq!(index.normal_name("myunit"), None);
        index.build(&["main.dpr"]);
        assert_eq!(index.normal_name("MYUNIT"), Some("MyUnit"));
        assert_eq!(index.normal_name("myunit"), Some("MyUnit"));
        assert_eq!(index.normal_name("other"), None);
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let mut index = DependencyIndex::new();
        index.add_source_path(PathBuf::from("a/Utils.pas"));
        index.add_source_path(PathBuf::from("b/UTILS.pas"));
        assert_eq!(index.unit_path("utils"), Some(Path::new("a/Utils.pas")));
        assert_eq!(index.known_units(), 1);
    }

    #[test]
    fn test_hidden_and_backup_entries_are_skipped() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".history")).unwrap();
        write(&dir.path().join(".history"), "Old.pas", "unit Old; end.");
        write(dir.path(), "~Temp.pas", "unit Temp; end.");
        write(dir.path(), "Real.pas", "unit Real; end.");

        let index = index_for(&dir);
        assert!(index.unit_path("Real").is_some());
        assert!(index.unit_path("Old").is_none());
        assert!(index.unit_path("~Temp").is_none());
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let mut index = DependencyIndex::new();
        assert!(index.add_source_dir(Path::new("/definitely/not/here")).is_err());
    }
}
