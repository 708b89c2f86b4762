//! Source positions shared across many files.
//!
//! A [`FileSet`] lays its files out in one address space: every file owns the
//! half-open range `base..=base + size`, and a [`Pos`] is a plain offset into
//! that space. Resolving a `Pos` back into file, line and column goes through
//! the set that produced it.

use serde::Serialize;
use std::fmt;

/// Compact position in a [`FileSet`]. `Pos::NONE` is never inside a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Pos(pub usize);

impl Pos {
    pub const NONE: Pos = Pos(0);

    pub fn is_valid(self) -> bool {
        self != Pos::NONE
    }
}

/// Human readable location of a [`Pos`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Position {
    pub filename: String,
    /// Byte offset within the file, starting at 0.
    pub offset: usize,
    /// Line number, starting at 1. Zero means the position is invalid.
    pub line: usize,
    /// Column number (in bytes), starting at 1.
    pub column: usize,
}

impl Position {
    pub fn is_valid(&self) -> bool {
        self.line > 0
    }
}

impl fmt::Display for Position {
    /// Formats as `file:line:column`, `line:column`, `file` or `-`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.filename.is_empty(), self.is_valid()) {
            (false, true) => write!(f, "{}:{}:{}", self.filename, self.line, self.column),
            (true, true) => write!(f, "{}:{}", self.line, self.column),
            (false, false) => write!(f, "{}", self.filename),
            (true, false) => write!(f, "-"),
        }
    }
}

/// A file registered in a [`FileSet`].
///
/// The size is fixed at registration; the line table grows while the scanner
/// walks the content.
#[derive(Debug, Clone)]
pub struct File {
    name: String,
    base: usize,
    size: usize,
    /// Offsets of the first byte of each line; always starts with 0.
    lines: Vec<usize>,
}

impl File {
    fn new(name: String, base: usize, size: usize) -> Self {
        Self {
            name,
            base,
            size,
            lines: vec![0],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> usize {
        self.base
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Records a line start. Offsets that do not extend the table (already seen
    /// or out of range) are ignored, so re-scanning a file is harmless.
    pub fn add_line(&mut self, offset: usize) {
        let last = self.lines.last().copied().unwrap_or(0);
        if last < offset && offset < self.size {
            self.lines.push(offset);
        }
    }

    /// Position for a byte offset in this file.
    ///
    /// # Panics
    /// If `offset` is past the end of the file.
    pub fn pos(&self, offset: usize) -> Pos {
        assert!(offset <= self.size, "illegal file offset {offset}");
        Pos(self.base + offset)
    }

    /// Byte offset of a position in this file.
    ///
    /// # Panics
    /// If `pos` belongs to a different file.
    pub fn offset(&self, pos: Pos) -> usize {
        assert!(
            self.contains(pos),
            "illegal Pos value {} for file {:?}",
            pos.0,
            self.name
        );
        pos.0 - self.base
    }

    pub fn contains(&self, pos: Pos) -> bool {
        self.base <= pos.0 && pos.0 <= self.base + self.size
    }

    /// Resolves a position in this file; out-of-range positions come back
    /// invalid instead of panicking.
    pub fn position(&self, pos: Pos) -> Position {
        if !self.contains(pos) {
            return Position::default();
        }
        let offset = pos.0 - self.base;
        let line = match self.lines.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        Position {
            filename: self.name.clone(),
            offset,
            line: line + 1,
            column: offset - self.lines[line] + 1,
        }
    }
}

/// A set of source files sharing one position space.
#[derive(Debug, Clone)]
pub struct FileSet {
    base: usize,
    files: Vec<File>,
}

impl FileSet {
    pub fn new() -> Self {
        Self {
            base: 1,
            files: Vec::new(),
        }
    }

    /// The lowest base a newly added file may use.
    pub fn base(&self) -> usize {
        self.base
    }

    /// Registers a file covering `base..=base + size`. A `base` below
    /// [`FileSet::base`] is raised to it so ranges never overlap.
    pub fn add_file(&mut self, name: impl Into<String>, base: usize, size: usize) -> &mut File {
        let base = base.max(self.base);
        self.base = base + size + 1;
        self.files.push(File::new(name.into(), base, size));
        let last = self.files.len() - 1;
        &mut self.files[last]
    }

    pub fn files(&self) -> &[File] {
        &self.files
    }

    /// The file containing `pos`, found by binary search over the file bases.
    pub fn file(&self, pos: Pos) -> Option<&File> {
        let idx = match self.files.binary_search_by_key(&pos.0, |f| f.base) {
            Ok(i) => i,
            Err(0) => return None,
            Err(i) => i - 1,
        };
        self.files.get(idx).filter(|f| f.contains(pos))
    }

    pub fn position(&self, pos: Pos) -> Position {
        self.file(pos)
            .map(|f| f.position(pos))
            .unwrap_or_default()
    }
}

impl Default for FileSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_ranges_do_not_overlap() {
        let mut fset = FileSet::new();
        let base = fset.base();
        let a = fset.add_file("a.pas", base, 10).base();
        let base = fset.base();
        let b = fset.add_file("b.pas", base, 5).base();
        assert_eq!(a, 1);
        assert_eq!(b, 12);
        assert_eq!(fset.file(Pos(11)).map(File::name), Some("a.pas"));
        assert_eq!(fset.file(Pos(12)).map(File::name), Some("b.pas"));
        assert!(fset.file(Pos(0)).is_none());
        assert!(fset.file(Pos(100)).is_none());
    }

    #[test]
    fn test_add_line_is_idempotent() {
        let mut fset = FileSet::new();
        let file = fset.add_file("x.pas", 0, 20);
        file.add_line(5);
        file.add_line(5);
        file.add_line(3);
        file.add_line(20);
        file.add_line(12);
        assert_eq!(file.line_count(), 3);
    }

    #[test]
    fn test_position_resolution() {
        let mut fset = FileSet::new();
        let file = fset.add_file("unit.pas", 0, 12);
        file.add_line(4);
        file.add_line(9);
        let pos = file.pos(6);

        let position = fset.position(pos);
        assert_eq!(position.line, 2);
        assert_eq!(position.column, 3);
        assert_eq!(position.offset, 6);
        assert_eq!(position.to_string(), "unit.pas:2:3");

        assert!(!fset.position(Pos::NONE).is_valid());
        assert_eq!(fset.position(Pos::NONE).to_string(), "-");
    }
}
