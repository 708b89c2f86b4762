//! Tokenizing many files at once.

use rayon::prelude::*;
use serde::Serialize;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{ErrorHandler, Mode, Scanner, MAX_ERRORS};
use crate::error::{Result, UnitGraphError};
use crate::token::{FileSet, Position, Token};

/// One scanned token with its resolved position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenInfo {
    pub position: Position,
    pub token: Token,
    pub literal: String,
}

/// A scan error reported while tokenizing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanError {
    pub position: Position,
    pub message: String,
}

/// The token stream of one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileTokens {
    pub path: PathBuf,
    pub tokens: Vec<TokenInfo>,
    pub errors: Vec<ScanError>,
    /// Set when scanning stopped after too many errors.
    pub truncated: bool,
}

/// Tokenizes every file in parallel. Results keep the order of `paths`.
pub fn tokenize_files(paths: &[PathBuf], mode: Mode) -> Vec<Result<FileTokens>> {
    paths.par_iter().map(|path| tokenize_file(path, mode)).collect()
}

/// Reads and tokenizes one file. The final EOF token is not included.
pub fn tokenize_file(path: &Path, mode: Mode) -> Result<FileTokens> {
    let src = fs::read(path).map_err(|e| UnitGraphError::io(path, e))?;
    let tokens = tokenize_source(&path.to_string_lossy(), &src, mode)?;
    Ok(FileTokens {
        path: path.to_path_buf(),
        ..tokens
    })
}

/// Tokenizes `src`, reporting positions against `name`.
pub fn tokenize_source(name: &str, src: &[u8], mode: Mode) -> Result<FileTokens> {
    let mut fset = FileSet::new();
    let base = fset.base();
    let file = fset.add_file(name, base, src.len());

    let errors = RefCell::new(Vec::new());
    let mut raw = Vec::new();
    let mut truncated = false;
    {
        let on_err: ErrorHandler = Box::new(|pos: &Position, msg: &str| {
            errors.borrow_mut().push(ScanError {
                position: pos.clone(),
                message: msg.to_string(),
            });
        });
        let mut s = Scanner::new(file, src, Some(on_err), mode)?;
        loop {
            let (pos, tok, lit) = s.scan();
            if tok == Token::Eof {
                break;
            }
            raw.push((pos, tok, lit));
            if s.error_count() > MAX_ERRORS {
                truncated = true;
                break;
            }
        }
    }

    let tokens: Vec<TokenInfo> = raw
        .into_iter()
        .map(|(pos, token, literal)| TokenInfo {
            position: fset.position(pos),
            token,
            literal,
        })
        .collect();
    let errors = errors.into_inner();
    debug!(
        file = name,
        tokens = tokens.len(),
        errors = errors.len(),
        "tokenized"
    );

    Ok(FileTokens {
        path: PathBuf::from(name),
        tokens,
        errors,
        truncated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_tokenize_source_positions() {
        let out = tokenize_source("a.pas", b"x := 1;\ny", Mode::empty()).unwrap();
        let summary: Vec<_> = out
            .tokens
            .iter()
            .map(|t| (t.position.to_string(), t.token, t.literal.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("a.pas:1:1".to_string(), Token::Ident, "x"),
                ("a.pas:1:3".to_string(), Token::Assign, ""),
                ("a.pas:1:6".to_string(), Token::Integer, "1"),
                ("a.pas:1:7".to_string(), Token::Semicolon, ""),
                ("a.pas:2:1".to_string(), Token::Ident, "y"),
            ]
        );
        assert!(out.errors.is_empty());
        assert!(!out.truncated);
    }

    #[test]
    fn test_errors_are_collected() {
        let out = tokenize_source("bad.pas", b"a ? 'open", Mode::empty()).unwrap();
        let messages: Vec<_> = out.errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["illegal character 0x3F", "string literal not terminated"]
        );
        assert_eq!(out.errors[0].position.to_string(), "bad.pas:1:3");
    }

    #[test]
    fn test_too_many_errors_truncates() {
        let src = "?".repeat(20);
        let out = tokenize_source("q.pas", src.as_bytes(), Mode::empty()).unwrap();
        assert!(out.truncated);
        assert_eq!(out.tokens.len(), MAX_ERRORS + 1);
    }

    #[test]
    fn test_tokenize_files_keeps_order() {
        let dir = TempDir::new().unwrap();
        let mut paths = Vec::new();
        for i in 0..8 {
            let path = dir.path().join(format!("u{i}.pas"));
            fs::write(&path, "a ".repeat(i + 1)).unwrap();
            paths.push(path);
        }
        paths.push(dir.path().join("missing.pas"));

        let results = tokenize_files(&paths, Mode::SCAN_COMMENTS);
        assert_eq!(results.len(), 9);
        for (i, result) in results.iter().take(8).enumerate() {
            let tokens = result.as_ref().unwrap();
            assert_eq!(tokens.path, paths[i]);
            assert_eq!(tokens.tokens.len(), i + 1);
        }
        assert!(matches!(results[8], Err(UnitGraphError::Io { .. })));
    }
}
