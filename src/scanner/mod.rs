//! Scanner for Pascal-family source text.
//!
//! The scanner takes a byte slice and hands out one token per call to
//! [`Scanner::scan`]. Bytes are treated as independent 8-bit characters; no
//! multi-byte decoding takes place, so a byte with its high bit set is a single
//! (illegal outside literals and comments) character.
//!
//! Malformed input never stops the scanner. Each problem is counted, passed to
//! the optional error handler, and scanning continues with the best token it
//! can produce.

mod batch;
mod quote;

pub use batch::{tokenize_file, tokenize_files, tokenize_source, FileTokens, ScanError, TokenInfo};
pub use quote::quote;

use std::ops::ControlFlow;

use crate::error::{Result, UnitGraphError};
use crate::token::{self, File, FileSet, Pos, Position, Token};

/// Called with the position and message of every scan error.
pub type ErrorHandler<'a> = Box<dyn FnMut(&Position, &str) + 'a>;

/// Scanner behaviour flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mode(u8);

impl Mode {
    /// Return comments as [`Token::Comment`] instead of skipping them.
    pub const SCAN_COMMENTS: Mode = Mode(1);

    pub const fn empty() -> Self {
        Mode(0)
    }

    pub fn contains(self, other: Mode) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for Mode {
    type Output = Mode;

    fn bitor(self, rhs: Mode) -> Mode {
        Mode(self.0 | rhs.0)
    }
}

/// UTF-8 encoded byte order mark, only skipped at the very start of a file.
const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Scanner errors tolerated by [`scan`] before it gives up.
pub const MAX_ERRORS: usize = 10;

/// Holds the scanner state while tokenizing one file.
///
/// A scanner borrows the [`File`] it records line starts into; once it is
/// dropped, positions can be resolved through the owning [`FileSet`].
pub struct Scanner<'a> {
    file: &'a mut File,
    src: &'a [u8],
    err: Option<ErrorHandler<'a>>,
    mode: Mode,

    /// Current character, `None` at end of input.
    ch: Option<u8>,
    offset: usize,
    rd_offset: usize,

    /// Last token returned that was neither a comment nor a directive.
    last_tok: Token,

    error_count: usize,
}

fn is_letter(ch: Option<u8>) -> bool {
    matches!(ch, Some(b'a'..=b'z' | b'A'..=b'Z' | b'_'))
}

fn is_digit(ch: Option<u8>) -> bool {
    matches!(ch, Some(b'0'..=b'9'))
}

fn is_hex_digit(ch: Option<u8>) -> bool {
    matches!(ch, Some(b'0'..=b'9' | b'a'..=b'f' | b'A'..=b'F'))
}

fn digit_val(ch: Option<u8>) -> u32 {
    match ch {
        Some(c @ b'0'..=b'9') => u32::from(c - b'0'),
        Some(c @ b'a'..=b'f') => u32::from(c - b'a' + 10),
        Some(c @ b'A'..=b'F') => u32::from(c - b'A' + 10),
        _ => 16,
    }
}

/// One `char` per byte, so literal text keeps the byte length of its span.
fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

impl<'a> Scanner<'a> {
    /// Prepares a scanner positioned at the start of `src`.
    ///
    /// Line starts are recorded into `file`; re-using a file that was already
    /// scanned is fine since known line starts are ignored. Fails when the file
    /// size does not match `src`.
    pub fn new(
        file: &'a mut File,
        src: &'a [u8],
        err: Option<ErrorHandler<'a>>,
        mode: Mode,
    ) -> Result<Self> {
        if file.size() != src.len() {
            return Err(UnitGraphError::SizeMismatch {
                size: file.size(),
                len: src.len(),
            });
        }

        let mut s = Scanner {
            file,
            src,
            err,
            mode,
            ch: Some(b' '),
            offset: 0,
            rd_offset: 0,
            last_tok: Token::Illegal,
            error_count: 0,
        };

        s.next();
        if src.starts_with(BOM) {
            s.next();
            s.next();
            s.next();
        }
        Ok(s)
    }

    /// Number of errors reported so far.
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn file(&self) -> &File {
        self.file
    }

    /// Resolves a position handed out by this scanner.
    pub fn position(&self, pos: Pos) -> Position {
        self.file.position(pos)
    }

    fn next(&mut self) {
        if self.rd_offset < self.src.len() {
            self.offset = self.rd_offset;
            if self.ch == Some(b'\n') {
                self.file.add_line(self.offset);
            }
            self.ch = Some(self.src[self.rd_offset]);
            self.rd_offset += 1;
        } else {
            self.offset = self.src.len();
            if self.ch == Some(b'\n') {
                self.file.add_line(self.offset);
            }
            self.ch = None;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.rd_offset).copied()
    }

    fn error(&mut self, offset: usize, msg: &str) {
        if let Some(handler) = self.err.as_mut() {
            let pos = self.file.pos(offset);
            handler(&self.file.position(pos), msg);
        }
        self.error_count += 1;
    }

    fn literal(&self, start: usize) -> String {
        latin1(&self.src[start..self.offset])
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.ch, Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.next();
        }
    }

    /// Scans a comment or directive whose first character has been consumed:
    /// `//`, `(*` or `{`.
    fn scan_comment(&mut self, first: u8) -> String {
        let start = self.offset - 1;

        let terminated = match first {
            b'/' => {
                self.next();
                while !matches!(self.ch, Some(b'\n') | None) {
                    self.next();
                }
                true
            }
            b'(' => {
                self.next();
                loop {
                    let Some(ch) = self.ch else { break false };
                    self.next();
                    if ch == b'*' && self.ch == Some(b')') {
                        self.next();
                        break true;
                    }
                }
            }
            _ => loop {
                let Some(ch) = self.ch else { break false };
                self.next();
                if ch == b'}' {
                    break true;
                }
            },
        };

        if !terminated {
            self.error(start, "comment not terminated");
        }
        self.literal(start)
    }

    fn scan_identifier(&mut self) -> String {
        let start = self.offset;
        while is_letter(self.ch) || is_digit(self.ch) {
            self.next();
        }
        self.literal(start)
    }

    fn scan_mantissa(&mut self, base: u32) {
        while digit_val(self.ch) < base {
            self.next();
        }
    }

    fn scan_number(&mut self) -> (Token, String) {
        let start = self.offset;

        if self.ch == Some(b'$') {
            self.next();
            self.scan_mantissa(16);
            if self.offset - start <= 1 {
                self.error(start, "illegal hexadecimal number");
            }
            return (Token::Integer, self.literal(start));
        }

        let mut tok = Token::Integer;
        self.scan_mantissa(10);

        // `0..14` is a range, and `1.` without digits is not a float either.
        if self.ch == Some(b'.') && is_digit(self.peek()) {
            tok = Token::Float;
            self.next();
            self.scan_mantissa(10);
        }

        if matches!(self.ch, Some(b'e' | b'E')) {
            tok = Token::Float;
            self.next();
            if matches!(self.ch, Some(b'-' | b'+')) {
                self.next();
            }
            self.scan_mantissa(10);
        }

        (tok, self.literal(start))
    }

    /// Scans a quoted string; the opening `'` has been consumed. Returns the
    /// raw text and the number of characters it denotes.
    fn scan_string(&mut self) -> (String, usize) {
        let start = self.offset - 1;
        let mut chars = 0;
        loop {
            let ch = match self.ch {
                Some(b'\n') | None => {
                    self.error(start, "string literal not terminated");
                    break;
                }
                Some(ch) => ch,
            };
            self.next();
            if ch == b'\'' {
                if self.ch == Some(b'\'') {
                    self.next();
                } else {
                    break;
                }
            }
            chars += 1;
        }
        (self.literal(start), chars)
    }

    /// Scans `#13` or `#$0D`; the `#` has been consumed.
    fn scan_char(&mut self) -> String {
        let start = self.offset - 1;
        let hex = self.ch == Some(b'$');
        if hex {
            self.next();
        }
        let digits = self.offset;
        if hex {
            while is_hex_digit(self.ch) {
                self.next();
            }
        } else {
            while is_digit(self.ch) {
                self.next();
            }
        }
        if self.offset == digits {
            self.error(start, "illegal character literal");
        }
        self.literal(start)
    }

    /// `ch0`, or `ch1` when followed by `=`.
    fn switch2(&mut self, tok0: Token, tok1: Token) -> Token {
        if self.ch == Some(b'=') {
            self.next();
            return tok1;
        }
        tok0
    }

    /// Like [`Scanner::switch2`], with `tok2` when followed by `ch2`.
    fn switch3(&mut self, tok0: Token, tok1: Token, ch2: u8, tok2: Token) -> Token {
        if self.ch == Some(b'=') {
            self.next();
            return tok1;
        }
        if self.ch == Some(ch2) {
            self.next();
            return tok2;
        }
        tok0
    }

    /// Returns the next token with its position and literal text.
    ///
    /// Literals, keywords, comments and directives carry their source text;
    /// an illegal token carries the offending byte. Delimiters and `Eof` come
    /// with an empty string. Once the end is reached every further call
    /// returns [`Token::Eof`] again.
    ///
    /// A clean token stream does not imply clean input: check
    /// [`Scanner::error_count`] or the error handler.
    pub fn scan(&mut self) -> (Pos, Token, String) {
        loop {
            self.skip_whitespace();

            let start = self.offset;
            let pos = self.file.pos(start);
            let mut lit = String::new();

            let tok = match self.ch {
                ch if is_letter(ch) => {
                    lit = self.scan_identifier();
                    // No keyword is a single character.
                    if lit.len() > 1 {
                        token::lookup(&lit)
                    } else {
                        Token::Ident
                    }
                }
                ch if is_digit(ch) || ch == Some(b'$') => {
                    let (tok, text) = self.scan_number();
                    lit = text;
                    tok
                }
                None => Token::Eof,
                Some(ch) => {
                    self.next();
                    match ch {
                        b'\'' => {
                            let (text, chars) = self.scan_string();
                            lit = text;
                            if chars == 1 {
                                Token::Char
                            } else {
                                Token::String
                            }
                        }
                        b'#' => {
                            lit = self.scan_char();
                            Token::Char
                        }
                        b'^' => self.scan_hat(&mut lit),
                        b':' => self.switch2(Token::Colon, Token::Assign),
                        b'.' => {
                            if self.ch == Some(b'.') {
                                self.next();
                                Token::Ellipsis
                            } else {
                                Token::Period
                            }
                        }
                        b',' => Token::Comma,
                        b';' => Token::Semicolon,
                        b'(' if self.ch == Some(b'*') => {
                            let comment = self.scan_comment(b'(');
                            if !self.mode.contains(Mode::SCAN_COMMENTS) {
                                continue;
                            }
                            lit = comment;
                            Token::Comment
                        }
                        b'(' => Token::LParen,
                        b')' => Token::RParen,
                        b'[' => Token::LBrack,
                        b']' => Token::RBrack,
                        b'+' => Token::Add,
                        b'-' => Token::Sub,
                        b'*' => Token::Mul,
                        b'/' if self.ch == Some(b'/') => {
                            let comment = self.scan_comment(b'/');
                            if !self.mode.contains(Mode::SCAN_COMMENTS) {
                                continue;
                            }
                            lit = comment;
                            Token::Comment
                        }
                        b'/' => Token::FDiv,
                        b'{' => {
                            let directive = self.ch == Some(b'$');
                            let comment = self.scan_comment(b'{');
                            if directive {
                                lit = comment;
                                Token::Directive
                            } else if self.mode.contains(Mode::SCAN_COMMENTS) {
                                lit = comment;
                                Token::Comment
                            } else {
                                continue;
                            }
                        }
                        b'@' => Token::At,
                        b'<' => self.switch3(Token::Lss, Token::Leq, b'>', Token::Neq),
                        b'>' => self.switch2(Token::Gtr, Token::Geq),
                        b'=' => Token::Eql,
                        _ => {
                            self.error(start, &format!("illegal character {:#04X}", ch));
                            lit = latin1(&[ch]);
                            Token::Illegal
                        }
                    }
                }
            };

            if !tok.is_trivia() {
                self.last_tok = tok;
            }
            return (pos, tok, lit);
        }
    }

    /// Resolves `^`, which has been consumed.
    ///
    /// After an identifier, `)` or `]` it dereferences (`P^`, `PChar(P)^`).
    /// Otherwise a following type-like name makes it the pointer type caret
    /// (`^TRecord`), and anything else folds into a control character literal
    /// (`^C`). A single-letter type name like `PT = ^T;` therefore scans as
    /// the character `^T`; downstream tools rely on this.
    fn scan_hat(&mut self, lit: &mut String) -> Token {
        if matches!(self.last_tok, Token::Ident | Token::RParen | Token::RBrack) {
            return Token::Hat;
        }
        let pch = self.peek();
        if is_letter(self.ch) && (is_letter(pch) || is_digit(pch)) {
            return Token::Hat;
        }
        let start = self.offset - 1;
        if self.ch.is_some() {
            self.next();
        }
        *lit = self.literal(start);
        Token::Char
    }
}

/// Scans `src` to the end, handing every token to `f` (the final
/// [`Token::Eof`] included).
///
/// `f` may stop the scan early by returning [`ControlFlow::Break`]; that is
/// not an error. More than [`MAX_ERRORS`] scan errors abort with
/// [`UnitGraphError::TooManyErrors`].
pub fn scan<F>(src: &[u8], mode: Mode, mut f: F, on_err: Option<ErrorHandler<'_>>) -> Result<()>
where
    F: FnMut(Token, &str) -> ControlFlow<()>,
{
    let mut fset = FileSet::new();
    let base = fset.base();
    let file = fset.add_file("", base, src.len());
    let mut s = Scanner::new(file, src, on_err, mode)?;

    loop {
        let (_, tok, lit) = s.scan();
        if f(tok, &lit).is_break() {
            return Ok(());
        }
        if s.error_count() > MAX_ERRORS {
            return Err(UnitGraphError::TooManyErrors(s.error_count()));
        }
        if tok == Token::Eof {
            return Ok(());
        }
    }
}
