//! Lexical tokens of Pascal-family source text.
//!
//! Every token has exactly one canonical spelling. Operators spell as written,
//! keywords and directives as lowercase words, and the special and literal
//! classes use upper-case class names (`IDENT`, `COMMENT`, ...).

pub mod position;

pub use position::{File, FileSet, Pos, Position};

use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

macro_rules! tokens {
    (
        special { $($sv:ident => $ss:literal,)* }
        literal { $($lv:ident => $ls:literal,)* }
        operator { $($ov:ident => $os:literal,)* }
        keyword { $($kv:ident => $ks:literal,)* }
        directive { $($dv:ident => $ds:literal,)* }
        contextual { $($cv:ident => $cs:literal,)* }
    ) => {
        /// The set of lexical tokens.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Token {
            $($sv,)*
            $($lv,)*
            $($ov,)*
            $($kv,)*
            $($dv,)*
            $($cv,)*
        }

        impl Token {
            /// Canonical spelling of the token.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Token::$sv => $ss,)*
                    $(Token::$lv => $ls,)*
                    $(Token::$ov => $os,)*
                    $(Token::$kv => $ks,)*
                    $(Token::$dv => $ds,)*
                    $(Token::$cv => $cs,)*
                }
            }

            /// Identifiers and basic literal classes.
            pub fn is_literal(self) -> bool {
                matches!(self, $(Token::$lv)|*)
            }

            /// Reserved words and directives, contextual ones included.
            pub fn is_keyword(self) -> bool {
                matches!(self, $(Token::$kv)|* | $(Token::$dv)|* | $(Token::$cv)|*)
            }

            fn is_delimiter(self) -> bool {
                matches!(self, $(Token::$ov)|*)
            }
        }

        /// Words that `lookup` turns into keyword tokens.
        const RESERVED: &[Token] = &[$(Token::$kv,)* $(Token::$dv,)* $(Token::$cv,)*];
    };
}

tokens! {
    special {
        Illegal => "ILLEGAL",
        Eof => "EOF",
        Comment => "COMMENT",
        Directive => "CDIRECTIVE",
    }
    literal {
        Ident => "IDENT",
        Integer => "INTEGER",
        Float => "FLOAT",
        Char => "CHAR",
        String => "STRING",
    }
    operator {
        At => "@",
        Hat => "^",
        Add => "+",
        Sub => "-",
        Mul => "*",
        FDiv => "/",
        Eql => "=",
        Lss => "<",
        Gtr => ">",
        Neq => "<>",
        Leq => "<=",
        Geq => ">=",
        Assign => ":=",
        Colon => ":",
        Comma => ",",
        Period => ".",
        Ellipsis => "..",
        Semicolon => ";",
        LParen => "(",
        LBrack => "[",
        RParen => ")",
        RBrack => "]",
    }
    keyword {
        And => "and",
        Array => "array",
        As => "as",
        Asm => "asm",
        Begin => "begin",
        Case => "case",
        Class => "class",
        Const => "const",
        Constructor => "constructor",
        Destructor => "destructor",
        DispInterface => "dispinterface",
        Div => "div",
        Do => "do",
        DownTo => "downto",
        Else => "else",
        End => "end",
        Except => "except",
        Exports => "exports",
        FileKw => "file",
        Finalization => "finalization",
        Finally => "finally",
        For => "for",
        Function => "function",
        Goto => "goto",
        If => "if",
        Implementation => "implementation",
        In => "in",
        Inherited => "inherited",
        Initialization => "initialization",
        Inline => "inline",
        Interface => "interface",
        Is => "is",
        Label => "label",
        Library => "library",
        Mod => "mod",
        Nil => "nil",
        Not => "not",
        Object => "object",
        Of => "of",
        Or => "or",
        Packed => "packed",
        Procedure => "procedure",
        Program => "program",
        Property => "property",
        Raise => "raise",
        Record => "record",
        Repeat => "repeat",
        ResourceString => "resourcestring",
        Set => "set",
        Shl => "shl",
        Shr => "shr",
        Then => "then",
        ThreadVar => "threadvar",
        To => "to",
        Try => "try",
        Type => "type",
        Unit => "unit",
        Until => "until",
        Uses => "uses",
        Var => "var",
        While => "while",
        With => "with",
        Xor => "xor",
    }
    directive {
        Absolute => "absolute",
        Abstract => "abstract",
        Assembler => "assembler",
        Automated => "automated",
        Cdecl => "cdecl",
        Default => "default",
        Deprecated => "deprecated",
        DispId => "dispid",
        Dynamic => "dynamic",
        Experimental => "experimental",
        Export => "export",
        External => "external",
        Final => "final",
        Forward => "forward",
        Implements => "implements",
        Index => "index",
        Message => "message",
        Name => "name",
        NoDefault => "nodefault",
        Out => "out",
        Overload => "overload",
        Package => "package",
        Pascal => "pascal",
        Platform => "platform",
        Private => "private",
        Protected => "protected",
        Public => "public",
        Published => "published",
        Read => "read",
        ReadOnly => "readonly",
        Register => "register",
        Reintroduce => "reintroduce",
        SafeCall => "safecall",
        Static => "static",
        StdCall => "stdcall",
        Stored => "stored",
        Strict => "strict",
        Unsafe => "unsafe",
        VarArgs => "varargs",
        Virtual => "virtual",
        Write => "write",
        WriteOnly => "writeonly",
    }
    contextual {
        Contains => "contains",
        Delayed => "delayed",
        Far => "far",
        Helper => "helper",
        Local => "local",
        Near => "near",
        Operator => "operator",
        Override => "override",
        Reference => "reference",
        Requires => "requires",
        Resident => "resident",
        Sealed => "sealed",
        WinApi => "winapi",
    }
}

/// Lowest precedence, shared by all non-operators.
pub const LOWEST_PREC: u8 = 0;

impl Token {
    /// Operators and delimiters, including the word operators (`div`, `in`, ...).
    pub fn is_operator(self) -> bool {
        self.is_delimiter() || self.precedence() > LOWEST_PREC
    }

    /// Binary operator precedence; [`LOWEST_PREC`] for everything else.
    pub fn precedence(self) -> u8 {
        use Token::*;
        match self {
            Eql | Neq | Lss | Gtr | Leq | Geq | In | Is => 1,
            Add | Sub | Or | Xor => 2,
            Mul | FDiv | Div | Mod | And | Shl | Shr | As => 3,
            _ => LOWEST_PREC,
        }
    }

    /// Comments and compiler directives carry no syntax of their own.
    pub fn is_trivia(self) -> bool {
        matches!(self, Token::Comment | Token::Directive)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Token {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

fn keywords() -> &'static HashMap<&'static str, Token> {
    static KEYWORDS: OnceLock<HashMap<&'static str, Token>> = OnceLock::new();
    KEYWORDS.get_or_init(|| RESERVED.iter().map(|&tok| (tok.as_str(), tok)).collect())
}

/// Maps an identifier to its keyword token, or [`Token::Ident`]. Matching is
/// case-insensitive.
pub fn lookup(ident: &str) -> Token {
    keywords()
        .get(ident.to_ascii_lowercase().as_str())
        .copied()
        .unwrap_or(Token::Ident)
}
