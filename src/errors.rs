//! Errors for vecdraw.
//!
//! `error_chain` and `failure` are certainly nice, but completely overengineered
//! for this use-case. For example, neither of them allow error localization.
//! Additionally, debugging macros can get hairy really quick and matching with
//! `*e.kind()` or doing From conversions for other errors is really hard to do.
//!
//! So in this case, the best form of error handling is to use the simple Rust-native
//! way: Just enums, `From` + pattern matching. No macros, except for this one.
//!
//! What this macro does is (simplified): `impl From<$a> for $b { $b::$variant(error) }`
//!
//! This stays deliberately narrow: the rasterizer core never returns
//! `Result` from paint operations (spec.md §7 — "the core exposes no error
//! codes... an embedded consumer must be able to run with no error-handling
//! paths enabled"). `Error` only covers the few seams where loud failure is
//! appropriate: opening a `Context` with invalid buffer geometry, and the
//! parser/formatter round trip's entry points.
use core::fmt;

macro_rules! impl_from {
    ($from:ident, $to:ident::$variant:ident) => {
        impl From<$from> for $to {
            fn from(err: $from) -> Self {
                $to::$variant(err)
            }
        }
    };
}

#[derive(Debug)]
pub enum Error {
    /// Malformed textual draw-list input (spec.md §4.3, §7).
    Parse(ParseError),
    /// A handle (`TextureId`, `FontId`, ...) or buffer geometry argument is
    /// out of range.
    Index(IndexError),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ParseError {
    UnknownWord,
    TruncatedNumber,
    TruncatedString,
    MalformedAscii85,
    /// A string or number token exceeded `PARSER_MAXLEN` (spec.md §4.3).
    TokenTooLong,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::ParseError::*;
        write!(
            f,
            "{}",
            match self {
                UnknownWord => "unrecognized command word",
                TruncatedNumber => "truncated numeric literal",
                TruncatedString => "unterminated string literal",
                MalformedAscii85 => "malformed Ascii85 blob",
                TokenTooLong => "token exceeded the parser's scratch buffer",
            }
        )
    }
}

impl core::error::Error for ParseError {}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum IndexError {
    TextureNotFound,
    FontNotFound,
    GradientNotFound,
    ExtGStateNotFound,
    /// `Context::new`'s width/height/stride arguments don't describe a
    /// valid buffer for the requested pixel format.
    InvalidBufferGeometry,
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::IndexError::*;
        write!(
            f,
            "{}",
            match self {
                TextureNotFound => "texture id not found",
                FontNotFound => "font id not found",
                GradientNotFound => "gradient id not found",
                ExtGStateNotFound => "ext-gstate id not found",
                InvalidBufferGeometry => "buffer geometry is invalid for the requested pixel format",
            }
        )
    }
}

impl core::error::Error for IndexError {}

impl_from!(ParseError, Error::Parse);
impl_from!(IndexError, Error::Index);

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::Error::*;
        match self {
            Parse(e) => write!(f, "{e}"),
            Index(e) => write!(f, "{e}"),
        }
    }
}

impl core::error::Error for Error {}
