//! GDB/MI Error Types

use crate::gdb::types::{Platform, Version};
use thiserror::Error;

/// What went wrong while scanning an MI value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    UnterminatedString,
    UnterminatedTuple,
    UnterminatedList,
    ExpectedValue,
    UnexpectedChar(char),
    TrailingInput,
}

impl std::fmt::Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyntaxErrorKind::UnterminatedString => write!(f, "unterminated string"),
            SyntaxErrorKind::UnterminatedTuple => write!(f, "unterminated tuple"),
            SyntaxErrorKind::UnterminatedList => write!(f, "unterminated list"),
            SyntaxErrorKind::ExpectedValue => write!(f, "expected value"),
            SyntaxErrorKind::UnexpectedChar(c) => write!(f, "unexpected character '{}'", c),
            SyntaxErrorKind::TrailingInput => write!(f, "trailing input after value"),
        }
    }
}

/// Syntax defect at a byte offset of the scanned line
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at offset {offset}")]
pub struct SyntaxError {
    pub offset: usize,
    pub kind: SyntaxErrorKind,
}

impl SyntaxError {
    pub fn new(offset: usize, kind: SyntaxErrorKind) -> Self {
        Self { offset, kind }
    }
}

/// Errors surfaced by the MI bridge
#[derive(Debug, Error)]
pub enum MiError {
    #[error("MI syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("unknown text encoding: {0}")]
    UnknownEncoding(String),

    #[error("unrecognized debugger version banner: {0:?}")]
    UnrecognizedVersion(String),

    #[error("unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("unsupported backend: {} {version} on {platform}", flavor_name(.lldb))]
    Unsupported {
        version: Version,
        platform: Platform,
        lldb: bool,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("debugger channel closed")]
    ChannelClosed,
}

fn flavor_name(lldb: &bool) -> &'static str {
    if *lldb {
        "lldb-mi"
    } else {
        "gdb"
    }
}

pub type Result<T> = std::result::Result<T, MiError>;
