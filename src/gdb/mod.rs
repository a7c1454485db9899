//! GDB (GNU Debugger) MI Interface Module

pub mod channel;
pub mod decoder;
pub mod error;
pub mod interp;
pub mod parser;
pub mod peculiarity;
pub mod types;

pub use channel::{MiChannel, Reply};
pub use decoder::Decoder;
pub use error::{MiError, SyntaxError, SyntaxErrorKind};
pub use parser::MiParser;
pub use peculiarity::{resolve, Feature, MiCommand, Peculiarity};
pub use types::*;
