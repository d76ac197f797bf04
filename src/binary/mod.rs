//! Binary reading utilities: cursor, LEB128, vector/name helpers, opcode
//! constants, expression decoding, and the section walk.
//! This layer uses a local error type (BinaryReadError); the crate-level
//! DecodeError wraps it.

pub mod code;
pub mod cursor;
pub mod leb128;
pub mod opcodes;
pub mod reader;
pub mod sections;

use thiserror::Error;

/// Result alias for binary reading operations.
pub type Result<T> = core::result::Result<T, BinaryReadError>;

/// Errors that can occur while reading raw bytes from a module.
/// Per the decoding contract, running off the end of the buffer is the only
/// failure mode at this level (plus malformed UTF-8 in names).
#[derive(Debug, Error)]
pub enum BinaryReadError {
    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEof { offset: usize },

    #[error("invalid UTF-8 string at offset {offset}")]
    InvalidUtf8 { offset: usize },
}
