//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

use crate::types::AtomType;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent wrapper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// the stream ends before a full header could be read
    #[error("truncated header at offset {offset}")]
    TruncatedHeader {
        /// Position where the header was expected
        offset: u64,
    },

    /// a declared size undercuts the header or escapes the enclosing span
    #[error("invalid size {size} for `{kind}` atom at offset {offset}")]
    InvalidSize {
        /// Position of the offending atom
        offset: u64,
        /// Tag of the offending atom
        kind: AtomType,
        /// The size it declared
        size: u64,
    },

    /// a span was not consumed exactly
    #[error("`{kind}` atom at offset {offset}: span boundary expected at {expected}, found {actual}")]
    BoundaryMismatch {
        /// Position of the atom whose span is at fault
        offset: u64,
        /// Tag of the atom whose span is at fault
        kind: AtomType,
        /// Where the span should end
        expected: u64,
        /// Where it actually ended
        actual: u64,
    },

    /// nesting went past the configured bound
    #[error("nesting depth exceeded {max_depth} at offset {offset}")]
    DepthExceeded {
        /// Position of the atom that crossed the bound
        offset: u64,
        /// The configured bound
        max_depth: usize,
    },

    /// a stored size disagrees with the size computed from the payload
    #[error("`{kind}` atom at offset {offset} stores size {stored} but its payload computes to {computed}")]
    SizeMismatch {
        /// Position of the offending atom
        offset: u64,
        /// Tag of the offending atom
        kind: AtomType,
        /// The stored size
        stored: u64,
        /// The size recomputed from the payload
        computed: u64,
    },

    /// a payload violates the container/leaf/empty contract
    #[error("`{kind}` atom at offset {offset} has an invalid shape: {reason}")]
    InvalidTreeShape {
        /// Position of the offending atom
        offset: u64,
        /// Tag of the offending atom
        kind: AtomType,
        /// What is wrong with it
        reason: &'static str,
    },
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
