//! This library handles reading from and creating trees of tagged, length-prefixed **atoms**.
//!
//! # Atom Container Format Documentation
//!
//! An atom stream is a flat run of records, each carrying a declared size and a
//! four-byte tag. An atom's payload is either raw bytes or a nested run of
//! further atoms, which gives the stream its tree shape. The same structural
//! pattern underlies ISO base media files, RIFF-style chunks, and other
//! type-length-value schemes; this crate decodes and re-encodes the structure
//! without interpreting any particular tag.
//!
//! ## Atom Layout
//!
//! Every atom starts with a fixed 8-byte header:
//!
//! | Offset (bytes) | Field       | Description                                                |
//! |----------------|-------------|------------------------------------------------------------|
//! | 0x0000         | Size        | 4 bytes: total atom length in bytes, header included       |
//! | 0x0004         | Tag         | 4 bytes: identifying code, usually printable ASCII         |
//! | 0x0008         | Payload     | (Size - 8) bytes: raw content, or a run of nested atoms    |
//!
//! - **Size**: A 4-byte unsigned integer counting the whole atom, so the
//!   minimum legal value is 8 (a header-only atom with no payload). The value
//!   `0` is a sentinel meaning the atom extends to the end of the enclosing
//!   span; such an atom must be the last of its siblings.
//! - **Tag**: A 4-byte code naming the atom's kind. Tags are recognized, never
//!   interpreted: non-ASCII bytes are legal and round-trip untouched.
//! - **Payload**: Whether the payload holds nested atoms or raw bytes cannot
//!   be told from the header alone for unknown tags. Readers may supply a
//!   [`Classifier`] for a deterministic decision; without one the reader
//!   speculatively re-parses each payload and falls back to raw bytes.
//!
//! ## Additional Information
//!
//! - **Endianness**: Big-endian for all multi-byte integers
//! - **Nesting**: A container's children must cover its payload span exactly;
//!   a gap or overrun is a structural fault and fails the whole parse
//!

pub mod error;
pub mod read;
pub mod types;
pub mod validate;
pub mod write;

pub use read::{AtomClass, AtomReader, Classifier, ReadOptions};
pub use types::{Atom, AtomType, Payload};
pub use validate::{validate, validate_siblings};
pub use write::{AtomWriter, WriteOptions};
