//! Types for reading atom streams
//!

use binrw::BinRead;
use bon::Builder;
use std::fmt::{self, Debug};
use std::io::{Read, Seek, SeekFrom};
use tracing::{instrument, trace};

use crate::error::{Error, Result};
use crate::types::{Atom, AtomHeader, AtomType, Payload, HEADER_LEN, SIZE_TO_END};
use crate::validate;

/// Default bound on nesting depth before a parse is abandoned
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Whether an atom tag names a container or a leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomClass {
    /// The payload is a run of nested atoms
    Container,
    /// The payload is raw bytes
    Leaf,
}

/// Caller-supplied policy deciding which tags hold nested atoms.
///
/// The raw shape alone cannot distinguish a container from a leaf for unknown
/// tags, so the decision is injected. Returning `None` leaves a tag
/// unrecognized; unrecognized tags decode as opaque leaves, never dropped.
///
/// Any `Fn(AtomType) -> Option<AtomClass>` closure is a classifier:
///
/// ```
/// use atomtree::{AtomClass, AtomType};
///
/// let is_container = |kind: AtomType| match kind.as_bytes() {
///     b"moov" | b"trak" => Some(AtomClass::Container),
///     b"mdat" => Some(AtomClass::Leaf),
///     _ => None,
/// };
/// # let _ = &is_container as &dyn atomtree::Classifier;
/// ```
pub trait Classifier {
    /// Classify a tag, or `None` if it is not recognized
    fn classify(&self, kind: AtomType) -> Option<AtomClass>;
}

impl<F> Classifier for F
where
    F: Fn(AtomType) -> Option<AtomClass>,
{
    fn classify(&self, kind: AtomType) -> Option<AtomClass> {
        self(kind)
    }
}

/// Options for how an atom stream should be read
#[derive(Clone, Copy, Builder)]
pub struct ReadOptions<'c> {
    /// Nesting depth at which the parse fails with
    /// [`Error::DepthExceeded`] instead of recursing further
    #[builder(default = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,

    /// Container/leaf policy. Without one the reader speculatively re-parses
    /// each payload, treating anything that parses cleanly as nested atoms.
    pub classifier: Option<&'c dyn Classifier>,
}

impl Default for ReadOptions<'_> {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Debug for ReadOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ReadOptions")
            .field("max_depth", &self.max_depth)
            .field("classifier", &self.classifier.map(|_| "..."))
            .finish()
    }
}

/// Atom stream reader
///
/// Decoding is all-or-nothing: a structural fault anywhere discards the
/// partial tree, since a truncated container could pass for complete data.
/// The returned atoms cover the stream from the reader's starting position to
/// its end, and re-encoding them unchanged reproduces the bytes exactly.
///
/// ```no_run
/// use std::io::prelude::*;
///
/// fn list_roots(reader: impl Read + Seek) -> atomtree::error::Result<()> {
///     let mut reader = atomtree::AtomReader::new(reader);
///
///     for atom in reader.read_all()? {
///         println!("{} @ {} ({} bytes)", atom.kind, atom.offset, atom.size);
///     }
///
///     Ok(())
/// }
/// ```
pub struct AtomReader<'c, R> {
    reader: R,
    options: ReadOptions<'c>,
}

impl<'c, R: Read + Seek> AtomReader<'c, R> {
    /// Create a reader with default options
    pub fn new(reader: R) -> AtomReader<'c, R> {
        Self::with_options(reader, ReadOptions::default())
    }

    /// Create a reader with the given options
    pub fn with_options(reader: R, options: ReadOptions<'c>) -> AtomReader<'c, R> {
        AtomReader { reader, options }
    }

    /// Decode the whole stream into its run of root atoms.
    ///
    /// Parsing starts at the reader's current position and must consume the
    /// stream to its end exactly. The decoded tree is validated before it is
    /// returned.
    #[instrument(skip_all, err)]
    pub fn read_all(&mut self) -> Result<Vec<Atom>> {
        let start = self.reader.stream_position()?;
        let end = self.reader.seek(SeekFrom::End(0))?;

        if start == end {
            return Err(Error::TruncatedHeader { offset: start });
        }

        let roots = self.read_siblings(start, end, 0)?;
        validate::validate_siblings(&roots)?;

        Ok(roots)
    }

    /// Unwrap and return the inner reader object
    ///
    /// The position of the reader is undefined.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Read back-to-back atoms from `start` until `end` is reached exactly.
    fn read_siblings(&mut self, start: u64, end: u64, depth: usize) -> Result<Vec<Atom>> {
        let mut atoms = Vec::new();
        let mut cursor = start;

        while cursor < end {
            if end - cursor < HEADER_LEN {
                return Err(Error::TruncatedHeader { offset: cursor });
            }
            let atom = self.read_atom(cursor, end, depth)?;
            cursor += atom.size;
            atoms.push(atom);
        }

        Ok(atoms)
    }

    /// Read the single atom starting at `offset`, bounded by `end`.
    fn read_atom(&mut self, offset: u64, end: u64, depth: usize) -> Result<Atom> {
        if depth >= self.options.max_depth {
            return Err(Error::DepthExceeded {
                offset,
                max_depth: self.options.max_depth,
            });
        }

        self.reader.seek(SeekFrom::Start(offset))?;
        let header = AtomHeader::read(&mut self.reader)?;

        let kind = header.kind;
        let extends_to_end = header.size == SIZE_TO_END;
        let size = if extends_to_end {
            end - offset
        } else {
            u64::from(header.size)
        };

        if size < HEADER_LEN || offset + size > end {
            return Err(Error::InvalidSize { offset, kind, size });
        }

        trace!(%kind, offset, size, extends_to_end, "read atom header");

        let body_start = offset + HEADER_LEN;
        let body_end = offset + size;

        let payload = if body_start == body_end {
            Payload::Empty
        } else {
            self.read_payload(kind, offset, body_start, body_end, depth)?
        };

        Ok(Atom {
            kind,
            offset,
            size,
            extends_to_end,
            payload,
        })
    }

    /// Decode a non-empty payload span as children or raw content.
    fn read_payload(
        &mut self,
        kind: AtomType,
        offset: u64,
        body_start: u64,
        body_end: u64,
        depth: usize,
    ) -> Result<Payload> {
        if let Some(classifier) = self.options.classifier {
            return match classifier.classify(kind) {
                Some(AtomClass::Container) => {
                    let children = self
                        .read_siblings(body_start, body_end, depth + 1)
                        .map_err(|e| match e {
                            // A direct child header cut off by our own span is
                            // this container failing to cover it, not stream
                            // truncation.
                            Error::TruncatedHeader { offset: at } => Error::BoundaryMismatch {
                                offset,
                                kind,
                                expected: body_end,
                                actual: at,
                            },
                            other => other,
                        })?;
                    Ok(Payload::Container(children))
                }
                Some(AtomClass::Leaf) | None => {
                    Ok(Payload::Leaf(self.read_content(body_start, body_end)?))
                }
            };
        }

        // No classifier: speculatively re-parse the payload. A span that
        // parses as a clean atom run is treated as nested structure, anything
        // else as raw bytes. A depth or I/O failure inside the probe is not a
        // classification signal and propagates.
        match self.read_siblings(body_start, body_end, depth + 1) {
            Ok(children) => Ok(Payload::Container(children)),
            Err(e @ (Error::DepthExceeded { .. } | Error::IOError(_) | Error::BinRWError(_))) => {
                Err(e)
            }
            Err(_) => Ok(Payload::Leaf(self.read_content(body_start, body_end)?)),
        }
    }

    /// Capture the raw bytes of a leaf payload.
    fn read_content(&mut self, start: u64, end: u64) -> Result<Vec<u8>> {
        self.reader.seek(SeekFrom::Start(start))?;
        let mut content = vec![0u8; (end - start) as usize];
        self.reader.read_exact(&mut content)?;
        Ok(content)
    }
}
