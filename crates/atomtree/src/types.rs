//! Base types for the structure of an atom stream.

use binrw::{BinRead, BinWrite};
use std::fmt;

/// Length in bytes of the fixed atom header: a 4-byte size and a 4-byte tag.
pub const HEADER_LEN: u64 = 8;

/// Wire sentinel for an atom that extends to the end of the enclosing span.
pub const SIZE_TO_END: u32 = 0;

/// Four-byte atom tag.
///
/// Tags are opaque to this crate: they are compared and carried through, never
/// interpreted. Printable ASCII tags display as text, anything else as escapes.
#[derive(BinRead, BinWrite, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AtomType(pub [u8; 4]);

impl AtomType {
    /// Create a tag from its raw bytes
    pub const fn new(tag: [u8; 4]) -> Self {
        Self(tag)
    }

    /// The raw bytes of the tag
    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl From<[u8; 4]> for AtomType {
    fn from(tag: [u8; 4]) -> Self {
        Self(tag)
    }
}

impl From<&[u8; 4]> for AtomType {
    fn from(tag: &[u8; 4]) -> Self {
        Self(*tag)
    }
}

impl fmt::Display for AtomType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for byte in self.0 {
            if byte.is_ascii_graphic() || byte == b' ' {
                write!(f, "{}", byte as char)?;
            } else {
                write!(f, "\\x{byte:02x}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for AtomType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "AtomType({self})")
    }
}

/// Raw atom header as it appears in the stream.
///
/// All multi-byte integers are stored in big endian format. The size counts
/// the whole atom including this header, or holds [`SIZE_TO_END`] when the
/// atom runs to the end of the enclosing span.
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq, Eq)]
#[brw(big)]
pub struct AtomHeader {
    /// Total atom length in bytes, header included
    pub size: u32,

    /// The tag naming this atom's kind
    pub kind: AtomType,
}

/// Payload of a single atom: nested atoms, raw bytes, or nothing.
///
/// The three cases are mutually exclusive by construction. A zero-payload atom
/// is always [`Payload::Empty`]; a container with no children or a leaf with
/// no bytes is rejected by the validator so that every tree has exactly one
/// representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Nested atoms covering the payload span exactly, in stream order
    Container(Vec<Atom>),

    /// Raw payload bytes, carried verbatim
    Leaf(Vec<u8>),

    /// No payload at all; the atom is its header
    Empty,
}

/// A node in a decoded atom tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    /// The tag naming this atom's kind
    pub kind: AtomType,

    /// Absolute position of the atom's first byte within the stream
    pub offset: u64,

    /// Total length in bytes, header included
    pub size: u64,

    /// Whether the atom was written with the [`SIZE_TO_END`] sentinel.
    /// The stored size still holds the materialized extent.
    pub extends_to_end: bool,

    /// What the atom carries
    pub payload: Payload,
}

impl Atom {
    /// Create a container atom from its children.
    ///
    /// Sizes and offsets are computed for a tree rooted at offset 0; call
    /// [`Atom::repack`] to place it elsewhere. An empty children vector is
    /// rejected by the validator; use [`Atom::empty`] for a payload-free atom.
    pub fn container(kind: impl Into<AtomType>, children: Vec<Atom>) -> Atom {
        let mut atom = Atom {
            kind: kind.into(),
            offset: 0,
            size: 0,
            extends_to_end: false,
            payload: Payload::Container(children),
        };
        atom.repack(0);
        atom
    }

    /// Create a leaf atom carrying raw bytes.
    pub fn leaf(kind: impl Into<AtomType>, content: Vec<u8>) -> Atom {
        Atom {
            kind: kind.into(),
            offset: 0,
            size: HEADER_LEN + content.len() as u64,
            extends_to_end: false,
            payload: Payload::Leaf(content),
        }
    }

    /// Create a header-only atom with no payload.
    pub fn empty(kind: impl Into<AtomType>) -> Atom {
        Atom {
            kind: kind.into(),
            offset: 0,
            size: HEADER_LEN,
            extends_to_end: false,
            payload: Payload::Empty,
        }
    }

    /// Whether this atom holds nested atoms
    pub fn is_container(&self) -> bool {
        matches!(self.payload, Payload::Container(_))
    }

    /// The nested atoms, if this is a container
    pub fn children(&self) -> Option<&[Atom]> {
        match &self.payload {
            Payload::Container(children) => Some(children),
            _ => None,
        }
    }

    /// Mutable access to the nested atoms, if this is a container.
    ///
    /// After inserting, removing, or resizing children the stored sizes and
    /// offsets are stale; restore them with [`Atom::repack`] or write the tree
    /// with the repack option enabled.
    pub fn children_mut(&mut self) -> Option<&mut Vec<Atom>> {
        match &mut self.payload {
            Payload::Container(children) => Some(children),
            _ => None,
        }
    }

    /// The raw payload bytes, if this is a leaf
    pub fn content(&self) -> Option<&[u8]> {
        match &self.payload {
            Payload::Leaf(content) => Some(content),
            _ => None,
        }
    }

    /// Find the first direct child with the given tag
    pub fn child(&self, kind: impl Into<AtomType>) -> Option<&Atom> {
        let kind = kind.into();
        self.children()?.iter().find(|c| c.kind == kind)
    }

    /// The size this atom should have, computed from its payload alone.
    ///
    /// Only one level deep: children contribute their stored sizes.
    pub fn computed_size(&self) -> u64 {
        HEADER_LEN
            + match &self.payload {
                Payload::Container(children) => children.iter().map(|c| c.size).sum(),
                Payload::Leaf(content) => content.len() as u64,
                Payload::Empty => 0,
            }
    }

    /// Recompute `size` and `offset` through the whole subtree, placing the
    /// atom at `offset`. Returns the recomputed size.
    ///
    /// This restores the layout invariants after in-memory mutation. Tags,
    /// content bytes, and child order are never touched.
    pub fn repack(&mut self, offset: u64) -> u64 {
        self.offset = offset;
        if let Payload::Container(children) = &mut self.payload {
            let mut cursor = offset + HEADER_LEN;
            for child in children.iter_mut() {
                cursor += child.repack(cursor);
            }
        }
        self.size = self.computed_size();
        self.size
    }
}
