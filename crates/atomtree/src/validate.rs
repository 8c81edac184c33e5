//! Layout invariant checks shared by the reader and the writer.
//!
//! The checks cover everything that makes a tree a faithful image of a byte
//! stream: sizes at least a header long, stored sizes matching payloads,
//! children chained back-to-back across their parent's span, and the
//! container/leaf/empty contract. Traversal is pre-order, so the first error
//! reported is always the shallowest, left-most violation.

use crate::error::{Error, Result};
use crate::types::{Atom, Payload, HEADER_LEN};

/// Verify one atom and everything below it.
///
/// Offsets are checked relative to the atom's own position, so a subtree is
/// valid no matter where in a stream it is placed. Returns the first
/// violation found, reporting the offending atom's offset and tag.
pub fn validate(atom: &Atom) -> Result<()> {
    if atom.size < HEADER_LEN {
        return Err(Error::InvalidSize {
            offset: atom.offset,
            kind: atom.kind,
            size: atom.size,
        });
    }

    match &atom.payload {
        Payload::Container(children) if children.is_empty() => {
            return Err(Error::InvalidTreeShape {
                offset: atom.offset,
                kind: atom.kind,
                reason: "container with no children; a payload-free atom must be empty",
            });
        }
        Payload::Leaf(content) if content.is_empty() => {
            return Err(Error::InvalidTreeShape {
                offset: atom.offset,
                kind: atom.kind,
                reason: "leaf with no content; a payload-free atom must be empty",
            });
        }
        _ => {}
    }

    let computed = atom.computed_size();
    if atom.size != computed {
        return Err(Error::SizeMismatch {
            offset: atom.offset,
            kind: atom.kind,
            stored: atom.size,
            computed,
        });
    }

    if let Payload::Container(children) = &atom.payload {
        let mut cursor = atom.offset + HEADER_LEN;
        let last = children.len() - 1;
        for (i, child) in children.iter().enumerate() {
            if child.offset != cursor {
                return Err(Error::BoundaryMismatch {
                    offset: atom.offset,
                    kind: atom.kind,
                    expected: cursor,
                    actual: child.offset,
                });
            }
            if child.extends_to_end && i != last {
                return Err(Error::InvalidTreeShape {
                    offset: child.offset,
                    kind: child.kind,
                    reason: "open-ended atom must be the last of its siblings",
                });
            }
            validate(child)?;
            cursor += child.size;
        }
    }

    Ok(())
}

/// Verify a run of sibling atoms, such as the roots of a stream.
///
/// On top of the per-subtree checks this enforces that consecutive siblings
/// are laid back-to-back and that only the last one may be open-ended.
pub fn validate_siblings(atoms: &[Atom]) -> Result<()> {
    for pair in atoms.windows(2) {
        let expected = pair[0].offset + pair[0].size;
        if pair[1].offset != expected {
            return Err(Error::BoundaryMismatch {
                offset: pair[1].offset,
                kind: pair[1].kind,
                expected,
                actual: pair[1].offset,
            });
        }
        if pair[0].extends_to_end {
            return Err(Error::InvalidTreeShape {
                offset: pair[0].offset,
                kind: pair[0].kind,
                reason: "open-ended atom must be the last of its siblings",
            });
        }
    }

    for atom in atoms {
        validate(atom)?;
    }

    Ok(())
}
