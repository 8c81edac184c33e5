//! Types for writing atom streams
//!

use bon::Builder;
use byteorder::{BigEndian, WriteBytesExt};
use std::io::{Seek, Write};
use tracing::instrument;

use crate::error::{Error, Result};
use crate::types::{Atom, Payload, SIZE_TO_END};
use crate::validate;

/// Options for how an atom tree should be written
#[derive(Debug, Clone, Copy, Builder)]
pub struct WriteOptions {
    /// Recompute sizes and offsets from the tree before emission instead of
    /// trusting the stored values. Off by default, where a stale stored size
    /// fails with [`Error::SizeMismatch`] rather than being silently fixed.
    #[builder(default)]
    pub repack: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Atom stream writer
///
/// Emits trees depth-first in pre-order, reproducing exactly the bytes that
/// [`AtomReader`](crate::AtomReader) would turn back into an equal tree. The
/// input is validated before a single byte is written, so a failed write
/// leaves no partial output semantics to reason about. In repack mode the
/// tree's sizes and offsets are recomputed in place first; tags, content, and
/// child order are never touched.
///
/// ```
/// # fn doit() -> atomtree::error::Result<()>
/// # {
/// use atomtree::{Atom, AtomWriter, WriteOptions};
///
/// let mut root = Atom::container(
///     b"moov",
///     vec![Atom::leaf(b"mvhd", vec![0; 4])],
/// );
///
/// let mut writer = AtomWriter::new(
///     std::io::Cursor::new(Vec::new()),
///     WriteOptions::builder().build(),
/// );
/// writer.write_atom(&mut root)?;
///
/// let bytes = writer.finish()?.into_inner();
/// assert_eq!(bytes.len() as u64, root.size);
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
pub struct AtomWriter<W: Write + Seek> {
    inner: W,
    options: WriteOptions,
}

impl<W: Write + Seek> AtomWriter<W> {
    /// Create a writer over the given output
    pub fn new(inner: W, options: WriteOptions) -> AtomWriter<W> {
        AtomWriter { inner, options }
    }

    /// Validate and emit one atom tree.
    ///
    /// In repack mode the subtree is re-laid at its current root offset
    /// before emission, which is the only case where the input is mutated.
    #[instrument(skip_all, err)]
    pub fn write_atom(&mut self, atom: &mut Atom) -> Result<()> {
        if self.options.repack {
            atom.repack(atom.offset);
        }
        validate::validate(atom)?;
        self.emit(atom)
    }

    /// Validate and emit a run of sibling atom trees back-to-back.
    #[instrument(skip_all, err)]
    pub fn write_atoms(&mut self, atoms: &mut [Atom]) -> Result<()> {
        if self.options.repack {
            let mut cursor = atoms.first().map_or(0, |a| a.offset);
            for atom in atoms.iter_mut() {
                cursor += atom.repack(cursor);
            }
        }
        validate::validate_siblings(atoms)?;
        for atom in atoms.iter() {
            self.emit(atom)?;
        }
        Ok(())
    }

    /// Flush and return the inner writer object
    pub fn finish(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }

    fn emit(&mut self, atom: &Atom) -> Result<()> {
        let wire_size = if atom.extends_to_end {
            SIZE_TO_END
        } else {
            u32::try_from(atom.size).map_err(|_| Error::InvalidSize {
                offset: atom.offset,
                kind: atom.kind,
                size: atom.size,
            })?
        };

        self.inner.write_u32::<BigEndian>(wire_size)?;
        self.inner.write_all(atom.kind.as_bytes())?;

        match &atom.payload {
            Payload::Container(children) => {
                for child in children {
                    self.emit(child)?;
                }
            }
            Payload::Leaf(content) => self.inner.write_all(content)?,
            Payload::Empty => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use crate::error::{Error, Result};
    use crate::types::Atom;
    use crate::write::{AtomWriter, WriteOptions};

    #[traced_test]
    #[test]
    fn write_header_only_atom() -> Result<()> {
        #[rustfmt::skip]
        let expected = vec![
            0x00, 0x00, 0x00, 0x08, // Size
            b'f', b'r', b'e', b'e', // Tag
        ];

        let mut writer = AtomWriter::new(Cursor::new(Vec::new()), WriteOptions::default());
        writer.write_atom(&mut Atom::empty(b"free"))?;

        assert_eq!(writer.finish()?.into_inner(), expected);

        Ok(())
    }

    #[traced_test]
    #[test]
    fn write_container_atom() -> Result<()> {
        #[rustfmt::skip]
        let expected = vec![
            0x00, 0x00, 0x00, 0x18, // Size (24)
            b'm', b'o', b'o', b'v', // Tag
            0x00, 0x00, 0x00, 0x0C, // Child size
            b'm', b'v', b'h', b'd', // Child tag
            0xAA, 0xBB, 0xCC, 0xDD, // Child content
            0x00, 0x00, 0x00, 0x08, // Child size
            b'f', b'r', b'e', b'e', // Child tag
        ];

        let mut root = Atom::container(
            b"moov",
            vec![
                Atom::leaf(b"mvhd", vec![0xAA, 0xBB, 0xCC, 0xDD]),
                Atom::empty(b"free"),
            ],
        );

        let mut writer = AtomWriter::new(Cursor::new(Vec::new()), WriteOptions::default());
        writer.write_atom(&mut root)?;

        assert_eq!(writer.finish()?.into_inner(), expected);

        Ok(())
    }

    #[test]
    fn write_open_ended_atom_emits_the_sentinel() -> Result<()> {
        #[rustfmt::skip]
        let expected = vec![
            0x00, 0x00, 0x00, 0x00, // Sentinel size
            b'm', b'd', b'a', b't', // Tag
            0x01, 0x02, 0x03,       // Content
        ];

        let mut atom = Atom::leaf(b"mdat", vec![1, 2, 3]);
        atom.extends_to_end = true;

        let mut writer = AtomWriter::new(Cursor::new(Vec::new()), WriteOptions::default());
        writer.write_atom(&mut atom)?;

        assert_eq!(writer.finish()?.into_inner(), expected);

        Ok(())
    }

    #[test]
    fn stale_size_fails_without_repack() {
        let mut root = Atom::container(b"moov", vec![Atom::leaf(b"data", vec![0; 4])]);
        root.children_mut()
            .unwrap()
            .push(Atom::leaf(b"more", vec![0; 4]));

        let mut writer = AtomWriter::new(Cursor::new(Vec::new()), WriteOptions::default());
        let err = writer.write_atom(&mut root).unwrap_err();

        assert!(matches!(err, Error::SizeMismatch { offset: 0, .. }));
        // Nothing was emitted for the failed tree
        assert!(writer.finish().unwrap().into_inner().is_empty());
    }

    #[test]
    fn repack_fixes_stale_layout() -> Result<()> {
        let mut root = Atom::container(b"moov", vec![Atom::leaf(b"data", vec![0; 4])]);
        root.children_mut()
            .unwrap()
            .push(Atom::leaf(b"more", vec![0; 4]));

        let options = WriteOptions::builder().repack(true).build();
        let mut writer = AtomWriter::new(Cursor::new(Vec::new()), options);
        writer.write_atom(&mut root)?;

        // The input was re-laid in place
        assert_eq!(root.size, 32);
        assert_eq!(root.children().unwrap()[1].offset, 20);

        let bytes = writer.finish()?.into_inner();
        assert_eq!(bytes.len(), 32);
        assert_eq!(&bytes[0..4], &[0x00, 0x00, 0x00, 0x20]);

        Ok(())
    }

    #[test]
    fn write_sibling_run() -> Result<()> {
        #[rustfmt::skip]
        let expected = vec![
            0x00, 0x00, 0x00, 0x08, // Size
            b'f', b't', b'y', b'p', // Tag
            0x00, 0x00, 0x00, 0x0A, // Size (10)
            b'm', b'd', b'a', b't', // Tag
            0x01, 0x02,             // Content
        ];

        let mut atoms = vec![Atom::empty(b"ftyp"), Atom::leaf(b"mdat", vec![1, 2])];

        let options = WriteOptions::builder().repack(true).build();
        let mut writer = AtomWriter::new(Cursor::new(Vec::new()), options);
        writer.write_atoms(&mut atoms)?;

        assert_eq!(atoms[1].offset, 8);
        assert_eq!(writer.finish()?.into_inner(), expected);

        Ok(())
    }

    #[test]
    fn oversized_stored_size_never_reaches_the_wire() {
        let mut atom = Atom::leaf(b"big ", vec![0; 16]);
        atom.size = u64::from(u32::MAX) + 9;

        let mut writer = AtomWriter::new(Cursor::new(Vec::new()), WriteOptions::default());
        let err = writer.write_atom(&mut atom).unwrap_err();

        assert!(matches!(err, Error::SizeMismatch { .. }));
        assert!(writer.finish().unwrap().into_inner().is_empty());
    }
}
