//! # File Header Definitions
//!
//! This module provides typed views of the two RowDB file headers. Both
//! sit at byte zero of their file; everything after them is slot space.
//!
//! ## Index File Header (20 bytes, fixed)
//!
//! ```text
//! Offset  Size  Description
//! ------  ----  ---------------------------------------
//! 0       8     root: address of the root node (0 = empty tree)
//! 8       8     free_head: head of the node free list (0 = empty)
//! 16      4     block_size: bytes per node block
//! ```
//!
//! `TreeFileHeader` is a zerocopy struct over those 20 bytes, using
//! big-endian wrapper types so reads and writes need no manual byte
//! shuffling.
//!
//! ## Row File Header (12 + 4n bytes, variable)
//!
//! ```text
//! Offset    Size  Description
//! --------  ----  ---------------------------------------
//! 0         4     field_count: number of non-key fields (n)
//! 4         4*n   declared length of each field, in characters
//! 4 + 4n    8     free_head: head of the row free list (0 = empty)
//! ```
//!
//! The row header's length depends on the field count, so it gets a plain
//! codec struct instead of a zerocopy view. All layout arithmetic (header
//! length, row slot size, the offset where the free-list head is mirrored)
//! lives here and nowhere else.
//!
//! ## Endianness
//!
//! All fields are big-endian two's-complement, matching the rest of the
//! file format.

use eyre::{ensure, Result};
use zerocopy::big_endian::{I32, I64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::mmap::BlockStorage;
use super::NONE_ADDRESS;

pub const TREE_HEADER_SIZE: usize = 20;

/// Header offset where the index file mirrors its free-list head.
pub const TREE_FREE_OFFSET: u64 = 8;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct TreeFileHeader {
    root: I64,
    free_head: I64,
    block_size: I32,
}

const _: () = assert!(std::mem::size_of::<TreeFileHeader>() == TREE_HEADER_SIZE);

impl TreeFileHeader {
    pub fn new(block_size: i32) -> Self {
        Self {
            root: I64::new(NONE_ADDRESS),
            free_head: I64::new(NONE_ADDRESS),
            block_size: I32::new(block_size),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        ensure!(
            bytes.len() >= TREE_HEADER_SIZE,
            "buffer too small for TreeFileHeader: {} < {}",
            bytes.len(),
            TREE_HEADER_SIZE
        );

        let header = Self::ref_from_bytes(&bytes[..TREE_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to parse TreeFileHeader: {:?}", e))?;

        ensure!(
            header.block_size.get() > 0,
            "corrupt index header: block size {}",
            header.block_size.get()
        );

        Ok(header)
    }

    pub fn from_bytes_mut(bytes: &mut [u8]) -> Result<&mut Self> {
        ensure!(
            bytes.len() >= TREE_HEADER_SIZE,
            "buffer too small for TreeFileHeader: {} < {}",
            bytes.len(),
            TREE_HEADER_SIZE
        );

        Self::mut_from_bytes(&mut bytes[..TREE_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to parse TreeFileHeader: {:?}", e))
    }

    pub fn write_to(&self, bytes: &mut [u8]) -> Result<()> {
        ensure!(
            bytes.len() >= TREE_HEADER_SIZE,
            "buffer too small for TreeFileHeader: {} < {}",
            bytes.len(),
            TREE_HEADER_SIZE
        );

        bytes[..TREE_HEADER_SIZE].copy_from_slice(self.as_bytes());
        Ok(())
    }

    zerocopy_accessors! {
        root: i64,
        free_head: i64,
        block_size: i32,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFileHeader {
    field_lengths: Vec<u32>,
}

impl RowFileHeader {
    pub fn new(field_lengths: &[u32]) -> Result<Self> {
        ensure!(
            !field_lengths.is_empty(),
            "a table needs at least one non-key field"
        );
        for (i, &len) in field_lengths.iter().enumerate() {
            ensure!(len > 0, "field {} has declared length 0", i);
        }

        Ok(Self {
            field_lengths: field_lengths.to_vec(),
        })
    }

    /// Reads the header from the front of an open row file.
    pub fn read(storage: &BlockStorage) -> Result<Self> {
        let field_count = storage.get_i32(0)?;
        ensure!(
            field_count > 0,
            "corrupt row header: field count {}",
            field_count
        );

        let mut field_lengths = Vec::with_capacity(field_count as usize);
        for i in 0..field_count as u64 {
            let len = storage.get_i32(4 + 4 * i)?;
            ensure!(len > 0, "corrupt row header: field {} has length {}", i, len);
            field_lengths.push(len as u32);
        }

        Ok(Self { field_lengths })
    }

    /// Writes field count and lengths; the free-list head slot is left as
    /// the none-address (all-zero bytes).
    pub fn write_to(&self, bytes: &mut [u8]) -> Result<()> {
        ensure!(
            bytes.len() >= self.header_len(),
            "buffer too small for RowFileHeader: {} < {}",
            bytes.len(),
            self.header_len()
        );

        bytes[0..4].copy_from_slice(&(self.field_lengths.len() as i32).to_be_bytes());
        for (i, &len) in self.field_lengths.iter().enumerate() {
            let off = 4 + 4 * i;
            bytes[off..off + 4].copy_from_slice(&(len as i32).to_be_bytes());
        }
        Ok(())
    }

    pub fn field_count(&self) -> usize {
        self.field_lengths.len()
    }

    pub fn field_lengths(&self) -> &[u32] {
        &self.field_lengths
    }

    pub fn header_len(&self) -> usize {
        12 + 4 * self.field_lengths.len()
    }

    /// Header offset where the row file mirrors its free-list head.
    /// Computed from the field count, never hard-coded.
    pub fn free_head_offset(&self) -> u64 {
        (4 + 4 * self.field_lengths.len()) as u64
    }

    /// Bytes per row slot: 4-byte key plus two bytes per declared character.
    pub fn row_size(&self) -> usize {
        4 + self
            .field_lengths
            .iter()
            .map(|&len| 2 * len as usize)
            .sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn tree_header_is_20_bytes() {
        assert_eq!(std::mem::size_of::<TreeFileHeader>(), TREE_HEADER_SIZE);
    }

    #[test]
    fn tree_header_round_trips_through_bytes() {
        let mut header = TreeFileHeader::new(60);
        header.set_root(140);
        header.set_free_head(80);

        let mut buf = [0u8; TREE_HEADER_SIZE];
        header.write_to(&mut buf).unwrap();

        let read = TreeFileHeader::from_bytes(&buf).unwrap();
        assert_eq!(read.root(), 140);
        assert_eq!(read.free_head(), 80);
        assert_eq!(read.block_size(), 60);
    }

    #[test]
    fn tree_header_layout_matches_file_format() {
        let mut header = TreeFileHeader::new(60);
        header.set_root(0x0102030405060708);

        let mut buf = [0u8; TREE_HEADER_SIZE];
        header.write_to(&mut buf).unwrap();

        assert_eq!(&buf[0..8], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(&buf[16..20], &[0, 0, 0, 60]);
    }

    #[test]
    fn tree_header_rejects_zero_block_size() {
        let buf = [0u8; TREE_HEADER_SIZE];
        assert!(TreeFileHeader::from_bytes(&buf).is_err());
    }

    #[test]
    fn row_header_layout_arithmetic() {
        let header = RowFileHeader::new(&[10, 5]).unwrap();

        assert_eq!(header.field_count(), 2);
        assert_eq!(header.header_len(), 20);
        assert_eq!(header.free_head_offset(), 12);
        assert_eq!(header.row_size(), 4 + 20 + 10);
    }

    #[test]
    fn row_header_round_trips_through_storage() {
        let dir = tempdir().unwrap();
        let header = RowFileHeader::new(&[3, 7, 1]).unwrap();

        let mut storage =
            BlockStorage::create(dir.path().join("rows.rdb"), header.header_len() as u64).unwrap();
        header
            .write_to(storage.slice_mut(0, header.header_len()).unwrap())
            .unwrap();

        let read = RowFileHeader::read(&storage).unwrap();
        assert_eq!(read, header);
        assert_eq!(
            storage.get_i64(read.free_head_offset()).unwrap(),
            NONE_ADDRESS
        );
    }

    #[test]
    fn row_header_rejects_empty_schema() {
        assert!(RowFileHeader::new(&[]).is_err());
        assert!(RowFileHeader::new(&[4, 0]).is_err());
    }
}
