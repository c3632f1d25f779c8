//! # Table
//!
//! `Table` owns two files: the row file it manages directly and the index
//! file managed by the embedded [`BTree`]. The index file lives next to
//! the row file with `.idx` appended to the full name.
//!
//! Every operation keeps one promise: the tree and the row file agree on
//! which slot holds which key. Insertion offers the tree the address the
//! row *will* occupy (`peek`), and only commits the slot once the tree
//! confirms the key is new; removal recycles exactly the slot address the
//! tree hands back.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use eyre::{ensure, Result};

use super::row::Row;
use crate::btree::BTree;
use crate::storage::{BlockStorage, FreeList, RowFileHeader, NONE_ADDRESS};

#[derive(Debug)]
pub struct Table {
    storage: BlockStorage,
    header: RowFileHeader,
    free: FreeList,
    index: BTree,
}

/// The index file for a table at `path`: same name with `.idx` appended.
fn index_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_os_string();
    name.push(".idx");
    PathBuf::from(name)
}

impl Table {
    /// Creates a new table, deleting any existing files at the paths.
    /// `field_lengths` declares each non-key field's capacity in
    /// characters; `block_size` is handed to the index (see
    /// [`BTree::create`]).
    pub fn create<P: AsRef<Path>>(
        path: P,
        field_lengths: &[u32],
        block_size: u32,
    ) -> Result<Self> {
        let path = path.as_ref();

        let header = RowFileHeader::new(field_lengths)?;
        let mut storage = BlockStorage::create(path, header.header_len() as u64)?;
        header.write_to(storage.slice_mut(0, header.header_len())?)?;

        let free = FreeList::new(NONE_ADDRESS, header.row_size(), header.free_head_offset());
        let index = BTree::create(index_path(path), block_size)?;

        Ok(Self {
            storage,
            header,
            free,
            index,
        })
    }

    /// Opens an existing table and its index.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let storage = BlockStorage::open(path)?;
        let header = RowFileHeader::read(&storage)?;
        ensure!(
            (storage.len() - header.header_len() as u64) % header.row_size() as u64 == 0,
            "row file size {} is not a header plus whole rows of {}",
            storage.len(),
            header.row_size()
        );

        let free_head = storage.get_i64(header.free_head_offset())?;
        let free = FreeList::new(free_head, header.row_size(), header.free_head_offset());
        let index = BTree::open(index_path(path))?;

        Ok(Self {
            storage,
            header,
            free,
            index,
        })
    }

    pub fn field_lengths(&self) -> &[u32] {
        self.header.field_lengths()
    }

    /// Adds a row. Returns false (and writes nothing) when the key is
    /// already present. The tree is offered the address the row will land
    /// at before the slot is committed, so the two can never disagree.
    pub fn insert(&mut self, key: i32, fields: &[&str]) -> Result<bool> {
        ensure!(
            fields.len() == self.header.field_count(),
            "insert has {} fields, schema declares {}",
            fields.len(),
            self.header.field_count()
        );
        for (i, (field, &len)) in fields.iter().zip(self.header.field_lengths()).enumerate() {
            let units = field.encode_utf16().count();
            ensure!(
                units <= len as usize,
                "field {} is {} units, declared length is {}",
                i,
                units,
                len
            );
        }

        let slot = self.free.peek(&self.storage);
        if !self.index.insert(key, slot)? {
            return Ok(false);
        }

        let addr = self.free.acquire(&mut self.storage)?;
        debug_assert_eq!(addr, slot);

        let row = Row::new(key, fields.iter().map(|f| f.to_string()).collect());
        row.write(&mut self.storage, addr, &self.header)?;
        Ok(true)
    }

    /// Removes the row with `key`, recycling its slot. Returns false when
    /// the key is absent.
    pub fn remove(&mut self, key: i32) -> Result<bool> {
        let removed = self.index.remove(key)?;
        if removed == NONE_ADDRESS {
            return Ok(false);
        }

        self.free.release(&mut self.storage, removed)?;
        Ok(true)
    }

    /// The non-key fields of the row with `key`, padding stripped.
    pub fn search(&self, key: i32) -> Result<Option<Vec<String>>> {
        let addr = self.index.search(key)?;
        if addr == NONE_ADDRESS {
            return Ok(None);
        }

        let row = Row::read(&self.storage, addr, &self.header)?;
        Ok(Some(row.fields))
    }

    /// All rows with keys in `[low, high]`, ascending. Each entry is the
    /// stringified key followed by the row's fields.
    pub fn range_search(&self, low: i32, high: i32) -> Result<Vec<Vec<String>>> {
        let addrs = self.index.range_search(low, high)?;

        let mut out = Vec::with_capacity(addrs.len());
        for addr in addrs {
            let row = Row::read(&self.storage, addr, &self.header)?;
            let mut entry = Vec::with_capacity(1 + row.fields.len());
            entry.push(row.key.to_string());
            entry.extend(row.fields);
            out.push(entry);
        }
        Ok(out)
    }

    /// The whole table in ascending key order; same shape as
    /// [`Table::range_search`].
    pub fn scan(&self) -> Result<Vec<Vec<String>>> {
        self.range_search(i32::MIN, i32::MAX)
    }

    /// Depth-indented rendering of the index tree.
    pub fn render_index(&self) -> Result<String> {
        self.index.render()
    }

    /// Structural invariant check of the index tree.
    pub fn verify_index(&self) -> Result<()> {
        self.index.verify()
    }

    /// Flushes and releases both files. The table cannot be used
    /// afterwards; reopen with [`Table::open`].
    pub fn close(self) -> Result<()> {
        self.index.close()?;
        self.storage.sync()
    }
}
