//! # Storage Module
//!
//! This module provides the foundational storage layer for RowDB: a
//! memory-mapped backing file with bounds-checked slot access, typed file
//! headers, and an intrusive free list that recycles slots after deletion.
//!
//! ## Architecture Overview
//!
//! Both RowDB file kinds share one shape: a small header at byte zero,
//! followed by fixed-size slots. The index file holds one B+Tree node per
//! block; the row file holds one record per slot. A slot's identity is its
//! byte offset in the file, which is why offset zero can double as the
//! none-address (it always falls inside the header).
//!
//! ```text
//! index file                      row file
//! ┌──────────────────┐           ┌──────────────────────┐
//! │ TreeFileHeader   │ 20 bytes  │ RowFileHeader        │ 12 + 4n bytes
//! ├──────────────────┤           ├──────────────────────┤
//! │ node block       │           │ row slot             │
//! ├──────────────────┤           ├──────────────────────┤
//! │ node block       │           │ row slot             │
//! │ ...              │           │ ...                  │
//! └──────────────────┘           └──────────────────────┘
//! ```
//!
//! ## Memory-Mapped Access
//!
//! Files are mapped into the process address space with `memmap2`. Reads
//! and writes go through `BlockStorage::slice`/`slice_mut`, which return
//! plain byte slices into the mapping. Growing the file remaps it, and the
//! borrow checker guarantees no slice survives across a remap: `append`
//! takes `&mut self`, so any outstanding `slice` borrow is a compile error.
//!
//! ## Free Lists
//!
//! Freed slots are threaded into a singly-linked list: the slot's leading
//! 8 bytes are overwritten with the address of the previous head, and the
//! head itself is mirrored at a fixed offset inside the file header. A
//! freed slot must therefore never be interpreted as live data; liveness is
//! reachability from the root (or from the tree for row slots), not a flag
//! in the slot.
//!
//! ## Durability
//!
//! None promised. Writes land in the mapping in algorithm order and are
//! flushed on `sync`/close, but there is no journal and no torn-write
//! protection. A crash mid-operation can leave either file in an
//! intermediate state.

pub mod freelist;
pub mod headers;
pub mod mmap;

pub use freelist::FreeList;
pub use headers::{RowFileHeader, TreeFileHeader, TREE_FREE_OFFSET, TREE_HEADER_SIZE};
pub use mmap::BlockStorage;

/// Sentinel address meaning "no slot". Byte zero of every file is header
/// space, so no live slot can ever have this address.
pub const NONE_ADDRESS: i64 = 0;
