//! # RowDB - Embedded Keyed Row Store
//!
//! RowDB is an embedded record store pairing a fixed-schema row file with a
//! disk-backed B+Tree index. The index enforces key uniqueness and serves
//! equality and range lookups; the row file holds fixed-size records whose
//! field widths are declared at table creation.
//!
//! ## Quick Start
//!
//! ```ignore
//! use rowdb::Table;
//!
//! let mut table = Table::create("people.rdb", &[16, 32], 512)?;
//! table.insert(42, &["Ada", "Lovelace"])?;
//!
//! if let Some(fields) = table.search(42)? {
//!     println!("{}", fields.join(" "));
//! }
//! table.close()?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │      Public API (Table, BTree)      │
//! ├──────────────────┬──────────────────┤
//! │    Row Codec     │   B+Tree Engine  │
//! ├──────────────────┴──────────────────┤
//! │  Block Storage (mmap) + Free List   │
//! └─────────────────────────────────────┘
//! ```
//!
//! ## File Layout
//!
//! A table named `people.rdb` owns two files:
//!
//! ```text
//! people.rdb       # row file: header, then fixed-size row slots
//! people.rdb.idx   # index file: header, then block-sized B+Tree nodes
//! ```
//!
//! All integers on disk are big-endian two's-complement; characters are
//! 16-bit big-endian units. Address zero is the none-address in both files
//! (byte zero falls inside the header, so no slot can live there).
//!
//! ## Concurrency
//!
//! None. A `Table` or `BTree` owns its backing files exclusively; all
//! operations run to completion on the calling thread. Opening the same
//! files from two instances is unsupported.
//!
//! ## Module Overview
//!
//! - [`storage`]: memory-mapped block file, file headers, free list
//! - [`btree`]: node codec and tree engine
//! - [`table`]: fixed-schema row store delegating to the tree
//! - [`cli`]: interactive shell consuming the public API

#[macro_use]
mod macros;

pub mod btree;
pub mod cli;
pub mod storage;
pub mod table;

pub use btree::{BTree, NodeSummary};
pub use table::{Row, Table};
