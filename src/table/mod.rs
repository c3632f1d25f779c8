//! # Table Module
//!
//! The public face of RowDB: a fixed-schema row store whose key
//! uniqueness and lookups are enforced by the B+Tree index.
//!
//! ## Division of Labor
//!
//! ```text
//! Table::insert(key, fields)
//!     │  peek the next free row slot
//!     ▼
//! BTree::insert(key, slot)      ── false: duplicate, nothing written
//!     │  true
//!     ▼
//! commit the slot, write the row
//! ```
//!
//! The table never scans its own file to answer a query: `search` and
//! `range_search` ask the tree for row addresses and only then
//! materialize fields. `remove` recycles whatever slot the tree hands
//! back. The row file maintains its own free list over row-sized slots,
//! mirroring the index file's over node blocks.
//!
//! ## Schema
//!
//! A schema is a list of per-field character lengths fixed at creation
//! and persisted in the row file header. Fields are stored as 16-bit
//! big-endian character cells, null-padded to their declared length;
//! reads stop at the first null, so declared length is a maximum, not a
//! display width.

pub mod row;
pub mod table;

pub use row::Row;
pub use table::Table;
