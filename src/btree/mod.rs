//! # B+Tree Index Implementation
//!
//! This module implements the disk-backed B+Tree that indexes RowDB
//! tables: 32-bit signed keys mapped to 64-bit row addresses, one node per
//! block in the index file.
//!
//! ## Node Types
//!
//! - **Leaf nodes**: hold keys and the row addresses they map to, in
//!   ascending key order. Leaves are chained through a sibling pointer so
//!   range scans never re-descend from the root.
//!
//! - **Branch nodes**: hold separator keys and child block addresses. The
//!   separator at position `i` is the smallest key admitted to the
//!   subtree rooted at child `i + 1`; lookups equal to a separator
//!   descend right.
//!
//! Both variants share one on-disk shape; the sign of the occupancy count
//! distinguishes them (negative => leaf). See [`node`] for the exact
//! layout.
//!
//! ## Order
//!
//! The order, the maximum child count of a branch, is derived from the
//! caller's block size as `block_size / 12`, since each key/slot pair
//! costs 12 bytes. A leaf holds at most `order - 1` entries; every
//! non-root node holds at least `ceil(order/2) - 1` keys.
//!
//! ## Rebalancing
//!
//! Insertion splits overfull nodes bottom-up: a leaf split duplicates the
//! right half's first key into the parent, a branch split extracts its
//! middle key. Deletion repairs underfull nodes by borrowing an entry
//! from a sibling when one can spare it, and otherwise merging with a
//! sibling and dropping the separator between them; repairs propagate
//! upward and may replace the root.
//!
//! ## Persistence
//!
//! Root address and free-list head live in the 20-byte file header and
//! are updated as they change. There is no node cache: every operation
//! reads the nodes on its path from the mapping and writes back the ones
//! it touched.

pub mod node;
pub mod tree;

pub use node::Node;
pub use tree::{BTree, NodeSummary};

/// Smallest supported order. Below this a branch split cannot produce two
/// well-formed halves.
pub const MIN_ORDER: usize = 3;

/// Default block size for callers that do not care: order 42.
pub const DEFAULT_BLOCK_SIZE: u32 = 512;

/// Each key/slot pair costs 12 bytes: a 4-byte key and an 8-byte address.
pub fn order_from_block_size(block_size: u32) -> usize {
    (block_size / 12) as usize
}
