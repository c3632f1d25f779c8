//! # Free List Management
//!
//! This module implements free slot tracking for RowDB files. Deleted
//! slots, whether B+Tree node blocks or row records, are not reclaimed by
//! truncating the file; they are threaded into a singly-linked list and
//! reused by later allocations.
//!
//! ## Encoding
//!
//! The list is intrusive: a freed slot's leading 8 bytes are overwritten
//! with the address of the previous head, and the slot becomes the new
//! head. The head itself is mirrored at a fixed offset inside the file
//! header so the chain survives reopen.
//!
//! ```text
//! header.free_head ──> slot C ──> slot A ──> slot B ──> 0 (none)
//! ```
//!
//! A freed slot must never be interpreted as live data: its first 8 bytes
//! are now a forward pointer. Live slots and free slots are distinguished
//! purely by reachability (from the tree root versus from the free head).
//!
//! ## Allocation Strategy
//!
//! - `acquire` pops the head. If the list is empty, the file is extended
//!   by one slot and the former end of file becomes the new address.
//! - `peek` reports the address `acquire` would return without committing
//!   to it. The row table uses this to offer the tree an address before
//!   the row is actually written (peek first, then commit).
//! - `release` pushes a slot onto the list.
//!
//! The header mirror is updated on every head movement, acquire as well
//! as release, because the header pointer is authoritative across
//! close/reopen.

use eyre::{ensure, Result};

use super::mmap::BlockStorage;
use super::NONE_ADDRESS;

#[derive(Debug)]
pub struct FreeList {
    head: i64,
    slot_size: usize,
    mirror_offset: u64,
}

impl FreeList {
    /// `mirror_offset` is where the owning file's header persists the head.
    pub fn new(head: i64, slot_size: usize, mirror_offset: u64) -> Self {
        Self {
            head,
            slot_size,
            mirror_offset,
        }
    }

    pub fn head(&self) -> i64 {
        self.head
    }

    pub fn is_empty(&self) -> bool {
        self.head == NONE_ADDRESS
    }

    /// Pops the head of the list, or extends the file by one slot when the
    /// list is empty. Returns the address of the acquired slot.
    pub fn acquire(&mut self, storage: &mut BlockStorage) -> Result<i64> {
        if self.head == NONE_ADDRESS {
            return Ok(storage.append(self.slot_size)? as i64);
        }

        let slot = self.head;
        self.head = storage.get_i64(slot as u64)?;
        storage.put_i64(self.mirror_offset, self.head)?;
        Ok(slot)
    }

    /// The address the next `acquire` will return. Does not move the head
    /// or extend the file.
    pub fn peek(&self, storage: &BlockStorage) -> i64 {
        if self.head == NONE_ADDRESS {
            storage.len() as i64
        } else {
            self.head
        }
    }

    /// Links a slot into the list. Its leading 8 bytes become the forward
    /// pointer to the previous head.
    pub fn release(&mut self, storage: &mut BlockStorage, slot: i64) -> Result<()> {
        ensure!(
            slot != NONE_ADDRESS,
            "cannot release the none-address to the free list"
        );

        storage.put_i64(slot as u64, self.head)?;
        self.head = slot;
        storage.put_i64(self.mirror_offset, self.head)
    }
}
