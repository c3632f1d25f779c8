//! # B+Tree Engine
//!
//! Search, insertion, and deletion over the on-disk node format, plus the
//! structural checks used by tests and the shell.
//!
//! ## Search Paths Instead of Parent Pointers
//!
//! Nodes do not store parent addresses. Every mutating operation first
//! descends from the root, pushing each visited node onto a path stack;
//! split propagation and underflow repair then walk the stack back up.
//! This keeps the on-disk format free of back-references that would have
//! to be fixed up during rebalancing.
//!
//! ## Insert Algorithm
//!
//! ```text
//! 1. Empty tree: allocate a one-entry leaf, point the root at it
//! 2. Descend to the leaf; a duplicate key is reported, not an error
//! 3. Room in the leaf: insert in sorted position, done
//! 4. Full leaf: insert anyway (transient overfill), split, promote the
//!    right half's first key
//! 5. Walk the path stack: insert the promoted key into each ancestor,
//!    splitting branches (middle key extracted) while they overflow
//! 6. If the old root split, install a new root over the two halves
//! ```
//!
//! ## Delete Algorithm
//!
//! ```text
//! 1. Descend to the leaf; a missing key returns the none-address
//! 2. Remove the entry; an emptied root leaf is freed (tree now empty)
//! 3. While a node is under the occupancy floor:
//!    a. A sibling above the floor donates one entry (borrow); separators
//!       rotate through the parent. Repair stops here.
//!    b. Otherwise merge with a sibling into the left-hand node and drop
//!       the separator between them; the parent may now underflow in turn
//! 4. A root branch left with no keys is replaced by its sole child
//! ```
//!
//! Borrowing prefers the right sibling when both qualify. Merging prefers
//! the left sibling.
//!
//! ## Separator Discipline
//!
//! Leaf splits *duplicate* the right half's first key into the parent;
//! branch splits *extract* the middle key. Descent routes keys equal to a
//! separator to the right, which is exactly where the duplicated first
//! key lives. Borrow and merge keep every separator a lower bound for
//! the subtree to its right and above everything to its left; splits and
//! borrows write it as exactly the right subtree's minimum, and deleting
//! that minimum later leaves a stale but still-correct bound behind.

use std::path::Path;

use eyre::{bail, ensure, Result};

use super::node::{record_size, Node};
use super::{order_from_block_size, MIN_ORDER};
use crate::storage::{
    BlockStorage, FreeList, TreeFileHeader, NONE_ADDRESS, TREE_FREE_OFFSET, TREE_HEADER_SIZE,
};

#[derive(Debug)]
pub struct BTree {
    storage: BlockStorage,
    free: FreeList,
    root: i64,
    order: usize,
    block_size: u32,
}

/// One node of the tree as seen by [`BTree::nodes`]: enough to render or
/// assert on the structure without exposing the codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSummary {
    pub address: i64,
    pub depth: usize,
    pub leaf: bool,
    pub keys: Vec<i32>,
    /// Next-leaf address for leaves, none-address for branches.
    pub sibling: i64,
}

impl BTree {
    /// Creates a fresh index file, deleting any existing file at the path.
    /// `block_size` fixes the node capacity for the life of the file.
    pub fn create<P: AsRef<Path>>(path: P, block_size: u32) -> Result<Self> {
        let order = order_from_block_size(block_size);
        ensure!(
            order >= MIN_ORDER,
            "block size {} yields order {}, need at least {} (block size >= {})",
            block_size,
            order,
            MIN_ORDER,
            MIN_ORDER * 12
        );

        let mut storage = BlockStorage::create(path, TREE_HEADER_SIZE as u64)?;
        let header = TreeFileHeader::new(block_size as i32);
        header.write_to(storage.slice_mut(0, TREE_HEADER_SIZE)?)?;

        let free = FreeList::new(NONE_ADDRESS, block_size as usize, TREE_FREE_OFFSET);

        Ok(Self {
            storage,
            free,
            root: NONE_ADDRESS,
            order,
            block_size,
        })
    }

    /// Opens an existing index file; root, free-list head, and block size
    /// come from the header.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let storage = BlockStorage::open(path)?;
        let header = TreeFileHeader::from_bytes(storage.slice(0, TREE_HEADER_SIZE)?)?;

        let block_size = header.block_size() as u32;
        let root = header.root();
        let free_head = header.free_head();

        let order = order_from_block_size(block_size);
        ensure!(
            order >= MIN_ORDER,
            "corrupt index header: block size {} yields order {}",
            block_size,
            order
        );
        ensure!(
            (storage.len() - TREE_HEADER_SIZE as u64) % block_size as u64 == 0,
            "index file size {} is not a header plus whole blocks of {}",
            storage.len(),
            block_size
        );

        let free = FreeList::new(free_head, block_size as usize, TREE_FREE_OFFSET);

        Ok(Self {
            storage,
            free,
            root,
            order,
            block_size,
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    pub fn root_address(&self) -> i64 {
        self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root == NONE_ADDRESS
    }

    /// Occupancy floor for non-root nodes.
    fn min_keys(&self) -> usize {
        self.order.div_ceil(2) - 1
    }

    fn set_root(&mut self, addr: i64) -> Result<()> {
        self.root = addr;
        let header = TreeFileHeader::from_bytes_mut(self.storage.slice_mut(0, TREE_HEADER_SIZE)?)?;
        header.set_root(addr);
        Ok(())
    }

    /// Root-to-leaf path for `key`; the leaf that would hold `key` ends up
    /// on top (last). Empty for an empty tree.
    fn search_path(&self, key: i32) -> Result<Vec<Node>> {
        let mut path = Vec::new();
        if self.root == NONE_ADDRESS {
            return Ok(path);
        }

        let mut cur = Node::read(&self.storage, self.root, self.order)?;
        while !cur.is_leaf() {
            let child_addr = cur.child_at(cur.child_index(key));
            let child = Node::read(&self.storage, child_addr, self.order)?;
            path.push(cur);
            cur = child;
        }
        path.push(cur);

        Ok(path)
    }

    /// Binds `key` to `addr`. Returns false (and changes nothing) when the
    /// key is already present.
    pub fn insert(&mut self, key: i32, addr: i64) -> Result<bool> {
        if self.root == NONE_ADDRESS {
            let mut node = Node::new_leaf(self.order);
            node.insert_key_addr(key, addr);
            let slot = self.free.acquire(&mut self.storage)?;
            node.write_at(&mut self.storage, slot)?;
            self.set_root(slot)?;
            return Ok(true);
        }

        let mut path = self.search_path(key)?;
        let Some(mut node) = path.pop() else {
            bail!("empty search path for non-empty tree");
        };

        if node.contains_key(key) {
            return Ok(false);
        }

        let mut split = false;
        let mut promoted_key = 0;
        let mut promoted_addr = NONE_ADDRESS;

        if node.key_count() < self.order - 1 {
            node.insert_key_addr(key, addr);
            node.write(&mut self.storage)?;
        } else {
            // The overfilling insert spills into the spare slot, which for
            // a leaf aliases the sibling pointer. Capture it first.
            let old_sibling = node.sibling();
            node.insert_key_addr(key, addr);

            let mut right = node.split_leaf();
            right.set_sibling(old_sibling);

            // A leaf separator duplicates the right half's first key.
            promoted_key = right.first_key();

            let slot = self.free.acquire(&mut self.storage)?;
            right.write_at(&mut self.storage, slot)?;

            node.set_sibling(right.address());
            node.write(&mut self.storage)?;

            promoted_addr = right.address();
            split = true;
        }

        while split {
            let Some(mut parent) = path.pop() else { break };

            if parent.key_count() < self.order - 1 {
                parent.insert_key_addr(promoted_key, promoted_addr);
                parent.write(&mut self.storage)?;
                split = false;
            } else {
                parent.insert_key_addr(promoted_key, promoted_addr);

                // A branch separator is extracted, not duplicated.
                let (mut right, middle) = parent.split_branch();
                parent.write(&mut self.storage)?;

                let slot = self.free.acquire(&mut self.storage)?;
                right.write_at(&mut self.storage, slot)?;

                promoted_key = middle;
                promoted_addr = right.address();
            }
        }

        if split {
            // The split walked off the top of the path: the old root is
            // the left half, the last promoted node the right.
            let mut new_root = Node::new_root(self.order, self.root, promoted_key, promoted_addr);
            let slot = self.free.acquire(&mut self.storage)?;
            new_root.write_at(&mut self.storage, slot)?;
            self.set_root(slot)?;
        }

        Ok(true)
    }

    /// Removes `key`, returning the address it was bound to, or the
    /// none-address when absent.
    pub fn remove(&mut self, key: i32) -> Result<i64> {
        let mut path = self.search_path(key)?;
        let Some(mut node) = path.pop() else {
            return Ok(NONE_ADDRESS);
        };

        if !node.contains_key(key) {
            return Ok(NONE_ADDRESS);
        }

        let removed = node.remove_key(key);
        node.write(&mut self.storage)?;

        if self.root == node.address() && node.key_count() == 0 {
            self.free.release(&mut self.storage, node.address())?;
            self.set_root(NONE_ADDRESS)?;
            return Ok(removed);
        }

        let mut too_small = self.root != node.address() && node.key_count() < self.min_keys();
        let mut child = node;

        while too_small {
            let Some(mut parent) = path.pop() else { break };
            let idx = parent.child_position(child.address())?;

            // A sibling above the floor donates; the right one wins when
            // both qualify.
            let mut donor: Option<(Node, bool)> = None;
            if idx > 0 {
                let left = Node::read(&self.storage, parent.child_at(idx - 1), self.order)?;
                if left.key_count() > self.min_keys() {
                    donor = Some((left, true));
                }
            }
            if idx < parent.key_count() {
                let right = Node::read(&self.storage, parent.child_at(idx + 1), self.order)?;
                if right.key_count() > self.min_keys() {
                    donor = Some((right, false));
                }
            }

            if let Some((donor_node, from_left)) = donor {
                if from_left {
                    self.borrow_from_left(&mut child, donor_node, &mut parent)?;
                } else {
                    self.borrow_from_right(&mut child, donor_node, &mut parent)?;
                }
                too_small = false;
            } else {
                if idx > 0 {
                    let left = Node::read(&self.storage, parent.child_at(idx - 1), self.order)?;
                    self.merge_into_left(child, left, &mut parent)?;
                } else {
                    let right = Node::read(&self.storage, parent.child_at(idx + 1), self.order)?;
                    self.merge_into_left(right, child, &mut parent)?;
                }

                too_small = !(parent.key_count() >= self.min_keys()
                    || (parent.address() == self.root && parent.key_count() >= 1));
            }

            child = parent;
        }

        if too_small {
            // Repair ran out of ancestors: the root branch is down to a
            // single child, which becomes the new root.
            let old_root = Node::read(&self.storage, self.root, self.order)?;
            self.set_root(old_root.child_at(0))?;
            self.free.release(&mut self.storage, old_root.address())?;
        }

        Ok(removed)
    }

    fn borrow_from_right(
        &mut self,
        receiver: &mut Node,
        mut donor: Node,
        parent: &mut Node,
    ) -> Result<()> {
        if receiver.is_leaf() {
            let (key, addr) = donor.pop_front();
            receiver.insert_key_addr(key, addr);
            parent.set_separator_for_child(donor.address(), donor.first_key())?;
        } else {
            // Rotate through the parent: the separator descends into the
            // receiver, the donor's first key ascends to replace it.
            let descending = parent.separator_for_child(donor.address())?;
            let (donor_key, donor_child) = donor.pop_front();
            receiver.push_back(descending, donor_child);
            parent.set_separator_for_child(donor.address(), donor_key)?;
        }

        donor.write(&mut self.storage)?;
        receiver.write(&mut self.storage)?;
        parent.write(&mut self.storage)
    }

    fn borrow_from_left(
        &mut self,
        receiver: &mut Node,
        mut donor: Node,
        parent: &mut Node,
    ) -> Result<()> {
        if receiver.is_leaf() {
            let (key, addr) = donor.pop_back();
            receiver.insert_key_addr(key, addr);
            parent.set_separator_for_child(receiver.address(), key)?;
        } else {
            let descending = parent.separator_for_child(receiver.address())?;
            let (donor_key, donor_child) = donor.pop_back();
            receiver.push_front(descending, donor_child);
            parent.set_separator_for_child(receiver.address(), donor_key)?;
        }

        donor.write(&mut self.storage)?;
        receiver.write(&mut self.storage)?;
        parent.write(&mut self.storage)
    }

    /// Merges `source` into its left-hand sibling `dest`, drops the
    /// separator between them, and frees `source`'s block.
    fn merge_into_left(&mut self, source: Node, mut dest: Node, parent: &mut Node) -> Result<()> {
        if source.is_leaf() {
            dest.set_sibling(source.sibling());
            for i in 0..source.key_count() {
                dest.insert_key_addr(source.key_at(i), source.child_at(i));
            }
        } else {
            // The separator between the two descends to sit between the
            // two child lists.
            let descending = parent.separator_for_child(source.address())?;
            dest.insert_key_addr(descending, source.child_at(0));
            for i in 0..source.key_count() {
                dest.insert_key_addr(source.key_at(i), source.child_at(i + 1));
            }
        }

        parent.remove_separator_for_child(source.address())?;
        self.free.release(&mut self.storage, source.address())?;

        dest.write(&mut self.storage)?;
        parent.write(&mut self.storage)
    }

    /// Equality lookup: the address bound to `key`, or the none-address.
    pub fn search(&self, key: i32) -> Result<i64> {
        let mut path = self.search_path(key)?;
        let Some(leaf) = path.pop() else {
            return Ok(NONE_ADDRESS);
        };

        for i in 0..leaf.key_count() {
            if leaf.key_at(i) == key {
                return Ok(leaf.child_at(i));
            }
        }

        Ok(NONE_ADDRESS)
    }

    /// Addresses bound to keys in `[low, high]`, ascending. Walks the leaf
    /// sibling chain, so cost is one descent plus the leaves touched.
    pub fn range_search(&self, low: i32, high: i32) -> Result<Vec<i64>> {
        ensure!(low <= high, "invalid range: low {} > high {}", low, high);

        let mut out = Vec::new();
        let mut path = self.search_path(low)?;
        let Some(mut node) = path.pop() else {
            return Ok(out);
        };

        let start = node.address() as u64;
        self.storage
            .advise_willneed(start, (self.storage.len() - start) as usize);

        loop {
            for i in 0..node.key_count() {
                let key = node.key_at(i);
                if key > high {
                    return Ok(out);
                }
                if key >= low {
                    out.push(node.child_at(i));
                }
            }

            let sibling = node.sibling();
            if sibling == NONE_ADDRESS {
                return Ok(out);
            }
            node = Node::read(&self.storage, sibling, self.order)?;
        }
    }

    /// Flushes and releases the backing file. The tree cannot be used
    /// afterwards; reopen with [`BTree::open`].
    pub fn close(self) -> Result<()> {
        self.storage.sync()
    }

    /// Every node in preorder, for rendering and structural assertions.
    pub fn nodes(&self) -> Result<Vec<NodeSummary>> {
        let mut out = Vec::new();
        if self.root != NONE_ADDRESS {
            self.collect_nodes(self.root, 0, &mut out)?;
        }
        Ok(out)
    }

    fn collect_nodes(&self, addr: i64, depth: usize, out: &mut Vec<NodeSummary>) -> Result<()> {
        let node = Node::read(&self.storage, addr, self.order)?;
        let leaf = node.is_leaf();

        out.push(NodeSummary {
            address: addr,
            depth,
            leaf,
            keys: node.keys().to_vec(),
            sibling: if leaf { node.sibling() } else { NONE_ADDRESS },
        });

        if !leaf {
            for i in 0..=node.key_count() {
                self.collect_nodes(node.child_at(i), depth + 1, out)?;
            }
        }
        Ok(())
    }

    /// One node per line, depth-indented. Used by the shell's `.tree`
    /// command and handy when debugging tests.
    pub fn render(&self) -> Result<String> {
        let nodes = self.nodes()?;
        if nodes.is_empty() {
            return Ok("(empty tree)".to_string());
        }

        let mut out = String::new();
        for node in nodes {
            for _ in 0..node.depth {
                out.push_str("  ");
            }
            if node.leaf {
                let sibling = if node.sibling == NONE_ADDRESS {
                    "none".to_string()
                } else {
                    format!("@{}", node.sibling)
                };
                out.push_str(&format!(
                    "- leaf @{} keys {:?} sibling {}\n",
                    node.address, node.keys, sibling
                ));
            } else {
                out.push_str(&format!("> branch @{} keys {:?}\n", node.address, node.keys));
            }
        }
        Ok(out)
    }

    /// Walks the whole file and checks the structural invariants: node
    /// occupancy bounds, strict key order, every separator partitioning
    /// its subtrees (left strictly below it, right at or above it),
    /// uniform leaf depth, the sibling chain visiting every key ascending
    /// exactly once, and the free list and live tree partitioning the
    /// allocated blocks.
    ///
    /// A separator equals the right subtree's minimum when it is written
    /// by a split or a borrow; deleting that minimum later leaves the
    /// separator above it, which is benign and allowed here.
    pub fn verify(&self) -> Result<()> {
        let total_blocks =
            (self.storage.len() - TREE_HEADER_SIZE as u64) / self.block_size as u64;

        let free_blocks = self.free_blocks(total_blocks)?;

        let mut live = Vec::new();
        let mut leaves: Vec<NodeSummary> = Vec::new();
        if self.root != NONE_ADDRESS {
            self.verify_subtree(self.root, &mut live, &mut leaves)?;
        }

        ensure!(
            live.len() as u64 + free_blocks.len() as u64 == total_blocks,
            "allocated {} blocks but found {} live + {} free",
            total_blocks,
            live.len(),
            free_blocks.len()
        );
        for addr in &live {
            ensure!(
                !free_blocks.contains(addr),
                "block {} is reachable from both root and free list",
                addr
            );
        }

        for pair in leaves.windows(2) {
            ensure!(
                pair[0].sibling == pair[1].address,
                "leaf {} sibling points to {}, next leaf in key order is {}",
                pair[0].address,
                pair[0].sibling,
                pair[1].address
            );
        }
        if let Some(last) = leaves.last() {
            ensure!(
                last.sibling == NONE_ADDRESS,
                "last leaf {} sibling should be none, found {}",
                last.address,
                last.sibling
            );
        }

        let mut prev: Option<i32> = None;
        for leaf in &leaves {
            for &key in &leaf.keys {
                if let Some(p) = prev {
                    ensure!(
                        p < key,
                        "keys not strictly ascending across leaf chain: {} then {}",
                        p,
                        key
                    );
                }
                prev = Some(key);
            }
        }

        Ok(())
    }

    /// Returns (minimum key, maximum key, leaf depth) of the subtree.
    fn verify_subtree(
        &self,
        addr: i64,
        live: &mut Vec<i64>,
        leaves: &mut Vec<NodeSummary>,
    ) -> Result<(i32, i32, usize)> {
        self.check_block_address(addr)?;
        live.push(addr);

        let node = Node::read(&self.storage, addr, self.order)?;
        let count = node.key_count();

        if addr == self.root {
            ensure!(count >= 1, "root node {} has no keys", addr);
        } else {
            ensure!(
                count >= self.min_keys(),
                "node {} has {} keys, floor is {}",
                addr,
                count,
                self.min_keys()
            );
        }
        ensure!(
            count <= self.order - 1,
            "node {} has {} keys, capacity is {}",
            addr,
            count,
            self.order - 1
        );
        for i in 1..count {
            ensure!(
                node.key_at(i - 1) < node.key_at(i),
                "node {} keys not strictly ascending: {} then {}",
                addr,
                node.key_at(i - 1),
                node.key_at(i)
            );
        }

        if node.is_leaf() {
            leaves.push(NodeSummary {
                address: addr,
                depth: 0,
                leaf: true,
                keys: node.keys().to_vec(),
                sibling: node.sibling(),
            });
            return Ok((node.first_key(), node.last_key(), 0));
        }

        let (subtree_min, mut prev_max, first_depth) =
            self.verify_subtree(node.child_at(0), live, leaves)?;
        let mut subtree_max = prev_max;
        for i in 1..=count {
            let separator = node.key_at(i - 1);
            let (child_min, child_max, child_depth) =
                self.verify_subtree(node.child_at(i), live, leaves)?;
            ensure!(
                child_depth == first_depth,
                "leaves at unequal depths below branch {}",
                addr
            );
            ensure!(
                prev_max < separator,
                "branch {} separator {} does not bound left subtree (max {})",
                addr,
                separator,
                prev_max
            );
            ensure!(
                child_min >= separator,
                "branch {} separator {} exceeds right subtree minimum {}",
                addr,
                separator,
                child_min
            );
            prev_max = child_max;
            subtree_max = child_max;
        }

        Ok((subtree_min, subtree_max, first_depth + 1))
    }

    fn free_blocks(&self, total_blocks: u64) -> Result<Vec<i64>> {
        let mut blocks = Vec::new();
        let mut cur = self.free.head();

        while cur != NONE_ADDRESS {
            ensure!(
                (blocks.len() as u64) < total_blocks,
                "free list longer than the file: cycle at {}",
                cur
            );
            self.check_block_address(cur)?;
            blocks.push(cur);
            cur = self.storage.get_i64(cur as u64)?;
        }

        Ok(blocks)
    }

    fn check_block_address(&self, addr: i64) -> Result<()> {
        let header = TREE_HEADER_SIZE as i64;
        let bs = self.block_size as i64;
        ensure!(
            addr >= header
                && (addr - header) % bs == 0
                && addr + record_size(self.order) as i64 <= self.storage.len() as i64,
            "address {} is not a block of this file",
            addr
        );
        Ok(())
    }
}
