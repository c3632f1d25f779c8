//! # B+Tree Scenario Tests
//!
//! Exercises the tree through its public surface with a small order
//! (block size 60 => order 5 => non-root occupancy floor of 2 keys), where
//! every split, borrow, merge, and root transition is reachable with a
//! handful of keys. Structural invariants are re-verified after every
//! mutation; if a check here fails, fix the tree, not the expectation.

use rowdb::storage::NONE_ADDRESS;
use rowdb::BTree;
use tempfile::tempdir;

const BLOCK_SIZE: u32 = 60;

fn create_tree() -> (BTree, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let tree = BTree::create(dir.path().join("t.idx"), BLOCK_SIZE).unwrap();
    (tree, dir)
}

fn addr_of(key: i32) -> i64 {
    10_000 + key as i64
}

fn insert_all(tree: &mut BTree, keys: &[i32]) {
    for &k in keys {
        assert!(tree.insert(k, addr_of(k)).unwrap(), "insert {} failed", k);
        tree.verify().unwrap();
    }
}

mod structure {
    use super::*;

    #[test]
    fn block_size_60_gives_order_5() {
        let (tree, _dir) = create_tree();
        assert_eq!(tree.order(), 5);
    }

    #[test]
    fn first_key_forms_a_one_leaf_tree() {
        let (mut tree, _dir) = create_tree();

        insert_all(&mut tree, &[10]);

        let nodes = tree.nodes().unwrap();
        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].leaf);
        assert_eq!(nodes[0].keys, vec![10]);
        assert_eq!(nodes[0].sibling, NONE_ADDRESS);
    }

    #[test]
    fn four_keys_fill_a_leaf_without_splitting() {
        let (mut tree, _dir) = create_tree();

        insert_all(&mut tree, &[10, 20, 30, 40]);

        let nodes = tree.nodes().unwrap();
        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].leaf);
        assert_eq!(nodes[0].keys, vec![10, 20, 30, 40]);
        assert_eq!(nodes[0].sibling, NONE_ADDRESS);
    }

    #[test]
    fn fifth_key_splits_the_leaf_and_grows_a_root() {
        let (mut tree, _dir) = create_tree();

        insert_all(&mut tree, &[10, 20, 30, 40, 50]);

        let nodes = tree.nodes().unwrap();
        assert_eq!(nodes.len(), 3);

        let root = &nodes[0];
        let left = &nodes[1];
        let right = &nodes[2];

        assert!(!root.leaf);
        assert_eq!(root.keys, vec![30]);
        assert!(left.leaf);
        assert_eq!(left.keys, vec![10, 20]);
        assert!(right.leaf);
        assert_eq!(right.keys, vec![30, 40, 50]);

        assert_eq!(left.sibling, right.address);
        assert_eq!(right.sibling, NONE_ADDRESS);
    }

    #[test]
    fn every_key_is_still_reachable_after_the_split() {
        let (mut tree, _dir) = create_tree();

        insert_all(&mut tree, &[10, 20, 30, 40, 50]);

        for k in [10, 20, 30, 40, 50] {
            assert_eq!(tree.search(k).unwrap(), addr_of(k));
        }
        assert_eq!(tree.search(15).unwrap(), NONE_ADDRESS);
        assert_eq!(tree.search(60).unwrap(), NONE_ADDRESS);
    }
}

mod range_scans {
    use super::*;

    #[test]
    fn range_crosses_the_leaf_boundary_in_order() {
        let (mut tree, _dir) = create_tree();
        insert_all(&mut tree, &[10, 20, 30, 40, 50]);

        let addrs = tree.range_search(15, 45).unwrap();
        assert_eq!(addrs, vec![addr_of(20), addr_of(30), addr_of(40)]);
    }

    #[test]
    fn range_with_exact_bounds_is_inclusive() {
        let (mut tree, _dir) = create_tree();
        insert_all(&mut tree, &[10, 20, 30, 40, 50]);

        let addrs = tree.range_search(20, 40).unwrap();
        assert_eq!(addrs, vec![addr_of(20), addr_of(30), addr_of(40)]);

        let single = tree.range_search(30, 30).unwrap();
        assert_eq!(single, vec![addr_of(30)]);
    }

    #[test]
    fn range_outside_the_keys_is_empty() {
        let (mut tree, _dir) = create_tree();
        insert_all(&mut tree, &[10, 20, 30]);

        assert!(tree.range_search(41, 99).unwrap().is_empty());
        assert!(tree.range_search(-5, 5).unwrap().is_empty());
        assert!(tree.range_search(11, 19).unwrap().is_empty());
    }

    #[test]
    fn range_on_an_empty_tree_is_empty() {
        let (tree, _dir) = create_tree();
        assert!(tree.range_search(0, 100).unwrap().is_empty());
    }

    #[test]
    fn inverted_range_is_rejected() {
        let (tree, _dir) = create_tree();
        assert!(tree.range_search(10, 5).is_err());
    }
}

mod deletion {
    use super::*;

    #[test]
    fn removing_a_missing_key_returns_none() {
        let (mut tree, _dir) = create_tree();

        assert_eq!(tree.remove(7).unwrap(), NONE_ADDRESS);

        insert_all(&mut tree, &[10, 20]);
        assert_eq!(tree.remove(15).unwrap(), NONE_ADDRESS);
        assert_eq!(tree.search(10).unwrap(), addr_of(10));
    }

    #[test]
    fn underflow_borrows_from_the_right_sibling() {
        let (mut tree, _dir) = create_tree();
        insert_all(&mut tree, &[10, 20, 30, 40, 50]);

        assert_eq!(tree.remove(10).unwrap(), addr_of(10));
        tree.verify().unwrap();

        let nodes = tree.nodes().unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0].keys, vec![40]);
        assert_eq!(nodes[1].keys, vec![20, 30]);
        assert_eq!(nodes[2].keys, vec![40, 50]);
    }

    #[test]
    fn underflow_without_a_donor_merges_and_collapses_the_root() {
        let (mut tree, _dir) = create_tree();
        insert_all(&mut tree, &[10, 20, 30, 40, 50]);

        // Leaves [20,30] / [40,50] with separator 40 after the borrow.
        assert_eq!(tree.remove(10).unwrap(), addr_of(10));
        // Both at the floor now: the next underflow must merge, emptying
        // the root branch, which is then replaced by the merged leaf.
        assert_eq!(tree.remove(20).unwrap(), addr_of(20));
        tree.verify().unwrap();

        let nodes = tree.nodes().unwrap();
        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].leaf);
        assert_eq!(nodes[0].keys, vec![30, 40, 50]);
        assert_eq!(nodes[0].sibling, NONE_ADDRESS);
    }

    #[test]
    fn address_bindings_survive_borrow_and_merge() {
        let (mut tree, _dir) = create_tree();
        insert_all(&mut tree, &[10, 20, 30, 40, 50]);
        tree.remove(10).unwrap();
        tree.remove(20).unwrap();

        // A duplicate insert neither replaces the row address nor errors.
        assert!(!tree.insert(30, 777).unwrap());
        assert_eq!(tree.search(30).unwrap(), addr_of(30));
        assert_eq!(tree.search(40).unwrap(), addr_of(40));
        assert_eq!(tree.search(50).unwrap(), addr_of(50));
    }

    #[test]
    fn removing_the_last_key_empties_the_tree() {
        let (mut tree, _dir) = create_tree();
        insert_all(&mut tree, &[42]);

        assert_eq!(tree.remove(42).unwrap(), addr_of(42));
        tree.verify().unwrap();

        assert!(tree.is_empty());
        assert_eq!(tree.search(42).unwrap(), NONE_ADDRESS);
        assert!(tree.nodes().unwrap().is_empty());
    }

    #[test]
    fn an_emptied_tree_accepts_new_keys_and_reuses_its_block() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.idx");
        let mut tree = BTree::create(&path, BLOCK_SIZE).unwrap();

        tree.insert(1, addr_of(1)).unwrap();
        tree.remove(1).unwrap();
        let len_after_empty = std::fs::metadata(&path).unwrap().len();

        tree.insert(2, addr_of(2)).unwrap();
        tree.verify().unwrap();

        // The freed root block is recycled, not appended past.
        assert_eq!(std::fs::metadata(&path).unwrap().len(), len_after_empty);
        assert_eq!(tree.search(2).unwrap(), addr_of(2));
    }
}

mod duplicates {
    use super::*;

    #[test]
    fn duplicate_insert_reports_false_and_keeps_the_first_address() {
        let (mut tree, _dir) = create_tree();

        assert!(tree.insert(5, 111).unwrap());
        assert!(!tree.insert(5, 222).unwrap());
        assert_eq!(tree.search(5).unwrap(), 111);
    }

    #[test]
    fn duplicate_detection_works_across_splits() {
        let (mut tree, _dir) = create_tree();
        insert_all(&mut tree, &[10, 20, 30, 40, 50, 60, 70]);

        for k in [10, 20, 30, 40, 50, 60, 70] {
            assert!(!tree.insert(k, 999).unwrap(), "key {} re-inserted", k);
            assert_eq!(tree.search(k).unwrap(), addr_of(k));
        }
    }
}

mod persistence {
    use super::*;

    #[test]
    fn close_and_reopen_preserves_structure_and_bindings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.idx");

        let expected_nodes = {
            let mut tree = BTree::create(&path, BLOCK_SIZE).unwrap();
            insert_all(&mut tree, &(1..=50).collect::<Vec<_>>());
            let nodes = tree.nodes().unwrap();
            tree.close().unwrap();
            nodes
        };

        let tree = BTree::open(&path).unwrap();
        tree.verify().unwrap();

        assert_eq!(tree.order(), 5);
        assert_eq!(tree.nodes().unwrap(), expected_nodes);
        for k in 1..=50 {
            assert_eq!(tree.search(k).unwrap(), addr_of(k));
        }
    }

    #[test]
    fn free_list_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.idx");

        {
            let mut tree = BTree::create(&path, BLOCK_SIZE).unwrap();
            insert_all(&mut tree, &[1, 2, 3, 4, 5]);
            // Shrink back to one leaf: two blocks (merged-away leaf and
            // collapsed root) land on the free list.
            tree.remove(1).unwrap();
            tree.remove(2).unwrap();
            tree.verify().unwrap();
            assert_eq!(tree.nodes().unwrap().len(), 1);
            tree.close().unwrap();
        }

        let mut tree = BTree::open(&path).unwrap();
        // verify() proves the free chain partitions the file with the
        // live node, which requires the head persisted by the pops above.
        tree.verify().unwrap();
        let len_before = std::fs::metadata(&path).unwrap().len();

        // A split plus a new root consume exactly the two free blocks.
        tree.insert(1, addr_of(1)).unwrap();
        tree.insert(2, addr_of(2)).unwrap();
        tree.verify().unwrap();

        assert_eq!(std::fs::metadata(&path).unwrap().len(), len_before);
        assert_eq!(tree.nodes().unwrap().len(), 3);
    }

    #[test]
    fn rebuilding_after_draining_reuses_every_block() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.idx");
        let mut tree = BTree::create(&path, BLOCK_SIZE).unwrap();

        let keys: Vec<i32> = (1..=20).collect();
        insert_all(&mut tree, &keys);
        let populated_len = std::fs::metadata(&path).unwrap().len();

        for &k in &keys {
            assert_eq!(tree.remove(k).unwrap(), addr_of(k));
            tree.verify().unwrap();
        }
        assert!(tree.is_empty());

        // Same insertion sequence, same shape, zero growth.
        insert_all(&mut tree, &keys);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), populated_len);
        for &k in &keys {
            assert_eq!(tree.search(k).unwrap(), addr_of(k));
        }
    }
}

mod workloads {
    use super::*;

    #[test]
    fn scattered_inserts_then_scattered_removes_hold_invariants() {
        let (mut tree, _dir) = create_tree();

        // Deterministic permutations of 0..200 (37 and 53 are coprime to
        // 200), scattering inserts and removals across the whole tree so
        // deep split and repair cascades are exercised.
        let inserts: Vec<i32> = (0..200).map(|i| (i * 37) % 200).collect();
        let removals: Vec<i32> = (0..200).map(|i| (i * 53) % 200).collect();

        for &k in &inserts {
            assert!(tree.insert(k, addr_of(k)).unwrap());
            tree.verify().unwrap();
        }

        let all = tree.range_search(i32::MIN, i32::MAX).unwrap();
        assert_eq!(all.len(), 200);
        assert_eq!(all, (0..200).map(addr_of).collect::<Vec<_>>());

        for (n, &k) in removals.iter().enumerate() {
            assert_eq!(tree.remove(k).unwrap(), addr_of(k), "removing {}", k);
            tree.verify().unwrap();
            assert_eq!(tree.search(k).unwrap(), NONE_ADDRESS);

            let remaining = tree.range_search(i32::MIN, i32::MAX).unwrap();
            assert_eq!(remaining.len(), 200 - n - 1);
        }

        assert!(tree.is_empty());
    }

    #[test]
    fn ascending_and_descending_inserts_build_valid_trees() {
        let (mut asc, _dir_a) = create_tree();
        let (mut desc, _dir_d) = create_tree();

        for k in 0..100 {
            asc.insert(k, addr_of(k)).unwrap();
            desc.insert(99 - k, addr_of(99 - k)).unwrap();
        }
        asc.verify().unwrap();
        desc.verify().unwrap();

        let from_asc = asc.range_search(i32::MIN, i32::MAX).unwrap();
        let from_desc = desc.range_search(i32::MIN, i32::MAX).unwrap();
        assert_eq!(from_asc, from_desc);
        assert_eq!(from_asc.len(), 100);
    }

    #[test]
    fn extreme_keys_are_ordinary_keys() {
        let (mut tree, _dir) = create_tree();

        for k in [i32::MIN, -1, 0, 1, i32::MAX] {
            assert!(tree.insert(k, addr_of_wide(k)).unwrap());
        }
        tree.verify().unwrap();

        let addrs = tree.range_search(i32::MIN, i32::MAX).unwrap();
        assert_eq!(addrs.len(), 5);
        assert_eq!(tree.search(i32::MIN).unwrap(), addr_of_wide(i32::MIN));
        assert_eq!(tree.search(i32::MAX).unwrap(), addr_of_wide(i32::MAX));
    }

    fn addr_of_wide(key: i32) -> i64 {
        1_000_000 + key as i64
    }
}

mod creation {
    use super::*;

    #[test]
    fn create_rejects_block_sizes_below_order_3() {
        let dir = tempdir().unwrap();
        assert!(BTree::create(dir.path().join("t.idx"), 24).is_err());
        assert!(BTree::create(dir.path().join("t.idx"), 35).is_err());
        assert!(BTree::create(dir.path().join("t.idx"), 36).is_ok());
    }

    #[test]
    fn create_replaces_an_existing_tree() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.idx");

        {
            let mut tree = BTree::create(&path, BLOCK_SIZE).unwrap();
            tree.insert(1, 100).unwrap();
            tree.close().unwrap();
        }

        let tree = BTree::create(&path, BLOCK_SIZE).unwrap();
        assert!(tree.is_empty());
        assert_eq!(tree.search(1).unwrap(), NONE_ADDRESS);
    }
}
