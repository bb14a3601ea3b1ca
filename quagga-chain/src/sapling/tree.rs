//! Sapling note commitment trees.
//!
//! A note commitment tree is an incremental Merkle tree of fixed depth
//! used to store note commitments that Output transfers produce. Just as
//! the unspent transaction output set (UTXO set) used in Bitcoin, it is
//! used to express the existence of value and the capability to spend it.
//! However, unlike the UTXO set, it is not the job of this tree to protect
//! against double-spending, as it is append-only.
//!
//! A root of a note commitment tree is associated with each treestate.

use std::fmt;

use lazy_static::lazy_static;
use thiserror::Error;

/// The depth of the Sapling note commitment tree.
pub const MERKLE_DEPTH: usize = 32;

/// MerkleCRH^Sapling hash function, used to hash incremental Merkle tree
/// hash values for Sapling.
///
/// The production Zcash instantiation is a Pedersen hash over Jubjub; the
/// hash used here is supplied by this crate's hashing primitive so the
/// tree structure stays independent of the proof system backend. Swapping
/// in another node hash is confined to this function.
fn merkle_crh_sapling(layer: u8, left: [u8; 32], right: [u8; 32]) -> [u8; 32] {
    blake2b_simd::Params::new()
        .hash_length(32)
        .personal(b"MerkleCRHSapling")
        .to_state()
        .update(&[layer])
        .update(&left)
        .update(&right)
        .finalize()
        .as_bytes()
        .try_into()
        .expect("32 byte tree node hash")
}

lazy_static! {
    /// The empty subtree roots for each layer, leafmost first.
    ///
    /// `EMPTY_ROOTS[d]` is the root of an empty subtree of height `d`.
    static ref EMPTY_ROOTS: Vec<[u8; 32]> = {
        let mut v = vec![NoteCommitmentTree::uncommitted()];

        for d in 0..MERKLE_DEPTH {
            let next = merkle_crh_sapling(d as u8, v[d], v[d]);
            v.push(next);
        }

        v
    };
}

/// Sapling note commitment tree root node hash.
///
/// The root hash in LEBS2OSP256(rt) encoding of the Sapling note
/// commitment tree corresponding to the final Sapling treestate of this
/// block. A root of a note commitment tree is associated with each
/// treestate.
#[derive(Clone, Copy, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Root(pub [u8; 32]);

impl fmt::Debug for Root {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("sapling::tree::Root")
            .field(&hex::encode(self.0))
            .finish()
    }
}

impl From<[u8; 32]> for Root {
    fn from(bytes: [u8; 32]) -> Root {
        Self(bytes)
    }
}

impl From<Root> for [u8; 32] {
    fn from(root: Root) -> Self {
        root.0
    }
}

/// An error when appending to a note commitment tree.
#[derive(Error, Copy, Clone, Debug, Eq, PartialEq)]
pub enum NoteCommitmentTreeError {
    /// The tree is already at its maximum capacity.
    #[error("the note commitment tree is full")]
    FullTree,
}

/// Sapling Incremental Note Commitment Tree.
///
/// Only the rightmost frontier of the tree is stored: the incomplete left
/// and right leaves of the lowest incomplete subtree, and the left
/// siblings of the path from that subtree to the root. This is the same
/// representation zcashd's `IncrementalMerkleTree` uses, so a tree cloned
/// from a tip snapshot can keep absorbing note commitments during
/// template assembly.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct NoteCommitmentTree {
    /// The left leaf of the lowest incomplete subtree.
    left: Option<[u8; 32]>,
    /// The right leaf of the lowest incomplete subtree.
    right: Option<[u8; 32]>,
    /// The left siblings on the path to the root, where `parents[d]` is
    /// at layer `d + 1`. `None` entries are empty subtrees.
    parents: Vec<Option<[u8; 32]>>,
}

impl NoteCommitmentTree {
    /// The value of an unfilled leaf: `Uncommitted^Sapling`.
    pub fn uncommitted() -> [u8; 32] {
        let mut bytes = [0u8; 32];
        bytes[0] = 1;
        bytes
    }

    /// Append a note commitment to the tree, filling leaves from the left.
    ///
    /// Returns an error if the tree is full.
    pub fn append(&mut self, cm_u: [u8; 32]) -> Result<(), NoteCommitmentTreeError> {
        if self.left.is_none() {
            self.left = Some(cm_u);
            return Ok(());
        }
        if self.right.is_none() {
            self.right = Some(cm_u);
            return Ok(());
        }

        // Propagate the completed pair of leaves upwards.
        let mut combined = merkle_crh_sapling(
            0,
            self.left.take().expect("checked above"),
            self.right.take().expect("checked above"),
        );
        self.left = Some(cm_u);

        for (layer, parent) in self.parents.iter_mut().enumerate() {
            match parent.take() {
                // An empty slot absorbs the carried subtree.
                None => {
                    *parent = Some(combined);
                    return Ok(());
                }
                // A filled slot combines with the carry and propagates.
                Some(sibling) => {
                    combined = merkle_crh_sapling((layer + 1) as u8, sibling, combined);
                }
            }
        }

        if self.parents.len() < MERKLE_DEPTH - 1 {
            self.parents.push(Some(combined));
            Ok(())
        } else {
            Err(NoteCommitmentTreeError::FullTree)
        }
    }

    /// Return the number of note commitments in the tree.
    pub fn count(&self) -> u64 {
        let mut count: u64 = match (self.left, self.right) {
            (None, None) => 0,
            (Some(_), None) => 1,
            (Some(_), Some(_)) => 2,
            (None, Some(_)) => unreachable!("left leaf fills first"),
        };

        for (layer, parent) in self.parents.iter().enumerate() {
            if parent.is_some() {
                count += 1 << (layer + 1);
            }
        }

        count
    }

    /// Compute the root of the tree: the hash of the rightmost frontier
    /// combined with the empty subtree roots.
    pub fn root(&self) -> Root {
        let uncommitted = Self::uncommitted();

        let mut node = merkle_crh_sapling(
            0,
            self.left.unwrap_or(uncommitted),
            self.right.unwrap_or(uncommitted),
        );

        for layer in 1..MERKLE_DEPTH {
            let sibling = self
                .parents
                .get(layer - 1)
                .copied()
                .flatten();

            node = match sibling {
                Some(left) => merkle_crh_sapling(layer as u8, left, node),
                None => merkle_crh_sapling(layer as u8, node, EMPTY_ROOTS[layer]),
            };
        }

        Root(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tree_root_matches_empty_roots_table() {
        let tree = NoteCommitmentTree::default();
        assert_eq!(tree.root().0, EMPTY_ROOTS[MERKLE_DEPTH]);
        assert_eq!(tree.count(), 0);
    }

    #[test]
    fn append_changes_the_root_and_count() {
        let mut tree = NoteCommitmentTree::default();
        let empty_root = tree.root();

        tree.append([1; 32]).unwrap();
        assert_eq!(tree.count(), 1);
        let one_root = tree.root();
        assert_ne!(empty_root, one_root);

        tree.append([2; 32]).unwrap();
        assert_eq!(tree.count(), 2);
        assert_ne!(one_root, tree.root());
    }

    #[test]
    fn append_is_order_sensitive() {
        let mut ab = NoteCommitmentTree::default();
        ab.append([1; 32]).unwrap();
        ab.append([2; 32]).unwrap();

        let mut ba = NoteCommitmentTree::default();
        ba.append([2; 32]).unwrap();
        ba.append([1; 32]).unwrap();

        assert_ne!(ab.root(), ba.root());
    }

    #[test]
    fn count_tracks_many_appends() {
        let mut tree = NoteCommitmentTree::default();
        for i in 0..37u64 {
            assert_eq!(tree.count(), i);
            tree.append([i as u8; 32]).unwrap();
        }
        assert_eq!(tree.count(), 37);
    }

    #[test]
    fn incremental_root_matches_recomputed_root() {
        // Compare the frontier implementation against a naive full
        // recomputation over the padded leaf layer.
        let leaves: Vec<[u8; 32]> = (0u8..5).map(|i| [i + 10; 32]).collect();

        let mut tree = NoteCommitmentTree::default();
        for leaf in &leaves {
            tree.append(*leaf).unwrap();
        }

        let mut layer: Vec<[u8; 32]> = leaves.clone();
        for depth in 0..MERKLE_DEPTH {
            if layer.len() % 2 == 1 || layer.is_empty() {
                layer.push(EMPTY_ROOTS[depth]);
            }
            layer = layer
                .chunks(2)
                .map(|pair| merkle_crh_sapling(depth as u8, pair[0], pair[1]))
                .collect();
        }

        assert_eq!(tree.root().0, layer[0]);
    }
}
