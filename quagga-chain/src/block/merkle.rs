//! The Bitcoin-inherited Merkle tree of transactions.

use std::{fmt, io::Write};

use crate::serialization::sha256d;
use crate::transaction::{self, Transaction, UnminedTx};

/// The root of the Bitcoin-inherited transaction Merkle tree, binding the
/// block header to the transactions in the block.
///
/// Note that because of a flaw in Bitcoin's design, the `merkle_root` does
/// not always precisely bind the contents of the block (CVE-2012-2459). It
/// is sometimes possible for an attacker to create multiple distinct sets
/// of transactions with the same Merkle root, although only one set will
/// be valid.
#[derive(Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct Root(pub [u8; 32]);

impl fmt::Debug for Root {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("merkle::Root")
            .field(&hex::encode(self.0))
            .finish()
    }
}

fn hash(h1: &[u8; 32], h2: &[u8; 32]) -> [u8; 32] {
    let mut w = sha256d::Writer::default();
    w.write_all(h1).unwrap();
    w.write_all(h2).unwrap();
    w.finish()
}

impl<T> std::iter::FromIterator<T> for Root
where
    T: std::convert::AsRef<Transaction>,
{
    fn from_iter<I>(transactions: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        transactions
            .into_iter()
            .map(|tx| tx.as_ref().hash())
            .collect()
    }
}

impl std::iter::FromIterator<transaction::Hash> for Root {
    /// # Panics
    ///
    /// When there are no transactions in the iterator. This is impossible,
    /// because every block must have a coinbase transaction.
    fn from_iter<I>(hashes: I) -> Self
    where
        I: IntoIterator<Item = transaction::Hash>,
    {
        let mut hashes = hashes.into_iter().map(|hash| hash.0).collect::<Vec<_>>();

        while hashes.len() > 1 {
            hashes = hashes
                .chunks(2)
                .map(|chunk| match chunk {
                    [h1, h2] => hash(h1, h2),
                    [h1] => hash(h1, h1),
                    _ => unreachable!("chunks(2)"),
                })
                .collect();
        }

        Self(hashes[0])
    }
}

/// The placeholder used for the [`AuthDigest`](transaction::AuthDigest) of
/// pre-v5 transactions.
///
/// # Consensus
///
/// > These digests are internally consistent with the transaction id
/// > digests used in v5 transactions. For transactions of earlier
/// > versions, the placeholder value 0xFF...FF is used.
///
/// <https://zips.z.cash/zip-0244#authorizing-data-commitment>
pub const AUTH_DIGEST_PLACEHOLDER: transaction::AuthDigest =
    transaction::AuthDigest([0xFF; 32]);

/// The root of the authorizing data Merkle tree, binding the block header
/// to the authorizing data of the transactions in the block.
///
/// See [ZIP-244] for details.
///
/// [ZIP-244]: https://zips.z.cash/zip-0244#authorizing-data-commitment
#[derive(Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct AuthDataRoot(pub(crate) [u8; 32]);

impl fmt::Debug for AuthDataRoot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("AuthDataRoot")
            .field(&hex::encode(self.0))
            .finish()
    }
}

impl From<[u8; 32]> for AuthDataRoot {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<AuthDataRoot> for [u8; 32] {
    fn from(root: AuthDataRoot) -> Self {
        root.0
    }
}

fn auth_data_hash(h1: &[u8; 32], h2: &[u8; 32]) -> [u8; 32] {
    // > Non-leaf hashes in this tree are BLAKE2b-256 hashes personalized by
    // > the string "ZcashAuthDatHash".
    // https://zips.z.cash/zip-0244#block-header-changes
    blake2b_simd::Params::new()
        .hash_length(32)
        .personal(b"ZcashAuthDatHash")
        .to_state()
        .update(h1)
        .update(h2)
        .finalize()
        .as_bytes()
        .try_into()
        .expect("32 byte auth data hash")
}

impl<T> std::iter::FromIterator<T> for AuthDataRoot
where
    T: std::convert::AsRef<Transaction>,
{
    fn from_iter<I>(transactions: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        transactions
            .into_iter()
            .map(|tx| tx.as_ref().auth_digest())
            .collect()
    }
}

impl std::iter::FromIterator<transaction::AuthDigest> for AuthDataRoot {
    fn from_iter<I>(hashes: I) -> Self
    where
        I: IntoIterator<Item = transaction::AuthDigest>,
    {
        let mut hashes = hashes.into_iter().map(|hash| hash.0).collect::<Vec<_>>();

        // > This tree is a binary tree of the auth digests in the block,
        // > padded with 0xFF...FF leaves to the next power of two.
        let pad_count = hashes.len().next_power_of_two() - hashes.len();
        hashes.extend(std::iter::repeat(AUTH_DIGEST_PLACEHOLDER.0).take(pad_count));

        while hashes.len() > 1 {
            hashes = hashes
                .chunks(2)
                .map(|chunk| match chunk {
                    [h1, h2] => auth_data_hash(h1, h2),
                    _ => unreachable!("number of nodes is always even"),
                })
                .collect();
        }

        Self(hashes[0])
    }
}

/// Compute the transaction effecting and authorizing roots for a coinbase
/// transaction and a list of selected mempool transactions, which are used
/// in the block header.
pub fn calculate_transaction_roots(
    coinbase_tx: &UnminedTx,
    mempool_txs: &[UnminedTx],
) -> (Root, AuthDataRoot) {
    let block_transactions = || {
        std::iter::once(&coinbase_tx.transaction)
            .chain(mempool_txs.iter().map(|tx| &tx.transaction))
    };

    let merkle_root = block_transactions().cloned().collect();
    let auth_data_root = block_transactions().cloned().collect();

    (merkle_root, auth_data_root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_root_of_one_tx_pads_to_itself() {
        // A single leaf needs no padding, so the root is the leaf itself
        let digest = transaction::AuthDigest([0x42; 32]);
        let root: AuthDataRoot = vec![digest].into_iter().collect();
        assert_eq!(root.0, digest.0);
    }

    #[test]
    fn auth_root_pads_to_power_of_two() {
        let digests = vec![
            transaction::AuthDigest([0x01; 32]),
            transaction::AuthDigest([0x02; 32]),
            transaction::AuthDigest([0x03; 32]),
        ];
        let root: AuthDataRoot = digests.clone().into_iter().collect();

        // manually pad to 4 leaves
        let padded = vec![
            digests[0],
            digests[1],
            digests[2],
            AUTH_DIGEST_PLACEHOLDER,
        ];
        let expected: AuthDataRoot = padded.into_iter().collect();
        assert_eq!(root, expected);
    }
}
