//! Blocks and block-related structures.

use std::{fmt, sync::Arc};

use crate::{transaction::Transaction, transparent};

mod commitment;
mod hash;
mod header;
mod height;
mod serialize;

pub mod merkle;

pub use commitment::{
    ChainHistoryBlockTxAuthCommitmentHash, ChainHistoryMmrRootHash, Commitment, CommitmentError,
};
pub use hash::Hash;
pub use header::{BlockTimeError, Header, ZCASH_BLOCK_VERSION};
pub use height::Height;

/// The maximum serialized size of a block, in bytes.
///
/// `MAX_BLOCK_SIZE` in zcashd.
pub const MAX_BLOCK_BYTES: u64 = 2_000_000;

/// The maximum number of legacy and P2SH signature operations in a block.
///
/// `MAX_BLOCK_SIGOPS` in zcashd.
pub const MAX_BLOCK_SIGOPS: u64 = 20_000;

/// A block in the chain: a header and a sequence of transactions, the
/// first of which must be a coinbase transaction.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// The block header, containing block metadata.
    pub header: Header,
    /// The block transactions.
    pub transactions: Vec<Arc<Transaction>>,
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fmter = f.debug_struct("Block");
        if let Some(height) = self.coinbase_height() {
            fmter.field("height", &height);
        }

        fmter.field("hash", &self.hash()).finish()
    }
}

impl Block {
    /// Return the block height reported in the coinbase transaction, if any.
    pub fn coinbase_height(&self) -> Option<Height> {
        self.transactions
            .first()
            .and_then(|tx| tx.inputs().first())
            .and_then(|input| match input {
                transparent::Input::Coinbase { ref height, .. } => Some(*height),
                _ => None,
            })
    }

    /// Compute the hash of this block.
    pub fn hash(&self) -> Hash {
        Hash::from(&self.header)
    }
}
