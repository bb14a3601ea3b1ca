//! Chain state interfaces consumed by the template assembler and miner.
//!
//! The node's state service implements [`ChainBackend`]; the assembler
//! only ever sees immutable snapshots, so each mining thread works from a
//! consistent view without holding chain locks during the solver run.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use quagga_chain::{
    amount::NonNegative,
    block::{self, ChainHistoryMmrRootHash, Height},
    parameters::{Network, POW_AVERAGING_WINDOW, POW_MEDIAN_BLOCK_SPAN},
    sapling,
    value_balance::ValueBalance,
    work::difficulty::CompactDifficulty,
};

use crate::{coin_view::CoinView, error::SubmitError, mempool::MempoolView};

/// A consistent snapshot of the chain tip, taken under the chain-state
/// lock and used for one template assembly.
#[derive(Clone, Debug)]
pub struct ChainInfo {
    /// The network this chain follows.
    pub network: Network,

    /// The hash of the tip block.
    pub tip_hash: block::Hash,

    /// The height of the tip block.
    pub tip_height: Height,

    /// The `difficulty_threshold`s of the previous
    /// `POW_AVERAGING_WINDOW + POW_MEDIAN_BLOCK_SPAN` (28) blocks, in
    /// reverse height order, starting with the tip.
    pub relevant_difficulty_thresholds: Vec<CompactDifficulty>,

    /// The `time`s of the previous 28 blocks, in reverse height order,
    /// starting with the tip.
    ///
    /// These times might not be in reverse chronological order, because
    /// block times are provided by miners.
    pub relevant_times: Vec<DateTime<Utc>>,

    /// The Sapling note commitment tree of the final treestate of the tip.
    pub sapling_tree: sapling::tree::NoteCommitmentTree,

    /// The chain history roots at the tip, by consensus branch id.
    pub history_roots: HashMap<u32, ChainHistoryMmrRootHash>,

    /// The chain value pool balances at the tip, when the chain has
    /// initialized totals for all of them.
    ///
    /// `None` disables turnstile monitoring during selection.
    pub chain_value_pools: Option<ValueBalance<NonNegative>>,
}

impl ChainInfo {
    /// The height of the next block on top of this tip.
    pub fn next_block_height(&self) -> Height {
        (self.tip_height + 1).expect("tip is far below the maximum height")
    }

    /// The median of the previous `POW_MEDIAN_BLOCK_SPAN` block times.
    ///
    /// `GetMedianTimePast()` in zcashd.
    pub fn median_time_past(&self) -> DateTime<Utc> {
        let mut times: Vec<_> = self
            .relevant_times
            .iter()
            .take(POW_MEDIAN_BLOCK_SPAN)
            .copied()
            .collect();
        times.sort();
        times[times.len() / 2]
    }

    /// Checks that the snapshot carries enough context for difficulty
    /// adjustment.
    pub fn has_enough_context(&self) -> bool {
        let needed = POW_AVERAGING_WINDOW + POW_MEDIAN_BLOCK_SPAN;
        self.relevant_difficulty_thresholds.len() >= needed
            && self.relevant_times.len() >= needed
    }
}

/// The node services the mining driver depends on.
///
/// All methods take brief internal locks and return owned snapshots; no
/// lock is held while the solver runs.
pub trait ChainBackend: Send + Sync + 'static {
    /// The network this node follows.
    fn network(&self) -> Network;

    /// A snapshot of the current tip, or `None` if the node has no valid
    /// chain tip to mine on yet.
    fn chain_info(&self) -> Option<ChainInfo>;

    /// The hash of the current tip block, used for cheap staleness
    /// checks between solver attempts.
    fn tip_hash(&self) -> Option<block::Hash>;

    /// A snapshot view of the UTXO set and treestate anchors at the tip
    /// described by `info`.
    fn coin_view(&self, info: &ChainInfo) -> CoinView;

    /// A snapshot of the current mempool contents.
    fn mempool(&self) -> MempoolView;

    /// A counter incremented every time the mempool contents change.
    fn mempool_updates(&self) -> u64;

    /// The number of currently connected peers.
    fn peer_count(&self) -> usize;

    /// Whether the node is still in initial block download.
    fn is_initial_block_download(&self) -> bool;

    /// Validate and commit a mined block, as if it had been received from
    /// another node, then announce it.
    fn submit_block(&self, block: block::Block) -> Result<(), SubmitError>;
}
