//! Block template assembly and header finalization.
//!
//! `build_template` invokes transaction selection and the coinbase
//! builder, then derives the header commitments whose composition depends
//! on the activated network upgrade, and finally dry-runs the template
//! through the outbound validity check.

use chrono::Utc;
use rand::RngCore;
use tracing::{debug, info};

use quagga_chain::{
    amount::{Amount, NegativeAllowed, NonNegative},
    block::{
        self, merkle, Block, ChainHistoryBlockTxAuthCommitmentHash, ChainHistoryMmrRootHash,
        Header, Height, ZCASH_BLOCK_VERSION,
    },
    parameters::{ConsensusBranchId, Network, NetworkUpgrade},
    sapling,
    transaction::{Transaction, UnminedTx},
    transparent,
    work::equihash::Solution,
};

use crate::{
    address::MinerAddress,
    chain::ChainInfo,
    check,
    coin_view::CoinView,
    coinbase,
    config::BlockSizeLimits,
    difficulty::AdjustedDifficulty,
    error::TemplateError,
    mempool::MempoolView,
    prover::{OrchardProver, SaplingProver},
    script::ScriptVerifier,
    select,
};

/// Free data appended to the coinbase script after the extra nonce, as a
/// script push.
pub const COINBASE_FLAGS: &[u8] = b"/Quagga/";

/// A candidate block, with the parallel per-transaction metadata and the
/// cached intermediate roots needed to cheaply recompute the header when
/// the coinbase changes.
#[derive(Clone, Debug)]
pub struct BlockTemplate {
    /// The candidate block. `transactions[0]` is the coinbase.
    pub block: Block,

    /// The fee of each transaction, by block position.
    ///
    /// The coinbase entry is the negated sum of the other entries.
    pub tx_fees: Vec<Amount<NegativeAllowed>>,

    /// The legacy-plus-P2SH sigop count of each transaction, by block
    /// position.
    pub tx_sigops: Vec<u64>,

    /// The total fee collected by the coinbase.
    pub total_fees: Amount<NonNegative>,

    /// The chain history root used in the header commitments, cached so
    /// the commitment can be recomputed when the coinbase extra-nonce
    /// changes.
    pub chain_history_root: ChainHistoryMmrRootHash,

    /// The auth data root of the template transactions.
    ///
    /// All zeroes before NU5.
    pub auth_data_root: merkle::AuthDataRoot,

    /// The network this template was built for.
    pub network: Network,

    /// The height this template is valid at.
    pub height: Height,
}

/// The caller-controlled parts of template assembly.
#[derive(Clone, Debug)]
pub struct TemplateParams {
    /// The selection byte limits, already clamped.
    pub limits: BlockSizeLimits,

    /// Override the block version. Only honored on networks where blocks
    /// are mined on demand.
    pub block_version: Option<u32>,

    /// Log each accepted transaction's priority and fee rate.
    pub print_priority: bool,

    /// A precomputed coinbase for externally-assembled templates.
    ///
    /// When supplied, the mempool scan is skipped entirely: the template
    /// contains only this coinbase and zero fees.
    pub precomputed_coinbase: Option<Transaction>,
}

impl Default for TemplateParams {
    fn default() -> Self {
        TemplateParams {
            limits: crate::config::Config::default().block_size_limits(),
            block_version: None,
            print_priority: false,
            precomputed_coinbase: None,
        }
    }
}

/// Assemble a fresh block template on top of the tip described by
/// `chain_info`.
///
/// `view` must be a fresh snapshot for this assembly; it is consumed by
/// the selection's template-local updates.
#[allow(clippy::too_many_arguments)]
pub fn build_template(
    chain_info: &ChainInfo,
    mut view: CoinView,
    mempool: &MempoolView,
    miner_address: &MinerAddress,
    sapling_prover: &dyn SaplingProver,
    orchard_prover: &dyn OrchardProver,
    script_verifier: &dyn ScriptVerifier,
    params: &TemplateParams,
) -> Result<BlockTemplate, TemplateError> {
    let network = chain_info.network;
    let height = chain_info.next_block_height();
    let median_time_past = chain_info.median_time_past();
    let lock_time_cutoff = median_time_past.timestamp();
    let branch_id = ConsensusBranchId::current(network, height)
        .expect("template heights are after the first branch id");

    // Select mempool transactions, unless we were given a coinbase: a
    // precomputed coinbase pays fees we don't know, so the template must
    // stay otherwise empty.
    let (selected, coinbase_tx) = match params.precomputed_coinbase.clone() {
        Some(coinbase_tx) => (select::SelectedTransactions::default(), coinbase_tx),
        None => {
            let selected = select::select_transactions(
                network,
                height,
                lock_time_cutoff,
                branch_id,
                &mut view,
                mempool,
                script_verifier,
                params.limits,
                chain_info.chain_value_pools,
                params.print_priority,
            );

            let coinbase_tx = coinbase::create_coinbase_transaction(
                network,
                height,
                selected.total_fees,
                miner_address,
                sapling_prover,
                orchard_prover,
            )?;

            (selected, coinbase_tx)
        }
    };

    let total_fees = selected.total_fees;
    let coinbase_sigops = coinbase_tx.legacy_sigop_count();
    let coinbase_tx = UnminedTx::from(coinbase_tx);

    // The coinbase's entry in the parallel fees array is the negated sum
    // of the selected fees.
    let mut tx_fees: Vec<Amount<NegativeAllowed>> = vec![-total_fees];
    tx_fees.extend(selected.fees.iter().map(|fee| {
        fee.constrain()
            .expect("non-negative fees are valid negative-allowed amounts")
    }));

    let mut tx_sigops = vec![coinbase_sigops];
    tx_sigops.extend(selected.sigops.iter().copied());

    // Update the Sapling commitment tree with every output note
    // commitment, in transaction order, then output order, starting from
    // the tip's final treestate.
    let mut sapling_tree = chain_info.sapling_tree.clone();
    for tx in std::iter::once(&coinbase_tx.transaction)
        .chain(selected.transactions.iter().map(|tx| &tx.transaction))
    {
        for cm_u in tx.sapling_note_commitments() {
            sapling_tree
                .append(cm_u)
                .expect("tip treestates are always far from full");
        }
    }

    // Compute the transaction roots.
    let (merkle_root, auth_data_root) =
        merkle::calculate_transaction_roots(&coinbase_tx, &selected.transactions);

    // Randomise the nonce, clearing the top and bottom 16 bits for local
    // use as thread flags and counters by the mining driver.
    let mut nonce = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut nonce);
    nonce[0] = 0;
    nonce[1] = 0;
    nonce[30] = 0;
    nonce[31] = 0;

    // Derive the block commitments field; its composition depends on
    // which network upgrade is active at the target height.
    let (chain_history_root, auth_root_for_header, commitment_bytes) = header_commitments(
        network,
        height,
        &view,
        &sapling_tree,
        auth_data_root,
        chain_info.tip_height,
    );

    // The block version is effectively free (only bounded below), but we
    // only let configuration override it where blocks are mined on
    // demand.
    let version = match params.block_version {
        Some(version) if network.mine_blocks_on_demand() => version,
        _ => ZCASH_BLOCK_VERSION,
    };

    let mut header = Header {
        version,
        previous_block_hash: chain_info.tip_hash,
        merkle_root,
        commitment_bytes: commitment_bytes.into(),
        time: Utc::now(),
        difficulty_threshold: AdjustedDifficulty::new_from_chain_info(chain_info, Utc::now())
            .expected_difficulty_threshold(),
        nonce: nonce.into(),
        solution: match network {
            Network::Regtest => Solution::for_regtest_proposal(),
            _ => Solution::for_proposal(),
        },
    };

    update_time(&mut header, chain_info);

    let mut transactions = Vec::with_capacity(1 + selected.transactions.len());
    transactions.push(coinbase_tx.transaction.clone());
    transactions.extend(selected.transactions.iter().map(|tx| tx.transaction.clone()));

    let block = Block {
        header,
        transactions,
    };

    // Failure here is fatal to template production: it means the
    // assembler produced a block a peer would reject.
    check::template_block_is_valid(
        &block,
        network,
        height,
        total_fees,
        lock_time_cutoff,
        median_time_past,
    )
    .map_err(|error| TemplateError::TemplateInvalid(error.to_string()))?;

    info!(
        ?height,
        transactions = block.transactions.len(),
        size = selected.total_size,
        %total_fees,
        "assembled new block template",
    );

    Ok(BlockTemplate {
        block,
        tx_fees,
        tx_sigops,
        total_fees,
        chain_history_root,
        auth_data_root: auth_root_for_header,
        network,
        height,
    })
}

/// Derive the `hashBlockCommitments` composition for the target height:
///
/// | upgrade state | commitment |
/// |---|---|
/// | NU5 active | `BLAKE2b("ZcashBlockCommit", chainHistory ‖ authData ‖ 32 zero bytes)` |
/// | Heartwood activation block | all zeroes |
/// | Heartwood active (not NU5) | the chain history root |
/// | pre-Heartwood | the final Sapling treestate root |
///
/// Returns the cached chain history root, the auth data root actually
/// committed (zeroed outside NU5), and the raw header field bytes.
fn header_commitments(
    network: Network,
    height: Height,
    view: &CoinView,
    sapling_tree: &sapling::tree::NoteCommitmentTree,
    auth_data_root: merkle::AuthDataRoot,
    tip_height: Height,
) -> (
    ChainHistoryMmrRootHash,
    merkle::AuthDataRoot,
    [u8; 32],
) {
    let zero_root = ChainHistoryMmrRootHash::from([0; 32]);
    let zero_auth = merkle::AuthDataRoot::from([0; 32]);

    // The history root commits to the chain up to and including the tip,
    // which is in the *previous* block's epoch.
    let prev_branch_id = ConsensusBranchId::current(network, tip_height)
        .map(u32::from)
        .unwrap_or_default();

    if NetworkUpgrade::Nu5.is_active_at(network, height) {
        // hashBlockCommitments depends on the block transactions, so the
        // mining driver recomputes it whenever the coinbase changes, from
        // these cached roots.
        let chain_history_root = view
            .history_root(prev_branch_id)
            .expect("tip state has a history root from Heartwood onwards");
        let commitment = ChainHistoryBlockTxAuthCommitmentHash::from_commitments(
            &chain_history_root,
            &auth_data_root,
        );
        (chain_history_root, auth_data_root, commitment.into())
    } else if NetworkUpgrade::Heartwood.is_activation_height(network, height) {
        (zero_root, zero_auth, [0; 32])
    } else if NetworkUpgrade::Heartwood.is_active_at(network, height) {
        let chain_history_root = view
            .history_root(prev_branch_id)
            .expect("tip state has a history root from Heartwood onwards");
        (chain_history_root, zero_auth, chain_history_root.into())
    } else {
        (zero_root, zero_auth, sapling_tree.root().into())
    }
}

/// Update the header time to the latest of the current time and the
/// median-time-past plus one, and refresh the difficulty when the network
/// allows minimum-difficulty blocks.
///
/// `UpdateTime` in zcashd: capped at `median_time_past +
/// MAX_FUTURE_BLOCK_TIME_MTP` once the future-timestamp soft fork is
/// active.
pub fn update_time(header: &mut Header, chain_info: &ChainInfo) {
    /// The maximum number of seconds a block time may be ahead of the
    /// median-time-past, under the future-timestamp soft fork.
    const MAX_FUTURE_BLOCK_TIME_MTP: i64 = 90 * 60;

    let height = chain_info.next_block_height();
    let median_time_past = chain_info.median_time_past();

    let mut time = std::cmp::max(
        median_time_past + chrono::Duration::seconds(1),
        Utc::now(),
    );
    if chain_info.network.future_timestamp_soft_fork_active(height) {
        time = std::cmp::min(
            time,
            median_time_past + chrono::Duration::seconds(MAX_FUTURE_BLOCK_TIME_MTP),
        );
    }
    header.time = time;

    // Updating time can change the work required on test networks.
    if chain_info.network.min_difficulty_blocks_after().is_some() {
        header.difficulty_threshold =
            AdjustedDifficulty::new_from_chain_info(chain_info, header.time)
                .expected_difficulty_threshold();
    }
}

/// Rewrite the coinbase script with a fresh extra nonce, to explore more
/// of the coinbase-dependent hash space between solver attempts.
///
/// The counter resets whenever `previous_block_hash` changes between
/// calls, tracked through `last_prev_block`. The coinbase script becomes
/// `height ‖ extra_nonce ‖ COINBASE_FLAGS` and must stay within the
/// 100-byte consensus limit.
///
/// The Merkle root is always recomputed; once NU5 is active, the auth
/// data root and block commitments are recomputed from the cached chain
/// history root as well.
pub fn increment_extra_nonce(
    template: &mut BlockTemplate,
    extra_nonce: &mut u32,
    last_prev_block: &mut Option<block::Hash>,
) {
    if *last_prev_block != Some(template.block.header.previous_block_hash) {
        *extra_nonce = 0;
        *last_prev_block = Some(template.block.header.previous_block_hash);
    }
    *extra_nonce += 1;

    let height = template.height;

    // script: height, then the extra nonce as a script number push, then
    // the coinbase flags as a data push
    let mut data = script_num_push(*extra_nonce as i64);
    data.push(COINBASE_FLAGS.len() as u8);
    data.extend_from_slice(COINBASE_FLAGS);

    let coinbase_data = transparent::CoinbaseData::new(height, data)
        .expect("height, extra nonce, and flags fit in 100 bytes");

    let old_coinbase = template.block.transactions[0].as_ref().clone();
    let new_coinbase = replace_coinbase_data(old_coinbase, coinbase_data);
    template.block.transactions[0] = std::sync::Arc::new(new_coinbase);

    // The coinbase changed, so the roots that commit to it change too.
    template.block.header.merkle_root = template.block.transactions.iter().collect();
    if NetworkUpgrade::Nu5.is_active_at(template.network, height) {
        template.auth_data_root = template.block.transactions.iter().collect();
        template.block.header.commitment_bytes =
            <[u8; 32]>::from(ChainHistoryBlockTxAuthCommitmentHash::from_commitments(
                &template.chain_history_root,
                &template.auth_data_root,
            ))
            .into();
    }

    debug!(extra_nonce, "incremented coinbase extra nonce");
}

/// Encode `value` the way script number pushes encode it: a length byte,
/// then minimal little-endian bytes with a sign bit.
fn script_num_push(value: i64) -> Vec<u8> {
    if value == 0 {
        return vec![0x00];
    }

    let negative = value < 0;
    let mut absolute = value.unsigned_abs();

    let mut bytes = Vec::new();
    while absolute > 0 {
        bytes.push((absolute & 0xff) as u8);
        absolute >>= 8;
    }

    // If the most significant byte would carry the sign bit, add a byte.
    if bytes.last().expect("value is non-zero") & 0x80 != 0 {
        bytes.push(if negative { 0x80 } else { 0x00 });
    } else if negative {
        let last = bytes.last_mut().expect("value is non-zero");
        *last |= 0x80;
    }

    let mut push = vec![bytes.len() as u8];
    push.extend(bytes);
    push
}

/// Replace the data field of a coinbase transaction's input.
fn replace_coinbase_data(
    mut coinbase: Transaction,
    data: transparent::CoinbaseData,
) -> Transaction {
    let inputs = match &mut coinbase {
        Transaction::V4 { inputs, .. } => inputs,
        Transaction::V5 { inputs, .. } => inputs,
    };

    match inputs.first_mut() {
        Some(transparent::Input::Coinbase {
            data: ref mut coinbase_data,
            ..
        }) => *coinbase_data = data,
        _ => unreachable!("templates always carry a coinbase at index 0"),
    }

    coinbase
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_num_push_is_minimal() {
        assert_eq!(script_num_push(0), vec![0x00]);
        assert_eq!(script_num_push(1), vec![0x01, 0x01]);
        assert_eq!(script_num_push(0x7f), vec![0x01, 0x7f]);
        // 0x80 would set the sign bit, so a padding byte is added
        assert_eq!(script_num_push(0x80), vec![0x02, 0x80, 0x00]);
        assert_eq!(script_num_push(0x1234), vec![0x02, 0x34, 0x12]);
        assert_eq!(script_num_push(-1), vec![0x01, 0x81]);
    }
}
