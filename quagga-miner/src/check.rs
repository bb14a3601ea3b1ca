//! Validity checks for outbound block templates.
//!
//! Before a template leaves the assembler it goes through the same
//! structural checks a received block would, minus the proof-of-work
//! check and without mutating any chain state. A failure here is fatal to
//! template production: it means the assembler produced something a peer
//! would reject.

use std::fmt;

use thiserror::Error;

use quagga_chain::{
    amount::{Amount, NonNegative},
    block::{merkle, Block, Height, MAX_BLOCK_BYTES, MAX_BLOCK_SIGOPS},
    parameters::{subsidy, ConsensusBranchId, Network, NetworkUpgrade},
    serialization::ZcashSerialize,
    transaction::Transaction,
    transparent::MIN_TRANSPARENT_COINBASE_MATURITY,
    value_balance::ValueBalance,
};

use crate::{
    coin_view::CoinView,
    script::{ScriptError, ScriptVerifier, VerifyInput, MANDATORY_VERIFY_FLAGS},
};

/// A named shielded value pool, for turnstile diagnostics.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ValuePool {
    /// The Sprout pool.
    Sprout,
    /// The Sapling pool.
    Sapling,
    /// The Orchard pool.
    Orchard,
}

impl fmt::Display for ValuePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValuePool::Sprout => f.write_str("Sprout"),
            ValuePool::Sapling => f.write_str("Sapling"),
            ValuePool::Orchard => f.write_str("Orchard"),
        }
    }
}

/// Errors from the per-transaction contextual input checks used during
/// selection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextualError {
    /// An input's referenced output is not spendable in the view.
    #[error("transaction input is missing from the coin view")]
    MissingInputs,

    /// A coinbase output is being spent before it matures.
    #[error("tried to spend a coinbase output at depth {depth}, before maturity")]
    ImmatureCoinbaseSpend {
        /// The depth of the coinbase output at the spend height.
        depth: i64,
    },

    /// The transaction's outputs are worth more than its inputs.
    #[error("transaction inputs are worth less than its outputs")]
    NegativeFee,

    /// A non-coinbase transaction has a coinbase-style input.
    #[error("only the first block transaction may have a coinbase input")]
    UnexpectedCoinbaseInput,

    /// An unlock script failed verification against the output it spends.
    #[error(transparent)]
    Script(#[from] ScriptError),
}

/// Run the contextual checks a new block would apply to `tx`'s inputs,
/// against the current view: spendability, coinbase maturity, value
/// conservation, and script verification with the mandatory verify flags
/// and the current consensus branch id.
///
/// `ContextualCheckInputs(.., MANDATORY_SCRIPT_VERIFY_FLAGS, ..)` in
/// zcashd.
pub fn contextual_check_inputs(
    tx: &Transaction,
    view: &CoinView,
    height: Height,
    branch_id: ConsensusBranchId,
    script_verifier: &dyn ScriptVerifier,
) -> Result<(), ContextualError> {
    let mut value_in: i64 = 0;

    for (input_index, input) in tx.inputs().iter().enumerate() {
        let outpoint = match input.outpoint() {
            Some(outpoint) => outpoint,
            None => return Err(ContextualError::UnexpectedCoinbaseInput),
        };

        let utxo = view
            .get_coin(&outpoint)
            .ok_or(ContextualError::MissingInputs)?;

        // Ensure that coinbases are matured.
        if utxo.from_coinbase {
            let depth = height - utxo.height;
            if depth < MIN_TRANSPARENT_COINBASE_MATURITY as i64 {
                return Err(ContextualError::ImmatureCoinbaseSpend { depth });
            }
        }

        script_verifier.verify_input(VerifyInput {
            transaction: tx,
            input_index,
            spent_output: &utxo.output,
            flags: MANDATORY_VERIFY_FLAGS,
            branch_id,
        })?;

        value_in += utxo.output.value.zatoshis();
    }

    value_in += tx.shielded_value_in().zatoshis();
    if value_in < tx.value_out().zatoshis() {
        return Err(ContextualError::NegativeFee);
    }

    Ok(())
}

/// Compute the hypothetical pool balances after adding `tx`, or the name
/// of the pool that would go negative.
///
/// The [ZIP-209] turnstile: a positive Sapling or Orchard value balance
/// moves funds out of that pool; joinsplits move `vpub_old` into and
/// `vpub_new` out of the Sprout pool.
///
/// [ZIP-209]: https://zips.z.cash/zip-0209
pub fn pool_balances_after(
    balances: ValueBalance<NonNegative>,
    tx: &Transaction,
) -> Result<ValueBalance<NonNegative>, ValuePool> {
    let sprout = balances.sprout_amount().zatoshis() + tx.joinsplit_vpub_old().zatoshis()
        - tx.joinsplit_vpub_new().zatoshis();
    let sapling = balances.sapling_amount().zatoshis() - tx.sapling_value_balance().zatoshis();
    let orchard = balances.orchard_amount().zatoshis() - tx.orchard_value_balance().zatoshis();

    if sprout < 0 {
        return Err(ValuePool::Sprout);
    }
    if sapling < 0 {
        return Err(ValuePool::Sapling);
    }
    if orchard < 0 {
        return Err(ValuePool::Orchard);
    }

    let updated = ValueBalance::from_transparent_amount(balances.transparent_amount())
        + ValueBalance::from_sprout_amount(
            sprout.try_into().expect("non-negative pool balance"),
        )
        + ValueBalance::from_sapling_amount(
            sapling.try_into().expect("non-negative pool balance"),
        )
        + ValueBalance::from_orchard_amount(
            orchard.try_into().expect("non-negative pool balance"),
        );

    Ok(updated.expect("pool balances stay within the money supply"))
}

/// Errors from the outbound template validity dry-run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    /// The block has no transactions.
    #[error("block has no transactions")]
    NoTransactions,

    /// The first transaction is not a coinbase, or a later one is.
    #[error("block has a misplaced or missing coinbase transaction")]
    MisplacedCoinbase,

    /// The coinbase expiry height violates ZIP-203.
    #[error("coinbase expiry height {actual:?} does not match the rule at height {height:?}")]
    BadCoinbaseExpiry {
        /// The coinbase's expiry height.
        actual: Height,
        /// The block height.
        height: Height,
    },

    /// The serialized block is too large.
    #[error("serialized block is {size} bytes, above the {MAX_BLOCK_BYTES} byte limit")]
    OversizedBlock {
        /// The serialized size.
        size: usize,
    },

    /// The block has too many signature operations.
    #[error("block has {sigops} sigops, above the {MAX_BLOCK_SIGOPS} limit")]
    TooManySigops {
        /// The total number of signature operations.
        sigops: u64,
    },

    /// The header's merkle root does not commit to the block transactions.
    #[error("the header merkle root does not match the block transactions")]
    BadMerkleRoot,

    /// A non-coinbase transaction is not final or has expired.
    #[error("block contains a non-final or expired transaction")]
    NotFinal,

    /// The coinbase pays out more than the subsidy plus fees.
    #[error("coinbase pays {paid} but only {allowed} is available at this height")]
    ExcessiveCoinbasePayout {
        /// The total coinbase payout.
        paid: i64,
        /// The block subsidy plus fees.
        allowed: i64,
    },

    /// The block time is not past the median-time-past.
    #[error("block time is not later than the median-time-past")]
    TimeTooEarly,
}

/// Dry-run the validation pipeline a received block would undergo, minus
/// proof-of-work and without mutating chain state.
///
/// `TestBlockValidity` in zcashd. `fees` is the total fee collected by
/// the template's coinbase; `lock_time_cutoff` is the median-time-past
/// used for finality.
pub fn template_block_is_valid(
    block: &Block,
    network: Network,
    height: Height,
    fees: Amount<NonNegative>,
    lock_time_cutoff: i64,
    median_time_past: chrono::DateTime<chrono::Utc>,
) -> Result<(), BlockError> {
    let Some(first) = block.transactions.first() else {
        return Err(BlockError::NoTransactions);
    };
    if !first.is_coinbase()
        || block
            .transactions
            .iter()
            .skip(1)
            .any(|tx| tx.is_coinbase())
    {
        return Err(BlockError::MisplacedCoinbase);
    }

    // ZIP-203: coinbase expiry is the block height from NU5 activation,
    // and zero before it.
    let expected_expiry = if NetworkUpgrade::Nu5.is_active_at(network, height) {
        height
    } else {
        Height(0)
    };
    if first.expiry_height() != expected_expiry {
        return Err(BlockError::BadCoinbaseExpiry {
            actual: first.expiry_height(),
            height,
        });
    }

    let size = block
        .zcash_serialize_to_vec()
        .expect("serialization into a vec never fails")
        .len();
    if size as u64 > MAX_BLOCK_BYTES {
        return Err(BlockError::OversizedBlock { size });
    }

    let sigops: u64 = block
        .transactions
        .iter()
        .map(|tx| tx.legacy_sigop_count())
        .sum();
    if sigops > MAX_BLOCK_SIGOPS {
        return Err(BlockError::TooManySigops { sigops });
    }

    let merkle_root: merkle::Root = block.transactions.iter().collect();
    if block.header.merkle_root != merkle_root {
        return Err(BlockError::BadMerkleRoot);
    }

    for tx in block.transactions.iter().skip(1) {
        if !tx.is_final(height, lock_time_cutoff) || tx.is_expired(height) {
            return Err(BlockError::NotFinal);
        }
    }

    check_coinbase_payout(first, network, height, fees)?;

    if block.header.time <= median_time_past {
        return Err(BlockError::TimeTooEarly);
    }

    Ok(())
}

/// Check the coinbase pays out no more than the block subsidy plus fees.
///
/// The payout is the sum of the transparent outputs plus the value
/// flowing out into shielded pools (negative value balances).
fn check_coinbase_payout(
    coinbase: &Transaction,
    network: Network,
    height: Height,
    fees: Amount<NonNegative>,
) -> Result<(), BlockError> {
    let transparent: i64 = coinbase
        .outputs()
        .iter()
        .map(|output| output.value.zatoshis())
        .sum();
    let shielded = (-coinbase.sapling_value_balance().zatoshis()).max(0)
        + (-coinbase.orchard_value_balance().zatoshis()).max(0);
    let paid = transparent + shielded;

    let subsidy = subsidy::block_subsidy(height, network)
        .expect("subsidy is defined for template heights");
    let allowed = subsidy.zatoshis() + fees.zatoshis();

    if paid > allowed {
        return Err(BlockError::ExcessiveCoinbasePayout { paid, allowed });
    }

    Ok(())
}
