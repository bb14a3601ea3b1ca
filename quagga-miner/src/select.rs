//! Mempool transaction selection for block templates.
//!
//! Unconfirmed transactions in the memory pool often depend on other
//! transactions in the pool. When we select transactions, we select by
//! highest priority or fee rate, so we might consider transactions that
//! depend on transactions that aren't yet in the block. Orphan records
//! track these temporary orphans while selection figures out which
//! transactions to include.

use std::collections::{BinaryHeap, HashMap, HashSet};

use tracing::{debug, info};

use quagga_chain::{
    amount::{Amount, NonNegative},
    block::{Height, MAX_BLOCK_SIGOPS},
    parameters::{ConsensusBranchId, Network},
    transaction::{self, UnminedTx},
    value_balance::ValueBalance,
};

use crate::{
    check,
    coin_view::CoinView,
    config::BlockSizeLimits,
    mempool::MempoolView,
    policy::{self, FeeRate},
    script::ScriptVerifier,
};

/// The bytes reserved for the coinbase transaction at the start of
/// selection.
const COINBASE_SIZE_RESERVE: u64 = 1000;

/// The signature operations reserved for the coinbase transaction at the
/// start of selection.
const COINBASE_SIGOPS_RESERVE: u64 = 100;

/// The transactions selected for a template, with their parallel fee and
/// sigop metadata.
///
/// Index 0 of a template's parallel arrays is reserved for the coinbase;
/// the vectors here only cover the selected mempool transactions.
#[derive(Clone, Debug, Default)]
pub struct SelectedTransactions {
    /// The selected transactions, in strict selection order.
    pub transactions: Vec<UnminedTx>,

    /// The fee paid by each selected transaction.
    pub fees: Vec<Amount<NonNegative>>,

    /// The legacy-plus-P2SH signature operation count of each selected
    /// transaction.
    pub sigops: Vec<u64>,

    /// The sum of `fees`.
    pub total_fees: Amount<NonNegative>,

    /// The cumulative block size, including the coinbase reserve.
    pub total_size: u64,

    /// The cumulative sigop count, including the coinbase reserve.
    pub total_sigops: u64,
}

/// A sort key for the two-phase candidate ordering.
///
/// Both comparators order so that larger is higher. `ByPriority` uses
/// priority with a fee-rate tiebreak; `ByFee` uses fee rate with a
/// priority tiebreak. The active mode is stored in the key so the heap
/// ordering is total; it is identical for every key in one heap.
#[derive(Clone, Debug)]
struct Candidate {
    by_fee: bool,
    priority: f64,
    fee_rate: FeeRate,
    fee_paid: i64,
    tx: UnminedTx,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        if self.by_fee {
            self.fee_rate
                .cmp(&other.fee_rate)
                .then_with(|| self.priority.total_cmp(&other.priority))
        } else {
            self.priority
                .total_cmp(&other.priority)
                .then_with(|| self.fee_rate.cmp(&other.fee_rate))
        }
    }
}

/// A transaction awaiting mempool parents.
struct Orphan {
    tx: UnminedTx,
    depends_on: HashSet<transaction::Hash>,
    priority: f64,
    fee_rate: FeeRate,
    fee_paid: i64,
}

/// Selects transactions from `mempool` under hard capacity and dependency
/// constraints.
///
/// `view` is updated in place as transactions are accepted, so later
/// candidates can spend the outputs of earlier ones; the caller supplies
/// a fresh snapshot per assembly and discards it afterwards.
///
/// `lock_time_cutoff` is the Unix timestamp used for time-locked
/// finality, normally the median-time-past of the chain tip.
///
/// `branch_id` is the consensus branch id at `height`, used by the
/// per-candidate script verification.
///
/// `pool_balances` are the chain value pool totals at the tip; `Some`
/// enables the ZIP-209 turnstile gate.
#[allow(clippy::too_many_arguments)]
pub fn select_transactions(
    network: Network,
    height: Height,
    lock_time_cutoff: i64,
    branch_id: ConsensusBranchId,
    view: &mut CoinView,
    mempool: &MempoolView,
    script_verifier: &dyn ScriptVerifier,
    limits: BlockSizeLimits,
    pool_balances: Option<ValueBalance<NonNegative>>,
    print_priority: bool,
) -> SelectedTransactions {
    let mut orphans: HashMap<transaction::Hash, Orphan> = HashMap::new();
    let mut dependers: HashMap<transaction::Hash, Vec<transaction::Hash>> = HashMap::new();

    // Phase one: scan the mempool, computing priority and fee metadata,
    // parking transactions whose parents are still unconfirmed.
    let mut initial: Vec<Candidate> = Vec::with_capacity(mempool.len());
    let by_fee_initially = limits.priority_size == 0;

    'scan: for entry in mempool.iter() {
        let tx = &entry.transaction;
        let txid = entry.id;

        if tx.is_coinbase()
            || !tx.is_final(height, lock_time_cutoff)
            || tx.is_expired(height)
        {
            continue;
        }

        let mut priority = 0f64;
        let mut total_in: i64 = 0;
        let mut missing_parents: HashSet<transaction::Hash> = HashSet::new();

        for input in tx.inputs() {
            let Some(outpoint) = input.outpoint() else {
                continue;
            };

            if let Some(coin) = view.get_coin(&outpoint) {
                let value_in = coin.output.value.zatoshis();
                total_in += value_in;

                let confirmations = height - coin.height;
                priority += (value_in as f64) * (confirmations as f64);
                continue;
            }

            // All transactions in the memory pool should connect to either
            // transactions in the chain or other transactions in the pool.
            let Some(parent_value) = mempool.output_value(&outpoint) else {
                info!(%txid, "dropping mempool transaction with missing inputs");
                continue 'scan;
            };

            // Has to wait for its in-pool dependencies.
            missing_parents.insert(outpoint.hash);
            total_in += parent_value.zatoshis();
        }

        total_in += entry.transaction.shielded_value_in().zatoshis();

        // Priority is sum(value_in * age) / modified_size.
        let tx_size = entry.size;
        priority = compute_priority(tx, priority, tx_size);

        mempool.apply_deltas(&txid, &mut priority, &mut total_in);

        let fee_paid = total_in - tx.value_out().zatoshis();
        let fee_rate = FeeRate::new(fee_paid, tx_size);

        if missing_parents.is_empty() {
            initial.push(Candidate {
                by_fee: by_fee_initially,
                priority,
                fee_rate,
                fee_paid,
                tx: entry.clone(),
            });
        } else {
            for parent in &missing_parents {
                dependers.entry(*parent).or_default().push(txid);
            }
            orphans.insert(
                txid,
                Orphan {
                    tx: entry.clone(),
                    depends_on: missing_parents,
                    priority,
                    fee_rate,
                    fee_paid,
                },
            );
        }
    }

    debug!(
        candidates = initial.len(),
        orphans = orphans.len(),
        "evaluating mempool transactions for inclusion in block",
    );

    // Phase two: pop candidates in priority order, applying the capacity
    // gates, switching to fee ordering once the priority budget is spent.
    let mut queue: BinaryHeap<Candidate> = initial.into();
    let mut by_fee = by_fee_initially;

    let mut selected = SelectedTransactions {
        total_size: COINBASE_SIZE_RESERVE,
        total_sigops: COINBASE_SIGOPS_RESERVE,
        ..Default::default()
    };

    // We want to track the value pools, but only adhere to the turnstile
    // (as a miner) when the tip actually carries initialized totals.
    let mut pool_balances = pool_balances.filter(|_| network.zip209_enabled());

    while let Some(candidate) = queue.pop() {
        let Candidate {
            priority,
            fee_rate,
            fee_paid,
            ref tx,
            ..
        } = candidate;
        let txid = tx.id;
        let tx_size = tx.size as u64;

        // Size limits.
        if selected.total_size + tx_size >= limits.max_size {
            debug!(%txid, max_size = limits.max_size, "skipping tx: exceeded maximum block size");
            continue;
        }

        // Legacy limits on sigops.
        let legacy_sigops = tx.transaction.legacy_sigop_count();
        if selected.total_sigops + legacy_sigops >= MAX_BLOCK_SIGOPS {
            debug!(%txid, "skipping tx: exceeds legacy max sigops");
            continue;
        }

        // Skip free transactions if we're past the minimum block size.
        let (priority_delta, fee_delta) = mempool.deltas(&txid);
        if by_fee
            && priority_delta <= 0.0
            && fee_delta <= Amount::<NonNegative>::zero()
            && fee_rate < FeeRate::from_zats_per_kb(policy::MIN_RELAY_TX_FEE)
            && fee_paid < policy::DEFAULT_FEE
            && selected.total_size + tx_size >= limits.min_size
        {
            debug!(
                %txid, fee_paid, %fee_rate,
                "skipping free tx: already have minimum block size",
            );
            continue;
        }

        // Prioritise by fee once past the priority size or once we run
        // out of high-priority transactions. The switch is one-way per
        // assembly: the heap is rebuilt under the fee comparator, so the
        // next pop returns the fee maximum of the remaining items. The
        // current candidate already passed the gates above and keeps
        // going through the rest of them.
        if !by_fee
            && (selected.total_size + tx_size >= limits.priority_size
                || !policy::allow_free(priority))
        {
            by_fee = true;
            queue = rebuild_by_fee(queue);
        }

        // A prior accepted transaction may have spent this candidate's
        // inputs in the meantime.
        if !view.has_all_inputs(&tx.transaction) {
            debug!(%txid, "not including tx: missing inputs");
            continue;
        }

        let value_in = view
            .value_in(&tx.transaction)
            .expect("has_all_inputs checked above")
            .zatoshis()
            + tx.transaction.shielded_value_in().zatoshis();
        let tx_fee = value_in - tx.transaction.value_out().zatoshis();

        // Add P2SH sigops computed against the current view.
        let p2sh_sigops = p2sh_sigop_count(&tx.transaction, view);
        let tx_sigops = legacy_sigops + p2sh_sigops;
        if selected.total_sigops + tx_sigops >= MAX_BLOCK_SIGOPS {
            debug!(%txid, "skipping tx: exceeds P2SH max sigops");
            continue;
        }

        // Contextual input checks: we don't apply mempool standardness
        // policy here, but the block we create must only contain
        // transactions that are valid in new blocks, so scripts are
        // verified with the mandatory flags and the current branch id.
        if let Err(error) = check::contextual_check_inputs(
            &tx.transaction,
            view,
            height,
            branch_id,
            script_verifier,
        ) {
            debug!(%txid, %error, "skipping tx: failed contextual inputs check");
            continue;
        }
        let tx_fee: Amount<NonNegative> = match tx_fee.try_into() {
            Ok(tx_fee) => tx_fee,
            Err(_) => {
                debug!(%txid, tx_fee, "skipping tx: negative fee");
                continue;
            }
        };

        // Does this transaction lead to a turnstile violation?
        if let Some(balances) = pool_balances {
            match check::pool_balances_after(balances, &tx.transaction) {
                Ok(updated) => pool_balances = Some(updated),
                Err(pool) => {
                    info!(%txid, %pool, "skipping tx: appears to violate turnstile");
                    continue;
                }
            }
        }

        // Accepted.
        view.apply(&tx.transaction, height);

        selected.total_size += tx_size;
        selected.total_sigops += tx_sigops;
        selected.total_fees =
            (selected.total_fees + tx_fee).expect("block fees stay below the money supply");
        selected.fees.push(tx_fee);
        selected.sigops.push(tx_sigops);
        selected.transactions.push(tx.clone());

        if print_priority {
            info!(%txid, priority, %fee_rate, "selected tx");
        }

        // Promote any orphans whose last missing parent was just added.
        if let Some(children) = dependers.remove(&txid) {
            for child in children {
                let Some(orphan) = orphans.get_mut(&child) else {
                    continue;
                };
                orphan.depends_on.remove(&txid);
                if orphan.depends_on.is_empty() {
                    let orphan = orphans.remove(&child).expect("checked above");
                    queue.push(Candidate {
                        by_fee,
                        priority: orphan.priority,
                        fee_rate: orphan.fee_rate,
                        fee_paid: orphan.fee_paid,
                        tx: orphan.tx,
                    });
                }
            }
        }
    }

    debug!(
        total_tx = selected.transactions.len(),
        total_size = selected.total_size,
        "selection finished; size includes the coinbase reserve",
    );

    selected
}

/// Rebuild the queue under the fee comparator.
fn rebuild_by_fee(queue: BinaryHeap<Candidate>) -> BinaryHeap<Candidate> {
    queue
        .into_iter()
        .map(|mut candidate| {
            candidate.by_fee = true;
            candidate
        })
        .collect()
}

/// Computed-priority rule: divide the accumulated input age by the
/// modified transaction size.
///
/// `CTransaction::ComputePriority` in zcashd: the modified size excludes
/// the bytes an attacker must supply anyway to spend each input, so
/// padding inputs cannot raise priority.
fn compute_priority(tx: &transaction::Transaction, input_age: f64, tx_size: usize) -> f64 {
    let mut modified_size = tx_size as i64;
    for input in tx.inputs() {
        let script_len = input
            .unlock_script()
            .map(|script| script.as_raw_bytes().len() as i64)
            .unwrap_or(0);
        let offset = 41 + script_len.min(110);
        if modified_size > offset {
            modified_size -= offset;
        }
    }

    if modified_size <= 0 {
        return 0.0;
    }

    input_age / (modified_size as f64)
}

/// Count the P2SH signature operations of `tx` against the current view.
///
/// `GetP2SHSigOpCount` in zcashd.
fn p2sh_sigop_count(tx: &transaction::Transaction, view: &CoinView) -> u64 {
    let mut sigops = 0;
    for input in tx.inputs() {
        let Some(prev_output) = view.output_for(input) else {
            continue;
        };
        if let Some(unlock_script) = input.unlock_script() {
            sigops += prev_output.lock_script.p2sh_sigop_count(unlock_script);
        }
    }
    sigops
}
