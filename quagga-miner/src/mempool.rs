//! A read-only view of the mempool, as consumed by template assembly.
//!
//! The mempool implementation itself lives in the node; the assembler
//! only needs candidate iteration, parent lookups, and the
//! administrator-applied priority and fee deltas.

use std::collections::HashMap;

use quagga_chain::{
    amount::{Amount, NonNegative},
    transaction::{self, Transaction, UnminedTx},
    transparent::OutPoint,
};

/// A snapshot of the mempool contents, with per-transaction deltas.
#[derive(Clone, Debug, Default)]
pub struct MempoolView {
    /// The candidate transactions, in insertion order.
    transactions: Vec<UnminedTx>,

    /// An index from txid to position in `transactions`.
    by_id: HashMap<transaction::Hash, usize>,

    /// Administrator-applied priority and fee adjustments, keyed by txid.
    ///
    /// `prioritisetransaction` state in zcashd.
    deltas: HashMap<transaction::Hash, (f64, Amount<NonNegative>)>,

    /// A counter incremented on every insertion or removal.
    transactions_updated: u64,
}

impl MempoolView {
    /// Creates an empty mempool view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a transaction into the view.
    ///
    /// Returns `false` if the transaction was already present.
    pub fn insert(&mut self, tx: impl Into<UnminedTx>) -> bool {
        let tx = tx.into();
        if self.by_id.contains_key(&tx.id) {
            return false;
        }

        self.by_id.insert(tx.id, self.transactions.len());
        self.transactions.push(tx);
        self.transactions_updated += 1;
        true
    }

    /// Applies an administrator priority and fee adjustment to a
    /// transaction, compounding with any existing adjustment.
    pub fn prioritise_transaction(
        &mut self,
        txid: transaction::Hash,
        priority_delta: f64,
        fee_delta: Amount<NonNegative>,
    ) {
        let entry = self
            .deltas
            .entry(txid)
            .or_insert((0.0, Amount::zero()));
        entry.0 += priority_delta;
        entry.1 = (entry.1 + fee_delta).expect("fee deltas stay within the money supply");
    }

    /// Adds this transaction's deltas to the given priority and total
    /// input value.
    ///
    /// `ApplyDeltas()` in zcashd.
    pub fn apply_deltas(&self, txid: &transaction::Hash, priority: &mut f64, fee: &mut i64) {
        if let Some((priority_delta, fee_delta)) = self.deltas.get(txid) {
            *priority += priority_delta;
            *fee += fee_delta.zatoshis();
        }
    }

    /// Returns this transaction's raw deltas.
    pub fn deltas(&self, txid: &transaction::Hash) -> (f64, Amount<NonNegative>) {
        self.deltas
            .get(txid)
            .copied()
            .unwrap_or((0.0, Amount::zero()))
    }

    /// Returns `true` if the view contains `txid`.
    pub fn contains(&self, txid: &transaction::Hash) -> bool {
        self.by_id.contains_key(txid)
    }

    /// Returns the transaction with `txid`, if present.
    pub fn get(&self, txid: &transaction::Hash) -> Option<&UnminedTx> {
        self.by_id.get(txid).map(|&index| &self.transactions[index])
    }

    /// Returns the value of an output created by a transaction in this
    /// view, for computing the input value of in-mempool children.
    pub fn output_value(&self, outpoint: &OutPoint) -> Option<Amount<NonNegative>> {
        self.get(&outpoint.hash)?
            .transaction
            .outputs()
            .get(outpoint.index as usize)
            .map(|output| output.value)
    }

    /// Iterates over the candidate transactions, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &UnminedTx> {
        self.transactions.iter()
    }

    /// The number of transactions in the view.
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Returns `true` if the view holds no transactions.
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// A counter incremented every time the contents change.
    ///
    /// `GetTransactionsUpdated()` in zcashd: the mining loop compares
    /// counters to decide when a template has gone stale.
    pub fn transactions_updated(&self) -> u64 {
        self.transactions_updated
    }
}

impl FromIterator<Transaction> for MempoolView {
    fn from_iter<I: IntoIterator<Item = Transaction>>(transactions: I) -> Self {
        let mut mempool = MempoolView::new();
        for transaction in transactions {
            mempool.insert(transaction);
        }
        mempool
    }
}
