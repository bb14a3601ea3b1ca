//! A read-only snapshot of the UTXO set, with template-local updates.
//!
//! During template assembly the view is updated in place as transactions
//! are accepted, so later candidates can spend the outputs of earlier
//! ones. The mutation never escapes the assembler: each assembly starts
//! from a fresh snapshot.

use std::collections::{BTreeMap, HashMap};

use quagga_chain::{
    amount::{Amount, NonNegative},
    block::{ChainHistoryMmrRootHash, Height},
    sapling,
    transaction::{self, Transaction},
    transparent::{self, OutPoint, Utxo},
};

/// A snapshot of spendable transparent outputs and treestate anchors.
///
/// Snapshot semantics: once opened, the view returns the same answer for
/// the same key regardless of concurrent chain updates.
#[derive(Clone, Debug, Default)]
pub struct CoinView {
    /// The spendable outputs, grouped by creating transaction.
    utxos: HashMap<transaction::Hash, BTreeMap<u32, Utxo>>,

    /// The Sapling note commitment tree root at the tip.
    sapling_anchor: sapling::tree::Root,

    /// The chain history roots at the tip, by consensus branch id.
    history_roots: HashMap<u32, ChainHistoryMmrRootHash>,
}

impl CoinView {
    /// Opens a view over a snapshot of the UTXO set.
    pub fn new(
        utxos: HashMap<OutPoint, Utxo>,
        sapling_anchor: sapling::tree::Root,
        history_roots: HashMap<u32, ChainHistoryMmrRootHash>,
    ) -> Self {
        let mut grouped: HashMap<transaction::Hash, BTreeMap<u32, Utxo>> = HashMap::new();
        for (outpoint, utxo) in utxos {
            grouped
                .entry(outpoint.hash)
                .or_default()
                .insert(outpoint.index, utxo);
        }

        CoinView {
            utxos: grouped,
            sapling_anchor,
            history_roots,
        }
    }

    /// Returns `true` if any output of `txid` is still spendable in this
    /// view.
    pub fn has_coin(&self, txid: &transaction::Hash) -> bool {
        self.utxos
            .get(txid)
            .map(|outputs| !outputs.is_empty())
            .unwrap_or(false)
    }

    /// Returns the unspent output referenced by `outpoint`, if any.
    pub fn get_coin(&self, outpoint: &OutPoint) -> Option<&Utxo> {
        self.utxos
            .get(&outpoint.hash)
            .and_then(|outputs| outputs.get(&outpoint.index))
    }

    /// Returns `true` if every transparent input of `tx` is spendable in
    /// this view.
    pub fn has_all_inputs(&self, tx: &Transaction) -> bool {
        tx.inputs().iter().all(|input| match input.outpoint() {
            Some(outpoint) => self.get_coin(&outpoint).is_some(),
            // coinbase inputs don't spend coins
            None => true,
        })
    }

    /// Returns the output spent by `input`, if it is spendable in this
    /// view.
    pub fn output_for(&self, input: &transparent::Input) -> Option<&transparent::Output> {
        input
            .outpoint()
            .and_then(|outpoint| self.get_coin(&outpoint))
            .map(|utxo| &utxo.output)
    }

    /// Returns the sum of the transparent inputs of `tx`, or `None` if
    /// any input is not spendable in this view.
    pub fn value_in(&self, tx: &Transaction) -> Option<Amount<NonNegative>> {
        let mut total: Result<Amount<NonNegative>, _> = Ok(Amount::zero());
        for input in tx.inputs() {
            if let Some(outpoint) = input.outpoint() {
                total = total + self.get_coin(&outpoint)?.output.value;
            }
        }
        total.ok()
    }

    /// Returns the Sapling treestate anchor of this view.
    pub fn sapling_anchor(&self) -> sapling::tree::Root {
        self.sapling_anchor
    }

    /// Returns the chain history root at the given consensus branch id,
    /// if the chain has one.
    pub fn history_root(&self, branch_id: u32) -> Option<ChainHistoryMmrRootHash> {
        self.history_roots.get(&branch_id).copied()
    }

    /// Updates the view in place for the duration of template assembly:
    /// marks the outputs spent by `tx`, and records its new outputs at
    /// `height`.
    ///
    /// `UpdateCoins()` in zcashd. This mutation never escapes the
    /// assembler: a view is opened per assembly and dropped with it.
    pub fn apply(&mut self, tx: &Transaction, height: Height) {
        for input in tx.inputs() {
            if let Some(outpoint) = input.outpoint() {
                if let Some(outputs) = self.utxos.get_mut(&outpoint.hash) {
                    outputs.remove(&outpoint.index);
                    if outputs.is_empty() {
                        self.utxos.remove(&outpoint.hash);
                    }
                }
            }
        }

        let txid = tx.hash();
        let from_coinbase = tx.is_coinbase();
        for (index, output) in tx.outputs().iter().enumerate() {
            self.utxos.entry(txid).or_default().insert(
                index as u32,
                Utxo::new(output.clone(), height, from_coinbase),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use quagga_chain::{block::Height, transaction::LockTime, transparent::Script};

    fn utxo(value: i64, height: u32) -> Utxo {
        Utxo::new(
            transparent::Output {
                value: value.try_into().unwrap(),
                lock_script: Script::pay_to_public_key_hash(&[1; 20]),
            },
            Height(height),
            false,
        )
    }

    fn spend(hash: transaction::Hash, index: u32) -> transparent::Input {
        transparent::Input::PrevOut {
            outpoint: OutPoint { hash, index },
            unlock_script: Script::new(&[]),
            sequence: 0,
        }
    }

    #[test]
    fn apply_spends_and_creates() {
        let parent_txid = transaction::Hash([1; 32]);
        let mut view = CoinView::new(
            [(
                OutPoint {
                    hash: parent_txid,
                    index: 0,
                },
                utxo(100_000, 10),
            )]
            .into(),
            sapling::tree::Root::default(),
            HashMap::new(),
        );

        let tx = Transaction::V4 {
            inputs: vec![spend(parent_txid, 0)],
            outputs: vec![transparent::Output {
                value: 90_000.try_into().unwrap(),
                lock_script: Script::pay_to_public_key_hash(&[2; 20]),
            }],
            lock_time: LockTime::unlocked(),
            expiry_height: Height(0),
            joinsplit_data: None,
            sapling_shielded_data: None,
        };

        assert!(view.has_coin(&parent_txid));
        assert!(view.has_all_inputs(&tx));
        assert_eq!(view.value_in(&tx).unwrap(), 100_000);

        view.apply(&tx, Height(20));

        // the parent output is spent, the new output is spendable
        assert!(!view.has_coin(&parent_txid));
        assert!(view.has_coin(&tx.hash()));
        let new_coin = view
            .get_coin(&OutPoint {
                hash: tx.hash(),
                index: 0,
            })
            .unwrap();
        assert_eq!(new_coin.height, Height(20));

        // a second spend of the same output no longer has its inputs
        assert!(!view.has_all_inputs(&tx));
        assert_eq!(view.value_in(&tx), None);
    }
}
