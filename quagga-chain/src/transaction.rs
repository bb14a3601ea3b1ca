//! Transactions and transaction-related structures.

use std::iter;

mod auth_digest;
mod hash;
mod joinsplit;
mod lock_time;
mod serialize;
mod sighash;
mod txid;
mod unmined;

#[cfg(test)]
mod tests;

pub use auth_digest::AuthDigest;
pub use hash::Hash;
pub use joinsplit::{JoinSplit, JoinSplitData};
pub use lock_time::LockTime;
pub use sighash::{HashType, SigHash};
pub use unmined::UnminedTx;

use crate::{
    amount::{Amount, NegativeAllowed, NonNegative},
    block, orchard,
    parameters::NetworkUpgrade,
    sapling,
    serialization::ZcashSerialize,
    transparent,
};

/// A Zcash-style transaction.
///
/// A transaction is an encoded data structure that facilitates the
/// transfer of value between two public key addresses on the ecosystem.
/// Everything is designed to ensure that transactions can be created,
/// propagated on the network, validated, and finally added to the global
/// ledger of transactions (the blockchain).
///
/// The chain carries two transaction formats. They are represented
/// internally by different enum variants: the Sapling-era v4 format, and
/// the NU5-era v5 format, which adds Orchard. Earlier formats predate the
/// chain's checkpoint and are never parsed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::large_enum_variant)]
pub enum Transaction {
    /// A Sapling transaction (`version = 4`).
    V4 {
        /// The transparent inputs to the transaction.
        inputs: Vec<transparent::Input>,
        /// The transparent outputs from the transaction.
        outputs: Vec<transparent::Output>,
        /// The earliest time or block height that this transaction can be
        /// added to the chain.
        lock_time: LockTime,
        /// The latest block height that this transaction can be added to
        /// the chain.
        expiry_height: block::Height,
        /// The JoinSplit data for this transaction, if any.
        joinsplit_data: Option<JoinSplitData>,
        /// The Sapling shielded data for this transaction, if any.
        sapling_shielded_data: Option<sapling::ShieldedData>,
    },
    /// A `version = 5` transaction, which supports Sapling and Orchard.
    V5 {
        /// The Network Upgrade for this transaction.
        ///
        /// Derived from the ConsensusBranchId field.
        network_upgrade: NetworkUpgrade,
        /// The earliest time or block height that this transaction can be
        /// added to the chain.
        lock_time: LockTime,
        /// The latest block height that this transaction can be added to
        /// the chain.
        expiry_height: block::Height,
        /// The transparent inputs to the transaction.
        inputs: Vec<transparent::Input>,
        /// The transparent outputs from the transaction.
        outputs: Vec<transparent::Output>,
        /// The Sapling shielded data for this transaction, if any.
        sapling_shielded_data: Option<sapling::ShieldedData>,
        /// The Orchard data for this transaction, if any.
        orchard_shielded_data: Option<orchard::ShieldedData>,
    },
}

impl Transaction {
    // hashes

    /// Compute the hash (mined transaction ID) of this transaction.
    pub fn hash(&self) -> Hash {
        Hash::from(self)
    }

    /// Compute the authorizing data commitment of this transaction.
    pub fn auth_digest(&self) -> AuthDigest {
        AuthDigest::from(self)
    }

    /// Calculate the sighash for the current transaction.
    ///
    /// The `input` argument indicates the transparent input for which the
    /// sighash is produced: its index within the transaction, and the
    /// output it spends. Shielded signatures (like the coinbase binding
    /// signature) pass `None`.
    ///
    /// # Panics
    ///
    /// - if passed a `network_upgrade` from before sighashes were defined
    /// - if the input index is out of bounds for `self.inputs()`
    pub fn sighash(
        &self,
        network_upgrade: NetworkUpgrade,
        hash_type: sighash::HashType,
        input: Option<(u32, transparent::Output)>,
    ) -> SigHash {
        sighash::SigHasher::new(self, hash_type, network_upgrade, input).sighash()
    }

    // header

    /// Return the version of this transaction.
    pub fn version(&self) -> u32 {
        match self {
            Transaction::V4 { .. } => 4,
            Transaction::V5 { .. } => 5,
        }
    }

    /// Get this transaction's lock time.
    pub fn lock_time(&self) -> LockTime {
        match self {
            Transaction::V4 { lock_time, .. } => *lock_time,
            Transaction::V5 { lock_time, .. } => *lock_time,
        }
    }

    /// Get this transaction's expiry height.
    ///
    /// A zero expiry height means the transaction never expires.
    pub fn expiry_height(&self) -> block::Height {
        match self {
            Transaction::V4 { expiry_height, .. } => *expiry_height,
            Transaction::V5 { expiry_height, .. } => *expiry_height,
        }
    }

    /// Get this transaction's network upgrade field, if any.
    ///
    /// This field is serialized as `nConsensusBranchId` in the v5 format.
    pub fn network_upgrade(&self) -> Option<NetworkUpgrade> {
        match self {
            Transaction::V4 { .. } => None,
            Transaction::V5 {
                network_upgrade, ..
            } => Some(*network_upgrade),
        }
    }

    // transparent

    /// Access the transparent inputs of this transaction, regardless of
    /// version.
    pub fn inputs(&self) -> &[transparent::Input] {
        match self {
            Transaction::V4 { ref inputs, .. } => inputs,
            Transaction::V5 { ref inputs, .. } => inputs,
        }
    }

    /// Access the transparent outputs of this transaction, regardless of
    /// version.
    pub fn outputs(&self) -> &[transparent::Output] {
        match self {
            Transaction::V4 { ref outputs, .. } => outputs,
            Transaction::V5 { ref outputs, .. } => outputs,
        }
    }

    /// Returns `true` if this transaction is a coinbase transaction.
    pub fn is_coinbase(&self) -> bool {
        self.inputs().len() == 1
            && matches!(
                self.inputs().first(),
                Some(transparent::Input::Coinbase { .. })
            )
    }

    /// Returns `true` if this transaction has expired at `height`.
    ///
    /// Transactions with a zero expiry height, and coinbase transactions,
    /// never expire.
    pub fn is_expired(&self, height: block::Height) -> bool {
        let expiry_height = self.expiry_height();
        if expiry_height == block::Height(0) || self.is_coinbase() {
            return false;
        }

        height > expiry_height
    }

    /// Returns `true` if this transaction is final at `height`, given the
    /// lock-time cutoff `block_time` (a Unix timestamp, usually the
    /// median-time-past of the previous block).
    ///
    /// `IsFinalTx()` in zcashd.
    pub fn is_final(&self, height: block::Height, block_time: i64) -> bool {
        if self.lock_time() == LockTime::unlocked() {
            return true;
        }

        let satisfied = match self.lock_time() {
            LockTime::Height(lock_height) => lock_height < height,
            LockTime::Time(lock_time) => lock_time.timestamp() < block_time,
        };

        // A lock time in the future can still be final if every input opts
        // out with a maximum sequence number.
        satisfied
            || self
                .inputs()
                .iter()
                .all(|input| input_sequence(input) == u32::MAX)
    }

    // value accounting

    /// Returns the total transparent value produced by this transaction's
    /// outputs, plus the value leaving the transparent pool into shielded
    /// pools: negative Sapling and Orchard balances, and joinsplit
    /// `vpub_old`.
    ///
    /// `GetValueOut()` in zcashd.
    pub fn value_out(&self) -> Amount<NonNegative> {
        let transparent: Amount<NonNegative> = self
            .outputs()
            .iter()
            .map(transparent::Output::value)
            .sum::<Result<_, _>>()
            .expect("transaction outputs are valid amounts");

        let mut total = Ok(transparent);

        let sapling = self.sapling_value_balance().zatoshis();
        if sapling < 0 {
            total = total
                + Amount::<NonNegative>::try_from(-sapling).expect("negated negative is positive");
        }

        let orchard = self.orchard_value_balance().zatoshis();
        if orchard < 0 {
            total = total
                + Amount::<NonNegative>::try_from(-orchard).expect("negated negative is positive");
        }

        total = total + self.joinsplit_vpub_old();

        total.expect("transaction value out is a valid amount")
    }

    /// Returns the value entering the transparent pool from shielded
    /// pools: positive Sapling and Orchard balances, and joinsplit
    /// `vpub_new`.
    ///
    /// `GetShieldedValueIn()` in zcashd.
    pub fn shielded_value_in(&self) -> Amount<NonNegative> {
        let mut total = Ok(self.joinsplit_vpub_new());

        let sapling = self.sapling_value_balance().zatoshis();
        if sapling > 0 {
            total = total + Amount::<NonNegative>::try_from(sapling).expect("positive");
        }

        let orchard = self.orchard_value_balance().zatoshis();
        if orchard > 0 {
            total = total + Amount::<NonNegative>::try_from(orchard).expect("positive");
        }

        total.expect("transaction shielded value in is a valid amount")
    }

    // sapling

    /// Returns the Sapling value balance of this transaction, or zero if
    /// it has no Sapling shielded data.
    ///
    /// A positive value balance decreases the Sapling pool.
    pub fn sapling_value_balance(&self) -> Amount<NegativeAllowed> {
        self.sapling_shielded_data()
            .map(|shielded_data| shielded_data.value_balance)
            .unwrap_or_else(Amount::zero)
    }

    /// Access the Sapling shielded data of this transaction, if any.
    pub fn sapling_shielded_data(&self) -> Option<&sapling::ShieldedData> {
        match self {
            Transaction::V4 {
                sapling_shielded_data,
                ..
            } => sapling_shielded_data.as_ref(),
            Transaction::V5 {
                sapling_shielded_data,
                ..
            } => sapling_shielded_data.as_ref(),
        }
    }

    /// Iterate over the Sapling note commitments of this transaction's
    /// outputs, in output order.
    pub fn sapling_note_commitments(&self) -> Box<dyn Iterator<Item = [u8; 32]> + '_> {
        match self.sapling_shielded_data() {
            Some(shielded_data) => {
                Box::new(shielded_data.note_commitments().map(|cm_u| cm_u.0))
            }
            None => Box::new(iter::empty()),
        }
    }

    // orchard

    /// Access the Orchard shielded data of this transaction, if any.
    pub fn orchard_shielded_data(&self) -> Option<&orchard::ShieldedData> {
        match self {
            Transaction::V4 { .. } => None,
            Transaction::V5 {
                orchard_shielded_data,
                ..
            } => orchard_shielded_data.as_ref(),
        }
    }

    /// Returns the Orchard value balance of this transaction, or zero if
    /// it has no Orchard shielded data.
    ///
    /// A positive value balance decreases the Orchard pool.
    pub fn orchard_value_balance(&self) -> Amount<NegativeAllowed> {
        self.orchard_shielded_data()
            .map(|shielded_data| shielded_data.value_balance)
            .unwrap_or_else(Amount::zero)
    }

    // sprout

    /// Access the JoinSplit data of this transaction, if any.
    pub fn joinsplit_data(&self) -> Option<&JoinSplitData> {
        match self {
            Transaction::V4 { joinsplit_data, .. } => joinsplit_data.as_ref(),
            Transaction::V5 { .. } => None,
        }
    }

    /// Returns the total `vpub_old` of this transaction's joinsplits: the
    /// value entering the Sprout pool.
    pub fn joinsplit_vpub_old(&self) -> Amount<NonNegative> {
        self.joinsplit_data()
            .map(JoinSplitData::vpub_old_total)
            .unwrap_or_else(Amount::zero)
    }

    /// Returns the total `vpub_new` of this transaction's joinsplits: the
    /// value leaving the Sprout pool.
    pub fn joinsplit_vpub_new(&self) -> Amount<NonNegative> {
        self.joinsplit_data()
            .map(JoinSplitData::vpub_new_total)
            .unwrap_or_else(Amount::zero)
    }

    // sizes and sigops

    /// Returns the serialized size of this transaction, in bytes.
    pub fn serialized_size(&self) -> usize {
        self.zcash_serialized_size()
    }

    /// Returns the number of legacy signature operations in this
    /// transaction's input and output scripts.
    ///
    /// `GetLegacySigOpCount()` in zcashd.
    pub fn legacy_sigop_count(&self) -> u64 {
        let input_sigops: u64 = self
            .inputs()
            .iter()
            .map(transparent::Input::legacy_sigop_count)
            .sum();
        let output_sigops: u64 = self
            .outputs()
            .iter()
            .map(|output| output.lock_script.sigop_count(false))
            .sum();

        input_sigops + output_sigops
    }
}

fn input_sequence(input: &transparent::Input) -> u32 {
    match input {
        transparent::Input::PrevOut { sequence, .. } => *sequence,
        transparent::Input::Coinbase { sequence, .. } => *sequence,
    }
}
