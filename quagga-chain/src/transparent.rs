//! Transparent-related (Bitcoin-inherited) functionality.

mod address;
mod opcodes;
mod script;
mod serialize;
mod utxo;

pub use address::Address;
pub use script::Script;
pub use serialize::MAX_COINBASE_DATA_LEN;
pub use utxo::{new_outputs, Utxo};

use std::collections::HashMap;

use crate::{
    amount::{Amount, NonNegative},
    block, transaction,
};

/// The maturity threshold for transparent coinbase outputs.
///
/// "A transaction MUST NOT spend a transparent output of a coinbase
/// transaction from a block less than 100 blocks prior to the spend. Note
/// that transparent outputs of coinbase transactions include Founders'
/// Reward outputs and transparent Funding Stream outputs."
/// [7.1](https://zips.z.cash/protocol/nu5.pdf#txnencodingandconsensus)
pub const MIN_TRANSPARENT_COINBASE_MATURITY: u32 = 100;

/// Arbitrary data inserted by miners into a coinbase transaction.
#[derive(Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct CoinbaseData(
    /// Invariant: this vec, together with the coinbase height, must be
    /// less than 100 bytes. We enforce this by only constructing
    /// `CoinbaseData` fields by parsing blocks with 100-byte data fields,
    /// or through [`CoinbaseData::new`], which checks the combined length.
    pub(super) Vec<u8>,
);

impl CoinbaseData {
    /// Create a new `CoinbaseData` containing `data`, if the combined
    /// script with `height` stays within the consensus length limit.
    pub fn new(height: block::Height, data: Vec<u8>) -> Option<CoinbaseData> {
        if serialize::coinbase_height_len(height) + data.len() <= MAX_COINBASE_DATA_LEN {
            Some(CoinbaseData(data))
        } else {
            None
        }
    }
}

impl AsRef<[u8]> for CoinbaseData {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl std::fmt::Debug for CoinbaseData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let escaped = String::from_utf8(
            self.0
                .iter()
                .cloned()
                .flat_map(std::ascii::escape_default)
                .collect(),
        )
        .expect("ascii::escape_default produces utf8");
        f.debug_tuple("CoinbaseData").field(&escaped).finish()
    }
}

/// OutPoint
///
/// A particular transaction output reference.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Hash)]
pub struct OutPoint {
    /// References the transaction that contains the UTXO being spent.
    pub hash: transaction::Hash,

    /// Identifies which UTXO from that transaction is referenced; the
    /// first output is 0, etc.
    pub index: u32,
}

/// A transparent input to a transaction.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Input {
    /// A reference to an output of a previous transaction.
    PrevOut {
        /// The previous output transaction reference.
        outpoint: OutPoint,
        /// The script that authorizes spending `outpoint`.
        unlock_script: Script,
        /// The sequence number for the output.
        sequence: u32,
    },
    /// New coins created by the block reward.
    Coinbase {
        /// The height of this block.
        height: block::Height,
        /// Free data inserted by miners after the block height.
        data: CoinbaseData,
        /// The sequence number for the output.
        sequence: u32,
    },
}

impl Input {
    /// If this is a `PrevOut` input, returns this input's outpoint.
    /// Otherwise, returns `None`.
    pub fn outpoint(&self) -> Option<OutPoint> {
        if let Input::PrevOut { outpoint, .. } = self {
            Some(*outpoint)
        } else {
            None
        }
    }

    /// Get the value spent by this input, by looking up its
    /// [`OutPoint`] in `utxos`.
    ///
    /// This amount is added to the transaction value pool by this input.
    ///
    /// # Panics
    ///
    /// If the provided `Utxo`s don't have this input's `OutPoint`.
    pub fn value(&self, utxos: &HashMap<OutPoint, Utxo>) -> Amount<NonNegative> {
        if let Some(outpoint) = self.outpoint() {
            utxos
                .get(&outpoint)
                .unwrap_or_else(|| {
                    panic!(
                        "provided Utxos (length {:?}) don't have spent {outpoint:?}",
                        utxos.len()
                    )
                })
                .output
                .value
        } else {
            // coinbase inputs don't spend UTXOs
            Amount::zero()
        }
    }

    /// Returns the unlock script for this input, if it is a `PrevOut`.
    pub fn unlock_script(&self) -> Option<&Script> {
        if let Input::PrevOut { unlock_script, .. } = self {
            Some(unlock_script)
        } else {
            None
        }
    }

    /// Returns the number of legacy signature operations in this input's
    /// script.
    ///
    /// For coinbase inputs, the inert data field is scanned the same way
    /// zcashd scans the coinbase scriptSig.
    pub fn legacy_sigop_count(&self) -> u64 {
        match self {
            Input::PrevOut { unlock_script, .. } => unlock_script.sigop_count(false),
            Input::Coinbase { data, .. } => Script::new(data.as_ref()).sigop_count(false),
        }
    }
}

/// A transparent output from a transaction.
///
/// The most fundamental building block of a transaction is a transaction
/// output -- the ZEC you own in your "wallet" is in fact a subset of
/// unspent transaction outputs of the global UTXO set.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Output {
    /// Transaction value.
    pub value: Amount<NonNegative>,

    /// The lock script defines the conditions under which this output can
    /// be spent.
    pub lock_script: Script,
}

impl Output {
    /// Get the value contained in this output.
    pub fn value(&self) -> Amount<NonNegative> {
        self.value
    }
}

