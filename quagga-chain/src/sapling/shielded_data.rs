//! Sapling shielded data for v4 and v5 transactions.

use crate::{
    amount::{Amount, NegativeAllowed},
    primitives::redjubjub,
};

use super::{tree, Output, Spend};

/// A bundle of Sapling spends and outputs with their value balance and
/// binding signature.
///
/// The v4 transaction format stores an anchor in every spend; the v5
/// format stores one `shared_anchor` for the whole bundle. Spends keep
/// their `per_spend_anchor` field populated in both cases, so consumers
/// never need to know which format the transaction arrived in.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ShieldedData {
    /// The net value of Sapling spends minus outputs, in zatoshis.
    ///
    /// A positive value balance moves funds from the Sapling pool to the
    /// transparent pool; only the coinbase transaction may carry a
    /// negative value balance with no spends.
    pub value_balance: Amount<NegativeAllowed>,

    /// The shared anchor for all spends, used by the v5 format.
    ///
    /// `None` when the bundle has no spends.
    pub shared_anchor: Option<tree::Root>,

    /// The spends of this bundle.
    pub spends: Vec<Spend>,

    /// The outputs of this bundle.
    pub outputs: Vec<Output>,

    /// A signature over the whole transaction that proves the declared
    /// `value_balance` is consistent with the spends and outputs.
    pub binding_sig: redjubjub::Signature<redjubjub::Binding>,
}

impl ShieldedData {
    /// Returns `true` if this bundle carries no spends and no outputs.
    ///
    /// Such bundles are not serializable: transactions omit the bundle
    /// entirely instead.
    pub fn is_empty(&self) -> bool {
        self.spends.is_empty() && self.outputs.is_empty()
    }

    /// Iterate over the note commitments in this bundle's outputs, in the
    /// order they appear in the transaction.
    pub fn note_commitments(&self) -> impl Iterator<Item = &crate::primitives::Bytes32> {
        self.outputs.iter().map(|output| &output.cm_u)
    }
}
