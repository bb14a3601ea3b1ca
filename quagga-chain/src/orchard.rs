//! Orchard-related functionality.

use std::{fmt, io};

use bitflags::bitflags;

use crate::{
    amount::{Amount, NegativeAllowed},
    primitives::{redpallas, Bytes32, Halo2Proof},
    serialization::{
        serde_helpers::BigArray, AtLeastOne, ReadZcashExt, SerializationError,
        TrustedPreallocate, ZcashDeserialize, ZcashSerialize,
    },
};

/// A raw Orchard shielded payment address, as it appears inside a unified
/// address: an 11-byte diversifier followed by a 32-byte Pallas point
/// encoding.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Address(#[serde(with = "BigArray")] pub [u8; 43]);

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("orchard::Address")
            .field(&hex::encode(self.0))
            .finish()
    }
}

impl From<[u8; 43]> for Address {
    fn from(bytes: [u8; 43]) -> Self {
        Self(bytes)
    }
}

bitflags! {
    /// The Orchard bundle flags, as described in [ZIP-225].
    ///
    /// [ZIP-225]: https://zips.z.cash/zip-0225
    #[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
    pub struct Flags: u8 {
        /// Enable spending non-zero valued Orchard notes.
        ///
        /// MUST NOT be set for coinbase transactions.
        const ENABLE_SPENDS = 0b0000_0001;
        /// Enable creating new non-zero valued Orchard notes.
        const ENABLE_OUTPUTS = 0b0000_0010;
    }
}

/// The encrypted note ciphertext of an Orchard action.
#[derive(Deserialize, Serialize)]
pub struct EncryptedNote(#[serde(with = "BigArray")] pub [u8; 580]);

impl fmt::Debug for EncryptedNote {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("orchard::EncryptedNote")
            .field(&hex::encode(&self.0[..]))
            .finish()
    }
}

impl Copy for EncryptedNote {}

impl Clone for EncryptedNote {
    fn clone(&self) -> Self {
        *self
    }
}

impl PartialEq for EncryptedNote {
    fn eq(&self, other: &Self) -> bool {
        self.0[..] == other.0[..]
    }
}

impl Eq for EncryptedNote {}

/// The out ciphertext of an Orchard action.
#[derive(Deserialize, Serialize)]
pub struct WrappedNoteKey(#[serde(with = "BigArray")] pub [u8; 80]);

impl fmt::Debug for WrappedNoteKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("orchard::WrappedNoteKey")
            .field(&hex::encode(&self.0[..]))
            .finish()
    }
}

impl Copy for WrappedNoteKey {}

impl Clone for WrappedNoteKey {
    fn clone(&self) -> Self {
        *self
    }
}

impl PartialEq for WrappedNoteKey {
    fn eq(&self, other: &Self) -> bool {
        self.0[..] == other.0[..]
    }
}

impl Eq for WrappedNoteKey {}

/// An _Action Description_, as described in [protocol specification
/// §7.5][ps].
///
/// Every action both spends and outputs a note; dummy components carry
/// zero value.
///
/// [ps]: https://zips.z.cash/protocol/nu5.pdf#actionencodingandconsensus
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// A value commitment to the net value of the input note minus the
    /// output note.
    pub cv: Bytes32,
    /// The nullifier of the input note being spent.
    pub nullifier: Bytes32,
    /// The randomized validating key for `spend_auth_sig`.
    pub rk: Bytes32,
    /// The x-coordinate of the note commitment for the output note.
    pub cm_x: Bytes32,
    /// An encoding of an ephemeral Pallas public key.
    pub ephemeral_key: Bytes32,
    /// The output note encrypted to the recipient.
    pub enc_ciphertext: EncryptedNote,
    /// A ciphertext enabling the sender to recover the output note.
    pub out_ciphertext: WrappedNoteKey,
}

impl ZcashSerialize for Action {
    fn zcash_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        self.cv.zcash_serialize(&mut writer)?;
        self.nullifier.zcash_serialize(&mut writer)?;
        self.rk.zcash_serialize(&mut writer)?;
        self.cm_x.zcash_serialize(&mut writer)?;
        self.ephemeral_key.zcash_serialize(&mut writer)?;
        writer.write_all(&self.enc_ciphertext.0[..])?;
        writer.write_all(&self.out_ciphertext.0[..])?;
        Ok(())
    }
}

impl ZcashDeserialize for Action {
    fn zcash_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let cv = Bytes32::zcash_deserialize(&mut reader)?;
        let nullifier = Bytes32::zcash_deserialize(&mut reader)?;
        let rk = Bytes32::zcash_deserialize(&mut reader)?;
        let cm_x = Bytes32::zcash_deserialize(&mut reader)?;
        let ephemeral_key = Bytes32::zcash_deserialize(&mut reader)?;

        let mut enc_ciphertext = [0; 580];
        reader.read_exact(&mut enc_ciphertext[..])?;
        let mut out_ciphertext = [0; 80];
        reader.read_exact(&mut out_ciphertext[..])?;

        Ok(Action {
            cv,
            nullifier,
            rk,
            cm_x,
            ephemeral_key,
            enc_ciphertext: EncryptedNote(enc_ciphertext),
            out_ciphertext: WrappedNoteKey(out_ciphertext),
        })
    }
}

/// The serialized size of an Orchard action, excluding its authorization.
pub(crate) const ACTION_SIZE: u64 = 5 * 32 + 580 + 80;

/// An authorized action: an action description and the signature
/// authorizing its spend component.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AuthorizedAction {
    /// The action description.
    pub action: Action,
    /// The spend authorization signature for the action's spend component.
    pub spend_auth_sig: redpallas::Signature<redpallas::SpendAuth>,
}

impl TrustedPreallocate for Action {
    fn max_allocation() -> u64 {
        // Actions are serialized alongside a 64-byte signature each.
        crate::block::MAX_BLOCK_BYTES / (ACTION_SIZE + 64)
    }
}

/// The Orchard bundle of a v5 transaction.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ShieldedData {
    /// The orchard flags for this transaction.
    pub flags: Flags,
    /// The net value of Orchard spends minus outputs, in zatoshis.
    pub value_balance: Amount<NegativeAllowed>,
    /// The shared anchor for all spends.
    ///
    /// Coinbase bundles cannot spend notes, so their anchor is
    /// unconstrained and set to the empty tree root (all zeroes).
    pub shared_anchor: Bytes32,
    /// The aggregated zk-SNARK proof for all the actions.
    pub proof: Halo2Proof,
    /// The actions, with their authorizations.
    ///
    /// An Orchard bundle with no actions is not serializable, so the
    /// constraint is kept in the type.
    pub actions: AtLeastOne<AuthorizedAction>,
    /// A signature on the transaction sighash that proves the declared
    /// `value_balance` is consistent with the actions.
    pub binding_sig: redpallas::Signature<redpallas::Binding>,
}

impl ShieldedData {
    /// Iterate over the actions of this bundle, without authorization.
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter().map(|authorized| &authorized.action)
    }
}
