//! Sapling spend descriptions.

use std::io;

use crate::{
    primitives::{redjubjub, Bytes32, Groth16Proof},
    serialization::{SerializationError, TrustedPreallocate, ZcashDeserialize, ZcashSerialize},
};

use super::tree;

/// A _Spend Description_, as described in [protocol specification
/// §7.3][ps].
///
/// In the v4 transaction format every spend carries its own anchor; the
/// v5 format shares one anchor across the whole bundle and serializes the
/// spend without it.
///
/// [ps]: https://zips.z.cash/protocol/protocol.pdf#spendencoding
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Spend {
    /// A value commitment to the value of the input note.
    pub cv: Bytes32,
    /// An anchor for the output treestate of a previous block.
    pub per_spend_anchor: tree::Root,
    /// The nullifier of the input note.
    pub nullifier: Bytes32,
    /// The randomized validating key for `spend_auth_sig`.
    pub rk: Bytes32,
    /// The ZK spend proof.
    pub zkproof: Groth16Proof,
    /// A signature authorizing this spend.
    pub spend_auth_sig: redjubjub::Signature<redjubjub::SpendAuth>,
}

impl ZcashSerialize for Spend {
    fn zcash_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        self.cv.zcash_serialize(&mut writer)?;
        writer.write_all(&self.per_spend_anchor.0)?;
        self.nullifier.zcash_serialize(&mut writer)?;
        self.rk.zcash_serialize(&mut writer)?;
        self.zkproof.zcash_serialize(&mut writer)?;
        self.spend_auth_sig.zcash_serialize(&mut writer)?;
        Ok(())
    }
}

impl ZcashDeserialize for Spend {
    fn zcash_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        use crate::serialization::ReadZcashExt;

        Ok(Spend {
            cv: Bytes32::zcash_deserialize(&mut reader)?,
            per_spend_anchor: tree::Root(reader.read_32_bytes()?),
            nullifier: Bytes32::zcash_deserialize(&mut reader)?,
            rk: Bytes32::zcash_deserialize(&mut reader)?,
            zkproof: Groth16Proof::zcash_deserialize(&mut reader)?,
            spend_auth_sig: redjubjub::Signature::zcash_deserialize(&mut reader)?,
        })
    }
}

/// The serialized size of a v4 Sapling spend description.
pub(crate) const SPEND_SIZE: u64 = 32 + 32 + 32 + 32 + 192 + 64;

impl TrustedPreallocate for Spend {
    fn max_allocation() -> u64 {
        const MAX: u64 = crate::block::MAX_BLOCK_BYTES / SPEND_SIZE;
        MAX
    }
}

impl Spend {
    /// Write the v5 transaction format prefix of this spend: the value
    /// commitment, nullifier, and validating key. The anchor is shared,
    /// and proofs and signatures are stored in separate arrays.
    pub(crate) fn zcash_serialize_without_anchor_and_auth<W: io::Write>(
        &self,
        mut writer: W,
    ) -> Result<(), io::Error> {
        self.cv.zcash_serialize(&mut writer)?;
        self.nullifier.zcash_serialize(&mut writer)?;
        self.rk.zcash_serialize(&mut writer)?;
        Ok(())
    }
}
