//! Sapling output descriptions.

use std::io;

use crate::{
    primitives::{Bytes32, Groth16Proof},
    serialization::{SerializationError, TrustedPreallocate, ZcashDeserialize, ZcashSerialize},
};

use super::note::{EncryptedNote, WrappedNoteKey};

/// A _Output Description_, as described in [protocol specification
/// §7.4][ps].
///
/// [ps]: https://zips.z.cash/protocol/protocol.pdf#outputencoding
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Output {
    /// A value commitment to the value of the output note.
    pub cv: Bytes32,
    /// The u-coordinate of the note commitment for the output note.
    pub cm_u: Bytes32,
    /// An encoding of an ephemeral Jubjub public key.
    pub ephemeral_key: Bytes32,
    /// A ciphertext component for the encrypted output note.
    pub enc_ciphertext: EncryptedNote,
    /// A ciphertext component allowing the holder of the outgoing cipher
    /// key to recover the note.
    pub out_ciphertext: WrappedNoteKey,
    /// The ZK output proof.
    pub zkproof: Groth16Proof,
}

impl ZcashSerialize for Output {
    fn zcash_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        self.cv.zcash_serialize(&mut writer)?;
        self.cm_u.zcash_serialize(&mut writer)?;
        self.ephemeral_key.zcash_serialize(&mut writer)?;
        self.enc_ciphertext.zcash_serialize(&mut writer)?;
        self.out_ciphertext.zcash_serialize(&mut writer)?;
        self.zkproof.zcash_serialize(&mut writer)?;
        Ok(())
    }
}

impl ZcashDeserialize for Output {
    fn zcash_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(Output {
            cv: Bytes32::zcash_deserialize(&mut reader)?,
            cm_u: Bytes32::zcash_deserialize(&mut reader)?,
            ephemeral_key: Bytes32::zcash_deserialize(&mut reader)?,
            enc_ciphertext: EncryptedNote::zcash_deserialize(&mut reader)?,
            out_ciphertext: WrappedNoteKey::zcash_deserialize(&mut reader)?,
            zkproof: Groth16Proof::zcash_deserialize(&mut reader)?,
        })
    }
}

/// The serialized size of a Sapling output description.
pub(crate) const OUTPUT_SIZE: u64 = 32 + 32 + 32 + 580 + 80 + 192;

impl TrustedPreallocate for Output {
    fn max_allocation() -> u64 {
        const MAX: u64 = crate::block::MAX_BLOCK_BYTES / OUTPUT_SIZE;
        MAX
    }
}

impl Output {
    /// Write the v5 transaction format parts of this output: everything
    /// except the proof, which v5 transactions store in a separate array.
    pub(crate) fn zcash_serialize_without_proof<W: io::Write>(
        &self,
        mut writer: W,
    ) -> Result<(), io::Error> {
        self.cv.zcash_serialize(&mut writer)?;
        self.cm_u.zcash_serialize(&mut writer)?;
        self.ephemeral_key.zcash_serialize(&mut writer)?;
        self.enc_ciphertext.zcash_serialize(&mut writer)?;
        self.out_ciphertext.zcash_serialize(&mut writer)?;
        Ok(())
    }
}
