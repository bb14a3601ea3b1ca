//! Sprout JoinSplit data for v4 transactions.

use std::{fmt, io};

use crate::{
    amount::{Amount, NonNegative},
    primitives::{Bytes32, Groth16Proof},
    serialization::{
        serde_helpers::BigArray, ReadZcashExt, SerializationError, TrustedPreallocate,
        ZcashDeserialize, ZcashSerialize,
    },
};

/// A Sprout note ciphertext.
#[derive(Deserialize, Serialize)]
pub struct EncryptedNote(#[serde(with = "BigArray")] pub [u8; 601]);

impl fmt::Debug for EncryptedNote {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("sprout::EncryptedNote")
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

/// A _JoinSplit Description_, as described in [protocol specification
/// §7.2][ps].
///
/// [ps]: https://zips.z.cash/protocol/protocol.pdf#joinsplitencoding
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct JoinSplit {
    /// A value that the JoinSplit transfer removes from the transparent
    /// value pool.
    pub vpub_old: Amount<NonNegative>,
    /// A value that the JoinSplit transfer inserts into the transparent
    /// value pool.
    pub vpub_new: Amount<NonNegative>,
    /// A root of the Sprout note commitment tree at some block height in
    /// the past.
    pub anchor: Bytes32,
    /// The nullifiers of the input notes.
    pub nullifiers: [Bytes32; 2],
    /// The note commitments for the output notes.
    pub commitments: [Bytes32; 2],
    /// An X25519 public key.
    pub ephemeral_key: Bytes32,
    /// A 256-bit seed that must be chosen independently at random for each
    /// JoinSplit description.
    pub random_seed: Bytes32,
    /// A message authentication tag for each spending key.
    pub vmacs: [Bytes32; 2],
    /// The ZK JoinSplit proof.
    ///
    /// All v4 joinsplits carry Groth16 proofs; BCTV14 joinsplits only
    /// appear in formats that predate the chain's checkpoint.
    pub zkproof: Groth16Proof,
    /// Ciphertexts of the output notes.
    pub enc_ciphertexts: [EncryptedNote; 2],
}

impl ZcashSerialize for JoinSplit {
    fn zcash_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        self.vpub_old.zcash_serialize(&mut writer)?;
        self.vpub_new.zcash_serialize(&mut writer)?;
        self.anchor.zcash_serialize(&mut writer)?;
        for nullifier in &self.nullifiers {
            nullifier.zcash_serialize(&mut writer)?;
        }
        for commitment in &self.commitments {
            commitment.zcash_serialize(&mut writer)?;
        }
        self.ephemeral_key.zcash_serialize(&mut writer)?;
        self.random_seed.zcash_serialize(&mut writer)?;
        for vmac in &self.vmacs {
            vmac.zcash_serialize(&mut writer)?;
        }
        self.zkproof.zcash_serialize(&mut writer)?;
        for enc_ciphertext in &self.enc_ciphertexts {
            writer.write_all(&enc_ciphertext.0[..])?;
        }
        Ok(())
    }
}

impl ZcashDeserialize for JoinSplit {
    fn zcash_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let vpub_old = Amount::zcash_deserialize(&mut reader)?;
        let vpub_new = Amount::zcash_deserialize(&mut reader)?;
        let anchor = Bytes32::zcash_deserialize(&mut reader)?;
        let nullifiers = [
            Bytes32::zcash_deserialize(&mut reader)?,
            Bytes32::zcash_deserialize(&mut reader)?,
        ];
        let commitments = [
            Bytes32::zcash_deserialize(&mut reader)?,
            Bytes32::zcash_deserialize(&mut reader)?,
        ];
        let ephemeral_key = Bytes32::zcash_deserialize(&mut reader)?;
        let random_seed = Bytes32::zcash_deserialize(&mut reader)?;
        let vmacs = [
            Bytes32::zcash_deserialize(&mut reader)?,
            Bytes32::zcash_deserialize(&mut reader)?,
        ];
        let zkproof = Groth16Proof::zcash_deserialize(&mut reader)?;

        let mut first = [0; 601];
        reader.read_exact(&mut first[..])?;
        let mut second = [0; 601];
        reader.read_exact(&mut second[..])?;

        Ok(JoinSplit {
            vpub_old,
            vpub_new,
            anchor,
            nullifiers,
            commitments,
            ephemeral_key,
            random_seed,
            vmacs,
            zkproof,
            enc_ciphertexts: [EncryptedNote(first), EncryptedNote(second)],
        })
    }
}

/// The serialized size of a v4 joinsplit description.
const JOINSPLIT_SIZE: u64 = 8 + 8 + 32 * 9 + 192 + 601 * 2;

impl TrustedPreallocate for JoinSplit {
    fn max_allocation() -> u64 {
        crate::block::MAX_BLOCK_BYTES / JOINSPLIT_SIZE
    }
}

/// An Ed25519 signature over all the joinsplits of a transaction, in its
/// wire encoding.
#[derive(Deserialize, Serialize)]
pub struct Ed25519Signature(#[serde(with = "BigArray")] pub [u8; 64]);

impl fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Ed25519Signature")
            .field(&hex::encode(&self.0[..]))
            .finish()
    }
}

impl Copy for Ed25519Signature {}

impl Clone for Ed25519Signature {
    fn clone(&self) -> Self {
        *self
    }
}

impl PartialEq for Ed25519Signature {
    fn eq(&self, other: &Self) -> bool {
        self.0[..] == other.0[..]
    }
}

impl Eq for Ed25519Signature {}

/// The JoinSplit data of a v4 transaction: at least one joinsplit, and the
/// key that signs them all.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct JoinSplitData {
    /// The first JoinSplit description.
    ///
    /// Storing this separately makes it impossible to construct an
    /// invalid `JoinSplitData` with no JoinSplits.
    pub first: JoinSplit,
    /// The rest of the JoinSplit descriptions.
    pub rest: Vec<JoinSplit>,
    /// The public key of the JoinSplit signature.
    pub pub_key: Bytes32,
    /// The JoinSplit signature.
    pub sig: Ed25519Signature,
}

impl JoinSplitData {
    /// Iterate over the joinsplits in this transaction, in transaction
    /// order.
    pub fn joinsplits(&self) -> impl Iterator<Item = &JoinSplit> {
        std::iter::once(&self.first).chain(self.rest.iter())
    }

    /// Returns the total `vpub_old`: the value entering the Sprout pool.
    pub fn vpub_old_total(&self) -> Amount<NonNegative> {
        self.joinsplits()
            .map(|joinsplit| joinsplit.vpub_old)
            .sum::<Result<_, _>>()
            .expect("joinsplit vpub_old values are valid amounts")
    }

    /// Returns the total `vpub_new`: the value leaving the Sprout pool.
    pub fn vpub_new_total(&self) -> Amount<NonNegative> {
        self.joinsplits()
            .map(|joinsplit| joinsplit.vpub_new)
            .sum::<Result<_, _>>()
            .expect("joinsplit vpub_new values are valid amounts")
    }
}
