//! Transaction signature hashes.
//!
//! The v4 algorithm follows [ZIP-243]; the v5 algorithm follows the
//! signature digest of [ZIP-244], built from the same bundle digests as
//! the transaction ID.
//!
//! [ZIP-243]: https://zips.z.cash/zip-0243
//! [ZIP-244]: https://zips.z.cash/zip-0244#signature-digest

use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::{
    parameters::{ConsensusBranchId, NetworkUpgrade},
    serialization::ZcashSerialize,
    transparent,
};

use super::{txid, Transaction};

const ZCASH_SIGHASH_PERSONALIZATION_PREFIX: &[u8; 12] = b"ZcashSigHash";
const ZCASH_PREVOUTS_HASH_PERSONALIZATION: &[u8; 16] = b"ZcashPrevoutHash";
const ZCASH_SEQUENCE_HASH_PERSONALIZATION: &[u8; 16] = b"ZcashSequencHash";
const ZCASH_OUTPUTS_HASH_PERSONALIZATION: &[u8; 16] = b"ZcashOutputsHash";
const ZCASH_JOINSPLITS_HASH_PERSONALIZATION: &[u8; 16] = b"ZcashJSplitsHash";
const ZCASH_SHIELDED_SPENDS_HASH_PERSONALIZATION: &[u8; 16] = b"ZcashSSpendsHash";
const ZCASH_SHIELDED_OUTPUTS_HASH_PERSONALIZATION: &[u8; 16] = b"ZcashSOutputHash";

const SAPLING_VERSION_GROUP_ID: u32 = 0x892F_2085;

bitflags::bitflags! {
    /// The Bitcoin-inherited signature hash types.
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    pub struct HashType: u32 {
        /// Sign over the whole transaction.
        const ALL = 0b0000_0001;
        /// Sign over none of the outputs.
        const NONE = 0b0000_0010;
        /// Sign over one matching output.
        const SINGLE = Self::ALL.bits() | Self::NONE.bits();
        /// Anyone can add inputs to this transaction.
        const ANYONECANPAY = 0b1000_0000;
    }
}

impl HashType {
    fn masked(self) -> Self {
        Self::from_bits_truncate(self.bits() & 0b0001_1111)
    }
}

/// A 32-byte signature hash.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct SigHash(pub [u8; 32]);

impl AsRef<[u8]> for SigHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for SigHash {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_tuple("SigHash")
            .field(&hex::encode(self.0))
            .finish()
    }
}

pub(super) struct SigHasher<'a> {
    trans: &'a Transaction,
    hash_type: HashType,
    network_upgrade: NetworkUpgrade,
    input: Option<(u32, transparent::Output)>,
}

impl<'a> SigHasher<'a> {
    pub fn new(
        trans: &'a Transaction,
        hash_type: HashType,
        network_upgrade: NetworkUpgrade,
        input: Option<(u32, transparent::Output)>,
    ) -> Self {
        SigHasher {
            trans,
            hash_type,
            network_upgrade,
            input,
        }
    }

    pub(super) fn sighash(self) -> SigHash {
        match self.trans {
            Transaction::V4 { .. } => {
                let mut hash = blake2b_simd::Params::new()
                    .hash_length(32)
                    .personal(&self.personal())
                    .to_state();

                self.hash_sighash_zip243(&mut hash)
                    .expect("serialization into hasher never fails");

                SigHash(
                    hash.finalize()
                        .as_bytes()
                        .try_into()
                        .expect("32 byte blake2b digest"),
                )
            }
            Transaction::V5 { .. } => self.sighash_zip244(),
        }
    }

    fn consensus_branch_id(&self) -> ConsensusBranchId {
        self.network_upgrade
            .branch_id()
            .expect("sighashes are only defined after branch ids")
    }

    pub(super) fn personal(&self) -> [u8; 16] {
        let mut personal = [0; 16];
        personal[..12].copy_from_slice(ZCASH_SIGHASH_PERSONALIZATION_PREFIX);
        (&mut personal[12..])
            .write_u32::<LittleEndian>(self.consensus_branch_id().into())
            .unwrap();
        personal
    }

    /// Sighash implementation for the Sapling consensus branch and every
    /// subsequent v4 consensus branch, as specified in ZIP-243.
    fn hash_sighash_zip243<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        self.hash_header(&mut writer)?;
        self.hash_groupid(&mut writer)?;
        self.hash_prevouts(&mut writer)?;
        self.hash_sequence(&mut writer)?;
        self.hash_outputs(&mut writer)?;
        self.hash_joinsplits(&mut writer)?;
        self.hash_shielded_spends(&mut writer)?;
        self.hash_shielded_outputs(&mut writer)?;
        self.hash_lock_time(&mut writer)?;
        self.hash_expiry_height(&mut writer)?;
        self.hash_value_balance(&mut writer)?;
        self.hash_hash_type(&mut writer)?;
        self.hash_input(&mut writer)?;

        Ok(())
    }

    fn hash_header<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        writer.write_u32::<LittleEndian>(4 | (1 << 31))
    }

    fn hash_groupid<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        writer.write_u32::<LittleEndian>(SAPLING_VERSION_GROUP_ID)
    }

    fn hash_prevouts<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        if self.hash_type.contains(HashType::ANYONECANPAY) {
            return writer.write_all(&[0; 32]);
        }

        let mut hash = blake2b_simd::Params::new()
            .hash_length(32)
            .personal(ZCASH_PREVOUTS_HASH_PERSONALIZATION)
            .to_state();

        self.trans
            .inputs()
            .iter()
            .filter_map(|input| match input {
                transparent::Input::PrevOut { outpoint, .. } => Some(outpoint),
                transparent::Input::Coinbase { .. } => None,
            })
            .try_for_each(|outpoint| outpoint.zcash_serialize(&mut hash))?;

        writer.write_all(hash.finalize().as_ref())
    }

    fn hash_sequence<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        if self.hash_type.contains(HashType::ANYONECANPAY)
            || self.hash_type.masked() == HashType::SINGLE
            || self.hash_type.masked() == HashType::NONE
        {
            return writer.write_all(&[0; 32]);
        }

        let mut hash = blake2b_simd::Params::new()
            .hash_length(32)
            .personal(ZCASH_SEQUENCE_HASH_PERSONALIZATION)
            .to_state();

        self.trans
            .inputs()
            .iter()
            .map(|input| match input {
                transparent::Input::PrevOut { sequence, .. } => sequence,
                transparent::Input::Coinbase { sequence, .. } => sequence,
            })
            .try_for_each(|sequence| (&mut hash).write_u32::<LittleEndian>(*sequence))?;

        writer.write_all(hash.finalize().as_ref())
    }

    /// Writes the hash of the transaction outputs to the provided writer.
    fn hash_outputs<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        if self.hash_type.masked() != HashType::SINGLE && self.hash_type.masked() != HashType::NONE
        {
            self.outputs_hash(writer)
        } else if self.hash_type.masked() == HashType::SINGLE
            && self
                .input
                .as_ref()
                .map(|(index, _)| (*index as usize) < self.trans.outputs().len())
                .unwrap_or(false)
        {
            self.single_output_hash(writer)
        } else {
            writer.write_all(&[0; 32])
        }
    }

    fn outputs_hash<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        let mut hash = blake2b_simd::Params::new()
            .hash_length(32)
            .personal(ZCASH_OUTPUTS_HASH_PERSONALIZATION)
            .to_state();

        self.trans
            .outputs()
            .iter()
            .try_for_each(|output| output.zcash_serialize(&mut hash))?;

        writer.write_all(hash.finalize().as_ref())
    }

    fn single_output_hash<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        let (index, _) = self
            .input
            .as_ref()
            .expect("already checked index is some in `hash_outputs`");

        let mut hash = blake2b_simd::Params::new()
            .hash_length(32)
            .personal(ZCASH_OUTPUTS_HASH_PERSONALIZATION)
            .to_state();

        self.trans.outputs()[*index as usize].zcash_serialize(&mut hash)?;

        writer.write_all(hash.finalize().as_ref())
    }

    fn hash_joinsplits<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        let Some(joinsplit_data) = self.trans.joinsplit_data() else {
            return writer.write_all(&[0; 32]);
        };

        let mut hash = blake2b_simd::Params::new()
            .hash_length(32)
            .personal(ZCASH_JOINSPLITS_HASH_PERSONALIZATION)
            .to_state();

        for joinsplit in joinsplit_data.joinsplits() {
            joinsplit.zcash_serialize(&mut hash)?;
        }
        (&mut hash).write_all(&joinsplit_data.pub_key.0[..])?;

        writer.write_all(hash.finalize().as_ref())
    }

    fn hash_shielded_spends<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        let spends = self
            .trans
            .sapling_shielded_data()
            .map(|shielded_data| &shielded_data.spends[..])
            .unwrap_or(&[]);

        if spends.is_empty() {
            return writer.write_all(&[0; 32]);
        }

        let mut hash = blake2b_simd::Params::new()
            .hash_length(32)
            .personal(ZCASH_SHIELDED_SPENDS_HASH_PERSONALIZATION)
            .to_state();

        // ZIP-243 commits to each spend without its spend auth signature.
        for spend in spends {
            (&mut hash).write_all(&spend.cv.0)?;
            (&mut hash).write_all(&spend.per_spend_anchor.0)?;
            (&mut hash).write_all(&spend.nullifier.0)?;
            (&mut hash).write_all(&spend.rk.0)?;
            (&mut hash).write_all(&spend.zkproof.0[..])?;
        }

        writer.write_all(hash.finalize().as_ref())
    }

    fn hash_shielded_outputs<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        let outputs = self
            .trans
            .sapling_shielded_data()
            .map(|shielded_data| &shielded_data.outputs[..])
            .unwrap_or(&[]);

        if outputs.is_empty() {
            return writer.write_all(&[0; 32]);
        }

        let mut hash = blake2b_simd::Params::new()
            .hash_length(32)
            .personal(ZCASH_SHIELDED_OUTPUTS_HASH_PERSONALIZATION)
            .to_state();

        for output in outputs {
            output.zcash_serialize(&mut hash)?;
        }

        writer.write_all(hash.finalize().as_ref())
    }

    fn hash_lock_time<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        self.trans.lock_time().zcash_serialize(&mut writer)
    }

    fn hash_expiry_height<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        writer.write_u32::<LittleEndian>(self.trans.expiry_height().0)
    }

    fn hash_value_balance<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        writer.write_all(&self.trans.sapling_value_balance().to_bytes())
    }

    fn hash_hash_type<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        writer.write_u32::<LittleEndian>(self.hash_type.bits())
    }

    fn hash_input<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        let Some((index, transparent::Output { value, lock_script })) = self.input.as_ref() else {
            return Ok(());
        };

        let (outpoint, unlock_script, sequence) = match &self.trans.inputs()[*index as usize] {
            transparent::Input::PrevOut {
                outpoint,
                unlock_script,
                sequence,
            } => (outpoint, unlock_script, sequence),
            transparent::Input::Coinbase { .. } => {
                unreachable!("sighashes with an input are only computed for prevout spends")
            }
        };

        // the script code for a standard spend is the lock script of the
        // output being spent
        let _ = unlock_script;
        outpoint.zcash_serialize(&mut writer)?;
        lock_script.zcash_serialize(&mut writer)?;
        writer.write_all(&value.to_bytes())?;
        writer.write_u32::<LittleEndian>(*sequence)?;

        Ok(())
    }

    /// Signature digest for v5 transactions, used for shielded signatures
    /// like the coinbase binding signature.
    ///
    /// Built from the same bundle digests as the transaction ID, with the
    /// transparent digest replaced by a signing variant that commits to
    /// the hash type.
    fn sighash_zip244(&self) -> SigHash {
        let mut transparent_sig = blake2b_simd::Params::new()
            .hash_length(32)
            .personal(b"ZTxIdTranspaHash")
            .to_state();

        if !self.trans.inputs().is_empty() || !self.trans.outputs().is_empty() {
            (&mut transparent_sig)
                .write_all(&[self.hash_type.bits() as u8])
                .unwrap();
            (&mut transparent_sig)
                .write_all(&txid::prevouts_digest(self.trans))
                .unwrap();
            (&mut transparent_sig)
                .write_all(&txid::sequence_digest(self.trans))
                .unwrap();
            (&mut transparent_sig)
                .write_all(&txid::outputs_digest(self.trans))
                .unwrap();
        }

        let mut state = blake2b_simd::Params::new()
            .hash_length(32)
            .personal(&txid::tx_hash_personal(self.trans))
            .to_state();

        (&mut state)
            .write_all(&txid::header_digest(self.trans))
            .unwrap();
        (&mut state)
            .write_all(transparent_sig.finalize().as_bytes())
            .unwrap();
        (&mut state)
            .write_all(&txid::sapling_digest(self.trans))
            .unwrap();
        (&mut state)
            .write_all(&txid::orchard_digest(self.trans))
            .unwrap();

        SigHash(
            state
                .finalize()
                .as_bytes()
                .try_into()
                .expect("32 byte blake2b digest"),
        )
    }
}
