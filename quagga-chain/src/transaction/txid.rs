//! Non-malleable transaction identifiers for the v5 format, following
//! [ZIP-244].
//!
//! [ZIP-244]: https://zips.z.cash/zip-0244

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::{sapling, serialization::ZcashSerialize, transaction::Transaction, transparent};

use super::Hash;

pub(super) const ZCASH_TX_PERSONALIZATION_PREFIX: &[u8; 12] = b"ZcashTxHash_";

const ZCASH_HEADERS_HASH_PERSONALIZATION: &[u8; 16] = b"ZTxIdHeadersHash";
const ZCASH_TRANSPARENT_HASH_PERSONALIZATION: &[u8; 16] = b"ZTxIdTranspaHash";
const ZCASH_PREVOUTS_HASH_PERSONALIZATION: &[u8; 16] = b"ZTxIdPrevoutHash";
const ZCASH_SEQUENCE_HASH_PERSONALIZATION: &[u8; 16] = b"ZTxIdSequencHash";
const ZCASH_OUTPUTS_HASH_PERSONALIZATION: &[u8; 16] = b"ZTxIdOutputsHash";
const ZCASH_SAPLING_HASH_PERSONALIZATION: &[u8; 16] = b"ZTxIdSaplingHash";
const ZCASH_SAPLING_SPENDS_HASH_PERSONALIZATION: &[u8; 16] = b"ZTxIdSSpendsHash";
const ZCASH_SAPLING_SPENDS_COMPACT_HASH_PERSONALIZATION: &[u8; 16] = b"ZTxIdSSpendCHash";
const ZCASH_SAPLING_SPENDS_NONCOMPACT_HASH_PERSONALIZATION: &[u8; 16] = b"ZTxIdSSpendNHash";
const ZCASH_SAPLING_OUTPUTS_HASH_PERSONALIZATION: &[u8; 16] = b"ZTxIdSOutputHash";
const ZCASH_SAPLING_OUTPUTS_COMPACT_HASH_PERSONALIZATION: &[u8; 16] = b"ZTxIdSOutC__Hash";
const ZCASH_SAPLING_OUTPUTS_MEMOS_HASH_PERSONALIZATION: &[u8; 16] = b"ZTxIdSOutM__Hash";
const ZCASH_SAPLING_OUTPUTS_NONCOMPACT_HASH_PERSONALIZATION: &[u8; 16] = b"ZTxIdSOutN__Hash";
const ZCASH_ORCHARD_HASH_PERSONALIZATION: &[u8; 16] = b"ZTxIdOrchardHash";
const ZCASH_ORCHARD_ACTIONS_COMPACT_HASH_PERSONALIZATION: &[u8; 16] = b"ZTxIdOrcActCHash";
const ZCASH_ORCHARD_ACTIONS_MEMOS_HASH_PERSONALIZATION: &[u8; 16] = b"ZTxIdOrcActMHash";
const ZCASH_ORCHARD_ACTIONS_NONCOMPACT_HASH_PERSONALIZATION: &[u8; 16] = b"ZTxIdOrcActNHash";

pub(super) const V5_VERSION_GROUP_ID: u32 = 0x26A7_270A;

fn hasher(personal: &[u8; 16]) -> blake2b_simd::State {
    blake2b_simd::Params::new()
        .hash_length(32)
        .personal(personal)
        .to_state()
}

fn finalize(state: blake2b_simd::State) -> [u8; 32] {
    state
        .finalize()
        .as_bytes()
        .try_into()
        .expect("32 byte blake2b digest")
}

/// Returns the ZIP-244 transaction-level personalization for `transaction`,
/// which binds the consensus branch id.
pub(super) fn tx_hash_personal(transaction: &Transaction) -> [u8; 16] {
    let branch_id = transaction
        .network_upgrade()
        .expect("v5 transactions always have a network upgrade")
        .branch_id()
        .expect("v5 transactions are only defined after branch ids");

    let mut personal = [0; 16];
    personal[..12].copy_from_slice(ZCASH_TX_PERSONALIZATION_PREFIX);
    (&mut personal[12..])
        .write_u32::<LittleEndian>(branch_id.into())
        .expect("writing to an array never fails");
    personal
}

/// T.1: the transaction header digest.
pub(super) fn header_digest(transaction: &Transaction) -> [u8; 32] {
    let branch_id = transaction
        .network_upgrade()
        .expect("v5 transactions always have a network upgrade")
        .branch_id()
        .expect("v5 transactions are only defined after branch ids");

    let mut state = hasher(ZCASH_HEADERS_HASH_PERSONALIZATION);
    state
        .write_u32::<LittleEndian>(5 | (1 << 31))
        .expect("writing to a hasher never fails");
    state.write_u32::<LittleEndian>(V5_VERSION_GROUP_ID).unwrap();
    state
        .write_u32::<LittleEndian>(u32::from(branch_id))
        .unwrap();
    transaction
        .lock_time()
        .zcash_serialize(&mut state)
        .unwrap();
    state
        .write_u32::<LittleEndian>(transaction.expiry_height().0)
        .unwrap();

    finalize(state)
}

/// T.2a: the digest of all transparent prevouts.
pub(super) fn prevouts_digest(transaction: &Transaction) -> [u8; 32] {
    let mut state = hasher(ZCASH_PREVOUTS_HASH_PERSONALIZATION);
    for input in transaction.inputs() {
        match input {
            transparent::Input::PrevOut { outpoint, .. } => {
                outpoint.zcash_serialize(&mut state).unwrap();
            }
            transparent::Input::Coinbase { .. } => {
                // the null outpoint of a coinbase input
                state.write_all(&[0; 32]).unwrap();
                state.write_u32::<LittleEndian>(0xffff_ffff).unwrap();
            }
        }
    }
    finalize(state)
}

/// T.2b: the digest of all transparent input sequence numbers.
pub(super) fn sequence_digest(transaction: &Transaction) -> [u8; 32] {
    let mut state = hasher(ZCASH_SEQUENCE_HASH_PERSONALIZATION);
    for input in transaction.inputs() {
        let sequence = match input {
            transparent::Input::PrevOut { sequence, .. } => sequence,
            transparent::Input::Coinbase { sequence, .. } => sequence,
        };
        state.write_u32::<LittleEndian>(*sequence).unwrap();
    }
    finalize(state)
}

/// T.2c: the digest of all transparent outputs.
pub(super) fn outputs_digest(transaction: &Transaction) -> [u8; 32] {
    let mut state = hasher(ZCASH_OUTPUTS_HASH_PERSONALIZATION);
    for output in transaction.outputs() {
        output.zcash_serialize(&mut state).unwrap();
    }
    finalize(state)
}

/// T.2: the transparent bundle digest.
pub(super) fn transparent_digest(transaction: &Transaction) -> [u8; 32] {
    let mut state = hasher(ZCASH_TRANSPARENT_HASH_PERSONALIZATION);
    if !transaction.inputs().is_empty() || !transaction.outputs().is_empty() {
        state.write_all(&prevouts_digest(transaction)).unwrap();
        state.write_all(&sequence_digest(transaction)).unwrap();
        state.write_all(&outputs_digest(transaction)).unwrap();
    }
    finalize(state)
}

/// T.3: the Sapling bundle digest.
pub(super) fn sapling_digest(transaction: &Transaction) -> [u8; 32] {
    let mut state = hasher(ZCASH_SAPLING_HASH_PERSONALIZATION);

    if let Some(shielded_data) = transaction
        .sapling_shielded_data()
        .filter(|shielded_data| !shielded_data.is_empty())
    {
        state.write_all(&sapling_spends_digest(shielded_data)).unwrap();
        state
            .write_all(&sapling_outputs_digest(shielded_data))
            .unwrap();
        state
            .write_all(&shielded_data.value_balance.to_bytes())
            .unwrap();
    }

    finalize(state)
}

/// T.3a: the Sapling spends digest.
fn sapling_spends_digest(shielded_data: &sapling::ShieldedData) -> [u8; 32] {
    let mut state = hasher(ZCASH_SAPLING_SPENDS_HASH_PERSONALIZATION);

    if !shielded_data.spends.is_empty() {
        let mut compact = hasher(ZCASH_SAPLING_SPENDS_COMPACT_HASH_PERSONALIZATION);
        let mut noncompact = hasher(ZCASH_SAPLING_SPENDS_NONCOMPACT_HASH_PERSONALIZATION);

        for spend in &shielded_data.spends {
            compact.write_all(&spend.nullifier.0).unwrap();

            noncompact.write_all(&spend.cv.0).unwrap();
            noncompact.write_all(&spend.per_spend_anchor.0).unwrap();
            noncompact.write_all(&spend.rk.0).unwrap();
        }

        state.write_all(&finalize(compact)).unwrap();
        state.write_all(&finalize(noncompact)).unwrap();
    }

    finalize(state)
}

/// T.3b: the Sapling outputs digest.
fn sapling_outputs_digest(shielded_data: &sapling::ShieldedData) -> [u8; 32] {
    let mut state = hasher(ZCASH_SAPLING_OUTPUTS_HASH_PERSONALIZATION);

    if !shielded_data.outputs.is_empty() {
        let mut compact = hasher(ZCASH_SAPLING_OUTPUTS_COMPACT_HASH_PERSONALIZATION);
        let mut memos = hasher(ZCASH_SAPLING_OUTPUTS_MEMOS_HASH_PERSONALIZATION);
        let mut noncompact = hasher(ZCASH_SAPLING_OUTPUTS_NONCOMPACT_HASH_PERSONALIZATION);

        for output in &shielded_data.outputs {
            compact.write_all(&output.cm_u.0).unwrap();
            compact.write_all(&output.ephemeral_key.0).unwrap();
            compact.write_all(&output.enc_ciphertext.0[..52]).unwrap();

            memos.write_all(&output.enc_ciphertext.0[52..564]).unwrap();

            noncompact.write_all(&output.cv.0).unwrap();
            noncompact.write_all(&output.enc_ciphertext.0[564..]).unwrap();
            noncompact.write_all(&output.out_ciphertext.0[..]).unwrap();
        }

        state.write_all(&finalize(compact)).unwrap();
        state.write_all(&finalize(memos)).unwrap();
        state.write_all(&finalize(noncompact)).unwrap();
    }

    finalize(state)
}

/// T.4: the Orchard bundle digest.
pub(super) fn orchard_digest(transaction: &Transaction) -> [u8; 32] {
    let mut state = hasher(ZCASH_ORCHARD_HASH_PERSONALIZATION);

    if let Some(shielded_data) = transaction.orchard_shielded_data() {
        let mut compact = hasher(ZCASH_ORCHARD_ACTIONS_COMPACT_HASH_PERSONALIZATION);
        let mut memos = hasher(ZCASH_ORCHARD_ACTIONS_MEMOS_HASH_PERSONALIZATION);
        let mut noncompact = hasher(ZCASH_ORCHARD_ACTIONS_NONCOMPACT_HASH_PERSONALIZATION);

        for action in shielded_data.actions() {
            compact.write_all(&action.nullifier.0).unwrap();
            compact.write_all(&action.cm_x.0).unwrap();
            compact.write_all(&action.ephemeral_key.0).unwrap();
            compact.write_all(&action.enc_ciphertext.0[..52]).unwrap();

            memos.write_all(&action.enc_ciphertext.0[52..564]).unwrap();

            noncompact.write_all(&action.cv.0).unwrap();
            noncompact.write_all(&action.rk.0).unwrap();
            noncompact.write_all(&action.enc_ciphertext.0[564..]).unwrap();
            noncompact.write_all(&action.out_ciphertext.0[..]).unwrap();
        }

        state.write_all(&finalize(compact)).unwrap();
        state.write_all(&finalize(memos)).unwrap();
        state.write_all(&finalize(noncompact)).unwrap();
        state.write_all(&[shielded_data.flags.bits()]).unwrap();
        state
            .write_all(&shielded_data.value_balance.to_bytes())
            .unwrap();
        state.write_all(&shielded_data.shared_anchor.0).unwrap();
    }

    finalize(state)
}

/// A builder for the v5 transaction ID digest.
pub(super) struct TxIdBuilder<'a> {
    trans: &'a Transaction,
}

impl<'a> TxIdBuilder<'a> {
    pub(super) fn new(trans: &'a Transaction) -> Self {
        assert_eq!(
            trans.version(),
            5,
            "the txid digest is only defined for the v5 format",
        );
        TxIdBuilder { trans }
    }

    /// Compute the transaction ID digest.
    pub(super) fn txid(self) -> Hash {
        let mut state = hasher(&tx_hash_personal(self.trans));
        state.write_all(&header_digest(self.trans)).unwrap();
        state.write_all(&transparent_digest(self.trans)).unwrap();
        state.write_all(&sapling_digest(self.trans)).unwrap();
        state.write_all(&orchard_digest(self.trans)).unwrap();

        Hash(finalize(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::transaction::LockTime;

    fn empty_v5() -> Transaction {
        Transaction::V5 {
            network_upgrade: crate::parameters::NetworkUpgrade::Nu5,
            lock_time: LockTime::unlocked(),
            expiry_height: crate::block::Height(0),
            inputs: vec![],
            outputs: vec![],
            sapling_shielded_data: None,
            orchard_shielded_data: None,
        }
    }

    #[test]
    fn txid_is_deterministic() {
        let tx = empty_v5();
        assert_eq!(tx.hash(), tx.hash());
    }

    #[test]
    fn txid_changes_with_expiry_height() {
        let tx1 = empty_v5();
        let mut tx2 = empty_v5();
        if let Transaction::V5 {
            ref mut expiry_height,
            ..
        } = tx2
        {
            *expiry_height = crate::block::Height(100);
        }

        assert_ne!(tx1.hash(), tx2.hash());
    }
}
