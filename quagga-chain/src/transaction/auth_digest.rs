//! Authorizing data commitments for transactions, following [ZIP-244].
//!
//! [ZIP-244]: https://zips.z.cash/zip-0244#authorizing-data-commitment

use std::{fmt, io::Write};

use crate::serialization::ZcashSerialize;

use super::Transaction;

const ZCASH_AUTH_PERSONALIZATION_PREFIX: &[u8; 12] = b"ZTxAuthHash_";
const ZCASH_AUTH_TRANSPARENT_HASH_PERSONALIZATION: &[u8; 16] = b"ZTxAuthTransHash";
const ZCASH_AUTH_SAPLING_HASH_PERSONALIZATION: &[u8; 16] = b"ZTxAuthSapliHash";
const ZCASH_AUTH_ORCHARD_HASH_PERSONALIZATION: &[u8; 16] = b"ZTxAuthOrchaHash";

/// An authorizing data commitment hash.
///
/// For v5 transactions, this commits to the parts of the transaction the
/// txid digest leaves out: scripts, proofs, and signatures. For v1-v4
/// transactions, the txid commits to everything, and the placeholder value
/// `0xFF..FF` is used instead.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct AuthDigest(pub [u8; 32]);

impl fmt::Debug for AuthDigest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut reversed_bytes = self.0;
        reversed_bytes.reverse();
        f.debug_tuple("AuthDigest")
            .field(&hex::encode(reversed_bytes))
            .finish()
    }
}

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

/// A.1: the digest of the transparent scriptSigs.
fn transparent_auth_digest(transaction: &Transaction) -> [u8; 32] {
    let mut state = hasher(ZCASH_AUTH_TRANSPARENT_HASH_PERSONALIZATION);
    for input in transaction.inputs() {
        match input {
            crate::transparent::Input::PrevOut { unlock_script, .. } => {
                unlock_script
                    .zcash_serialize(&mut state)
                    .expect("writing to a hasher never fails");
            }
            coinbase @ crate::transparent::Input::Coinbase { .. } => {
                // The coinbase "script" is its height and inert data; the
                // whole serialized input commits to it.
                coinbase
                    .zcash_serialize(&mut state)
                    .expect("writing to a hasher never fails");
            }
        }
    }
    finalize(state)
}

/// A.2: the digest of the Sapling proofs and signatures.
fn sapling_auth_digest(transaction: &Transaction) -> [u8; 32] {
    let mut state = hasher(ZCASH_AUTH_SAPLING_HASH_PERSONALIZATION);

    if let Some(shielded_data) = transaction
        .sapling_shielded_data()
        .filter(|shielded_data| !shielded_data.is_empty())
    {
        for spend in &shielded_data.spends {
            state.write_all(&spend.zkproof.0[..]).unwrap();
        }
        for spend in &shielded_data.spends {
            state.write_all(spend.spend_auth_sig.as_ref()).unwrap();
        }
        for output in &shielded_data.outputs {
            state.write_all(&output.zkproof.0[..]).unwrap();
        }
        state.write_all(shielded_data.binding_sig.as_ref()).unwrap();
    }

    finalize(state)
}

/// A.3: the digest of the Orchard proof and signatures.
fn orchard_auth_digest(transaction: &Transaction) -> [u8; 32] {
    let mut state = hasher(ZCASH_AUTH_ORCHARD_HASH_PERSONALIZATION);

    if let Some(shielded_data) = transaction.orchard_shielded_data() {
        state.write_all(&shielded_data.proof.0[..]).unwrap();
        for action in shielded_data.actions.iter() {
            state.write_all(action.spend_auth_sig.as_ref()).unwrap();
        }
        state.write_all(shielded_data.binding_sig.as_ref()).unwrap();
    }

    finalize(state)
}

impl From<&Transaction> for AuthDigest {
    fn from(transaction: &Transaction) -> Self {
        match transaction {
            Transaction::V4 { .. } => crate::block::merkle::AUTH_DIGEST_PLACEHOLDER,
            Transaction::V5 { .. } => {
                let mut personal = [0; 16];
                personal[..12].copy_from_slice(ZCASH_AUTH_PERSONALIZATION_PREFIX);
                let branch_id: u32 = transaction
                    .network_upgrade()
                    .expect("v5 transactions always have a network upgrade")
                    .branch_id()
                    .expect("v5 transactions are only defined after branch ids")
                    .into();
                personal[12..].copy_from_slice(&branch_id.to_le_bytes());

                let mut state = hasher(&personal);
                state
                    .write_all(&transparent_auth_digest(transaction))
                    .unwrap();
                state.write_all(&sapling_auth_digest(transaction)).unwrap();
                state.write_all(&orchard_auth_digest(transaction)).unwrap();

                AuthDigest(finalize(state))
            }
        }
    }
}

impl From<Transaction> for AuthDigest {
    fn from(transaction: Transaction) -> Self {
        (&transaction).into()
    }
}

impl From<&std::sync::Arc<Transaction>> for AuthDigest {
    fn from(transaction: &std::sync::Arc<Transaction>) -> Self {
        transaction.as_ref().into()
    }
}
