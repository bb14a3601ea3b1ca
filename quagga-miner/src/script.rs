//! Script verification for template candidates.
//!
//! Selection must not admit a transaction whose unlock scripts no longer
//! satisfy the outputs they spend, so every candidate input is verified
//! against the current view with the mandatory verify flags and the
//! current consensus branch id before acceptance.
//!
//! Full script execution lives in a consensus backend (historically a
//! wrapper around the C++ `zcash_script` interpreter); [`ScriptVerifier`]
//! is the seam it plugs into, shaped like that wrapper's `verify_script`
//! entry point. The built-in [`StandardVerifier`] enforces the structural
//! half of the mandatory rules — P2SH redeem script hash binding, P2PKH
//! public key hash binding, and push-only unlock scripts where required —
//! which is what template assembly needs on top of the full interpreter
//! run every transaction already passed at mempool admission.

use bitflags::bitflags;
use thiserror::Error;

use quagga_chain::{
    parameters::ConsensusBranchId,
    transaction::Transaction,
    transparent,
};

bitflags! {
    /// Script verification flags.
    ///
    /// `SCRIPT_VERIFY_*` in zcashd.
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    pub struct VerifyFlags: u32 {
        /// Evaluate pay-to-script-hash subscripts.
        const P2SH = 1 << 0;
        /// Enforce `OP_CHECKLOCKTIMEVERIFY`.
        const CHECKLOCKTIMEVERIFY = 1 << 9;
    }
}

/// The flags every block transaction must verify under.
///
/// `MANDATORY_SCRIPT_VERIFY_FLAGS` in zcashd: failing a script check with
/// these flags makes the whole block invalid.
pub const MANDATORY_VERIFY_FLAGS: VerifyFlags =
    VerifyFlags::P2SH.union(VerifyFlags::CHECKLOCKTIMEVERIFY);

/// Errors from script verification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScriptError {
    /// The input has no unlock script to verify.
    #[error("input {input_index} has no unlock script")]
    MissingUnlockScript {
        /// The index of the offending input.
        input_index: usize,
    },

    /// An unlock script that must be push-only contains other operations.
    #[error("unlock script for input {input_index} is not push-only")]
    NotPushOnly {
        /// The index of the offending input.
        input_index: usize,
    },

    /// The redeem script does not hash to the P2SH output's script hash.
    #[error("redeem script for input {input_index} does not match the output's script hash")]
    RedeemScriptMismatch {
        /// The index of the offending input.
        input_index: usize,
    },

    /// The public key does not hash to the P2PKH output's key hash.
    #[error("public key for input {input_index} does not match the output's key hash")]
    PubKeyMismatch {
        /// The index of the offending input.
        input_index: usize,
    },

    /// The script system rejected the input for a backend-specific reason.
    #[error("script verification failed for input {input_index}: {reason}")]
    Invalid {
        /// The index of the offending input.
        input_index: usize,
        /// The backend's failure description.
        reason: String,
    },
}

/// Everything a backend needs to verify one transparent input.
///
/// The same data the consensus script interpreter takes: the spending
/// transaction, the input being checked, the output it spends, the
/// verification flags, and the consensus branch id (signatures commit to
/// the branch id, so verification outcomes can change at an upgrade
/// boundary).
#[derive(Clone, Debug)]
pub struct VerifyInput<'a> {
    /// The transaction the input belongs to.
    pub transaction: &'a Transaction,
    /// The index of the input within the transaction.
    pub input_index: usize,
    /// The output the input spends.
    pub spent_output: &'a transparent::Output,
    /// The flags to verify under.
    pub flags: VerifyFlags,
    /// The consensus branch id at the spend height.
    pub branch_id: ConsensusBranchId,
}

/// A script verification backend.
pub trait ScriptVerifier: Send + Sync {
    /// Verify that the input's unlock script satisfies the output it
    /// spends, under the request's flags and branch id.
    fn verify_input(&self, request: VerifyInput<'_>) -> Result<(), ScriptError>;
}

/// The built-in structural verifier.
///
/// Checks the hash bindings and form rules of the standard script
/// templates; signature checks belong to the full interpreter backend.
/// Lock scripts in no standard form are accepted as-is, like any other
/// script the templates cannot interpret.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardVerifier;

impl ScriptVerifier for StandardVerifier {
    fn verify_input(&self, request: VerifyInput<'_>) -> Result<(), ScriptError> {
        let VerifyInput {
            transaction,
            input_index,
            spent_output,
            flags,
            // structural checks are branch-independent; a signature-level
            // backend uses the branch id in its sighashes
            branch_id: _,
        } = request;

        let unlock_script = transaction
            .inputs()
            .get(input_index)
            .and_then(transparent::Input::unlock_script)
            .ok_or(ScriptError::MissingUnlockScript { input_index })?;
        let lock_script = &spent_output.lock_script;

        if flags.contains(VerifyFlags::P2SH) {
            if let Some(script_hash) = lock_script.pay_to_script_hash_target() {
                // P2SH unlock scripts must be push-only, and the last push
                // is the redeem script, which must hash to the output's
                // script hash.
                let pushes = unlock_script
                    .push_data()
                    .ok_or(ScriptError::NotPushOnly { input_index })?;
                let redeem_script = pushes
                    .last()
                    .ok_or(ScriptError::RedeemScriptMismatch { input_index })?;

                if hash160(redeem_script) != script_hash {
                    return Err(ScriptError::RedeemScriptMismatch { input_index });
                }

                return Ok(());
            }
        }

        if let Some(pub_key_hash) = lock_script.pay_to_public_key_hash_target() {
            // P2PKH unlock scripts push a signature and a public key; the
            // key must hash to the output's key hash.
            let pushes = unlock_script
                .push_data()
                .ok_or(ScriptError::NotPushOnly { input_index })?;
            let [.., signature, pub_key] = pushes.as_slice() else {
                return Err(ScriptError::PubKeyMismatch { input_index });
            };

            if signature.is_empty() || hash160(pub_key) != pub_key_hash {
                return Err(ScriptError::PubKeyMismatch { input_index });
            }
        }

        Ok(())
    }
}

/// The Bitcoin `Hash160`: RIPEMD-160 of SHA-256.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    use ripemd::Ripemd160;
    use sha2::{Digest, Sha256};

    let digest = Ripemd160::digest(Sha256::digest(data));
    digest.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    use quagga_chain::{
        block::Height,
        parameters::NetworkUpgrade,
        transaction::LockTime,
        transparent::{OutPoint, Script},
    };

    fn branch_id() -> ConsensusBranchId {
        NetworkUpgrade::Nu5.branch_id().expect("NU5 has a branch id")
    }

    fn spending_tx(unlock_script: Script) -> Transaction {
        Transaction::V4 {
            inputs: vec![transparent::Input::PrevOut {
                outpoint: OutPoint {
                    hash: quagga_chain::transaction::Hash([1; 32]),
                    index: 0,
                },
                unlock_script,
                sequence: 0,
            }],
            outputs: vec![],
            lock_time: LockTime::unlocked(),
            expiry_height: Height(0),
            joinsplit_data: None,
            sapling_shielded_data: None,
        }
    }

    fn verify(unlock_script: Script, lock_script: Script) -> Result<(), ScriptError> {
        let transaction = spending_tx(unlock_script);
        let spent_output = transparent::Output {
            value: 1_000.try_into().unwrap(),
            lock_script,
        };

        StandardVerifier.verify_input(VerifyInput {
            transaction: &transaction,
            input_index: 0,
            spent_output: &spent_output,
            flags: MANDATORY_VERIFY_FLAGS,
            branch_id: branch_id(),
        })
    }

    fn push(data: &[u8]) -> Vec<u8> {
        let mut bytes = vec![data.len() as u8];
        bytes.extend_from_slice(data);
        bytes
    }

    #[test]
    fn p2pkh_requires_a_matching_key() {
        let pub_key = [7u8; 33];
        let lock_script = Script::pay_to_public_key_hash(&hash160(&pub_key));

        let mut unlock = push(&[0x30; 71]);
        unlock.extend(push(&pub_key));
        assert_eq!(verify(Script::new(&unlock), lock_script.clone()), Ok(()));

        // a different key fails the hash binding
        let mut unlock = push(&[0x30; 71]);
        unlock.extend(push(&[8u8; 33]));
        assert_eq!(
            verify(Script::new(&unlock), lock_script),
            Err(ScriptError::PubKeyMismatch { input_index: 0 }),
        );
    }

    #[test]
    fn p2sh_requires_the_matching_redeem_script() {
        let redeem_script = vec![0x51];
        let lock_script = Script::pay_to_script_hash(&hash160(&redeem_script));

        let unlock = push(&redeem_script);
        assert_eq!(verify(Script::new(&unlock), lock_script.clone()), Ok(()));

        let wrong_unlock = push(&[0x52]);
        assert_eq!(
            verify(Script::new(&wrong_unlock), lock_script.clone()),
            Err(ScriptError::RedeemScriptMismatch { input_index: 0 }),
        );

        // a non-push unlock script is rejected outright
        let mut non_push = push(&redeem_script);
        non_push.push(0xac);
        assert_eq!(
            verify(Script::new(&non_push), lock_script),
            Err(ScriptError::NotPushOnly { input_index: 0 }),
        );
    }

    #[test]
    fn unrecognized_lock_scripts_are_accepted() {
        let lock_script = Script::new(&[0x00; 40]);
        assert_eq!(verify(Script::new(&[]), lock_script), Ok(()));
    }
}
