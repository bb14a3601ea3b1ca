//! The proof-primitive boundary.
//!
//! Building Sapling output descriptions, Orchard bundles, and binding
//! signatures requires proving keys and zero-knowledge circuits that live
//! outside this crate. These traits define exactly what the coinbase
//! builder needs from them.
//!
//! # Resource discipline
//!
//! Proving backends usually hold an expensive native proving context.
//! [`SaplingProver::begin`] scopes that context to the returned value:
//! implementations release the context in `Drop`, so it is released
//! exactly once on every exit path through the coinbase builder, whether
//! the build succeeds, fails, or panics.

use thiserror::Error;

use quagga_chain::{
    amount::{Amount, NegativeAllowed, NonNegative},
    orchard,
    primitives::{redjubjub, Bytes32},
    sapling::{self, Zip212Enabled},
    transaction::SigHash,
};

/// The all-zero outgoing viewing key.
///
/// Shielded coinbase outputs must use it, so that they are recoverable by
/// anyone holding the corresponding spending key.
pub const ZERO_OVK: [u8; 32] = [0; 32];

/// Errors from the proving backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProverError {
    /// The proof library rejected the output or bundle inputs.
    #[error("failed to construct shielded proof: {0}")]
    ProofConstructionFailed(String),

    /// The binding-signature routine rejected its inputs.
    #[error("failed to compute binding signature")]
    BindingSigFailed,
}

/// A Sapling proving backend.
pub trait SaplingProver: Send + Sync {
    /// Opens a proving context for one transaction build.
    ///
    /// The context is released when the returned value is dropped.
    fn begin(&self) -> Box<dyn SaplingProvingContext + '_>;
}

/// An open Sapling proving context.
pub trait SaplingProvingContext {
    /// Builds an output description paying `value` to `to`, encrypted
    /// under the outgoing viewing key `ovk`.
    fn build_output(
        &mut self,
        ovk: [u8; 32],
        to: &sapling::PaymentAddress,
        value: Amount<NonNegative>,
        flag: Zip212Enabled,
    ) -> Result<sapling::Output, ProverError>;

    /// Computes the binding signature over `sighash` for the outputs
    /// built so far and the declared `value_balance`.
    fn binding_sig(
        &mut self,
        value_balance: Amount<NegativeAllowed>,
        sighash: &SigHash,
    ) -> Result<redjubjub::Signature<redjubjub::Binding>, ProverError>;
}

/// An Orchard bundle under construction: the action descriptions are
/// final, but proofs and signatures have not been produced yet.
///
/// The transaction sighash can already be computed from this data,
/// because the txid digest excludes authorizing data.
#[derive(Clone, Debug)]
pub struct UnauthorizedOrchardBundle {
    /// The bundle flags.
    pub flags: orchard::Flags,
    /// The net value moved out of the Orchard pool.
    pub value_balance: Amount<NegativeAllowed>,
    /// The spend anchor. Unconstrained (all zeroes) for coinbase bundles,
    /// which cannot spend notes.
    pub anchor: Bytes32,
    /// The action descriptions.
    pub actions: Vec<orchard::Action>,
}

/// An Orchard proving backend.
pub trait OrchardProver: Send + Sync {
    /// Opens a bundle builder.
    ///
    /// For coinbase bundles, `flags` must not enable spends, and `anchor`
    /// is the empty tree root.
    fn begin(&self, flags: orchard::Flags, anchor: Bytes32) -> Box<dyn OrchardBuilder + '_>;

    /// Produces the aggregated proof and signatures for `bundle` over
    /// `sighash`, yielding authorized shielded data ready to install in
    /// the transaction.
    fn prove_and_sign(
        &self,
        bundle: UnauthorizedOrchardBundle,
        sighash: &SigHash,
    ) -> Result<orchard::ShieldedData, ProverError>;
}

/// An open Orchard bundle builder.
pub trait OrchardBuilder {
    /// Adds an output action paying `value` to `to`, encrypted under the
    /// outgoing viewing key `ovk`.
    fn add_output(
        &mut self,
        ovk: [u8; 32],
        to: orchard::Address,
        value: Amount<NonNegative>,
    ) -> Result<(), ProverError>;

    /// Finalizes the action descriptions, padding to the minimum bundle
    /// size if needed.
    fn build(self: Box<Self>) -> Result<UnauthorizedOrchardBundle, ProverError>;
}

#[cfg(any(test, feature = "mock-prover"))]
pub mod mock {
    //! A deterministic prover without zero knowledge, for tests and
    //! regtest template generation.

    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use quagga_chain::primitives::{Groth16Proof, Halo2Proof};

    fn digest(personal: &[u8; 16], inputs: &[&[u8]]) -> [u8; 64] {
        let mut state = blake2b_simd::Params::new()
            .hash_length(64)
            .personal(personal)
            .to_state();
        for input in inputs {
            state.update(input);
        }
        state
            .finalize()
            .as_bytes()
            .try_into()
            .expect("64 byte blake2b digest")
    }

    fn narrow(bytes: [u8; 64]) -> [u8; 32] {
        bytes[..32].try_into().expect("64 >= 32")
    }

    /// A Sapling prover that derives all cryptographic material from its
    /// inputs with plain hashes.
    #[derive(Default)]
    pub struct MockSaplingProver {
        /// The number of proving contexts currently open.
        ///
        /// Tests assert this returns to zero, which is the observable
        /// half of the release-on-every-exit-path discipline.
        open_contexts: AtomicUsize,
    }

    impl MockSaplingProver {
        /// The number of proving contexts currently open.
        pub fn open_contexts(&self) -> usize {
            self.open_contexts.load(Ordering::SeqCst)
        }
    }

    impl SaplingProver for MockSaplingProver {
        fn begin(&self) -> Box<dyn SaplingProvingContext + '_> {
            self.open_contexts.fetch_add(1, Ordering::SeqCst);
            Box::new(MockSaplingContext { prover: self })
        }
    }

    struct MockSaplingContext<'p> {
        prover: &'p MockSaplingProver,
    }

    impl Drop for MockSaplingContext<'_> {
        fn drop(&mut self) {
            self.prover.open_contexts.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl SaplingProvingContext for MockSaplingContext<'_> {
        fn build_output(
            &mut self,
            ovk: [u8; 32],
            to: &sapling::PaymentAddress,
            value: Amount<NonNegative>,
            flag: Zip212Enabled,
        ) -> Result<sapling::Output, ProverError> {
            let lead_byte = match flag {
                Zip212Enabled::BeforeZip212 => [0x01],
                Zip212Enabled::AfterZip212 => [0x02],
            };
            let seed = digest(
                b"QuaggaMockSapOut",
                &[&ovk, &to.to_bytes(), &value.to_bytes(), &lead_byte],
            );

            let mut enc_ciphertext = [0; 580];
            for (chunk, byte) in enc_ciphertext.chunks_mut(64).zip(0u8..) {
                let stream = digest(b"QuaggaMockSapEnc", &[&seed, &[byte]]);
                chunk.copy_from_slice(&stream[..chunk.len()]);
            }
            let mut out_ciphertext = [0; 80];
            let stream = digest(b"QuaggaMockSapOct", &[&seed]);
            out_ciphertext[..64].copy_from_slice(&stream);
            out_ciphertext[64..].copy_from_slice(&digest(b"QuaggaMockSapOc2", &[&seed])[..16]);

            let mut zkproof = [0; 192];
            for (chunk, byte) in zkproof.chunks_mut(64).zip(0u8..) {
                chunk.copy_from_slice(&digest(b"QuaggaMockSapPrf", &[&seed, &[byte]])[..chunk.len()]);
            }

            Ok(sapling::Output {
                cv: Bytes32(narrow(digest(b"QuaggaMockSapCv_", &[&seed]))),
                cm_u: Bytes32(narrow(digest(b"QuaggaMockSapCmu", &[&seed]))),
                ephemeral_key: Bytes32(narrow(digest(b"QuaggaMockSapEpk", &[&seed]))),
                enc_ciphertext: sapling::EncryptedNote(enc_ciphertext),
                out_ciphertext: sapling::WrappedNoteKey(out_ciphertext),
                zkproof: Groth16Proof(zkproof),
            })
        }

        fn binding_sig(
            &mut self,
            value_balance: Amount<NegativeAllowed>,
            sighash: &SigHash,
        ) -> Result<redjubjub::Signature<redjubjub::Binding>, ProverError> {
            Ok(digest(
                b"QuaggaMockSapBsk",
                &[&value_balance.to_bytes(), sighash.as_ref()],
            )
            .into())
        }
    }

    /// An Orchard prover that derives all cryptographic material from its
    /// inputs with plain hashes.
    #[derive(Default)]
    pub struct MockOrchardProver;

    struct MockOrchardBuilder {
        flags: orchard::Flags,
        anchor: Bytes32,
        actions: Vec<orchard::Action>,
        value_balance: i64,
    }

    impl OrchardProver for MockOrchardProver {
        fn begin(&self, flags: orchard::Flags, anchor: Bytes32) -> Box<dyn OrchardBuilder + '_> {
            Box::new(MockOrchardBuilder {
                flags,
                anchor,
                actions: Vec::new(),
                value_balance: 0,
            })
        }

        fn prove_and_sign(
            &self,
            bundle: UnauthorizedOrchardBundle,
            sighash: &SigHash,
        ) -> Result<orchard::ShieldedData, ProverError> {
            let actions: Vec<orchard::AuthorizedAction> = bundle
                .actions
                .iter()
                .map(|action| orchard::AuthorizedAction {
                    action: action.clone(),
                    spend_auth_sig: digest(
                        b"QuaggaMockOrcAut",
                        &[&action.nullifier.0, sighash.as_ref()],
                    )
                    .into(),
                })
                .collect();

            Ok(orchard::ShieldedData {
                flags: bundle.flags,
                value_balance: bundle.value_balance,
                shared_anchor: bundle.anchor,
                proof: Halo2Proof(
                    digest(b"QuaggaMockOrcPrf", &[sighash.as_ref()]).to_vec(),
                ),
                actions: actions
                    .try_into()
                    .expect("mock bundles always have at least two actions"),
                binding_sig: digest(b"QuaggaMockOrcBsk", &[sighash.as_ref()]).into(),
            })
        }
    }

    impl OrchardBuilder for MockOrchardBuilder {
        fn add_output(
            &mut self,
            ovk: [u8; 32],
            to: orchard::Address,
            value: Amount<NonNegative>,
        ) -> Result<(), ProverError> {
            let seed = digest(b"QuaggaMockOrcOut", &[&ovk, &to.0, &value.to_bytes()]);

            let mut enc_ciphertext = [0; 580];
            for (chunk, byte) in enc_ciphertext.chunks_mut(64).zip(0u8..) {
                chunk.copy_from_slice(&digest(b"QuaggaMockOrcEnc", &[&seed, &[byte]])[..chunk.len()]);
            }
            let mut out_ciphertext = [0; 80];
            out_ciphertext[..64].copy_from_slice(&digest(b"QuaggaMockOrcOct", &[&seed]));
            out_ciphertext[64..].copy_from_slice(&digest(b"QuaggaMockOrcOc2", &[&seed])[..16]);

            self.actions.push(orchard::Action {
                cv: Bytes32(narrow(digest(b"QuaggaMockOrcCv_", &[&seed]))),
                nullifier: Bytes32(narrow(digest(b"QuaggaMockOrcNf_", &[&seed]))),
                rk: Bytes32(narrow(digest(b"QuaggaMockOrcRk_", &[&seed]))),
                cm_x: Bytes32(narrow(digest(b"QuaggaMockOrcCmx", &[&seed]))),
                ephemeral_key: Bytes32(narrow(digest(b"QuaggaMockOrcEpk", &[&seed]))),
                enc_ciphertext: orchard::EncryptedNote(enc_ciphertext),
                out_ciphertext: orchard::WrappedNoteKey(out_ciphertext),
            });
            self.value_balance -= value.zatoshis();

            Ok(())
        }

        fn build(self: Box<Self>) -> Result<UnauthorizedOrchardBundle, ProverError> {
            if self.actions.is_empty() {
                return Err(ProverError::ProofConstructionFailed(
                    "orchard bundles need at least one action".to_string(),
                ));
            }

            Ok(UnauthorizedOrchardBundle {
                flags: self.flags,
                value_balance: self
                    .value_balance
                    .try_into()
                    .expect("output values stay within the money supply"),
                anchor: self.anchor,
                actions: self.actions,
            })
        }
    }
}
