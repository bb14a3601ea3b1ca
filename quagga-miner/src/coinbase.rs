//! Coinbase transaction construction.
//!
//! The coinbase carries the miner's share of the block subsidy plus all
//! founders' reward or funding stream outputs, pays accumulated mempool
//! fees to the miner, and binds everything with the Sapling binding
//! signature (and, for Orchard recipients, an authorized Orchard bundle).

use rand::RngCore;
use thiserror::Error;
use tracing::debug;

use quagga_chain::{
    amount::{self, Amount, NonNegative},
    block::Height,
    orchard,
    parameters::{
        subsidy::{self, FundingStreamRecipient},
        Network, NetworkUpgrade,
    },
    primitives::Bytes32,
    sapling::{self, Zip212Enabled},
    transaction::{HashType, LockTime, SigHash, Transaction},
    transparent,
};

use crate::{
    address::MinerAddress,
    prover::{
        OrchardProver, ProverError, SaplingProver, SaplingProvingContext, ZERO_OVK,
    },
};

/// Errors from coinbase construction.
#[derive(Error, Debug)]
pub enum CoinbaseError {
    /// A Sapling output or Orchard bundle could not be built.
    ///
    /// The proving context has already been released when this is
    /// returned.
    #[error(transparent)]
    Prover(#[from] ProverError),

    /// Reward arithmetic left the valid amount range.
    #[error("coinbase reward calculation failed: {0}")]
    Amount(#[from] amount::Error),
}

/// Constructs the coinbase transaction for a block at `height` paying
/// `fees` to `miner_address`.
///
/// The resulting transaction:
/// - has exactly one input, with a null outpoint and a script encoding
///   `height` followed by `OP_0` (the extra nonce is written in later by
///   the mining loop);
/// - pays the block subsidy minus the founders' reward or funding stream
///   deductions, plus `fees`, to the miner;
/// - carries all funding stream outputs, each dispatched on its recipient
///   flavor;
/// - is fully authorized: Sapling outputs carry proofs and a binding
///   signature, Orchard recipients get an authorized bundle.
pub fn create_coinbase_transaction(
    network: Network,
    height: Height,
    fees: Amount<NonNegative>,
    miner_address: &MinerAddress,
    sapling_prover: &dyn SaplingProver,
    orchard_prover: &dyn OrchardProver,
) -> Result<Transaction, CoinbaseError> {
    // ZIP-203: from NU5 onwards, nExpiryHeight is set to the block height
    // in coinbase transactions. Before NU5 it is zero, so expiry does not
    // apply.
    let nu5_active = NetworkUpgrade::Nu5.is_active_at(network, height);
    let expiry_height = if nu5_active { height } else { Height(0) };

    let input = transparent::Input::Coinbase {
        height,
        data: transparent::CoinbaseData::new(height, vec![0x00])
            .expect("a one-byte script tail always fits"),
        sequence: 0xffff_ffff,
    };

    match miner_address {
        MinerAddress::Orchard(to) => build_orchard_coinbase(
            network,
            height,
            fees,
            *to,
            input,
            expiry_height,
            sapling_prover,
            orchard_prover,
        ),
        MinerAddress::Sapling(to) => build_sapling_coinbase(
            network,
            height,
            fees,
            to,
            input,
            expiry_height,
            sapling_prover,
        ),
        MinerAddress::Transparent(script) => build_transparent_coinbase(
            network,
            height,
            fees,
            script,
            input,
            expiry_height,
            sapling_prover,
        ),
    }
}

/// Returns the ZIP-212 note plaintext flag for `height`.
fn zip212_flag(network: Network, height: Height) -> Zip212Enabled {
    if NetworkUpgrade::Canopy.is_active_at(network, height) {
        Zip212Enabled::AfterZip212
    } else {
        Zip212Enabled::BeforeZip212
    }
}

/// The in-progress transparent and Sapling components of a coinbase.
struct CoinbaseOutputs {
    outputs: Vec<transparent::Output>,
    sapling_outputs: Vec<sapling::Output>,
    value_balance_sapling: Amount,
}

/// Determine the block subsidy split: append the founders' reward or
/// funding stream outputs to `outputs`, and return the miner's share
/// (subsidy minus deductions, plus `fees`).
///
/// `SetFoundersRewardAndGetMinerValue` in zcashd.
fn set_founders_reward_and_get_miner_value(
    network: Network,
    height: Height,
    fees: Amount<NonNegative>,
    outputs: &mut CoinbaseOutputs,
    sapling_ctx: &mut dyn SaplingProvingContext,
) -> Result<Amount<NonNegative>, CoinbaseError> {
    let block_subsidy = subsidy::block_subsidy(height, network)?;
    let mut miner_reward = block_subsidy;

    if NetworkUpgrade::Canopy.is_active_at(network, height) {
        for element in subsidy::funding_stream_elements(height, network, block_subsidy)? {
            miner_reward = (miner_reward - element.value)?;

            match element.recipient {
                FundingStreamRecipient::Transparent(script) => {
                    outputs.outputs.push(transparent::Output {
                        value: element.value,
                        lock_script: script,
                    });
                }
                FundingStreamRecipient::Sapling(address) => {
                    // Shielded coinbase outputs must be recoverable with
                    // the all-zero outgoing viewing key.
                    let output = sapling_ctx.build_output(
                        ZERO_OVK,
                        &address,
                        element.value,
                        zip212_flag(network, height),
                    )?;
                    outputs.sapling_outputs.push(output);
                    outputs.value_balance_sapling =
                        (outputs.value_balance_sapling - element.value.constrain()?)?;
                }
            }
        }
    } else if height <= subsidy::last_founders_reward_height(network) {
        // The founders' reward is 20% of the block subsidy.
        let founders_reward = subsidy::founders_reward(height, network)?;
        miner_reward = (miner_reward - founders_reward)?;
        outputs.outputs.push(transparent::Output {
            value: founders_reward,
            lock_script: subsidy::founders_reward_script(height, network),
        });
    } else {
        // The founders' reward ends without replacement if Canopy is not
        // activated by the last founders' reward block height + 1.
    }

    Ok((miner_reward + fees)?)
}

/// Assemble a v4 transaction from the collected outputs and compute its
/// binding signature, if it carries any Sapling outputs.
fn finish_v4_coinbase(
    network: Network,
    height: Height,
    input: transparent::Input,
    expiry_height: Height,
    outputs: CoinbaseOutputs,
    sapling_ctx: &mut dyn SaplingProvingContext,
) -> Result<Transaction, CoinbaseError> {
    let sapling_shielded_data = if outputs.sapling_outputs.is_empty() {
        None
    } else {
        // Placeholder signature, replaced below once the sighash over the
        // finished transaction effects is known.
        Some(sapling::ShieldedData {
            value_balance: outputs.value_balance_sapling,
            shared_anchor: None,
            spends: vec![],
            outputs: outputs.sapling_outputs,
            binding_sig: [0; 64].into(),
        })
    };

    let mut transaction = Transaction::V4 {
        inputs: vec![input],
        outputs: outputs.outputs,
        lock_time: LockTime::unlocked(),
        expiry_height,
        joinsplit_data: None,
        sapling_shielded_data,
    };

    if transaction.sapling_shielded_data().is_some() {
        let sighash = coinbase_sighash(network, height, &transaction);
        let binding_sig =
            sapling_ctx.binding_sig(transaction.sapling_value_balance(), &sighash)?;

        if let Transaction::V4 {
            sapling_shielded_data: Some(ref mut shielded_data),
            ..
        } = transaction
        {
            shielded_data.binding_sig = binding_sig;
        }
    }

    Ok(transaction)
}

/// Compute the data to be signed by the coinbase's binding signatures.
///
/// With an Orchard bundle present this is the ZIP-244 signature digest;
/// otherwise it is the ZIP-243 transparent signature hash with
/// `SIGHASH_ALL` and the current epoch branch id. In both cases the
/// binding signatures do not sign any transparent input.
fn coinbase_sighash(network: Network, height: Height, transaction: &Transaction) -> SigHash {
    let upgrade = NetworkUpgrade::current(network, height);
    transaction.sighash(upgrade, HashType::ALL, None)
}

/// Create a transparent-recipient coinbase.
///
/// The miner output is `vout[0]`; founders' reward and funding stream
/// outputs follow. Funding streams to Sapling recipients still produce
/// shielded outputs, so a binding signature may be needed even here.
#[allow(clippy::too_many_arguments)]
fn build_transparent_coinbase(
    network: Network,
    height: Height,
    fees: Amount<NonNegative>,
    script: &transparent::Script,
    input: transparent::Input,
    expiry_height: Height,
    sapling_prover: &dyn SaplingProver,
) -> Result<Transaction, CoinbaseError> {
    let mut ctx = sapling_prover.begin();

    let mut outputs = CoinbaseOutputs {
        // Reserve the miner output slot at index 0.
        outputs: vec![transparent::Output {
            value: Amount::zero(),
            lock_script: script.clone(),
        }],
        sapling_outputs: vec![],
        value_balance_sapling: Amount::zero(),
    };

    let miner_reward =
        set_founders_reward_and_get_miner_value(network, height, fees, &mut outputs, ctx.as_mut())?;

    // Now fill in the miner's output.
    outputs.outputs[0].value = miner_reward;

    debug!(?height, %miner_reward, "built transparent coinbase outputs");

    finish_v4_coinbase(network, height, input, expiry_height, outputs, ctx.as_mut())
}

/// Create a Sapling-recipient coinbase: one output description for the
/// full miner amount, with the all-zero outgoing viewing key.
#[allow(clippy::too_many_arguments)]
fn build_sapling_coinbase(
    network: Network,
    height: Height,
    fees: Amount<NonNegative>,
    to: &sapling::PaymentAddress,
    input: transparent::Input,
    expiry_height: Height,
    sapling_prover: &dyn SaplingProver,
) -> Result<Transaction, CoinbaseError> {
    let mut ctx = sapling_prover.begin();

    let mut outputs = CoinbaseOutputs {
        outputs: vec![],
        sapling_outputs: vec![],
        value_balance_sapling: Amount::zero(),
    };

    let miner_reward =
        set_founders_reward_and_get_miner_value(network, height, fees, &mut outputs, ctx.as_mut())?;

    let miner_output = ctx.build_output(
        ZERO_OVK,
        to,
        miner_reward,
        zip212_flag(network, height),
    )?;
    outputs.sapling_outputs.push(miner_output);
    outputs.value_balance_sapling =
        (outputs.value_balance_sapling - miner_reward.constrain()?)?;

    debug!(?height, %miner_reward, "built sapling coinbase outputs");

    finish_v4_coinbase(network, height, input, expiry_height, outputs, ctx.as_mut())
}

/// Create an Orchard-recipient coinbase: a v5 transaction with one action
/// paying the miner, plus one mandatory zero-value dummy output.
#[allow(clippy::too_many_arguments)]
fn build_orchard_coinbase(
    network: Network,
    height: Height,
    fees: Amount<NonNegative>,
    to: orchard::Address,
    input: transparent::Input,
    expiry_height: Height,
    sapling_prover: &dyn SaplingProver,
    orchard_prover: &dyn OrchardProver,
) -> Result<Transaction, CoinbaseError> {
    let mut sapling_ctx = sapling_prover.begin();

    // `ENABLE_SPENDS` must not be set for coinbase transactions. This
    // means the Orchard anchor is unconstrained, so we set it to the
    // empty tree root via an all-zero encoding.
    let mut builder = orchard_prover.begin(orchard::Flags::ENABLE_OUTPUTS, Bytes32([0; 32]));

    let mut outputs = CoinbaseOutputs {
        outputs: vec![],
        sapling_outputs: vec![],
        value_balance_sapling: Amount::zero(),
    };

    let miner_reward = set_founders_reward_and_get_miner_value(
        network,
        height,
        fees,
        &mut outputs,
        sapling_ctx.as_mut(),
    )?;

    // Shielded coinbase outputs must be recoverable with an all-zero OVK.
    builder.add_output(ZERO_OVK, to, miner_reward)?;

    // The bundle builder pads to two actions using a "no OVK" policy for
    // dummy outputs, which violates coinbase rules requiring all shielded
    // outputs to be recoverable. We manually add a zero-value dummy output
    // with the all-zero OVK to sidestep this issue.
    //
    // TODO: if funding streams ever pay Orchard recipients, this dummy
    // output can be removed.
    let mut dummy_to = [0; 43];
    rand::thread_rng().fill_bytes(&mut dummy_to);
    builder.add_output(ZERO_OVK, orchard::Address(dummy_to), Amount::zero())?;

    let bundle = builder.build()?;

    // Install the unauthorized bundle so the sighash can be computed: the
    // ZIP-244 digest covers the action descriptions but not the proof or
    // signatures, so placeholder authorization does not change it.
    let placeholder_actions: Vec<orchard::AuthorizedAction> = bundle
        .actions
        .iter()
        .map(|action| orchard::AuthorizedAction {
            action: action.clone(),
            spend_auth_sig: [0; 64].into(),
        })
        .collect();

    let mut transaction = Transaction::V5 {
        network_upgrade: NetworkUpgrade::current(network, height),
        lock_time: LockTime::unlocked(),
        expiry_height,
        inputs: vec![input],
        outputs: outputs.outputs,
        sapling_shielded_data: if outputs.sapling_outputs.is_empty() {
            None
        } else {
            Some(sapling::ShieldedData {
                value_balance: outputs.value_balance_sapling,
                shared_anchor: None,
                spends: vec![],
                outputs: outputs.sapling_outputs,
                binding_sig: [0; 64].into(),
            })
        },
        orchard_shielded_data: Some(orchard::ShieldedData {
            flags: bundle.flags,
            value_balance: bundle.value_balance,
            shared_anchor: bundle.anchor,
            proof: quagga_chain::primitives::Halo2Proof(vec![]),
            actions: placeholder_actions
                .try_into()
                .expect("the miner output and the dummy make at least two actions"),
            binding_sig: [0; 64].into(),
        }),
    };

    // Hash the transaction with the ZIP-244 signature-hash algorithm and
    // use the digest to authorize the Orchard bundle.
    let sighash = coinbase_sighash(network, height, &transaction);
    let authorized = orchard_prover.prove_and_sign(bundle, &sighash)?;

    let sapling_binding_sig = if transaction.sapling_shielded_data().is_some() {
        Some(sapling_ctx.binding_sig(transaction.sapling_value_balance(), &sighash)?)
    } else {
        None
    };

    if let Transaction::V5 {
        ref mut orchard_shielded_data,
        ref mut sapling_shielded_data,
        ..
    } = transaction
    {
        *orchard_shielded_data = Some(authorized);
        if let (Some(shielded_data), Some(binding_sig)) =
            (sapling_shielded_data.as_mut(), sapling_binding_sig)
        {
            shielded_data.binding_sig = binding_sig;
        }
    }

    debug!(?height, %miner_reward, "built orchard coinbase");

    Ok(transaction)
}

#[cfg(test)]
mod tests {
    use super::*;

    use quagga_chain::parameters::subsidy::{
        block_subsidy, funding_stream_elements, miner_subsidy,
    };

    use crate::prover::mock::{MockOrchardProver, MockSaplingProver};

    fn provers() -> (MockSaplingProver, MockOrchardProver) {
        (MockSaplingProver::default(), MockOrchardProver)
    }

    fn build(
        network: Network,
        height: Height,
        fees: Amount<NonNegative>,
        miner_address: &MinerAddress,
    ) -> Transaction {
        let (sapling, orchard) = provers();
        let coinbase = create_coinbase_transaction(
            network, height, fees, miner_address, &sapling, &orchard,
        )
        .expect("coinbase builds");
        assert_eq!(sapling.open_contexts(), 0, "proving context must be released");
        coinbase
    }

    /// The height used by most tests: Canopy is active, NU5 is not.
    const CANOPY_HEIGHT: Height = Height(1_100_000);

    /// A height after NU5 activation on Mainnet.
    const NU5_HEIGHT: Height = Height(1_700_000);

    #[test]
    fn transparent_coinbase_splits_subsidy_with_funding_streams() {
        let network = Network::Mainnet;
        let fees = Amount::try_from(5_000).unwrap();
        let miner_script = transparent::Script::pay_to_public_key_hash(&[9; 20]);

        let coinbase = build(
            network,
            CANOPY_HEIGHT,
            fees,
            &MinerAddress::Transparent(miner_script.clone()),
        );

        assert!(coinbase.is_coinbase());
        assert_eq!(coinbase.version(), 4);
        // pre-NU5 coinbases have expiry height zero
        assert_eq!(coinbase.expiry_height(), Height(0));

        let subsidy = block_subsidy(CANOPY_HEIGHT, network).unwrap();
        let elements = funding_stream_elements(CANOPY_HEIGHT, network, subsidy).unwrap();

        // one funding stream pays Sapling, two pay transparent scripts
        let transparent_streams: Vec<_> = elements
            .iter()
            .filter_map(|element| match &element.recipient {
                FundingStreamRecipient::Transparent(script) => {
                    Some((element.value, script.clone()))
                }
                FundingStreamRecipient::Sapling(_) => None,
            })
            .collect();
        let sapling_stream_total: Amount<NonNegative> = elements
            .iter()
            .filter_map(|element| match &element.recipient {
                FundingStreamRecipient::Sapling(_) => Some(element.value),
                FundingStreamRecipient::Transparent(_) => None,
            })
            .sum::<Result<_, _>>()
            .unwrap();

        // miner output at index 0, funding stream outputs follow
        assert_eq!(coinbase.outputs().len(), 1 + transparent_streams.len());
        let stream_total: Amount<NonNegative> =
            elements.iter().map(|e| e.value).sum::<Result<_, _>>().unwrap();
        let expected_miner_reward =
            (miner_subsidy(CANOPY_HEIGHT, network, Some(stream_total)).unwrap() + fees).unwrap();
        assert_eq!(coinbase.outputs()[0].value, expected_miner_reward);
        assert_eq!(coinbase.outputs()[0].lock_script, miner_script);

        for ((value, script), output) in
            transparent_streams.iter().zip(&coinbase.outputs()[1..])
        {
            assert_eq!(&output.value, value);
            assert_eq!(&output.lock_script, script);
        }

        // the Sapling stream decremented the value balance
        let shielded_data = coinbase.sapling_shielded_data().unwrap();
        assert_eq!(shielded_data.outputs.len(), 1);
        assert_eq!(
            coinbase.sapling_value_balance(),
            -sapling_stream_total.zatoshis(),
        );

        // total issuance: transparent outputs plus shielded outflow equal
        // subsidy plus fees
        let transparent_total: Amount<NonNegative> = coinbase
            .outputs()
            .iter()
            .map(|output| output.value)
            .sum::<Result<_, _>>()
            .unwrap();
        let shielded_outflow = -coinbase.sapling_value_balance().zatoshis();
        assert_eq!(
            transparent_total.zatoshis() + shielded_outflow,
            (subsidy + fees).unwrap().zatoshis(),
        );
    }

    #[test]
    fn founders_reward_era_pays_a_fifth() {
        let network = Network::Mainnet;
        let height = Height(500_000);
        let miner_script = transparent::Script::pay_to_public_key_hash(&[9; 20]);

        let coinbase = build(
            network,
            height,
            Amount::zero(),
            &MinerAddress::Transparent(miner_script),
        );

        let subsidy = block_subsidy(height, network).unwrap();
        let founders = (subsidy / 5).unwrap();

        assert_eq!(coinbase.outputs().len(), 2);
        assert_eq!(
            coinbase.outputs()[0].value,
            (subsidy - founders).unwrap(),
        );
        assert_eq!(coinbase.outputs()[1].value, founders);
        assert!(coinbase.sapling_shielded_data().is_none());
    }

    #[test]
    fn sapling_coinbase_pays_full_reward_shielded() {
        let network = Network::Mainnet;
        let fees = Amount::try_from(1_234).unwrap();
        let to = sapling::PaymentAddress::from_bytes([5; 43]);

        let coinbase = build(network, CANOPY_HEIGHT, fees, &MinerAddress::Sapling(to));

        // no transparent outputs, all value flows into the Sapling pool
        let funding_transparent = coinbase.outputs().len();
        assert_eq!(funding_transparent, 2, "two transparent funding streams");

        let shielded_data = coinbase.sapling_shielded_data().unwrap();
        // the miner output plus one Sapling funding stream output
        assert_eq!(shielded_data.outputs.len(), 2);

        let subsidy = block_subsidy(CANOPY_HEIGHT, network).unwrap();
        let transparent_total: Amount<NonNegative> = coinbase
            .outputs()
            .iter()
            .map(|output| output.value)
            .sum::<Result<_, _>>()
            .unwrap();
        let shielded_outflow = -coinbase.sapling_value_balance().zatoshis();
        assert_eq!(
            transparent_total.zatoshis() + shielded_outflow,
            (subsidy + fees).unwrap().zatoshis(),
        );
    }

    #[test]
    fn orchard_coinbase_has_dummy_output_and_expiry() {
        let network = Network::Mainnet;
        let to = orchard::Address([7; 43]);

        let coinbase = build(
            network,
            NU5_HEIGHT,
            Amount::zero(),
            &MinerAddress::Orchard(to),
        );

        assert_eq!(coinbase.version(), 5);
        // ZIP-203: post-NU5 coinbases expire at their own height
        assert_eq!(coinbase.expiry_height(), NU5_HEIGHT);

        let orchard_data = coinbase.orchard_shielded_data().unwrap();
        // the miner action plus the mandatory zero-value dummy
        assert_eq!(orchard_data.actions.len(), 2);
        assert!(!orchard_data.flags.contains(orchard::Flags::ENABLE_SPENDS));

        // the orchard pool gains the miner reward minus funding streams
        let subsidy = block_subsidy(NU5_HEIGHT, network).unwrap();
        let streams = funding_stream_elements(NU5_HEIGHT, network, subsidy).unwrap();
        let stream_total: Amount<NonNegative> =
            streams.iter().map(|e| e.value).sum::<Result<_, _>>().unwrap();
        let miner_reward = miner_subsidy(NU5_HEIGHT, network, Some(stream_total)).unwrap();
        assert_eq!(
            coinbase.orchard_value_balance().zatoshis(),
            -miner_reward.zatoshis(),
        );
    }

    #[test]
    fn coinbase_script_is_height_then_op_0() {
        let coinbase = build(
            Network::Mainnet,
            CANOPY_HEIGHT,
            Amount::zero(),
            &MinerAddress::Transparent(transparent::Script::pay_to_public_key_hash(&[9; 20])),
        );

        match &coinbase.inputs()[0] {
            transparent::Input::Coinbase {
                height,
                data,
                sequence,
            } => {
                assert_eq!(*height, CANOPY_HEIGHT);
                assert_eq!(data.as_ref(), &[0x00][..]);
                assert_eq!(*sequence, 0xffff_ffff);
            }
            _ => panic!("coinbase transactions start with a coinbase input"),
        }
    }
}
