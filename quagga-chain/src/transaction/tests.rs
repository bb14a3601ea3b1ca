use std::sync::Arc;

use crate::{
    amount::Amount,
    block::Height,
    orchard,
    parameters::NetworkUpgrade,
    primitives::{Bytes32, Groth16Proof, Halo2Proof},
    sapling,
    serialization::{ZcashDeserializeInto, ZcashSerialize},
    transparent,
};

use super::*;

fn coinbase_input(height: u32) -> transparent::Input {
    transparent::Input::Coinbase {
        height: Height(height),
        data: transparent::CoinbaseData::new(Height(height), vec![0x00]).unwrap(),
        sequence: 0xffff_ffff,
    }
}

fn prevout_input(hash_byte: u8, index: u32) -> transparent::Input {
    transparent::Input::PrevOut {
        outpoint: transparent::OutPoint {
            hash: Hash([hash_byte; 32]),
            index,
        },
        unlock_script: transparent::Script::new(&[0x51]),
        sequence: 0,
    }
}

fn output(value: i64) -> transparent::Output {
    transparent::Output {
        value: value.try_into().unwrap(),
        lock_script: transparent::Script::pay_to_public_key_hash(&[7; 20]),
    }
}

fn sapling_output(cm_byte: u8) -> sapling::Output {
    sapling::Output {
        cv: Bytes32([1; 32]),
        cm_u: Bytes32([cm_byte; 32]),
        ephemeral_key: Bytes32([3; 32]),
        enc_ciphertext: sapling::EncryptedNote([4; 580]),
        out_ciphertext: sapling::WrappedNoteKey([5; 80]),
        zkproof: Groth16Proof([6; 192]),
    }
}

fn orchard_action() -> orchard::AuthorizedAction {
    orchard::AuthorizedAction {
        action: orchard::Action {
            cv: Bytes32([1; 32]),
            nullifier: Bytes32([2; 32]),
            rk: Bytes32([3; 32]),
            cm_x: Bytes32([4; 32]),
            ephemeral_key: Bytes32([5; 32]),
            enc_ciphertext: orchard::EncryptedNote([6; 580]),
            out_ciphertext: orchard::WrappedNoteKey([7; 80]),
        },
        spend_auth_sig: [8; 64].into(),
    }
}

fn v4_transparent_only() -> Transaction {
    Transaction::V4 {
        inputs: vec![prevout_input(9, 0)],
        outputs: vec![output(50_000)],
        lock_time: LockTime::unlocked(),
        expiry_height: Height(0),
        joinsplit_data: None,
        sapling_shielded_data: None,
    }
}

fn v4_with_sapling() -> Transaction {
    Transaction::V4 {
        inputs: vec![],
        outputs: vec![output(10_000)],
        lock_time: LockTime::unlocked(),
        expiry_height: Height(1_100_000),
        joinsplit_data: None,
        sapling_shielded_data: Some(sapling::ShieldedData {
            value_balance: 20_000.try_into().unwrap(),
            shared_anchor: None,
            spends: vec![sapling::Spend {
                cv: Bytes32([1; 32]),
                per_spend_anchor: sapling::tree::Root([2; 32]),
                nullifier: Bytes32([3; 32]),
                rk: Bytes32([4; 32]),
                zkproof: Groth16Proof([5; 192]),
                spend_auth_sig: [6; 64].into(),
            }],
            outputs: vec![sapling_output(0x20)],
            binding_sig: [9; 64].into(),
        }),
    }
}

fn v5_coinbase_with_orchard() -> Transaction {
    Transaction::V5 {
        network_upgrade: NetworkUpgrade::Nu5,
        lock_time: LockTime::unlocked(),
        expiry_height: Height(1_700_000),
        inputs: vec![coinbase_input(1_700_000)],
        outputs: vec![],
        sapling_shielded_data: None,
        orchard_shielded_data: Some(orchard::ShieldedData {
            flags: orchard::Flags::ENABLE_OUTPUTS,
            value_balance: (-312_500_000).try_into().unwrap(),
            shared_anchor: Bytes32([0; 32]),
            proof: Halo2Proof(vec![1, 2, 3, 4]),
            actions: crate::at_least_one![orchard_action(), orchard_action()],
            binding_sig: [5; 64].into(),
        }),
    }
}

fn v5_with_sapling_outputs() -> Transaction {
    Transaction::V5 {
        network_upgrade: NetworkUpgrade::Nu5,
        lock_time: LockTime::unlocked(),
        expiry_height: Height(1_700_001),
        inputs: vec![prevout_input(8, 1)],
        outputs: vec![output(90_000)],
        sapling_shielded_data: Some(sapling::ShieldedData {
            value_balance: (-5_000).try_into().unwrap(),
            shared_anchor: None,
            spends: vec![],
            outputs: vec![sapling_output(0x30), sapling_output(0x31)],
            binding_sig: [9; 64].into(),
        }),
        orchard_shielded_data: None,
    }
}

#[test]
fn transaction_round_trips() {
    for (name, transaction) in [
        ("v4 transparent", v4_transparent_only()),
        ("v4 sapling", v4_with_sapling()),
        ("v5 orchard coinbase", v5_coinbase_with_orchard()),
        ("v5 sapling outputs", v5_with_sapling_outputs()),
    ] {
        let bytes = transaction.zcash_serialize_to_vec().unwrap();
        let parsed: Transaction = bytes
            .as_slice()
            .zcash_deserialize_into()
            .unwrap_or_else(|e| panic!("{name}: {e}"));
        assert_eq!(parsed, transaction, "{name}");
        assert_eq!(bytes.len(), transaction.serialized_size(), "{name}");
    }
}

#[test]
fn coinbase_detection() {
    assert!(v5_coinbase_with_orchard().is_coinbase());
    assert!(!v4_transparent_only().is_coinbase());
}

#[test]
fn hashes_are_stable_across_arc() {
    let tx = v5_with_sapling_outputs();
    let arc = Arc::new(tx.clone());
    assert_eq!(tx.hash(), arc.hash());
}

#[test]
fn v4_and_v5_hashes_use_different_algorithms() {
    // The v4 hash is the double-SHA256 of the serialization; check it
    // explicitly.
    let tx = v4_transparent_only();
    let bytes = tx.zcash_serialize_to_vec().unwrap();
    assert_eq!(
        tx.hash().0,
        crate::serialization::sha256d::digest(&bytes)
    );

    // The v5 hash excludes authorizing data: changing a binding signature
    // changes the serialization but not the txid.
    let tx1 = v5_with_sapling_outputs();
    let mut tx2 = tx1.clone();
    if let Transaction::V5 {
        sapling_shielded_data: Some(ref mut shielded_data),
        ..
    } = tx2
    {
        shielded_data.binding_sig = [0x55; 64].into();
    }

    assert_ne!(
        tx1.zcash_serialize_to_vec().unwrap(),
        tx2.zcash_serialize_to_vec().unwrap()
    );
    assert_eq!(tx1.hash(), tx2.hash());
    assert_ne!(tx1.auth_digest(), tx2.auth_digest());
}

#[test]
fn expiry_and_finality() {
    let tx = v4_with_sapling();
    assert!(!tx.is_expired(Height(1_100_000)));
    assert!(tx.is_expired(Height(1_100_001)));

    // Coinbase transactions never expire.
    let coinbase = v5_coinbase_with_orchard();
    assert!(!coinbase.is_expired(Height(4_000_000)));

    // Unlocked transactions are always final.
    assert!(tx.is_final(Height(1), 0));

    // Height locks require a strictly greater block height.
    let locked = Transaction::V4 {
        inputs: vec![prevout_input(1, 0)],
        outputs: vec![],
        lock_time: LockTime::Height(Height(100)),
        expiry_height: Height(0),
        joinsplit_data: None,
        sapling_shielded_data: None,
    };
    assert!(!locked.is_final(Height(100), 0));
    assert!(locked.is_final(Height(101), 0));
}

#[test]
fn value_accounting() {
    // A sapling value balance of +20_000 enters the transparent pool, and
    // the transaction spends 10_000 transparently.
    let tx = v4_with_sapling();
    assert_eq!(tx.shielded_value_in(), 20_000);
    assert_eq!(tx.value_out(), 10_000);
    assert_eq!(tx.sapling_value_balance(), 20_000);

    // A negative balance leaves the transparent pool.
    let tx = v5_with_sapling_outputs();
    assert_eq!(tx.shielded_value_in(), 0);
    assert_eq!(tx.value_out(), 95_000);

    // The orchard coinbase mints into the orchard pool.
    let tx = v5_coinbase_with_orchard();
    assert_eq!(tx.orchard_value_balance(), -312_500_000);
}

#[test]
fn legacy_sigops_count_inputs_and_outputs() {
    let tx = v4_transparent_only();
    // one P2PKH output script with one CHECKSIG
    assert_eq!(tx.legacy_sigop_count(), 1);
}

#[test]
fn sapling_note_commitments_are_in_output_order() {
    let tx = v5_with_sapling_outputs();
    let commitments: Vec<[u8; 32]> = tx.sapling_note_commitments().collect();
    assert_eq!(commitments, vec![[0x30; 32], [0x31; 32]]);
}
