//! Contains impls of `ZcashSerialize`, `ZcashDeserialize` for all of the
//! transaction types, so that all of the serialization logic is in one
//! place.

use std::{io, sync::Arc};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::{
    amount::Amount,
    block,
    parameters::NetworkUpgrade,
    primitives::{redjubjub, redpallas, Bytes32, Groth16Proof, Halo2Proof},
    orchard, sapling,
    serialization::{
        zcash_deserialize_external_count, AtLeastOne, ReadZcashExt, SerializationError,
        TrustedPreallocate, WriteZcashExt, ZcashDeserialize, ZcashSerialize,
    },
};

use super::{JoinSplitData, LockTime, Transaction};

const OVERWINTERED_FLAG: u32 = 1 << 31;
const SAPLING_VERSION_GROUP_ID: u32 = 0x892F_2085;
const V5_VERSION_GROUP_ID: u32 = 0x26A7_270A;

impl ZcashSerialize for JoinSplitData {
    fn zcash_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        writer.write_compactsize(self.joinsplits().count() as u64)?;
        for joinsplit in self.joinsplits() {
            joinsplit.zcash_serialize(&mut writer)?;
        }
        writer.write_all(&self.pub_key.0[..])?;
        writer.write_all(&self.sig.0[..])?;
        Ok(())
    }
}

impl ZcashDeserialize for Option<JoinSplitData> {
    fn zcash_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let num_joinsplits = reader.read_compactsize()?;
        match num_joinsplits {
            0 => Ok(None),
            n => {
                let first = super::JoinSplit::zcash_deserialize(&mut reader)?;
                let mut rest = Vec::with_capacity((n - 1) as usize);
                for _ in 0..(n - 1) {
                    rest.push(super::JoinSplit::zcash_deserialize(&mut reader)?);
                }
                let pub_key = Bytes32(reader.read_32_bytes()?);
                let sig = super::joinsplit::Ed25519Signature(reader.read_64_bytes()?);
                Ok(Some(JoinSplitData {
                    first,
                    rest,
                    pub_key,
                    sig,
                }))
            }
        }
    }
}

impl ZcashSerialize for Transaction {
    fn zcash_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        match self {
            Transaction::V4 {
                inputs,
                outputs,
                lock_time,
                expiry_height,
                joinsplit_data,
                sapling_shielded_data,
            } => {
                // Transaction header
                writer.write_u32::<LittleEndian>(4 | OVERWINTERED_FLAG)?;
                writer.write_u32::<LittleEndian>(SAPLING_VERSION_GROUP_ID)?;

                inputs.zcash_serialize(&mut writer)?;
                outputs.zcash_serialize(&mut writer)?;
                lock_time.zcash_serialize(&mut writer)?;
                writer.write_u32::<LittleEndian>(expiry_height.0)?;

                // The v4 format interleaves the sapling fields with the
                // joinsplit fields, so the shielded data option is
                // unpacked field by field.
                match sapling_shielded_data {
                    None => {
                        writer.write_all(&Amount::<crate::amount::NegativeAllowed>::zero().to_bytes())?;
                        writer.write_compactsize(0)?;
                        writer.write_compactsize(0)?;
                    }
                    Some(shielded_data) => {
                        writer.write_all(&shielded_data.value_balance.to_bytes())?;
                        shielded_data.spends.zcash_serialize(&mut writer)?;
                        shielded_data.outputs.zcash_serialize(&mut writer)?;
                    }
                }

                match joinsplit_data {
                    None => writer.write_compactsize(0)?,
                    Some(jsd) => jsd.zcash_serialize(&mut writer)?,
                }

                if let Some(shielded_data) = sapling_shielded_data {
                    shielded_data.binding_sig.zcash_serialize(&mut writer)?;
                }
            }

            Transaction::V5 {
                network_upgrade,
                lock_time,
                expiry_height,
                inputs,
                outputs,
                sapling_shielded_data,
                orchard_shielded_data,
            } => {
                // Transaction header
                writer.write_u32::<LittleEndian>(5 | OVERWINTERED_FLAG)?;
                writer.write_u32::<LittleEndian>(V5_VERSION_GROUP_ID)?;
                writer.write_u32::<LittleEndian>(
                    network_upgrade
                        .branch_id()
                        .expect("v5 transactions are only defined after branch ids")
                        .into(),
                )?;
                lock_time.zcash_serialize(&mut writer)?;
                writer.write_u32::<LittleEndian>(expiry_height.0)?;

                inputs.zcash_serialize(&mut writer)?;
                outputs.zcash_serialize(&mut writer)?;

                // Sapling bundle
                match sapling_shielded_data {
                    None => {
                        writer.write_compactsize(0)?;
                        writer.write_compactsize(0)?;
                    }
                    Some(shielded_data) => {
                        writer.write_compactsize(shielded_data.spends.len() as u64)?;
                        for spend in &shielded_data.spends {
                            spend.zcash_serialize_without_anchor_and_auth(&mut writer)?;
                        }

                        writer.write_compactsize(shielded_data.outputs.len() as u64)?;
                        for output in &shielded_data.outputs {
                            output.zcash_serialize_without_proof(&mut writer)?;
                        }

                        writer.write_all(&shielded_data.value_balance.to_bytes())?;

                        if !shielded_data.spends.is_empty() {
                            let anchor = shielded_data
                                .shared_anchor
                                .expect("v5 bundles with spends always have a shared anchor");
                            writer.write_all(&anchor.0)?;
                        }

                        for spend in &shielded_data.spends {
                            spend.zkproof.zcash_serialize(&mut writer)?;
                        }
                        for spend in &shielded_data.spends {
                            spend.spend_auth_sig.zcash_serialize(&mut writer)?;
                        }
                        for output in &shielded_data.outputs {
                            output.zkproof.zcash_serialize(&mut writer)?;
                        }

                        shielded_data.binding_sig.zcash_serialize(&mut writer)?;
                    }
                }

                // Orchard bundle
                match orchard_shielded_data {
                    None => {
                        writer.write_compactsize(0)?;
                    }
                    Some(shielded_data) => {
                        writer.write_compactsize(shielded_data.actions.len() as u64)?;
                        for authorized in shielded_data.actions.iter() {
                            authorized.action.zcash_serialize(&mut writer)?;
                        }

                        writer.write_all(&[shielded_data.flags.bits()])?;
                        writer.write_all(&shielded_data.value_balance.to_bytes())?;
                        writer.write_all(&shielded_data.shared_anchor.0)?;

                        shielded_data.proof.zcash_serialize(&mut writer)?;

                        for authorized in shielded_data.actions.iter() {
                            authorized.spend_auth_sig.zcash_serialize(&mut writer)?;
                        }

                        shielded_data.binding_sig.zcash_serialize(&mut writer)?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl ZcashDeserialize for Transaction {
    fn zcash_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let header = reader.read_u32::<LittleEndian>()?;
        let overwintered = header & OVERWINTERED_FLAG != 0;
        let version = header & !OVERWINTERED_FLAG;

        match (version, overwintered) {
            (4, true) => {
                let id = reader.read_u32::<LittleEndian>()?;
                if id != SAPLING_VERSION_GROUP_ID {
                    return Err(SerializationError::Parse("bad sapling version group id"));
                }

                let inputs = Vec::zcash_deserialize(&mut reader)?;
                let outputs = Vec::zcash_deserialize(&mut reader)?;
                let lock_time = LockTime::zcash_deserialize(&mut reader)?;
                let expiry_height = block::Height(reader.read_u32::<LittleEndian>()?);

                let value_balance: Amount = Amount::zcash_deserialize(&mut reader)?;
                let spends: Vec<sapling::Spend> = Vec::zcash_deserialize(&mut reader)?;
                let sapling_outputs: Vec<sapling::Output> = Vec::zcash_deserialize(&mut reader)?;
                let joinsplit_data = Option::<JoinSplitData>::zcash_deserialize(&mut reader)?;

                let sapling_shielded_data = if spends.is_empty() && sapling_outputs.is_empty() {
                    None
                } else {
                    let binding_sig = redjubjub::Signature::zcash_deserialize(&mut reader)?;
                    Some(sapling::ShieldedData {
                        value_balance,
                        shared_anchor: None,
                        spends,
                        outputs: sapling_outputs,
                        binding_sig,
                    })
                };

                Ok(Transaction::V4 {
                    inputs,
                    outputs,
                    lock_time,
                    expiry_height,
                    joinsplit_data,
                    sapling_shielded_data,
                })
            }

            (5, true) => {
                let id = reader.read_u32::<LittleEndian>()?;
                if id != V5_VERSION_GROUP_ID {
                    return Err(SerializationError::Parse("bad v5 version group id"));
                }

                let branch_id = reader.read_u32::<LittleEndian>()?;
                let network_upgrade = NetworkUpgrade::from_branch_id(branch_id)
                    .ok_or(SerializationError::Parse("unknown consensus branch id"))?;

                let lock_time = LockTime::zcash_deserialize(&mut reader)?;
                let expiry_height = block::Height(reader.read_u32::<LittleEndian>()?);

                let inputs = Vec::zcash_deserialize(&mut reader)?;
                let outputs = Vec::zcash_deserialize(&mut reader)?;

                let sapling_shielded_data = deserialize_v5_sapling(&mut reader)?;
                let orchard_shielded_data = deserialize_v5_orchard(&mut reader)?;

                Ok(Transaction::V5 {
                    network_upgrade,
                    lock_time,
                    expiry_height,
                    inputs,
                    outputs,
                    sapling_shielded_data,
                    orchard_shielded_data,
                })
            }

            (_, _) => Err(SerializationError::Parse("bad tx header")),
        }
    }
}

/// A partial v5 Sapling spend: the fields the v5 format stores per spend,
/// before the shared anchor, proofs, and signatures are attached.
struct SpendPrefix {
    cv: Bytes32,
    nullifier: Bytes32,
    rk: Bytes32,
}

impl ZcashDeserialize for SpendPrefix {
    fn zcash_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(SpendPrefix {
            cv: Bytes32::zcash_deserialize(&mut reader)?,
            nullifier: Bytes32::zcash_deserialize(&mut reader)?,
            rk: Bytes32::zcash_deserialize(&mut reader)?,
        })
    }
}

impl TrustedPreallocate for SpendPrefix {
    fn max_allocation() -> u64 {
        block::MAX_BLOCK_BYTES / (3 * 32)
    }
}

/// A partial v5 Sapling output: everything except the proof.
struct OutputPrefix {
    cv: Bytes32,
    cm_u: Bytes32,
    ephemeral_key: Bytes32,
    enc_ciphertext: sapling::EncryptedNote,
    out_ciphertext: sapling::WrappedNoteKey,
}

impl ZcashDeserialize for OutputPrefix {
    fn zcash_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(OutputPrefix {
            cv: Bytes32::zcash_deserialize(&mut reader)?,
            cm_u: Bytes32::zcash_deserialize(&mut reader)?,
            ephemeral_key: Bytes32::zcash_deserialize(&mut reader)?,
            enc_ciphertext: sapling::EncryptedNote::zcash_deserialize(&mut reader)?,
            out_ciphertext: sapling::WrappedNoteKey::zcash_deserialize(&mut reader)?,
        })
    }
}

impl TrustedPreallocate for OutputPrefix {
    fn max_allocation() -> u64 {
        block::MAX_BLOCK_BYTES / (3 * 32 + 580 + 80)
    }
}

fn deserialize_v5_sapling<R: io::Read>(
    mut reader: R,
) -> Result<Option<sapling::ShieldedData>, SerializationError> {
    let spend_prefixes: Vec<SpendPrefix> = Vec::zcash_deserialize(&mut reader)?;
    let output_prefixes: Vec<OutputPrefix> = Vec::zcash_deserialize(&mut reader)?;

    if spend_prefixes.is_empty() && output_prefixes.is_empty() {
        return Ok(None);
    }

    let value_balance: Amount = Amount::zcash_deserialize(&mut reader)?;

    let shared_anchor = if !spend_prefixes.is_empty() {
        Some(sapling::tree::Root(reader.read_32_bytes()?))
    } else {
        None
    };

    let spend_proofs: Vec<Groth16Proof> =
        zcash_deserialize_external_count(spend_prefixes.len(), &mut reader)?;
    let spend_sigs: Vec<redjubjub::Signature<redjubjub::SpendAuth>> =
        zcash_deserialize_external_count(spend_prefixes.len(), &mut reader)?;
    let output_proofs: Vec<Groth16Proof> =
        zcash_deserialize_external_count(output_prefixes.len(), &mut reader)?;

    let binding_sig = redjubjub::Signature::zcash_deserialize(&mut reader)?;

    let anchor = shared_anchor.unwrap_or(sapling::tree::Root([0; 32]));
    let spends = spend_prefixes
        .into_iter()
        .zip(spend_proofs)
        .zip(spend_sigs)
        .map(|((prefix, zkproof), spend_auth_sig)| sapling::Spend {
            cv: prefix.cv,
            per_spend_anchor: anchor,
            nullifier: prefix.nullifier,
            rk: prefix.rk,
            zkproof,
            spend_auth_sig,
        })
        .collect();

    let outputs = output_prefixes
        .into_iter()
        .zip(output_proofs)
        .map(|(prefix, zkproof)| sapling::Output {
            cv: prefix.cv,
            cm_u: prefix.cm_u,
            ephemeral_key: prefix.ephemeral_key,
            enc_ciphertext: prefix.enc_ciphertext,
            out_ciphertext: prefix.out_ciphertext,
            zkproof,
        })
        .collect();

    Ok(Some(sapling::ShieldedData {
        value_balance,
        shared_anchor,
        spends,
        outputs,
        binding_sig,
    }))
}

fn deserialize_v5_orchard<R: io::Read>(
    mut reader: R,
) -> Result<Option<orchard::ShieldedData>, SerializationError> {
    let actions: Vec<orchard::Action> = Vec::zcash_deserialize(&mut reader)?;

    if actions.is_empty() {
        return Ok(None);
    }

    let flags = orchard::Flags::from_bits(reader.read_u8()?)
        .ok_or(SerializationError::Parse("invalid orchard flags"))?;
    let value_balance: Amount = Amount::zcash_deserialize(&mut reader)?;
    let shared_anchor = Bytes32(reader.read_32_bytes()?);
    let proof = Halo2Proof::zcash_deserialize(&mut reader)?;

    let spend_auth_sigs: Vec<redpallas::Signature<redpallas::SpendAuth>> =
        zcash_deserialize_external_count(actions.len(), &mut reader)?;

    let binding_sig = redpallas::Signature::zcash_deserialize(&mut reader)?;

    let actions: Vec<orchard::AuthorizedAction> = actions
        .into_iter()
        .zip(spend_auth_sigs)
        .map(|(action, spend_auth_sig)| orchard::AuthorizedAction {
            action,
            spend_auth_sig,
        })
        .collect();
    let actions: AtLeastOne<orchard::AuthorizedAction> = actions
        .try_into()
        .expect("checked for at least one action above");

    Ok(Some(orchard::ShieldedData {
        flags,
        value_balance,
        shared_anchor,
        proof,
        actions,
        binding_sig,
    }))
}

impl ZcashSerialize for Arc<Transaction> {
    fn zcash_serialize<W: io::Write>(&self, writer: W) -> Result<(), io::Error> {
        self.as_ref().zcash_serialize(writer)
    }
}

impl ZcashDeserialize for Arc<Transaction> {
    fn zcash_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        Ok(Arc::new(Transaction::zcash_deserialize(reader)?))
    }
}

impl TrustedPreallocate for Groth16Proof {
    fn max_allocation() -> u64 {
        block::MAX_BLOCK_BYTES / 192
    }
}

impl<T: redjubjub::SigType> TrustedPreallocate for redjubjub::Signature<T> {
    fn max_allocation() -> u64 {
        block::MAX_BLOCK_BYTES / 64
    }
}

impl<T: redpallas::SigType> TrustedPreallocate for redpallas::Signature<T> {
    fn max_allocation() -> u64 {
        block::MAX_BLOCK_BYTES / 64
    }
}
