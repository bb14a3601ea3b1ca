//! Bitcoin-inherited scripts.

use std::{fmt, io};

use crate::serialization::{
    zcash_serialize_bytes, SerializationError, ZcashDeserialize, ZcashSerialize,
};

use super::opcodes::OpCode;

/// The maximum number of public keys consumed by a single
/// `OP_CHECKMULTISIG`, used when counting an imprecise multisig's
/// signature operations.
const MAX_PUBKEYS_PER_MULTISIG: u64 = 20;

/// An encoding of a Bitcoin script.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Script(Vec<u8>);

impl Script {
    /// Create a new Bitcoin script from its raw bytes.
    /// The raw bytes must not contain the length prefix.
    pub fn new(raw_bytes: &[u8]) -> Self {
        Script(raw_bytes.to_vec())
    }

    /// Return the raw bytes of the script without the length prefix.
    pub fn as_raw_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Create the standard pay-to-script-hash lock script for
    /// `script_hash`.
    pub fn pay_to_script_hash(script_hash: &[u8; 20]) -> Self {
        let mut raw = Vec::with_capacity(23);
        raw.push(OpCode::Hash160 as u8);
        raw.push(0x14);
        raw.extend(script_hash);
        raw.push(OpCode::Equal as u8);
        Script(raw)
    }

    /// Create the standard pay-to-public-key-hash lock script for
    /// `pub_key_hash`.
    pub fn pay_to_public_key_hash(pub_key_hash: &[u8; 20]) -> Self {
        let mut raw = Vec::with_capacity(25);
        raw.push(OpCode::Dup as u8);
        raw.push(OpCode::Hash160 as u8);
        raw.push(0x14);
        raw.extend(pub_key_hash);
        raw.push(OpCode::EqualVerify as u8);
        raw.push(OpCode::CheckSig as u8);
        Script(raw)
    }

    /// Returns `true` if this script has the standard pay-to-script-hash
    /// form.
    pub fn is_pay_to_script_hash(&self) -> bool {
        self.0.len() == 23
            && self.0[0] == OpCode::Hash160 as u8
            && self.0[1] == 0x14
            && self.0[22] == OpCode::Equal as u8
    }

    /// Returns the script hash this lock script pays to, if it has the
    /// standard pay-to-script-hash form.
    pub fn pay_to_script_hash_target(&self) -> Option<[u8; 20]> {
        if self.is_pay_to_script_hash() {
            Some(self.0[2..22].try_into().expect("23 byte script"))
        } else {
            None
        }
    }

    /// Returns the public key hash this lock script pays to, if it has the
    /// standard pay-to-public-key-hash form.
    pub fn pay_to_public_key_hash_target(&self) -> Option<[u8; 20]> {
        if self.0.len() == 25
            && self.0[0] == OpCode::Dup as u8
            && self.0[1] == OpCode::Hash160 as u8
            && self.0[2] == 0x14
            && self.0[23] == OpCode::EqualVerify as u8
            && self.0[24] == OpCode::CheckSig as u8
        {
            Some(self.0[3..23].try_into().expect("25 byte script"))
        } else {
            None
        }
    }

    /// Returns the data pushes of this script, in order, if the script
    /// contains only data pushes.
    ///
    /// Returns `None` when the script contains any other operation, or
    /// does not parse. `CScript::IsPushOnly` plus `GetOp` in zcashd;
    /// unlock scripts spending P2SH outputs must have this form.
    pub fn push_data(&self) -> Option<Vec<&[u8]>> {
        let mut pushes = Vec::new();
        for op in ScriptOps::new(&self.0) {
            match op {
                Ok(ScriptOp::Push(data)) => pushes.push(data),
                // OP_0 pushes an empty byte string
                Ok(ScriptOp::Op(opcode)) if opcode == OpCode::Op0 as u8 => pushes.push(&[]),
                _ => return None,
            }
        }
        Some(pushes)
    }

    /// Count the signature operations in this script.
    ///
    /// If `accurate` is true, `OP_CHECKMULTISIG` operations preceded by a
    /// small-integer push count as that many operations. Otherwise they
    /// count as [`MAX_PUBKEYS_PER_MULTISIG`]. This matches
    /// `CScript::GetSigOpCount` in zcashd: the legacy (inaccurate) count
    /// is used for whole transactions, the accurate count for P2SH redeem
    /// scripts.
    ///
    /// Unparseable scripts are counted up to the parse failure, like
    /// zcashd does.
    pub fn sigop_count(&self, accurate: bool) -> u64 {
        let mut sigops = 0;
        let mut last_opcode = None;

        for op in ScriptOps::new(&self.0) {
            let Ok(op) = op else { break };

            match op {
                ScriptOp::Op(opcode) if opcode == OpCode::CheckSig as u8 => sigops += 1,
                ScriptOp::Op(opcode) if opcode == OpCode::CheckSigVerify as u8 => sigops += 1,
                ScriptOp::Op(opcode)
                    if opcode == OpCode::CheckMultisig as u8
                        || opcode == OpCode::CheckMultisigVerify as u8 =>
                {
                    match last_opcode {
                        Some(ScriptOp::Op(n))
                            if accurate && (OpCode::Op1 as u8..=OpCode::Op16 as u8).contains(&n) =>
                        {
                            sigops += (n - OpCode::Op1 as u8) as u64 + 1;
                        }
                        _ => sigops += MAX_PUBKEYS_PER_MULTISIG,
                    }
                }
                _ => {}
            }

            last_opcode = Some(op);
        }

        sigops
    }

    /// Count the accurate signature operations of the redeem script spent
    /// by `unlock_script`, if this script is pay-to-script-hash.
    ///
    /// Returns zero when this script is not P2SH, or when the unlock
    /// script is not push-only (such scripts fail verification anyway).
    pub fn p2sh_sigop_count(&self, unlock_script: &Script) -> u64 {
        if !self.is_pay_to_script_hash() {
            return 0;
        }

        // The redeem script is the last data push of the unlock script.
        let mut redeem_script = None;
        for op in ScriptOps::new(&unlock_script.0) {
            match op {
                Ok(ScriptOp::Push(data)) => redeem_script = Some(data),
                // not push-only
                _ => return 0,
            }
        }

        redeem_script
            .map(|redeem_script| Script::new(redeem_script).sigop_count(true))
            .unwrap_or(0)
    }
}

/// A single parsed script operation: an opcode or a data push.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum ScriptOp<'s> {
    /// A non-push opcode.
    Op(u8),
    /// A data push, with the pushed bytes.
    Push(&'s [u8]),
}

/// An iterator over the operations of a raw script.
struct ScriptOps<'s> {
    bytes: &'s [u8],
}

impl<'s> ScriptOps<'s> {
    fn new(bytes: &'s [u8]) -> Self {
        ScriptOps { bytes }
    }

    fn take(&mut self, len: usize) -> Result<&'s [u8], SerializationError> {
        if self.bytes.len() < len {
            return Err(SerializationError::Parse("push runs past end of script"));
        }
        let (data, rest) = self.bytes.split_at(len);
        self.bytes = rest;
        Ok(data)
    }
}

impl<'s> Iterator for ScriptOps<'s> {
    type Item = Result<ScriptOp<'s>, SerializationError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (&opcode, rest) = self.bytes.split_first()?;
        self.bytes = rest;

        let op = match opcode {
            // direct pushes of 1 to 75 bytes
            len @ 0x01..=0x4b => self.take(len as usize).map(ScriptOp::Push),
            opcode if opcode == OpCode::PushData1 as u8 => self
                .take(1)
                .map(|len| len[0] as usize)
                .and_then(|len| self.take(len))
                .map(ScriptOp::Push),
            opcode if opcode == OpCode::PushData2 as u8 => self
                .take(2)
                .map(|len| u16::from_le_bytes([len[0], len[1]]) as usize)
                .and_then(|len| self.take(len))
                .map(ScriptOp::Push),
            opcode if opcode == OpCode::PushData4 as u8 => self
                .take(4)
                .map(|len| u32::from_le_bytes([len[0], len[1], len[2], len[3]]) as usize)
                .and_then(|len| self.take(len))
                .map(ScriptOp::Push),
            opcode => Ok(ScriptOp::Op(opcode)),
        };

        Some(op)
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Script")
            .field(&hex::encode(&self.0))
            .finish()
    }
}

impl ZcashSerialize for Script {
    fn zcash_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        zcash_serialize_bytes(&self.0, &mut writer)
    }
}

impl ZcashDeserialize for Script {
    fn zcash_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        Vec::zcash_deserialize(reader).map(Script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p2pkh_counts_one_sigop() {
        let script = Script::pay_to_public_key_hash(&[7; 20]);
        assert_eq!(script.sigop_count(false), 1);
        assert!(!script.is_pay_to_script_hash());
    }

    #[test]
    fn p2sh_form_is_detected() {
        let script = Script::pay_to_script_hash(&[7; 20]);
        assert!(script.is_pay_to_script_hash());
        assert_eq!(script.sigop_count(false), 0);
    }

    #[test]
    fn multisig_counts() {
        // OP_2 <33 zero bytes> <33 zero bytes> OP_2 OP_CHECKMULTISIG
        let mut raw = vec![0x52];
        raw.push(33);
        raw.extend([0; 33]);
        raw.push(33);
        raw.extend([0; 33]);
        raw.push(0x52);
        raw.push(OpCode::CheckMultisig as u8);
        let script = Script::new(&raw);

        // accurate counting reads the key count from the preceding OP_N
        assert_eq!(script.sigop_count(true), 2);
        // legacy counting assumes the maximum number of keys
        assert_eq!(script.sigop_count(false), 20);
    }

    #[test]
    fn p2sh_redeem_script_sigops() {
        let redeem = {
            // OP_1 <33 zero bytes> OP_1 OP_CHECKMULTISIG
            let mut raw = vec![0x51, 33];
            raw.extend([0; 33]);
            raw.extend([0x51, OpCode::CheckMultisig as u8]);
            raw
        };

        let lock_script = Script::pay_to_script_hash(&[7; 20]);
        let unlock_script = {
            let mut raw = vec![redeem.len() as u8];
            raw.extend(&redeem);
            Script::new(&raw)
        };

        assert_eq!(lock_script.p2sh_sigop_count(&unlock_script), 1);

        // non-P2SH lock scripts never have P2SH sigops
        let p2pkh = Script::pay_to_public_key_hash(&[7; 20]);
        assert_eq!(p2pkh.p2sh_sigop_count(&unlock_script), 0);
    }

    #[test]
    fn standard_targets_are_extracted() {
        let p2sh = Script::pay_to_script_hash(&[7; 20]);
        assert_eq!(p2sh.pay_to_script_hash_target(), Some([7; 20]));
        assert_eq!(p2sh.pay_to_public_key_hash_target(), None);

        let p2pkh = Script::pay_to_public_key_hash(&[8; 20]);
        assert_eq!(p2pkh.pay_to_public_key_hash_target(), Some([8; 20]));
        assert_eq!(p2pkh.pay_to_script_hash_target(), None);
    }

    #[test]
    fn push_data_requires_push_only() {
        // two pushes and an OP_0
        let mut raw = vec![2, 0xAA, 0xBB];
        raw.push(0x00);
        raw.extend([1, 0xCC]);
        let script = Script::new(&raw);
        assert_eq!(
            script.push_data(),
            Some(vec![&[0xAA, 0xBB][..], &[][..], &[0xCC][..]]),
        );

        // a non-push opcode makes the script not push-only
        let script = Script::new(&[1, 0xAA, OpCode::CheckSig as u8]);
        assert_eq!(script.push_data(), None);
    }

    #[test]
    fn truncated_push_stops_counting() {
        // a push of 10 bytes, but only 2 bytes follow, then OP_CHECKSIG
        // (which is part of the truncated push, so it is not counted)
        let script = Script::new(&[0x0a, 0x01, 0x02]);
        assert_eq!(script.sigop_count(false), 0);
    }
}
