//! Consensus-critical serialization of blocks and block headers.

use std::{io, sync::Arc};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{TimeZone, Utc};

use crate::{
    serialization::{
        ReadZcashExt, SerializationError, TrustedPreallocate, ZcashDeserialize,
        ZcashDeserializeInto, ZcashSerialize, MAX_PROTOCOL_MESSAGE_LEN,
    },
    work::{difficulty::CompactDifficulty, equihash},
};

use super::{merkle, Block, Hash, Header};

/// The maximum size of a Zcash block, in bytes.
///
/// Post-sapling, this is the maximum size of a block as
/// serialized in a network protocol message.
pub(crate) const MAX_BLOCK_BYTES: u64 = super::MAX_BLOCK_BYTES;

impl ZcashSerialize for Header {
    fn zcash_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        writer.write_u32::<LittleEndian>(self.version)?;
        self.previous_block_hash.zcash_serialize(&mut writer)?;
        writer.write_all(&self.merkle_root.0[..])?;
        writer.write_all(&self.commitment_bytes[..])?;
        writer.write_u32::<LittleEndian>(
            self.time
                .timestamp()
                .try_into()
                .expect("deserialized and generated timestamps are u32 values"),
        )?;
        writer.write_u32::<LittleEndian>(self.difficulty_threshold.0)?;
        writer.write_all(&self.nonce[..])?;
        self.solution.zcash_serialize(&mut writer)?;
        Ok(())
    }
}

impl ZcashDeserialize for Header {
    fn zcash_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let version = reader.read_u32::<LittleEndian>()?;

        // # Consensus
        //
        // > The block version number MUST be greater than or equal to 4.
        //
        // Interpreted as a signed number, like zcashd does.
        if (version as i32) < 4 {
            return Err(SerializationError::Parse("version must be at least 4"));
        }

        Ok(Header {
            version,
            previous_block_hash: Hash::zcash_deserialize(&mut reader)?,
            merkle_root: merkle::Root(reader.read_32_bytes()?),
            commitment_bytes: reader.read_32_bytes()?.into(),
            time: Utc
                .timestamp_opt(reader.read_u32::<LittleEndian>()? as i64, 0)
                .single()
                .expect("in-range number of seconds and valid nanosecond"),
            difficulty_threshold: CompactDifficulty(reader.read_u32::<LittleEndian>()?),
            nonce: reader.read_32_bytes()?.into(),
            solution: equihash::Solution::zcash_deserialize(reader)?,
        })
    }
}

impl ZcashSerialize for Block {
    fn zcash_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        self.header.zcash_serialize(&mut writer)?;
        self.transactions.zcash_serialize(&mut writer)?;
        Ok(())
    }
}

impl ZcashDeserialize for Block {
    fn zcash_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        // If the limit is reached, we'll get an UnexpectedEof error
        let mut limited_reader = reader.take(MAX_BLOCK_BYTES);
        Ok(Block {
            header: (&mut limited_reader).zcash_deserialize_into()?,
            transactions: (&mut limited_reader).zcash_deserialize_into()?,
        })
    }
}

/// The serialized size of a block header.
///
/// Includes the equihash input, 32-byte nonce, 3-byte equihash length
/// field, and (n, k) = (200, 9) equihash solution.
pub(crate) const BLOCK_HEADER_LENGTH: usize =
    equihash::Solution::INPUT_LENGTH + 32 + 3 + equihash::SOLUTION_SIZE;

impl TrustedPreallocate for Arc<crate::transaction::Transaction> {
    fn max_allocation() -> u64 {
        // A transaction is at least 10 bytes: not more than
        // `MAX_BLOCK_BYTES / 10` can fit in a block.
        MAX_BLOCK_BYTES / 10
    }
}

impl TrustedPreallocate for Hash {
    fn max_allocation() -> u64 {
        ((MAX_PROTOCOL_MESSAGE_LEN - 1) / 32) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::work::difficulty::INVALID_COMPACT_DIFFICULTY;

    fn example_header() -> Header {
        Header {
            version: 4,
            previous_block_hash: Hash([7; 32]),
            merkle_root: merkle::Root([8; 32]),
            commitment_bytes: [9; 32].into(),
            time: Utc.timestamp_opt(1_700_000_000, 0).single().unwrap(),
            difficulty_threshold: CompactDifficulty(0x1f07_ffff),
            nonce: [1; 32].into(),
            solution: equihash::Solution::for_proposal(),
        }
    }

    #[test]
    fn header_round_trip() {
        let header = example_header();
        let bytes = header.zcash_serialize_to_vec().unwrap();
        assert_eq!(bytes.len(), BLOCK_HEADER_LENGTH);

        let parsed: Header = bytes.as_slice().zcash_deserialize_into().unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn header_rejects_low_versions() {
        let mut header = example_header();
        header.version = 3;
        let bytes = header.zcash_serialize_to_vec().unwrap();
        let parsed: Result<Header, _> = bytes.as_slice().zcash_deserialize_into();
        assert!(parsed.is_err());
    }

    #[test]
    fn invalid_difficulty_is_still_serializable() {
        let mut header = example_header();
        header.difficulty_threshold = INVALID_COMPACT_DIFFICULTY;
        let bytes = header.zcash_serialize_to_vec().unwrap();
        let parsed: Header = bytes.as_slice().zcash_deserialize_into().unwrap();
        assert_eq!(parsed.difficulty_threshold, INVALID_COMPACT_DIFFICULTY);
    }
}
