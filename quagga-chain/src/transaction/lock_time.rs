//! Transaction lock times.

use std::io;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{DateTime, TimeZone, Utc};

use crate::block::Height;
use crate::serialization::{SerializationError, ZcashDeserialize, ZcashSerialize};

/// A transaction's earliest time or block height to be added to the chain.
///
/// The raw `nLockTime` field is interpreted as a block height when it is
/// below [`LockTime::MIN_TIMESTAMP`], and as a Unix timestamp otherwise.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum LockTime {
    /// The transaction can only be included in a block if the block height
    /// is strictly greater than this height
    Height(Height),
    /// The transaction can only be included in a block if the block time
    /// is strictly greater than this timestamp
    Time(DateTime<Utc>),
}

impl LockTime {
    /// The earliest raw value interpreted as a timestamp.
    pub const MIN_TIMESTAMP: i64 = 500_000_000;

    /// The latest raw value interpreted as a timestamp.
    pub const MAX_TIMESTAMP: i64 = u32::MAX as i64;

    /// Returns the lock time value that means "no lock": a zero block
    /// height.
    pub fn unlocked() -> Self {
        LockTime::Height(Height(0))
    }
}

impl ZcashSerialize for LockTime {
    fn zcash_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        // This implementation does not check the invariants on `LockTime`
        // so that the serialization is fallible only if the underlying
        // writer is.
        match self {
            LockTime::Height(Height(height)) => writer.write_u32::<LittleEndian>(*height)?,
            LockTime::Time(time) => {
                writer.write_u32::<LittleEndian>(time.timestamp() as u32)?
            }
        }
        Ok(())
    }
}

impl ZcashDeserialize for LockTime {
    fn zcash_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let n = reader.read_u32::<LittleEndian>()?;
        if n < (LockTime::MIN_TIMESTAMP as u32) {
            Ok(LockTime::Height(Height(n)))
        } else {
            Ok(LockTime::Time(
                Utc.timestamp_opt(n.into(), 0)
                    .single()
                    .expect("in-range number of seconds and valid nanosecond"),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::serialization::ZcashDeserializeInto;

    #[test]
    fn lock_time_round_trips() {
        for lock_time in [
            LockTime::unlocked(),
            LockTime::Height(Height(1_000_000)),
            LockTime::Time(Utc.timestamp_opt(1_700_000_000, 0).single().unwrap()),
        ] {
            let bytes = lock_time.zcash_serialize_to_vec().unwrap();
            let parsed: LockTime = bytes.as_slice().zcash_deserialize_into().unwrap();
            assert_eq!(parsed, lock_time);
        }
    }

    #[test]
    fn boundary_is_interpreted_as_time() {
        let bytes = (LockTime::MIN_TIMESTAMP as u32).to_le_bytes();
        let parsed: LockTime = bytes.as_slice().zcash_deserialize_into().unwrap();
        assert!(matches!(parsed, LockTime::Time(_)));

        let bytes = ((LockTime::MIN_TIMESTAMP - 1) as u32).to_le_bytes();
        let parsed: LockTime = bytes.as_slice().zcash_deserialize_into().unwrap();
        assert!(matches!(parsed, LockTime::Height(_)));
    }
}
