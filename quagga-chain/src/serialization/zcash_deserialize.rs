use std::{convert::TryInto, io};

use byteorder::ReadBytesExt;

use super::{ReadZcashExt, SerializationError, MAX_PROTOCOL_MESSAGE_LEN};

/// Consensus-critical deserialization for Zcash.
///
/// This trait provides a generic deserialization for consensus-critical
/// formats, such as network messages, transactions, blocks, etc. It is
/// intended for use only in consensus-critical contexts; in other contexts,
/// such as internal storage, it would be preferable to use Serde.
pub trait ZcashDeserialize: Sized {
    /// Try to read `self` from the given `reader`.
    ///
    /// This function has a `zcash_` prefix to alert the reader that the
    /// serialization in use is consensus-critical serialization, rather than
    /// some other kind of serialization.
    fn zcash_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError>;
}

impl<T: ZcashDeserialize + TrustedPreallocate> ZcashDeserialize for Vec<T> {
    fn zcash_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let len = reader.read_compactsize()?;
        if len > T::max_allocation() {
            return Err(SerializationError::Parse(
                "vector longer than max_allocation",
            ));
        }
        zcash_deserialize_external_count(len.try_into()?, reader)
    }
}

/// Deserialize a typed `Vec` whose item count is supplied externally.
///
/// The external count is required by parts of the `Transaction::V5` format,
/// where several arrays share one length field.
pub fn zcash_deserialize_external_count<R: io::Read, T: ZcashDeserialize>(
    external_count: usize,
    mut reader: R,
) -> Result<Vec<T>, SerializationError> {
    let mut vec = Vec::with_capacity(external_count);
    for _ in 0..external_count {
        vec.push(T::zcash_deserialize(&mut reader)?);
    }
    Ok(vec)
}

/// Read a byte.
impl ZcashDeserialize for u8 {
    fn zcash_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(reader.read_u8()?)
    }
}

/// Read a Bitcoin-encoded byte vector.
impl ZcashDeserialize for Vec<u8> {
    fn zcash_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let len = reader.read_compactsize()?;
        if len > MAX_PROTOCOL_MESSAGE_LEN as u64 {
            return Err(SerializationError::Parse(
                "byte vector longer than a protocol message",
            ));
        }
        let mut vec = vec![0u8; len.try_into()?];
        reader.read_exact(&mut vec)?;
        Ok(vec)
    }
}

/// Helper for deserializing more succinctly via type inference.
pub trait ZcashDeserializeInto {
    /// Deserialize based on type inference
    fn zcash_deserialize_into<T>(self) -> Result<T, SerializationError>
    where
        T: ZcashDeserialize;
}

impl<R: io::Read> ZcashDeserializeInto for R {
    fn zcash_deserialize_into<T>(self) -> Result<T, SerializationError>
    where
        T: ZcashDeserialize,
    {
        T::zcash_deserialize(self)
    }
}

/// Blind preallocation of a `Vec<T: TrustedPreallocate>` can be done safely.
/// This is in contrast to blind preallocation of a generic `Vec<T>`, which
/// is a DoS vector.
///
/// The `max_allocation()` function provides a loose upper bound on the size
/// of the `Vec<T: TrustedPreallocate>` which can possibly be received from
/// an honest peer.
pub trait TrustedPreallocate {
    /// Provides a loose upper bound on the number of `T`s which can possibly
    /// be received from an honest peer.
    fn max_allocation() -> u64;
}
