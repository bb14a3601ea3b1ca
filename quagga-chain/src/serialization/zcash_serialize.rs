use std::io;

use super::WriteZcashExt;

/// The maximum length of a Zcash message, in bytes.
///
/// This value is used to calculate safe preallocation limits for some types.
pub const MAX_PROTOCOL_MESSAGE_LEN: usize = 2 * 1024 * 1024;

/// Consensus-critical serialization for Zcash.
///
/// This trait provides a generic serialization for consensus-critical
/// formats, such as network messages, transactions, blocks, etc. It is
/// intended for use only in consensus-critical contexts; in other contexts,
/// such as internal storage, it would be preferable to use Serde.
pub trait ZcashSerialize: Sized {
    /// Write `self` to the given `writer` using the canonical format.
    ///
    /// This function has a `zcash_` prefix to alert the reader that the
    /// serialization in use is consensus-critical serialization, rather than
    /// some other kind of serialization.
    ///
    /// Notice that the error type is [`std::io::Error`]; this indicates that
    /// serialization MUST be infallible up to errors in the underlying
    /// writer. In other words, any type implementing `ZcashSerialize` must
    /// make illegal states unrepresentable.
    fn zcash_serialize<W: io::Write>(&self, writer: W) -> Result<(), io::Error>;

    /// Helper function to construct a vec to serialize the current struct into
    fn zcash_serialize_to_vec(&self) -> Result<Vec<u8>, io::Error> {
        let mut data = Vec::new();
        self.zcash_serialize(&mut data)?;
        Ok(data)
    }

    /// Get the size of `self` by using a fake writer.
    fn zcash_serialized_size(&self) -> usize {
        let mut writer = FakeWriter(0);
        self.zcash_serialize(&mut writer)
            .expect("writer is infallible");
        writer.0
    }
}

/// A fake writer helper used to get object lengths without allocating.
pub struct FakeWriter(pub usize);

impl io::Write for FakeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Serialize a `Vec` as a compactsize count, then the items.
impl<T: ZcashSerialize> ZcashSerialize for Vec<T> {
    fn zcash_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        writer.write_compactsize(self.len() as u64)?;
        zcash_serialize_external_count(self, writer)
    }
}

/// Serialize a typed `Vec` **without** writing the number of items as a
/// compactsize.
///
/// In Zcash, most arrays are stored as a compactsize, followed by the items.
/// But in `Transaction::V5`, some types are serialized multiple times in
/// different arrays, and the number of items is written once before the
/// first array.
pub fn zcash_serialize_external_count<W: io::Write, T: ZcashSerialize>(
    vec: &[T],
    mut writer: W,
) -> Result<(), io::Error> {
    for x in vec {
        x.zcash_serialize(&mut writer)?;
    }
    Ok(())
}

/// Write a Bitcoin-encoded byte `Vec`.
///
/// Byte vectors are serialized as a count followed by the raw bytes, without
/// any per-item structure.
pub fn zcash_serialize_bytes<W: io::Write>(vec: &Vec<u8>, mut writer: W) -> Result<(), io::Error> {
    writer.write_compactsize(vec.len() as u64)?;
    writer.write_all(vec)
}
