//! Transaction identifiers.

use std::fmt;

use crate::serialization::{sha256d, SerializationError, ZcashSerialize};

use super::{txid::TxIdBuilder, Transaction};

/// A transaction hash: the mined transaction ID.
///
/// For v4 transactions, this is the double-SHA256 of the serialized
/// transaction. From v5 onwards, it is the non-malleable [ZIP-244] txid
/// digest, which excludes authorizing data.
///
/// [ZIP-244]: https://zips.z.cash/zip-0244
#[derive(Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    /// Return the hash bytes in big-endian byte-order, suitable for
    /// printing out byte by byte.
    pub fn bytes_in_display_order(&self) -> [u8; 32] {
        let mut reversed_bytes = self.0;
        reversed_bytes.reverse();
        reversed_bytes
    }
}

impl From<&Transaction> for Hash {
    fn from(transaction: &Transaction) -> Self {
        match transaction {
            Transaction::V4 { .. } => {
                let bytes = transaction
                    .zcash_serialize_to_vec()
                    .expect("serialization into a vec can't fail");
                Hash(sha256d::digest(&bytes))
            }
            Transaction::V5 { .. } => TxIdBuilder::new(transaction).txid(),
        }
    }
}

impl From<Transaction> for Hash {
    fn from(transaction: Transaction) -> Self {
        (&transaction).into()
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&hex::encode(self.bytes_in_display_order()))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("transaction::Hash")
            .field(&hex::encode(self.bytes_in_display_order()))
            .finish()
    }
}

impl std::str::FromStr for Hash {
    type Err = SerializationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0; 32];
        if hex::decode_to_slice(s, &mut bytes[..]).is_err() {
            Err(SerializationError::Parse("hex decoding error"))
        } else {
            bytes.reverse();
            Ok(Hash(bytes))
        }
    }
}
