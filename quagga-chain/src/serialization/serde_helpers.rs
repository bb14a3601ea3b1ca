//! Serde helper for byte arrays larger than 32 elements.
//!
//! Serde only provides impls for arrays up to 32 elements, so the
//! fixed-size proof, signature, and ciphertext fields in shielded
//! components need a manual impl.

use std::fmt;

use serde::{
    de::{Error, SeqAccess, Visitor},
    ser::SerializeTuple,
    Deserializer, Serializer,
};

/// Serialize and deserialize a `[u8; N]` for `N` past serde's built-in
/// limit.
pub trait BigArray<'de>: Sized {
    /// Serialize `self` as a fixed-size sequence.
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer;

    /// Deserialize a fixed-size sequence into `Self`.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>;
}

macro_rules! big_array {
    ($($len:expr,)+) => {
        $(
            impl<'de> BigArray<'de> for [u8; $len] {
                fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
                where
                    S: Serializer,
                {
                    let mut seq = serializer.serialize_tuple(self.len())?;
                    for elem in &self[..] {
                        seq.serialize_element(elem)?;
                    }
                    seq.end()
                }

                fn deserialize<D>(deserializer: D) -> Result<[u8; $len], D::Error>
                where
                    D: Deserializer<'de>,
                {
                    struct ArrayVisitor;

                    impl<'de> Visitor<'de> for ArrayVisitor {
                        type Value = [u8; $len];

                        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                            write!(formatter, "an array of length {}", $len)
                        }

                        fn visit_seq<A>(self, mut seq: A) -> Result<[u8; $len], A::Error>
                        where
                            A: SeqAccess<'de>,
                        {
                            let mut arr = [0u8; $len];
                            for (i, byte) in arr.iter_mut().enumerate() {
                                *byte = seq
                                    .next_element()?
                                    .ok_or_else(|| Error::invalid_length(i, &self))?;
                            }
                            Ok(arr)
                        }
                    }

                    deserializer.deserialize_tuple($len, ArrayVisitor)
                }
            }
        )+
    }
}

big_array! {
    36,
    43,
    64,
    80,
    192,
    580,
    601,
    1344,
}
