//! RedPallas signature types, carried in their wire encoding.
//!
//! Structurally identical to [`redjubjub`](super::redjubjub), but over the
//! Pallas curve, as used by Orchard.

use std::{fmt, io, marker::PhantomData};

use crate::serialization::{
    serde_helpers::BigArray, ReadZcashExt, SerializationError, ZcashDeserialize, ZcashSerialize,
};

/// A marker trait for the two RedPallas key/signature flavors.
pub trait SigType: private::Sealed {}

/// A type variable corresponding to Orchard spend authorization signatures.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum SpendAuth {}

/// A type variable corresponding to Orchard binding signatures.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Binding {}

impl SigType for SpendAuth {}
impl SigType for Binding {}

mod private {
    pub trait Sealed {}
    impl Sealed for super::SpendAuth {}
    impl Sealed for super::Binding {}
}

/// A RedPallas signature of type `T`, in its 64-byte wire encoding.
#[derive(Serialize, Deserialize)]
#[serde(bound = "T: SigType")]
pub struct Signature<T: SigType> {
    #[serde(with = "BigArray")]
    bytes: [u8; 64],
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: SigType> From<[u8; 64]> for Signature<T> {
    fn from(bytes: [u8; 64]) -> Self {
        Self {
            bytes,
            _marker: PhantomData,
        }
    }
}

impl<T: SigType> From<Signature<T>> for [u8; 64] {
    fn from(sig: Signature<T>) -> Self {
        sig.bytes
    }
}

impl<T: SigType> AsRef<[u8]> for Signature<T> {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl<T: SigType> fmt::Debug for Signature<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple(&format!("redpallas::Signature<{}>", std::any::type_name::<T>()))
            .field(&hex::encode(self.bytes))
            .finish()
    }
}

impl<T: SigType> Copy for Signature<T> {}

impl<T: SigType> Clone for Signature<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: SigType> PartialEq for Signature<T> {
    fn eq(&self, other: &Self) -> bool {
        self.bytes[..] == other.bytes[..]
    }
}

impl<T: SigType> Eq for Signature<T> {}

impl<T: SigType> ZcashSerialize for Signature<T> {
    fn zcash_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        writer.write_all(&self.bytes)
    }
}

impl<T: SigType> ZcashDeserialize for Signature<T> {
    fn zcash_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(reader.read_64_bytes()?.into())
    }
}
