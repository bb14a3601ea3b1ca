//! Consensus-critical serialization.
//!
//! This module contains the `ZcashSerialize` and `ZcashDeserialize` traits,
//! analogs of the Serde `Serialize` and `Deserialize` traits but intended
//! for consensus-critical Zcash wire formats, and the `WriteZcashExt` and
//! `ReadZcashExt` extension traits with utility functions for the
//! Bitcoin-inherited variable-integer format.

mod constraint;
mod error;
mod read_zcash;
mod write_zcash;
mod zcash_deserialize;
mod zcash_serialize;

pub(crate) mod serde_helpers;

pub mod sha256d;

pub use constraint::AtLeastOne;
pub use error::SerializationError;
pub use read_zcash::ReadZcashExt;
pub use write_zcash::WriteZcashExt;
pub use zcash_deserialize::{
    zcash_deserialize_external_count, TrustedPreallocate, ZcashDeserialize, ZcashDeserializeInto,
};
pub use zcash_serialize::{
    zcash_serialize_bytes, zcash_serialize_external_count, ZcashSerialize,
    MAX_PROTOCOL_MESSAGE_LEN,
};
