//! Equihash Solution and related items.

use std::{fmt, io};

use crate::block::Header;
use crate::serialization::{
    serde_helpers::BigArray, ReadZcashExt, SerializationError, WriteZcashExt, ZcashDeserialize,
    ZcashSerialize,
};

/// The error type for Equihash validation.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
#[error("invalid equihash solution for BlockHeader")]
pub struct Error(#[from] equihash::Error);

/// The error type for Equihash solving.
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("solver was cancelled")]
pub struct SolverCancelled;

/// The size of a production Equihash solution in bytes: the encoding of
/// the 512 indices of an (n, k) = (200, 9) solution.
pub const SOLUTION_SIZE: usize = 1344;

/// The size of a regtest Equihash solution in bytes: the encoding of the
/// 32 indices of an (n, k) = (48, 5) solution.
pub const REGTEST_SOLUTION_SIZE: usize = 36;

/// Equihash Solution in compressed format.
///
/// A wrapper around a fixed byte array, because Rust doesn't implement
/// common traits for arrays past length 32.
///
/// The size of an Equihash solution is a parameter of the proof-of-work
/// instance: 1344 bytes on Mainnet and Testnet, 36 bytes on Regtest.
#[derive(Serialize, Deserialize)]
pub enum Solution {
    /// Production variant, for the (200, 9) parameters used on Mainnet and
    /// Testnet.
    Common(#[serde(with = "BigArray")] [u8; SOLUTION_SIZE]),

    /// Regtest variant, for the (48, 5) parameters.
    Regtest(#[serde(with = "BigArray")] [u8; REGTEST_SOLUTION_SIZE]),
}

impl Solution {
    /// The length of the portion of the header used as input when
    /// verifying equihash solutions, in bytes.
    ///
    /// Excludes the 32-byte nonce, which is passed as a separate argument
    /// to the verification function.
    pub const INPUT_LENGTH: usize = 4 + 32 * 3 + 4 * 2;

    /// Returns the inner solution bytes.
    pub fn value(&self) -> &[u8] {
        match self {
            Solution::Common(bytes) => bytes.as_slice(),
            Solution::Regtest(bytes) => bytes.as_slice(),
        }
    }

    /// Returns the Equihash parameters `(n, k)` this solution's length
    /// corresponds to.
    pub fn params(&self) -> (u32, u32) {
        match self {
            Solution::Common(_) => (200, 9),
            Solution::Regtest(_) => (48, 5),
        }
    }

    /// Returns `Ok(())` if `Solution` is valid for `header`.
    pub fn check(&self, header: &Header) -> Result<(), Error> {
        let (n, k) = self.params();
        let nonce = &header.nonce;

        let mut input = Vec::new();
        header
            .zcash_serialize(&mut input)
            .expect("serialization into a vec can't fail");
        let input = &input[0..Solution::INPUT_LENGTH];

        equihash::is_valid_solution(n, k, input, nonce.as_ref(), self.value())?;

        Ok(())
    }

    /// Returns an all-zero solution of production size, used to fill the
    /// solution field in block proposals and templates before mining.
    pub fn for_proposal() -> Self {
        Solution::Common([0; SOLUTION_SIZE])
    }

    /// Returns an all-zero solution of regtest size.
    pub fn for_regtest_proposal() -> Self {
        Solution::Regtest([0; REGTEST_SOLUTION_SIZE])
    }
}

impl PartialEq<Solution> for Solution {
    fn eq(&self, other: &Solution) -> bool {
        self.value() == other.value()
    }
}

impl fmt::Debug for Solution {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("EquihashSolution")
            .field(&hex::encode(self.value()))
            .finish()
    }
}

// These impls all only exist because of array length restrictions.

impl Copy for Solution {}

impl Clone for Solution {
    fn clone(&self) -> Self {
        *self
    }
}

impl Eq for Solution {}

impl ZcashSerialize for Solution {
    fn zcash_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        writer.write_compactsize(self.value().len() as u64)?;
        writer.write_all(self.value())?;
        Ok(())
    }
}

impl ZcashDeserialize for Solution {
    fn zcash_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let solution_size = reader.read_compactsize()?;

        match solution_size as usize {
            SOLUTION_SIZE => {
                let mut bytes = [0; SOLUTION_SIZE];
                reader.read_exact(&mut bytes[..])?;
                Ok(Solution::Common(bytes))
            }
            REGTEST_SOLUTION_SIZE => {
                let mut bytes = [0; REGTEST_SOLUTION_SIZE];
                reader.read_exact(&mut bytes[..])?;
                Ok(Solution::Regtest(bytes))
            }
            _ => Err(SerializationError::Parse("incorrect equihash solution size")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::serialization::ZcashDeserializeInto;

    static EQUIHASH_SIZE_TESTS: &[u64] = &[
        0,
        1,
        (REGTEST_SOLUTION_SIZE - 1) as u64,
        REGTEST_SOLUTION_SIZE as u64,
        (SOLUTION_SIZE - 1) as u64,
        SOLUTION_SIZE as u64,
        (SOLUTION_SIZE + 1) as u64,
    ];

    #[test]
    fn equihash_solution_size_field() {
        for size in EQUIHASH_SIZE_TESTS {
            let mut data = Vec::new();
            data.write_compactsize(*size)
                .expect("compact size should serialize");
            data.resize(data.len() + SOLUTION_SIZE, 0);
            let result: Result<Solution, _> = data.as_slice().zcash_deserialize_into();
            if *size == (SOLUTION_SIZE as u64) || *size == (REGTEST_SOLUTION_SIZE as u64) {
                result.expect("accepted equihash solution size should deserialize");
            } else {
                result.expect_err("wrong equihash solution size should fail to deserialize");
            }
        }
    }

    #[test]
    fn solution_round_trip() {
        for solution in [Solution::for_proposal(), Solution::for_regtest_proposal()] {
            let bytes = solution.zcash_serialize_to_vec().unwrap();
            let parsed: Solution = bytes.as_slice().zcash_deserialize_into().unwrap();
            assert_eq!(parsed, solution);
        }
    }
}
