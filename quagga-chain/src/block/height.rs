//! Block height.

use std::ops::{Add, Sub};

/// The height of a block is the length of the chain back to the genesis
/// block.
///
/// # Invariants
///
/// Users should not construct block heights greater than `Height::MAX`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Height(pub u32);

impl std::str::FromStr for Height {
    type Err = crate::serialization::SerializationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse() {
            Ok(h) if (Height(h) <= Height::MAX) => Ok(Height(h)),
            Ok(_) => Err(crate::serialization::SerializationError::Parse(
                "height exceeds maximum",
            )),
            Err(_) => Err(crate::serialization::SerializationError::Parse(
                "height is not a number",
            )),
        }
    }
}

impl Height {
    /// The minimum Height.
    ///
    /// Due to the underlying type, it is impossible to construct block
    /// heights less than `Height::MIN`.
    pub const MIN: Height = Height(0);

    /// The maximum Height.
    ///
    /// Users should not construct block heights greater than `Height::MAX`.
    pub const MAX: Height = Height(499_999_999);

    /// The maximum Height as a u32, for range patterns.
    pub const MAX_AS_U32: u32 = Self::MAX.0;
}

impl Add<Height> for Height {
    type Output = Option<Height>;

    fn add(self, rhs: Height) -> Option<Height> {
        // u32 overflow is impossible here, because both values are small
        let height = self.0 + rhs.0;
        if height <= Height::MAX.0 {
            Some(Height(height))
        } else {
            None
        }
    }
}

impl Sub<Height> for Height {
    type Output = i64;

    /// Panic-free subtraction of two heights.
    fn sub(self, rhs: Height) -> i64 {
        (self.0 as i64) - (rhs.0 as i64)
    }
}

impl Add<i64> for Height {
    type Output = Option<Height>;

    fn add(self, rhs: i64) -> Option<Height> {
        let result = (self.0 as i64).checked_add(rhs)?;
        let height: u32 = result.try_into().ok()?;
        if height <= Height::MAX.0 {
            Some(Height(height))
        } else {
            None
        }
    }
}

impl Sub<i64> for Height {
    type Output = Option<Height>;

    fn sub(self, rhs: i64) -> Option<Height> {
        self + (-rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn height_add_sub() {
        assert_eq!(Height(1) + 1, Some(Height(2)));
        assert_eq!(Height(1) - 1, Some(Height(0)));
        assert_eq!(Height(0) - 1, None);
        assert_eq!(Height::MAX + 1, None);
        assert_eq!(Height(10) - Height(4), 6);
        assert_eq!(Height(4) - Height(10), -6);
    }
}
