//! Strongly-typed zatoshi amounts that prevent under/overflows.
//!
//! The [`Amount`] type is parameterized by a [`Constraint`] implementation
//! that declares the range of allowed values. In contrast to regular
//! arithmetic operations, which return values, arithmetic on [`Amount`]s
//! returns [`Result`](std::result::Result)s.

use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    io,
    marker::PhantomData,
    ops::RangeInclusive,
};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::serialization::{SerializationError, ZcashDeserialize, ZcashSerialize};

/// The result of an amount operation.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// One ZEC, denominated in zatoshis.
pub const COIN: i64 = 100_000_000;

/// The maximum zatoshi amount.
pub const MAX_MONEY: i64 = 21_000_000 * COIN;

/// A runtime validated type for representing amounts of zatoshis.
#[derive(Clone, Copy, Default, Serialize, Deserialize)]
#[serde(try_from = "i64")]
#[serde(into = "i64")]
#[serde(bound = "C: Constraint + Clone")]
pub struct Amount<C = NegativeAllowed>(
    /// The inner amount value.
    i64,
    /// Used for [`Constraint`] type inference.
    ///
    /// # Correctness
    ///
    /// This internal marker type is not consensus-critical, and it should be
    /// ignored during testing.
    #[serde(skip)]
    PhantomData<C>,
);

impl<C> fmt::Display for Amount<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let zats = self.zatoshis();

        f.pad_integral(zats > 0, "", &zats.to_string())
    }
}

impl<C> fmt::Debug for Amount<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple(&format!("Amount<{}>", std::any::type_name::<C>()))
            .field(&self.0)
            .finish()
    }
}

impl<C> Amount<C> {
    /// Convert this amount to a different Amount type if it satisfies the new
    /// constraint
    pub fn constrain<C2>(self) -> Result<Amount<C2>>
    where
        C2: Constraint,
    {
        self.0.try_into()
    }

    /// Returns the number of zatoshis in this amount.
    pub fn zatoshis(&self) -> i64 {
        self.0
    }

    /// To little endian byte array
    pub fn to_bytes(&self) -> [u8; 8] {
        let mut buf: [u8; 8] = [0; 8];
        LittleEndian::write_i64(&mut buf, self.0);
        buf
    }

    /// From little endian byte array
    pub fn from_bytes(bytes: [u8; 8]) -> Result<Amount<C>>
    where
        C: Constraint,
    {
        let amount = i64::from_le_bytes(bytes);
        amount.try_into()
    }

    /// Create a zero `Amount`
    pub fn zero() -> Amount<C>
    where
        C: Constraint,
    {
        0i64.try_into().expect("an amount of 0 is always valid")
    }
}

impl<C> std::ops::Add<Amount<C>> for Amount<C>
where
    C: Constraint,
{
    type Output = Result<Amount<C>>;

    fn add(self, rhs: Amount<C>) -> Self::Output {
        let value = self
            .0
            .checked_add(rhs.0)
            .expect("adding two constrained Amounts is always within an i64");
        value.try_into()
    }
}

impl<C> std::ops::Add<Amount<C>> for Result<Amount<C>>
where
    C: Constraint,
{
    type Output = Result<Amount<C>>;

    fn add(self, rhs: Amount<C>) -> Self::Output {
        self? + rhs
    }
}

impl<C> std::ops::Add<Result<Amount<C>>> for Amount<C>
where
    C: Constraint,
{
    type Output = Result<Amount<C>>;

    fn add(self, rhs: Result<Amount<C>>) -> Self::Output {
        self + rhs?
    }
}

impl<C> std::ops::AddAssign<Amount<C>> for Result<Amount<C>>
where
    Amount<C>: Copy,
    C: Constraint,
{
    fn add_assign(&mut self, rhs: Amount<C>) {
        if let Ok(lhs) = *self {
            *self = lhs + rhs;
        }
    }
}

impl<C> std::ops::Sub<Amount<C>> for Amount<C>
where
    C: Constraint,
{
    type Output = Result<Amount<C>>;

    fn sub(self, rhs: Amount<C>) -> Self::Output {
        let value = self
            .0
            .checked_sub(rhs.0)
            .expect("subtracting two constrained Amounts is always within an i64");
        value.try_into()
    }
}

impl<C> std::ops::Sub<Amount<C>> for Result<Amount<C>>
where
    C: Constraint,
{
    type Output = Result<Amount<C>>;

    fn sub(self, rhs: Amount<C>) -> Self::Output {
        self? - rhs
    }
}

impl<C> std::ops::Sub<Result<Amount<C>>> for Amount<C>
where
    C: Constraint,
{
    type Output = Result<Amount<C>>;

    fn sub(self, rhs: Result<Amount<C>>) -> Self::Output {
        self - rhs?
    }
}

impl<C> std::ops::SubAssign<Amount<C>> for Result<Amount<C>>
where
    Amount<C>: Copy,
    C: Constraint,
{
    fn sub_assign(&mut self, rhs: Amount<C>) {
        if let Ok(lhs) = *self {
            *self = lhs - rhs;
        }
    }
}

impl<C> std::ops::Neg for Amount<C> {
    type Output = Amount<NegativeAllowed>;

    fn neg(self) -> Self::Output {
        Amount::<NegativeAllowed>(-self.0, PhantomData)
    }
}

impl<C> std::ops::Mul<u64> for Amount<C>
where
    C: Constraint,
{
    type Output = Result<Amount<C>>;

    fn mul(self, rhs: u64) -> Self::Output {
        // use i128 for multiplication, so we can detect overflow
        let value = (self.0 as i128) * (rhs as i128);
        let value: i64 = value.try_into().map_err(|_| Error::MultiplicationOverflow {
            amount: self.0,
            multiplier: rhs,
        })?;
        value.try_into()
    }
}

impl<C> std::ops::Div<u64> for Amount<C>
where
    C: Constraint,
{
    type Output = Result<Amount<C>>;

    fn div(self, rhs: u64) -> Self::Output {
        let quotient = (self.0 as i128)
            .checked_div(rhs as i128)
            .ok_or(Error::DivideByZero { amount: self.0 })?;
        let quotient: i64 = quotient
            .try_into()
            .expect("division by a positive integer always stays within the constraint");
        quotient.try_into()
    }
}

impl<C> From<Amount<C>> for i64 {
    fn from(amount: Amount<C>) -> Self {
        amount.0
    }
}

impl From<Amount<NonNegative>> for u64 {
    fn from(amount: Amount<NonNegative>) -> Self {
        amount.0.try_into().expect("non-negative i64 fits in u64")
    }
}

impl<C> TryFrom<i64> for Amount<C>
where
    C: Constraint,
{
    type Error = Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        C::validate(value).map(|v| Self(v, PhantomData))
    }
}

impl<C> TryFrom<u64> for Amount<C>
where
    C: Constraint,
{
    type Error = Error;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        let value = value.try_into().map_err(|_| Error::Constraint {
            value: i64::MAX,
            range: C::valid_range(),
        })?;
        C::validate(value).map(|v| Self(v, PhantomData))
    }
}

impl<C> Hash for Amount<C> {
    /// Amounts with the same value are equal, even if they have different
    /// constraints
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<C1, C2> PartialEq<Amount<C2>> for Amount<C1> {
    fn eq(&self, other: &Amount<C2>) -> bool {
        self.0.eq(&other.0)
    }
}

impl<C> PartialEq<i64> for Amount<C> {
    fn eq(&self, other: &i64) -> bool {
        self.0.eq(other)
    }
}

impl<C> PartialEq<Amount<C>> for i64 {
    fn eq(&self, other: &Amount<C>) -> bool {
        self.eq(&other.0)
    }
}

impl<C> Eq for Amount<C> {}

impl<C1, C2> PartialOrd<Amount<C2>> for Amount<C1> {
    fn partial_cmp(&self, other: &Amount<C2>) -> Option<Ordering> {
        Some(self.0.cmp(&other.0))
    }
}

impl<C> Ord for Amount<C> {
    fn cmp(&self, other: &Amount<C>) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl<C> std::iter::Sum<Amount<C>> for Result<Amount<C>>
where
    C: Constraint,
{
    fn sum<I: Iterator<Item = Amount<C>>>(iter: I) -> Self {
        let sum: i128 = iter.map(|a| a.0 as i128).sum();
        let sum: i64 = sum.try_into().map_err(|_| Error::SumOverflow { sum })?;
        sum.try_into()
    }
}

impl<'amt, C> std::iter::Sum<&'amt Amount<C>> for Result<Amount<C>>
where
    C: Constraint + std::marker::Copy + 'amt,
{
    fn sum<I: Iterator<Item = &'amt Amount<C>>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// Errors that can be returned when validating [`Amount`]s.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Error {
    /// The value is outside the constraint's valid range.
    #[error("input {value} is outside of valid range for zatoshi Amount, valid_range={range:?}")]
    Constraint {
        value: i64,
        range: RangeInclusive<i64>,
    },

    #[error("amount {amount} exceeded the valid range when multiplied by {multiplier}")]
    MultiplicationOverflow { amount: i64, multiplier: u64 },

    #[error("cannot divide amount {amount} by zero")]
    DivideByZero { amount: i64 },

    #[error("summing amounts overflowed an i128: {sum}")]
    SumOverflow { sum: i128 },
}

/// Marker type for `Amount` that allows negative values.
///
/// ```text
/// -MAX_MONEY..=MAX_MONEY
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Default, Serialize, Deserialize)]
pub struct NegativeAllowed;

impl Constraint for NegativeAllowed {
    fn valid_range() -> RangeInclusive<i64> {
        -MAX_MONEY..=MAX_MONEY
    }
}

/// Marker type for `Amount` that requires non-negative values.
///
/// ```text
/// 0..=MAX_MONEY
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Default, Serialize, Deserialize)]
pub struct NonNegative;

impl Constraint for NonNegative {
    fn valid_range() -> RangeInclusive<i64> {
        0..=MAX_MONEY
    }
}

/// Marker type for `Amount` that requires negative or zero values.
///
/// Used for coinbase transactions in the parallel fees array of a block
/// template, where the coinbase entry is the negated sum of the other fees.
///
/// ```text
/// -MAX_MONEY..=0
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Default, Serialize, Deserialize)]
pub struct NegativeOrZero;

impl Constraint for NegativeOrZero {
    fn valid_range() -> RangeInclusive<i64> {
        -MAX_MONEY..=0
    }
}

/// The constraint applied to `Amount` values.
pub trait Constraint {
    /// Returns the range of values that are valid under this constraint
    fn valid_range() -> RangeInclusive<i64>;

    /// Check if an input value is within the valid range
    fn validate(value: i64) -> Result<i64, Error> {
        let range = Self::valid_range();

        if !range.contains(&value) {
            Err(Error::Constraint { value, range })
        } else {
            Ok(value)
        }
    }
}

impl ZcashSerialize for Amount<NegativeAllowed> {
    fn zcash_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        writer.write_i64::<LittleEndian>(self.0)
    }
}

impl ZcashDeserialize for Amount<NegativeAllowed> {
    fn zcash_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(reader.read_i64::<LittleEndian>()?.try_into()?)
    }
}

impl ZcashSerialize for Amount<NonNegative> {
    fn zcash_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        let amount = self
            .0
            .try_into()
            .expect("constraint guarantees the value is non-negative");
        writer.write_u64::<LittleEndian>(amount)
    }
}

impl ZcashDeserialize for Amount<NonNegative> {
    fn zcash_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(reader.read_u64::<LittleEndian>()?.try_into()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use color_eyre::eyre::Result;

    #[test]
    fn test_add_bare() -> Result<()> {
        let one: Amount = 1.try_into()?;
        let neg_one: Amount = (-1).try_into()?;

        let zero: Amount = Amount::zero();
        let new_zero = one + neg_one;

        assert_eq!(zero, new_zero?);

        Ok(())
    }

    #[test]
    fn add_opt_lhs() -> Result<()> {
        let one: Amount = 1.try_into()?;
        let one = Ok(one);
        let neg_one: Amount = (-1).try_into()?;

        let zero: Amount = Amount::zero();
        let new_zero = one + neg_one;

        assert_eq!(zero, new_zero?);

        Ok(())
    }

    #[test]
    fn add_assign() -> Result<()> {
        let one: Amount = 1.try_into()?;
        let neg_one: Amount = (-1).try_into()?;
        let mut running_total = Ok(neg_one);

        running_total += one;
        assert_eq!(Amount::zero(), running_total?);

        Ok(())
    }

    #[test]
    fn test_sub_bare() -> Result<()> {
        let one: Amount = 1.try_into()?;
        let zero: Amount = Amount::zero();

        let neg_one: Amount = (-1).try_into()?;
        let new_neg_one = zero - one;

        assert_eq!(neg_one, new_neg_one?);

        Ok(())
    }

    #[test]
    fn add_with_diff_constraint() -> Result<()> {
        let one = Amount::<NonNegative>::try_from(1)?;
        let zero = Amount::<NegativeAllowed>::zero();

        (zero - one.constrain()?).expect("should allow negative");
        (zero.constrain::<NonNegative>()? - one).expect_err("shouldn't allow negative");

        Ok(())
    }

    #[test]
    fn mul_and_div() -> Result<()> {
        let five = Amount::<NonNegative>::try_from(5)?;

        assert_eq!(Amount::<NonNegative>::try_from(15)?, (five * 3)?);
        assert_eq!(Amount::<NonNegative>::try_from(2)?, (five / 2)?);
        assert!(matches!(five / 0, Err(Error::DivideByZero { .. })));

        Ok(())
    }

    #[test]
    fn max_money_is_rejected_when_exceeded() {
        assert!(Amount::<NonNegative>::try_from(MAX_MONEY).is_ok());
        assert!(Amount::<NonNegative>::try_from(MAX_MONEY + 1).is_err());
        assert!(Amount::<NonNegative>::try_from(-1).is_err());
        assert!(Amount::<NegativeOrZero>::try_from(1).is_err());
        assert!(Amount::<NegativeOrZero>::try_from(-MAX_MONEY).is_ok());
    }

    #[test]
    fn sum_amounts() -> Result<()> {
        let amounts: Vec<Amount<NonNegative>> =
            vec![1.try_into()?, 2.try_into()?, 3.try_into()?];

        let sum: Amount<NonNegative> = amounts.iter().sum::<super::Result<_>>()?;
        assert_eq!(sum, 6);

        Ok(())
    }

    #[test]
    fn serialize_round_trips() -> Result<()> {
        use crate::serialization::{ZcashDeserializeInto, ZcashSerialize};

        let amount: Amount<NonNegative> = 123_456_789.try_into()?;
        let bytes = amount.zcash_serialize_to_vec()?;
        let parsed: Amount<NonNegative> = bytes.as_slice().zcash_deserialize_into()?;
        assert_eq!(amount, parsed);

        Ok(())
    }

    mod prop {
        use proptest::prelude::*;

        use super::super::*;
        use crate::serialization::{ZcashDeserializeInto, ZcashSerialize};

        proptest! {
            #[test]
            fn amount_serialization_round_trips(value in -MAX_MONEY..=MAX_MONEY) {
                let amount: Amount = value.try_into().expect("generated values are in range");
                let bytes = amount.zcash_serialize_to_vec().expect("vec serialization");
                let parsed: Amount = bytes
                    .as_slice()
                    .zcash_deserialize_into()
                    .expect("serialized amounts deserialize");
                prop_assert_eq!(amount, parsed);
            }

            #[test]
            fn add_then_sub_round_trips(
                lhs in 0..=(MAX_MONEY / 2),
                rhs in 0..=(MAX_MONEY / 2),
            ) {
                let lhs: Amount<NonNegative> = lhs.try_into().expect("in range");
                let rhs: Amount<NonNegative> = rhs.try_into().expect("in range");

                let sum = (lhs + rhs).expect("two half-supply amounts always fit");
                prop_assert_eq!((sum - rhs).expect("subtraction undoes addition"), lhs);
            }
        }
    }
}
