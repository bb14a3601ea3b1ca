//! Serialization constraint helpers.

use std::{convert::TryFrom, ops::Deref};

use crate::serialization::SerializationError;

/// A `Vec<T>` wrapper that ensures there is at least one `T` in the vector.
///
/// Some Zcash consensus formats, like the Orchard action array, reject empty
/// vectors. `AtLeastOne` makes the emptiness constraint unrepresentable.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<T>")]
#[serde(bound = "T: Clone + serde::Serialize + serde::de::DeserializeOwned")]
pub struct AtLeastOne<T> {
    /// The inner vector, which must have at least one element.
    ///
    /// `inner` is private to stop external callers constructing empty
    /// vectors.
    inner: Vec<T>,
}

impl<T> TryFrom<Vec<T>> for AtLeastOne<T> {
    type Error = SerializationError;

    fn try_from(vec: Vec<T>) -> Result<Self, Self::Error> {
        if vec.is_empty() {
            Err(SerializationError::Parse("expected at least one item"))
        } else {
            Ok(AtLeastOne { inner: vec })
        }
    }
}

impl<T> Deref for AtLeastOne<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Vec<T> {
        &self.inner
    }
}

impl<T> From<AtLeastOne<T>> for Vec<T> {
    fn from(vec: AtLeastOne<T>) -> Self {
        vec.inner
    }
}

impl<T> AtLeastOne<T> {
    /// Returns a reference to the first element.
    ///
    /// Unlike `Vec` or slice `first`, does not return an `Option`.
    pub fn first(&self) -> &T {
        &self.inner[0]
    }

    /// Returns the inner vector.
    pub fn into_vec(self) -> Vec<T> {
        self.inner
    }

    /// Appends an element, preserving the constraint.
    pub fn push(&mut self, element: T) {
        self.inner.push(element);
    }
}

/// Create an initialized [`AtLeastOne`], checking that it has at least one
/// item.
///
/// ```
/// # use quagga_chain::at_least_one;
/// let v = at_least_one![1, 2, 3];
/// assert_eq!(v.first(), &1);
/// ```
#[macro_export]
macro_rules! at_least_one {
    ($($x:expr),+ $(,)?) => (
        <Vec<_> as std::convert::TryInto<$crate::serialization::AtLeastOne<_>>>::try_into(
            vec![$($x),+],
        )
        .expect("at_least_one! arguments are non-empty")
    );
}
