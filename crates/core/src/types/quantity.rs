//! Line item quantity.

use core::fmt;
use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when constructing a [`Quantity`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    /// Quantities start at 1; removing a line is a separate operation.
    #[error("quantity must be at least 1")]
    Zero,
    /// The value does not fit the backend's `Int` type.
    #[error("quantity must be at most {max}")]
    TooLarge {
        /// Largest accepted quantity.
        max: u32,
    },
}

/// A cart line quantity, always at least 1.
///
/// Decrementing is clamped at 1 so that a "minus" click on a single item
/// never turns into a zero-quantity update.
///
/// ```
/// use baxoq_core::Quantity;
///
/// let one = Quantity::ONE;
/// assert_eq!(one.decrement(), one);
/// assert_eq!(one.increment().get(), 2);
/// assert!(Quantity::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// The smallest quantity.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Largest quantity accepted (GraphQL `Int` is a signed 32-bit integer).
    pub const MAX: u32 = i32::MAX.unsigned_abs();

    /// Create a quantity.
    ///
    /// # Errors
    ///
    /// Returns an error for zero or for values above [`Quantity::MAX`].
    pub fn new(value: u32) -> Result<Self, QuantityError> {
        if value > Self::MAX {
            return Err(QuantityError::TooLarge { max: Self::MAX });
        }
        NonZeroU32::new(value).map(Self).ok_or(QuantityError::Zero)
    }

    /// The quantity as a plain integer.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// One more, saturating at [`Quantity::MAX`].
    #[must_use]
    pub fn increment(self) -> Self {
        Self::new(self.get().saturating_add(1)).unwrap_or(self)
    }

    /// One less, clamped at 1.
    #[must_use]
    pub fn decrement(self) -> Self {
        Self::new(self.get() - 1).unwrap_or(Self::ONE)
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value <= 0 {
            return Err(QuantityError::Zero);
        }
        let value = u32::try_from(value).map_err(|_| QuantityError::TooLarge { max: Self::MAX })?;
        Self::new(value)
    }
}

impl From<Quantity> for i64 {
    fn from(quantity: Quantity) -> Self {
        Self::from(quantity.get())
    }
}
