//! Monetary values.

use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Cost of one unit of an item, never negative.
///
/// Stored as a decimal so that `quantity × unit_cost` is exact; the data file
/// keeps the canonical string form.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct UnitCost(Decimal);

impl UnitCost {
    pub const ZERO: UnitCost = UnitCost(Decimal::ZERO);

    pub fn new(amount: Decimal) -> DomainResult<Self> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(DomainError::validation(format!(
                "unit cost cannot be negative (got {amount})"
            )));
        }
        Ok(Self(amount.normalize()))
    }

    pub fn amount(self) -> Decimal {
        self.0
    }

    /// Value of `quantity` units at this cost; `None` past the decimal range.
    pub fn total_for(self, quantity: i64) -> Option<Decimal> {
        self.0.checked_mul(Decimal::from(quantity))
    }
}

impl core::fmt::Display for UnitCost {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for UnitCost {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount = Decimal::from_str(s.trim())
            .map_err(|e| DomainError::validation(format!("unit cost '{s}': {e}")))?;
        Self::new(amount)
    }
}

impl TryFrom<Decimal> for UnitCost {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UnitCost> for Decimal {
    fn from(value: UnitCost) -> Self {
        value.0
    }
}

impl ValueObject for UnitCost {}
