//! Quantity and input rules shared by every ledger operation.

use rust_decimal::Decimal;
use swagstock_core::{DomainError, DomainResult, UnitCost};

/// Reject zero or negative quantities.
pub fn require_positive(field: &str, quantity: i64) -> DomainResult<i64> {
    if quantity <= 0 {
        return Err(DomainError::validation(format!(
            "{field} must be greater than zero (got {quantity})"
        )));
    }
    Ok(quantity)
}

/// Reject missing or blank text, returning it trimmed.
pub fn require_text(field: &str, value: &str) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

/// Quantity left after withdrawing `requested` from `available`.
///
/// Never clamps: asking for more than is there is an error and nothing changes.
pub fn check_withdrawal(available: i64, requested: i64) -> DomainResult<i64> {
    require_positive("quantity", requested)?;
    if requested > available {
        return Err(DomainError::insufficient_stock(available, requested));
    }
    Ok(available - requested)
}

/// Quantity after depositing `added` onto `available`.
pub fn check_deposit(available: i64, added: i64) -> DomainResult<i64> {
    require_positive("quantity", added)?;
    available
        .checked_add(added)
        .ok_or_else(|| DomainError::validation("quantity overflow"))
}

/// Value of `quantity` units at `unit_cost`; a row whose value cannot be
/// represented is never written.
pub fn check_valuation(quantity: i64, unit_cost: UnitCost) -> DomainResult<Decimal> {
    unit_cost.total_for(quantity).ok_or_else(|| {
        DomainError::validation(format!(
            "stock value of {quantity} units at {unit_cost} is out of range"
        ))
    })
}
