//! Fan-out of a new product across several branches.

use std::collections::BTreeMap;

use swagstock_core::{BranchId, DomainError, DomainResult};

/// Quantity per branch for a multi-branch creation.
pub type Distribution = BTreeMap<BranchId, i64>;

/// Check a distribution against the total the caller declared.
///
/// Every share must be positive and the shares must add up to exactly
/// `declared_total`. The caller is expected to have checked this already; it is
/// checked again here rather than trusted.
pub fn validate_distribution(distribution: &Distribution, declared_total: i64) -> DomainResult<()> {
    if distribution.is_empty() {
        return Err(DomainError::validation("distribution must name at least one branch"));
    }
    if declared_total <= 0 {
        return Err(DomainError::validation(format!(
            "total quantity must be greater than zero (got {declared_total})"
        )));
    }

    let mut sum: i64 = 0;
    for (branch, quantity) in distribution {
        if *quantity <= 0 {
            return Err(DomainError::validation(format!(
                "quantity for branch {branch} must be greater than zero (got {quantity})"
            )));
        }
        sum = sum
            .checked_add(*quantity)
            .ok_or_else(|| DomainError::validation("distribution total overflows"))?;
    }

    if sum != declared_total {
        return Err(DomainError::validation(format!(
            "distribution adds up to {sum} but the declared total is {declared_total}"
        )));
    }
    Ok(())
}
