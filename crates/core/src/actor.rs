//! The acting identity passed explicitly to every mutating ledger operation.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::UserId;
use crate::value_object::ValueObject;

/// Who is performing an operation.
///
/// Identity resolution (login, OS account, ...) happens outside the core; the
/// ledger only records what it is given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    user_id: UserId,
    name: String,
}

impl Actor {
    pub fn new(user_id: UserId, name: impl Into<String>) -> DomainResult<Self> {
        let name = name.into();
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("actor name cannot be empty"));
        }
        Ok(Self {
            user_id,
            name: name.to_string(),
        })
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ValueObject for Actor {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_actor_name() {
        let actor = Actor::new(UserId::new(1), "  ana  ").unwrap();
        assert_eq!(actor.name(), "ana");
        assert_eq!(actor.user_id(), UserId::new(1));
    }

    #[test]
    fn rejects_blank_actor_name() {
        assert!(matches!(
            Actor::new(UserId::new(1), "   "),
            Err(DomainError::Validation(_))
        ));
    }
}
