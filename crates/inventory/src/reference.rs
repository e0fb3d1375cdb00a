//! Reference rows items point at: branches, categories, units, suppliers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use swagstock_core::{BranchId, CategoryId, DomainResult, Entity, SupplierId, UnitId};

use crate::rules::require_text;

/// An organisational location holding its own stock.
///
/// Branches are deactivated rather than deleted while anything references
/// them. At most one branch is the headquarters at any time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub id: BranchId,
    pub number: String,
    pub name: String,
    pub location: Option<String>,
    pub active: bool,
    pub is_headquarters: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Branch {
    type Id = BranchId;

    fn id(&self) -> BranchId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBranch {
    pub number: String,
    pub name: String,
    pub location: Option<String>,
}

impl NewBranch {
    pub fn validated(self) -> DomainResult<Self> {
        Ok(Self {
            number: require_text("branch number", &self.number)?,
            name: require_text("branch name", &self.name)?,
            location: normalize_optional(self.location),
        })
    }
}

/// Editable branch fields; activity and headquarters flags have their own operations.
pub type BranchUpdate = NewBranch;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> CategoryId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
}

impl NewCategory {
    pub fn validated(self) -> DomainResult<Self> {
        Ok(Self {
            name: require_text("category name", &self.name)?,
            description: normalize_optional(self.description),
        })
    }
}

/// Unit of measure (`UN`, `KG`, `CX`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub code: String,
    pub name: String,
    pub active: bool,
}

impl Entity for Unit {
    type Id = UnitId;

    fn id(&self) -> UnitId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUnit {
    pub code: String,
    pub name: String,
}

impl NewUnit {
    pub fn validated(self) -> DomainResult<Self> {
        Ok(Self {
            code: require_text("unit code", &self.code)?.to_uppercase(),
            name: require_text("unit name", &self.name)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    pub contact: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub active: bool,
}

impl Entity for Supplier {
    type Id = SupplierId;

    fn id(&self) -> SupplierId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSupplier {
    pub name: String,
    pub contact: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl NewSupplier {
    pub fn validated(self) -> DomainResult<Self> {
        Ok(Self {
            name: require_text("supplier name", &self.name)?,
            contact: normalize_optional(self.contact),
            phone: normalize_optional(self.phone),
            email: normalize_optional(self.email),
        })
    }
}

/// Blank optional text is stored as absent.
pub(crate) fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_code_is_uppercased() {
        let unit = NewUnit {
            code: " cx ".to_string(),
            name: "Box".to_string(),
        }
        .validated()
        .unwrap();
        assert_eq!(unit.code, "CX");
    }

    #[test]
    fn blank_optional_fields_become_none() {
        let branch = NewBranch {
            number: "002".to_string(),
            name: "North".to_string(),
            location: Some("   ".to_string()),
        }
        .validated()
        .unwrap();
        assert_eq!(branch.location, None);
    }

    #[test]
    fn branch_requires_a_name() {
        let result = NewBranch {
            number: "002".to_string(),
            name: String::new(),
            location: None,
        }
        .validated();
        assert!(result.is_err());
    }
}
