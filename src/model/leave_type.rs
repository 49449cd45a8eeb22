use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// Recognized leave categories. The wire form is lowercase.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveCategory {
    Annual,
    Sick,
    Personal,
    Medical,
}

/// A named category of absence with its policy flags.
///
/// `requires_approval = false` means a submission is auto-approved;
/// `deducts_balance = false` means the ledger is never touched for
/// this type.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeaveType {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Annual Leave")]
    pub name: String,
    #[schema(example = "annual")]
    pub category: LeaveCategory,
    #[schema(example = true)]
    pub requires_approval: bool,
    #[schema(example = true)]
    pub deducts_balance: bool,
    pub description: Option<String>,
}

/// Fields accepted when creating a leave type.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewLeaveType {
    #[schema(example = "Annual Leave")]
    pub name: String,
    #[schema(example = "annual")]
    pub category: LeaveCategory,
    #[schema(example = true)]
    pub requires_approval: bool,
    #[schema(example = true)]
    pub deducts_balance: bool,
    pub description: Option<String>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct LeaveTypePatch {
    pub name: Option<String>,
    pub category: Option<LeaveCategory>,
    pub requires_approval: Option<bool>,
    pub deducts_balance: Option<bool>,
    pub description: Option<String>,
}

impl LeaveType {
    pub fn apply(&mut self, patch: LeaveTypePatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(flag) = patch.requires_approval {
            self.requires_approval = flag;
        }
        if let Some(flag) = patch.deducts_balance {
            self.deducts_balance = flag;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
    }
}
