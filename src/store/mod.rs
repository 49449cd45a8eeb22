use crate::error::DomainError;
use crate::model::balance::LedgerOp;
use crate::model::leave_request::{LeaveRequest, LeaveStatus, NewLeaveRequest};
use crate::model::leave_type::{LeaveType, LeaveTypePatch, NewLeaveType};
use async_trait::async_trait;

pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

/// Ledger knobs shared by every backend.
#[derive(Debug, Copy, Clone)]
pub struct LedgerSettings {
    /// Balance assumed for a (user, type) pair with no entry yet.
    pub initial_allotment: i64,
    /// Ceiling applied on release; `None` means unbounded.
    pub annual_cap: Option<i64>,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            initial_allotment: 20,
            annual_cap: None,
        }
    }
}

/// Filter for request listings; `None` fields match everything.
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub user_id: Option<u64>,
    pub status: Option<LeaveStatus>,
}

/// Ledger mutation applied inside the same transaction as a status
/// transition. The store tags the entry with the transitioning
/// request id so a retry is applied at most once.
#[derive(Debug, Copy, Clone)]
pub struct BalanceEffect {
    pub user_id: u64,
    pub leave_type_id: u64,
    pub amount: i64,
    pub op: LedgerOp,
}

/// Transactional persistence consumed by the lifecycle engine.
///
/// The two multi-step operations — `create_request` with an initial
/// deduction, and `transition` with a balance effect — must be
/// atomic: either every mutation commits or none is observable.
#[async_trait]
pub trait LeaveStore: Send + Sync {
    // ---- leave types ----
    async fn insert_type(&self, new: NewLeaveType) -> Result<LeaveType, DomainError>;
    async fn fetch_type(&self, id: u64) -> Result<LeaveType, DomainError>;
    async fn list_types(&self) -> Result<Vec<LeaveType>, DomainError>;
    async fn update_type(&self, id: u64, patch: LeaveTypePatch) -> Result<LeaveType, DomainError>;
    /// Fails with `Conflict` while any request references the type.
    async fn delete_type(&self, id: u64) -> Result<(), DomainError>;
    async fn find_type_by_name(&self, name: &str) -> Result<Option<LeaveType>, DomainError>;

    // ---- leave requests ----
    /// Persist a new request. When `deduct` is set (auto-approved
    /// submission on a deducting type), the reservation happens in
    /// the same transaction as the insert.
    async fn create_request(
        &self,
        new: NewLeaveRequest,
        deduct: Option<i64>,
    ) -> Result<LeaveRequest, DomainError>;
    async fn fetch_request(&self, id: u64) -> Result<LeaveRequest, DomainError>;
    async fn list_requests(&self, filter: RequestFilter) -> Result<Vec<LeaveRequest>, DomainError>;

    /// Compare-and-swap on status. Fails with `State` when the stored
    /// status differs from `expected` (a concurrent transition won),
    /// `NotFound` for an unknown id. `decided_by` is recorded, and
    /// `decided_at` stamped, only when `target` is a decision
    /// outcome. The optional effect commits with the flip or not at
    /// all.
    async fn transition(
        &self,
        id: u64,
        expected: LeaveStatus,
        target: LeaveStatus,
        decided_by: Option<u64>,
        effect: Option<BalanceEffect>,
    ) -> Result<LeaveRequest, DomainError>;

    // ---- balances ----
    /// Effective remaining balance, defaulting to the configured
    /// initial allotment when no entry exists.
    async fn balance_of(&self, user_id: u64, leave_type_id: u64) -> Result<i64, DomainError>;
}
