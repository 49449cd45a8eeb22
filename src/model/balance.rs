use serde::{Deserialize, Serialize};

/// Which direction the ledger last moved for an entry.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerOp {
    Reserve,
    Release,
}

/// Remaining balance for one (user, leave type) pair, in days.
///
/// `last_request_id`/`last_op` record the most recent mutation so a
/// retried operation for the same request is applied at most once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub user_id: u64,
    pub leave_type_id: u64,
    pub remaining: i64,
    pub last_request_id: Option<u64>,
    pub last_op: Option<LedgerOp>,
}

impl BalanceEntry {
    pub fn fresh(user_id: u64, leave_type_id: u64, allotment: i64) -> Self {
        Self {
            user_id,
            leave_type_id,
            remaining: allotment,
            last_request_id: None,
            last_op: None,
        }
    }

    /// True when the given (request, op) pair already produced the
    /// entry's latest mutation.
    pub fn already_applied(&self, request_id: u64, op: LedgerOp) -> bool {
        self.last_request_id == Some(request_id) && self.last_op == Some(op)
    }
}
