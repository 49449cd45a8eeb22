use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl LeaveStatus {
    /// Legal successor table. Status only ever changes through the
    /// lifecycle engine, and only along these edges.
    pub fn can_transition_to(self, next: LeaveStatus) -> bool {
        matches!(
            (self, next),
            (LeaveStatus::Pending, LeaveStatus::Approved)
                | (LeaveStatus::Pending, LeaveStatus::Rejected)
                | (LeaveStatus::Pending, LeaveStatus::Cancelled)
                | (LeaveStatus::Approved, LeaveStatus::Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, LeaveStatus::Rejected | LeaveStatus::Cancelled)
    }
}

/// One employee's proposed absence over an inclusive date range.
///
/// `duration` is the business-day count fixed at submission; it is
/// never recomputed afterwards, so a later change to the date range
/// rules cannot skew an already-reserved balance.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeaveRequest {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub user_id: u64,
    #[schema(example = 1)]
    pub leave_type_id: u64,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-03-04", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = 3)]
    pub duration: i64,
    #[schema(example = "family trip")]
    pub reason: String,
    #[schema(example = "pending")]
    pub status: LeaveStatus,
    #[schema(example = "2026-02-20T09:00:00Z", format = "date-time", value_type = String)]
    pub submitted_at: DateTime<Utc>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<u64>,
}

/// Fields the store needs to persist a new request. The id is
/// assigned by the store.
#[derive(Debug, Clone)]
pub struct NewLeaveRequest {
    pub user_id: u64,
    pub leave_type_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration: i64,
    pub reason: String,
    pub status: LeaveStatus,
    pub submitted_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<u64>,
}

/// Count Mon-Fri days in the inclusive range. Returns 0 for a
/// weekend-only range, which the engine rejects.
pub fn business_days(start: NaiveDate, end: NaiveDate) -> i64 {
    let mut days = 0;
    let mut day = start;
    while day <= end {
        if day.weekday().number_from_monday() <= 5 {
            days += 1;
        }
        day = day.succ_opt().expect("date overflow");
    }
    days
}
