use super::{BalanceEffect, LeaveStore, LedgerSettings, RequestFilter};
use crate::error::DomainError;
use crate::model::balance::LedgerOp;
use crate::model::leave_request::{LeaveRequest, LeaveStatus, NewLeaveRequest};
use crate::model::leave_type::{LeaveCategory, LeaveType, LeaveTypePatch, NewLeaveType};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{MySql, MySqlPool, Transaction, prelude::FromRow};
use std::str::FromStr;

/// MySQL backend. Status compare-and-swap is a conditional UPDATE;
/// balance reservation is a single decrement-with-floor UPDATE, so
/// two racing approvals can never both pass a stale balance check.
pub struct MySqlStore {
    pool: MySqlPool,
    settings: LedgerSettings,
}

#[derive(FromRow)]
struct LeaveTypeRow {
    id: u64,
    name: String,
    category: String,
    requires_approval: bool,
    deducts_balance: bool,
    description: Option<String>,
}

impl TryFrom<LeaveTypeRow> for LeaveType {
    type Error = DomainError;

    fn try_from(row: LeaveTypeRow) -> Result<Self, DomainError> {
        let category = LeaveCategory::from_str(&row.category)
            .map_err(|_| DomainError::Transient(format!("unknown stored category {}", row.category)))?;
        Ok(LeaveType {
            id: row.id,
            name: row.name,
            category,
            requires_approval: row.requires_approval,
            deducts_balance: row.deducts_balance,
            description: row.description,
        })
    }
}

#[derive(FromRow)]
struct LeaveRequestRow {
    id: u64,
    user_id: u64,
    leave_type_id: u64,
    start_date: NaiveDate,
    end_date: NaiveDate,
    duration: i64,
    reason: String,
    status: String,
    submitted_at: DateTime<Utc>,
    decided_at: Option<DateTime<Utc>>,
    decided_by: Option<u64>,
}

impl TryFrom<LeaveRequestRow> for LeaveRequest {
    type Error = DomainError;

    fn try_from(row: LeaveRequestRow) -> Result<Self, DomainError> {
        let status = LeaveStatus::from_str(&row.status)
            .map_err(|_| DomainError::Transient(format!("unknown stored status {}", row.status)))?;
        Ok(LeaveRequest {
            id: row.id,
            user_id: row.user_id,
            leave_type_id: row.leave_type_id,
            start_date: row.start_date,
            end_date: row.end_date,
            duration: row.duration,
            reason: row.reason,
            status,
            submitted_at: row.submitted_at,
            decided_at: row.decided_at,
            decided_by: row.decided_by,
        })
    }
}

// Helper enum for typed SQLx binding of dynamic filters
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

const TYPE_COLUMNS: &str =
    "id, name, category, requires_approval, deducts_balance, description";
const REQUEST_COLUMNS: &str = "id, user_id, leave_type_id, start_date, end_date, duration, \
                               reason, status, submitted_at, decided_at, decided_by";

impl MySqlStore {
    pub fn new(pool: MySqlPool, settings: LedgerSettings) -> Self {
        Self { pool, settings }
    }

    async fn fetch_type_row(&self, id: u64) -> Result<LeaveType, DomainError> {
        let sql = format!("SELECT {TYPE_COLUMNS} FROM leave_types WHERE id = ?");
        let row = sqlx::query_as::<_, LeaveTypeRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DomainError::NotFound("leave type"))?;
        row.try_into()
    }

    async fn fetch_request_row(&self, id: u64) -> Result<LeaveRequest, DomainError> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM leave_requests WHERE id = ?");
        let row = sqlx::query_as::<_, LeaveRequestRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DomainError::NotFound("leave request"))?;
        row.try_into()
    }

    /// Apply one ledger effect inside `tx`, tagged with `request_id`
    /// for at-most-once semantics. Errors leave the transaction to
    /// roll back at drop.
    async fn apply_effect(
        &self,
        tx: &mut Transaction<'_, MySql>,
        effect: BalanceEffect,
        request_id: u64,
    ) -> Result<(), DomainError> {
        // Make sure the entry exists with the configured allotment.
        sqlx::query(
            "INSERT IGNORE INTO leave_balances (user_id, leave_type_id, remaining) \
             VALUES (?, ?, ?)",
        )
        .bind(effect.user_id)
        .bind(effect.leave_type_id)
        .bind(self.settings.initial_allotment)
        .execute(&mut **tx)
        .await?;

        let op = match effect.op {
            LedgerOp::Reserve => "reserve",
            LedgerOp::Release => "release",
        };

        // At-most-once per (request, op): skip a retried mutation.
        let last: Option<(Option<u64>, Option<String>)> = sqlx::query_as(
            "SELECT last_request_id, last_op FROM leave_balances \
             WHERE user_id = ? AND leave_type_id = ? FOR UPDATE",
        )
        .bind(effect.user_id)
        .bind(effect.leave_type_id)
        .fetch_optional(&mut **tx)
        .await?;
        if let Some((Some(last_id), Some(last_op))) = last {
            if last_id == request_id && last_op == op {
                return Ok(());
            }
        }

        let affected = match effect.op {
            LedgerOp::Reserve => {
                // Single atomic decrement-with-floor; no read-then-write.
                sqlx::query(
                    "UPDATE leave_balances \
                     SET remaining = remaining - ?, last_request_id = ?, last_op = ? \
                     WHERE user_id = ? AND leave_type_id = ? AND remaining >= ?",
                )
                .bind(effect.amount)
                .bind(request_id)
                .bind(op)
                .bind(effect.user_id)
                .bind(effect.leave_type_id)
                .bind(effect.amount)
                .execute(&mut **tx)
                .await?
                .rows_affected()
            }
            LedgerOp::Release => match self.settings.annual_cap {
                Some(cap) => sqlx::query(
                    "UPDATE leave_balances \
                     SET remaining = LEAST(remaining + ?, ?), last_request_id = ?, last_op = ? \
                     WHERE user_id = ? AND leave_type_id = ?",
                )
                .bind(effect.amount)
                .bind(cap)
                .bind(request_id)
                .bind(op)
                .bind(effect.user_id)
                .bind(effect.leave_type_id)
                .execute(&mut **tx)
                .await?
                .rows_affected(),
                None => sqlx::query(
                    "UPDATE leave_balances \
                     SET remaining = remaining + ?, last_request_id = ?, last_op = ? \
                     WHERE user_id = ? AND leave_type_id = ?",
                )
                .bind(effect.amount)
                .bind(request_id)
                .bind(op)
                .bind(effect.user_id)
                .bind(effect.leave_type_id)
                .execute(&mut **tx)
                .await?
                .rows_affected(),
            },
        };

        if affected == 0 {
            let available: i64 = sqlx::query_scalar(
                "SELECT remaining FROM leave_balances WHERE user_id = ? AND leave_type_id = ?",
            )
            .bind(effect.user_id)
            .bind(effect.leave_type_id)
            .fetch_one(&mut **tx)
            .await?;
            return Err(DomainError::InsufficientBalance {
                needed: effect.amount,
                available,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl LeaveStore for MySqlStore {
    async fn insert_type(&self, new: NewLeaveType) -> Result<LeaveType, DomainError> {
        let result = sqlx::query(
            "INSERT INTO leave_types \
             (name, category, requires_approval, deducts_balance, description) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&new.name)
        .bind(new.category.to_string())
        .bind(new.requires_approval)
        .bind(new.deducts_balance)
        .bind(&new.description)
        .execute(&self.pool)
        .await?;

        self.fetch_type_row(result.last_insert_id()).await
    }

    async fn fetch_type(&self, id: u64) -> Result<LeaveType, DomainError> {
        self.fetch_type_row(id).await
    }

    async fn list_types(&self) -> Result<Vec<LeaveType>, DomainError> {
        let sql = format!("SELECT {TYPE_COLUMNS} FROM leave_types");
        let rows = sqlx::query_as::<_, LeaveTypeRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update_type(&self, id: u64, patch: LeaveTypePatch) -> Result<LeaveType, DomainError> {
        sqlx::query(
            "UPDATE leave_types SET \
             name = COALESCE(?, name), \
             category = COALESCE(?, category), \
             requires_approval = COALESCE(?, requires_approval), \
             deducts_balance = COALESCE(?, deducts_balance), \
             description = COALESCE(?, description) \
             WHERE id = ?",
        )
        .bind(&patch.name)
        .bind(patch.category.map(|c| c.to_string()))
        .bind(patch.requires_approval)
        .bind(patch.deducts_balance)
        .bind(&patch.description)
        .bind(id)
        .execute(&self.pool)
        .await?;

        // rows_affected is 0 both for an unknown id and for a no-op
        // patch, so let the fetch decide between them.
        self.fetch_type_row(id).await
    }

    async fn delete_type(&self, id: u64) -> Result<(), DomainError> {
        let referenced: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM leave_requests WHERE leave_type_id = ? LIMIT 1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        if referenced {
            return Err(DomainError::Conflict(
                "leave type is referenced by existing requests".into(),
            ));
        }

        let result = sqlx::query("DELETE FROM leave_types WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound("leave type"));
        }
        Ok(())
    }

    async fn find_type_by_name(&self, name: &str) -> Result<Option<LeaveType>, DomainError> {
        let sql = format!("SELECT {TYPE_COLUMNS} FROM leave_types WHERE name = ?");
        let row = sqlx::query_as::<_, LeaveTypeRow>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn create_request(
        &self,
        new: NewLeaveRequest,
        deduct: Option<i64>,
    ) -> Result<LeaveRequest, DomainError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO leave_requests \
             (user_id, leave_type_id, start_date, end_date, duration, reason, status, \
              submitted_at, decided_at, decided_by) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(new.user_id)
        .bind(new.leave_type_id)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(new.duration)
        .bind(&new.reason)
        .bind(new.status.to_string())
        .bind(new.submitted_at)
        .bind(new.decided_at)
        .bind(new.decided_by)
        .execute(&mut *tx)
        .await?;
        let id = result.last_insert_id();

        if let Some(amount) = deduct {
            let effect = BalanceEffect {
                user_id: new.user_id,
                leave_type_id: new.leave_type_id,
                amount,
                op: LedgerOp::Reserve,
            };
            // Failure drops the transaction; the insert rolls back.
            self.apply_effect(&mut tx, effect, id).await?;
        }

        tx.commit().await?;
        self.fetch_request_row(id).await
    }

    async fn fetch_request(&self, id: u64) -> Result<LeaveRequest, DomainError> {
        self.fetch_request_row(id).await
    }

    async fn list_requests(&self, filter: RequestFilter) -> Result<Vec<LeaveRequest>, DomainError> {
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(user_id) = filter.user_id {
            where_sql.push_str(" AND user_id = ?");
            args.push(FilterValue::U64(user_id));
        }
        let status;
        if let Some(s) = filter.status {
            status = s.to_string();
            where_sql.push_str(" AND status = ?");
            args.push(FilterValue::Str(&status));
        }

        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM leave_requests{where_sql} ORDER BY id"
        );
        let mut query = sqlx::query_as::<_, LeaveRequestRow>(&sql);
        for arg in args {
            query = match arg {
                FilterValue::U64(v) => query.bind(v),
                FilterValue::Str(s) => query.bind(s.to_owned()),
            };
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn transition(
        &self,
        id: u64,
        expected: LeaveStatus,
        target: LeaveStatus,
        decided_by: Option<u64>,
        effect: Option<BalanceEffect>,
    ) -> Result<LeaveRequest, DomainError> {
        if !expected.can_transition_to(target) {
            return Err(DomainError::State(format!(
                "no transition from {expected} to {target}"
            )));
        }

        let mut tx = self.pool.begin().await?;

        // Compare-and-swap on status: the conditional UPDATE is the
        // only place a concurrent transition can be lost, and the
        // loser sees rows_affected == 0.
        let affected = if matches!(target, LeaveStatus::Approved | LeaveStatus::Rejected) {
            sqlx::query(
                "UPDATE leave_requests \
                 SET status = ?, decided_at = ?, decided_by = ? \
                 WHERE id = ? AND status = ?",
            )
            .bind(target.to_string())
            .bind(Utc::now())
            .bind(decided_by)
            .bind(id)
            .bind(expected.to_string())
            .execute(&mut *tx)
            .await?
            .rows_affected()
        } else {
            sqlx::query("UPDATE leave_requests SET status = ? WHERE id = ? AND status = ?")
                .bind(target.to_string())
                .bind(id)
                .bind(expected.to_string())
                .execute(&mut *tx)
                .await?
                .rows_affected()
        };

        if affected == 0 {
            let current: Option<String> =
                sqlx::query_scalar("SELECT status FROM leave_requests WHERE id = ?")
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await?;
            return match current {
                None => Err(DomainError::NotFound("leave request")),
                Some(status) => Err(DomainError::State(format!(
                    "request is {status}, expected {expected}"
                ))),
            };
        }

        if let Some(effect) = effect {
            self.apply_effect(&mut tx, effect, id).await?;
        }

        tx.commit().await?;
        self.fetch_request_row(id).await
    }

    async fn balance_of(&self, user_id: u64, leave_type_id: u64) -> Result<i64, DomainError> {
        let remaining: Option<i64> = sqlx::query_scalar(
            "SELECT remaining FROM leave_balances WHERE user_id = ? AND leave_type_id = ?",
        )
        .bind(user_id)
        .bind(leave_type_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(remaining.unwrap_or(self.settings.initial_allotment))
    }
}
