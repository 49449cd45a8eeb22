use crate::catalog::TypeCatalog;
use crate::error::DomainError;
use crate::model::balance::LedgerOp;
use crate::model::leave_request::{
    LeaveRequest, LeaveStatus, NewLeaveRequest, business_days,
};
use crate::model::role::Principal;
use crate::notify::TransitionNotifier;
use crate::policy::{AccessPolicy, LeaveAction};
use crate::store::{BalanceEffect, LeaveStore, RequestFilter};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::instrument;

/// Decision outcomes a manager or admin may hand down.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Decision {
    Approve,
    Reject,
}

/// The lifecycle engine: the single mutator of request status and
/// balances. Collaborators are injected at construction; the engine
/// itself is stateless and shared across workers behind an Arc.
pub struct LeaveEngine {
    store: Arc<dyn LeaveStore>,
    catalog: TypeCatalog,
    policy: AccessPolicy,
    notifier: Arc<dyn TransitionNotifier>,
}

impl LeaveEngine {
    pub fn new(
        store: Arc<dyn LeaveStore>,
        policy: AccessPolicy,
        notifier: Arc<dyn TransitionNotifier>,
    ) -> Self {
        let catalog = TypeCatalog::new(store.clone());
        Self {
            store,
            catalog,
            policy,
            notifier,
        }
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    /// Create a request for the principal. Types that do not require
    /// approval go straight to `approved`, with the deduction applied
    /// atomically with the insert; everything else starts `pending`
    /// and touches no balance.
    #[instrument(skip(self, reason), fields(user_id = principal.user_id))]
    pub async fn submit(
        &self,
        principal: &Principal,
        leave_type_id: u64,
        start_date: NaiveDate,
        end_date: NaiveDate,
        reason: String,
    ) -> Result<LeaveRequest, DomainError> {
        if !self.policy.can_perform(principal, LeaveAction::Submit, None) {
            return Err(DomainError::Authorization("submission not permitted".into()));
        }
        if end_date < start_date {
            return Err(DomainError::Validation(
                "end_date must not be before start_date".into(),
            ));
        }
        let reason = reason.trim().to_owned();
        if reason.is_empty() {
            return Err(DomainError::Validation("reason must not be empty".into()));
        }
        let duration = business_days(start_date, end_date);
        if duration == 0 {
            return Err(DomainError::Validation(
                "date range contains no business days".into(),
            ));
        }

        let ty = self.catalog.get(leave_type_id).await?;

        let request = if ty.requires_approval {
            self.store
                .create_request(
                    NewLeaveRequest {
                        user_id: principal.user_id,
                        leave_type_id,
                        start_date,
                        end_date,
                        duration,
                        reason,
                        status: LeaveStatus::Pending,
                        submitted_at: Utc::now(),
                        decided_at: None,
                        decided_by: None,
                    },
                    None,
                )
                .await?
        } else {
            // Auto-approved: decided by nobody, deducted (if the type
            // deducts) in the same transaction as the insert.
            let deduct = ty.deducts_balance.then_some(duration);
            self.store
                .create_request(
                    NewLeaveRequest {
                        user_id: principal.user_id,
                        leave_type_id,
                        start_date,
                        end_date,
                        duration,
                        reason,
                        status: LeaveStatus::Approved,
                        submitted_at: Utc::now(),
                        decided_at: Some(Utc::now()),
                        decided_by: None,
                    },
                    deduct,
                )
                .await?
        };

        self.notifier.notify(&request, Some(principal.user_id));
        Ok(request)
    }

    /// Approve or reject a pending request. Approval on a deducting
    /// type reserves the balance in the same transaction as the
    /// status flip; a failed reservation leaves the request pending.
    #[instrument(skip(self), fields(user_id = principal.user_id))]
    pub async fn decide(
        &self,
        principal: &Principal,
        request_id: u64,
        decision: Decision,
    ) -> Result<LeaveRequest, DomainError> {
        let request = self.store.fetch_request(request_id).await?;

        if !self
            .policy
            .can_perform(principal, LeaveAction::Decide, Some(&request))
        {
            return Err(DomainError::Authorization(
                "only a manager or admin may decide a request".into(),
            ));
        }
        if request.status != LeaveStatus::Pending {
            return Err(DomainError::State(format!(
                "request is {}, expected pending",
                request.status
            )));
        }

        let ty = self.catalog.get(request.leave_type_id).await?;
        let (target, effect) = match decision {
            Decision::Approve => {
                let effect = ty.deducts_balance.then_some(BalanceEffect {
                    user_id: request.user_id,
                    leave_type_id: request.leave_type_id,
                    amount: request.duration,
                    op: LedgerOp::Reserve,
                });
                (LeaveStatus::Approved, effect)
            }
            Decision::Reject => (LeaveStatus::Rejected, None),
        };

        let updated = self
            .store
            .transition(
                request_id,
                LeaveStatus::Pending,
                target,
                Some(principal.user_id),
                effect,
            )
            .await?;

        self.notifier.notify(&updated, Some(principal.user_id));
        Ok(updated)
    }

    /// Cancel a pending or approved request. Cancelling an approved,
    /// deducting request releases exactly the recorded duration.
    #[instrument(skip(self), fields(user_id = principal.user_id))]
    pub async fn cancel(
        &self,
        principal: &Principal,
        request_id: u64,
    ) -> Result<LeaveRequest, DomainError> {
        let request = self.store.fetch_request(request_id).await?;

        if !self
            .policy
            .can_perform(principal, LeaveAction::Cancel, Some(&request))
        {
            return Err(DomainError::Authorization(
                "only the owner, a manager or an admin may cancel".into(),
            ));
        }
        if request.status.is_terminal() {
            return Err(DomainError::State(format!(
                "request is already {}",
                request.status
            )));
        }

        let ty = self.catalog.get(request.leave_type_id).await?;
        let effect = (request.status == LeaveStatus::Approved && ty.deducts_balance).then_some(
            BalanceEffect {
                user_id: request.user_id,
                leave_type_id: request.leave_type_id,
                amount: request.duration,
                op: LedgerOp::Release,
            },
        );

        let updated = self
            .store
            .transition(request_id, request.status, LeaveStatus::Cancelled, None, effect)
            .await?;

        self.notifier.notify(&updated, Some(principal.user_id));
        Ok(updated)
    }

    // ---- read side ----

    pub async fn request(
        &self,
        principal: &Principal,
        request_id: u64,
    ) -> Result<LeaveRequest, DomainError> {
        let request = self.store.fetch_request(request_id).await?;
        if !self
            .policy
            .can_perform(principal, LeaveAction::View, Some(&request))
        {
            return Err(DomainError::Authorization(
                "request belongs to another user".into(),
            ));
        }
        Ok(request)
    }

    pub async fn own_requests(
        &self,
        principal: &Principal,
        status: Option<LeaveStatus>,
    ) -> Result<Vec<LeaveRequest>, DomainError> {
        self.store
            .list_requests(RequestFilter {
                user_id: Some(principal.user_id),
                status,
            })
            .await
    }

    /// Requests visible to a manager under the injected team scope;
    /// admins see everything.
    pub async fn team_requests(
        &self,
        principal: &Principal,
        status: Option<LeaveStatus>,
    ) -> Result<Vec<LeaveRequest>, DomainError> {
        if !principal.role.is_decider() {
            return Err(DomainError::Authorization(
                "only a manager or admin may list team requests".into(),
            ));
        }
        let all = self
            .store
            .list_requests(RequestFilter {
                user_id: None,
                status,
            })
            .await?;
        Ok(all
            .into_iter()
            .filter(|r| self.policy.in_scope(principal, r.user_id))
            .collect())
    }

    pub async fn all_requests(
        &self,
        principal: &Principal,
        filter: RequestFilter,
    ) -> Result<Vec<LeaveRequest>, DomainError> {
        if !principal.role.is_decider() {
            return Err(DomainError::Authorization(
                "only a manager or admin may list all requests".into(),
            ));
        }
        self.store.list_requests(filter).await
    }

    /// Balance lookup: anyone for themselves, deciders for anyone.
    pub async fn balance(
        &self,
        principal: &Principal,
        user_id: Option<u64>,
        leave_type_id: u64,
    ) -> Result<i64, DomainError> {
        let subject = user_id.unwrap_or(principal.user_id);
        if subject != principal.user_id && !principal.role.is_decider() {
            return Err(DomainError::Authorization(
                "balance belongs to another user".into(),
            ));
        }
        self.store.balance_of(subject, leave_type_id).await
    }
}

impl std::fmt::Debug for LeaveEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaveEngine").finish_non_exhaustive()
    }
}
