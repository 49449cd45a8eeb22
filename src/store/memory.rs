use super::{BalanceEffect, LeaveStore, LedgerSettings, RequestFilter};
use crate::error::DomainError;
use crate::model::balance::{BalanceEntry, LedgerOp};
use crate::model::leave_request::{LeaveRequest, LeaveStatus, NewLeaveRequest};
use crate::model::leave_type::{LeaveType, LeaveTypePatch, NewLeaveType};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;

/// Mutex-guarded in-memory backend. One lock over the whole state
/// makes every multi-step mutation atomic and serializes concurrent
/// transitions, which is exactly the guarantee the trait demands.
/// Used by the test suite and for running without a database.
pub struct MemoryStore {
    state: Mutex<State>,
    settings: LedgerSettings,
}

#[derive(Default)]
struct State {
    next_type_id: u64,
    next_request_id: u64,
    types: HashMap<u64, LeaveType>,
    requests: HashMap<u64, LeaveRequest>,
    balances: HashMap<(u64, u64), BalanceEntry>,
}

impl MemoryStore {
    pub fn new(settings: LedgerSettings) -> Self {
        Self {
            state: Mutex::new(State::default()),
            settings,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>, DomainError> {
        self.state
            .lock()
            .map_err(|_| DomainError::Transient("store lock poisoned".into()))
    }
}

impl State {
    /// Apply one ledger effect in place. No-op when the same
    /// (request, op) pair already produced the latest mutation.
    fn apply_effect(
        &mut self,
        effect: BalanceEffect,
        request_id: u64,
        settings: &LedgerSettings,
    ) -> Result<(), DomainError> {
        let entry = self
            .balances
            .entry((effect.user_id, effect.leave_type_id))
            .or_insert_with(|| {
                BalanceEntry::fresh(
                    effect.user_id,
                    effect.leave_type_id,
                    settings.initial_allotment,
                )
            });

        if entry.already_applied(request_id, effect.op) {
            return Ok(());
        }

        match effect.op {
            LedgerOp::Reserve => {
                if entry.remaining < effect.amount {
                    return Err(DomainError::InsufficientBalance {
                        needed: effect.amount,
                        available: entry.remaining,
                    });
                }
                entry.remaining -= effect.amount;
            }
            LedgerOp::Release => {
                entry.remaining += effect.amount;
                if let Some(cap) = settings.annual_cap {
                    entry.remaining = entry.remaining.min(cap);
                }
            }
        }
        entry.last_request_id = Some(request_id);
        entry.last_op = Some(effect.op);
        Ok(())
    }
}

#[async_trait]
impl LeaveStore for MemoryStore {
    async fn insert_type(&self, new: NewLeaveType) -> Result<LeaveType, DomainError> {
        let mut state = self.lock()?;
        state.next_type_id += 1;
        let ty = LeaveType {
            id: state.next_type_id,
            name: new.name,
            category: new.category,
            requires_approval: new.requires_approval,
            deducts_balance: new.deducts_balance,
            description: new.description,
        };
        state.types.insert(ty.id, ty.clone());
        Ok(ty)
    }

    async fn fetch_type(&self, id: u64) -> Result<LeaveType, DomainError> {
        self.lock()?
            .types
            .get(&id)
            .cloned()
            .ok_or(DomainError::NotFound("leave type"))
    }

    async fn list_types(&self) -> Result<Vec<LeaveType>, DomainError> {
        Ok(self.lock()?.types.values().cloned().collect())
    }

    async fn update_type(&self, id: u64, patch: LeaveTypePatch) -> Result<LeaveType, DomainError> {
        let mut state = self.lock()?;
        let ty = state
            .types
            .get_mut(&id)
            .ok_or(DomainError::NotFound("leave type"))?;
        ty.apply(patch);
        Ok(ty.clone())
    }

    async fn delete_type(&self, id: u64) -> Result<(), DomainError> {
        let mut state = self.lock()?;
        if !state.types.contains_key(&id) {
            return Err(DomainError::NotFound("leave type"));
        }
        if state.requests.values().any(|r| r.leave_type_id == id) {
            return Err(DomainError::Conflict(
                "leave type is referenced by existing requests".into(),
            ));
        }
        state.types.remove(&id);
        Ok(())
    }

    async fn find_type_by_name(&self, name: &str) -> Result<Option<LeaveType>, DomainError> {
        Ok(self
            .lock()?
            .types
            .values()
            .find(|t| t.name == name)
            .cloned())
    }

    async fn create_request(
        &self,
        new: NewLeaveRequest,
        deduct: Option<i64>,
    ) -> Result<LeaveRequest, DomainError> {
        let mut state = self.lock()?;
        let id = state.next_request_id + 1;

        // Reserve first so a failed deduction leaves no request behind.
        if let Some(amount) = deduct {
            let effect = BalanceEffect {
                user_id: new.user_id,
                leave_type_id: new.leave_type_id,
                amount,
                op: LedgerOp::Reserve,
            };
            state.apply_effect(effect, id, &self.settings)?;
        }

        state.next_request_id = id;
        let request = LeaveRequest {
            id,
            user_id: new.user_id,
            leave_type_id: new.leave_type_id,
            start_date: new.start_date,
            end_date: new.end_date,
            duration: new.duration,
            reason: new.reason,
            status: new.status,
            submitted_at: new.submitted_at,
            decided_at: new.decided_at,
            decided_by: new.decided_by,
        };
        state.requests.insert(id, request.clone());
        Ok(request)
    }

    async fn fetch_request(&self, id: u64) -> Result<LeaveRequest, DomainError> {
        self.lock()?
            .requests
            .get(&id)
            .cloned()
            .ok_or(DomainError::NotFound("leave request"))
    }

    async fn list_requests(&self, filter: RequestFilter) -> Result<Vec<LeaveRequest>, DomainError> {
        let state = self.lock()?;
        let mut out: Vec<LeaveRequest> = state
            .requests
            .values()
            .filter(|r| filter.user_id.map(|u| r.user_id == u).unwrap_or(true))
            .filter(|r| filter.status.map(|s| r.status == s).unwrap_or(true))
            .cloned()
            .collect();
        out.sort_by_key(|r| r.id);
        Ok(out)
    }

    async fn transition(
        &self,
        id: u64,
        expected: LeaveStatus,
        target: LeaveStatus,
        decided_by: Option<u64>,
        effect: Option<BalanceEffect>,
    ) -> Result<LeaveRequest, DomainError> {
        let mut state = self.lock()?;

        let current = state
            .requests
            .get(&id)
            .ok_or(DomainError::NotFound("leave request"))?
            .status;

        if current != expected {
            return Err(DomainError::State(format!(
                "request is {current}, expected {expected}"
            )));
        }
        if !expected.can_transition_to(target) {
            return Err(DomainError::State(format!(
                "no transition from {expected} to {target}"
            )));
        }

        // Ledger before status flip; both happen under the one lock.
        if let Some(effect) = effect {
            state.apply_effect(effect, id, &self.settings)?;
        }

        let request = state.requests.get_mut(&id).expect("checked above");
        request.status = target;
        if matches!(target, LeaveStatus::Approved | LeaveStatus::Rejected) {
            request.decided_at = Some(Utc::now());
            request.decided_by = decided_by;
        }
        Ok(request.clone())
    }

    async fn balance_of(&self, user_id: u64, leave_type_id: u64) -> Result<i64, DomainError> {
        Ok(self
            .lock()?
            .balances
            .get(&(user_id, leave_type_id))
            .map(|e| e.remaining)
            .unwrap_or(self.settings.initial_allotment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::leave_type::LeaveCategory;

    fn store() -> MemoryStore {
        MemoryStore::new(LedgerSettings {
            initial_allotment: 10,
            annual_cap: Some(10),
        })
    }

    fn new_request(user_id: u64, leave_type_id: u64) -> NewLeaveRequest {
        NewLeaveRequest {
            user_id,
            leave_type_id,
            start_date: "2026-03-02".parse().unwrap(),
            end_date: "2026-03-04".parse().unwrap(),
            duration: 3,
            reason: "trip".into(),
            status: LeaveStatus::Pending,
            submitted_at: Utc::now(),
            decided_at: None,
            decided_by: None,
        }
    }

    #[actix_web::test]
    async fn reserve_is_idempotent_per_request() {
        let store = store();
        let req = store.create_request(new_request(1, 1), None).await.unwrap();

        let effect = BalanceEffect {
            user_id: 1,
            leave_type_id: 1,
            amount: 3,
            op: LedgerOp::Reserve,
        };

        store
            .transition(req.id, LeaveStatus::Pending, LeaveStatus::Approved, Some(2), Some(effect))
            .await
            .unwrap();
        assert_eq!(store.balance_of(1, 1).await.unwrap(), 7);

        // Re-applying the same effect for the same request must not
        // deduct again.
        let mut state = store.lock().unwrap();
        state.apply_effect(effect, req.id, &store.settings).unwrap();
        drop(state);
        assert_eq!(store.balance_of(1, 1).await.unwrap(), 7);
    }

    #[actix_web::test]
    async fn release_is_capped() {
        let store = store();
        let req = store.create_request(new_request(1, 1), None).await.unwrap();
        let mut state = store.lock().unwrap();
        state
            .apply_effect(
                BalanceEffect {
                    user_id: 1,
                    leave_type_id: 1,
                    amount: 5,
                    op: LedgerOp::Release,
                },
                req.id,
                &store.settings,
            )
            .unwrap();
        drop(state);
        assert_eq!(store.balance_of(1, 1).await.unwrap(), 10);
    }

    #[actix_web::test]
    async fn stale_status_loses_the_cas() {
        let store = store();
        let req = store.create_request(new_request(1, 1), None).await.unwrap();

        store
            .transition(req.id, LeaveStatus::Pending, LeaveStatus::Rejected, Some(2), None)
            .await
            .unwrap();

        let err = store
            .transition(req.id, LeaveStatus::Pending, LeaveStatus::Approved, Some(2), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::State(_)));
    }

    #[actix_web::test]
    async fn delete_type_refuses_while_referenced() {
        let store = store();
        let ty = store
            .insert_type(NewLeaveType {
                name: "Annual Leave".into(),
                category: LeaveCategory::Annual,
                requires_approval: true,
                deducts_balance: true,
                description: None,
            })
            .await
            .unwrap();
        store
            .create_request(new_request(1, ty.id), None)
            .await
            .unwrap();

        let err = store.delete_type(ty.id).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }
}
