use crate::model::leave_request::LeaveRequest;
use crate::model::role::Principal;
use std::sync::Arc;

/// Lifecycle actions a principal may attempt.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LeaveAction {
    Submit,
    Decide,
    Cancel,
    View,
}

/// Restricts a manager to requests from their own reports. Returns
/// true when `owner_user_id` is in scope for the manager principal.
pub type TeamScopeFn = Arc<dyn Fn(&Principal, u64) -> bool + Send + Sync>;

/// Pure role predicate over lifecycle actions. Injected into the
/// engine at construction; holds no mutable state.
#[derive(Clone)]
pub struct AccessPolicy {
    team_scope: Option<TeamScopeFn>,
}

impl AccessPolicy {
    /// Managers and admins may act on any user's requests.
    pub fn open() -> Self {
        Self { team_scope: None }
    }

    /// Managers are limited to owners accepted by `scope`; admins
    /// remain unrestricted.
    pub fn with_team_scope(scope: TeamScopeFn) -> Self {
        Self {
            team_scope: Some(scope),
        }
    }

    pub fn can_perform(
        &self,
        principal: &Principal,
        action: LeaveAction,
        request: Option<&LeaveRequest>,
    ) -> bool {
        use crate::model::role::Role;

        match action {
            // Any authenticated principal may submit for themselves.
            LeaveAction::Submit => true,
            LeaveAction::Decide => match principal.role {
                Role::Admin => true,
                Role::Manager => request
                    .map(|r| self.in_scope(principal, r.user_id))
                    .unwrap_or(true),
                Role::Employee => false,
            },
            LeaveAction::Cancel => {
                let owns = request.map(|r| r.user_id == principal.user_id).unwrap_or(false);
                owns || self.can_perform(principal, LeaveAction::Decide, request)
            }
            LeaveAction::View => {
                let owns = request.map(|r| r.user_id == principal.user_id).unwrap_or(false);
                owns || self.can_perform(principal, LeaveAction::Decide, request)
            }
        }
    }

    /// Team membership check for a manager; open when no scope was
    /// injected.
    pub fn in_scope(&self, principal: &Principal, owner_user_id: u64) -> bool {
        match &self.team_scope {
            Some(scope) => scope(principal, owner_user_id),
            None => true,
        }
    }
}
