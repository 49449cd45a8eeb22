#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Role {
    Admin = 1,
    Manager = 2,
    Employee = 3,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Manager),
            3 => Some(Role::Employee),
            _ => None,
        }
    }

    pub fn is_decider(self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }
}

/// Authenticated actor as seen by the lifecycle core. Built from
/// verified JWT claims at the HTTP boundary; the core never sees
/// credentials.
#[derive(Debug, Copy, Clone)]
pub struct Principal {
    pub user_id: u64,
    pub role: Role,
}
