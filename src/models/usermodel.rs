use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Worker,
    Employer,
}

/// The authenticated caller of an operation.
///
/// Users live in the external identity provider; the only things this
/// service knows about them are the id and roles carried by their token.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Actor {
    pub id: Uuid,
    pub roles: Vec<UserRole>,
}

impl Actor {
    pub fn new(id: Uuid, roles: Vec<UserRole>) -> Self {
        Self { id, roles }
    }

    pub fn has_role(&self, role: UserRole) -> bool {
        self.roles.contains(&role)
    }
}

#[cfg(test)]
impl Actor {
    pub fn worker(id: Uuid) -> Self {
        Self::new(id, vec![UserRole::Worker])
    }

    pub fn employer(id: Uuid) -> Self {
        Self::new(id, vec![UserRole::Employer])
    }
}
