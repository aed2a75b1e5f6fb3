use serde::{Deserialize, Serialize};

use crate::auth::Role;
use crate::notifications::RecipientType;

/// Opaque caller identity handed over by the token layer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub role: Role,
}

impl Caller {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn system() -> Self {
        Self::new("system", Role::System)
    }

    pub fn recipient_type(&self) -> Option<RecipientType> {
        self.role.recipient_type()
    }
}
