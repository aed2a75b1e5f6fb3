use serde::{Deserialize, Serialize};

use crate::notifications::RecipientType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Teacher,
    Student,
    System,
}

impl Role {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "teacher" => Some(Role::Teacher),
            "student" => Some(Role::Student),
            "system" | "admin" => Some(Role::System),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Teacher => "teacher",
            Role::Student => "student",
            Role::System => "system",
        }
    }

    /// Role seen as a notification audience. System callers receive nothing.
    pub fn recipient_type(&self) -> Option<RecipientType> {
        match self {
            Role::Teacher => Some(RecipientType::Teacher),
            Role::Student => Some(RecipientType::Student),
            Role::System => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_roles() {
        assert_eq!(Role::parse("Teacher"), Some(Role::Teacher));
        assert_eq!(Role::parse("student"), Some(Role::Student));
        assert_eq!(Role::parse("admin"), Some(Role::System));
        assert_eq!(Role::parse("parent"), None);
    }
}
