use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier as the server sends it: numeric ids for some records, opaque
/// strings for accounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Num(i64),
    Text(String),
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Num(n) => write!(f, "{}", n),
            Id::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Id {
    fn from(n: i64) -> Self {
        Id::Num(n)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::Text(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Teacher => "Teacher",
            Role::Student => "Student",
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        match self {
            Role::Admin => Capabilities::ADMIN,
            Role::Teacher => Capabilities::TEACHER,
            Role::Student => Capabilities::STUDENT,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// What a role may do in the UI. Consulted once per view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub can_create: bool,
    pub can_update: bool,
    pub can_delete: bool,
    pub can_grade: bool,
    pub can_submit: bool,
    /// Row selection and the bulk-action toolbar.
    pub can_select: bool,
}

impl Capabilities {
    pub const ADMIN: Capabilities = Capabilities {
        can_create: false,
        can_update: true,
        can_delete: true,
        can_grade: false,
        can_submit: false,
        can_select: true,
    };

    pub const TEACHER: Capabilities = Capabilities {
        can_create: true,
        can_update: true,
        can_delete: true,
        can_grade: true,
        can_submit: false,
        can_select: true,
    };

    pub const STUDENT: Capabilities = Capabilities {
        can_create: false,
        can_update: false,
        can_delete: false,
        can_grade: false,
        can_submit: true,
        can_select: false,
    };

    pub const NONE: Capabilities = Capabilities {
        can_create: false,
        can_update: false,
        can_delete: false,
        can_grade: false,
        can_submit: false,
        can_select: false,
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Id,
    #[serde(default, alias = "FullName")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: Role,
}

impl User {
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or("Unknown user")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: User,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_accepts_numeric_and_string_ids() {
        let numeric: User = serde_json::from_str(r#"{"id":1,"role":"Teacher"}"#).unwrap();
        assert_eq!(numeric.id, Id::Num(1));
        assert_eq!(numeric.full_name, None);

        let text: User = serde_json::from_str(
            r#"{"id":"8f1c","FullName":"Dana Levi","role":"Student"}"#,
        )
        .unwrap();
        assert_eq!(text.id, Id::Text("8f1c".to_string()));
        assert_eq!(text.display_name(), "Dana Levi");
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let parsed = serde_json::from_str::<User>(r#"{"id":1,"role":"Janitor"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_capability_table() {
        let student = Role::Student.capabilities();
        assert!(student.can_submit);
        assert!(!student.can_select && !student.can_delete && !student.can_update);

        let teacher = Role::Teacher.capabilities();
        assert!(teacher.can_create && teacher.can_grade && teacher.can_delete);
        assert!(!teacher.can_submit);

        let admin = Role::Admin.capabilities();
        assert!(!admin.can_create);
        assert!(admin.can_delete && admin.can_select);
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("teacher".parse::<Role>(), Ok(Role::Teacher));
        assert!("principal".parse::<Role>().is_err());
    }
}
