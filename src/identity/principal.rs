use serde::{Deserialize, Serialize};

/// Well-known roles of the skeleton application. Authorities are plain strings
/// everywhere else; these are just the names the demo data and views use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserRole {
    Admin,
    Manager,
    Employee,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::Manager => "MANAGER",
            UserRole::Employee => "EMPLOYEE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ADMIN" => Some(UserRole::Admin),
            "MANAGER" => Some(UserRole::Manager),
            "EMPLOYEE" => Some(UserRole::Employee),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
}

fn enabled_default() -> bool { true }

impl Principal {
    pub fn new(username: impl Into<String>, roles: &[UserRole]) -> Self {
        Self {
            username: username.into(),
            roles: roles.iter().map(|r| r.as_str().to_string()).collect(),
            enabled: true,
            ..Default::default()
        }
    }

    pub fn with_name(mut self, first: &str, last: &str) -> Self {
        self.first_name = Some(first.to_string());
        self.last_name = Some(last.to_string());
        self
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    /// Roles of the stored record that map onto a known [`UserRole`].
    pub fn known_roles(&self) -> Vec<UserRole> {
        self.roles.iter().filter_map(|r| UserRole::parse(r)).collect()
    }
}
