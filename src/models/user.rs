use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{nullable, require_email, require_text};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Developer,
    Tester,
    Client,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::Manager,
        Role::Developer,
        Role::Tester,
        Role::Client,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Developer => "developer",
            Role::Tester => "tester",
            Role::Client => "client",
        }
    }

    /// Admins and managers own clients, projects, teams, and deployments.
    pub fn is_manager(self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }

    /// Everyone on the delivery side, i.e. not a client account.
    pub fn is_staff(self) -> bool {
        !matches!(self, Role::Client)
    }
}

impl std::str::FromStr for Role {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == value)
            .ok_or_else(|| AppError::validation(format!("unknown role {value:?}")))
    }
}

/// A team member account.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub title: Option<String>,
    #[serde(skip)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

fn default_role() -> Role {
    Role::Developer
}

pub const MIN_PASSWORD_LEN: usize = 8;

impl NewUser {
    pub fn validate(&self) -> AppResult<()> {
        require_text("name", &self.name)?;
        require_email(&self.email)?;
        validate_password(&self.password)
    }
}

fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<Option<String>>,
}

impl UserUpdate {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(name) = &self.name {
            require_text("name", name)?;
        }
        if let Some(email) = &self.email {
            require_email(email)?;
        }
        if let Some(password) = &self.password {
            validate_password(password)?;
        }
        Ok(())
    }

    /// Fields a non-admin may change on their own account.
    pub fn is_self_service(&self) -> bool {
        self.role.is_none() && self.email.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user() -> NewUser {
        NewUser {
            name: "Grace".into(),
            email: "grace@example.com".into(),
            password: "correct horse".into(),
            role: Role::Tester,
            title: None,
        }
    }

    #[test]
    fn role_capabilities() {
        assert!(Role::Admin.is_manager());
        assert!(Role::Manager.is_manager());
        assert!(!Role::Developer.is_manager());
        assert!(Role::Tester.is_staff());
        assert!(!Role::Client.is_staff());
    }

    #[test]
    fn role_parses_from_snake_case() {
        assert_eq!("manager".parse::<Role>().unwrap(), Role::Manager);
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn short_passwords_are_rejected() {
        let mut user = new_user();
        assert!(user.validate().is_ok());
        user.password = "short".into();
        assert!(user.validate().is_err());
    }

    #[test]
    fn password_hash_never_serializes() {
        let user = User {
            id: 1,
            name: "Grace".into(),
            email: "grace@example.com".into(),
            role: Role::Admin,
            title: None,
            password_hash: "secret".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "admin");
    }

    #[test]
    fn role_defaults_to_developer() {
        let user: NewUser = serde_json::from_str(
            r#"{"name":"Ada","email":"ada@example.com","password":"12345678"}"#,
        )
        .unwrap();
        assert_eq!(user.role, Role::Developer);
    }
}
