//! Admin user accounts and roles.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Access level of an admin account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Admin,
    Editor,
    /// Read-only access to the admin panel.
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Editor => "editor",
            Role::Viewer => "viewer",
        }
    }

    pub fn can_write(&self) -> bool {
        !matches!(self, Role::Viewer)
    }

    pub fn can_manage_users(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "editor" => Ok(Role::Editor),
            "viewer" => Ok(Role::Viewer),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn validate_password_pair(password: &str, confirmation: &str) -> Result<(), ValidationError> {
    shared::password::check_new_password(password, confirmation).map_err(|e| {
        let mut err = ValidationError::new("password");
        err.message = Some(e.to_string().into());
        err
    })
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_create_passwords"))]
pub struct CreateUserRequest {
    #[validate(custom(function = "shared::validation::validate_username"))]
    pub username: String,

    #[validate(email(message = "Invalid email address"))]
    #[validate(length(max = 255, message = "Email must be at most 255 characters"))]
    pub email: Option<String>,

    pub password: String,

    pub password_confirm: String,

    #[serde(default)]
    pub role: Role,
}

fn validate_create_passwords(req: &CreateUserRequest) -> Result<(), ValidationError> {
    validate_password_pair(&req.password, &req.password_confirm)
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_update_passwords"))]
pub struct UpdateUserRequest {
    #[validate(custom(function = "shared::validation::validate_username"))]
    pub username: String,

    #[validate(email(message = "Invalid email address"))]
    #[validate(length(max = 255, message = "Email must be at most 255 characters"))]
    pub email: Option<String>,

    /// Left empty to keep the current password.
    pub password: Option<String>,

    pub password_confirm: Option<String>,

    #[serde(default)]
    pub role: Role,
}

impl UpdateUserRequest {
    /// New password, if the form asked for a change.
    pub fn new_password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }
}

fn validate_update_passwords(req: &UpdateUserRequest) -> Result<(), ValidationError> {
    match req.new_password() {
        Some(password) => validate_password_pair(password, req.password_confirm.as_deref().unwrap_or("")),
        None => Ok(()),
    }
}

/// Normalizes an optional email: trimmed, empty becomes `None`.
pub fn normalize_email(email: Option<&str>) -> Option<String> {
    email
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_lowercase)
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50, message = "Username is required"))]
    pub username: String,

    #[validate(length(min = 1, max = 128, message = "Password is required"))]
    pub password: String,

    #[serde(default, alias = "remember_me")]
    pub remember: Option<String>,

    /// Relative path to continue to after login.
    pub redirect_url: Option<String>,
}

impl LoginRequest {
    /// Only same-site relative redirects are honoured.
    pub fn safe_redirect(&self) -> &str {
        match self.redirect_url.as_deref() {
            Some(url) if url.starts_with('/') && !url.starts_with("//") && !url.contains('\\') => url,
            _ => "/admin",
        }
    }
}

/// Public view of the logged-in account.
#[derive(Debug, Clone, Serialize)]
pub struct SessionUser {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(password: &str, confirm: &str) -> CreateUserRequest {
        CreateUserRequest {
            username: "editor_1".into(),
            email: Some("ed@example.com".into()),
            password: password.into(),
            password_confirm: confirm.into(),
            role: Role::Editor,
        }
    }

    #[test]
    fn test_normalize_email_with_generated_addresses() {
        use fake::faker::internet::en::SafeEmail;
        use fake::Fake;

        for _ in 0..20 {
            let email: String = SafeEmail().fake();
            let padded = format!("  {}  ", email.to_uppercase());
            assert_eq!(normalize_email(Some(&padded)), Some(email.to_lowercase()));
        }
        assert_eq!(normalize_email(Some("   ")), None);
        assert_eq!(normalize_email(None), None);
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!(Role::from_str("VIEWER").unwrap(), Role::Viewer);
        assert!(Role::from_str("root").is_err());
        assert_eq!(Role::default(), Role::Admin);
        assert_eq!(Role::Editor.to_string(), "editor");
    }

    #[test]
    fn test_role_permissions() {
        assert!(Role::Admin.can_manage_users());
        assert!(!Role::Editor.can_manage_users());
        assert!(Role::Editor.can_write());
        assert!(!Role::Viewer.can_write());
    }

    #[test]
    fn test_create_user_validation() {
        assert!(create("longenough", "longenough").validate().is_ok());
        assert!(create("short", "short").validate().is_err());
        assert!(create("longenough", "different!").validate().is_err());

        let mut bad_name = create("longenough", "longenough");
        bad_name.username = "a b".into();
        assert!(bad_name.validate().is_err());
    }

    #[test]
    fn test_update_without_password_change() {
        let req = UpdateUserRequest {
            username: "editor_1".into(),
            email: None,
            password: Some(String::new()),
            password_confirm: None,
            role: Role::Viewer,
        };
        assert!(req.validate().is_ok());
        assert_eq!(req.new_password(), None);
    }

    #[test]
    fn test_update_password_must_match() {
        let req = UpdateUserRequest {
            username: "editor_1".into(),
            email: None,
            password: Some("newpassword".into()),
            password_confirm: Some("otherpassword".into()),
            role: Role::Editor,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User {
            id: 1,
            username: "admin".into(),
            email: None,
            password_hash: "$argon2id$secret".into(),
            role: Role::Admin,
            last_login: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"role\":\"admin\""));
    }

    #[test]
    fn test_safe_redirect() {
        let mut req = LoginRequest {
            username: "a".into(),
            password: "b".into(),
            remember: None,
            redirect_url: Some("/admin/galleries".into()),
        };
        assert_eq!(req.safe_redirect(), "/admin/galleries");
        req.redirect_url = Some("//evil.example".into());
        assert_eq!(req.safe_redirect(), "/admin");
        req.redirect_url = Some("https://evil.example".into());
        assert_eq!(req.safe_redirect(), "/admin");
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email(Some("  A@B.com ")), Some("a@b.com".into()));
        assert_eq!(normalize_email(Some("")), None);
    }
}
