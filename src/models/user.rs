//! User model, roles, permissions and token claims

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use super::reservation::ReservationDetails;
use crate::error::AppError;

/// Digits, spaces and the usual separators, optional leading `+`
static PHONE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9 ()./-]{3,20}$").expect("valid phone regex"));

/// Role granted to a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Librarian,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Librarian => "librarian",
            Role::Member => "member",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "librarian" => Ok(Role::Librarian),
            "member" => Ok(Role::Member),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// Named permission, stored as e.g. `"view books"` in the `permissions` table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Permission {
    #[serde(rename = "view users")]
    ViewUsers,
    #[serde(rename = "create users")]
    CreateUsers,
    #[serde(rename = "edit users")]
    EditUsers,
    #[serde(rename = "delete users")]
    DeleteUsers,
    #[serde(rename = "view books")]
    ViewBooks,
    #[serde(rename = "create books")]
    CreateBooks,
    #[serde(rename = "edit books")]
    EditBooks,
    #[serde(rename = "delete books")]
    DeleteBooks,
    #[serde(rename = "view authors")]
    ViewAuthors,
    #[serde(rename = "create authors")]
    CreateAuthors,
    #[serde(rename = "edit authors")]
    EditAuthors,
    #[serde(rename = "delete authors")]
    DeleteAuthors,
    #[serde(rename = "view categories")]
    ViewCategories,
    #[serde(rename = "create categories")]
    CreateCategories,
    #[serde(rename = "edit categories")]
    EditCategories,
    #[serde(rename = "delete categories")]
    DeleteCategories,
    #[serde(rename = "view reservations")]
    ViewReservations,
    #[serde(rename = "create reservations")]
    CreateReservations,
    #[serde(rename = "edit reservations")]
    EditReservations,
    #[serde(rename = "view reports")]
    ViewReports,
}

impl Permission {
    pub const ALL: [Permission; 20] = [
        Permission::ViewUsers,
        Permission::CreateUsers,
        Permission::EditUsers,
        Permission::DeleteUsers,
        Permission::ViewBooks,
        Permission::CreateBooks,
        Permission::EditBooks,
        Permission::DeleteBooks,
        Permission::ViewAuthors,
        Permission::CreateAuthors,
        Permission::EditAuthors,
        Permission::DeleteAuthors,
        Permission::ViewCategories,
        Permission::CreateCategories,
        Permission::EditCategories,
        Permission::DeleteCategories,
        Permission::ViewReservations,
        Permission::CreateReservations,
        Permission::EditReservations,
        Permission::ViewReports,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ViewUsers => "view users",
            Permission::CreateUsers => "create users",
            Permission::EditUsers => "edit users",
            Permission::DeleteUsers => "delete users",
            Permission::ViewBooks => "view books",
            Permission::CreateBooks => "create books",
            Permission::EditBooks => "edit books",
            Permission::DeleteBooks => "delete books",
            Permission::ViewAuthors => "view authors",
            Permission::CreateAuthors => "create authors",
            Permission::EditAuthors => "edit authors",
            Permission::DeleteAuthors => "delete authors",
            Permission::ViewCategories => "view categories",
            Permission::CreateCategories => "create categories",
            Permission::EditCategories => "edit categories",
            Permission::DeleteCategories => "delete categories",
            Permission::ViewReservations => "view reservations",
            Permission::CreateReservations => "create reservations",
            Permission::EditReservations => "edit reservations",
            Permission::ViewReports => "view reports",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("Invalid permission: {}", s))
    }
}

/// User model from database (the password hash is never loaded here)
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub roles: Option<Vec<Role>>,
    #[sqlx(skip)]
    pub permissions: Option<Vec<Permission>>,
    #[sqlx(skip)]
    pub reservations: Option<Vec<ReservationDetails>>,
}

/// Short user representation embedded in other payloads
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserShort {
    pub id: i32,
    pub name: String,
    pub email: String,
}

/// Email and password hash, used only for authentication
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub id: i32,
    pub password: String,
}

/// A user owning overdue reservations
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserWithOverdue {
    #[serde(flatten)]
    pub user: User,
    pub overdue_reservations: Vec<ReservationDetails>,
}

/// User list query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct UserQuery {
    /// Name or email contains
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if PHONE_REGEX.is_match(phone) {
        Ok(())
    } else {
        let mut err = ValidationError::new("phone");
        err.message = Some("The phone format is invalid.".into());
        Err(err)
    }
}

/// Self-registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterUser {
    #[validate(length(min = 1, max = 255, message = "The name field is required."))]
    pub name: String,
    #[validate(email(message = "The email must be a valid email address."))]
    pub email: String,
    #[validate(length(min = 8, message = "The password must be at least 8 characters."))]
    pub password: String,
    #[validate(must_match(other = "password", message = "The password confirmation does not match."))]
    pub password_confirmation: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
    #[validate(length(max = 255))]
    pub address: Option<String>,
}

/// Create user request (staff)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(length(min = 1, max = 255, message = "The name field is required."))]
    pub name: String,
    #[validate(email(message = "The email must be a valid email address."))]
    pub email: String,
    #[validate(length(min = 8, message = "The password must be at least 8 characters."))]
    pub password: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
    #[validate(length(max = 255))]
    pub address: Option<String>,
    /// Defaults to `member`
    pub role: Option<Role>,
}

/// Update user request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    #[validate(length(min = 1, max = 255, message = "The name field is required."))]
    pub name: Option<String>,
    #[validate(email(message = "The email must be a valid email address."))]
    pub email: Option<String>,
    #[validate(length(min = 8, message = "The password must be at least 8 characters."))]
    pub password: Option<String>,
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
    #[validate(length(max = 255))]
    pub address: Option<String>,
    pub role: Option<Role>,
}

/// JWT claims for authentication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub email: String,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
    pub iat: i64,
    pub exp: i64,
    /// Token id, used for revocation on logout
    pub jti: String,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    /// Replace the roles and permissions carried by the token
    pub fn with_grants(self, roles: Vec<Role>, permissions: Vec<Permission>) -> Self {
        Self { roles, permissions, ..self }
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Fail with 403 unless the token grants `permission`
    pub fn require(&self, permission: Permission) -> Result<(), AppError> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(AppError::Authorization("Unauthorized action".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(permissions: Vec<Permission>) -> UserClaims {
        let now = Utc::now().timestamp();
        UserClaims {
            sub: "reader@example.com".to_string(),
            user_id: 7,
            email: "reader@example.com".to_string(),
            roles: vec![Role::Member],
            permissions,
            iat: now,
            exp: now + 3600,
            jti: "token-1".to_string(),
        }
    }

    #[test]
    fn test_permission_names() {
        for permission in Permission::ALL {
            assert_eq!(permission.as_str().parse::<Permission>(), Ok(permission));
            let json = serde_json::to_string(&permission).unwrap();
            assert_eq!(json, format!("\"{}\"", permission.as_str()));
        }
        assert!("fly planes".parse::<Permission>().is_err());
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("Librarian".parse::<Role>(), Ok(Role::Librarian));
        assert!("guest".parse::<Role>().is_err());
    }

    #[test]
    fn test_token_roundtrip() {
        let claims = claims(vec![Permission::ViewBooks]);
        let token = claims.create_token("secret").unwrap();

        let decoded = UserClaims::from_token(&token, "secret").unwrap();
        assert_eq!(decoded.user_id, 7);
        assert_eq!(decoded.permissions, vec![Permission::ViewBooks]);
        assert!(UserClaims::from_token(&token, "other-secret").is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let mut claims = claims(vec![]);
        claims.iat -= 7200;
        claims.exp = claims.iat + 60;
        let token = claims.create_token("secret").unwrap();
        assert!(UserClaims::from_token(&token, "secret").is_err());
    }

    #[test]
    fn test_require_permission() {
        let claims = claims(vec![Permission::ViewBooks, Permission::CreateReservations]);
        assert!(claims.require(Permission::ViewBooks).is_ok());
        assert!(matches!(
            claims.require(Permission::DeleteBooks),
            Err(AppError::Authorization(_))
        ));
    }

    #[test]
    fn test_current_grants_replace_token_grants() {
        let issued = claims(vec![Permission::ViewBooks, Permission::DeleteUsers]);
        let current = issued.with_grants(vec![Role::Member], vec![Permission::ViewBooks]);

        assert!(current.require(Permission::ViewBooks).is_ok());
        assert!(current.require(Permission::DeleteUsers).is_err());
        assert_eq!(current.user_id, 7);
        assert_eq!(current.jti, "token-1");
    }

    #[test]
    fn test_register_validation() {
        let request = RegisterUser {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "longenough".to_string(),
            password_confirmation: "different".to_string(),
            phone: Some("+33 6 12 34 56 78".to_string()),
            address: None,
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password_confirmation"));
        assert!(!errors.field_errors().contains_key("phone"));

        let request = RegisterUser {
            password: "short".to_string(),
            password_confirmation: "short".to_string(),
            phone: Some("call me".to_string()),
            ..request
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));
        assert!(errors.field_errors().contains_key("phone"));
    }
}
