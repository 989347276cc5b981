//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    config::{AdminConfig, AuthConfig},
    error::{AppError, AppResult},
    models::{
        pagination::{PageQuery, Paginated},
        user::{
            CreateUser, RegisterUser, Role, UpdateUser, User, UserClaims, UserQuery,
            UserWithOverdue,
        },
    },
    repository::{
        users::{NewUser, UserChanges},
        Repository,
    },
    services::redis::RedisService,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
    redis: RedisService,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig, redis: RedisService) -> Self {
        Self { repository, config, redis }
    }

    /// Register a new member and return it with a fresh token
    pub async fn register(&self, request: RegisterUser) -> AppResult<(User, String)> {
        self.ensure_email_free(&request.email, None).await?;

        let password_hash = hash_password(&request.password)?;
        let user = self
            .repository
            .users
            .create(&NewUser {
                name: &request.name,
                email: &request.email,
                password_hash: &password_hash,
                phone: request.phone.as_deref(),
                address: request.address.as_deref(),
                role: Role::Member,
            })
            .await?;

        tracing::info!(user_id = user.id, "User registered");

        let token = self.create_token_for_user(&user).await?;
        let user = self.with_access(user).await?;
        Ok((user, token))
    }

    /// Authenticate by email and password and return a JWT token
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<(User, String)> {
        let credentials = self
            .repository
            .users
            .get_credentials(email)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid credentials".to_string()))?;

        if !verify_password(&credentials.password, password)? {
            tracing::debug!(user_id = credentials.id, "Password mismatch");
            return Err(AppError::Authentication("Invalid credentials".to_string()));
        }

        let user = self.repository.users.get_by_id(credentials.id).await?;
        let token = self.create_token_for_user(&user).await?;
        let user = self.with_access(user).await?;

        Ok((user, token))
    }

    /// Revoke the token carried by `claims`
    pub async fn logout(&self, claims: &UserClaims) -> AppResult<()> {
        let remaining = (claims.exp - Utc::now().timestamp()).max(1) as u64;
        self.redis.revoke_token(&claims.jti, remaining).await?;
        tracing::info!(user_id = claims.user_id, "User logged out");
        Ok(())
    }

    /// Decode a bearer token, reject revoked ones and those of deleted users
    pub async fn verify_token(&self, token: &str) -> AppResult<UserClaims> {
        let claims = UserClaims::from_token(token, &self.config.jwt_secret)
            .map_err(|_| AppError::Authentication("Unauthenticated".to_string()))?;

        if self.redis.is_token_revoked(&claims.jti).await? {
            return Err(AppError::Authentication("Unauthenticated".to_string()));
        }

        // Grants are read live; the ones in the token may be stale
        if !self.repository.users.exists(claims.user_id).await? {
            return Err(AppError::Authentication("Unauthenticated".to_string()));
        }
        let roles = self.repository.users.get_roles(claims.user_id).await?;
        let permissions = self.repository.users.get_permissions(claims.user_id).await?;

        Ok(claims.with_grants(roles, permissions))
    }

    async fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        let roles = self.repository.users.get_roles(user.id).await?;
        let permissions = self.repository.users.get_permissions(user.id).await?;

        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.id.to_string(),
            user_id: user.id,
            email: user.email.clone(),
            roles,
            permissions,
            iat: now,
            exp,
            jti: Uuid::new_v4().to_string(),
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Load roles and permissions onto the user
    async fn with_access(&self, mut user: User) -> AppResult<User> {
        user.roles = Some(self.repository.users.get_roles(user.id).await?);
        user.permissions = Some(self.repository.users.get_permissions(user.id).await?);
        Ok(user)
    }

    /// Current user with roles and permissions
    pub async fn me(&self, user_id: i32) -> AppResult<User> {
        let user = self.repository.users.get_by_id(user_id).await?;
        self.with_access(user).await
    }

    pub async fn search(&self, query: &UserQuery) -> AppResult<Paginated<User>> {
        let (users, total) = self.repository.users.search(query).await?;
        let page = PageQuery { page: query.page, per_page: query.per_page };
        Ok(Paginated::new(users, total, &page))
    }

    /// User with roles and every reservation
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        let user = self.repository.users.get_by_id(id).await?;
        let mut user = self.with_access(user).await?;
        user.reservations = Some(self.repository.reservations.list_for_user(id).await?);
        Ok(user)
    }

    pub async fn create_user(&self, request: CreateUser) -> AppResult<User> {
        self.ensure_email_free(&request.email, None).await?;

        let password_hash = hash_password(&request.password)?;
        let user = self
            .repository
            .users
            .create(&NewUser {
                name: &request.name,
                email: &request.email,
                password_hash: &password_hash,
                phone: request.phone.as_deref(),
                address: request.address.as_deref(),
                role: request.role.unwrap_or(Role::Member),
            })
            .await?;

        tracing::info!(user_id = user.id, "User created");
        self.with_access(user).await
    }

    pub async fn update_user(&self, id: i32, request: UpdateUser) -> AppResult<User> {
        if let Some(ref email) = request.email {
            self.ensure_email_free(email, Some(id)).await?;
        }

        let password_hash = request
            .password
            .as_deref()
            .map(hash_password)
            .transpose()?;

        let user = self
            .repository
            .users
            .update(
                id,
                &UserChanges {
                    name: request.name.as_deref(),
                    email: request.email.as_deref(),
                    password_hash: password_hash.as_deref(),
                    phone: request.phone.as_deref(),
                    address: request.address.as_deref(),
                    role: request.role,
                },
            )
            .await?;

        self.with_access(user).await
    }

    /// Delete a user that never borrowed anything
    pub async fn delete_user(&self, id: i32) -> AppResult<()> {
        if !self.repository.users.exists(id).await? {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        if self.repository.users.has_reservations(id).await? {
            return Err(AppError::BusinessRule(
                "Cannot delete a user with reservations".to_string(),
            ));
        }
        self.repository.users.delete(id).await
    }

    /// Users with overdue reservations, each with those reservations
    pub async fn overdue_users(&self) -> AppResult<Vec<UserWithOverdue>> {
        let users = self.repository.users.list_with_overdue().await?;
        let mut result = Vec::with_capacity(users.len());
        for user in users {
            let overdue_reservations = self
                .repository
                .reservations
                .list_overdue_for_user(user.id)
                .await?;
            result.push(UserWithOverdue { user, overdue_reservations });
        }
        Ok(result)
    }

    /// Create the configured administrator account if it does not exist yet
    pub async fn ensure_admin(&self, admin: &AdminConfig) -> AppResult<()> {
        if self.repository.users.get_by_email(&admin.email).await?.is_some() {
            return Ok(());
        }

        let password_hash = hash_password(&admin.password)?;
        let user = self
            .repository
            .users
            .create(&NewUser {
                name: &admin.name,
                email: &admin.email,
                password_hash: &password_hash,
                phone: None,
                address: None,
                role: Role::Admin,
            })
            .await?;

        tracing::info!(user_id = user.id, email = %admin.email, "Administrator account created");
        Ok(())
    }

    async fn ensure_email_free(&self, email: &str, exclude_id: Option<i32>) -> AppResult<()> {
        if self.repository.users.email_exists(email, exclude_id).await? {
            return Err(AppError::field("email", "The email has already been taken."));
        }
        Ok(())
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

pub fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert_ne!(hash, "correct horse battery");
        assert!(verify_password(&hash, "correct horse battery").unwrap());
        assert!(!verify_password(&hash, "wrong password").unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn test_malformed_hash_is_internal_error() {
        assert!(matches!(
            verify_password("not-a-hash", "x"),
            Err(AppError::Internal(_))
        ));
    }
}
