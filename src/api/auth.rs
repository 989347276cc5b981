//! Authentication endpoints

use axum::extract::State;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::user::{RegisterUser, User},
};

use super::{ApiResponse, AuthenticatedUser, ValidatedJson};

/// Login request
#[derive(Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "The email must be a valid email address."))]
    pub email: String,
    #[validate(length(min = 1, message = "The password field is required."))]
    pub password: String,
}

/// Token returned by register and login
#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
    /// Always `Bearer`
    pub token_type: String,
}

impl AuthResponse {
    fn new(user: User, token: String) -> Self {
        Self {
            user,
            token,
            token_type: "Bearer".to_string(),
        }
    }
}

/// Register a new member account
#[utoipa::path(
    post,
    path = "/register",
    tag = "auth",
    request_body = RegisterUser,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 422, description = "Validation failed", body = crate::error::ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<crate::AppState>,
    ValidatedJson(request): ValidatedJson<RegisterUser>,
) -> AppResult<ApiResponse<AuthResponse>> {
    let (user, token) = state.services.users.register(request).await?;
    Ok(ApiResponse::created(
        "User registered successfully",
        AuthResponse::new(user, token),
    ))
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<crate::AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> AppResult<ApiResponse<AuthResponse>> {
    let (user, token) = state
        .services
        .users
        .authenticate(&request.email, &request.password)
        .await?;

    Ok(ApiResponse::ok("Login successful", AuthResponse::new(user, token)))
}

/// Revoke the current token
#[utoipa::path(
    post,
    path = "/logout",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Logged out"),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn logout(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<ApiResponse<()>> {
    state.services.users.logout(&claims).await?;
    Ok(ApiResponse::message("Logged out successfully"))
}

/// Get current user info
#[utoipa::path(
    get,
    path = "/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user with roles and permissions", body = User),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn me(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<ApiResponse<User>> {
    let user = state.services.users.me(claims.user_id).await?;
    Ok(ApiResponse::ok("User retrieved successfully", user))
}
