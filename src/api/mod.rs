//! API handlers for Libris REST endpoints

pub mod auth;
pub mod authors;
pub mod books;
pub mod categories;
pub mod health;
pub mod middleware;
pub mod notifications;
pub mod openapi;
pub mod reservations;
pub mod stats;
pub mod users;

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Request},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json, RequestPartsExt,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use utoipa::IntoParams;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{pagination::PageQuery, user::UserClaims},
    AppState,
};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::Authentication("Unauthenticated".to_string()))?;

        let claims = state.services.users.verify_token(bearer.token()).await?;

        Ok(AuthenticatedUser(claims))
    }
}

/// JSON body that has passed its `validator` rules
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| match rejection {
                JsonRejection::JsonDataError(e) => AppError::field("body", e.body_text()),
                other => AppError::BadRequest(other.body_text()),
            })?;

        value.validate()?;

        Ok(ValidatedJson(value))
    }
}

/// `?q=` for the search endpoints
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Text to look for
    pub q: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl SearchQuery {
    /// Trimmed query text; 400 when missing or blank
    pub fn term(&self) -> AppResult<String> {
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AppError::BadRequest("Search query is required".to_string()))
    }

    pub fn page(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Success envelope: `{success, message, data, status}`
#[derive(Serialize)]
struct Envelope<'a, T> {
    success: bool,
    message: &'a str,
    data: Option<T>,
    status: String,
}

pub struct ApiResponse<T> {
    status: StatusCode,
    message: String,
    data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::OK,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Message without data
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            message: message.into(),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = Envelope {
            success: true,
            message: &self.message,
            data: self.data,
            status: self.status.as_u16().to_string(),
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_search_term_required() {
        assert!(matches!(SearchQuery::default().term(), Err(AppError::BadRequest(_))));

        let blank = SearchQuery { q: Some("   ".to_string()), ..Default::default() };
        assert!(blank.term().is_err());

        let query = SearchQuery { q: Some(" tolkien ".to_string()), ..Default::default() };
        assert_eq!(query.term().unwrap(), "tolkien");
    }

    #[tokio::test]
    async fn test_created_envelope() {
        let response = ApiResponse::created("Book created successfully", serde_json::json!({"id": 1}))
            .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Book created successfully");
        assert_eq!(body["data"]["id"], 1);
        assert_eq!(body["status"], "201");
    }

    #[tokio::test]
    async fn test_message_envelope_has_null_data() {
        let body = body_json(ApiResponse::message("Logged out successfully").into_response()).await;
        assert!(body["data"].is_null());
        assert_eq!(body["status"], "200");
    }

    #[tokio::test]
    async fn test_error_envelope() {
        let response =
            AppError::Unavailable("Book is not available for reservation".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Book is not available for reservation");
        assert_eq!(body["status"], "400");
        assert!(body.get("errors").is_none());
    }

    #[tokio::test]
    async fn test_validation_envelope_lists_fields() {
        let body = body_json(AppError::field("isbn", "The isbn has already been taken.").into_response()).await;
        assert_eq!(body["status"], "422");
        assert_eq!(body["errors"]["isbn"][0], "The isbn has already been taken.");
    }
}
