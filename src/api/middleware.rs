//! Request middleware

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::AppState;

/// After a successful response, ask for a (debounced) overdue check
pub async fn trigger_overdue_check(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;

    if response.status().is_success() {
        let overdue = state.services.overdue.clone();
        tokio::spawn(async move {
            match overdue.trigger().await {
                Ok(true) => tracing::debug!("Overdue check scheduled"),
                Ok(false) => {}
                Err(e) => tracing::warn!("Failed to schedule overdue check: {}", e),
            }
        });
    }

    response
}
