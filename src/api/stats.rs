//! Dashboard and report endpoints

use axum::extract::State;

use crate::{
    error::AppResult,
    models::{
        stats::{DashboardStats, ReportsResponse},
        user::Permission,
    },
};

use super::{ApiResponse, AuthenticatedUser};

/// Library-wide counters
#[utoipa::path(
    get,
    path = "/stats/dashboard",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dashboard counters", body = DashboardStats),
        (status = 403, description = "Missing permission", body = crate::error::ErrorResponse)
    )
)]
pub async fn dashboard(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<ApiResponse<DashboardStats>> {
    claims.require(Permission::ViewReports)?;

    let stats = state.services.stats.dashboard().await?;
    Ok(ApiResponse::ok("Dashboard statistics retrieved successfully", stats))
}

/// Popular books, recent activity, category counts and this month's figures
#[utoipa::path(
    get,
    path = "/stats/reports",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Reports", body = ReportsResponse),
        (status = 403, description = "Missing permission", body = crate::error::ErrorResponse)
    )
)]
pub async fn reports(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<ApiResponse<ReportsResponse>> {
    claims.require(Permission::ViewReports)?;

    let reports = state.services.stats.reports().await?;
    Ok(ApiResponse::ok("Reports retrieved successfully", reports))
}
