use axum::extract::State;
use axum::Json;

use carmarket_shared::types::auth::AuthUser;
use carmarket_shared::{ApiResponse, AppResult};
use carmarket_store::models::{Report, ReportReason};
use carmarket_store::NewReport;

use crate::AppState;

pub async fn report_reasons(
    State(state): State<AppState>,
) -> Json<ApiResponse<&'static [ReportReason]>> {
    Json(ApiResponse::ok(state.reports.get_report_reasons()))
}

pub async fn submit_report(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<NewReport>,
) -> AppResult<Json<ApiResponse<Report>>> {
    state.users.get(auth.id).await?;
    state.users.get(req.reported_id).await?;
    let report = state.reports.submit_report(auth.id, req).await?;
    Ok(Json(ApiResponse::ok_with_message(
        report,
        "report submitted, our team will review it",
    )))
}

pub async fn my_reports(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<Report>>>> {
    let mut reports = state.reports.get_user_reports(auth.id).await;
    reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(ApiResponse::ok(reports)))
}
