use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use carmarket_shared::middleware::AdminUser;
use carmarket_shared::types::auth::UserRole;
use carmarket_shared::{ApiResponse, AppResult, Paginated, PaginationParams};
use carmarket_store::catalog::CatalogStats;
use carmarket_store::models::{Car, Report, ReportStatus, User};
use carmarket_store::reports::ReportStats;
use carmarket_store::users::UserStats;
use carmarket_store::{CarFilters, UserFilter};

use crate::AppState;

// --- Request / Response types ---

#[derive(Debug, Deserialize)]
pub struct ReportFilterParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    pub status: Option<ReportStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UserFilterParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    pub role: Option<UserRole>,
    pub verified: Option<bool>,
    pub search: Option<String>,
}

fn default_page() -> u64 { 1 }
fn default_per_page() -> u64 { 20 }

impl ReportFilterParams {
    fn pagination(&self) -> PaginationParams {
        PaginationParams::new(self.page, self.per_page)
    }
}

impl UserFilterParams {
    fn pagination(&self) -> PaginationParams {
        PaginationParams::new(self.page, self.per_page)
    }

    fn filter(&self) -> UserFilter {
        UserFilter {
            role: self.role,
            verified: self.verified,
            search: self.search.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateReportStatusRequest {
    pub status: ReportStatus,
}

#[derive(Debug, Deserialize)]
pub struct VerifyUserRequest {
    pub verified: bool,
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub users: UserStats,
    pub cars: CatalogStats,
    pub reports: ReportStats,
}

// --- Reports ---

pub async fn list_reports(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(params): Query<ReportFilterParams>,
) -> AppResult<Json<ApiResponse<Paginated<Report>>>> {
    let page = state
        .reports
        .list_reports(params.status, &params.pagination())
        .await;
    Ok(Json(ApiResponse::ok(page)))
}

pub async fn get_report(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Report>>> {
    let report = state.reports.get_report(id).await?;
    Ok(Json(ApiResponse::ok(report)))
}

pub async fn update_report_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateReportStatusRequest>,
) -> AppResult<Json<ApiResponse<Report>>> {
    let report = state.reports.update_report_status(id, req.status).await?;
    tracing::info!(admin_id = %admin.id, report_id = %id, status = report.status.as_str(), "report reviewed");
    Ok(Json(ApiResponse::ok(report)))
}

// --- Users ---

pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(params): Query<UserFilterParams>,
) -> AppResult<Json<ApiResponse<Paginated<User>>>> {
    let page = state
        .users
        .list(&params.filter(), &params.pagination())
        .await;
    Ok(Json(ApiResponse::ok(page)))
}

pub async fn user_reports(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<Report>>>> {
    let mut reports = state.reports.get_reports_against_user(id).await;
    reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(ApiResponse::ok(reports)))
}

pub async fn verify_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<VerifyUserRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let user = state.users.set_verified(id, req.verified).await?;
    Ok(Json(ApiResponse::ok(user)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    let user = state.users.delete(id).await?;
    tracing::info!(admin_id = %admin.id, user_id = %user.id, "user removed by admin");
    Ok(Json(ApiResponse::done("user deleted")))
}

// --- Cars ---

pub async fn list_cars(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(filters): Query<CarFilters>,
    Query(page): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<Car>>>> {
    let result = state.catalog.search(&filters, &page).await;
    Ok(Json(ApiResponse::ok(result)))
}

pub async fn approve_car(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Car>>> {
    let car = state.catalog.approve(id).await?;
    Ok(Json(ApiResponse::ok_with_message(car, "listing approved")))
}

pub async fn reject_car(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Car>>> {
    let car = state.catalog.reject(id).await?;
    Ok(Json(ApiResponse::ok_with_message(car, "listing rejected")))
}

// --- Dashboard ---

pub async fn get_stats(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Json<ApiResponse<DashboardStats>>> {
    Ok(Json(ApiResponse::ok(DashboardStats {
        users: state.users.stats().await,
        cars: state.catalog.stats().await,
        reports: state.reports.stats().await,
    })))
}
