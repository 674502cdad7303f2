use axum::extract::{Path, Query, State};
use axum::Json;
use uuid::Uuid;

use carmarket_shared::middleware::{OptionalAuthUser, SellerUser};
use carmarket_shared::types::auth::AuthUser;
use carmarket_shared::{ApiResponse, AppError, AppResult, ErrorCode, Paginated, PaginationParams};
use carmarket_store::models::{Car, CarPatch};
use carmarket_store::validation::CarForm;
use carmarket_store::CarFilters;

use crate::AppState;

fn ensure_owner(car: &Car, user: &AuthUser) -> AppResult<()> {
    if car.seller_id != user.id {
        return Err(AppError::new(ErrorCode::NotListingOwner, "you do not own this listing"));
    }
    Ok(())
}

// --- Browse ---

/// Public browse. Only admins may look past approved and active listings.
pub async fn list_cars(
    State(state): State<AppState>,
    OptionalAuthUser(viewer): OptionalAuthUser,
    Query(mut filters): Query<CarFilters>,
    Query(page): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<Car>>>> {
    if !viewer.as_ref().is_some_and(AuthUser::is_admin) {
        filters.status = None;
    }
    let result = state.catalog.browse(&filters, &page).await;
    Ok(Json(ApiResponse::ok(result)))
}

pub async fn get_car(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Car>>> {
    let car = state.catalog.record_view(id).await?;
    Ok(Json(ApiResponse::ok(car)))
}

// --- Seller actions ---

pub async fn create_car(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
    Json(form): Json<CarForm>,
) -> AppResult<Json<ApiResponse<Car>>> {
    let account = state.users.get(seller.id).await?;
    let car = state.catalog.create_listing(&account, form).await?;
    Ok(Json(ApiResponse::ok_with_message(car, "listing submitted for review")))
}

pub async fn update_car(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(patch): Json<CarPatch>,
) -> AppResult<Json<ApiResponse<Car>>> {
    let car = state.catalog.get(id).await?;
    ensure_owner(&car, &auth)?;
    let car = state.catalog.update_car(id, patch).await?;
    Ok(Json(ApiResponse::ok(car)))
}

pub async fn delete_car(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    let car = state.catalog.get(id).await?;
    if !auth.is_admin() {
        ensure_owner(&car, &auth)?;
    }
    state.catalog.delete_car(id).await?;
    Ok(Json(ApiResponse::done("listing deleted")))
}

pub async fn mark_sold(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Car>>> {
    let car = state.catalog.get(id).await?;
    ensure_owner(&car, &auth)?;
    let car = state.catalog.mark_sold(id).await?;
    Ok(Json(ApiResponse::ok(car)))
}
