use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use carmarket_shared::types::auth::AuthUser;
use carmarket_shared::{ApiResponse, AppResult};
use carmarket_store::models::{Car, Favorite};
use carmarket_store::AddOutcome;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct FavoriteEntry {
    #[serde(flatten)]
    pub favorite: Favorite,
    /// `None` once the listing has been removed from the catalog.
    pub car: Option<Car>,
}

#[derive(Debug, Serialize)]
pub struct FavoriteFlag {
    pub car_id: Uuid,
    pub is_favorite: bool,
}

pub async fn list_favorites(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<FavoriteEntry>>>> {
    let mut entries = Vec::new();
    for favorite in state.favorites.list(auth.id).await {
        let car = state.catalog.get(favorite.car_id).await.ok();
        entries.push(FavoriteEntry { favorite, car });
    }
    Ok(Json(ApiResponse::ok(entries)))
}

pub async fn is_favorite(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(car_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<FavoriteFlag>>> {
    let is_favorite = state.favorites.is_favorite(auth.id, car_id).await;
    Ok(Json(ApiResponse::ok(FavoriteFlag { car_id, is_favorite })))
}

pub async fn add_favorite(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(car_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<AddOutcome>>> {
    state.users.get(auth.id).await?;
    state.catalog.get(car_id).await?;
    let outcome = state.favorites.add(auth.id, car_id).await?;
    if outcome.created {
        state.catalog.adjust_favorites(car_id, 1).await?;
    }
    Ok(Json(ApiResponse::ok(outcome)))
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(car_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<FavoriteFlag>>> {
    let removed = state.favorites.remove(auth.id, car_id).await?;
    if removed > 0 {
        // listing may already be deleted
        let _ = state.catalog.adjust_favorites(car_id, -(removed as i64)).await;
    }
    Ok(Json(ApiResponse::ok_with_message(
        FavoriteFlag { car_id, is_favorite: false },
        "favorite removed",
    )))
}
