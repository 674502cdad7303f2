use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use carmarket_shared::types::auth::{AuthUser, UserRole};
use carmarket_shared::{ApiResponse, AppError, AppResult, ErrorCode};
use carmarket_store::models::{Rating, RatingBucket, SellerRating};

use crate::AppState;

// --- Request / Response types ---

#[derive(Debug, Deserialize)]
pub struct RateSellerRequest {
    pub seller_id: Uuid,
    pub rating: u8,
    pub review: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRatingRequest {
    pub rating: u8,
    pub review: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SellerRatingView {
    #[serde(flatten)]
    pub summary: SellerRating,
    pub breakdown: Vec<RatingBucket>,
}

impl From<SellerRating> for SellerRatingView {
    fn from(summary: SellerRating) -> Self {
        let breakdown = summary.breakdown();
        Self { summary, breakdown }
    }
}

/// Load a rating the caller wrote. Admins pass when `admin_ok` is set.
async fn authored(state: &AppState, auth: &AuthUser, rating_id: Uuid, admin_ok: bool) -> AppResult<Rating> {
    let rating = state
        .ratings
        .get_rating(rating_id)
        .await
        .ok_or_else(|| AppError::new(ErrorCode::RatingNotFound, format!("rating {rating_id} not found")))?;
    if rating.user_id != auth.id && !(admin_ok && auth.is_admin()) {
        return Err(AppError::new(ErrorCode::NotRatingAuthor, "you did not write this rating"));
    }
    Ok(rating)
}

// --- Handlers ---

pub async fn rate_seller(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<RateSellerRequest>,
) -> AppResult<Json<ApiResponse<Rating>>> {
    state.users.get(auth.id).await?;
    let seller = state.users.get(req.seller_id).await?;
    if seller.role != UserRole::Seller {
        return Err(AppError::bad_request("only sellers can be rated"));
    }
    let rating = state
        .ratings
        .rate_seller(auth.id, seller.id, req.rating, req.review)
        .await?;
    Ok(Json(ApiResponse::ok(rating)))
}

pub async fn update_rating(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRatingRequest>,
) -> AppResult<Json<ApiResponse<Rating>>> {
    authored(&state, &auth, id, false).await?;
    let rating = state.ratings.update_rating(id, req.rating, req.review).await?;
    Ok(Json(ApiResponse::ok(rating)))
}

pub async fn delete_rating(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Rating>>> {
    authored(&state, &auth, id, true).await?;
    let rating = state.ratings.delete_rating(id).await?;
    Ok(Json(ApiResponse::ok_with_message(rating, "rating deleted")))
}

/// Cached aggregate; `data` is null when the seller has no ratings.
pub async fn seller_rating(
    State(state): State<AppState>,
    Path(seller_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Option<SellerRatingView>>>> {
    let view = state
        .ratings
        .get_seller_rating(seller_id)
        .await
        .map(SellerRatingView::from);
    Ok(Json(ApiResponse::ok(view)))
}

pub async fn refresh_seller_rating(
    State(state): State<AppState>,
    Path(seller_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Option<SellerRatingView>>>> {
    let view = state
        .ratings
        .fetch_seller_ratings(seller_id)
        .await
        .map(SellerRatingView::from);
    Ok(Json(ApiResponse::ok(view)))
}

pub async fn my_rating_for_seller(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(seller_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Option<Rating>>>> {
    let rating = state.ratings.get_user_rating_for_seller(seller_id, auth.id).await;
    Ok(Json(ApiResponse::ok(rating)))
}
