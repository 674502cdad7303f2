use axum::extract::State;
use axum::Json;
use serde::Serialize;

use carmarket_shared::types::auth::{AccessToken, AuthUser};
use carmarket_shared::{ApiResponse, AppResult};
use carmarket_store::models::{User, UserPatch};
use carmarket_store::validation::{validate_form, LoginForm, RegisterForm};

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: AccessToken,
}

fn issue(state: &AppState, user: User) -> AppResult<AuthResponse> {
    let ttl = state.config.jwt_access_ttl;
    let access_token = state.jwt.sign(user.id, user.role, ttl)?;
    Ok(AuthResponse {
        user,
        token: AccessToken::bearer(access_token, ttl),
    })
}

pub async fn register(
    State(state): State<AppState>,
    Json(form): Json<RegisterForm>,
) -> AppResult<Json<ApiResponse<AuthResponse>>> {
    let user = state.users.register(form).await?;
    Ok(Json(ApiResponse::ok_with_message(
        issue(&state, user)?,
        "account created",
    )))
}

pub async fn login(
    State(state): State<AppState>,
    Json(form): Json<LoginForm>,
) -> AppResult<Json<ApiResponse<AuthResponse>>> {
    validate_form(&form)?;
    let user = state.users.authenticate(&form.email, &form.password).await?;
    tracing::info!(user_id = %user.id, "user logged in");
    Ok(Json(ApiResponse::ok(issue(&state, user)?)))
}

pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<ApiResponse<User>>> {
    let user = state.users.get(auth.id).await?;
    Ok(Json(ApiResponse::ok(user)))
}

pub async fn update_me(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(patch): Json<UserPatch>,
) -> AppResult<Json<ApiResponse<User>>> {
    let user = state.users.update_profile(auth.id, patch).await?;
    Ok(Json(ApiResponse::ok(user)))
}
