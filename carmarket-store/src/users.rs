//! User directory: accounts, credentials and the admin user listing.

use std::collections::HashMap;
use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use carmarket_shared::types::auth::UserRole;
use carmarket_shared::{AppError, AppResult, ErrorCode, Paginated, PaginationParams};

use crate::models::{User, UserPatch};
use crate::validation::{validate_form, RegisterForm};

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::internal(format!("invalid password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    pub role: Option<UserRole>,
    pub verified: Option<bool>,
    /// Case-insensitive match on name or email.
    pub search: Option<String>,
}

impl UserFilter {
    fn matches(&self, user: &User) -> bool {
        if user.role == UserRole::Admin {
            return false;
        }
        if self.role.is_some_and(|r| user.role != r) {
            return false;
        }
        if self.verified.is_some_and(|v| user.is_verified != v) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                user.name.to_lowercase().contains(&term) || user.email.contains(&term)
            }
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct UserStats {
    pub total: usize,
    pub sellers: usize,
    pub buyers: usize,
    pub verified: usize,
}

struct Account {
    user: User,
    password_hash: String,
}

#[derive(Default)]
struct DirectoryState {
    accounts: HashMap<Uuid, Account>,
    by_email: HashMap<String, Uuid>,
}

impl DirectoryState {
    fn user_mut(&mut self, id: Uuid) -> AppResult<&mut User> {
        self.accounts
            .get_mut(&id)
            .map(|a| &mut a.user)
            .ok_or_else(|| user_not_found(id))
    }

    fn insert(&mut self, user: User, password_hash: String) -> AppResult<User> {
        if self.by_email.contains_key(&user.email) {
            return Err(AppError::new(ErrorCode::EmailAlreadyExists, "email already registered"));
        }
        self.by_email.insert(user.email.clone(), user.id);
        self.accounts.insert(
            user.id,
            Account {
                user: user.clone(),
                password_hash,
            },
        );
        Ok(user)
    }
}

fn user_not_found(id: Uuid) -> AppError {
    AppError::new(ErrorCode::UserNotFound, format!("user {id} not found"))
}

#[derive(Clone, Default)]
pub struct UserDirectory {
    state: Arc<RwLock<DirectoryState>>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sign up a buyer or seller account.
    pub async fn register(&self, form: RegisterForm) -> AppResult<User> {
        validate_form(&form)?;
        let role = form.role.unwrap_or(UserRole::Buyer);
        if role == UserRole::Admin {
            return Err(AppError::Validation("role must be buyer or seller".into()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: form.email.trim().to_lowercase(),
            name: form.name.trim().to_string(),
            role,
            phone: form
                .phone
                .map(|p| p.chars().filter(|c| !c.is_whitespace()).collect()),
            avatar: None,
            is_verified: false,
            created_at: now,
            updated_at: now,
        };
        let password_hash = hash_password(&form.password)?;

        let user = self.state.write().await.insert(user, password_hash)?;
        tracing::info!(user_id = %user.id, role = %user.role, "user registered");
        Ok(user)
    }

    /// Add an account with a known password, used for bootstrap and demo users.
    pub async fn insert_seeded(&self, mut user: User, password: &str) -> AppResult<User> {
        user.email = user.email.to_lowercase();
        let password_hash = hash_password(password)?;
        self.state.write().await.insert(user, password_hash)
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<User> {
        let invalid = || AppError::new(ErrorCode::InvalidCredentials, "invalid email or password");

        let state = self.state.read().await;
        let account = state
            .by_email
            .get(&email.trim().to_lowercase())
            .and_then(|id| state.accounts.get(id))
            .ok_or_else(invalid)?;

        if !verify_password(password, &account.password_hash)? {
            tracing::debug!(user_id = %account.user.id, "password mismatch");
            return Err(invalid());
        }
        Ok(account.user.clone())
    }

    pub async fn get(&self, id: Uuid) -> AppResult<User> {
        self.state
            .read()
            .await
            .accounts
            .get(&id)
            .map(|a| a.user.clone())
            .ok_or_else(|| user_not_found(id))
    }

    pub async fn update_profile(&self, id: Uuid, patch: UserPatch) -> AppResult<User> {
        validate_form(&patch)?;
        let mut state = self.state.write().await;
        let user = state.user_mut(id)?;
        user.apply(patch);
        tracing::info!(user_id = %id, "profile updated");
        Ok(user.clone())
    }

    pub async fn set_verified(&self, id: Uuid, verified: bool) -> AppResult<User> {
        let mut state = self.state.write().await;
        let user = state.user_mut(id)?;
        user.is_verified = verified;
        user.updated_at = Utc::now();
        tracing::info!(user_id = %id, verified, "verification changed");
        Ok(user.clone())
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<User> {
        let mut state = self.state.write().await;
        let account = state.accounts.get(&id).ok_or_else(|| user_not_found(id))?;
        if account.user.role == UserRole::Admin {
            return Err(AppError::forbidden("admin accounts cannot be deleted"));
        }
        let account = state.accounts.remove(&id).ok_or_else(|| user_not_found(id))?;
        state.by_email.remove(&account.user.email);
        tracing::info!(user_id = %id, "user deleted");
        Ok(account.user)
    }

    /// Non-admin users matching `filter`, newest first.
    pub async fn list(&self, filter: &UserFilter, params: &PaginationParams) -> Paginated<User> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state
            .accounts
            .values()
            .map(|a| &a.user)
            .filter(|u| filter.matches(u))
            .cloned()
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.email.cmp(&b.email)));
        params.paginate(&users)
    }

    pub async fn stats(&self) -> UserStats {
        let state = self.state.read().await;
        let mut stats = UserStats::default();
        for user in state.accounts.values().map(|a| &a.user) {
            match user.role {
                UserRole::Admin => continue,
                UserRole::Seller => stats.sellers += 1,
                UserRole::Buyer => stats.buyers += 1,
            }
            stats.total += 1;
            if user.is_verified {
                stats.verified += 1;
            }
        }
        stats
    }
}
