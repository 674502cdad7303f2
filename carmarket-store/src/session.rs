use std::sync::Arc;

use tokio::sync::RwLock;

use carmarket_shared::{AppError, AppResult};

use crate::models::{User, UserPatch};
use crate::validation::validate_form;

#[derive(Default)]
struct SessionState {
    user: Option<User>,
    token: Option<String>,
}

/// The signed-in user and their access token.
#[derive(Clone, Default)]
pub struct SessionHolder {
    state: Arc<RwLock<SessionState>>,
}

impl SessionHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn login(&self, user: User, token: String) {
        let mut state = self.state.write().await;
        tracing::debug!(user_id = %user.id, "session started");
        state.user = Some(user);
        state.token = Some(token);
    }

    pub async fn logout(&self) {
        let mut state = self.state.write().await;
        state.user = None;
        state.token = None;
    }

    pub async fn update_user(&self, patch: UserPatch) -> AppResult<User> {
        validate_form(&patch)?;
        let mut state = self.state.write().await;
        let user = state
            .user
            .as_mut()
            .ok_or_else(|| AppError::unauthorized("no user is signed in"))?;
        user.apply(patch);
        Ok(user.clone())
    }

    pub async fn current_user(&self) -> Option<User> {
        self.state.read().await.user.clone()
    }

    pub async fn token(&self) -> Option<String> {
        self.state.read().await.token.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        let state = self.state.read().await;
        state.user.is_some() && state.token.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carmarket_shared::types::auth::UserRole;
    use carmarket_shared::ErrorCode;
    use chrono::Utc;
    use uuid::Uuid;

    fn user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "buyer@example.com".into(),
            name: "Le Van C".into(),
            role: UserRole::Buyer,
            phone: None,
            avatar: None,
            is_verified: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn login_and_logout() {
        let session = SessionHolder::new();
        assert!(!session.is_authenticated().await);

        session.login(user(), "jwt".into()).await;
        assert!(session.is_authenticated().await);
        assert_eq!(session.token().await.as_deref(), Some("jwt"));

        session.logout().await;
        assert!(!session.is_authenticated().await);
        assert!(session.current_user().await.is_none());
    }

    #[tokio::test]
    async fn update_requires_signed_in_user() {
        let session = SessionHolder::new();
        let err = session.update_user(UserPatch::default()).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::Unauthorized));

        session.login(user(), "jwt".into()).await;
        let updated = session
            .update_user(UserPatch { name: Some("  Le Van D ".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(updated.name, "Le Van D");
        assert_eq!(session.current_user().await.unwrap().name, "Le Van D");
    }

    #[tokio::test]
    async fn update_rejects_invalid_profile_fields() {
        let session = SessionHolder::new();
        session.login(user(), "jwt".into()).await;

        let err = session
            .update_user(UserPatch { phone: Some("12345".into()), ..Default::default() })
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::ValidationError));

        let err = session
            .update_user(UserPatch { name: Some(" A ".into()), ..Default::default() })
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::ValidationError));

        let current = session.current_user().await.unwrap();
        assert_eq!(current.name, "Le Van C");
        assert!(current.phone.is_none());
    }
}
