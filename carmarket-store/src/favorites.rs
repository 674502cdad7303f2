//! Favorites holder: the persisted set of (user, car) bookmarks.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use carmarket_shared::AppResult;

use crate::activity::{Activity, HolderStatus};
use crate::models::Favorite;
use crate::storage::{load_state, save_state, StateStorage, FAVORITES_KEY};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct FavoritesState {
    favorites: Vec<Favorite>,
}

/// Result of [`FavoritesHolder::add`].
#[derive(Debug, Clone, Serialize)]
pub struct AddOutcome {
    pub favorite: Favorite,
    /// False when the relation already existed.
    pub created: bool,
}

#[derive(Clone)]
pub struct FavoritesHolder {
    state: Arc<RwLock<FavoritesState>>,
    storage: Arc<dyn StateStorage>,
    activity: Activity,
}

impl FavoritesHolder {
    pub fn new(storage: Arc<dyn StateStorage>) -> Self {
        Self {
            state: Arc::new(RwLock::new(FavoritesState::default())),
            storage,
            activity: Activity::default(),
        }
    }

    /// Replace the in-memory collection with the backend copy.
    pub async fn refresh(&self) -> AppResult<()> {
        let mut state = self.state.write().await;
        let _loading = self.activity.begin();

        let loaded = self
            .activity
            .track(load_state::<FavoritesState>(self.storage.as_ref(), FAVORITES_KEY).await)?;
        *state = loaded.unwrap_or_default();

        tracing::debug!(count = state.favorites.len(), "favorites refreshed");
        Ok(())
    }

    pub async fn add(&self, user_id: Uuid, car_id: Uuid) -> AppResult<AddOutcome> {
        let mut state = self.state.write().await;

        if let Some(existing) = state
            .favorites
            .iter()
            .find(|f| f.user_id == user_id && f.car_id == car_id)
        {
            return Ok(AddOutcome {
                favorite: existing.clone(),
                created: false,
            });
        }

        let favorite = Favorite {
            id: Uuid::new_v4(),
            user_id,
            car_id,
            created_at: Utc::now(),
        };

        let mut next = state.clone();
        next.favorites.push(favorite.clone());
        self.persist(&next).await?;
        *state = next;

        tracing::info!(user_id = %user_id, car_id = %car_id, "favorite added");
        Ok(AddOutcome {
            favorite,
            created: true,
        })
    }

    /// Remove every relation between `user_id` and `car_id`. Returns how many were dropped.
    pub async fn remove(&self, user_id: Uuid, car_id: Uuid) -> AppResult<usize> {
        let mut state = self.state.write().await;

        let mut next = state.clone();
        next.favorites.retain(|f| !(f.user_id == user_id && f.car_id == car_id));
        let removed = state.favorites.len() - next.favorites.len();
        if removed == 0 {
            return Ok(0);
        }

        self.persist(&next).await?;
        *state = next;

        tracing::info!(user_id = %user_id, car_id = %car_id, removed, "favorite removed");
        Ok(removed)
    }

    /// The user's favorites, newest first.
    pub async fn list(&self, user_id: Uuid) -> Vec<Favorite> {
        let state = self.state.read().await;
        let mut favorites: Vec<Favorite> = state
            .favorites
            .iter()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect();
        favorites.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        favorites
    }

    pub async fn list_all(&self) -> Vec<Favorite> {
        self.state.read().await.favorites.clone()
    }

    pub async fn is_favorite(&self, user_id: Uuid, car_id: Uuid) -> bool {
        self.state
            .read()
            .await
            .favorites
            .iter()
            .any(|f| f.user_id == user_id && f.car_id == car_id)
    }

    pub fn status(&self) -> HolderStatus {
        self.activity.status()
    }

    pub fn clear_error(&self) {
        self.activity.clear_error();
    }

    async fn persist(&self, next: &FavoritesState) -> AppResult<()> {
        let _loading = self.activity.begin();
        self.activity
            .track(save_state(self.storage.as_ref(), FAVORITES_KEY, next).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::testing::FlakyStorage;
    use crate::storage::MemoryStorage;

    fn holder() -> FavoritesHolder {
        FavoritesHolder::new(Arc::new(MemoryStorage::new()))
    }

    #[tokio::test]
    async fn add_then_remove_toggles_is_favorite() {
        let favorites = holder();
        let (user, car) = (Uuid::new_v4(), Uuid::new_v4());

        assert!(!favorites.is_favorite(user, car).await);
        favorites.add(user, car).await.unwrap();
        assert!(favorites.is_favorite(user, car).await);

        assert_eq!(favorites.remove(user, car).await.unwrap(), 1);
        assert!(!favorites.is_favorite(user, car).await);
    }

    #[tokio::test]
    async fn re_adding_returns_existing_relation() {
        let favorites = holder();
        let (user, car) = (Uuid::new_v4(), Uuid::new_v4());

        let first = favorites.add(user, car).await.unwrap();
        let second = favorites.add(user, car).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.favorite.id, second.favorite.id);
        assert_eq!(favorites.list_all().await.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_adds_produce_one_record() {
        let favorites = holder();
        let (user, car) = (Uuid::new_v4(), Uuid::new_v4());

        let (a, b) = tokio::join!(favorites.add(user, car), favorites.add(user, car));
        assert!(a.unwrap().created ^ b.unwrap().created);
        assert_eq!(favorites.list_all().await.len(), 1);
    }

    #[tokio::test]
    async fn removing_absent_relation_is_a_no_op() {
        let favorites = holder();
        assert_eq!(favorites.remove(Uuid::new_v4(), Uuid::new_v4()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn remove_only_touches_the_given_user() {
        let favorites = holder();
        let car = Uuid::new_v4();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        favorites.add(alice, car).await.unwrap();
        favorites.add(bob, car).await.unwrap();

        favorites.remove(alice, car).await.unwrap();
        assert!(!favorites.is_favorite(alice, car).await);
        assert!(favorites.is_favorite(bob, car).await);
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let favorites = holder();
        let user = Uuid::new_v4();
        let older = favorites.add(user, Uuid::new_v4()).await.unwrap().favorite;
        let newer = favorites.add(user, Uuid::new_v4()).await.unwrap().favorite;
        favorites.add(Uuid::new_v4(), Uuid::new_v4()).await.unwrap();

        let listed = favorites.list(user).await;
        assert_eq!(listed.len(), 2);
        assert!(listed[0].created_at >= listed[1].created_at);
        let ids: Vec<Uuid> = listed.iter().map(|f| f.id).collect();
        assert!(ids.contains(&older.id) && ids.contains(&newer.id));
    }

    #[tokio::test]
    async fn refresh_reloads_backend_copy() {
        let storage = Arc::new(MemoryStorage::new());
        let writer = FavoritesHolder::new(storage.clone());
        let (user, car) = (Uuid::new_v4(), Uuid::new_v4());
        writer.add(user, car).await.unwrap();

        let reader = FavoritesHolder::new(storage);
        assert!(!reader.is_favorite(user, car).await);
        reader.refresh().await.unwrap();
        assert!(reader.is_favorite(user, car).await);
    }

    #[tokio::test]
    async fn refresh_of_empty_backend_gives_empty_collection() {
        let favorites = holder();
        favorites.refresh().await.unwrap();
        assert!(favorites.list_all().await.is_empty());
        assert!(!favorites.status().is_loading);
    }

    #[tokio::test]
    async fn failed_save_leaves_memory_untouched() {
        let storage = FlakyStorage::default();
        let favorites = FavoritesHolder::new(Arc::new(storage.clone()));
        let (user, car) = (Uuid::new_v4(), Uuid::new_v4());
        favorites.add(user, car).await.unwrap();

        storage.fail_writes(true);
        assert!(favorites.add(user, Uuid::new_v4()).await.is_err());
        assert!(favorites.remove(user, car).await.is_err());

        assert_eq!(favorites.list_all().await.len(), 1);
        assert!(favorites.is_favorite(user, car).await);

        let status = favorites.status();
        assert!(!status.is_loading);
        assert_eq!(status.error.as_deref(), Some("backend offline"));

        favorites.clear_error();
        assert!(favorites.status().error.is_none());
    }
}
