//! Seller ratings and the per-seller aggregate cache.
//!
//! Raw ratings are persisted as a flat list under [`RATINGS_KEY`]. In memory
//! they are indexed by seller so recomputing one seller's aggregate never
//! scans the others. Aggregates themselves are derived and rebuilt on
//! [`RatingsHolder::hydrate`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use carmarket_shared::{AppError, AppResult, ErrorCode};

use crate::models::{Rating, SellerRating, MAX_STARS, MIN_STARS};
use crate::storage::{load_state, save_state, StateStorage, RATINGS_KEY};

/// When the cached aggregate is rebuilt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregatePolicy {
    /// Every write recomputes the affected seller.
    #[default]
    RecomputeOnWrite,
    /// Only new ratings recompute. Updates and deletes mark the cached
    /// aggregate stale until `fetch_seller_ratings` runs.
    Explicit,
}

#[derive(Serialize, Deserialize, Default)]
struct PersistedRatings {
    ratings: Vec<Rating>,
}

#[derive(Default, Clone)]
struct RatingsState {
    by_seller: HashMap<Uuid, Vec<Rating>>,
    /// rating id -> seller id
    owners: HashMap<Uuid, Uuid>,
    aggregates: HashMap<Uuid, SellerRating>,
}

impl RatingsState {
    fn from_ratings(ratings: Vec<Rating>) -> Self {
        let mut state = Self::default();
        for rating in ratings {
            state.owners.insert(rating.id, rating.seller_id);
            state.by_seller.entry(rating.seller_id).or_default().push(rating);
        }
        let sellers: Vec<Uuid> = state.by_seller.keys().copied().collect();
        for seller_id in sellers {
            state.recompute(seller_id);
        }
        state
    }

    /// Flat list with `seller_id`'s ratings replaced by `replacement`.
    fn flatten_with(&self, seller_id: Uuid, replacement: &[Rating]) -> PersistedRatings {
        let mut ratings: Vec<Rating> = self
            .by_seller
            .iter()
            .filter(|(id, _)| **id != seller_id)
            .flat_map(|(_, list)| list.iter().cloned())
            .collect();
        ratings.extend(replacement.iter().cloned());
        ratings.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        PersistedRatings { ratings }
    }

    fn recompute(&mut self, seller_id: Uuid) -> Option<SellerRating> {
        match self.by_seller.get(&seller_id).and_then(|r| aggregate(seller_id, r)) {
            Some(summary) => {
                self.aggregates.insert(seller_id, summary.clone());
                Some(summary)
            }
            None => {
                self.aggregates.remove(&seller_id);
                None
            }
        }
    }

    fn mark_stale(&mut self, seller_id: Uuid) {
        if let Some(summary) = self.aggregates.get_mut(&seller_id) {
            summary.stale = true;
        }
    }
}

/// Mean rounded to one decimal, count and star histogram. `None` without ratings.
fn aggregate(seller_id: Uuid, ratings: &[Rating]) -> Option<SellerRating> {
    if ratings.is_empty() {
        return None;
    }

    let mut distribution = [0u32; 5];
    let mut sum = 0u32;
    for r in ratings {
        distribution[usize::from(r.rating.clamp(MIN_STARS, MAX_STARS) - 1)] += 1;
        sum += u32::from(r.rating);
    }
    let total = ratings.len() as u32;
    let mean = f64::from(sum) / f64::from(total);

    Some(SellerRating {
        seller_id,
        average_rating: (mean * 10.0).round() / 10.0,
        total_ratings: total,
        distribution,
        ratings: ratings.to_vec(),
        stale: false,
        computed_at: Utc::now(),
    })
}

fn check_range(rating: u8) -> AppResult<()> {
    if !(MIN_STARS..=MAX_STARS).contains(&rating) {
        return Err(AppError::new(
            ErrorCode::RatingOutOfRange,
            format!("rating must be between {MIN_STARS} and {MAX_STARS}"),
        ));
    }
    Ok(())
}

fn not_found(rating_id: Uuid) -> AppError {
    AppError::new(ErrorCode::RatingNotFound, format!("rating {rating_id} not found"))
}

#[derive(Clone)]
pub struct RatingsHolder {
    state: Arc<RwLock<RatingsState>>,
    storage: Arc<dyn StateStorage>,
    policy: AggregatePolicy,
}

impl RatingsHolder {
    pub fn new(storage: Arc<dyn StateStorage>, policy: AggregatePolicy) -> Self {
        Self {
            state: Arc::new(RwLock::new(RatingsState::default())),
            storage,
            policy,
        }
    }

    /// Load persisted ratings and rebuild every aggregate.
    pub async fn hydrate(&self) -> AppResult<()> {
        let mut state = self.state.write().await;
        let persisted = load_state::<PersistedRatings>(self.storage.as_ref(), RATINGS_KEY)
            .await?
            .unwrap_or_default();
        *state = RatingsState::from_ratings(persisted.ratings);
        tracing::debug!(sellers = state.by_seller.len(), "ratings hydrated");
        Ok(())
    }

    pub async fn rate_seller(
        &self,
        user_id: Uuid,
        seller_id: Uuid,
        rating: u8,
        review: Option<String>,
    ) -> AppResult<Rating> {
        check_range(rating)?;
        if user_id == seller_id {
            return Err(AppError::new(ErrorCode::CannotRateSelf, "you cannot rate yourself"));
        }

        let now = Utc::now();
        let new_rating = Rating {
            id: Uuid::new_v4(),
            user_id,
            seller_id,
            rating,
            review,
            created_at: now,
            updated_at: now,
        };

        let mut state = self.state.write().await;
        let mut list = state.by_seller.get(&seller_id).cloned().unwrap_or_default();
        list.push(new_rating.clone());
        self.persist(&state.flatten_with(seller_id, &list)).await?;

        state.owners.insert(new_rating.id, seller_id);
        state.by_seller.insert(seller_id, list);
        state.recompute(seller_id);

        tracing::info!(rating_id = %new_rating.id, seller_id = %seller_id, stars = rating, "seller rated");
        Ok(new_rating)
    }

    pub async fn update_rating(
        &self,
        rating_id: Uuid,
        rating: u8,
        review: Option<String>,
    ) -> AppResult<Rating> {
        check_range(rating)?;

        let mut state = self.state.write().await;
        let seller_id = *state.owners.get(&rating_id).ok_or_else(|| not_found(rating_id))?;

        let mut list = state.by_seller.get(&seller_id).cloned().unwrap_or_default();
        let target = list
            .iter_mut()
            .find(|r| r.id == rating_id)
            .ok_or_else(|| not_found(rating_id))?;
        target.rating = rating;
        target.review = review;
        target.updated_at = Utc::now();
        let updated = target.clone();

        self.persist(&state.flatten_with(seller_id, &list)).await?;
        state.by_seller.insert(seller_id, list);
        self.after_change(&mut state, seller_id);

        tracing::info!(rating_id = %rating_id, seller_id = %seller_id, stars = rating, "rating updated");
        Ok(updated)
    }

    pub async fn delete_rating(&self, rating_id: Uuid) -> AppResult<Rating> {
        let mut state = self.state.write().await;
        let seller_id = *state.owners.get(&rating_id).ok_or_else(|| not_found(rating_id))?;

        let mut list = state.by_seller.get(&seller_id).cloned().unwrap_or_default();
        let pos = list
            .iter()
            .position(|r| r.id == rating_id)
            .ok_or_else(|| not_found(rating_id))?;
        let removed = list.remove(pos);

        self.persist(&state.flatten_with(seller_id, &list)).await?;
        state.owners.remove(&rating_id);
        if list.is_empty() {
            state.by_seller.remove(&seller_id);
        } else {
            state.by_seller.insert(seller_id, list);
        }
        self.after_change(&mut state, seller_id);

        tracing::info!(rating_id = %rating_id, seller_id = %seller_id, "rating deleted");
        Ok(removed)
    }

    pub async fn get_rating(&self, rating_id: Uuid) -> Option<Rating> {
        let state = self.state.read().await;
        let seller_id = state.owners.get(&rating_id)?;
        state
            .by_seller
            .get(seller_id)?
            .iter()
            .find(|r| r.id == rating_id)
            .cloned()
    }

    /// Cached aggregate. May be stale under [`AggregatePolicy::Explicit`].
    pub async fn get_seller_rating(&self, seller_id: Uuid) -> Option<SellerRating> {
        self.state.read().await.aggregates.get(&seller_id).cloned()
    }

    pub async fn get_user_rating_for_seller(&self, seller_id: Uuid, user_id: Uuid) -> Option<Rating> {
        self.state
            .read()
            .await
            .by_seller
            .get(&seller_id)?
            .iter()
            .find(|r| r.user_id == user_id)
            .cloned()
    }

    /// Recompute and cache the seller's aggregate.
    pub async fn fetch_seller_ratings(&self, seller_id: Uuid) -> Option<SellerRating> {
        let mut state = self.state.write().await;
        state.recompute(seller_id)
    }

    fn after_change(&self, state: &mut RatingsState, seller_id: Uuid) {
        match self.policy {
            AggregatePolicy::RecomputeOnWrite => {
                state.recompute(seller_id);
            }
            AggregatePolicy::Explicit => state.mark_stale(seller_id),
        }
    }

    async fn persist(&self, ratings: &PersistedRatings) -> AppResult<()> {
        save_state(self.storage.as_ref(), RATINGS_KEY, ratings).await
    }
}
