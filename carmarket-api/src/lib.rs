pub mod config;
pub mod routes;

use std::sync::Arc;

use axum::extract::FromRef;
use axum::routing::{get, patch, post, put};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use carmarket_shared::clients::redis::RedisClient;
use carmarket_shared::middleware::{metrics_middleware, JwtSecret};
use carmarket_store::{
    seed, CatalogHolder, FavoritesHolder, MemoryStorage, RatingsHolder, RedisStorage,
    ReportsHolder, StateStorage, UserDirectory,
};

use crate::config::AppConfig;

pub const SERVICE_NAME: &str = "carmarket-api";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub jwt: JwtSecret,
    pub storage: Arc<dyn StateStorage>,
    pub users: UserDirectory,
    pub catalog: CatalogHolder,
    pub favorites: FavoritesHolder,
    pub ratings: RatingsHolder,
    pub reports: ReportsHolder,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl FromRef<AppState> for JwtSecret {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

impl AppState {
    /// Connect the configured backend, then hydrate and seed the holders.
    pub async fn build(config: AppConfig) -> anyhow::Result<Self> {
        let storage: Arc<dyn StateStorage> = match &config.redis_url {
            Some(url) => Arc::new(RedisStorage::new(RedisClient::connect(url, "carmarket").await?)),
            None => {
                tracing::warn!("no redis_url configured, holder state will not survive restarts");
                Arc::new(MemoryStorage::new())
            }
        };
        Self::with_storage(config, storage).await
    }

    pub async fn with_storage(config: AppConfig, storage: Arc<dyn StateStorage>) -> anyhow::Result<Self> {
        let favorites = FavoritesHolder::new(storage.clone());
        let ratings = RatingsHolder::new(storage.clone(), config.aggregate_policy);
        let reports = ReportsHolder::new(storage.clone());
        favorites.refresh().await?;
        ratings.hydrate().await?;
        reports.hydrate().await?;

        let users = UserDirectory::new();
        let catalog = CatalogHolder::new();
        seed::seed_admin(&users, &config.admin_email, &config.admin_password).await?;
        if config.seed_demo_data {
            seed::seed_demo(&users, &catalog).await?;
        }

        tracing::info!(
            backend = storage.name(),
            policy = ?config.aggregate_policy,
            "holders ready"
        );

        Ok(Self {
            jwt: JwtSecret::new(config.jwt_secret.as_str()),
            config: Arc::new(config),
            storage,
            users,
            catalog,
            favorites,
            ratings,
            reports,
            metrics_handle: None,
        })
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}

pub fn build_router(state: AppState) -> Router {
    use routes::{admin, auth, cars, favorites, health, ratings, reports};

    let admin_routes = Router::new()
        .route("/reports", get(admin::list_reports))
        .route("/reports/:id", get(admin::get_report))
        .route("/reports/:id/status", put(admin::update_report_status))
        .route("/users", get(admin::list_users))
        .route("/users/:id", axum::routing::delete(admin::delete_user))
        .route("/users/:id/reports", get(admin::user_reports))
        .route("/users/:id/verify", patch(admin::verify_user))
        .route("/cars", get(admin::list_cars))
        .route("/cars/:id/approve", patch(admin::approve_car))
        .route("/cars/:id/reject", patch(admin::reject_car))
        .route("/stats", get(admin::get_stats));

    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me).patch(auth::update_me))
        .route("/cars", get(cars::list_cars).post(cars::create_car))
        .route(
            "/cars/:id",
            get(cars::get_car).put(cars::update_car).delete(cars::delete_car),
        )
        .route("/cars/:id/sold", patch(cars::mark_sold))
        .route("/favorites", get(favorites::list_favorites))
        .route(
            "/favorites/:car_id",
            get(favorites::is_favorite)
                .post(favorites::add_favorite)
                .delete(favorites::remove_favorite),
        )
        .route("/ratings", post(ratings::rate_seller))
        .route(
            "/ratings/:id",
            put(ratings::update_rating).delete(ratings::delete_rating),
        )
        .route("/sellers/:id/rating", get(ratings::seller_rating))
        .route("/sellers/:id/rating/refresh", post(ratings::refresh_seller_rating))
        .route("/sellers/:id/rating/mine", get(ratings::my_rating_for_seller))
        .route("/reports", post(reports::submit_report))
        .route("/reports/reasons", get(reports::report_reasons))
        .route("/reports/mine", get(reports::my_reports))
        .nest("/admin", admin_routes)
        .route_layer(axum::middleware::from_fn(metrics_middleware))
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
