//! Car catalog holder.
//!
//! Transient: the listing collection is seeded at startup and lives only in
//! memory. The filter bag mirrors what the browse page last applied and is
//! independent of the list itself; queries go through [`CatalogHolder::search`].

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use carmarket_shared::{AppError, AppResult, ErrorCode, Paginated, PaginationParams};

use crate::models::{Car, CarPatch, CarStatus, Condition, FuelType, SellerType, Transmission, User};
use crate::validation::{validate_form, CarForm};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    Price,
    Year,
    Mileage,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Browse filters. Every field is optional; set fields are ANDed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CarFilters {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
    pub min_mileage: Option<u32>,
    pub max_mileage: Option<u32>,
    pub fuel_type: Option<FuelType>,
    pub transmission: Option<Transmission>,
    pub location: Option<String>,
    pub condition: Option<Condition>,
    /// Comma-separated features a listing must all have.
    pub features: Option<String>,
    pub status: Option<CarStatus>,
    pub sort_by: Option<SortBy>,
    pub sort_order: Option<SortOrder>,
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

impl CarFilters {
    /// Overlay the set fields of `other` onto `self`.
    pub fn merge(&mut self, other: CarFilters) {
        macro_rules! overlay {
            ($($field:ident),*) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        overlay!(
            brand, model, min_price, max_price, min_year, max_year, min_mileage, max_mileage,
            fuel_type, transmission, location, condition, features, status, sort_by, sort_order
        );
    }

    fn required_features(&self) -> Vec<&str> {
        self.features
            .as_deref()
            .map(|f| f.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }

    pub fn matches(&self, car: &Car) -> bool {
        if let Some(brand) = &self.brand {
            if !eq_ignore_case(&car.brand, brand) {
                return false;
            }
        }
        if let Some(model) = &self.model {
            if !eq_ignore_case(&car.model, model) {
                return false;
            }
        }
        if self.min_price.is_some_and(|min| car.price < min)
            || self.max_price.is_some_and(|max| car.price > max)
            || self.min_year.is_some_and(|min| car.year < min)
            || self.max_year.is_some_and(|max| car.year > max)
            || self.min_mileage.is_some_and(|min| car.mileage < min)
            || self.max_mileage.is_some_and(|max| car.mileage > max)
        {
            return false;
        }
        if self.fuel_type.is_some_and(|f| car.fuel_type != f)
            || self.transmission.is_some_and(|t| car.transmission != t)
            || self.condition.is_some_and(|c| car.condition != c)
            || self.status.is_some_and(|s| car.status != s)
        {
            return false;
        }
        if let Some(location) = &self.location {
            if !car.location.to_lowercase().contains(&location.trim().to_lowercase()) {
                return false;
            }
        }
        self.required_features()
            .iter()
            .all(|f| car.features.iter().any(|have| have.eq_ignore_ascii_case(f)))
    }

    fn compare(&self, a: &Car, b: &Car) -> Ordering {
        let ord = match self.sort_by.unwrap_or(SortBy::CreatedAt) {
            SortBy::Price => a.price.cmp(&b.price),
            SortBy::Year => a.year.cmp(&b.year),
            SortBy::Mileage => a.mileage.cmp(&b.mileage),
            SortBy::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        match self.sort_order.unwrap_or(SortOrder::Desc) {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CatalogSnapshot {
    pub cars: Vec<Car>,
    pub filters: CarFilters,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CatalogStats {
    pub total: usize,
    pub by_status: BTreeMap<&'static str, usize>,
}

#[derive(Default)]
struct CatalogState {
    cars: Vec<Car>,
    selected: Option<Car>,
    filters: CarFilters,
    loading: bool,
    error: Option<String>,
}

fn car_not_found(id: Uuid) -> AppError {
    AppError::new(ErrorCode::CarNotFound, format!("car {id} not found"))
}

#[derive(Clone, Default)]
pub struct CatalogHolder {
    state: Arc<RwLock<CatalogState>>,
}

impl CatalogHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_cars(&self, cars: Vec<Car>) {
        self.state.write().await.cars = cars;
    }

    pub async fn add_car(&self, car: Car) {
        tracing::debug!(car_id = %car.id, "car added to catalog");
        self.state.write().await.cars.push(car);
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Car> {
        self.state
            .read()
            .await
            .cars
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| car_not_found(id))
    }

    /// Apply a seller edit. The edited listing must still pass car validation.
    pub async fn update_car(&self, id: Uuid, patch: CarPatch) -> AppResult<Car> {
        let mut state = self.state.write().await;
        let car = state
            .cars
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| car_not_found(id))?;

        let mut next = car.clone();
        next.apply(patch);
        validate_form(&CarForm::from(&next))?;
        *car = next.clone();

        if state.selected.as_ref().is_some_and(|s| s.id == id) {
            state.selected = Some(next.clone());
        }
        tracing::info!(car_id = %id, "car updated");
        Ok(next)
    }

    pub async fn delete_car(&self, id: Uuid) -> AppResult<Car> {
        let mut state = self.state.write().await;
        let pos = state
            .cars
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| car_not_found(id))?;
        let removed = state.cars.remove(pos);
        if state.selected.as_ref().is_some_and(|s| s.id == id) {
            state.selected = None;
        }
        tracing::info!(car_id = %id, "car deleted");
        Ok(removed)
    }

    pub async fn set_selected_car(&self, car: Option<Car>) {
        self.state.write().await.selected = car;
    }

    pub async fn selected_car(&self) -> Option<Car> {
        self.state.read().await.selected.clone()
    }

    pub async fn set_loading(&self, loading: bool) {
        self.state.write().await.loading = loading;
    }

    pub async fn set_error(&self, error: Option<String>) {
        self.state.write().await.error = error;
    }

    pub async fn set_filters(&self, partial: CarFilters) {
        self.state.write().await.filters.merge(partial);
    }

    pub async fn clear_filters(&self) {
        self.state.write().await.filters = CarFilters::default();
    }

    pub async fn filters(&self) -> CarFilters {
        self.state.read().await.filters.clone()
    }

    pub async fn snapshot(&self) -> CatalogSnapshot {
        let state = self.state.read().await;
        CatalogSnapshot {
            cars: state.cars.clone(),
            filters: state.filters.clone(),
            loading: state.loading,
            error: state.error.clone(),
        }
    }

    /// Filter, sort and page over every listing regardless of status,
    /// unless `filters.status` narrows it.
    pub async fn search(&self, filters: &CarFilters, params: &PaginationParams) -> Paginated<Car> {
        self.query(filters, params, |_| true).await
    }

    /// Like [`search`](Self::search) but without a status filter only
    /// approved and active listings are returned.
    pub async fn browse(&self, filters: &CarFilters, params: &PaginationParams) -> Paginated<Car> {
        let restrict = filters.status.is_none();
        self.query(filters, params, |car| !restrict || car.status.is_public())
            .await
    }

    async fn query(
        &self,
        filters: &CarFilters,
        params: &PaginationParams,
        visible: impl Fn(&Car) -> bool,
    ) -> Paginated<Car> {
        let state = self.state.read().await;
        let mut cars: Vec<Car> = state
            .cars
            .iter()
            .filter(|c| visible(c) && filters.matches(c))
            .cloned()
            .collect();
        cars.sort_by(|a, b| filters.compare(a, b));
        params.paginate(&cars)
    }

    /// Create a `pending` listing owned by `seller`.
    pub async fn create_listing(&self, seller: &User, form: CarForm) -> AppResult<Car> {
        validate_form(&form)?;

        let now = Utc::now();
        let car = Car {
            id: Uuid::new_v4(),
            title: form.title.trim().to_string(),
            brand: form.brand.trim().to_string(),
            model: form.model.trim().to_string(),
            year: form.year,
            price: form.price,
            mileage: form.mileage,
            fuel_type: form.fuel_type,
            transmission: form.transmission,
            color: form.color,
            description: form.description.trim().to_string(),
            images: form.images,
            seller_id: seller.id,
            seller_name: seller.name.clone(),
            seller_phone: seller.phone.clone(),
            seller_type: Some(form.seller_type.unwrap_or(SellerType::Individual)),
            location: form.location.trim().to_string(),
            status: CarStatus::Pending,
            features: form.features,
            condition: form.condition,
            views: 0,
            favorites: 0,
            created_at: now,
            updated_at: now,
        };

        self.state.write().await.cars.push(car.clone());
        tracing::info!(car_id = %car.id, seller_id = %seller.id, "listing created");
        Ok(car)
    }

    pub async fn approve(&self, id: Uuid) -> AppResult<Car> {
        self.transition(id, CarStatus::Approved, |s| s == CarStatus::Pending).await
    }

    pub async fn reject(&self, id: Uuid) -> AppResult<Car> {
        self.transition(id, CarStatus::Rejected, |s| s == CarStatus::Pending).await
    }

    /// Only listings currently on sale can be marked sold.
    pub async fn mark_sold(&self, id: Uuid) -> AppResult<Car> {
        self.transition(id, CarStatus::Sold, CarStatus::is_public).await
    }

    async fn transition(
        &self,
        id: Uuid,
        to: CarStatus,
        allowed_from: impl Fn(CarStatus) -> bool,
    ) -> AppResult<Car> {
        self.modify(id, |car| {
            if !allowed_from(car.status) {
                return Err(AppError::new(
                    ErrorCode::InvalidStatusTransition,
                    format!("cannot move listing from {} to {}", car.status.as_str(), to.as_str()),
                ));
            }
            tracing::info!(car_id = %car.id, from = car.status.as_str(), to = to.as_str(), "listing status changed");
            car.status = to;
            car.updated_at = Utc::now();
            Ok(())
        })
        .await
    }

    pub async fn record_view(&self, id: Uuid) -> AppResult<Car> {
        self.modify(id, |car| {
            car.views += 1;
            Ok(())
        })
        .await
    }

    /// Shift the favorite counter by `delta`, never below zero.
    pub async fn adjust_favorites(&self, id: Uuid, delta: i64) -> AppResult<Car> {
        self.modify(id, |car| {
            car.favorites = car.favorites.saturating_add_signed(delta);
            Ok(())
        })
        .await
    }

    pub async fn stats(&self) -> CatalogStats {
        let state = self.state.read().await;
        let mut by_status = BTreeMap::new();
        for car in &state.cars {
            *by_status.entry(car.status.as_str()).or_insert(0) += 1;
        }
        CatalogStats {
            total: state.cars.len(),
            by_status,
        }
    }

    async fn modify(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut Car) -> AppResult<()>,
    ) -> AppResult<Car> {
        let mut state = self.state.write().await;
        let car = state
            .cars
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| car_not_found(id))?;
        f(car)?;
        Ok(car.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carmarket_shared::types::auth::UserRole;
    use chrono::Duration;
    use std::collections::BTreeSet;

    fn seller() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "seller@example.com".into(),
            name: "Tran Thi B".into(),
            role: UserRole::Seller,
            phone: Some("0912345678".into()),
            avatar: None,
            is_verified: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn form() -> CarForm {
        CarForm {
            title: "Honda CR-V L 2021 bản cao cấp".into(),
            brand: "Honda".into(),
            model: "CR-V".into(),
            year: 2021,
            price: 900_000_000,
            mileage: 40_000,
            fuel_type: FuelType::Gasoline,
            transmission: Transmission::Automatic,
            color: "black".into(),
            description: "Family car, garage kept, regular maintenance, original paint throughout.".into(),
            images: vec!["https://img.example.com/crv.jpg".into()],
            location: "TP. Hồ Chí Minh".into(),
            features: BTreeSet::from(["sunroof".to_string(), "camera".to_string()]),
            condition: Condition::Used,
            seller_type: None,
        }
    }

    fn car(brand: &str, price: u64, year: i32, status: CarStatus, age_days: i64) -> Car {
        let created = Utc::now() - Duration::days(age_days);
        Car {
            id: Uuid::new_v4(),
            title: format!("{brand} test listing"),
            brand: brand.into(),
            model: "X".into(),
            year,
            price,
            mileage: 10_000,
            fuel_type: FuelType::Gasoline,
            transmission: Transmission::Manual,
            color: "red".into(),
            description: String::new(),
            images: vec![],
            seller_id: Uuid::new_v4(),
            seller_name: "s".into(),
            seller_phone: None,
            seller_type: None,
            location: "Hà Nội".into(),
            status,
            features: BTreeSet::new(),
            condition: Condition::Used,
            views: 0,
            favorites: 0,
            created_at: created,
            updated_at: created,
        }
    }

    #[tokio::test]
    async fn new_listing_is_pending_and_owned() {
        let catalog = CatalogHolder::new();
        let seller = seller();
        let car = catalog.create_listing(&seller, form()).await.unwrap();

        assert_eq!(car.status, CarStatus::Pending);
        assert_eq!(car.seller_id, seller.id);
        assert_eq!(car.seller_type, Some(SellerType::Individual));
        assert_eq!(catalog.get(car.id).await.unwrap(), car);
    }

    #[tokio::test]
    async fn invalid_listing_is_rejected() {
        let catalog = CatalogHolder::new();
        let mut bad = form();
        bad.price = 0;
        let err = catalog.create_listing(&seller(), bad).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::ValidationError));
        assert_eq!(catalog.stats().await.total, 0);
    }

    #[tokio::test]
    async fn approve_only_from_pending() {
        let catalog = CatalogHolder::new();
        let car = catalog.create_listing(&seller(), form()).await.unwrap();

        assert_eq!(catalog.approve(car.id).await.unwrap().status, CarStatus::Approved);
        let err = catalog.reject(car.id).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::InvalidStatusTransition));

        assert_eq!(catalog.mark_sold(car.id).await.unwrap().status, CarStatus::Sold);
        assert!(catalog.mark_sold(car.id).await.is_err());
    }

    #[tokio::test]
    async fn browse_hides_non_public_listings() {
        let catalog = CatalogHolder::new();
        catalog
            .set_cars(vec![
                car("Toyota", 500, 2020, CarStatus::Approved, 1),
                car("Toyota", 600, 2021, CarStatus::Pending, 2),
                car("Kia", 700, 2019, CarStatus::Active, 3),
            ])
            .await;

        let params = PaginationParams::default();
        assert_eq!(catalog.browse(&CarFilters::default(), &params).await.total, 2);
        assert_eq!(catalog.search(&CarFilters::default(), &params).await.total, 3);

        let pending = CarFilters { status: Some(CarStatus::Pending), ..Default::default() };
        assert_eq!(catalog.search(&pending, &params).await.total, 1);
    }

    #[tokio::test]
    async fn search_filters_and_sorts() {
        let catalog = CatalogHolder::new();
        catalog
            .set_cars(vec![
                car("Toyota", 500, 2020, CarStatus::Approved, 1),
                car("toyota", 300, 2018, CarStatus::Approved, 2),
                car("Toyota", 900, 2023, CarStatus::Approved, 3),
                car("Mazda", 400, 2022, CarStatus::Approved, 4),
            ])
            .await;

        let filters = CarFilters {
            brand: Some("Toyota".into()),
            max_price: Some(800),
            sort_by: Some(SortBy::Price),
            sort_order: Some(SortOrder::Asc),
            ..Default::default()
        };
        let page = catalog.search(&filters, &PaginationParams::default()).await;
        let prices: Vec<u64> = page.items.iter().map(|c| c.price).collect();
        assert_eq!(prices, vec![300, 500]);
    }

    #[tokio::test]
    async fn default_order_is_newest_first() {
        let catalog = CatalogHolder::new();
        let old = car("A", 1, 2020, CarStatus::Approved, 10);
        let new = car("B", 1, 2020, CarStatus::Approved, 0);
        catalog.set_cars(vec![old.clone(), new.clone()]).await;

        let page = catalog.search(&CarFilters::default(), &PaginationParams::default()).await;
        assert_eq!(page.items[0].id, new.id);
        assert_eq!(page.items[1].id, old.id);
    }

    #[tokio::test]
    async fn required_features_must_all_be_present() {
        let catalog = CatalogHolder::new();
        let listed = catalog.create_listing(&seller(), form()).await.unwrap();

        let both = CarFilters { features: Some("Sunroof, camera".into()), ..Default::default() };
        assert_eq!(catalog.search(&both, &PaginationParams::default()).await.items[0].id, listed.id);

        let missing = CarFilters { features: Some("sunroof,heated seats".into()), ..Default::default() };
        assert_eq!(catalog.search(&missing, &PaginationParams::default()).await.total, 0);
    }

    #[tokio::test]
    async fn set_filters_merges_and_clear_resets() {
        let catalog = CatalogHolder::new();
        catalog.set_filters(CarFilters { brand: Some("Kia".into()), ..Default::default() }).await;
        catalog.set_filters(CarFilters { min_year: Some(2019), ..Default::default() }).await;

        let filters = catalog.filters().await;
        assert_eq!(filters.brand.as_deref(), Some("Kia"));
        assert_eq!(filters.min_year, Some(2019));

        catalog.clear_filters().await;
        assert_eq!(catalog.filters().await, CarFilters::default());
    }

    #[tokio::test]
    async fn update_validates_and_refreshes_selection() {
        let catalog = CatalogHolder::new();
        let car = catalog.create_listing(&seller(), form()).await.unwrap();
        catalog.set_selected_car(Some(car.clone())).await;

        let updated = catalog
            .update_car(car.id, CarPatch { price: Some(850_000_000), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(updated.price, 850_000_000);
        assert_eq!(catalog.selected_car().await.unwrap().price, 850_000_000);

        let err = catalog
            .update_car(car.id, CarPatch { year: Some(1950), ..Default::default() })
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::ValidationError));
        assert_eq!(catalog.get(car.id).await.unwrap().year, 2021);
    }

    #[tokio::test]
    async fn update_trims_text_fields() {
        let catalog = CatalogHolder::new();
        let car = catalog.create_listing(&seller(), form()).await.unwrap();

        let patch = CarPatch {
            title: Some("   Honda Civic RS 2022 mau do   ".into()),
            location: Some("  Da Nang ".into()),
            ..Default::default()
        };
        let updated = catalog.update_car(car.id, patch).await.unwrap();
        assert_eq!(updated.title, "Honda Civic RS 2022 mau do");
        assert_eq!(updated.location, "Da Nang");
        assert_eq!(catalog.get(car.id).await.unwrap().title, "Honda Civic RS 2022 mau do");
    }

    #[tokio::test]
    async fn delete_clears_selection() {
        let catalog = CatalogHolder::new();
        let car = catalog.create_listing(&seller(), form()).await.unwrap();
        catalog.set_selected_car(Some(car.clone())).await;

        catalog.delete_car(car.id).await.unwrap();
        assert!(catalog.selected_car().await.is_none());
        assert_eq!(
            catalog.delete_car(car.id).await.unwrap_err().code(),
            Some(ErrorCode::CarNotFound)
        );
    }

    #[tokio::test]
    async fn counters_saturate_at_zero() {
        let catalog = CatalogHolder::new();
        let car = catalog.create_listing(&seller(), form()).await.unwrap();

        catalog.record_view(car.id).await.unwrap();
        catalog.adjust_favorites(car.id, 1).await.unwrap();
        let after = catalog.adjust_favorites(car.id, -5).await.unwrap();
        assert_eq!(after.views, 1);
        assert_eq!(after.favorites, 0);
    }

    #[tokio::test]
    async fn snapshot_reflects_flags() {
        let catalog = CatalogHolder::new();
        catalog.set_loading(true).await;
        catalog.set_error(Some("network".into())).await;
        catalog.add_car(car("Ford", 1, 2020, CarStatus::Active, 0)).await;

        let snap = catalog.snapshot().await;
        assert!(snap.loading);
        assert_eq!(snap.error.as_deref(), Some("network"));
        assert_eq!(snap.cars.len(), 1);
    }
}
