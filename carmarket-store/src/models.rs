use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use carmarket_shared::types::auth::UserRole;

// --- User ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial profile update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UserPatch {
    #[validate(custom = "crate::validation::name_length")]
    pub name: Option<String>,
    #[validate(custom = "crate::validation::vietnamese_phone")]
    pub phone: Option<String>,
    pub avatar: Option<String>,
}

impl User {
    pub fn apply(&mut self, patch: UserPatch) {
        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(phone) = patch.phone {
            self.phone = Some(phone);
        }
        if let Some(avatar) = patch.avatar {
            self.avatar = Some(avatar);
        }
        self.updated_at = Utc::now();
    }
}

// --- Car ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuelType {
    Gasoline,
    Diesel,
    Hybrid,
    Electric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transmission {
    Manual,
    Automatic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    New,
    Used,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SellerType {
    Individual,
    Dealer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CarStatus {
    Pending,
    Active,
    Approved,
    Rejected,
    Sold,
}

impl CarStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CarStatus::Pending => "pending",
            CarStatus::Active => "active",
            CarStatus::Approved => "approved",
            CarStatus::Rejected => "rejected",
            CarStatus::Sold => "sold",
        }
    }

    /// Listings buyers can see without a status filter.
    pub fn is_public(self) -> bool {
        matches!(self, CarStatus::Active | CarStatus::Approved)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Car {
    pub id: Uuid,
    pub title: String,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub price: u64,
    pub mileage: u32,
    pub fuel_type: FuelType,
    pub transmission: Transmission,
    pub color: String,
    pub description: String,
    pub images: Vec<String>,
    pub seller_id: Uuid,
    pub seller_name: String,
    pub seller_phone: Option<String>,
    pub seller_type: Option<SellerType>,
    pub location: String,
    pub status: CarStatus,
    pub features: BTreeSet<String>,
    pub condition: Condition,
    pub views: u64,
    pub favorites: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Seller-side edit of a listing. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CarPatch {
    pub title: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub price: Option<u64>,
    pub mileage: Option<u32>,
    pub fuel_type: Option<FuelType>,
    pub transmission: Option<Transmission>,
    pub color: Option<String>,
    pub description: Option<String>,
    pub images: Option<Vec<String>>,
    pub location: Option<String>,
    pub features: Option<BTreeSet<String>>,
    pub condition: Option<Condition>,
}

impl Car {
    pub fn apply(&mut self, patch: CarPatch) {
        let CarPatch {
            title,
            brand,
            model,
            year,
            price,
            mileage,
            fuel_type,
            transmission,
            color,
            description,
            images,
            location,
            features,
            condition,
        } = patch;

        if let Some(v) = title { self.title = v.trim().to_string(); }
        if let Some(v) = brand { self.brand = v.trim().to_string(); }
        if let Some(v) = model { self.model = v.trim().to_string(); }
        if let Some(v) = year { self.year = v; }
        if let Some(v) = price { self.price = v; }
        if let Some(v) = mileage { self.mileage = v; }
        if let Some(v) = fuel_type { self.fuel_type = v; }
        if let Some(v) = transmission { self.transmission = v; }
        if let Some(v) = color { self.color = v; }
        if let Some(v) = description { self.description = v.trim().to_string(); }
        if let Some(v) = images { self.images = v; }
        if let Some(v) = location { self.location = v.trim().to_string(); }
        if let Some(v) = features { self.features = v; }
        if let Some(v) = condition { self.condition = v; }
        self.updated_at = Utc::now();
    }
}

// --- Favorite ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Favorite {
    pub id: Uuid,
    pub user_id: Uuid,
    pub car_id: Uuid,
    pub created_at: DateTime<Utc>,
}

// --- Rating ---

pub const MIN_STARS: u8 = 1;
pub const MAX_STARS: u8 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rating {
    pub id: Uuid,
    pub user_id: Uuid,
    pub seller_id: Uuid,
    pub rating: u8,
    pub review: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-seller summary derived from the raw ratings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SellerRating {
    pub seller_id: Uuid,
    pub average_rating: f64,
    pub total_ratings: u32,
    /// Count per star value; index 0 holds one-star ratings.
    pub distribution: [u32; 5],
    pub ratings: Vec<Rating>,
    /// Set when the underlying ratings changed after this summary was computed.
    pub stale: bool,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RatingBucket {
    pub star: u8,
    pub count: u32,
    pub percentage: u32,
}

impl SellerRating {
    /// Histogram rows from five stars down to one, with whole-number percentages.
    pub fn breakdown(&self) -> Vec<RatingBucket> {
        (MIN_STARS..=MAX_STARS)
            .rev()
            .map(|star| {
                let count = self.distribution[usize::from(star - 1)];
                let percentage = if self.total_ratings > 0 {
                    (f64::from(count) / f64::from(self.total_ratings) * 100.0).round() as u32
                } else {
                    0
                };
                RatingBucket { star, count, percentage }
            })
            .collect()
    }
}

// --- Report ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportedType {
    Seller,
    Buyer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Investigating,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Investigating => "investigating",
            ReportStatus::Resolved => "resolved",
            ReportStatus::Dismissed => "dismissed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub reported_id: Uuid,
    pub reported_type: ReportedType,
    pub reason: String,
    pub description: String,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasonCategory {
    Fraud,
    Behavior,
    Content,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ReportReason {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub category: ReasonCategory,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(distribution: [u32; 5]) -> SellerRating {
        SellerRating {
            seller_id: Uuid::new_v4(),
            average_rating: 0.0,
            total_ratings: distribution.iter().sum(),
            distribution,
            ratings: Vec::new(),
            stale: false,
            computed_at: Utc::now(),
        }
    }

    #[test]
    fn breakdown_runs_from_five_stars_down() {
        let rows = summary([1, 0, 1, 0, 2]).breakdown();
        let stars: Vec<u8> = rows.iter().map(|r| r.star).collect();
        assert_eq!(stars, vec![5, 4, 3, 2, 1]);
        assert_eq!(rows[0], RatingBucket { star: 5, count: 2, percentage: 50 });
        assert_eq!(rows[4], RatingBucket { star: 1, count: 1, percentage: 25 });
    }

    #[test]
    fn breakdown_percentages_round_to_nearest() {
        let rows = summary([0, 0, 1, 1, 1]).breakdown();
        assert!(rows.iter().take(3).all(|r| r.percentage == 33));
    }

    #[test]
    fn car_status_visibility() {
        assert!(CarStatus::Approved.is_public());
        assert!(CarStatus::Active.is_public());
        assert!(!CarStatus::Pending.is_public());
        assert!(!CarStatus::Sold.is_public());
    }

    #[test]
    fn enums_use_lowercase_wire_names() {
        assert_eq!(serde_json::to_string(&ReportStatus::Investigating).unwrap(), "\"investigating\"");
        assert_eq!(serde_json::to_string(&FuelType::Electric).unwrap(), "\"electric\"");
    }
}
