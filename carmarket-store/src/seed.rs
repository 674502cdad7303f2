//! Startup data for the transient holders.

use std::collections::BTreeSet;

use chrono::{Duration, Utc};
use uuid::Uuid;

use carmarket_shared::types::auth::UserRole;
use carmarket_shared::AppResult;

use crate::catalog::CatalogHolder;
use crate::models::{Car, CarStatus, Condition, FuelType, SellerType, Transmission, User};
use crate::users::UserDirectory;

pub const DEMO_PASSWORD: &str = "Demo1234";

fn account(email: &str, name: &str, role: UserRole, phone: Option<&str>, verified: bool) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        email: email.to_string(),
        name: name.to_string(),
        role,
        phone: phone.map(str::to_string),
        avatar: None,
        is_verified: verified,
        created_at: now,
        updated_at: now,
    }
}

/// Create the bootstrap admin account.
pub async fn seed_admin(users: &UserDirectory, email: &str, password: &str) -> AppResult<User> {
    let admin = users
        .insert_seeded(account(email, "Administrator", UserRole::Admin, None, true), password)
        .await?;
    tracing::info!(user_id = %admin.id, email = %admin.email, "admin account ready");
    Ok(admin)
}

struct DemoCar {
    title: &'static str,
    brand: &'static str,
    model: &'static str,
    year: i32,
    price: u64,
    mileage: u32,
    fuel_type: FuelType,
    transmission: Transmission,
    color: &'static str,
    location: &'static str,
    condition: Condition,
    status: CarStatus,
    features: &'static [&'static str],
}

const DEMO_CARS: &[DemoCar] = &[
    DemoCar {
        title: "Toyota Camry 2022 - Xe gia đình đẹp",
        brand: "Toyota",
        model: "Camry",
        year: 2022,
        price: 1_200_000_000,
        mileage: 15_000,
        fuel_type: FuelType::Gasoline,
        transmission: Transmission::Automatic,
        color: "white",
        location: "Hồ Chí Minh",
        condition: Condition::Used,
        status: CarStatus::Approved,
        features: &["camera", "cruise control"],
    },
    DemoCar {
        title: "Honda Civic 2023 - Xe mới 99%",
        brand: "Honda",
        model: "Civic",
        year: 2023,
        price: 850_000_000,
        mileage: 5_000,
        fuel_type: FuelType::Gasoline,
        transmission: Transmission::Automatic,
        color: "red",
        location: "Hà Nội",
        condition: Condition::Used,
        status: CarStatus::Approved,
        features: &["sunroof"],
    },
    DemoCar {
        title: "VinFast VF8 2024 chính hãng",
        brand: "VinFast",
        model: "VF8",
        year: 2024,
        price: 1_090_000_000,
        mileage: 0,
        fuel_type: FuelType::Electric,
        transmission: Transmission::Automatic,
        color: "blue",
        location: "Đà Nẵng",
        condition: Condition::New,
        status: CarStatus::Active,
        features: &["camera", "lane assist"],
    },
    DemoCar {
        title: "Ford Ranger Wildtrak 2020 máy dầu",
        brand: "Ford",
        model: "Ranger",
        year: 2020,
        price: 690_000_000,
        mileage: 68_000,
        fuel_type: FuelType::Diesel,
        transmission: Transmission::Manual,
        color: "grey",
        location: "Cần Thơ",
        condition: Condition::Used,
        status: CarStatus::Pending,
        features: &[],
    },
];

/// Demo sellers, a buyer and a handful of listings spread across statuses.
pub async fn seed_demo(users: &UserDirectory, catalog: &CatalogHolder) -> AppResult<()> {
    let individual = users
        .insert_seeded(
            account("nguyen.van.a@example.com", "Nguyễn Văn A", UserRole::Seller, Some("0901234567"), true),
            DEMO_PASSWORD,
        )
        .await?;
    let dealer = users
        .insert_seeded(
            account("auto.saigon@example.com", "Auto Sài Gòn", UserRole::Seller, Some("0283456789"), true),
            DEMO_PASSWORD,
        )
        .await?;
    users
        .insert_seeded(
            account("tran.thi.b@example.com", "Trần Thị B", UserRole::Buyer, None, false),
            DEMO_PASSWORD,
        )
        .await?;

    let now = Utc::now();
    for (i, demo) in DEMO_CARS.iter().enumerate() {
        let (seller, seller_type) = if i % 2 == 0 {
            (&individual, SellerType::Individual)
        } else {
            (&dealer, SellerType::Dealer)
        };
        let created = now - Duration::days(i as i64 + 1);
        catalog
            .add_car(Car {
                id: Uuid::new_v4(),
                title: demo.title.to_string(),
                brand: demo.brand.to_string(),
                model: demo.model.to_string(),
                year: demo.year,
                price: demo.price,
                mileage: demo.mileage,
                fuel_type: demo.fuel_type,
                transmission: demo.transmission,
                color: demo.color.to_string(),
                description: format!(
                    "{} {} {}, giấy tờ đầy đủ, bảo dưỡng định kỳ tại hãng, hỗ trợ trả góp.",
                    demo.brand, demo.model, demo.year
                ),
                images: Vec::new(),
                seller_id: seller.id,
                seller_name: seller.name.clone(),
                seller_phone: seller.phone.clone(),
                seller_type: Some(seller_type),
                location: demo.location.to_string(),
                status: demo.status,
                features: demo.features.iter().map(|f| f.to_string()).collect::<BTreeSet<_>>(),
                condition: demo.condition,
                views: 0,
                favorites: 0,
                created_at: created,
                updated_at: created,
            })
            .await;
    }

    tracing::info!(cars = DEMO_CARS.len(), "demo data seeded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CarFilters;
    use carmarket_shared::PaginationParams;

    #[tokio::test]
    async fn demo_seed_populates_directory_and_catalog() {
        let users = UserDirectory::new();
        let catalog = CatalogHolder::new();
        seed_admin(&users, "Admin@Carmarket.vn", "Admin1234").await.unwrap();
        seed_demo(&users, &catalog).await.unwrap();

        assert!(users.authenticate("admin@carmarket.vn", "Admin1234").await.is_ok());
        assert!(users.authenticate("tran.thi.b@example.com", DEMO_PASSWORD).await.is_ok());
        assert_eq!(users.stats().await.sellers, 2);

        let public = catalog.browse(&CarFilters::default(), &PaginationParams::default()).await;
        assert_eq!(public.total, 3);
        assert_eq!(catalog.stats().await.total, DEMO_CARS.len());
    }
}
