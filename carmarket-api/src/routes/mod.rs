pub mod admin;
pub mod auth;
pub mod cars;
pub mod favorites;
pub mod health;
pub mod ratings;
pub mod reports;
