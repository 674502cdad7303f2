pub mod activity;
pub mod catalog;
pub mod favorites;
pub mod models;
pub mod ratings;
pub mod reports;
pub mod seed;
pub mod session;
pub mod storage;
pub mod users;
pub mod validation;

pub use activity::HolderStatus;
pub use catalog::{CarFilters, CatalogHolder};
pub use favorites::{AddOutcome, FavoritesHolder};
pub use ratings::{AggregatePolicy, RatingsHolder};
pub use reports::{NewReport, ReportsHolder};
pub use session::SessionHolder;
pub use storage::{MemoryStorage, RedisStorage, StateStorage};
pub use users::{UserDirectory, UserFilter};
