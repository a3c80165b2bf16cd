pub mod aggregate;
pub mod engine;
pub mod recent;
pub mod report;

pub use crate::domain::model::{Category, Domain, Item, ItemState};
pub use crate::domain::ports::{
    CategoryRepository, ConfigProvider, DomainRepository, ItemRepository, ProfileRepository,
};
pub use crate::domain::stats::{CategoryStats, DomainStats, OverallStats, RecentActivity};
pub use crate::utils::error::Result;
