pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod memory;
pub mod redis_repo;
pub mod schedule_repo;
pub mod settings_file;

pub use app_config::Config;
pub use booking_repo::StoreBookingRepository;
pub use database::DbClient;
pub use memory::{MemorySettings, MemoryStore};
pub use redis_repo::RedisClient;
pub use schedule_repo::StoreScheduleRepository;
pub use settings_file::JsonSettingsFile;
