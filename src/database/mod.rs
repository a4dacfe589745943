pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemorySettingsStore;
pub use models::{Alm, AlmSetting};
pub use postgres::PgSettingsStore;
pub use store::{SettingsStore, SettingsTransaction, StoreError};
