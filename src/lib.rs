pub mod cli;
pub mod config;
pub mod destination;
pub mod estimator;
pub mod logging;
pub mod models;
pub mod storage;
pub mod store;
pub mod summary;
pub mod utils;

pub use config::Config;
pub use destination::{DestinationLookup, WikiLookup};
pub use models::{BudgetCategory, Expense, ItineraryItem, Trip, TripMember};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, SqliteStorage, StorageError};
pub use store::{TripData, TripStore, STORAGE_KEY};
pub use utils::Profile;
