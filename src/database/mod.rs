pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod store;

pub use manager::DatabaseManager;
pub use memory::MemoryEntityStore;
pub use postgres::PgEntityStore;
pub use repository::{Entity, Repository};
pub use store::{Collection, Document, EntityStore, FieldFilter, StoreError};
