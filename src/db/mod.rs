pub mod connection;
pub mod inventory;
pub mod reports;
pub mod schema;

pub use connection::Database;
pub use inventory::{ImportCounts, InventoryImport, InventoryScope};
