pub mod health;
pub mod rebuild;
pub mod reports;
