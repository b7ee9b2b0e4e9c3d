pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod errors;
pub mod models;
pub mod reporting;
pub mod scanners;
