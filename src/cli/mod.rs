pub mod commands;
pub mod context;
pub mod import;
pub mod plan;
pub mod rebuild;
pub mod report;
pub mod serve;
pub mod validate;

pub use commands::{Cli, Commands};
pub use context::CliContext;
