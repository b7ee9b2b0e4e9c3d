pub mod entities;
pub mod scan_event;
pub mod severity;
pub mod report;

pub use entities::*;
pub use scan_event::*;
pub use severity::*;
pub use report::*;
