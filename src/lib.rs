pub mod config;
pub mod errors;
pub mod models;
pub mod parsers;
pub mod services;

pub use config::ScanConfig;
pub use errors::AppError;
pub use services::pipeline::{ReportSettings, ScanOutcome};
pub use services::scanner::{CancelFlag, Scanner};
