//! Crate-level errors. Tool failures are not errors here: they travel as
//! data inside scan results.

use std::io;
use std::path::PathBuf;

/// Errors that end one scan run.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Target does not exist or is not readable: {}", .path.display())]
    Target {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Report template error: {0}")]
    ReportTemplate(String),

    #[error("Failed to write report {}: {source}", .path.display())]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Report generation failed; the scan itself completed.
    pub fn is_report_failure(&self) -> bool {
        matches!(self, Self::ReportTemplate(_) | Self::ReportWrite { .. })
    }
}
