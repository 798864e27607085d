//! End-to-end run: scan a target, then write the report when there is
//! something to report.

use std::path::{Path, PathBuf};

use chrono::Local;

use crate::errors::AppError;
use crate::models::language::Language;
use crate::models::session::ScanSummary;
use crate::services::report::{self, EmbeddedTemplate, FileTemplate, ReportArtifact, TemplateSource};
use crate::services::scanner::Scanner;

/// Where and how the report is produced.
#[derive(Debug, Clone)]
pub struct ReportSettings {
    pub reports_dir: PathBuf,
    /// Template file; the bundled template when `None`.
    pub template: Option<PathBuf>,
}

impl ReportSettings {
    pub fn template_source(&self) -> Box<dyn TemplateSource> {
        match &self.template {
            Some(path) => Box::new(FileTemplate(path.clone())),
            None => Box::new(EmbeddedTemplate),
        }
    }
}

/// How a run ended. Only `Reported` produced an artifact.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// A single-file target with no supported extension.
    UnsupportedFile,
    /// The directory holds no file of a supported language.
    NoFilesFound,
    /// Candidates existed but none was analysed: tools missing or cancelled.
    NothingAnalyzed { summary: ScanSummary },
    Reported {
        summary: ScanSummary,
        artifact: ReportArtifact,
    },
    /// Files were analysed but the template could not be read or the report
    /// could not be written.
    ReportFailed { summary: ScanSummary, error: String },
}

impl ScanOutcome {
    pub fn report_path(&self) -> Option<&Path> {
        match self {
            Self::Reported { artifact, .. } => Some(&artifact.path),
            _ => None,
        }
    }
}

/// Scan `target` (a directory or a single source file) and write its report.
pub async fn run(
    target: &Path,
    scanner: &Scanner,
    settings: &ReportSettings,
) -> Result<ScanOutcome, AppError> {
    let metadata = tokio::fs::metadata(target)
        .await
        .map_err(|source| AppError::Target {
            path: target.to_path_buf(),
            source,
        })?;

    let session = if metadata.is_dir() {
        scanner.scan_tree(target).await?
    } else {
        if Language::classify(target).is_none() {
            tracing::warn!(file = %target.display(), "Unsupported file type");
            return Ok(ScanOutcome::UnsupportedFile);
        }
        scanner.scan_single(target).await
    };

    if session.candidates == 0 {
        tracing::warn!(path = %target.display(), "No supported files found");
        return Ok(ScanOutcome::NoFilesFound);
    }
    let summary = session.summary();
    if session.analyzed() == 0 {
        tracing::warn!(%summary, "No file could be analysed, no report written");
        return Ok(ScanOutcome::NothingAnalyzed { summary });
    }

    let template = settings.template_source();
    match report::write_report(
        &session,
        template.as_ref(),
        &settings.reports_dir,
        Local::now(),
    ) {
        Ok(artifact) => Ok(ScanOutcome::Reported { summary, artifact }),
        Err(e) if e.is_report_failure() => {
            tracing::error!(error = %e, %summary, "Report generation failed");
            Ok(ScanOutcome::ReportFailed {
                summary,
                error: e.to_string(),
            })
        }
        Err(e) => Err(e),
    }
}
