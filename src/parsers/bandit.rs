//! Bandit (Python) adapter.
//!
//! Bandit writes its JSON report to a file; stdout is only a fallback for
//! versions that ignore `-o`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::models::finding::RawSeverity;
use crate::models::tool::ToolId;
use crate::models::tool_result::ToolFailure;
use crate::parsers::{
    no_output, non_empty, parse_json, Invocation, MappingError, NativeFinding, NativeRecords,
    ToolAdapter, ToolRun,
};

#[derive(Debug, Default)]
pub struct BanditAdapter;

#[derive(Debug, Deserialize)]
struct BanditReport {
    results: Vec<BanditIssue>,
    #[serde(default)]
    errors: Vec<BanditFileError>,
}

#[derive(Debug, Deserialize)]
struct BanditFileError {
    filename: Option<String>,
    reason: Option<String>,
}

/// One entry of Bandit's `results` list.
#[derive(Debug, Clone, Deserialize)]
pub struct BanditIssue {
    pub filename: Option<String>,
    pub line_number: Option<u32>,
    pub issue_severity: Option<String>,
    pub issue_confidence: Option<String>,
    pub issue_text: Option<String>,
    pub test_id: Option<String>,
    pub test_name: Option<String>,
    pub code: Option<String>,
}

impl ToolAdapter for BanditAdapter {
    fn tool(&self) -> ToolId {
        ToolId::Bandit
    }

    fn report_file_name(&self) -> Option<&'static str> {
        Some("bandit.json")
    }

    fn args(&self, invocation: &Invocation<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-f".into(), "json".into()];
        if let Some(report) = invocation.report_path {
            args.push("-o".into());
            args.push(report.into());
        }
        args.push(invocation.target.into());
        args
    }

    fn parse(
        &self,
        run: &ToolRun,
        _invocation: &Invocation<'_>,
    ) -> Result<NativeRecords, ToolFailure> {
        let from_file = run.report.as_deref().map(str::trim).filter(|r| !r.is_empty());
        let from_stdout = Some(run.output.stdout.trim()).filter(|s| !s.is_empty());

        let Some(raw) = from_file.or(from_stdout) else {
            if run.output.success() {
                return Ok(NativeRecords::Bandit(vec![]));
            }
            return Err(no_output(ToolId::Bandit, &run.output));
        };

        let report: BanditReport = parse_json(ToolId::Bandit, raw)?;
        for error in &report.errors {
            tracing::warn!(
                file = error.filename.as_deref().unwrap_or("?"),
                reason = error.reason.as_deref().unwrap_or("?"),
                "Bandit could not analyse file"
            );
        }
        Ok(NativeRecords::Bandit(report.results))
    }
}

pub(crate) fn map(issues: &[BanditIssue], target: &Path) -> Result<Vec<NativeFinding>, MappingError> {
    Ok(issues
        .iter()
        .map(|issue| {
            let test_id = issue.test_id.clone().unwrap_or_default();
            NativeFinding {
                file: non_empty(issue.filename.as_deref())
                    .map_or_else(|| target.to_path_buf(), PathBuf::from),
                line: issue.line_number.filter(|l| *l > 0),
                severity: RawSeverity::from_option(issue.issue_severity.as_deref()),
                description: format!(
                    "({test_id}) {}",
                    issue.issue_text.as_deref().unwrap_or_default()
                ),
                rule_code: test_id,
                snippet: non_empty(issue.code.as_deref()).map(str::to_string),
            }
        })
        .collect())
}
