//! PMD 7 adapter using the quickstart Java ruleset.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::models::finding::RawSeverity;
use crate::models::tool::ToolId;
use crate::models::tool_result::ToolFailure;
use crate::parsers::{
    non_empty, parse_json, require_stream, Invocation, MappingError, NativeFinding,
    NativeRecords, ToolAdapter, ToolRun,
};

const RULESET: &str = "rulesets/java/quickstart.xml";

#[derive(Debug, Default)]
pub struct PmdAdapter;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PmdReport {
    pub files: Vec<PmdFile>,
    #[serde(default)]
    pub processing_errors: Vec<PmdProcessingError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PmdFile {
    pub filename: Option<String>,
    #[serde(default)]
    pub violations: Vec<PmdViolation>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PmdViolation {
    pub beginline: Option<u32>,
    pub description: Option<String>,
    pub rule: Option<String>,
    pub ruleset: Option<String>,
    /// 1 (highest) to 5 (lowest).
    pub priority: Option<i64>,
    pub external_info_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PmdProcessingError {
    pub filename: Option<String>,
    pub message: Option<String>,
}

impl ToolAdapter for PmdAdapter {
    fn tool(&self) -> ToolId {
        ToolId::Pmd
    }

    fn args(&self, invocation: &Invocation<'_>) -> Vec<OsString> {
        vec![
            "check".into(),
            "--no-progress".into(),
            "--no-cache".into(),
            "-f".into(),
            "json".into(),
            "-R".into(),
            RULESET.into(),
            "-d".into(),
            invocation.target.into(),
        ]
    }

    fn parse(
        &self,
        run: &ToolRun,
        _invocation: &Invocation<'_>,
    ) -> Result<NativeRecords, ToolFailure> {
        let raw = require_stream(ToolId::Pmd, &run.output.stdout, &run.output)?;
        let report: PmdReport = parse_json(ToolId::Pmd, raw)?;
        for error in &report.processing_errors {
            tracing::warn!(
                file = error.filename.as_deref().unwrap_or("?"),
                message = error.message.as_deref().unwrap_or("?"),
                "PMD could not process file"
            );
        }
        Ok(NativeRecords::Pmd(report))
    }
}

pub(crate) fn map(report: &PmdReport, target: &Path) -> Result<Vec<NativeFinding>, MappingError> {
    let mut findings = Vec::new();
    for file in &report.files {
        let path = non_empty(file.filename.as_deref())
            .map_or_else(|| target.to_path_buf(), PathBuf::from);
        for violation in &file.violations {
            findings.push(NativeFinding {
                file: path.clone(),
                line: violation.beginline.filter(|l| *l > 0),
                severity: violation
                    .priority
                    .map_or(RawSeverity::Missing, RawSeverity::Level),
                description: violation
                    .description
                    .as_deref()
                    .unwrap_or_default()
                    .trim()
                    .to_string(),
                rule_code: violation.rule.clone().unwrap_or_default(),
                snippet: None,
            });
        }
    }
    Ok(findings)
}
