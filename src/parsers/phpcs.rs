//! PHP_CodeSniffer adapter.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::models::finding::RawSeverity;
use crate::models::tool::ToolId;
use crate::models::tool_result::ToolFailure;
use crate::parsers::{
    parse_json, require_stream, Invocation, MappingError, NativeFinding, NativeRecords,
    ToolAdapter, ToolRun,
};

#[derive(Debug, Default)]
pub struct PhpcsAdapter;

/// The `--report=json` document. Both keys are required.
#[derive(Debug, Clone, Deserialize)]
pub struct PhpcsReport {
    pub totals: PhpcsTotals,
    pub files: BTreeMap<String, PhpcsFile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhpcsTotals {
    #[serde(default)]
    pub errors: u64,
    #[serde(default)]
    pub warnings: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhpcsFile {
    #[serde(default)]
    pub messages: Vec<PhpcsMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhpcsMessage {
    pub message: Option<String>,
    pub source: Option<String>,
    /// Sniff-specific weight, 1 to 10. Not used for bucketing.
    pub severity: Option<u8>,
    /// `ERROR` or `WARNING`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl ToolAdapter for PhpcsAdapter {
    fn tool(&self) -> ToolId {
        ToolId::Phpcs
    }

    fn args(&self, invocation: &Invocation<'_>) -> Vec<OsString> {
        vec!["--report=json".into(), invocation.target.into()]
    }

    fn parse(
        &self,
        run: &ToolRun,
        _invocation: &Invocation<'_>,
    ) -> Result<NativeRecords, ToolFailure> {
        let raw = require_stream(ToolId::Phpcs, &run.output.stdout, &run.output)?;
        let report: PhpcsReport = parse_json(ToolId::Phpcs, raw)?;
        Ok(NativeRecords::Phpcs(report))
    }
}

pub(crate) fn map(report: &PhpcsReport, _target: &Path) -> Result<Vec<NativeFinding>, MappingError> {
    if report.totals.errors + report.totals.warnings == 0 {
        return Ok(vec![]);
    }
    let mut findings = Vec::new();
    for (file, details) in &report.files {
        for message in &details.messages {
            let is_error = message
                .kind
                .as_deref()
                .is_some_and(|kind| kind.eq_ignore_ascii_case("error"));
            findings.push(NativeFinding {
                file: PathBuf::from(file),
                line: message.line.filter(|l| *l > 0),
                severity: RawSeverity::label(if is_error { "error" } else { "warning" }),
                description: message.message.clone().unwrap_or_default(),
                rule_code: message.source.clone().unwrap_or_default(),
                snippet: None,
            });
        }
    }
    Ok(findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::language::Language;
    use crate::services::exec::ToolOutput;

    fn parse(stdout: &str, exit_code: i32) -> Result<NativeRecords, ToolFailure> {
        let run = ToolRun {
            output: ToolOutput {
                stdout: stdout.to_string(),
                exit_code: Some(exit_code),
                ..Default::default()
            },
            report: None,
        };
        let invocation = Invocation {
            target: Path::new("public/login.php"),
            language: Language::Php,
            report_path: None,
        };
        PhpcsAdapter.parse(&run, &invocation)
    }

    #[test]
    fn maps_error_and_warning_types() {
        let data = include_str!("../../tests/fixtures/phpcs.json");
        let records = parse(data, 2).unwrap();
        assert_eq!(records.len(), 3);

        let findings = records.map_findings(Path::new("public/login.php")).unwrap();
        assert_eq!(findings[0].file, PathBuf::from("/srv/app/public/login.php"));
        assert_eq!(findings[0].severity, RawSeverity::label("error"));
        assert_eq!(
            findings[0].rule_code,
            "PEAR.Commenting.FileComment.Missing"
        );
        assert_eq!(findings[1].line, Some(14));
        assert_eq!(findings[2].severity, RawSeverity::label("warning"));
    }

    #[test]
    fn zero_totals_yield_no_findings() {
        let data = r#"{"totals":{"errors":0,"warnings":0,"fixable":0},"files":{"/srv/app/a.php":{"errors":0,"warnings":0,"messages":[]}}}"#;
        let records = parse(data, 0).unwrap();
        assert!(records.map_findings(Path::new("a.php")).unwrap().is_empty());
    }

    #[test]
    fn document_without_totals_is_parse_failure() {
        let err = parse(r#"{"files":{}}"#, 0).unwrap_err();
        assert!(err.is_parse());
    }
}
