//! Pylint adapter, restricted to error and fatal messages.

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

#[derive(Debug, Default)]
pub struct PylintAdapter;

/// One message of Pylint's JSON reporter.
#[derive(Debug, Clone, Deserialize)]
pub struct PylintMessage {
    /// `error`, `fatal`, `warning`, `convention`, `refactor` or `info`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub path: Option<String>,
    pub line: Option<u32>,
    pub symbol: Option<String>,
    pub message: Option<String>,
    #[serde(rename = "message-id")]
    pub message_id: Option<String>,
}

impl ToolAdapter for PylintAdapter {
    fn tool(&self) -> ToolId {
        ToolId::Pylint
    }

    fn args(&self, invocation: &Invocation<'_>) -> Vec<OsString> {
        vec![
            "--output-format=json".into(),
            "--disable=C,R,W,I".into(),
            invocation.target.into(),
        ]
    }

    fn parse(
        &self,
        run: &ToolRun,
        _invocation: &Invocation<'_>,
    ) -> Result<NativeRecords, ToolFailure> {
        let raw = require_stream(ToolId::Pylint, &run.output.stdout, &run.output)?;
        let messages: Vec<PylintMessage> = parse_json(ToolId::Pylint, raw)?;
        Ok(NativeRecords::Pylint(messages))
    }
}

pub(crate) fn map(messages: &[PylintMessage], target: &Path) -> Result<Vec<NativeFinding>, MappingError> {
    Ok(messages
        .iter()
        .map(|message| {
            let symbol = message.symbol.clone().unwrap_or_default();
            NativeFinding {
                file: non_empty(message.path.as_deref())
                    .map_or_else(|| target.to_path_buf(), PathBuf::from),
                line: message.line.filter(|l| *l > 0),
                // error and fatal canonicalize to high; they are all that is left
                // once C, R, W and I are disabled
                severity: RawSeverity::from_option(message.kind.as_deref()),
                description: format!(
                    "[{symbol}]({}) {}",
                    message.message_id.as_deref().unwrap_or_default(),
                    message.message.as_deref().unwrap_or_default()
                ),
                rule_code: symbol,
                snippet: None,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::language::Language;
    use crate::services::exec::ToolOutput;

    #[test]
    fn parses_messages() {
        let data = include_str!("../../tests/fixtures/pylint.json");
        let target = Path::new("pkg/loader.py");
        let invocation = Invocation {
            target,
            language: Language::Python,
            report_path: None,
        };
        let run = ToolRun {
            output: ToolOutput {
                stdout: data.to_string(),
                exit_code: Some(2),
                ..Default::default()
            },
            report: None,
        };
        let records = PylintAdapter.parse(&run, &invocation).unwrap();
        let findings = records.map_findings(target).unwrap();
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].rule_code, "undefined-variable");
        assert_eq!(
            findings[0].description,
            "[undefined-variable](E0602) Undefined variable 'cfg'"
        );
        assert_eq!(findings[0].severity, RawSeverity::label("error"));
        assert_eq!(findings[1].severity, RawSeverity::label("fatal"));
        assert_eq!(findings[1].line, None);
    }

    #[test]
    fn clean_run_is_empty_array() {
        let run = ToolRun {
            output: ToolOutput {
                stdout: "[]\n".to_string(),
                exit_code: Some(0),
                ..Default::default()
            },
            report: None,
        };
        let invocation = Invocation {
            target: Path::new("a.py"),
            language: Language::Python,
            report_path: None,
        };
        assert!(PylintAdapter.parse(&run, &invocation).unwrap().is_empty());
    }
}
