//! ESLint adapter. Requires a project ESLint configuration to be present.

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
pub struct EslintAdapter;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EslintFileResult {
    pub file_path: Option<String>,
    #[serde(default)]
    pub messages: Vec<EslintMessage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EslintMessage {
    pub rule_id: Option<String>,
    /// 2 = error, 1 = warning. Higher is more severe.
    pub severity: Option<u8>,
    pub message: Option<String>,
    pub line: Option<u32>,
    #[serde(default)]
    pub fatal: bool,
}

impl ToolAdapter for EslintAdapter {
    fn tool(&self) -> ToolId {
        ToolId::Eslint
    }

    fn args(&self, invocation: &Invocation<'_>) -> Vec<OsString> {
        vec!["--format=json".into(), invocation.target.into()]
    }

    fn parse(
        &self,
        run: &ToolRun,
        _invocation: &Invocation<'_>,
    ) -> Result<NativeRecords, ToolFailure> {
        let raw = require_stream(ToolId::Eslint, &run.output.stdout, &run.output)?;
        let files: Vec<EslintFileResult> = parse_json(ToolId::Eslint, raw)?;
        Ok(NativeRecords::Eslint(files))
    }
}

pub(crate) fn map(files: &[EslintFileResult], target: &Path) -> Result<Vec<NativeFinding>, MappingError> {
    let mut findings = Vec::new();
    for file in files {
        let path = non_empty(file.file_path.as_deref())
            .map_or_else(|| target.to_path_buf(), PathBuf::from);
        for message in &file.messages {
            let rule = message
                .rule_id
                .clone()
                .unwrap_or_else(|| if message.fatal { "fatal" } else { "" }.to_string());
            let label = if message.severity == Some(2) { "error" } else { "warning" };
            findings.push(NativeFinding {
                file: path.clone(),
                line: message.line.filter(|l| *l > 0),
                severity: RawSeverity::label(label),
                description: format!(
                    "({rule}) {}",
                    message.message.as_deref().unwrap_or_default()
                ),
                rule_code: rule,
                snippet: None,
            });
        }
    }
    Ok(findings)
}
