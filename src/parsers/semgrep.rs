//! Semgrep adapter, shared by every language with a per-language rule pack.

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

/// Registry packs added to every language-specific pack.
const GENERIC_PACKS: [&str; 3] = ["p/secrets", "p/security-audit", "p/owasp-top-ten"];

#[derive(Debug, Default)]
pub struct SemgrepAdapter;

#[derive(Debug, Deserialize)]
struct SemgrepOutput {
    results: Vec<SemgrepResult>,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SemgrepResult {
    pub check_id: Option<String>,
    pub path: Option<String>,
    pub start: Option<SemgrepPosition>,
    #[serde(default)]
    pub extra: SemgrepExtra,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SemgrepPosition {
    pub line: Option<u32>,
    pub col: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SemgrepExtra {
    pub message: Option<String>,
    pub severity: Option<String>,
    pub lines: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl SemgrepResult {
    /// Rule metadata `impact`, then metadata `severity`, then the result
    /// severity, then `INFO`.
    fn severity(&self) -> &str {
        let metadata = |key: &str| self.extra.metadata.get(key).and_then(|v| v.as_str());
        metadata("impact")
            .or_else(|| metadata("severity"))
            .or(self.extra.severity.as_deref())
            .unwrap_or("INFO")
    }
}

impl ToolAdapter for SemgrepAdapter {
    fn tool(&self) -> ToolId {
        ToolId::Semgrep
    }

    fn args(&self, invocation: &Invocation<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["--json".into()];
        let packs = std::iter::once(format!("p/{}", invocation.language.semgrep_pack()))
            .chain(GENERIC_PACKS.iter().map(|pack| pack.to_string()));
        for pack in packs {
            args.push("--config".into());
            args.push(pack.into());
        }
        args.push(invocation.target.into());
        args
    }

    fn parse(
        &self,
        run: &ToolRun,
        _invocation: &Invocation<'_>,
    ) -> Result<NativeRecords, ToolFailure> {
        let raw = require_stream(ToolId::Semgrep, &run.output.stdout, &run.output)?;
        let output: SemgrepOutput = parse_json(ToolId::Semgrep, raw)?;
        if !output.errors.is_empty() {
            tracing::debug!(count = output.errors.len(), "Semgrep reported rule errors");
        }
        Ok(NativeRecords::Semgrep(output.results))
    }
}

pub(crate) fn map(results: &[SemgrepResult], target: &Path) -> Result<Vec<NativeFinding>, MappingError> {
    Ok(results
        .iter()
        .map(|result| {
            let check_id = result.check_id.clone().unwrap_or_default();
            NativeFinding {
                file: non_empty(result.path.as_deref())
                    .map_or_else(|| target.to_path_buf(), PathBuf::from),
                line: result.start.as_ref().and_then(|s| s.line).filter(|l| *l > 0),
                severity: RawSeverity::label(result.severity()),
                description: format!(
                    "({check_id}) {}",
                    result.extra.message.as_deref().unwrap_or_default()
                ),
                rule_code: check_id,
                snippet: non_empty(result.extra.lines.as_deref()).map(str::to_string),
            }
        })
        .collect())
}
