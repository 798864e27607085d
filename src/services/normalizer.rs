//! Tool-native records to canonical [`Finding`]s.
//!
//! Failed tools contribute nothing. A tool whose records cannot all be mapped
//! is dropped for that file rather than reported partially.

use std::collections::BTreeMap;
use std::path::Path;

use crate::models::finding::{normalize_severity, Finding};
use crate::models::language::Language;
use crate::models::tool::ToolId;
use crate::models::tool_result::RawToolResult;
use crate::services::fingerprint;

/// Canonical findings for one analysed file.
pub fn normalize(
    target: &Path,
    results: &BTreeMap<ToolId, RawToolResult>,
    language: Language,
) -> Vec<Finding> {
    let findings: Vec<Finding> = results
        .iter()
        .flat_map(|(&tool, result)| normalize_tool(target, tool, result))
        .collect();
    tracing::debug!(
        file = %target.display(),
        language = %language,
        findings = findings.len(),
        "Normalized tool results"
    );
    findings
}

fn normalize_tool(target: &Path, tool: ToolId, result: &RawToolResult) -> Vec<Finding> {
    let records = match result {
        RawToolResult::Records(records) => records,
        RawToolResult::Failed(failure) => {
            tracing::debug!(
                tool = %tool,
                file = %target.display(),
                error = %failure,
                "Skipping failed tool"
            );
            return Vec::new();
        }
    };

    let native = match records.map_findings(target) {
        Ok(native) => native,
        Err(e) => {
            tracing::warn!(
                tool = %tool,
                file = %target.display(),
                error = %e,
                "Dropping tool results that could not be normalized"
            );
            return Vec::new();
        }
    };

    native
        .into_iter()
        .map(|record| Finding {
            fingerprint: fingerprint::compute(tool, &record.file, &record.rule_code, record.line),
            severity: normalize_severity(&record.severity),
            file: record.file,
            line: record.line,
            description: record.description,
            rule_code: record.rule_code,
            source_tool: tool,
            snippet: record.snippet,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::finding::Severity;
    use crate::models::tool_result::ToolFailure;
    use crate::parsers::jshint::CheckstyleError;
    use crate::parsers::pylint::PylintMessage;
    use crate::parsers::NativeRecords;

    fn pylint_error(line: u32) -> PylintMessage {
        PylintMessage {
            kind: Some("error".to_string()),
            path: Some("pkg/a.py".to_string()),
            line: Some(line),
            symbol: Some("undefined-variable".to_string()),
            message: Some("Undefined variable 'x'".to_string()),
            message_id: Some("E0602".to_string()),
        }
    }

    #[test]
    fn failed_tools_contribute_nothing() {
        let mut results = BTreeMap::new();
        results.insert(
            ToolId::Bandit,
            RawToolResult::Failed(ToolFailure::Parse {
                tool: ToolId::Bandit,
                reason: "invalid JSON".to_string(),
                excerpt: "{".to_string(),
            }),
        );
        results.insert(
            ToolId::Pylint,
            RawToolResult::Records(NativeRecords::Pylint(vec![pylint_error(3)])),
        );

        let findings = normalize(Path::new("pkg/a.py"), &results, Language::Python);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].source_tool, ToolId::Pylint);
        assert_eq!(findings[0].severity, Severity::High);
        assert_eq!(findings[0].fingerprint.len(), 64);
    }

    #[test]
    fn unmappable_tool_is_dropped_whole() {
        let good = CheckstyleError {
            line: Some("4".to_string()),
            severity: Some("warning".to_string()),
            ..Default::default()
        };
        let bad = CheckstyleError {
            line: Some("four".to_string()),
            ..Default::default()
        };
        let mut results = BTreeMap::new();
        results.insert(
            ToolId::Jshint,
            RawToolResult::Records(NativeRecords::Jshint(vec![good, bad])),
        );
        results.insert(
            ToolId::Semgrep,
            RawToolResult::Records(NativeRecords::Semgrep(vec![])),
        );

        let findings = normalize(Path::new("a.js"), &results, Language::JavaScript);
        assert!(findings.is_empty());
    }

    #[test]
    fn clean_run_yields_no_findings() {
        let mut results = BTreeMap::new();
        results.insert(
            ToolId::Pylint,
            RawToolResult::Records(NativeRecords::Pylint(vec![])),
        );
        assert!(normalize(Path::new("a.py"), &results, Language::Python).is_empty());
    }
}
