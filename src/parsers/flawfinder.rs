//! Flawfinder adapter reading its `--csv` output.

use std::ffi::OsString;
use std::path::Path;

use serde::Deserialize;

use crate::models::finding::RawSeverity;
use crate::models::tool::ToolId;
use crate::models::tool_result::ToolFailure;
use crate::parsers::{
    excerpt, optional_stream, parse_line, same_file, Invocation, MappingError, NativeFinding,
    NativeRecords, ToolAdapter, ToolRun,
};

const CSV_HEADER_PREFIX: &str = "File,Line,Column";

#[derive(Debug, Default)]
pub struct FlawfinderAdapter;

/// One CSV row. Columns are read by header name; older releases lack some.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlawfinderHit {
    #[serde(rename = "File")]
    pub file: String,
    #[serde(rename = "Line", default)]
    pub line: Option<String>,
    #[serde(rename = "Column", default)]
    pub column: Option<String>,
    /// Risk level 0 to 5. Higher is worse.
    #[serde(rename = "Level", default)]
    pub level: Option<String>,
    #[serde(rename = "Category", default)]
    pub category: Option<String>,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Warning", default)]
    pub warning: Option<String>,
    #[serde(rename = "CWEs", default)]
    pub cwes: Option<String>,
    #[serde(rename = "Context", default)]
    pub context: Option<String>,
}

impl FlawfinderHit {
    /// Flawfinder's 0-5 risk level, bucketed into labels. Unreadable levels are low.
    fn severity_label(&self) -> &'static str {
        match self.level.as_deref().map(str::trim).map(str::parse::<i64>) {
            Some(Ok(level)) if level >= 4 => "high",
            Some(Ok(level)) if level >= 2 => "medium",
            _ => "low",
        }
    }
}

impl ToolAdapter for FlawfinderAdapter {
    fn tool(&self) -> ToolId {
        ToolId::Flawfinder
    }

    fn args(&self, invocation: &Invocation<'_>) -> Vec<OsString> {
        vec!["--csv".into(), invocation.target.into()]
    }

    fn parse(
        &self,
        run: &ToolRun,
        invocation: &Invocation<'_>,
    ) -> Result<NativeRecords, ToolFailure> {
        let Some(raw) = optional_stream(ToolId::Flawfinder, &run.output.stdout, &run.output)? else {
            return Ok(NativeRecords::Flawfinder(vec![]));
        };
        let parse_failure = |reason: String| ToolFailure::Parse {
            tool: ToolId::Flawfinder,
            reason,
            excerpt: excerpt(raw),
        };
        if !raw.starts_with(CSV_HEADER_PREFIX) {
            return Err(parse_failure(format!(
                "expected CSV header starting with '{CSV_HEADER_PREFIX}'"
            )));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(raw.as_bytes());
        let mut hits = Vec::new();
        for row in reader.deserialize::<FlawfinderHit>() {
            let hit = row.map_err(|e| parse_failure(format!("malformed CSV row: {e}")))?;
            if hit_targets(&hit, invocation.target) {
                hits.push(hit);
            }
        }
        Ok(NativeRecords::Flawfinder(hits))
    }
}

/// Flawfinder reports paths as given or relative to its cwd; accept either
/// form of the scanned file.
fn hit_targets(hit: &FlawfinderHit, target: &Path) -> bool {
    let reported = Path::new(hit.file.trim());
    same_file(reported, target)
        || (reported.file_name().is_some() && reported.file_name() == target.file_name())
}

pub(crate) fn map(hits: &[FlawfinderHit], target: &Path) -> Result<Vec<NativeFinding>, MappingError> {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            let name = hit.name.clone().unwrap_or_default();
            Ok(NativeFinding {
                file: target.to_path_buf(),
                line: parse_line(hit.line.as_deref(), i, "Line")?,
                severity: RawSeverity::label(hit.severity_label()),
                description: format!(
                    "{name}: {}",
                    hit.warning.as_deref().unwrap_or_default().trim()
                ),
                rule_code: name,
                snippet: hit
                    .context
                    .as_deref()
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string),
            })
        })
        .collect()
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
            target: Path::new("src/buffer.c"),
            language: Language::Cpp,
            report_path: None,
        };
        FlawfinderAdapter.parse(&run, &invocation)
    }

    #[test]
    fn reads_csv_and_buckets_levels() {
        let data = include_str!("../../tests/fixtures/flawfinder.csv");
        let records = parse(data, 0).unwrap();
        // the hit in src/buffer.h is dropped
        assert_eq!(records.len(), 3);

        let findings = records.map_findings(Path::new("src/buffer.c")).unwrap();
        assert_eq!(findings[0].severity, RawSeverity::label("high"));
        assert_eq!(findings[0].rule_code, "strcpy");
        assert_eq!(findings[0].line, Some(17));
        assert!(findings[0]
            .description
            .starts_with("strcpy: Does not check for buffer overflows when copying to destination"));
        assert_eq!(findings[1].severity, RawSeverity::label("medium"));
        assert_eq!(findings[2].severity, RawSeverity::label("low"));
        assert_eq!(findings[0].snippet.as_deref(), Some("strcpy(buf, input);"));
    }

    #[test]
    fn matches_hits_by_basename() {
        let hit = FlawfinderHit {
            file: "./build/../src/buffer.c".to_string(),
            ..Default::default()
        };
        assert!(hit_targets(&hit, Path::new("src/buffer.c")));
        let other = FlawfinderHit {
            file: "src/buffer.h".to_string(),
            ..Default::default()
        };
        assert!(!hit_targets(&other, Path::new("src/buffer.c")));
    }

    #[test]
    fn unparseable_level_is_low() {
        let hit = FlawfinderHit {
            level: Some("n/a".to_string()),
            ..Default::default()
        };
        assert_eq!(hit.severity_label(), "low");
    }

    #[test]
    fn header_only_output_is_clean() {
        let header = "File,Line,Column,DefaultLevel,Level,Category,Name,Warning,Suggestion,Note,CWEs,Context,Fingerprint,ToolVersion,RuleId,HelpUri\n";
        assert!(parse(header, 0).unwrap().is_empty());
    }

    #[test]
    fn unexpected_header_is_parse_failure() {
        let err = parse("Flawfinder version 2.0.19, (C) 2001-2019 David A. Wheeler.", 0)
            .unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn failed_run_without_output_is_failure() {
        let err = parse("", 1).unwrap_err();
        assert!(matches!(err, ToolFailure::NoOutput { .. }));
    }
}
