//! DevSkim adapter (C#). DevSkim writes a SARIF 2.1.0 log to a report file.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::models::finding::RawSeverity;
use crate::models::tool::ToolId;
use crate::models::tool_result::ToolFailure;
use crate::parsers::{
    non_empty, parse_json, parse_line, Invocation, MappingError, NativeFinding, NativeRecords,
    ToolAdapter, ToolRun,
};

/// Printed by the dotnet host when no runtime is installed.
const DOTNET_MISSING_MARKER: &str = ".NET location: Not found";

// -- SARIF 2.1.0 schema (subset) --

#[derive(Debug, Clone, Deserialize)]
pub struct SarifLog {
    pub runs: Vec<SarifRun>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SarifRun {
    #[serde(default)]
    pub tool: SarifTool,
    #[serde(default)]
    pub results: Vec<SarifResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SarifTool {
    #[serde(default)]
    pub driver: SarifDriver,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SarifDriver {
    pub name: Option<String>,
    pub version: Option<String>,
    #[serde(default)]
    pub rules: Vec<SarifRule>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifRule {
    pub id: String,
    pub short_description: Option<SarifMessage>,
    pub default_configuration: Option<SarifConfiguration>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SarifMessage {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SarifConfiguration {
    pub level: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifResult {
    pub rule_id: Option<String>,
    pub rule_index: Option<usize>,
    pub level: Option<String>,
    pub message: Option<SarifMessage>,
    #[serde(default)]
    pub locations: Vec<SarifLocation>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifLocation {
    pub physical_location: Option<SarifPhysicalLocation>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifPhysicalLocation {
    pub artifact_location: Option<SarifArtifactLocation>,
    pub region: Option<SarifRegion>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SarifArtifactLocation {
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifRegion {
    /// Usually a number; some producers emit strings.
    pub start_line: Option<serde_json::Value>,
    pub snippet: Option<SarifMessage>,
}

#[derive(Debug, Default)]
pub struct DevskimAdapter;

impl ToolAdapter for DevskimAdapter {
    fn tool(&self) -> ToolId {
        ToolId::Devskim
    }

    fn report_file_name(&self) -> Option<&'static str> {
        Some("devskim.sarif")
    }

    fn args(&self, invocation: &Invocation<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["analyze".into(), "-I".into(), invocation.target.into()];
        if let Some(report) = invocation.report_path {
            args.push("-O".into());
            args.push(report.into());
        }
        args.push("-f".into());
        args.push("sarif".into());
        args
    }

    fn parse(
        &self,
        run: &ToolRun,
        _invocation: &Invocation<'_>,
    ) -> Result<NativeRecords, ToolFailure> {
        let Some(raw) = run.report.as_deref().map(str::trim).filter(|r| !r.is_empty()) else {
            let mut stderr = run.output.stderr.trim().to_string();
            if stderr.contains(DOTNET_MISSING_MARKER) {
                stderr.push_str("\n.NET runtime missing: install dotnet-runtime-8.0");
            }
            return Err(ToolFailure::NoOutput {
                tool: ToolId::Devskim,
                exit_code: run.output.exit_code,
                stderr,
            });
        };
        let log: SarifLog = parse_json(ToolId::Devskim, raw)?;
        Ok(NativeRecords::Devskim(log))
    }
}

impl SarifResult {
    fn rule<'a>(&self, rules: &'a [SarifRule]) -> Option<&'a SarifRule> {
        self.rule_index.and_then(|idx| rules.get(idx)).or_else(|| {
            let id = self.rule_id.as_deref()?;
            rules.iter().find(|r| r.id == id)
        })
    }
}

/// Strip the `file:` scheme from an artifact URI.
fn uri_to_path(uri: &str) -> PathBuf {
    let path = uri
        .strip_prefix("file://")
        .or_else(|| uri.strip_prefix("file:"))
        .unwrap_or(uri);
    // `/C:/src/a.cs` is a Windows drive path
    let bytes = path.as_bytes();
    if bytes.len() > 2 && bytes[0] == b'/' && bytes[2] == b':' && bytes[1].is_ascii_alphabetic() {
        return PathBuf::from(&path[1..]);
    }
    PathBuf::from(path)
}

fn start_line(region: &SarifRegion, index: usize) -> Result<Option<u32>, MappingError> {
    match &region.start_line {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => parse_line(Some(s.as_str()), index, "region.startLine"),
        Some(other) => parse_line(Some(other.to_string().as_str()), index, "region.startLine"),
    }
}

pub(crate) fn map(log: &SarifLog, target: &Path) -> Result<Vec<NativeFinding>, MappingError> {
    let mut findings = Vec::new();
    let mut index = 0;
    for run in &log.runs {
        let rules = &run.tool.driver.rules;
        for result in &run.results {
            let rule = result.rule(rules);
            // result level, then the rule's default, then SARIF's implicit "note"
            let level = result
                .level
                .as_deref()
                .or_else(|| {
                    rule.and_then(|r| r.default_configuration.as_ref())
                        .and_then(|c| c.level.as_deref())
                })
                .unwrap_or("note");
            let rule_id = result.rule_id.clone().unwrap_or_default();
            let message = non_empty(result.message.as_ref().and_then(|m| m.text.as_deref()))
                .or_else(|| {
                    rule.and_then(|r| r.short_description.as_ref())
                        .and_then(|d| non_empty(d.text.as_deref()))
                })
                .unwrap_or_default();

            let physical = result
                .locations
                .first()
                .and_then(|loc| loc.physical_location.as_ref());
            let file = physical
                .and_then(|p| p.artifact_location.as_ref())
                .and_then(|a| non_empty(a.uri.as_deref()))
                .map_or_else(|| target.to_path_buf(), uri_to_path);
            let region = physical.and_then(|p| p.region.as_ref());
            let line = match region {
                Some(region) => start_line(region, index)?,
                None => None,
            };
            let snippet = region
                .and_then(|r| r.snippet.as_ref())
                .and_then(|s| non_empty(s.text.as_deref()))
                .map(str::to_string);

            findings.push(NativeFinding {
                file,
                line,
                severity: RawSeverity::label(level),
                description: format!("({rule_id}) {message}"),
                rule_code: rule_id,
                snippet,
            });
            index += 1;
        }
    }
    Ok(findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::language::Language;
    use crate::services::exec::ToolOutput;

    fn invocation<'a>(target: &'a Path, report: Option<&'a Path>) -> Invocation<'a> {
        Invocation {
            target,
            language: Language::CSharp,
            report_path: report,
        }
    }

    #[test]
    fn writes_sarif_to_report_path() {
        let report = Path::new("/tmp/x/devskim.sarif");
        let args: Vec<String> = DevskimAdapter
            .args(&invocation(Path::new("Program.cs"), Some(report)))
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec!["analyze", "-I", "Program.cs", "-O", "/tmp/x/devskim.sarif", "-f", "sarif"]
        );
    }

    #[test]
    fn maps_results_with_rule_fallbacks() {
        let run = ToolRun {
            output: ToolOutput {
                exit_code: Some(0),
                ..Default::default()
            },
            report: Some(include_str!("../../tests/fixtures/devskim.sarif").to_string()),
        };
        let target = Path::new("src/Program.cs");
        let records = DevskimAdapter.parse(&run, &invocation(target, None)).unwrap();
        assert_eq!(records.len(), 3);

        let findings = records.map_findings(target).unwrap();
        assert_eq!(findings[0].severity, RawSeverity::label("error"));
        assert_eq!(findings[0].file, PathBuf::from("/home/dev/shop/src/Program.cs"));
        assert_eq!(findings[0].line, Some(31));
        assert_eq!(
            findings[0].description,
            "(DS126858) Weak/Broken Hash Algorithm"
        );
        assert_eq!(
            findings[0].snippet.as_deref(),
            Some("var md5 = MD5.Create();")
        );
        // level comes from the rule's defaultConfiguration
        assert_eq!(findings[1].severity, RawSeverity::label("warning"));
        // neither result nor rule carry a level
        assert_eq!(findings[2].severity, RawSeverity::label("note"));
        assert_eq!(findings[2].description, "(DS176209) Suspicious comment");
    }

    #[test]
    fn missing_report_mentions_dotnet_runtime() {
        let run = ToolRun {
            output: ToolOutput {
                stderr: "You must install .NET to run this application.\n.NET location: Not found".to_string(),
                exit_code: Some(150),
                ..Default::default()
            },
            report: None,
        };
        let err = DevskimAdapter
            .parse(&run, &invocation(Path::new("a.cs"), None))
            .unwrap_err();
        assert!(err.to_string().contains("install dotnet-runtime-8.0"));
    }

    #[test]
    fn strips_file_scheme() {
        assert_eq!(uri_to_path("file:///home/a.cs"), PathBuf::from("/home/a.cs"));
        assert_eq!(uri_to_path("file:/home/a.cs"), PathBuf::from("/home/a.cs"));
        assert_eq!(uri_to_path("file:///C:/src/a.cs"), PathBuf::from("C:/src/a.cs"));
        assert_eq!(uri_to_path("src/a.cs"), PathBuf::from("src/a.cs"));
    }
}
