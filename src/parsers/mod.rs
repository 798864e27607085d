//! Tool adapters: command construction and native output parsing for every
//! supported analyzer.
//!
//! Each adapter implements [`ToolAdapter`], turning captured tool output
//! (JSON, Checkstyle XML, cppcheck XML, CSV, SARIF) into [`NativeRecords`].
//! Records are mapped to [`NativeFinding`]s later, by the normalizer.

pub mod bandit;
pub mod cppcheck;
pub mod devskim;
pub mod eslint;
pub mod flawfinder;
pub mod jshint;
pub mod phpcs;
pub mod pmd;
pub mod pylint;
pub mod semgrep;
pub mod spotbugs;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use quick_xml::events::BytesStart;
use serde::de::DeserializeOwned;

use crate::models::finding::RawSeverity;
use crate::models::language::Language;
use crate::models::tool::ToolId;
use crate::models::tool_result::ToolFailure;
use crate::services::exec::ToolOutput;

/// Longest raw-output excerpt attached to a parse failure.
const EXCERPT_LEN: usize = 200;

/// Everything an adapter needs to build and interpret one invocation.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub target: &'a Path,
    pub language: Language,
    /// Where the tool was told to write its report, if the adapter uses one.
    pub report_path: Option<&'a Path>,
}

/// Captured result of one finished tool process.
#[derive(Debug, Clone, Default)]
pub struct ToolRun {
    pub output: ToolOutput,
    /// Contents of the report file, when the adapter asked for one and the
    /// tool wrote it.
    pub report: Option<String>,
}

/// Trait for the fixed set of external analyzer adapters.
pub trait ToolAdapter: Send + Sync {
    /// The tool this adapter drives.
    fn tool(&self) -> ToolId;

    /// File name of the report the tool writes instead of printing, if any.
    fn report_file_name(&self) -> Option<&'static str> {
        None
    }

    /// Reject an invocation up front, without launching a process.
    fn preflight(&self, _invocation: &Invocation<'_>) -> Result<(), ToolFailure> {
        Ok(())
    }

    /// Command-line arguments for `invocation`. Deterministic.
    fn args(&self, invocation: &Invocation<'_>) -> Vec<OsString>;

    /// Parse captured output into native records.
    fn parse(&self, run: &ToolRun, invocation: &Invocation<'_>)
        -> Result<NativeRecords, ToolFailure>;
}

/// Tool-native record sets, one variant per output shape.
#[derive(Debug)]
pub enum NativeRecords {
    Bandit(Vec<bandit::BanditIssue>),
    Semgrep(Vec<semgrep::SemgrepResult>),
    Pylint(Vec<pylint::PylintMessage>),
    Eslint(Vec<eslint::EslintFileResult>),
    Jshint(Vec<jshint::CheckstyleError>),
    Pmd(pmd::PmdReport),
    Cppcheck(Vec<cppcheck::CppcheckError>),
    Flawfinder(Vec<flawfinder::FlawfinderHit>),
    Phpcs(phpcs::PhpcsReport),
    Devskim(devskim::SarifLog),
}

impl NativeRecords {
    /// Number of native records (issues) carried.
    pub fn len(&self) -> usize {
        match self {
            Self::Bandit(issues) => issues.len(),
            Self::Semgrep(results) => results.len(),
            Self::Pylint(messages) => messages.len(),
            Self::Eslint(files) => files.iter().map(|f| f.messages.len()).sum(),
            Self::Jshint(errors) => errors.len(),
            Self::Pmd(report) => report.files.iter().map(|f| f.violations.len()).sum(),
            Self::Cppcheck(errors) => errors.len(),
            Self::Flawfinder(hits) => hits.len(),
            Self::Phpcs(report) => report.files.values().map(|f| f.messages.len()).sum(),
            Self::Devskim(log) => log.runs.iter().map(|r| r.results.len()).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply the tool-specific field mapping to every record.
    ///
    /// `target` is the scanned file, used when a record omits its path.
    pub fn map_findings(&self, target: &Path) -> Result<Vec<NativeFinding>, MappingError> {
        match self {
            Self::Bandit(issues) => bandit::map(issues, target),
            Self::Semgrep(results) => semgrep::map(results, target),
            Self::Pylint(messages) => pylint::map(messages, target),
            Self::Eslint(files) => eslint::map(files, target),
            Self::Jshint(errors) => jshint::map(errors, target),
            Self::Pmd(report) => pmd::map(report, target),
            Self::Cppcheck(errors) => cppcheck::map(errors, target),
            Self::Flawfinder(hits) => flawfinder::map(hits, target),
            Self::Phpcs(report) => phpcs::map(report, target),
            Self::Devskim(log) => devskim::map(log, target),
        }
    }
}

/// One tool record with canonical field names but the tool's own severity.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeFinding {
    pub file: PathBuf,
    pub line: Option<u32>,
    pub severity: RawSeverity,
    pub description: String,
    pub rule_code: String,
    pub snippet: Option<String>,
}

/// A native record that could not be mapped to canonical fields.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("record {record_index}: invalid {field}: {message}")]
pub struct MappingError {
    pub record_index: usize,
    pub field: String,
    pub message: String,
}

/// First characters of raw output, for diagnostics.
pub fn excerpt(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.char_indices().nth(EXCERPT_LEN) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

/// Deserialize JSON tool output, converting errors into a parse failure.
pub(crate) fn parse_json<T: DeserializeOwned>(tool: ToolId, raw: &str) -> Result<T, ToolFailure> {
    serde_json::from_str(raw).map_err(|e| ToolFailure::Parse {
        tool,
        reason: format!("invalid JSON: {e}"),
        excerpt: excerpt(raw),
    })
}

/// Stream content for tools that always print a document.
///
/// Empty output is a failure whatever the exit code.
pub(crate) fn require_stream<'a>(
    tool: ToolId,
    stream: &'a str,
    output: &ToolOutput,
) -> Result<&'a str, ToolFailure> {
    let trimmed = stream.trim();
    if trimmed.is_empty() {
        return Err(no_output(tool, output));
    }
    Ok(trimmed)
}

/// Stream content for tools that may print nothing on a clean run.
///
/// Empty output with exit 0 yields `None`; empty output with any other exit
/// code is a failure.
pub(crate) fn optional_stream<'a>(
    tool: ToolId,
    stream: &'a str,
    output: &ToolOutput,
) -> Result<Option<&'a str>, ToolFailure> {
    let trimmed = stream.trim();
    if !trimmed.is_empty() {
        return Ok(Some(trimmed));
    }
    if output.success() {
        Ok(None)
    } else {
        Err(no_output(tool, output))
    }
}

pub(crate) fn no_output(tool: ToolId, output: &ToolOutput) -> ToolFailure {
    ToolFailure::NoOutput {
        tool,
        exit_code: output.exit_code,
        stderr: output.stderr.clone(),
    }
}

/// Parse a line number carried as text. Empty and `0` mean "no line".
pub(crate) fn parse_line(
    value: Option<&str>,
    record_index: usize,
    field: &str,
) -> Result<Option<u32>, MappingError> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    raw.parse::<u32>()
        .map(|line| (line > 0).then_some(line))
        .map_err(|e| MappingError {
            record_index,
            field: field.to_string(),
            message: format!("'{raw}' is not a line number: {e}"),
        })
}

/// Whether two paths name the same file, resolving symlinks when both exist.
pub(crate) fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Read and unescape one attribute of an XML element.
pub(crate) fn xml_attribute(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, String> {
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|e| e.to_string())?;
        if attribute.key.as_ref() != name {
            continue;
        }
        let raw = std::str::from_utf8(&attribute.value).map_err(|e| e.to_string())?;
        let value = quick_xml::escape::unescape(raw).map_err(|e| e.to_string())?;
        return Ok(Some(value.into_owned()));
    }
    Ok(None)
}

/// `Some(s)` for non-blank strings.
pub(crate) fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}
