//! Report aggregation and rendering.
//!
//! Findings of every analysed file are normalized, de-duplicated by
//! fingerprint and ranked by severity, then substituted into an HTML template
//! and written to a timestamped file.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Local};
use quick_xml::escape::escape;
use regex::Regex;

use crate::errors::AppError;
use crate::models::finding::{Finding, SeverityCounts};
use crate::models::session::{ScanSession, ScanTarget};
use crate::services::normalizer::normalize;

/// Template bundled into the binary.
const EMBEDDED_TEMPLATE: &str = include_str!("../../templates/report.html");

/// Longest sanitized target name used in a report file name.
const MAX_NAME_LEN: usize = 50;

/// Where the report template comes from.
pub trait TemplateSource: Send + Sync {
    fn load(&self) -> Result<String, AppError>;
}

/// Template read from disk at render time.
#[derive(Debug, Clone)]
pub struct FileTemplate(pub PathBuf);

impl TemplateSource for FileTemplate {
    fn load(&self) -> Result<String, AppError> {
        std::fs::read_to_string(&self.0).map_err(|e| {
            AppError::ReportTemplate(format!("cannot read {}: {e}", self.0.display()))
        })
    }
}

/// The template shipped with sastscan.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedTemplate;

impl TemplateSource for EmbeddedTemplate {
    fn load(&self) -> Result<String, AppError> {
        Ok(EMBEDDED_TEMPLATE.to_string())
    }
}

/// All findings of a session with their severity counts.
#[derive(Debug, Clone, Default)]
pub struct Aggregate {
    /// Ranked high to low, then by file and line.
    pub findings: Vec<Finding>,
    pub counts: SeverityCounts,
}

/// Values substituted into the template.
#[derive(Debug, Clone)]
pub struct Report<'a> {
    pub target_name: String,
    pub scan_date: DateTime<Local>,
    pub aggregate: &'a Aggregate,
}

/// A written report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportArtifact {
    pub path: PathBuf,
    pub counts: SeverityCounts,
}

/// Normalize and rank every finding in `session`.
///
/// Only identical findings collapse: the fingerprint alone does not tell
/// apart two messages of one rule on the same line.
pub fn aggregate(session: &ScanSession) -> Aggregate {
    let mut seen = HashSet::new();
    let mut findings = Vec::new();
    for (path, analysis) in &session.files {
        for finding in normalize(path, &analysis.results, analysis.language) {
            let key = (
                finding.fingerprint.clone(),
                finding.description.clone(),
                finding.snippet.clone(),
            );
            if seen.insert(key) {
                findings.push(finding);
            }
        }
    }
    findings.sort_by(|a, b| {
        a.severity
            .cmp(&b.severity)
            .then_with(|| a.file.cmp(&b.file))
            .then_with(|| a.line.cmp(&b.line))
    });
    let counts = findings.iter().collect();
    tracing::info!(
        files = session.files.len(),
        findings = findings.len(),
        "Aggregated findings"
    );
    Aggregate { findings, counts }
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{(file_name|scan_date|total_issues|critical|high|medium|low|results_rows)\}")
            .expect("placeholder regex must compile")
    })
}

fn unsafe_name_chars() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"[<>:"/\\|?*\s]+"#)
            .expect("file name regex must compile")
    })
}

/// Substitute every placeholder in one pass, so inserted text is never
/// itself expanded.
pub fn render(template: &str, report: &Report<'_>) -> String {
    let counts = &report.aggregate.counts;
    placeholder_pattern()
        .replace_all(template, |caps: &regex::Captures<'_>| match &caps[1] {
            "file_name" => escape(report.target_name.as_str()).into_owned(),
            "scan_date" => report.scan_date.format("%Y-%m-%d %H:%M:%S").to_string(),
            "total_issues" => counts.total().to_string(),
            "critical" => counts.critical.to_string(),
            "high" => counts.high.to_string(),
            "medium" => counts.medium.to_string(),
            "low" => counts.low.to_string(),
            _ => results_rows(&report.aggregate.findings),
        })
        .into_owned()
}

/// One `<tr>` per finding, every field HTML-escaped.
pub fn results_rows(findings: &[Finding]) -> String {
    if findings.is_empty() {
        return "<tr><td colspan=\"6\">No issues found.</td></tr>".to_string();
    }
    let mut rows = String::new();
    for finding in findings {
        let file = finding
            .file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| finding.file.display().to_string());
        let line = finding
            .line
            .map_or_else(|| "N/A".to_string(), |l| l.to_string());
        let severity = finding.severity;
        let _ = write!(
            rows,
            "<tr><td title=\"{path}\">{file}</td><td>{line}</td>\
             <td><span class=\"badge badge-{class}\">{title}</span></td>\
             <td>{tool}</td><td>{description}</td><td><code>{rule}</code>",
            path = escape(finding.file.display().to_string().as_str()),
            file = escape(file.as_str()),
            class = severity.as_str(),
            title = severity.title(),
            tool = finding.source_tool.display_name(),
            description = escape(finding.description.as_str()),
            rule = escape(finding.rule_code.as_str()),
        );
        if let Some(snippet) = &finding.snippet {
            let _ = write!(rows, "<pre>{}</pre>", escape(snippet.as_str()));
        }
        rows.push_str("</td></tr>\n");
    }
    rows
}

/// Name of the scan target shown in the report and used in its file name.
pub fn target_name(session: &ScanSession) -> String {
    match &session.target {
        ScanTarget::File(path) => base_name(path),
        ScanTarget::Directory(path) => {
            let name = base_name(path);
            let analyzed = session.analyzed();
            if analyzed == session.candidates {
                format!("{name} ({analyzed} files)")
            } else {
                format!("{name} ({analyzed}/{} analyzed)", session.candidates)
            }
        }
    }
}

fn base_name(path: &Path) -> String {
    std::fs::canonicalize(path)
        .ok()
        .as_deref()
        .and_then(Path::file_name)
        .or_else(|| path.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// File-system safe form of a target name, at most 50 characters.
pub fn sanitize(name: &str) -> String {
    unsafe_name_chars()
        .replace_all(name, "_")
        .chars()
        .take(MAX_NAME_LEN)
        .collect()
}

/// `sast_report_<target>_<YYYYMMDDHHMMSS>.html`.
pub fn report_file_name(target_name: &str, now: DateTime<Local>) -> String {
    format!(
        "sast_report_{}_{}.html",
        sanitize(target_name),
        now.format("%Y%m%d%H%M%S")
    )
}

/// Aggregate `session`, render it with `template` and write the result under
/// `reports_dir`.
pub fn write_report(
    session: &ScanSession,
    template: &dyn TemplateSource,
    reports_dir: &Path,
    now: DateTime<Local>,
) -> Result<ReportArtifact, AppError> {
    let aggregate = aggregate(session);
    let template = template.load()?;
    let target_name = target_name(session);
    let html = render(
        &template,
        &Report {
            target_name: target_name.clone(),
            scan_date: now,
            aggregate: &aggregate,
        },
    );

    std::fs::create_dir_all(reports_dir).map_err(|source| AppError::ReportWrite {
        path: reports_dir.to_path_buf(),
        source,
    })?;
    let path = reports_dir.join(report_file_name(&target_name, now));
    std::fs::write(&path, html).map_err(|source| AppError::ReportWrite {
        path: path.clone(),
        source,
    })?;
    tracing::info!(path = %path.display(), total = aggregate.counts.total(), "Report written");

    Ok(ReportArtifact {
        path,
        counts: aggregate.counts,
    })
}
