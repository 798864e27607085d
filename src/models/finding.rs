//! Canonical finding model and the severity vocabulary shared by all tools.

use std::fmt;
use std::path::PathBuf;

use crate::models::tool::ToolId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    /// Canonicalize a textual severity label.
    ///
    /// Matching is case-insensitive. All-digit labels are read as numeric
    /// levels. Unknown and empty labels fall to `Low`.
    pub fn from_label(label: &str) -> Self {
        let lowered = label.trim().to_lowercase();
        match lowered.as_str() {
            "critical" | "fatal" | "blocker" | "error" | "high" => Self::High,
            "medium" | "warning" | "major" | "serious" => Self::Medium,
            digits if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => digits
                .parse::<i64>()
                .map(Self::from_level)
                .unwrap_or(Self::Low),
            _ => Self::Low,
        }
    }

    /// Canonicalize a numeric level where lower numbers are more severe.
    pub fn from_level(level: i64) -> Self {
        if level <= 2 {
            Self::High
        } else if level <= 3 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Lowercase label, also used as the CSS class in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Capitalized label for display.
    pub fn title(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity as a tool reported it, before canonicalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawSeverity {
    Label(String),
    Level(i64),
    Missing,
}

impl RawSeverity {
    pub fn label(value: impl Into<String>) -> Self {
        Self::Label(value.into())
    }

    /// Wrap an optional label, treating `None` as missing.
    pub fn from_option(value: Option<&str>) -> Self {
        value.map_or(Self::Missing, |v| Self::Label(v.to_string()))
    }
}

/// Map any tool-reported severity onto the canonical three levels.
///
/// Total: every input, including a missing or malformed value, yields a level.
pub fn normalize_severity(raw: &RawSeverity) -> Severity {
    match raw {
        RawSeverity::Label(label) => Severity::from_label(label),
        RawSeverity::Level(level) => Severity::from_level(*level),
        RawSeverity::Missing => Severity::Low,
    }
}

/// One normalized issue reported by one tool.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub file: PathBuf,
    pub line: Option<u32>,
    pub severity: Severity,
    pub description: String,
    pub rule_code: String,
    pub source_tool: ToolId,
    pub snippet: Option<String>,
    pub fingerprint: String,
}

/// Per-severity counts shown in the report header.
///
/// `critical` is part of the report contract but no normalization rule
/// produces it, so it stays at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityCounts {
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low
    }
}

impl<'a> FromIterator<&'a Finding> for SeverityCounts {
    fn from_iter<I: IntoIterator<Item = &'a Finding>>(iter: I) -> Self {
        let mut counts = Self::default();
        for finding in iter {
            counts.record(finding.severity);
        }
        counts
    }
}
