//! Closed registry of the external analyzers sastscan knows how to drive.

use std::fmt;

/// Identifier of one external analysis tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ToolId {
    Bandit,
    Semgrep,
    Pylint,
    Eslint,
    Jshint,
    Spotbugs,
    Pmd,
    Cppcheck,
    Flawfinder,
    Phpcs,
    Devskim,
}

impl ToolId {
    pub const ALL: [ToolId; 11] = [
        Self::Bandit,
        Self::Semgrep,
        Self::Pylint,
        Self::Eslint,
        Self::Jshint,
        Self::Spotbugs,
        Self::Pmd,
        Self::Cppcheck,
        Self::Flawfinder,
        Self::Phpcs,
        Self::Devskim,
    ];

    /// Lowercase identifier, also the default executable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bandit => "bandit",
            Self::Semgrep => "semgrep",
            Self::Pylint => "pylint",
            Self::Eslint => "eslint",
            Self::Jshint => "jshint",
            Self::Spotbugs => "spotbugs",
            Self::Pmd => "pmd",
            Self::Cppcheck => "cppcheck",
            Self::Flawfinder => "flawfinder",
            Self::Phpcs => "phpcs",
            Self::Devskim => "devskim",
        }
    }

    /// Name shown in reports.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Bandit => "Bandit",
            Self::Semgrep => "Semgrep",
            Self::Pylint => "Pylint",
            Self::Eslint => "ESLint",
            Self::Jshint => "JSHint",
            Self::Spotbugs => "SpotBugs",
            Self::Pmd => "PMD",
            Self::Cppcheck => "Cppcheck",
            Self::Flawfinder => "Flawfinder",
            Self::Phpcs => "PHPCS",
            Self::Devskim => "DevSkim",
        }
    }

    /// Arguments of the lightweight availability probe.
    ///
    /// `None` means the tool has no standard version flag and is assumed
    /// available without probing.
    pub fn probe_args(&self) -> Option<&'static [&'static str]> {
        match self {
            Self::Bandit => Some(&["-h"]),
            Self::Spotbugs => None,
            _ => Some(&["--version"]),
        }
    }

    /// Environment variable that overrides this tool's executable path.
    pub fn env_override_key(&self) -> String {
        format!("SASTSCAN_TOOL_{}", self.as_str().to_uppercase())
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
