//! Fingerprint computation for collapsing duplicate findings within a scan.
//!
//! The hash covers the identifying fields of a finding. Two tools reporting
//! the same rule at the same place stay distinct because the tool is part of
//! the input.

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::models::tool::ToolId;

/// Compute a finding fingerprint.
///
/// Inputs: tool, file, rule code, line. A missing line hashes as empty.
pub fn compute(tool: ToolId, file: &Path, rule_code: &str, line: Option<u32>) -> String {
    let line = line.map(|l| l.to_string()).unwrap_or_default();
    hash(&format!("{tool}:{}:{rule_code}:{line}", file.display()))
}

/// SHA-256 hash a string and return hex-encoded digest.
fn hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_same_fingerprint() {
        let fp1 = compute(ToolId::Bandit, Path::new("app/views.py"), "B608", Some(27));
        let fp2 = compute(ToolId::Bandit, Path::new("app/views.py"), "B608", Some(27));
        assert_eq!(fp1, fp2);
    }

    #[test]
    fn different_line_different_fingerprint() {
        let fp1 = compute(ToolId::Bandit, Path::new("app/views.py"), "B608", Some(27));
        let fp2 = compute(ToolId::Bandit, Path::new("app/views.py"), "B608", Some(28));
        assert_ne!(fp1, fp2);
    }

    #[test]
    fn different_tool_different_fingerprint() {
        let fp1 = compute(ToolId::Semgrep, Path::new("a.c"), "strcpy", Some(3));
        let fp2 = compute(ToolId::Flawfinder, Path::new("a.c"), "strcpy", Some(3));
        assert_ne!(fp1, fp2);
    }

    #[test]
    fn missing_line_differs_from_line_zero_text() {
        let none = compute(ToolId::Pylint, Path::new("a.py"), "E0602", None);
        let one = compute(ToolId::Pylint, Path::new("a.py"), "E0602", Some(1));
        assert_ne!(none, one);
    }

    #[test]
    fn fingerprint_is_hex_sha256() {
        let fp = compute(ToolId::Eslint, Path::new("file.js"), "no-eval", Some(1));
        assert_eq!(fp.len(), 64); // SHA-256 hex = 64 chars
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
