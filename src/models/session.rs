//! Working state of one scan run.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::models::language::Language;
use crate::models::tool::ToolId;
use crate::models::tool_result::RawToolResult;

/// What the user asked to scan.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanTarget {
    File(PathBuf),
    Directory(PathBuf),
}

impl ScanTarget {
    pub fn path(&self) -> &Path {
        match self {
            Self::File(path) | Self::Directory(path) => path,
        }
    }
}

/// Tool results for one analysed file.
#[derive(Debug)]
pub struct FileAnalysis {
    pub language: Language,
    pub results: BTreeMap<ToolId, RawToolResult>,
}

/// Outcome of scanning a single file.
#[derive(Debug)]
pub enum FileScan {
    /// No registered language claims the file.
    Unclassified,
    /// The language is known but a required tool is missing.
    Blocked(Language),
    Analyzed(FileAnalysis),
}

/// Accumulated per-file results of one scan.
#[derive(Debug)]
pub struct ScanSession {
    pub target: ScanTarget,
    pub files: BTreeMap<PathBuf, FileAnalysis>,
    pub language_counts: BTreeMap<Language, usize>,
    pub blocked: BTreeSet<PathBuf>,
    /// Classified files found under the target.
    pub candidates: usize,
    pub cancelled: bool,
}

impl ScanSession {
    pub fn new(target: ScanTarget) -> Self {
        Self {
            target,
            files: BTreeMap::new(),
            language_counts: BTreeMap::new(),
            blocked: BTreeSet::new(),
            candidates: 0,
            cancelled: false,
        }
    }

    /// Merge one file's outcome into the session.
    pub fn record(&mut self, path: PathBuf, scan: FileScan) {
        match scan {
            FileScan::Unclassified => {}
            FileScan::Blocked(_) => {
                self.blocked.insert(path);
            }
            FileScan::Analyzed(analysis) => {
                *self.language_counts.entry(analysis.language).or_insert(0) += 1;
                self.files.insert(path, analysis);
            }
        }
    }

    pub fn analyzed(&self) -> usize {
        self.files.len()
    }

    pub fn summary(&self) -> ScanSummary {
        ScanSummary {
            candidates: self.candidates,
            analyzed: self.analyzed(),
            blocked: self.blocked.len(),
            cancelled: self.cancelled,
        }
    }
}

/// End-of-run counts, kept separate from finding counts so "skipped" and
/// "clean" never look alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    pub candidates: usize,
    pub analyzed: usize,
    pub blocked: usize,
    pub cancelled: bool,
}

impl fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Analysis complete. Analyzed: {}/{}.",
            self.analyzed, self.candidates
        )?;
        if self.blocked > 0 {
            write!(f, " ({} skipped: missing tools)", self.blocked)?;
        }
        if self.cancelled {
            f.write_str(" Scan cancelled before all files were analysed.")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(language: Language) -> FileAnalysis {
        FileAnalysis {
            language,
            results: BTreeMap::new(),
        }
    }

    #[test]
    fn record_separates_blocked_from_analyzed() {
        let mut session = ScanSession::new(ScanTarget::Directory("proj".into()));
        session.candidates = 3;
        session.record("a.py".into(), FileScan::Analyzed(analysis(Language::Python)));
        session.record("b.py".into(), FileScan::Analyzed(analysis(Language::Python)));
        session.record("c.js".into(), FileScan::Blocked(Language::JavaScript));
        session.record("d.txt".into(), FileScan::Unclassified);

        assert_eq!(session.analyzed(), 2);
        assert_eq!(session.language_counts[&Language::Python], 2);
        assert!(session.blocked.contains(Path::new("c.js")));

        let summary = session.summary();
        assert_eq!(summary.blocked, 1);
        assert_eq!(
            summary.to_string(),
            "Analysis complete. Analyzed: 2/3. (1 skipped: missing tools)"
        );
    }
}
