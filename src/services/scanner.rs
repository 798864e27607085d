//! Scan orchestration: file classification, directory walking and the
//! bounded worker pool that runs each file's tools.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use walkdir::{DirEntry, WalkDir};

use crate::config::ScanConfig;
use crate::errors::AppError;
use crate::models::language::Language;
use crate::models::session::{FileAnalysis, FileScan, ScanSession, ScanTarget};
use crate::services::adapters::AdapterRegistry;
use crate::services::progress::{ScanEvent, ScanObserver};
use crate::services::prober::ToolProber;

/// Directory names never descended into.
pub const EXCLUDED_DIRS: [&str; 12] = [
    ".git",
    ".svn",
    "node_modules",
    "__pycache__",
    "venv",
    "env",
    ".venv",
    "target",
    "build",
    "dist",
    ".settings",
    ".github",
];

/// Shared cancellation request, checked before each file is scanned.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives the prober and adapters over files and directory trees.
///
/// Cheap to clone; clones share the prober's memoized verdicts.
#[derive(Clone)]
pub struct Scanner {
    config: Arc<ScanConfig>,
    prober: Arc<ToolProber>,
    adapters: Arc<AdapterRegistry>,
    observer: Arc<dyn ScanObserver>,
    cancel: CancelFlag,
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl Scanner {
    pub fn new(config: ScanConfig, observer: Arc<dyn ScanObserver>, cancel: CancelFlag) -> Self {
        let adapters = AdapterRegistry::standard(&config);
        let config = Arc::new(config);
        Self {
            prober: Arc::new(ToolProber::new(config.clone(), observer.clone())),
            adapters: Arc::new(adapters),
            config,
            observer,
            cancel,
        }
    }

    pub fn prober(&self) -> &ToolProber {
        &self.prober
    }

    /// Classify `path` and, when its language's tools are available, run
    /// every tool of that language on it in order.
    pub async fn scan_file(&self, path: &Path) -> FileScan {
        match Language::classify(path) {
            Some(language) => self.scan_classified(path, language).await,
            None => FileScan::Unclassified,
        }
    }

    async fn scan_classified(&self, path: &Path, language: Language) -> FileScan {
        if !self.prober.check(language).await {
            tracing::info!(file = %path.display(), language = %language, "Skipping file: tools missing");
            self.observer.on_event(&ScanEvent::FileBlocked {
                path: path.to_path_buf(),
                language,
            });
            return FileScan::Blocked(language);
        }

        let mut results = BTreeMap::new();
        for &tool in language.tools() {
            let result = self.adapters.run(tool, path, language).await;
            results.insert(tool, result);
        }
        let analysis = FileAnalysis { language, results };
        self.observer.on_event(&ScanEvent::FileFinished {
            path: path.to_path_buf(),
            failed_tools: analysis.results.values().filter(|r| r.is_failed()).count(),
            records: analysis.results.values().map(|r| r.record_count()).sum(),
        });
        FileScan::Analyzed(analysis)
    }

    /// Session for a single file target.
    pub async fn scan_single(&self, path: &Path) -> ScanSession {
        let mut session = ScanSession::new(ScanTarget::File(path.to_path_buf()));
        let Some(language) = Language::classify(path) else {
            return session;
        };
        session.candidates = 1;
        if self.cancel.is_cancelled() {
            session.cancelled = true;
            self.observer.on_event(&ScanEvent::Cancelled { remaining: 1 });
            return session;
        }
        self.observer.on_event(&ScanEvent::FileStarted {
            path: path.to_path_buf(),
            language,
            index: 0,
            total: 1,
        });
        let scan = self.scan_classified(path, language).await;
        session.record(path.to_path_buf(), scan);
        session
    }

    /// Walk `root`, then scan every classified file on the worker pool.
    pub async fn scan_tree(&self, root: &Path) -> Result<ScanSession, AppError> {
        let walk_root = root.to_path_buf();
        let candidates = tokio::task::spawn_blocking(move || discover(&walk_root))
            .await
            .map_err(|e| AppError::Internal(format!("directory walk task failed: {e}")))??;

        let mut session = ScanSession::new(ScanTarget::Directory(root.to_path_buf()));
        session.candidates = candidates.len();
        self.observer.on_event(&ScanEvent::Discovered {
            candidates: candidates.len(),
        });
        tracing::info!(root = %root.display(), candidates = candidates.len(), "Directory walk complete");

        let total = candidates.len();
        let semaphore = Arc::new(Semaphore::new(self.config.workers.max(1)));
        let mut tasks = JoinSet::new();
        for (index, (path, language)) in candidates.into_iter().enumerate() {
            // Wait for a free worker before deciding whether to start this file.
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| AppError::Internal(format!("worker pool closed: {e}")))?;
            if self.cancel.is_cancelled() {
                session.cancelled = true;
                tracing::warn!(remaining = total - index, "Scan cancelled");
                self.observer.on_event(&ScanEvent::Cancelled {
                    remaining: total - index,
                });
                break;
            }

            let scanner = self.clone();
            tasks.spawn(async move {
                let _permit = permit;
                scanner.observer.on_event(&ScanEvent::FileStarted {
                    path: path.clone(),
                    language,
                    index,
                    total,
                });
                let scan = scanner.scan_classified(&path, language).await;
                (path, scan)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (path, scan) =
                joined.map_err(|e| AppError::Internal(format!("scan task failed: {e}")))?;
            session.record(path, scan);
        }
        Ok(session)
    }
}

fn is_excluded(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| EXCLUDED_DIRS.contains(&name))
}

/// Classified files under `root`, sorted by path, excluded directories pruned.
fn discover(root: &Path) -> Result<Vec<(PathBuf, Language)>, AppError> {
    let mut found = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_excluded(e));
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(e.into()),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable path");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(language) = Language::classify(entry.path()) {
            found.push((entry.into_path(), language));
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::progress::SilentObserver;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "x").unwrap();
    }

    #[test]
    fn discover_prunes_excluded_dirs_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "src/b.py");
        touch(dir.path(), "src/a.js");
        touch(dir.path(), "README.md");
        touch(dir.path(), "node_modules/lib/index.js");
        touch(dir.path(), "venv/lib/site.py");
        touch(dir.path(), "pkg/.git/hooks/x.py");
        touch(dir.path(), "environment/keep.php");

        let found: Vec<String> = discover(dir.path())
            .unwrap()
            .into_iter()
            .map(|(p, _)| {
                p.strip_prefix(dir.path())
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        assert_eq!(found, vec!["environment/keep.php", "src/a.js", "src/b.py"]);
    }

    #[test]
    fn excluded_name_as_root_is_still_walked() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "build/main.c");
        let found = discover(&dir.path().join("build")).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].1, Language::Cpp);
    }

    #[test]
    fn missing_root_is_an_error() {
        let err = discover(Path::new("/nonexistent/project")).unwrap_err();
        assert!(matches!(err, AppError::Walk(_)));
    }

    #[tokio::test]
    async fn unclassified_file_is_not_scanned() {
        let scanner = Scanner::new(
            ScanConfig::default(),
            Arc::new(SilentObserver),
            CancelFlag::new(),
        );
        assert!(matches!(
            scanner.scan_file(Path::new("notes.txt")).await,
            FileScan::Unclassified
        ));
        assert_eq!(scanner.prober().verdict(Language::Python), None);
    }

    #[tokio::test]
    async fn cancelled_scan_starts_no_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.py");
        touch(dir.path(), "b.py");
        let cancel = CancelFlag::new();
        cancel.cancel();
        let scanner = Scanner::new(ScanConfig::default(), Arc::new(SilentObserver), cancel);

        let session = scanner.scan_tree(dir.path()).await.unwrap();
        assert!(session.cancelled);
        assert_eq!(session.candidates, 2);
        assert_eq!(session.analyzed(), 0);
        // cancellation is checked before probing
        assert_eq!(scanner.prober().verdict(Language::Python), None);
    }
}
