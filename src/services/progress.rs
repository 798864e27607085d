//! Status reporting surface for a running scan.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::models::language::Language;
use crate::models::tool::ToolId;

/// Progress notifications emitted while scanning.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    /// Directory walk finished.
    Discovered { candidates: usize },
    /// Tool check for a language found missing or misbehaving tools.
    ToolCheck {
        language: Language,
        missing: Vec<ToolId>,
        problems: Vec<ToolId>,
    },
    FileStarted {
        path: PathBuf,
        language: Language,
        index: usize,
        total: usize,
    },
    FileBlocked { path: PathBuf, language: Language },
    FileFinished {
        path: PathBuf,
        failed_tools: usize,
        records: usize,
    },
    Cancelled { remaining: usize },
}

/// Receives [`ScanEvent`]s. Called from worker tasks, so it must be shareable.
pub trait ScanObserver: Send + Sync {
    fn on_event(&self, event: &ScanEvent);
}

/// Discards every event.
#[derive(Debug, Default)]
pub struct SilentObserver;

impl ScanObserver for SilentObserver {
    fn on_event(&self, _event: &ScanEvent) {}
}

/// Prints one status line per event to stdout.
#[derive(Debug, Default)]
pub struct ConsoleObserver;

impl ScanObserver for ConsoleObserver {
    fn on_event(&self, event: &ScanEvent) {
        println!("{}", describe(event));
    }
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ScanEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<ScanEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ScanObserver for RecordingObserver {
    fn on_event(&self, event: &ScanEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn tool_list(tools: &[ToolId]) -> String {
    tools
        .iter()
        .map(|t| t.display_name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Human-readable status line for an event.
pub fn describe(event: &ScanEvent) -> String {
    match event {
        ScanEvent::Discovered { candidates } => {
            format!("Found {candidates} supported file(s) to analyze.")
        }
        ScanEvent::ToolCheck {
            language,
            missing,
            problems,
        } => {
            let mut line = format!("Tool check for {language}:");
            if !missing.is_empty() {
                line.push_str(&format!(" missing {}.", tool_list(missing)));
            }
            if !problems.is_empty() {
                line.push_str(&format!(" problems with {}.", tool_list(problems)));
            }
            line
        }
        ScanEvent::FileStarted {
            path,
            language,
            index,
            total,
        } => format!(
            "Analyzing {}/{}: {} ({language})",
            index + 1,
            total,
            file_name(path)
        ),
        ScanEvent::FileBlocked { path, language } => format!(
            "Skipping {}: required {language} tools are missing.",
            file_name(path)
        ),
        ScanEvent::FileFinished {
            path,
            failed_tools,
            records,
        } => {
            if *failed_tools > 0 {
                format!(
                    "Finished {}: {records} raw issue(s), {failed_tools} tool(s) failed.",
                    file_name(path)
                )
            } else {
                format!("Finished {}: {records} raw issue(s).", file_name(path))
            }
        }
        ScanEvent::Cancelled { remaining } => {
            format!("Scan cancelled; {remaining} file(s) not analyzed.")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_check_lists_missing_and_problem_tools() {
        let line = describe(&ScanEvent::ToolCheck {
            language: Language::JavaScript,
            missing: vec![ToolId::Eslint],
            problems: vec![ToolId::Semgrep, ToolId::Jshint],
        });
        assert_eq!(
            line,
            "Tool check for JavaScript: missing ESLint. problems with Semgrep, JSHint."
        );
    }

    #[test]
    fn file_started_is_one_based() {
        let line = describe(&ScanEvent::FileStarted {
            path: PathBuf::from("src/app/views.py"),
            language: Language::Python,
            index: 0,
            total: 3,
        });
        assert_eq!(line, "Analyzing 1/3: views.py (Python)");
    }

    #[test]
    fn recording_observer_keeps_order() {
        let observer = RecordingObserver::default();
        observer.on_event(&ScanEvent::Discovered { candidates: 2 });
        observer.on_event(&ScanEvent::Cancelled { remaining: 1 });
        assert_eq!(
            observer.events(),
            vec![
                ScanEvent::Discovered { candidates: 2 },
                ScanEvent::Cancelled { remaining: 1 },
            ]
        );
    }
}
