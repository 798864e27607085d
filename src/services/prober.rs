//! Tool availability prober with a per-language memoized verdict.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::config::ScanConfig;
use crate::models::language::Language;
use crate::models::tool::ToolId;
use crate::parsers::excerpt;
use crate::services::exec::{run_command, ExecError};
use crate::services::progress::{ScanEvent, ScanObserver};

/// Decides once per language whether every tool it needs is installed.
pub struct ToolProber {
    config: Arc<ScanConfig>,
    observer: Arc<dyn ScanObserver>,
    verdicts: HashMap<Language, OnceCell<bool>>,
}

impl std::fmt::Debug for ToolProber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolProber")
            .field("verdicts", &self.verdicts)
            .finish_non_exhaustive()
    }
}

impl ToolProber {
    pub fn new(config: Arc<ScanConfig>, observer: Arc<dyn ScanObserver>) -> Self {
        Self {
            config,
            observer,
            verdicts: Language::ALL
                .iter()
                .map(|language| (*language, OnceCell::new()))
                .collect(),
        }
    }

    /// Whether files of `language` can be analysed.
    ///
    /// Probes run at most once per language; concurrent callers wait for the
    /// first probe and share its verdict.
    pub async fn check(&self, language: Language) -> bool {
        match self.verdicts.get(&language) {
            Some(cell) => *cell.get_or_init(|| self.probe(language)).await,
            None => self.probe(language).await,
        }
    }

    /// Memoized verdict, if `language` has been checked.
    pub fn verdict(&self, language: Language) -> Option<bool> {
        self.verdicts.get(&language).and_then(|cell| cell.get().copied())
    }

    async fn probe(&self, language: Language) -> bool {
        let mut missing = Vec::new();
        let mut problems = Vec::new();

        for (tool, program) in self.probed_tools(language) {
            let args: Vec<OsString> = tool
                .probe_args()
                .unwrap_or_default()
                .iter()
                .map(OsString::from)
                .collect();
            match run_command(&program, &args, self.config.probe_timeout).await {
                Ok(output) if output.success() => {}
                Ok(output) => {
                    tracing::warn!(
                        tool = %tool,
                        exit_code = ?output.exit_code,
                        stderr = %excerpt(&output.stderr),
                        "Tool probe exited with an error"
                    );
                    problems.push(tool);
                }
                Err(ExecError::NotFound { program }) => {
                    tracing::warn!(
                        tool = %tool,
                        program = %program.display(),
                        "Required tool not found"
                    );
                    missing.push(tool);
                }
                Err(e) => {
                    tracing::warn!(tool = %tool, error = %e, "Tool probe failed");
                    problems.push(tool);
                }
            }
        }

        if !missing.is_empty() || !problems.is_empty() {
            self.observer.on_event(&ScanEvent::ToolCheck {
                language,
                missing: missing.clone(),
                problems,
            });
        }
        let available = missing.is_empty();
        tracing::info!(language = %language, available, "Tool check complete");
        available
    }

    /// Tools of `language` the prober launches, with their executables.
    /// Tools without a probe command are assumed present and left out.
    pub fn probed_tools(&self, language: Language) -> Vec<(ToolId, PathBuf)> {
        language
            .tools()
            .iter()
            .filter(|tool| tool.probe_args().is_some())
            .map(|tool| (*tool, self.config.program_for(*tool)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::progress::RecordingObserver;

    fn prober(config: ScanConfig) -> (ToolProber, Arc<RecordingObserver>) {
        let observer = Arc::new(RecordingObserver::default());
        (ToolProber::new(Arc::new(config), observer.clone()), observer)
    }

    fn missing_everything() -> ScanConfig {
        let mut config = ScanConfig::default();
        for tool in ToolId::ALL {
            config
                .tool_overrides
                .insert(tool, PathBuf::from(format!("/nonexistent/{tool}")));
        }
        config
    }

    #[tokio::test]
    async fn missing_tool_blocks_language_and_reports() {
        let (prober, observer) = prober(missing_everything());
        assert!(!prober.check(Language::Php).await);
        assert_eq!(prober.verdict(Language::Php), Some(false));
        assert_eq!(
            observer.events(),
            vec![ScanEvent::ToolCheck {
                language: Language::Php,
                missing: vec![ToolId::Semgrep, ToolId::Phpcs],
                problems: vec![],
            }]
        );
    }

    #[tokio::test]
    async fn verdict_is_memoized() {
        let (prober, observer) = prober(missing_everything());
        assert_eq!(prober.verdict(Language::CSharp), None);
        assert!(!prober.check(Language::CSharp).await);
        assert!(!prober.check(Language::CSharp).await);
        // a second probe would have emitted a second event
        assert_eq!(observer.events().len(), 1);
    }

    #[test]
    fn spotbugs_is_never_probed() {
        let (prober, _) = prober(ScanConfig::default());
        let tools: Vec<ToolId> = prober
            .probed_tools(Language::Java)
            .into_iter()
            .map(|(tool, _)| tool)
            .collect();
        assert_eq!(tools, vec![ToolId::Semgrep, ToolId::Pmd]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_probe_is_a_problem_not_a_blocker() {
        let mut config = ScanConfig::default();
        config.tool_overrides.insert(ToolId::Semgrep, PathBuf::from("false"));
        config.tool_overrides.insert(ToolId::Phpcs, PathBuf::from("true"));
        let (prober, observer) = prober(config);
        assert!(prober.check(Language::Php).await);
        assert_eq!(
            observer.events(),
            vec![ScanEvent::ToolCheck {
                language: Language::Php,
                missing: vec![],
                problems: vec![ToolId::Semgrep],
            }]
        );
    }
}
