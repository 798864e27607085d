//! Adapter registry: runs one tool against one file and captures the outcome
//! as a [`RawToolResult`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::ScanConfig;
use crate::models::language::Language;
use crate::models::tool::ToolId;
use crate::models::tool_result::{RawToolResult, ToolFailure};
use crate::parsers::bandit::BanditAdapter;
use crate::parsers::cppcheck::CppcheckAdapter;
use crate::parsers::devskim::DevskimAdapter;
use crate::parsers::eslint::EslintAdapter;
use crate::parsers::flawfinder::FlawfinderAdapter;
use crate::parsers::jshint::JshintAdapter;
use crate::parsers::phpcs::PhpcsAdapter;
use crate::parsers::pmd::PmdAdapter;
use crate::parsers::pylint::PylintAdapter;
use crate::parsers::semgrep::SemgrepAdapter;
use crate::parsers::spotbugs::SpotbugsAdapter;
use crate::parsers::{Invocation, NativeRecords, ToolAdapter, ToolRun};
use crate::services::exec::{display_command, run_command, ExecError};

/// Every known tool mapped to its adapter, plus the executables and timeout
/// used to launch them.
pub struct AdapterRegistry {
    adapters: BTreeMap<ToolId, Box<dyn ToolAdapter>>,
    programs: BTreeMap<ToolId, PathBuf>,
    timeout: Duration,
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("tools", &self.adapters.keys().collect::<Vec<_>>())
            .field("programs", &self.programs)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl AdapterRegistry {
    /// Registry with the standard adapter for every [`ToolId`].
    pub fn standard(config: &ScanConfig) -> Self {
        let adapters: Vec<Box<dyn ToolAdapter>> = vec![
            Box::new(BanditAdapter),
            Box::new(SemgrepAdapter),
            Box::new(PylintAdapter),
            Box::new(EslintAdapter),
            Box::new(JshintAdapter),
            Box::new(SpotbugsAdapter),
            Box::new(PmdAdapter),
            Box::new(CppcheckAdapter),
            Box::new(FlawfinderAdapter),
            Box::new(PhpcsAdapter),
            Box::new(DevskimAdapter),
        ];
        Self {
            adapters: adapters.into_iter().map(|a| (a.tool(), a)).collect(),
            programs: ToolId::ALL
                .iter()
                .map(|tool| (*tool, config.program_for(*tool)))
                .collect(),
            timeout: config.tool_timeout,
        }
    }

    pub fn adapter(&self, tool: ToolId) -> Option<&dyn ToolAdapter> {
        self.adapters.get(&tool).map(|a| a.as_ref())
    }

    /// Executable launched for `tool`.
    pub fn program(&self, tool: ToolId) -> PathBuf {
        self.programs
            .get(&tool)
            .cloned()
            .unwrap_or_else(|| PathBuf::from(tool.as_str()))
    }

    /// Run `tool` on `target`. Never fails: every problem becomes
    /// [`RawToolResult::Failed`].
    pub async fn run(&self, tool: ToolId, target: &Path, language: Language) -> RawToolResult {
        let Some(adapter) = self.adapter(tool) else {
            return RawToolResult::Failed(ToolFailure::Unsupported {
                tool,
                reason: "no adapter registered".to_string(),
            });
        };
        let result = self.execute(adapter, target, language).await;
        match &result {
            Ok(records) => tracing::debug!(
                tool = %tool,
                file = %target.display(),
                records = records.len(),
                "Analyzer finished"
            ),
            Err(failure) => tracing::warn!(
                tool = %tool,
                file = %target.display(),
                error = %failure,
                "Analyzer failed"
            ),
        }
        result.into()
    }

    async fn execute(
        &self,
        adapter: &dyn ToolAdapter,
        target: &Path,
        language: Language,
    ) -> Result<NativeRecords, ToolFailure> {
        let tool = adapter.tool();
        adapter.preflight(&Invocation {
            target,
            language,
            report_path: None,
        })?;

        // Removed when dropped, on every return path below.
        let scratch = match adapter.report_file_name() {
            Some(name) => {
                let dir = tempfile::Builder::new()
                    .prefix("sastscan-")
                    .tempdir()
                    .map_err(|e| ToolFailure::Launch {
                        tool,
                        message: format!("cannot create report directory: {e}"),
                    })?;
                let report = dir.path().join(name);
                Some((dir, report))
            }
            None => None,
        };
        let invocation = Invocation {
            target,
            language,
            report_path: scratch.as_ref().map(|(_, report)| report.as_path()),
        };

        let program = self.program(tool);
        let args = adapter.args(&invocation);
        tracing::info!(
            tool = %tool,
            command = %display_command(&program, &args),
            "Running analyzer"
        );
        let output = run_command(&program, &args, self.timeout)
            .await
            .map_err(|e| exec_failure(tool, e))?;
        if !output.stderr.trim().is_empty() {
            tracing::debug!(tool = %tool, stderr = %output.stderr.trim(), "Analyzer stderr");
        }

        let report = match invocation.report_path {
            Some(path) => read_report(path).await,
            None => None,
        };
        adapter.parse(&ToolRun { output, report }, &invocation)
    }
}

fn exec_failure(tool: ToolId, error: ExecError) -> ToolFailure {
    match error {
        ExecError::NotFound { program } => ToolFailure::Missing {
            tool,
            program: program.display().to_string(),
        },
        ExecError::TimedOut { timeout, .. } => ToolFailure::TimedOut { tool, timeout },
        ExecError::Launch { source, .. } => ToolFailure::Launch {
            tool,
            message: source.to_string(),
        },
    }
}

/// Contents of a report file, `None` when the tool did not write one.
async fn read_report(path: &Path) -> Option<String> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "No report file written");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_covers_every_tool() {
        let registry = AdapterRegistry::standard(&ScanConfig::default());
        for tool in ToolId::ALL {
            let adapter = registry.adapter(tool).unwrap();
            assert_eq!(adapter.tool(), tool);
        }
    }

    #[tokio::test]
    async fn missing_executable_is_missing_failure() {
        let mut config = ScanConfig::default();
        config
            .tool_overrides
            .insert(ToolId::Pylint, PathBuf::from("/nonexistent/bin/pylint"));
        let registry = AdapterRegistry::standard(&config);
        let result = registry
            .run(ToolId::Pylint, Path::new("a.py"), Language::Python)
            .await;
        let failure = result.failure().unwrap();
        assert!(failure.is_missing());
        assert_eq!(failure.tool(), ToolId::Pylint);
    }

    #[tokio::test]
    async fn spotbugs_is_refused_without_launch() {
        let registry = AdapterRegistry::standard(&ScanConfig::default());
        let result = registry
            .run(ToolId::Spotbugs, Path::new("Acct.java"), Language::Java)
            .await;
        assert!(matches!(
            result.failure(),
            Some(ToolFailure::Unsupported { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn report_directory_is_removed_after_run() {
        use std::os::unix::fs::PermissionsExt;

        let bin = tempfile::tempdir().unwrap();
        let log = bin.path().join("report-path");
        let script = bin.path().join("fake-bandit");
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\nwhile [ $# -gt 0 ]; do\n  if [ \"$1\" = \"-o\" ]; then shift; echo \"$1\" > {log}; echo '{{\"results\": []}}' > \"$1\"; fi\n  shift\ndone\nexit 0\n",
                log = log.display()
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut config = ScanConfig::default();
        config.tool_overrides.insert(ToolId::Bandit, script);
        let registry = AdapterRegistry::standard(&config);
        let result = registry
            .run(ToolId::Bandit, Path::new("a.py"), Language::Python)
            .await;
        assert!(!result.is_failed(), "{result:?}");

        let report = std::fs::read_to_string(&log).unwrap();
        let report = Path::new(report.trim());
        assert!(report.ends_with("bandit.json"));
        assert!(!report.exists());
        assert!(!report.parent().unwrap().exists());
    }
}
