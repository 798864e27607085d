use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::tool::ToolId;

/// Scan configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub reports_dir: PathBuf,
    /// Report template; the bundled template is used when unset.
    pub template: Option<PathBuf>,
    /// Files analysed concurrently. Always at least 1.
    pub workers: usize,
    pub probe_timeout: Duration,
    pub tool_timeout: Duration,
    /// Per-tool executable overrides from `SASTSCAN_TOOL_<NAME>`.
    pub tool_overrides: BTreeMap<ToolId, PathBuf>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            reports_dir: PathBuf::from("reports"),
            template: None,
            workers: 4,
            probe_timeout: Duration::from_secs(10),
            tool_timeout: Duration::from_secs(300),
            tool_overrides: BTreeMap::new(),
        }
    }
}

impl ScanConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup. Unparseable values fall
    /// back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let tool_overrides = ToolId::ALL
            .iter()
            .filter_map(|tool| {
                lookup(&tool.env_override_key())
                    .filter(|v| !v.trim().is_empty())
                    .map(|v| (*tool, PathBuf::from(v)))
            })
            .collect();

        Self {
            reports_dir: lookup("SASTSCAN_REPORTS_DIR")
                .unwrap_or_else(|| "reports".to_string())
                .into(),
            template: lookup("SASTSCAN_TEMPLATE")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            workers: lookup("SASTSCAN_WORKERS")
                .unwrap_or_else(|| "4".to_string())
                .parse::<usize>()
                .unwrap_or(4)
                .max(1),
            probe_timeout: Duration::from_secs(
                lookup("SASTSCAN_PROBE_TIMEOUT_SECS")
                    .unwrap_or_else(|| "10".to_string())
                    .parse()
                    .unwrap_or(10),
            ),
            tool_timeout: Duration::from_secs(
                lookup("SASTSCAN_TOOL_TIMEOUT_SECS")
                    .unwrap_or_else(|| "300".to_string())
                    .parse()
                    .unwrap_or(300),
            ),
            tool_overrides,
        }
    }

    /// Executable to launch for `tool`.
    ///
    /// An override wins; DevSkim is looked up in the dotnet global tools
    /// directory before `PATH`.
    pub fn program_for(&self, tool: ToolId) -> PathBuf {
        if let Some(program) = self.tool_overrides.get(&tool) {
            return program.clone();
        }
        if tool == ToolId::Devskim {
            if let Some(installed) = dirs::home_dir()
                .map(|home| home.join(".dotnet").join("tools").join("devskim"))
                .filter(|path| path.is_file())
            {
                return installed;
            }
        }
        PathBuf::from(tool.as_str())
    }
}
