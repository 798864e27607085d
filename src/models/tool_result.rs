//! Per-invocation tool output: native records on success, a structured
//! failure otherwise.

use std::time::Duration;

use crate::models::tool::ToolId;
use crate::parsers::NativeRecords;

/// Outcome of running one adapter against one file.
///
/// Success with zero records is a clean run; it is distinct from `Failed`.
#[derive(Debug)]
pub enum RawToolResult {
    Records(NativeRecords),
    Failed(ToolFailure),
}

impl RawToolResult {
    pub fn failure(&self) -> Option<&ToolFailure> {
        match self {
            Self::Records(_) => None,
            Self::Failed(failure) => Some(failure),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Number of native records, zero for failures.
    pub fn record_count(&self) -> usize {
        match self {
            Self::Records(records) => records.len(),
            Self::Failed(_) => 0,
        }
    }
}

impl From<Result<NativeRecords, ToolFailure>> for RawToolResult {
    fn from(result: Result<NativeRecords, ToolFailure>) -> Self {
        match result {
            Ok(records) => Self::Records(records),
            Err(failure) => Self::Failed(failure),
        }
    }
}

/// Why a tool contributed nothing for a file.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolFailure {
    #[error("'{tool}' not found ({program})")]
    Missing { tool: ToolId, program: String },

    #[error("{tool} timed out after {timeout:?}")]
    TimedOut { tool: ToolId, timeout: Duration },

    #[error("{tool} could not be launched: {message}")]
    Launch { tool: ToolId, message: String },

    #[error("{tool} failed (exit {}) with no output{}", exit_label(.exit_code), stderr_suffix(.stderr))]
    NoOutput {
        tool: ToolId,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("{tool} output did not parse: {reason}. Output: {excerpt}")]
    Parse {
        tool: ToolId,
        reason: String,
        excerpt: String,
    },

    #[error("{tool} cannot analyse this file: {reason}")]
    Unsupported { tool: ToolId, reason: String },
}

impl ToolFailure {
    pub fn tool(&self) -> ToolId {
        match self {
            Self::Missing { tool, .. }
            | Self::TimedOut { tool, .. }
            | Self::Launch { tool, .. }
            | Self::NoOutput { tool, .. }
            | Self::Parse { tool, .. }
            | Self::Unsupported { tool, .. } => *tool,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing { .. })
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}

fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| c.to_string())
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(". Stderr: {}", crate::parsers::excerpt(trimmed))
    }
}
