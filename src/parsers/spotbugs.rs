//! SpotBugs adapter.
//!
//! SpotBugs analyses compiled bytecode, so a single `.java` source file
//! cannot be scanned. The adapter refuses every invocation before launch.

use std::ffi::OsString;

use crate::models::tool::ToolId;
use crate::models::tool_result::ToolFailure;
use crate::parsers::{Invocation, NativeRecords, ToolAdapter, ToolRun};

const REASON: &str = "SpotBugs analyses compiled classes; source files need a build step first";

#[derive(Debug, Default)]
pub struct SpotbugsAdapter;

fn unsupported() -> ToolFailure {
    ToolFailure::Unsupported {
        tool: ToolId::Spotbugs,
        reason: REASON.to_string(),
    }
}

impl ToolAdapter for SpotbugsAdapter {
    fn tool(&self) -> ToolId {
        ToolId::Spotbugs
    }

    fn preflight(&self, _invocation: &Invocation<'_>) -> Result<(), ToolFailure> {
        Err(unsupported())
    }

    fn args(&self, _invocation: &Invocation<'_>) -> Vec<OsString> {
        Vec::new()
    }

    fn parse(
        &self,
        _run: &ToolRun,
        _invocation: &Invocation<'_>,
    ) -> Result<NativeRecords, ToolFailure> {
        Err(unsupported())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::language::Language;
    use std::path::Path;

    #[test]
    fn refuses_source_files() {
        let invocation = Invocation {
            target: Path::new("Acct.java"),
            language: Language::Java,
            report_path: None,
        };
        let err = SpotbugsAdapter.preflight(&invocation).unwrap_err();
        assert!(matches!(err, ToolFailure::Unsupported { tool: ToolId::Spotbugs, .. }));
        assert!(SpotbugsAdapter.args(&invocation).is_empty());
    }
}
