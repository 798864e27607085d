//! Domain types: languages, tools, tool results, findings and scan state.

pub mod finding;
pub mod language;
pub mod session;
pub mod tool;
pub mod tool_result;

pub use finding::{Finding, RawSeverity, Severity, SeverityCounts};
pub use language::Language;
pub use session::{FileAnalysis, FileScan, ScanSession, ScanSummary, ScanTarget};
pub use tool::ToolId;
pub use tool_result::{RawToolResult, ToolFailure};
