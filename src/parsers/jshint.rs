//! JSHint adapter reading the Checkstyle XML reporter.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::models::finding::RawSeverity;
use crate::models::tool::ToolId;
use crate::models::tool_result::ToolFailure;
use crate::parsers::{
    excerpt, non_empty, optional_stream, parse_line, xml_attribute, Invocation, MappingError,
    NativeFinding, NativeRecords, ToolAdapter, ToolRun,
};

#[derive(Debug, Default)]
pub struct JshintAdapter;

/// One `<error>` element, attributes kept verbatim.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckstyleError {
    /// `name` of the enclosing `<file>` element.
    pub file: Option<String>,
    pub line: Option<String>,
    pub column: Option<String>,
    pub severity: Option<String>,
    pub message: Option<String>,
    pub source: Option<String>,
}

impl ToolAdapter for JshintAdapter {
    fn tool(&self) -> ToolId {
        ToolId::Jshint
    }

    fn args(&self, invocation: &Invocation<'_>) -> Vec<OsString> {
        vec!["--reporter=checkstyle".into(), invocation.target.into()]
    }

    fn parse(
        &self,
        run: &ToolRun,
        _invocation: &Invocation<'_>,
    ) -> Result<NativeRecords, ToolFailure> {
        let Some(xml) = optional_stream(ToolId::Jshint, &run.output.stdout, &run.output)? else {
            return Ok(NativeRecords::Jshint(vec![]));
        };
        let parse_failure = |reason: String| ToolFailure::Parse {
            tool: ToolId::Jshint,
            reason,
            excerpt: excerpt(xml),
        };
        if !xml.starts_with("<?xml") {
            return Err(parse_failure("not Checkstyle XML".to_string()));
        }
        let errors = read_checkstyle(xml).map_err(parse_failure)?;
        if errors.is_empty() && !run.output.success() {
            return Err(parse_failure(format!(
                "exit code {:?} but no issues reported",
                run.output.exit_code
            )));
        }
        Ok(NativeRecords::Jshint(errors))
    }
}

/// Collect every `<error>` of a Checkstyle document.
pub(crate) fn read_checkstyle(xml: &str) -> Result<Vec<CheckstyleError>, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut current_file: Option<String> = None;
    let mut errors = Vec::new();
    loop {
        match reader.read_event().map_err(|e| format!("malformed XML: {e}"))? {
            Event::Start(element) if element.name().as_ref() == b"file" => {
                current_file = xml_attribute(&element, b"name")?;
            }
            Event::End(element) if element.name().as_ref() == b"file" => {
                current_file = None;
            }
            Event::Start(element) | Event::Empty(element)
                if element.name().as_ref() == b"error" =>
            {
                errors.push(CheckstyleError {
                    file: current_file.clone(),
                    line: xml_attribute(&element, b"line")?,
                    column: xml_attribute(&element, b"column")?,
                    severity: xml_attribute(&element, b"severity")?,
                    message: xml_attribute(&element, b"message")?,
                    source: xml_attribute(&element, b"source")?,
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(errors)
}

pub(crate) fn map(errors: &[CheckstyleError], target: &Path) -> Result<Vec<NativeFinding>, MappingError> {
    errors
        .iter()
        .enumerate()
        .map(|(i, error)| {
            let severity = error.severity.as_deref().unwrap_or_default().to_lowercase();
            let label = if severity.contains("error") { "error" } else { "warning" };
            Ok(NativeFinding {
                file: non_empty(error.file.as_deref())
                    .map_or_else(|| target.to_path_buf(), PathBuf::from),
                line: parse_line(error.line.as_deref(), i, "line")?,
                severity: RawSeverity::label(label),
                description: error.message.clone().unwrap_or_default(),
                rule_code: error.source.clone().unwrap_or_default(),
                snippet: None,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::language::Language;
    use crate::services::exec::ToolOutput;

    fn parse(stdout: &str, exit_code: i32) -> Result<NativeRecords, ToolFailure> {
        let run = ToolRun {
            output: ToolOutput {
                stdout: stdout.to_string(),
                exit_code: Some(exit_code),
                ..Default::default()
            },
            report: None,
        };
        let invocation = Invocation {
            target: Path::new("js/widget.js"),
            language: Language::JavaScript,
            report_path: None,
        };
        JshintAdapter.parse(&run, &invocation)
    }

    #[test]
    fn parses_checkstyle_errors_and_unescapes() {
        let data = include_str!("../../tests/fixtures/jshint_checkstyle.xml");
        let records = parse(data, 2).unwrap();
        let NativeRecords::Jshint(ref errors) = records else {
            panic!("expected JSHint records");
        };
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].file.as_deref(), Some("js/widget.js"));
        assert_eq!(errors[0].message.as_deref(), Some("Missing \"use strict\" statement."));

        let findings = records.map_findings(Path::new("js/widget.js")).unwrap();
        assert_eq!(findings[0].severity, RawSeverity::label("error"));
        assert_eq!(findings[1].severity, RawSeverity::label("warning"));
        assert_eq!(findings[1].rule_code, "jshint.W033");
        assert_eq!(findings[2].line, Some(40));
        assert_eq!(findings[2].description, "'a' & 'b' are <undefined>.");
    }

    #[test]
    fn clean_run_prints_nothing() {
        assert!(parse("", 0).unwrap().is_empty());
    }

    #[test]
    fn non_xml_output_is_parse_failure() {
        let err = parse("ERROR: Can't open js/widget.js", 2).unwrap_err();
        assert!(err.is_parse());
        assert!(err.to_string().contains("not Checkstyle XML"));
    }

    #[test]
    fn truncated_xml_is_parse_failure() {
        let err = parse(
            "<?xml version=\"1.0\"?><checkstyle><file name=\"a.js\"><error line=\"1\"",
            2,
        )
        .unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn bad_line_attribute_fails_mapping() {
        let errors = vec![CheckstyleError {
            line: Some("NaN".to_string()),
            ..Default::default()
        }];
        let err = map(&errors, Path::new("a.js")).unwrap_err();
        assert_eq!(err.field, "line");
    }
}
