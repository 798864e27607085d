//! Cppcheck adapter. Cppcheck prints its XML (version 2) report on stderr.

use std::ffi::OsString;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::models::finding::RawSeverity;
use crate::models::tool::ToolId;
use crate::models::tool_result::ToolFailure;
use crate::parsers::{
    excerpt, optional_stream, parse_line, same_file, xml_attribute, Invocation, MappingError,
    NativeFinding, NativeRecords, ToolAdapter, ToolRun,
};

#[derive(Debug, Default)]
pub struct CppcheckAdapter;

/// One `<error>` element with its locations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CppcheckError {
    pub id: String,
    /// `error`, `warning`, `style`, `performance`, `portability` or `information`.
    pub severity: Option<String>,
    pub msg: Option<String>,
    pub cwe: Option<String>,
    pub locations: Vec<CppcheckLocation>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CppcheckLocation {
    pub file: String,
    pub line: Option<String>,
}

impl ToolAdapter for CppcheckAdapter {
    fn tool(&self) -> ToolId {
        ToolId::Cppcheck
    }

    fn args(&self, invocation: &Invocation<'_>) -> Vec<OsString> {
        vec!["--enable=all".into(), "--xml".into(), invocation.target.into()]
    }

    fn parse(
        &self,
        run: &ToolRun,
        invocation: &Invocation<'_>,
    ) -> Result<NativeRecords, ToolFailure> {
        let Some(xml) = optional_stream(ToolId::Cppcheck, &run.output.stderr, &run.output)? else {
            return Ok(NativeRecords::Cppcheck(vec![]));
        };
        let parse_failure = |reason: String| ToolFailure::Parse {
            tool: ToolId::Cppcheck,
            reason,
            excerpt: excerpt(xml),
        };
        if !xml.starts_with("<?xml") {
            return Err(parse_failure("stderr is not cppcheck XML".to_string()));
        }

        let errors = read_results(xml).map_err(parse_failure)?;
        let total = errors.len();
        // Findings in included headers belong to those files, not the target.
        let relevant: Vec<CppcheckError> = errors
            .into_iter()
            .filter(|error| {
                error
                    .locations
                    .first()
                    .is_some_and(|loc| same_file(Path::new(&loc.file), invocation.target))
            })
            .collect();
        if relevant.len() < total {
            tracing::debug!(
                dropped = total - relevant.len(),
                file = %invocation.target.display(),
                "Cppcheck reported issues outside the scanned file"
            );
        }
        Ok(NativeRecords::Cppcheck(relevant))
    }
}

fn read_results(xml: &str) -> Result<Vec<CppcheckError>, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut current: Option<CppcheckError> = None;
    let mut errors = Vec::new();
    loop {
        match reader.read_event().map_err(|e| format!("malformed XML: {e}"))? {
            Event::Start(element) if element.name().as_ref() == b"error" => {
                current = Some(read_error(&element)?);
            }
            Event::Empty(element) if element.name().as_ref() == b"error" => {
                errors.push(read_error(&element)?);
            }
            Event::Start(element) | Event::Empty(element)
                if element.name().as_ref() == b"location" =>
            {
                if let Some(error) = current.as_mut() {
                    error.locations.push(CppcheckLocation {
                        file: xml_attribute(&element, b"file")?.unwrap_or_default(),
                        line: xml_attribute(&element, b"line")?,
                    });
                }
            }
            Event::End(element) if element.name().as_ref() == b"error" => {
                if let Some(error) = current.take() {
                    errors.push(error);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(errors)
}

fn read_error(element: &quick_xml::events::BytesStart<'_>) -> Result<CppcheckError, String> {
    Ok(CppcheckError {
        id: xml_attribute(element, b"id")?.unwrap_or_default(),
        severity: xml_attribute(element, b"severity")?,
        msg: xml_attribute(element, b"msg")?,
        cwe: xml_attribute(element, b"cwe")?,
        locations: Vec::new(),
    })
}

pub(crate) fn map(errors: &[CppcheckError], target: &Path) -> Result<Vec<NativeFinding>, MappingError> {
    errors
        .iter()
        .enumerate()
        .map(|(i, error)| {
            let line = error.locations.first().and_then(|loc| loc.line.as_deref());
            Ok(NativeFinding {
                file: target.to_path_buf(),
                line: parse_line(line, i, "location.line")?,
                severity: RawSeverity::from_option(error.severity.as_deref()),
                description: error.msg.clone().unwrap_or_default(),
                rule_code: error.id.clone(),
                snippet: None,
            })
        })
        .collect()
}
