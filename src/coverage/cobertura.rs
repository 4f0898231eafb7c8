//! Cobertura XML format parser
//!
//! Single pass over quick-xml events. The only state carried between events
//! is the class currently open, which is flushed into the report when its
//! end tag (or the end of an empty `<class/>`) is reached.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};

use super::{CoverageReport, FileCoverage, LineHit};
use crate::error::{CoverageError, Result};

/// Parse a Cobertura XML file
pub fn parse_cobertura(path: &Path) -> Result<CoverageReport> {
    if !path.is_file() {
        return Err(CoverageError::SourceUnavailable {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path)?;
    parse_cobertura_reader(BufReader::new(file), &path.display().to_string())
}

/// Parse Cobertura XML content from a string
pub fn parse_cobertura_string(content: &str) -> Result<CoverageReport> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);
    parse_events(reader, "<string>")
}

/// Parse Cobertura XML from any buffered byte stream
pub fn parse_cobertura_reader<R: BufRead>(source: R, source_name: &str) -> Result<CoverageReport> {
    let mut reader = Reader::from_reader(source);
    reader.trim_text(true);
    parse_events(reader, source_name)
}

/// Where the parser stands relative to `<class>` elements
enum ClassState {
    Closed,
    Open(FileCoverage),
    /// Inside a class whose attributes were unusable; its lines are dropped
    Skipped,
}

impl ClassState {
    fn flush_into(&mut self, report: &mut CoverageReport) {
        if let ClassState::Open(file) = std::mem::replace(self, ClassState::Closed) {
            debug!(path = %file.path, lines = file.lines.len(), "parsed class");
            report.insert(file);
        }
    }
}

fn parse_events<R: BufRead>(mut reader: Reader<R>, source_name: &str) -> Result<CoverageReport> {
    let mut report = CoverageReport::default();
    let mut state = ClassState::Closed;
    let mut depth = 0usize;
    let mut seen_root = false;
    let mut root_closed = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                if root_closed {
                    return Err(after_root(&reader, source_name));
                }
                seen_root = true;
                depth += 1;
                on_element(e, false, &mut state, &mut report, source_name)
                    .map_err(|err| malformed(&reader, source_name, err))?;
            }
            Ok(Event::Empty(ref e)) => {
                if root_closed {
                    return Err(after_root(&reader, source_name));
                }
                seen_root = true;
                root_closed = depth == 0;
                on_element(e, true, &mut state, &mut report, source_name)
                    .map_err(|err| malformed(&reader, source_name, err))?;
            }
            Ok(Event::End(ref e)) => {
                depth = depth.saturating_sub(1);
                root_closed = depth == 0;
                if e.name().as_ref() == b"class" {
                    state.flush_into(&mut report);
                }
            }
            // Whitespace is trimmed, so any text outside the root is content
            Ok(Event::Text(_)) | Ok(Event::CData(_)) if depth == 0 => {
                return Err(CoverageError::malformed(
                    source_name,
                    reader.buffer_position() as u64,
                    "text outside the root element",
                ));
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(malformed(&reader, source_name, e)),
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(CoverageError::malformed(
            source_name,
            reader.buffer_position() as u64,
            "document has no root element",
        ));
    }
    if depth != 0 {
        return Err(CoverageError::malformed(
            source_name,
            reader.buffer_position() as u64,
            format!("unexpected end of document with {} unclosed element(s)", depth),
        ));
    }

    debug!(source = source_name, files = report.len(), "parsed coverage report");
    Ok(report)
}

fn on_element(
    e: &BytesStart,
    is_empty: bool,
    state: &mut ClassState,
    report: &mut CoverageReport,
    source_name: &str,
) -> std::result::Result<(), quick_xml::Error> {
    match e.name().as_ref() {
        b"coverage" => {
            report.line_rate = attribute(e, b"line-rate")?.and_then(|value| match parse_rate(&value) {
                Some(rate) => Some(rate),
                None => {
                    warn!(source = source_name, value = %value, "ignoring unparsable report line-rate");
                    None
                }
            });
        }
        b"class" => {
            // A class left open by a missing end tag is still kept
            state.flush_into(report);
            *state = open_class(e)?;
            if is_empty {
                state.flush_into(report);
            }
        }
        b"line" => {
            if let ClassState::Open(file) = state {
                match read_line(e)? {
                    Some(hit) => file.record(hit),
                    None => warn!(
                        source = source_name,
                        path = %file.path,
                        "skipping line with missing or non-integer number/hits"
                    ),
                }
            }
        }
        _ => {}
    }
    Ok(())
}

fn open_class(e: &BytesStart) -> std::result::Result<ClassState, quick_xml::Error> {
    let filename = attribute(e, b"filename")?;
    let line_rate = attribute(e, b"line-rate")?;

    let Some(filename) = filename.filter(|f| !f.is_empty()) else {
        warn!("skipping class without a filename");
        return Ok(ClassState::Skipped);
    };

    match line_rate.as_deref().and_then(parse_rate) {
        Some(rate) => Ok(ClassState::Open(FileCoverage::new(filename, rate))),
        _ => {
            warn!(path = %filename, value = ?line_rate, "skipping class with missing or unparsable line-rate");
            Ok(ClassState::Skipped)
        }
    }
}

/// `Ok(None)` when the line's numeric attributes are missing or not integers
fn read_line(e: &BytesStart) -> std::result::Result<Option<LineHit>, quick_xml::Error> {
    let number = attribute(e, b"number")?.and_then(|v| v.trim().parse::<u32>().ok());
    let hits = attribute(e, b"hits")?.and_then(|v| v.trim().parse::<u64>().ok());

    Ok(match (number, hits) {
        (Some(number), Some(hits)) => Some(LineHit { number, hits }),
        _ => None,
    })
}

/// A line rate is a finite fraction in [0, 1]; anything else is rejected
fn parse_rate(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|rate| rate.is_finite() && (0.0..=1.0).contains(rate))
}

fn attribute(e: &BytesStart, key: &[u8]) -> std::result::Result<Option<String>, quick_xml::Error> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn after_root<R>(reader: &Reader<R>, source_name: &str) -> CoverageError {
    CoverageError::malformed(
        source_name,
        reader.buffer_position() as u64,
        "content after the root element",
    )
}

fn malformed<R>(reader: &Reader<R>, source_name: &str, err: quick_xml::Error) -> CoverageError {
    CoverageError::malformed(source_name, reader.buffer_position() as u64, err.to_string())
}
