//! mxlscore: measure-level MusicXML parsing engine.
//!
//! Turns `score-partwise` MusicXML (plain `.musicxml`/`.xml` or compressed
//! `.mxl`) into a validated [`Score`]: parts, measures, notes, beam groups
//! and the effective key/time/clef of every measure. Problems in optional
//! regions of a document are collected as [`Warning`]s; only missing
//! required data or values that would corrupt a whole measure fail the
//! parse.
//!
//! # Example
//! ```no_run
//! use mxlscore::parse_file;
//!
//! let parsed = parse_file("path/to/score.musicxml").unwrap();
//! println!("Title: {:?}", parsed.score.title);
//! println!("Parts: {}", parsed.score.parts.len());
//! println!("Measures: {}", parsed.score.measure_count());
//! for w in &parsed.warnings {
//!     println!("warning: {}", w.message);
//! }
//! ```

pub mod attributes;
pub mod beams;
pub mod error;
pub mod header;
pub mod markings;
pub mod measure;
pub mod model;
pub mod mxl;
pub mod note;
pub mod options;
pub mod parser;
pub mod timeline;
pub mod validation;
pub mod values;
pub mod warning;
pub mod xml;

use std::path::Path;

pub use error::{FailureContext, ParseError, StructureFailure, ValidationFailure};
pub use model::*;
pub use mxl::{extract_musicxml_from_mxl, parse_mxl};
pub use options::ParseOptions;
pub use parser::{parse_document, parse_musicxml, parse_musicxml_with, ParsedScore};
pub use validation::Rule;
pub use values::{
    Clef, ClefSign, Duration, KeySignature, Mode, Pitch, Step, TimeModification, TimeSignature,
};
pub use warning::{Category, Severity, SharedWarnings, Warning, WarningSink};

/// Parse a MusicXML file from a file path.
/// Automatically detects format based on file extension:
/// - `.musicxml` or `.xml` → uncompressed MusicXML
/// - `.mxl` → compressed MXL (ZIP archive)
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<ParsedScore, ParseError> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|source| ParseError::Io {
        path: path.display().to_string(),
        source,
    })?;

    parse_bytes(&data, path.extension().and_then(|e| e.to_str()))
}

/// Parse MusicXML from raw bytes with an optional format hint.
/// If `extension` is None, tries to auto-detect the format.
pub fn parse_bytes(data: &[u8], extension: Option<&str>) -> Result<ParsedScore, ParseError> {
    match extension.map(str::to_ascii_lowercase).as_deref() {
        Some("mxl") => parse_mxl(data),
        Some("musicxml") | Some("xml") => parse_musicxml(utf8(data)?),
        _ => {
            // Auto-detect: XML text first, then a ZIP archive
            if let Ok(xml) = std::str::from_utf8(data) {
                if xml.trim_start_matches('\u{feff}').trim_start().starts_with('<') {
                    return parse_musicxml(xml);
                }
            }
            parse_mxl(data)
        }
    }
}

fn utf8(data: &[u8]) -> Result<&str, ParseError> {
    std::str::from_utf8(data)
        .map_err(|e| ParseError::UnsupportedDocument(format!("invalid UTF-8 in MusicXML file: {e}")))
}

/// Convert a parsed score to a JSON string.
pub fn score_to_json(score: &Score) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(score)
}
