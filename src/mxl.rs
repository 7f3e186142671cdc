//! MXL file handler: reads compressed MusicXML (.mxl) archives.
//!
//! An .mxl file is a ZIP archive containing:
//!   - META-INF/container.xml  (declares the root MusicXML file path)
//!   - <rootfile>.xml          (the actual MusicXML content, e.g. score.xml)
//!   - optionally other files  (images, sounds, alternate renditions)

use std::io::{Cursor, Read};

use zip::ZipArchive;

use crate::error::ParseError;
use crate::parser::{self, ParsedScore};

const CONTAINER_PATH: &str = "META-INF/container.xml";
const MUSICXML_MEDIA_TYPES: &[&str] = &[
    "application/vnd.recordare.musicxml+xml",
    "application/vnd.recordare.musicxml",
];

/// Read and parse a .mxl file from raw bytes.
pub fn parse_mxl(data: &[u8]) -> Result<ParsedScore, ParseError> {
    let xml = extract_musicxml_from_mxl(data)?;
    parser::parse_musicxml(&xml)
}

/// Extract the MusicXML content string from .mxl bytes.
pub fn extract_musicxml_from_mxl(data: &[u8]) -> Result<String, ParseError> {
    let mut archive = ZipArchive::new(Cursor::new(data))
        .map_err(|e| ParseError::Archive(format!("failed to open archive: {e}")))?;

    let root_file_path = root_file_path(&mut archive)?;
    log::debug!("mxl rootfile: {root_file_path}");

    let mut root_file = archive.by_name(&root_file_path).map_err(|e| {
        ParseError::Archive(format!("root file '{root_file_path}' not found in archive: {e}"))
    })?;
    let mut xml = String::new();
    root_file
        .read_to_string(&mut xml)
        .map_err(|e| ParseError::Archive(format!("failed to read '{root_file_path}': {e}")))?;

    Ok(xml)
}

/// Rootfile named by META-INF/container.xml, or the first MusicXML-looking
/// entry when the archive has no container.
fn root_file_path(archive: &mut ZipArchive<Cursor<&[u8]>>) -> Result<String, ParseError> {
    let container = match archive.by_name(CONTAINER_PATH) {
        Ok(mut file) => {
            let mut xml = String::new();
            file.read_to_string(&mut xml)
                .map_err(|e| ParseError::Archive(format!("failed to read container.xml: {e}")))?;
            Some(xml)
        }
        Err(_) => None,
    };

    match container {
        Some(xml) => rootfile_from_container(&xml),
        None => {
            let names: Vec<String> = archive.file_names().map(String::from).collect();
            names
                .iter()
                .find(|name| {
                    !name.starts_with("META-INF/")
                        && (name.ends_with(".xml") || name.ends_with(".musicxml"))
                })
                .cloned()
                .ok_or_else(|| {
                    ParseError::Archive(format!("no MusicXML file found in archive. Files: {names:?}"))
                })
        }
    }
}

/// A container may list several rootfiles (e.g. a PDF rendition); prefer
/// the one declared as MusicXML, else the first.
fn rootfile_from_container(xml: &str) -> Result<String, ParseError> {
    let doc = roxmltree::Document::parse(xml)
        .map_err(|e| ParseError::Archive(format!("failed to parse container.xml: {e}")))?;

    let rootfiles: Vec<_> = doc
        .descendants()
        .filter(|n| n.tag_name().name() == "rootfile")
        .filter_map(|n| Some((n.attribute("full-path")?, n.attribute("media-type"))))
        .collect();

    rootfiles
        .iter()
        .find(|(_, media)| media.is_some_and(|m| MUSICXML_MEDIA_TYPES.contains(&m)))
        .or_else(|| rootfiles.iter().find(|(_, media)| media.is_none()))
        .or_else(|| rootfiles.first())
        .map(|(path, _)| path.to_string())
        .ok_or_else(|| ParseError::Archive("no rootfile found in container.xml".into()))
}
