//! MusicXML parser: converts a `score-partwise` document into the Score
//! data model.
//!
//! The part walker folds over each part's measures, handing every measure
//! the effective state (divisions, key, time, clefs) of the one before it.
//! Parts are independent of each other.

use roxmltree::{Document, Node};
use serde::Serialize;

use crate::error::ParseError;
use crate::header::{self, PartListEntry};
use crate::measure::{parse_measure, MeasureContext};
use crate::model::{Measure, Part, Score};
use crate::options::ParseOptions;
use crate::validation::Rule;
use crate::warning::{emit, Category, Warning, WarningSink};
use crate::xml::{self, Scope};

/// MusicXML versions this parser is written against.
pub const KNOWN_VERSIONS: &[&str] = &["3.0", "3.1", "4.0"];

/// A score together with every warning raised while parsing it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedScore {
    pub score: Score,
    pub warnings: Vec<Warning>,
}

/// Parse a MusicXML string with default options, collecting warnings.
pub fn parse_musicxml(xml: &str) -> Result<ParsedScore, ParseError> {
    let mut warnings = Vec::new();
    let score = parse_musicxml_with(xml, &ParseOptions::default(), &mut warnings)?;
    Ok(ParsedScore { score, warnings })
}

/// Parse a MusicXML string, sending warnings to `sink`.
pub fn parse_musicxml_with(
    xml: &str,
    options: &ParseOptions,
    sink: &mut dyn WarningSink,
) -> Result<Score, ParseError> {
    let parsing = roxmltree::ParsingOptions {
        allow_dtd: options.allow_dtd,
        ..Default::default()
    };
    let doc = Document::parse_with_options(xml, parsing)?;
    parse_document(&doc, options, sink)
}

/// Parse an already-built element tree.
pub fn parse_document(
    doc: &Document,
    options: &ParseOptions,
    sink: &mut dyn WarningSink,
) -> Result<Score, ParseError> {
    let root = doc.root_element();
    match root.tag_name().name() {
        "score-partwise" => {}
        "score-timewise" => {
            return Err(ParseError::UnsupportedDocument(
                "score-timewise documents are not supported; convert to score-partwise".into(),
            ))
        }
        other => {
            return Err(ParseError::UnsupportedDocument(format!(
                "root element '{other}' is not score-partwise"
            )))
        }
    }

    let mut score = Score::new();
    score.version = root.attribute("version").map(String::from);
    if let Some(ref version) = score.version {
        if !KNOWN_VERSIONS.contains(&version.as_str()) {
            emit(
                sink,
                Warning::info(Category::Metadata, format!("MusicXML version {version} is not 3.0, 3.1 or 4.0"))
                    .with_rule(Rule::DocumentVersion)
                    .with_element(root.tag_name().name())
                    .with_line(xml::line_of(&root)),
            );
        }
    }

    let part_list = header::parse_header(&root, &mut score, sink);

    for node in xml::elements(&root).filter(|n| n.tag_name().name() == "part") {
        score.parts.push(walk_part(&node, &part_list, options, sink)?);
    }

    for entry in &part_list {
        if score.part(&entry.id).is_none() {
            emit(
                sink,
                Warning::new(
                    Category::Metadata,
                    format!("part-list entry '{}' has no <part>", entry.id),
                )
                .with_rule(Rule::PartList)
                .with_element("score-part")
                .with_context("part", entry.id.as_str()),
            );
        }
    }

    log::debug!(
        "parsed score: {} part(s), {} measure(s)",
        score.parts.len(),
        score.measure_count()
    );
    Ok(score)
}

// ─── Part Walker ─────────────────────────────────────────────────────

fn walk_part(
    node: &Node,
    part_list: &[PartListEntry],
    options: &ParseOptions,
    sink: &mut dyn WarningSink,
) -> Result<Part, ParseError> {
    let id = node
        .attribute("id")
        .ok_or_else(|| Scope::default().structure(node, "<part> is missing its id attribute"))?;
    let scope = Scope::part(id);

    let entry = part_list.iter().find(|e| e.id == id);
    if entry.is_none() {
        emit(
            sink,
            scope
                .warning(node, Category::Metadata, format!("part '{id}' is not declared in the part-list"))
                .with_rule(Rule::PartList),
        );
    }

    log::debug!("walking part {id}");
    let (measures, _) = xml::elements(node)
        .filter(|n| n.tag_name().name() == "measure")
        .try_fold(
            (Vec::<Measure>::new(), MeasureContext::default()),
            |(mut measures, inherited), m| {
                let measure = parse_measure(&m, &inherited, &scope, options, sink)?;
                log::trace!(
                    "part {id} measure {}: {} note(s), {} beam(s)",
                    measure.number,
                    measure.notes.len(),
                    measure.beams.len()
                );
                let effective = MeasureContext::from(&measure);
                measures.push(measure);
                Ok::<_, ParseError>((measures, effective))
            },
        )?;

    Ok(Part {
        id: id.to_string(),
        name: entry.and_then(|e| e.name.clone()),
        abbreviation: entry.and_then(|e| e.abbreviation.clone()),
        midi: entry.and_then(|e| e.midi.clone()),
        measures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warning::Severity;

    #[test]
    fn timewise_is_unsupported() {
        let err = parse_musicxml(r#"<score-timewise version="4.0"/>"#).unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedDocument(_)));
    }

    #[test]
    fn malformed_xml_is_reported() {
        let err = parse_musicxml("<score-partwise><part-list></score-partwise>").unwrap_err();
        assert!(matches!(err, ParseError::Xml(_)));
    }

    #[test]
    fn unknown_version_is_informational() {
        let parsed = parse_musicxml(r#"<score-partwise version="2.0"><part-list/></score-partwise>"#).unwrap();
        assert_eq!(parsed.score.version.as_deref(), Some("2.0"));
        assert_eq!(parsed.warnings.len(), 1);
        assert_eq!(parsed.warnings[0].severity, Severity::Info);
        assert_eq!(parsed.warnings[0].rule, Some(Rule::DocumentVersion));
    }

    #[test]
    fn part_without_id_is_structural() {
        let err = parse_musicxml(r#"<score-partwise version="4.0"><part-list/><part/></score-partwise>"#).unwrap_err();
        assert!(matches!(err, ParseError::Structure(_)));
    }

    #[test]
    fn part_list_mismatches_are_warnings() {
        let parsed = parse_musicxml(
            r#"<score-partwise version="4.0">
                 <part-list><score-part id="P1"><part-name>Flute</part-name></score-part></part-list>
                 <part id="P2"></part>
               </score-partwise>"#,
        )
        .unwrap();
        assert_eq!(parsed.score.parts.len(), 1);
        assert_eq!(parsed.score.parts[0].id, "P2");
        assert_eq!(parsed.score.parts[0].name, None);
        assert_eq!(parsed.warnings.len(), 2);
        assert!(parsed.warnings.iter().all(|w| w.rule == Some(Rule::PartList)));
    }
}
