//! Score header: work, identification, page defaults, credits and the
//! part-list.
//!
//! Everything here is descriptive. Nothing is validated and a malformed
//! value only costs a warning.

use roxmltree::Node;

use crate::model::{Credit, Defaults, MidiInstrument, Score};
use crate::validation::Rule;
use crate::warning::{emit, Category, WarningSink};
use crate::xml::{self, Scope};

/// One `<score-part>` of the part-list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartListEntry {
    pub id: String,
    pub name: Option<String>,
    pub abbreviation: Option<String>,
    pub midi: Option<MidiInstrument>,
}

/// Read the header children of the root element into `score` and return
/// the part-list entries in document order.
pub fn parse_header(root: &Node, score: &mut Score, sink: &mut dyn WarningSink) -> Vec<PartListEntry> {
    let mut part_list = Vec::new();
    for child in xml::elements(root) {
        match child.tag_name().name() {
            "work" => parse_work(&child, score),
            "movement-title" => score.movement_title = xml::text(&child).map(String::from),
            "identification" => parse_identification(&child, score),
            "defaults" => score.defaults = Some(parse_defaults(&child)),
            "credit" => parse_credit(&child, score),
            "part-list" => part_list = parse_part_list(&child, sink),
            _ => {}
        }
    }
    part_list
}

// ─── Work ────────────────────────────────────────────────────────────

fn parse_work(node: &Node, score: &mut Score) {
    // Only a fallback; <credit type="title"> takes priority.
    if score.title.is_none() {
        score.title = xml::child_text(node, "work-title").map(String::from);
    }
}

// ─── Identification ──────────────────────────────────────────────────

fn parse_identification(node: &Node, score: &mut Score) {
    for child in xml::elements(node) {
        match child.tag_name().name() {
            "creator" => {
                let text = xml::text(&child).map(String::from);
                match child.attribute("type").unwrap_or("") {
                    // credits win over creators, see parse_credit
                    "composer" if score.composer.is_none() => score.composer = text,
                    "arranger" if score.arranger.is_none() => score.arranger = text,
                    "lyricist" | "poet" if score.lyricist.is_none() => score.lyricist = text,
                    _ => {}
                }
            }
            "encoding" => {
                score.software = xml::child_text(&child, "software").map(String::from);
                score.encoding_date = xml::child_text(&child, "encoding-date").map(String::from);
            }
            _ => {}
        }
    }
}

// ─── Defaults ────────────────────────────────────────────────────────

fn parse_defaults(node: &Node) -> Defaults {
    let mut defaults = Defaults::default();

    if let Some(scaling) = xml::child(node, "scaling") {
        defaults.millimeters = xml::child(&scaling, "millimeters").and_then(|n| xml::parse_f64(&n));
        defaults.tenths = xml::child(&scaling, "tenths").and_then(|n| xml::parse_f64(&n));
    }

    if let Some(layout) = xml::child(node, "page-layout") {
        defaults.page_height = xml::child(&layout, "page-height").and_then(|n| xml::parse_f64(&n));
        defaults.page_width = xml::child(&layout, "page-width").and_then(|n| xml::parse_f64(&n));
        // MusicXML allows separate odd/even margins; the first set wins.
        if let Some(margins) = xml::child(&layout, "page-margins") {
            for m in xml::elements(&margins) {
                let value = xml::parse_f64(&m);
                match m.tag_name().name() {
                    "left-margin" => defaults.left_margin = value,
                    "right-margin" => defaults.right_margin = value,
                    "top-margin" => defaults.top_margin = value,
                    "bottom-margin" => defaults.bottom_margin = value,
                    _ => {}
                }
            }
        }
    }

    defaults
}

// ─── Credits ─────────────────────────────────────────────────────────

fn parse_credit(node: &Node, score: &mut Score) {
    let credit = Credit {
        page: node.attribute("page").and_then(|p| p.trim().parse().ok()),
        credit_type: xml::child_text(node, "credit-type").map(String::from),
        words: xml::elements(node)
            .filter(|c| c.tag_name().name() == "credit-words")
            .filter_map(|c| xml::text(&c))
            .map(String::from)
            .collect(),
    };

    if !credit.words.is_empty() {
        let text = credit.words.join("\n");
        // <credit> is the primary source; <work-title> and <creator> are fallbacks.
        match credit.credit_type.as_deref() {
            Some("title") => score.title = Some(text),
            Some("subtitle") => score.subtitle = Some(text),
            Some("composer") => score.composer = Some(text),
            Some("arranger") => score.arranger = Some(text),
            Some("lyricist") => score.lyricist = Some(text),
            _ => {}
        }
    }
    score.credits.push(credit);
}

// ─── Part List ───────────────────────────────────────────────────────

fn parse_part_list(node: &Node, sink: &mut dyn WarningSink) -> Vec<PartListEntry> {
    let scope = Scope::default();
    let mut entries = Vec::new();

    for score_part in xml::elements(node).filter(|n| n.tag_name().name() == "score-part") {
        let Some(id) = score_part.attribute("id") else {
            emit(
                sink,
                scope
                    .warning(&score_part, Category::Metadata, "score-part without id; skipped")
                    .with_rule(Rule::PartList),
            );
            continue;
        };
        let mut entry = PartListEntry {
            id: id.to_string(),
            ..Default::default()
        };
        let scope = Scope::part(id);

        for child in xml::elements(&score_part) {
            match child.tag_name().name() {
                "part-name" => entry.name = xml::text(&child).map(String::from),
                "part-abbreviation" => entry.abbreviation = xml::text(&child).map(String::from),
                // only the first instrument is kept
                "midi-instrument" if entry.midi.is_none() => {
                    entry.midi = Some(parse_midi_instrument(&child, &scope, sink));
                }
                _ => {}
            }
        }
        entries.push(entry);
    }

    entries
}

fn parse_midi_instrument(node: &Node, scope: &Scope, sink: &mut dyn WarningSink) -> MidiInstrument {
    let mut midi = MidiInstrument {
        id: node.attribute("id").map(String::from),
        ..Default::default()
    };
    for child in xml::elements(node) {
        match child.tag_name().name() {
            "midi-channel" => midi.channel = scope.optional(&child, Rule::PartList, sink),
            "midi-program" => midi.program = scope.optional(&child, Rule::PartList, sink),
            "volume" => midi.volume = scope.optional(&child, Rule::PartList, sink),
            "pan" => midi.pan = scope.optional(&child, Rule::PartList, sink),
            _ => {}
        }
    }
    midi
}
