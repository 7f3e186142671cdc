//! `<note>` resolver.
//!
//! A note that is missing its pitch, or a slur with no `type`, cannot be
//! interpreted at all and fails the parse. Every optional field is parsed
//! independently: a bad voice, stem or tie is reported and left out while
//! the rest of the note survives. A note whose fields contradict each other
//! (a rest with a pitch, an out-of-range octave) is reported and dropped,
//! and the measure carries on with the next element.

use roxmltree::Node;

use crate::error::ParseError;
use crate::model::{
    Articulation, BeamFragment, BeamMarker, Grace, Lyric, Note, NoteFields, Placement, Slur,
    StartStop, Stem, Tie,
};
use crate::validation::Rule;
use crate::values::{Duration, Pitch, TimeModification};
use crate::warning::{emit, Category, Warning, WarningSink};
use crate::xml::{self, Scope};

/// A parsed note and the raw beam markers it carried.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedNote {
    pub note: Note,
    pub beams: Vec<BeamFragment>,
}

/// Resolve one `<note>` element.
///
/// `divisions` is the divisions-per-quarter in effect at this point of the
/// measure. Returns `Ok(None)` when the note was dropped with a warning.
pub fn resolve_note(
    node: &Node,
    divisions: Option<u32>,
    scope: &Scope,
    sink: &mut dyn WarningSink,
) -> Result<Option<ResolvedNote>, ParseError> {
    let mut fields = NoteFields {
        rest: xml::has_child(node, "rest"),
        measure_rest: xml::child(node, "rest").is_some_and(|r| xml::is_yes(&r, "measure")),
        unpitched: xml::has_child(node, "unpitched"),
        chord: xml::has_child(node, "chord"),
        grace: xml::child(node, "grace").map(|g| Grace {
            slash: xml::is_yes(&g, "slash"),
        }),
        dots: xml::elements(node)
            .filter(|c| c.tag_name().name() == "dot")
            .count() as u32,
        default_x: xml::attribute_f64(node, "default-x"),
        default_y: xml::attribute_f64(node, "default-y"),
        ..Default::default()
    };

    // Pitch or rest. Any pitch child is read, even on a rest, so that the
    // contradiction is reported by the note constructor.
    match xml::child(node, "pitch") {
        Some(pitch_node) => match parse_pitch(&pitch_node, scope, sink)? {
            Ok(pitch) => fields.pitch = Some(pitch),
            Err(warning) => {
                emit(sink, warning);
                return Ok(None);
            }
        },
        None if !fields.rest && !fields.unpitched => {
            return Err(scope.structure(node, "note has neither <pitch> nor <rest>").into());
        }
        None => {}
    }
    if let Some(unpitched) = xml::child(node, "unpitched") {
        fields.pitch = display_position(&unpitched, scope, sink);
    }

    let mut beams = Vec::new();
    let mut sound_ties = Vec::new();

    for child in xml::elements(node) {
        match child.tag_name().name() {
            "duration" => fields.duration = parse_duration(&child, divisions, scope, sink),
            "voice" => fields.voice = positive(&child, Rule::NoteVoice, scope, sink),
            "staff" => fields.staff = positive(&child, Rule::NoteStaff, scope, sink),
            "type" => fields.note_type = xml::text(&child).map(String::from),
            "stem" => fields.stem = parse_keyword::<Stem>(&child, scope, sink),
            "accidental" => match xml::text(&child) {
                Some(t) => fields.accidental = Some(t.to_string()),
                None => emit(
                    sink,
                    scope
                        .warning(&child, Category::Structure, "ignoring empty <accidental>")
                        .with_rule(Rule::NoteField),
                ),
            },
            "time-modification" => {
                fields.time_modification = parse_time_modification(&child, scope, sink)
            }
            "beam" => {
                if let Some(fragment) = parse_beam(&child, scope, sink) {
                    beams.push(fragment);
                }
            }
            "tie" => {
                if let Some(tie) = parse_tie(&child, scope, sink) {
                    sound_ties.push(tie);
                }
            }
            "notations" => parse_notations(&child, &mut fields, scope, sink)?,
            "lyric" => {
                if let Some(lyric) = parse_lyric(&child) {
                    fields.lyrics.push(lyric);
                }
            }
            _ => {}
        }
    }

    // <tie> (playback) and <tied> (notation) usually come in pairs.
    for tie in sound_ties {
        if !fields.ties.contains(&tie) {
            fields.ties.push(tie);
        }
    }

    if fields.duration.is_none() && fields.grace.is_none() && !xml::has_child(node, "duration") {
        emit(
            sink,
            scope
                .warning(node, Category::Timing, "note without duration")
                .with_rule(Rule::NoteDuration),
        );
    }

    match Note::new(fields) {
        Ok(note) => Ok(Some(ResolvedNote { note, beams })),
        Err(failure) => {
            emit(
                sink,
                Warning::from(scope.locate(node, failure)).with_context("action", "note dropped"),
            );
            Ok(None)
        }
    }
}

// ─── Pitch ───────────────────────────────────────────────────────────

/// Missing step/octave is structural (outer `Err`); an out-of-range value
/// is a validation problem the caller turns into a dropped note (inner `Err`).
fn parse_pitch(
    node: &Node,
    scope: &Scope,
    sink: &mut dyn WarningSink,
) -> Result<Result<Pitch, Warning>, ParseError> {
    let step_node = xml::child(node, "step")
        .ok_or_else(|| scope.structure(node, "<pitch> is missing <step>"))?;
    let step = xml::text(&step_node)
        .ok_or_else(|| scope.structure(&step_node, "<step> is empty"))?;
    let octave_node = xml::child(node, "octave")
        .ok_or_else(|| scope.structure(node, "<pitch> is missing <octave>"))?;
    let octave: i32 = scope.required(&octave_node)?;
    let alter = xml::child(node, "alter").and_then(|a| scope.optional::<f64>(&a, Rule::PitchAlter, sink));

    Ok(Pitch::new(step, octave, alter).map_err(|failure| {
        Warning::from(scope.locate(node, failure)).with_context("action", "note dropped")
    }))
}

/// `<display-step>`/`<display-octave>` of an unpitched note.
fn display_position(node: &Node, scope: &Scope, sink: &mut dyn WarningSink) -> Option<Pitch> {
    let step = xml::child_text(node, "display-step")?;
    let octave = xml::child_text(node, "display-octave")?.parse::<i32>().ok()?;
    match Pitch::new(step, octave, None) {
        Ok(p) => Some(p),
        Err(failure) => {
            emit(sink, Warning::from(scope.locate(node, failure)));
            None
        }
    }
}

// ─── Scalar fields ───────────────────────────────────────────────────

fn parse_duration(
    node: &Node,
    divisions: Option<u32>,
    scope: &Scope,
    sink: &mut dyn WarningSink,
) -> Option<Duration> {
    let value = scope.optional::<i64>(node, Rule::NoteDuration, sink)?;
    let Some(value) = u32::try_from(value).ok().filter(|&v| v > 0) else {
        emit(
            sink,
            scope
                .warning(node, Category::Timing, format!("ignoring non-positive duration {value}"))
                .with_rule(Rule::NoteDuration),
        );
        return None;
    };
    let divisions = effective_divisions(node, divisions, scope, sink);
    Duration::new(value, divisions).ok()
}

/// Divisions to use for one duration; falls back to 1 (for this value
/// only) when the measure has none.
pub(crate) fn effective_divisions(
    node: &Node,
    divisions: Option<u32>,
    scope: &Scope,
    sink: &mut dyn WarningSink,
) -> u32 {
    match divisions.filter(|&d| d > 0) {
        Some(d) => d,
        None => {
            emit(
                sink,
                scope
                    .warning(node, Category::Timing, "no divisions in effect; assuming 1")
                    .with_rule(Rule::Divisions),
            );
            1
        }
    }
}

fn positive(node: &Node, rule: Rule, scope: &Scope, sink: &mut dyn WarningSink) -> Option<u32> {
    let value = scope.optional::<u32>(node, rule, sink)?;
    if value == 0 {
        emit(
            sink,
            scope
                .warning(
                    node,
                    Category::Structure,
                    format!("ignoring <{}> 0", node.tag_name().name()),
                )
                .with_rule(rule),
        );
        return None;
    }
    Some(value)
}

/// Keyword-valued element; unknown keywords are reported and dropped.
fn parse_keyword<T: std::str::FromStr>(
    node: &Node,
    scope: &Scope,
    sink: &mut dyn WarningSink,
) -> Option<T> {
    let text = xml::text(node).unwrap_or("");
    match text.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            emit(
                sink,
                scope
                    .warning(
                        node,
                        Category::Structure,
                        format!("ignoring unknown <{}> value '{text}'", node.tag_name().name()),
                    )
                    .with_rule(Rule::NoteField),
            );
            None
        }
    }
}

fn parse_time_modification(
    node: &Node,
    scope: &Scope,
    sink: &mut dyn WarningSink,
) -> Option<TimeModification> {
    let actual = xml::child(node, "actual-notes")
        .and_then(|n| scope.optional::<u32>(&n, Rule::TimeModificationRatio, sink));
    let normal = xml::child(node, "normal-notes")
        .and_then(|n| scope.optional::<u32>(&n, Rule::TimeModificationRatio, sink));
    let (Some(actual), Some(normal)) = (actual, normal) else {
        emit(
            sink,
            scope
                .warning(
                    node,
                    Category::Validation,
                    "time-modification needs <actual-notes> and <normal-notes>",
                )
                .with_rule(Rule::TimeModificationRatio),
        );
        return None;
    };
    let normal_type = xml::child_text(node, "normal-type").map(String::from);
    let normal_dots = xml::elements(node)
        .filter(|c| c.tag_name().name() == "normal-dot")
        .count() as u32;

    match TimeModification::new(actual, normal, normal_type, normal_dots) {
        Ok(tm) => Some(tm),
        Err(failure) => {
            emit(sink, Warning::from(scope.locate(node, failure)));
            None
        }
    }
}

fn parse_beam(node: &Node, scope: &Scope, sink: &mut dyn WarningSink) -> Option<BeamFragment> {
    let level = match node.attribute("number") {
        None => 1,
        Some(n) => match n.trim().parse::<u32>() {
            Ok(v) if v > 0 => v,
            _ => {
                emit(
                    sink,
                    scope
                        .warning(node, Category::Beam, format!("ignoring beam with level '{n}'"))
                        .with_rule(Rule::BeamOrphan),
                );
                return None;
            }
        },
    };
    let text = xml::text(node).unwrap_or("");
    match text.parse::<BeamMarker>() {
        Ok(marker) => Some(BeamFragment { level, marker }),
        Err(()) => {
            emit(
                sink,
                scope
                    .warning(node, Category::Beam, format!("ignoring unknown beam value '{text}'"))
                    .with_rule(Rule::BeamOrphan),
            );
            None
        }
    }
}

// ─── Notations ───────────────────────────────────────────────────────

fn parse_notations(
    node: &Node,
    fields: &mut NoteFields,
    scope: &Scope,
    sink: &mut dyn WarningSink,
) -> Result<(), ParseError> {
    for child in xml::elements(node) {
        match child.tag_name().name() {
            "slur" => {
                if let Some(slur) = parse_slur(&child, scope, sink)? {
                    fields.slurs.push(slur);
                }
            }
            "tied" => {
                if let Some(tie) = parse_tie(&child, scope, sink) {
                    fields.ties.push(tie);
                }
            }
            "articulations" => {
                fields.articulations.extend(xml::elements(&child).map(|a| Articulation {
                    name: a.tag_name().name().to_string(),
                    placement: a.attribute("placement").and_then(|p| p.parse::<Placement>().ok()),
                }));
            }
            _ => {}
        }
    }
    Ok(())
}

/// A slur without `type` is meaningless and fatal; one with an unknown
/// `type` is dropped with a warning.
fn parse_slur(
    node: &Node,
    scope: &Scope,
    sink: &mut dyn WarningSink,
) -> Result<Option<Slur>, ParseError> {
    let kind = node
        .attribute("type")
        .ok_or_else(|| scope.structure(node, "<slur> is missing its type attribute"))?;
    let Ok(slur_type) = kind.parse::<StartStop>() else {
        emit(
            sink,
            scope
                .warning(node, Category::Notation, format!("dropping slur with type '{kind}'"))
                .with_rule(Rule::SlurType),
        );
        return Ok(None);
    };
    let number = node
        .attribute("number")
        .and_then(|n| n.trim().parse::<u32>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(1);
    let placement = node.attribute("placement").and_then(|p| p.parse().ok());
    Ok(Some(Slur {
        slur_type,
        number,
        placement,
    }))
}

/// `<tie>` or `<tied>`: missing/unknown type drops the tie only.
fn parse_tie(node: &Node, scope: &Scope, sink: &mut dyn WarningSink) -> Option<Tie> {
    match node.attribute("type").map(str::parse::<StartStop>) {
        Some(Ok(tie_type)) => Some(Tie { tie_type }),
        other => {
            let what = match other {
                None => "missing type".to_string(),
                Some(_) => format!("type '{}'", node.attribute("type").unwrap_or_default()),
            };
            emit(
                sink,
                scope
                    .warning(
                        node,
                        Category::Notation,
                        format!("dropping <{}> with {what}", node.tag_name().name()),
                    )
                    .with_rule(Rule::TieType),
            );
            None
        }
    }
}

fn parse_lyric(node: &Node) -> Option<Lyric> {
    let number = node.attribute("number").unwrap_or("1").to_string();
    let text: Vec<&str> = xml::elements(node)
        .filter(|c| c.tag_name().name() == "text")
        .filter_map(|c| xml::text(&c))
        .collect();
    if text.is_empty() {
        return None;
    }
    Some(Lyric {
        number,
        text: text.join(" "),
        syllabic: xml::child_text(node, "syllabic").map(String::from),
    })
}
