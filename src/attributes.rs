//! `<attributes>` resolver.
//!
//! Turns one attributes block into an [`AttributesUpdate`]: every field is
//! optional and only the fields present in the block are set, so the
//! measure engine can merge it over the inherited state.
//!
//! Unparsable divisions/fifths/beats/beat-type are fatal: every duration
//! after them would be computed against a wrong context. Problems in the
//! other children are warnings.

use roxmltree::Node;

use crate::error::{ParseError, ValidationFailure};
use crate::model::{AttributesUpdate, Transpose};
use crate::options::ParseOptions;
use crate::validation::{self, Rule};
use crate::values::{Clef, ClefSign, KeySignature, Mode, TimeSignature};
use crate::warning::{emit, Category, Warning, WarningSink};
use crate::xml::{self, Scope};

/// Resolve one `<attributes>` block.
///
/// `inherited_divisions` is the divisions value in effect before this
/// block (absent on a part's first measure).
pub fn resolve_attributes(
    node: &Node,
    inherited_divisions: Option<u32>,
    scope: &Scope,
    options: &ParseOptions,
    sink: &mut dyn WarningSink,
) -> Result<AttributesUpdate, ParseError> {
    let mut update = AttributesUpdate::default();

    for child in xml::elements(node) {
        match child.tag_name().name() {
            "divisions" => {
                let divisions = parse_divisions(&child, scope)?;
                if inherited_divisions.is_some_and(|d| d != divisions) {
                    log::trace!(
                        "divisions change {:?} -> {divisions} in measure {:?}",
                        inherited_divisions,
                        scope.measure_number
                    );
                }
                update.divisions = Some(divisions);
            }
            "key" => {
                if let Some(key) = parse_key(&child, scope, sink)? {
                    update.key = Some(key);
                }
            }
            "time" => {
                if let Some(time) = parse_time(&child, scope)? {
                    update.time = Some(time);
                }
            }
            "clef" => {
                if let Some(clef) = parse_clef(&child, scope, options, sink)? {
                    update.clefs.push(clef);
                }
            }
            "staves" => {
                update.staves = scope
                    .optional::<u32>(&child, Rule::NoteStaff, sink)
                    .filter(|&s| s > 0);
            }
            "transpose" => update.transpose = parse_transpose(&child, scope, sink),
            _ => {}
        }
    }

    Ok(update)
}

fn parse_divisions(node: &Node, scope: &Scope) -> Result<u32, ParseError> {
    let value: i64 = scope.required(node)?;
    u32::try_from(value)
        .ok()
        .filter(|&d| d > 0)
        .ok_or_else(|| {
            scope
                .locate(
                    node,
                    ValidationFailure::new(
                        Rule::Divisions,
                        format!("divisions must be a positive integer, got {value}"),
                    ),
                )
                .into()
        })
}

// ─── Key ─────────────────────────────────────────────────────────────

fn parse_key(
    node: &Node,
    scope: &Scope,
    sink: &mut dyn WarningSink,
) -> Result<Option<KeySignature>, ParseError> {
    let Some(fifths_node) = xml::child(node, "fifths") else {
        // Non-traditional keys (<key-step>/<key-alter>) carry no fifths.
        emit(
            sink,
            scope.warning(
                node,
                Category::Structure,
                "key without <fifths> is not supported; key left unchanged",
            ),
        );
        return Ok(None);
    };
    let fifths: i32 = scope.required(&fifths_node)?;

    let mode = match xml::child(node, "mode") {
        None => None,
        Some(mode_node) => match xml::text(&mode_node).map(str::parse::<Mode>) {
            Some(Ok(mode)) => Some(mode),
            Some(Err(failure)) => {
                emit(sink, Warning::from(scope.locate(&mode_node, failure)));
                None
            }
            None => None,
        },
    };

    let key = KeySignature::new(fifths, mode).map_err(|f| scope.locate(&fifths_node, f))?;
    Ok(Some(key))
}

// ─── Time ────────────────────────────────────────────────────────────

fn parse_time(node: &Node, scope: &Scope) -> Result<Option<TimeSignature>, ParseError> {
    if xml::has_child(node, "senza-misura") {
        return Ok(None);
    }
    let beats_node = xml::child(node, "beats")
        .ok_or_else(|| scope.structure(node, "<time> is missing <beats>"))?;
    let beat_type_node = xml::child(node, "beat-type")
        .ok_or_else(|| scope.structure(node, "<time> is missing <beat-type>"))?;

    let beats = parse_beats(&beats_node, scope)?;
    let beat_type: u32 = scope.required(&beat_type_node)?;

    let time = TimeSignature::new(beats, beat_type).map_err(|f| scope.locate(node, f))?;
    Ok(Some(time))
}

/// `<beats>` may be additive, e.g. "3+2".
fn parse_beats(node: &Node, scope: &Scope) -> Result<u32, ParseError> {
    let text = xml::text(node).ok_or_else(|| scope.structure(node, "<beats> is empty"))?;
    text.split('+')
        .try_fold(0u32, |total, part| total.checked_add(part.trim().parse::<u32>().ok()?))
        .ok_or_else(|| {
            scope
                .structure(node, format!("<beats> has unparsable value '{text}'"))
                .into()
        })
}

// ─── Clef ────────────────────────────────────────────────────────────

fn parse_clef(
    node: &Node,
    scope: &Scope,
    options: &ParseOptions,
    sink: &mut dyn WarningSink,
) -> Result<Option<Clef>, ParseError> {
    let staff_number = match node.attribute("number") {
        None => 1,
        Some(n) => match n.trim().parse::<u32>() {
            Ok(v) if v > 0 => v,
            _ => {
                emit(
                    sink,
                    scope
                        .warning(
                            node,
                            Category::Structure,
                            format!("clef staff number '{n}' is invalid; using staff 1"),
                        )
                        .with_rule(Rule::ClefLine),
                );
                1
            }
        },
    };

    let sign_node = xml::child(node, "sign")
        .ok_or_else(|| scope.structure(node, "<clef> is missing <sign>"))?;
    let sign = match xml::text(&sign_node).unwrap_or("").parse::<ClefSign>() {
        Ok(sign) => sign,
        Err(failure) => {
            emit(sink, Warning::from(scope.locate(&sign_node, failure)));
            return Ok(None);
        }
    };

    let line = xml::child(node, "line")
        .and_then(|l| scope.optional::<u32>(&l, Rule::ClefLine, sink))
        .filter(|&l| l > 0);
    let octave_change = xml::child(node, "clef-octave-change")
        .and_then(|c| scope.optional::<i32>(&c, Rule::ClefLine, sink));

    let clef = match Clef::new(sign, line, octave_change, staff_number) {
        Ok(clef) => clef,
        Err(failure) => {
            emit(sink, Warning::from(scope.locate(node, failure)));
            return Ok(None);
        }
    };

    if options.strict_clef_lines {
        if let Err(failure) = validation::check_clef_line(&clef) {
            emit(sink, Warning::from(scope.locate(node, failure)));
        }
    }

    Ok(Some(clef))
}

// ─── Transpose ───────────────────────────────────────────────────────

fn parse_transpose(node: &Node, scope: &Scope, sink: &mut dyn WarningSink) -> Option<Transpose> {
    let mut t = Transpose::default();
    for child in xml::elements(node) {
        match child.tag_name().name() {
            "diatonic" => t.diatonic = scope.optional(&child, Rule::NoteField, sink)?,
            "chromatic" => t.chromatic = scope.optional(&child, Rule::NoteField, sink)?,
            "octave-change" => t.octave_change = scope.optional(&child, Rule::NoteField, sink),
            _ => {}
        }
    }
    Some(t)
}
