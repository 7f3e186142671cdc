//! Non-note measure content: chord symbols, barlines, directions and
//! print hints.
//!
//! None of these affect the timeline, so a malformed value here is always
//! a warning and never fails the parse.

use roxmltree::Node;

use crate::model::{
    Barline, Direction, Ending, Harmony, HarmonyRoot, MetronomeMark, OctaveShift, PrintHints,
    Repeat,
};
use crate::validation::Rule;
use crate::warning::{emit, Category, WarningSink};
use crate::xml::{self, Scope};

// ─── Harmony ─────────────────────────────────────────────────────────

pub fn parse_harmony(node: &Node, scope: &Scope, sink: &mut dyn WarningSink) -> Option<Harmony> {
    let Some(root) = xml::child(node, "root").and_then(|r| harmony_root(&r, "root", scope, sink))
    else {
        emit(
            sink,
            scope.warning(node, Category::Notation, "harmony without <root-step>; skipped"),
        );
        return None;
    };
    let kind = xml::child_text(node, "kind").unwrap_or("major").to_string();
    let bass = xml::child(node, "bass").and_then(|b| harmony_root(&b, "bass", scope, sink));
    Some(Harmony { root, kind, bass })
}

/// `<root>`/`<bass>`: `<{prefix}-step>` plus optional `<{prefix}-alter>`.
fn harmony_root(
    node: &Node,
    prefix: &str,
    scope: &Scope,
    sink: &mut dyn WarningSink,
) -> Option<HarmonyRoot> {
    let step = xml::child_text(node, &format!("{prefix}-step"))?.to_string();
    let alter = xml::child(node, &format!("{prefix}-alter"))
        .and_then(|a| scope.optional::<f64>(&a, Rule::PitchAlter, sink));
    Some(HarmonyRoot { step, alter })
}

// ─── Barline ─────────────────────────────────────────────────────────

/// A barline and the volta bracket attached to it, if any.
pub fn parse_barline(node: &Node, scope: &Scope, sink: &mut dyn WarningSink) -> (Barline, Option<Ending>) {
    let location = node.attribute("location").unwrap_or("right").to_string();
    let mut barline = Barline {
        location: location.clone(),
        bar_style: None,
        repeat: None,
    };
    let mut ending = None;

    for child in xml::elements(node) {
        match child.tag_name().name() {
            "bar-style" => barline.bar_style = xml::text(&child).map(String::from),
            "repeat" => {
                let direction = child.attribute("direction").unwrap_or("forward").to_string();
                let times = match child.attribute("times").map(|t| t.trim().parse::<u32>()) {
                    None => None,
                    Some(Ok(t)) => Some(t),
                    Some(Err(_)) => {
                        emit(
                            sink,
                            scope
                                .warning(&child, Category::Structure, "ignoring unparsable repeat times")
                                .with_context("text", child.attribute("times").unwrap_or_default()),
                        );
                        None
                    }
                };
                barline.repeat = Some(Repeat { direction, times });
            }
            "ending" => {
                let Some(number) = child.attribute("number") else {
                    emit(
                        sink,
                        scope.warning(&child, Category::Structure, "ending without a number; skipped"),
                    );
                    continue;
                };
                ending = Some(Ending {
                    number: number.to_string(),
                    ending_type: child.attribute("type").unwrap_or("start").to_string(),
                    text: xml::text(&child).map(String::from),
                    location: location.clone(),
                });
            }
            _ => {}
        }
    }

    (barline, ending)
}

// ─── Direction ───────────────────────────────────────────────────────

/// Returns `None` for directions that carry nothing this model records
/// (pedal marks, brackets, ...).
pub fn parse_direction(node: &Node, scope: &Scope, sink: &mut dyn WarningSink) -> Option<Direction> {
    let mut direction = Direction {
        placement: node.attribute("placement").and_then(|p| p.parse().ok()),
        voice: xml::child_text(node, "voice").and_then(|v| v.parse().ok()),
        staff: xml::child_text(node, "staff").and_then(|s| s.parse().ok()),
        ..Default::default()
    };

    for child in xml::elements(node) {
        match child.tag_name().name() {
            "direction-type" => {
                for dt in xml::elements(&child) {
                    direction_type(&dt, &mut direction, scope, sink);
                }
            }
            "sound" => apply_sound(&child, &mut direction, scope, sink),
            _ => {}
        }
    }

    (!direction.is_empty()).then_some(direction)
}

fn direction_type(node: &Node, direction: &mut Direction, scope: &Scope, sink: &mut dyn WarningSink) {
    match node.tag_name().name() {
        "words" => {
            if let Some(t) = xml::text(node) {
                direction.words.push(t.to_string());
            }
        }
        "metronome" => direction.metronome = parse_metronome(node, scope, sink),
        "dynamics" => direction
            .dynamics
            .extend(xml::elements(node).map(|d| d.tag_name().name().to_string())),
        "wedge" => direction.wedge = node.attribute("type").map(String::from),
        "octave-shift" => {
            if let Some(shift_type) = node.attribute("type") {
                let size = node
                    .attribute("size")
                    .and_then(|s| s.trim().parse::<u32>().ok())
                    .unwrap_or(8);
                direction.octave_shift = Some(OctaveShift {
                    shift_type: shift_type.to_string(),
                    size,
                });
            }
        }
        "rehearsal" => direction.rehearsal = xml::text(node).map(String::from),
        "segno" => direction.segno = true,
        "coda" => direction.coda = true,
        _ => {}
    }
}

/// Playback attributes of `<sound>`.
fn apply_sound(node: &Node, direction: &mut Direction, scope: &Scope, sink: &mut dyn WarningSink) {
    if let Some(tempo) = node.attribute("tempo") {
        match tempo.trim().parse::<f64>() {
            Ok(t) if t > 0.0 => direction.sound_tempo = Some(t),
            _ => emit(
                sink,
                scope
                    .warning(node, Category::Notation, format!("ignoring sound tempo '{tempo}'"))
                    .with_context("text", tempo),
            ),
        }
    }
    direction.dacapo |= xml::is_yes(node, "dacapo");
    direction.dalsegno |= node.attribute("dalsegno").is_some();
    direction.fine |= node.attribute("fine").is_some();
    direction.tocoda |= node.attribute("tocoda").is_some();
}

/// A `<sound>` written directly inside `<measure>`.
pub fn parse_sound(node: &Node, scope: &Scope, sink: &mut dyn WarningSink) -> Option<Direction> {
    let mut direction = Direction::default();
    apply_sound(node, &mut direction, scope, sink);
    (!direction.is_empty()).then_some(direction)
}

fn parse_metronome(node: &Node, scope: &Scope, sink: &mut dyn WarningSink) -> Option<MetronomeMark> {
    let beat_unit = xml::child_text(node, "beat-unit").unwrap_or("quarter").to_string();
    let dotted = xml::has_child(node, "beat-unit-dot");
    let per_minute = match xml::child(node, "per-minute") {
        // Text tempos like "c. 120" are common; keep the leading number.
        Some(pm) => match xml::text(&pm).and_then(leading_number) {
            Some(v) if v > 0.0 => v,
            _ => {
                emit(
                    sink,
                    scope
                        .warning(&pm, Category::Notation, "metronome mark without a usable <per-minute>")
                        .with_context("text", xml::text(&pm).unwrap_or_default()),
                );
                return None;
            }
        },
        // beat-unit = beat-unit (metric modulation) has no tempo
        None => return None,
    };
    Some(MetronomeMark {
        beat_unit,
        dotted,
        per_minute,
    })
}

fn leading_number(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let rest = &text[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}

// ─── Print ───────────────────────────────────────────────────────────

pub fn parse_print(node: &Node) -> PrintHints {
    PrintHints {
        new_system: xml::is_yes(node, "new-system"),
        new_page: xml::is_yes(node, "new-page"),
        page_number: node.attribute("page-number").map(String::from),
        system_layout: xml::has_child(node, "system-layout"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Placement;
    use crate::warning::Warning;

    fn with<T>(xml_text: &str, f: impl FnOnce(&Node, &Scope, &mut dyn WarningSink) -> T) -> (T, Vec<Warning>) {
        let doc = roxmltree::Document::parse(xml_text).unwrap();
        let mut warnings: Vec<Warning> = Vec::new();
        let out = f(&doc.root_element(), &Scope::part("P1").measure("3"), &mut warnings);
        (out, warnings)
    }

    #[test]
    fn harmony_with_bass() {
        let (h, w) = with(
            "<harmony><root><root-step>D</root-step><root-alter>-1</root-alter></root>
             <kind>minor-seventh</kind><bass><bass-step>F</bass-step></bass></harmony>",
            parse_harmony,
        );
        let h = h.unwrap();
        assert!(w.is_empty());
        assert_eq!(h.root.step, "D");
        assert_eq!(h.root.alter, Some(-1.0));
        assert_eq!(h.kind, "minor-seventh");
        assert_eq!(h.bass.unwrap().step, "F");
    }

    #[test]
    fn harmony_without_root_is_skipped() {
        let (h, w) = with("<harmony><kind>major</kind></harmony>", parse_harmony);
        assert!(h.is_none());
        assert_eq!(w.len(), 1);
    }

    #[test]
    fn barline_with_repeat_and_ending() {
        let ((barline, ending), w) = with(
            r#"<barline location="right"><bar-style>light-heavy</bar-style>
               <ending number="1" type="stop"/><repeat direction="backward" times="3"/></barline>"#,
            parse_barline,
        );
        assert!(w.is_empty());
        assert_eq!(barline.bar_style.as_deref(), Some("light-heavy"));
        let repeat = barline.repeat.unwrap();
        assert_eq!(repeat.direction, "backward");
        assert_eq!(repeat.times, Some(3));
        let ending = ending.unwrap();
        assert_eq!(ending.number, "1");
        assert_eq!(ending.ending_type, "stop");
        assert_eq!(ending.location, "right");
    }

    #[test]
    fn direction_contents() {
        let (d, w) = with(
            r#"<direction placement="above">
                 <direction-type><words>Allegro</words></direction-type>
                 <direction-type><metronome><beat-unit>quarter</beat-unit><beat-unit-dot/><per-minute>c. 96</per-minute></metronome></direction-type>
                 <direction-type><dynamics><mf/></dynamics></direction-type>
                 <staff>2</staff>
                 <sound tempo="144" dacapo="yes"/>
               </direction>"#,
            parse_direction,
        );
        let d = d.unwrap();
        assert!(w.is_empty());
        assert_eq!(d.placement, Some(Placement::Above));
        assert_eq!(d.words, vec!["Allegro".to_string()]);
        let m = d.metronome.unwrap();
        assert!(m.dotted);
        assert_eq!(m.per_minute, 96.0);
        assert_eq!(d.dynamics, vec!["mf".to_string()]);
        assert_eq!(d.sound_tempo, Some(144.0));
        assert!(d.dacapo);
        assert_eq!(d.staff, Some(2));
    }

    #[test]
    fn empty_direction_is_dropped() {
        let (d, _) = with("<direction><direction-type><pedal type=\"start\"/></direction-type></direction>", parse_direction);
        assert!(d.is_none());
    }

    #[test]
    fn bad_tempo_is_reported() {
        let (d, w) = with(r#"<sound tempo="fast"/>"#, parse_sound);
        assert!(d.is_none());
        assert_eq!(w.len(), 1);
        assert_eq!(w[0].context.get("text").map(String::as_str), Some("fast"));
    }

    #[test]
    fn print_hints() {
        let doc = roxmltree::Document::parse(r#"<print new-page="yes"><system-layout/></print>"#).unwrap();
        let hints = parse_print(&doc.root_element());
        assert!(hints.new_page);
        assert!(hints.system_layout);
        assert!(hints.starts_system());
    }
}
