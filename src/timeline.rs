//! Within-measure timeline cursor and forward/backup handling.
//!
//! The cursor counts divisions from the start of the measure. Notes move
//! it forward (chord members and grace notes do not), `<forward>` moves it
//! forward and `<backup>` rewinds it.
//!
//! Every forward/backup with a usable duration is also materialised as a
//! rest in the measure's note sequence, so the sequence shows each explicit
//! gap or rewind as a silent event. Both markers synthesize the same kind
//! of rest. This is a single-stream model: it does not rebuild per-voice
//! absolute time.

use roxmltree::Node;

use crate::model::{Note, NoteFields};
use crate::note::effective_divisions;
use crate::validation::Rule;
use crate::values::Duration;
use crate::warning::{emit, Category, WarningSink};
use crate::xml::{self, Scope};

/// Kind of voice-relocation marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relocation {
    Forward,
    Backup,
}

impl Relocation {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "forward" => Some(Relocation::Forward),
            "backup" => Some(Relocation::Backup),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Timeline {
    position: u64,
    extent: u64,
    divisions: Option<u32>,
}

impl Timeline {
    pub fn new(divisions: Option<u32>) -> Self {
        Self {
            divisions,
            ..Self::default()
        }
    }

    /// Current cursor, in divisions.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Furthest point reached so far, in divisions.
    pub fn extent(&self) -> u64 {
        self.extent
    }

    /// A mid-measure divisions change: keep the cursor at the same musical
    /// time expressed in the new unit.
    pub fn set_divisions(&mut self, divisions: u32) {
        if let Some(old) = self.divisions.filter(|&d| d > 0 && d != divisions) {
            let rescale = |v: u64| scale(v, divisions, old);
            self.position = rescale(self.position);
            self.extent = rescale(self.extent);
        }
        self.divisions = Some(divisions);
    }

    /// Account for a written note.
    pub fn advance_note(&mut self, note: &Note) {
        if note.is_chord() || note.is_grace() {
            return;
        }
        if let Some(d) = note.duration() {
            self.advance(self.in_current_unit(&d));
        }
    }

    fn in_current_unit(&self, d: &Duration) -> u64 {
        match self.divisions {
            Some(current) if current != d.divisions() => {
                scale(u64::from(d.value()), current, d.divisions())
            }
            _ => u64::from(d.value()),
        }
    }

    fn advance(&mut self, amount: u64) {
        self.position = self.position.saturating_add(amount);
        self.extent = self.extent.max(self.position);
    }

    /// Apply a `<forward>`/`<backup>` element. Returns the rest that stands
    /// for it, or `None` when the marker has no usable duration.
    pub fn relocate(
        &mut self,
        node: &Node,
        kind: Relocation,
        scope: &Scope,
        sink: &mut dyn WarningSink,
    ) -> Option<Note> {
        let value = match xml::child_text(node, "duration").map(str::parse::<u32>) {
            Some(Ok(v)) if v > 0 => v,
            other => {
                log::trace!(
                    "{:?} without usable duration ({:?}) in measure {:?}; skipped",
                    kind,
                    other,
                    scope.measure_number
                );
                return None;
            }
        };

        match kind {
            Relocation::Forward => self.advance(u64::from(value)),
            Relocation::Backup => {
                let amount = u64::from(value);
                if amount > self.position {
                    emit(
                        sink,
                        scope
                            .warning(
                                node,
                                Category::Timing,
                                format!(
                                    "backup of {value} rewinds past the measure start (cursor at {})",
                                    self.position
                                ),
                            )
                            .with_rule(Rule::TimelineUnderflow),
                    );
                    self.position = 0;
                } else {
                    self.position -= amount;
                }
            }
        }

        let divisions = effective_divisions(node, self.divisions, scope, sink);
        let duration = Duration::new(value, divisions).ok()?;
        let (note_type, dots) = match duration.note_type() {
            Some((name, dots)) => (Some(name.to_string()), dots),
            None => (None, 0),
        };

        let rest = NoteFields {
            rest: true,
            duration: Some(duration),
            note_type,
            dots,
            voice: marker_number(node, "voice"),
            staff: marker_number(node, "staff"),
            synthesized: true,
            ..Default::default()
        };
        match Note::new(rest) {
            Ok(note) => Some(note),
            Err(failure) => {
                emit(sink, scope.locate(node, failure).into());
                None
            }
        }
    }
}

/// `value * to / from`, saturating at `u64::MAX`.
fn scale(value: u64, to: u32, from: u32) -> u64 {
    let scaled = u128::from(value) * u128::from(to) / u128::from(from);
    u64::try_from(scaled).unwrap_or(u64::MAX)
}

fn marker_number(node: &Node, tag: &str) -> Option<u32> {
    xml::child_text(node, tag)?.parse::<u32>().ok().filter(|&v| v > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NoteContent;
    use crate::values::Pitch;

    fn marker(xml_text: &str, kind: Relocation, timeline: &mut Timeline) -> Option<Note> {
        let doc = roxmltree::Document::parse(xml_text).unwrap();
        let mut warnings = Vec::new();
        timeline.relocate(&doc.root_element(), kind, &Scope::default(), &mut warnings)
    }

    fn quarter(divisions: u32) -> Note {
        Note::new(NoteFields {
            pitch: Some(Pitch::new("C", 4, None).unwrap()),
            duration: Some(Duration::new(divisions, divisions).unwrap()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn forward_synthesizes_typed_rest() {
        let mut tl = Timeline::new(Some(480));
        let rest = marker("<forward><duration>960</duration></forward>", Relocation::Forward, &mut tl).unwrap();
        assert_eq!(rest.content(), NoteContent::Rest { measure: false });
        assert!(rest.is_synthesized());
        assert_eq!(rest.note_type(), Some("half"));
        assert_eq!(rest.duration().unwrap().value(), 960);
        assert_eq!(tl.position(), 960);
    }

    #[test]
    fn dotted_and_unmatched_lengths() {
        let mut tl = Timeline::new(Some(480));
        let rest = marker("<forward><duration>720</duration></forward>", Relocation::Forward, &mut tl).unwrap();
        assert_eq!(rest.note_type(), Some("quarter"));
        assert_eq!(rest.dots(), 1);

        let rest = marker("<forward><duration>100</duration></forward>", Relocation::Forward, &mut tl).unwrap();
        assert_eq!(rest.note_type(), None);
    }

    #[test]
    fn markers_without_duration_are_skipped() {
        let mut tl = Timeline::new(Some(480));
        assert!(marker("<forward/>", Relocation::Forward, &mut tl).is_none());
        assert!(marker("<backup><duration>abc</duration></backup>", Relocation::Backup, &mut tl).is_none());
        assert!(marker("<backup><duration>-4</duration></backup>", Relocation::Backup, &mut tl).is_none());
        assert_eq!(tl.position(), 0);
    }

    #[test]
    fn backup_rewinds_and_keeps_extent() {
        let mut tl = Timeline::new(Some(4));
        for _ in 0..4 {
            tl.advance_note(&quarter(4));
        }
        assert_eq!(tl.position(), 16);
        let rest = marker("<backup><duration>16</duration></backup>", Relocation::Backup, &mut tl).unwrap();
        assert_eq!(rest.note_type(), Some("whole"));
        assert_eq!(tl.position(), 0);
        assert_eq!(tl.extent(), 16);
    }

    #[test]
    fn backup_past_start_clamps_with_warning() {
        let doc = roxmltree::Document::parse("<backup><duration>8</duration></backup>").unwrap();
        let mut tl = Timeline::new(Some(4));
        let mut warnings = Vec::new();
        tl.relocate(&doc.root_element(), Relocation::Backup, &Scope::default(), &mut warnings);
        assert_eq!(tl.position(), 0);
        assert_eq!(warnings[0].rule, Some(Rule::TimelineUnderflow));
    }

    #[test]
    fn chords_do_not_advance() {
        let mut tl = Timeline::new(Some(4));
        tl.advance_note(&quarter(4));
        let chord = Note::new(NoteFields {
            pitch: Some(Pitch::new("E", 4, None).unwrap()),
            duration: Some(Duration::new(4, 4).unwrap()),
            chord: true,
            ..Default::default()
        })
        .unwrap();
        tl.advance_note(&chord);
        assert_eq!(tl.position(), 4);
    }

    #[test]
    fn divisions_change_rescales_cursor() {
        let mut tl = Timeline::new(Some(2));
        tl.advance_note(&quarter(2));
        tl.set_divisions(8);
        assert_eq!(tl.position(), 8);
        tl.advance_note(&quarter(8));
        assert_eq!(tl.position(), 16);
    }

    #[test]
    fn rescale_of_a_long_cursor_does_not_overflow() {
        let mut tl = Timeline::new(Some(u32::MAX));
        for _ in 0..3 {
            marker(
                "<forward><duration>4294967295</duration></forward>",
                Relocation::Forward,
                &mut tl,
            );
        }
        tl.set_divisions(u32::MAX - 1);
        assert_eq!(tl.position(), 3 * u64::from(u32::MAX - 1));
        assert_eq!(tl.extent(), tl.position());
    }
}
