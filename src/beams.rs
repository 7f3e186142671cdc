//! Beam group reconstruction.
//!
//! MusicXML writes beams as per-note markers (`begin`, `continue`, `end`,
//! hooks) on each beam level. This module replays those markers in note
//! order and emits one [`Beam`] per closed group. Groups never cross a
//! measure boundary: whatever is still open when the measure ends is
//! discarded with a warning.

use std::collections::BTreeMap;

use crate::model::{Beam, BeamFragment, BeamMarker, BeamRole};
use crate::validation::Rule;
use crate::warning::{emit, Category, Warning, WarningSink};
use crate::xml::Scope;

#[derive(Debug)]
struct OpenGroup {
    notes: Vec<usize>,
    hooked: bool,
    line: Option<u32>,
}

impl OpenGroup {
    fn add(&mut self, index: usize) {
        if self.notes.last() != Some(&index) {
            self.notes.push(index);
        }
    }
}

/// Per-measure beam state: one open group per level.
#[derive(Debug, Default)]
pub struct BeamReconstructor {
    open: BTreeMap<u32, OpenGroup>,
    beams: Vec<Beam>,
}

impl BeamReconstructor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the beam markers of the note stored at `note_index`.
    pub fn push(
        &mut self,
        note_index: usize,
        fragments: &[BeamFragment],
        line: Option<u32>,
        scope: &Scope,
        sink: &mut dyn WarningSink,
    ) {
        for fragment in fragments {
            let level = fragment.level;
            match fragment.marker {
                BeamMarker::Begin => {
                    if let Some(stale) = self.open.remove(&level) {
                        emit(sink, unterminated(level, &stale, scope));
                    }
                    self.open.insert(
                        level,
                        OpenGroup {
                            notes: vec![note_index],
                            hooked: false,
                            line,
                        },
                    );
                }
                BeamMarker::Continue => match self.open.get_mut(&level) {
                    Some(group) => group.add(note_index),
                    None => emit(sink, orphan(level, "continue", line, scope)),
                },
                BeamMarker::ForwardHook | BeamMarker::BackwardHook => {
                    // A hook outside a group is a self-contained partial beam.
                    if let Some(group) = self.open.get_mut(&level) {
                        group.add(note_index);
                        group.hooked = true;
                    }
                }
                BeamMarker::End => match self.open.remove(&level) {
                    Some(mut group) => {
                        group.add(note_index);
                        self.close(level, group, scope, sink);
                    }
                    None => emit(sink, orphan(level, "end", line, scope)),
                },
            }
        }
    }

    fn close(&mut self, level: u32, group: OpenGroup, scope: &Scope, sink: &mut dyn WarningSink) {
        if group.notes.len() < 2 {
            emit(
                sink,
                beam_warning(
                    format!("beam level {level} closes on the note it opened; discarded"),
                    group.line,
                    scope,
                )
                .with_rule(Rule::BeamDegenerate),
            );
            return;
        }
        self.beams.push(Beam {
            level,
            notes: group.notes,
            role: if group.hooked {
                BeamRole::Hooked
            } else {
                BeamRole::Plain
            },
        });
    }

    /// End of measure: discard unterminated groups and return the beams,
    /// ordered by first note then level.
    pub fn finish(mut self, scope: &Scope, sink: &mut dyn WarningSink) -> Vec<Beam> {
        for (level, group) in std::mem::take(&mut self.open) {
            emit(sink, unterminated(level, &group, scope));
        }
        self.beams.sort_by_key(|b| (b.notes[0], b.level));
        self.beams
    }
}

fn beam_warning(message: String, line: Option<u32>, scope: &Scope) -> Warning {
    Warning::new(Category::Beam, message)
        .with_element("beam")
        .with_line(line)
        .in_scope(scope)
}

fn orphan(level: u32, marker: &str, line: Option<u32>, scope: &Scope) -> Warning {
    beam_warning(
        format!("beam '{marker}' on level {level} without an open group; ignored"),
        line,
        scope,
    )
    .with_rule(Rule::BeamOrphan)
}

fn unterminated(level: u32, group: &OpenGroup, scope: &Scope) -> Warning {
    beam_warning(
        format!(
            "beam level {level} opened at note {} is never closed; discarded",
            group.notes[0]
        ),
        group.line,
        scope,
    )
    .with_rule(Rule::BeamUnterminated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn frag(level: u32, marker: BeamMarker) -> BeamFragment {
        BeamFragment { level, marker }
    }

    fn run(per_note: &[Vec<BeamFragment>]) -> (Vec<Beam>, Vec<Warning>) {
        let scope = Scope::part("P1").measure("1");
        let mut warnings = Vec::new();
        let mut rec = BeamReconstructor::new();
        for (i, frags) in per_note.iter().enumerate() {
            rec.push(i, frags, None, &scope, &mut warnings);
        }
        (rec.finish(&scope, &mut warnings), warnings)
    }

    #[test]
    fn begin_continue_end_merges() {
        let (beams, warnings) = run(&[
            vec![frag(1, BeamMarker::Begin)],
            vec![frag(1, BeamMarker::Continue)],
            vec![frag(1, BeamMarker::End)],
        ]);
        assert!(warnings.is_empty());
        assert_eq!(
            beams,
            vec![Beam {
                level: 1,
                notes: vec![0, 1, 2],
                role: BeamRole::Plain
            }]
        );
    }

    #[test]
    fn lone_end_is_discarded_with_warning() {
        let (beams, warnings) = run(&[vec![frag(1, BeamMarker::End)]]);
        assert!(beams.is_empty());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].rule, Some(Rule::BeamOrphan));
    }

    #[test]
    fn nested_levels_are_independent() {
        // eighth + two sixteenths + eighth: level 2 spans notes 1..2
        let (beams, warnings) = run(&[
            vec![frag(1, BeamMarker::Begin)],
            vec![frag(1, BeamMarker::Continue), frag(2, BeamMarker::Begin)],
            vec![frag(1, BeamMarker::Continue), frag(2, BeamMarker::End)],
            vec![frag(1, BeamMarker::End)],
        ]);
        assert!(warnings.is_empty());
        assert_eq!(beams.len(), 2);
        assert_eq!(beams[0].level, 1);
        assert_eq!(beams[0].notes, vec![0, 1, 2, 3]);
        assert_eq!(beams[1].level, 2);
        assert_eq!(beams[1].notes, vec![1, 2]);
    }

    #[test]
    fn hooks_join_the_open_group() {
        // dotted eighth + sixteenth: sixteenth gets a backward hook on level 2
        let (beams, warnings) = run(&[
            vec![frag(1, BeamMarker::Begin)],
            vec![frag(1, BeamMarker::End), frag(2, BeamMarker::BackwardHook)],
        ]);
        assert!(warnings.is_empty());
        assert_eq!(beams.len(), 1);
        assert_eq!(beams[0].role, BeamRole::Plain);

        let (beams, _) = run(&[
            vec![frag(1, BeamMarker::Begin)],
            vec![frag(1, BeamMarker::ForwardHook)],
            vec![frag(1, BeamMarker::End)],
        ]);
        assert_eq!(beams[0].role, BeamRole::Hooked);
        assert_eq!(beams[0].notes, vec![0, 1, 2]);
    }

    #[test]
    fn unterminated_group_is_discarded_at_measure_end() {
        let (beams, warnings) = run(&[
            vec![frag(1, BeamMarker::Begin)],
            vec![frag(1, BeamMarker::Continue)],
        ]);
        assert!(beams.is_empty());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].rule, Some(Rule::BeamUnterminated));
    }

    #[test]
    fn begin_and_end_on_one_note_is_degenerate() {
        let (beams, warnings) = run(&[vec![frag(1, BeamMarker::Begin), frag(1, BeamMarker::End)]]);
        assert!(beams.is_empty());
        assert_eq!(warnings[0].rule, Some(Rule::BeamDegenerate));
    }

    #[test]
    fn restarting_a_level_drops_the_stale_group() {
        let (beams, warnings) = run(&[
            vec![frag(1, BeamMarker::Begin)],
            vec![frag(1, BeamMarker::Begin)],
            vec![frag(1, BeamMarker::End)],
        ]);
        assert_eq!(beams.len(), 1);
        assert_eq!(beams[0].notes, vec![1, 2]);
        assert_eq!(warnings[0].rule, Some(Rule::BeamUnterminated));
    }
}
