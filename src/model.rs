//! Data model for a parsed MusicXML score.
//!
//! Parts own measures, measures own notes and beams; nothing points back
//! at its parent. Leaf values (pitch, duration, key, time, clef, tuplet
//! ratio) live in [`crate::values`] and are validated on construction.

use std::num::NonZeroU32;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationFailure;
use crate::validation::Rule;
use crate::values::{Clef, Duration, KeySignature, Pitch, TimeModification, TimeSignature};

/// A complete musical score parsed from MusicXML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Score {
    /// MusicXML version (e.g., "3.1", "4.0")
    pub version: Option<String>,
    /// Title of the piece
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub movement_title: Option<String>,
    pub composer: Option<String>,
    pub arranger: Option<String>,
    pub lyricist: Option<String>,
    /// Software that created the file
    pub software: Option<String>,
    pub encoding_date: Option<String>,
    /// Page layout defaults
    pub defaults: Option<Defaults>,
    pub credits: Vec<Credit>,
    /// Musical parts (instruments)
    pub parts: Vec<Part>,
}

/// Page layout defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Defaults {
    /// Scaling: millimeters per tenths
    pub millimeters: Option<f64>,
    pub tenths: Option<f64>,
    /// Page dimensions in tenths
    pub page_height: Option<f64>,
    pub page_width: Option<f64>,
    /// Page margins in tenths
    pub left_margin: Option<f64>,
    pub right_margin: Option<f64>,
    pub top_margin: Option<f64>,
    pub bottom_margin: Option<f64>,
}

/// Text printed on a page (title, composer, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credit {
    pub page: Option<u32>,
    /// "title", "subtitle", "composer", ...
    pub credit_type: Option<String>,
    pub words: Vec<String>,
}

/// A musical part (one instrument or voice).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    /// Part identifier (e.g., "P1")
    pub id: String,
    /// Part name from the part-list (e.g., "Classical Guitar")
    pub name: Option<String>,
    pub abbreviation: Option<String>,
    pub midi: Option<MidiInstrument>,
    pub measures: Vec<Measure>,
}

/// MIDI playback descriptor from the part-list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MidiInstrument {
    pub id: Option<String>,
    pub channel: Option<u32>,
    pub program: Option<u32>,
    pub volume: Option<f64>,
    pub pan: Option<f64>,
}

/// A single measure (bar), carrying its effective key, time and clefs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    /// Measure number as written; "0" only on pickup measures
    pub number: String,
    /// Whether this is an implicit measure (pickup/anacrusis)
    pub implicit: bool,
    /// Width in tenths (for layout)
    pub width: Option<f64>,
    /// Divisions per quarter note in effect at the end of the measure
    pub divisions: Option<u32>,
    pub key: Option<KeySignature>,
    pub time: Option<TimeSignature>,
    /// Effective clef per staff, ordered by staff number
    pub clefs: Vec<Clef>,
    pub staves: Option<u32>,
    pub transpose: Option<Transpose>,
    /// Attribute changes written in this measure, merged in document order
    pub attributes: Option<AttributesUpdate>,
    /// Notes and rests, including rests synthesized from forward/backup
    pub notes: Vec<Note>,
    /// Beam groups; indices point into `notes`
    pub beams: Vec<Beam>,
    /// Chord symbols
    pub harmonies: Vec<Harmony>,
    pub barlines: Vec<Barline>,
    /// Volta brackets (1st/2nd endings)
    pub endings: Vec<Ending>,
    pub directions: Vec<Direction>,
    pub print: Option<PrintHints>,
    /// Furthest point the timeline cursor reached, in divisions
    pub extent: u64,
}

impl Measure {
    /// Notes written in the document, without synthesized rests.
    pub fn written_notes(&self) -> impl Iterator<Item = &Note> {
        self.notes.iter().filter(|n| !n.synthesized)
    }

    pub fn clef_for_staff(&self, staff: u32) -> Option<&Clef> {
        self.clefs.iter().find(|c| c.staff_number() == staff)
    }
}

/// Partial update from one `<attributes>` block. Each field is optional;
/// only present fields overwrite the inherited state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributesUpdate {
    pub divisions: Option<u32>,
    pub key: Option<KeySignature>,
    pub time: Option<TimeSignature>,
    /// One per staff; staff number defaults to 1
    pub clefs: Vec<Clef>,
    /// Number of staves (e.g. 2 for a piano grand staff)
    pub staves: Option<u32>,
    pub transpose: Option<Transpose>,
}

impl AttributesUpdate {
    pub fn is_empty(&self) -> bool {
        self.divisions.is_none()
            && self.key.is_none()
            && self.time.is_none()
            && self.clefs.is_empty()
            && self.staves.is_none()
            && self.transpose.is_none()
    }

    /// Fold a later block of the same measure into this record.
    pub fn merge(&mut self, later: AttributesUpdate) {
        if later.divisions.is_some() {
            self.divisions = later.divisions;
        }
        if later.key.is_some() {
            self.key = later.key;
        }
        if later.time.is_some() {
            self.time = later.time;
        }
        self.clefs.extend(later.clefs);
        if later.staves.is_some() {
            self.staves = later.staves;
        }
        if later.transpose.is_some() {
            self.transpose = later.transpose;
        }
    }
}

/// Transposition information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transpose {
    pub diatonic: i32,
    pub chromatic: i32,
    pub octave_change: Option<i32>,
}

// ─── Notes ───────────────────────────────────────────────────────────

/// What sounds: a pitch, an unpitched (percussion) stroke, or silence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoteContent {
    Pitched(Pitch),
    /// Percussion note, optionally with a display position
    Unpitched(Option<Pitch>),
    Rest { measure: bool },
}

/// A single note or rest. Built only through [`Note::new`] and read
/// through accessors afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    content: NoteContent,
    /// `None` for grace notes and notes whose duration could not be read
    duration: Option<Duration>,
    voice: Option<NonZeroU32>,
    /// Staff number (1-based; for multi-staff parts like piano)
    staff: Option<NonZeroU32>,
    /// Note type: "whole", "half", "quarter", "eighth", "16th", ...
    note_type: Option<String>,
    dots: u32,
    time_modification: Option<TimeModification>,
    stem: Option<Stem>,
    /// Accidental: "sharp", "flat", "natural", "double-sharp", ...
    accidental: Option<String>,
    slurs: Vec<Slur>,
    ties: Vec<Tie>,
    articulations: Vec<Articulation>,
    /// Sounds together with the previous note; does not advance time
    chord: bool,
    grace: Option<Grace>,
    lyrics: Vec<Lyric>,
    /// Default X position in tenths (for layout)
    default_x: Option<f64>,
    /// Default Y position in tenths (for layout)
    default_y: Option<f64>,
    /// Rest inserted for a forward/backup marker, not written as a note
    synthesized: bool,
}

/// Loose note fields, validated together by [`Note::new`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteFields {
    pub pitch: Option<Pitch>,
    pub rest: bool,
    pub measure_rest: bool,
    pub unpitched: bool,
    pub duration: Option<Duration>,
    pub voice: Option<u32>,
    pub staff: Option<u32>,
    pub note_type: Option<String>,
    pub dots: u32,
    pub time_modification: Option<TimeModification>,
    pub stem: Option<Stem>,
    pub accidental: Option<String>,
    pub slurs: Vec<Slur>,
    pub ties: Vec<Tie>,
    pub articulations: Vec<Articulation>,
    pub chord: bool,
    pub grace: Option<Grace>,
    pub lyrics: Vec<Lyric>,
    pub default_x: Option<f64>,
    pub default_y: Option<f64>,
    pub synthesized: bool,
}

impl Note {
    /// Build a note, rejecting combinations that cannot exist: a rest
    /// with a pitch, a pitched note without one, zero voice/staff numbers.
    pub fn new(fields: NoteFields) -> Result<Self, ValidationFailure> {
        let content = match (fields.rest, fields.unpitched, fields.pitch) {
            (true, _, Some(p)) => {
                return Err(ValidationFailure::new(
                    Rule::NoteRestExclusive,
                    format!("rest cannot carry pitch {p}"),
                ))
            }
            (true, true, None) => {
                return Err(ValidationFailure::new(
                    Rule::NoteRestExclusive,
                    "rest cannot also be unpitched",
                ))
            }
            (true, false, None) => NoteContent::Rest {
                measure: fields.measure_rest,
            },
            (false, true, display) => NoteContent::Unpitched(display),
            (false, false, Some(p)) => NoteContent::Pitched(p),
            (false, false, None) => {
                return Err(ValidationFailure::new(
                    Rule::NoteRestExclusive,
                    "note is neither a rest nor pitched",
                ))
            }
        };
        let voice = positive(fields.voice, Rule::NoteVoice, "voice")?;
        let staff = positive(fields.staff, Rule::NoteStaff, "staff")?;

        Ok(Self {
            content,
            duration: fields.duration,
            voice,
            staff,
            note_type: fields.note_type,
            dots: fields.dots,
            time_modification: fields.time_modification,
            stem: fields.stem,
            accidental: fields.accidental,
            slurs: fields.slurs,
            ties: fields.ties,
            articulations: fields.articulations,
            chord: fields.chord,
            grace: fields.grace,
            lyrics: fields.lyrics,
            default_x: fields.default_x,
            default_y: fields.default_y,
            synthesized: fields.synthesized,
        })
    }

    pub fn content(&self) -> NoteContent {
        self.content
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn voice(&self) -> Option<NonZeroU32> {
        self.voice
    }

    pub fn staff(&self) -> Option<NonZeroU32> {
        self.staff
    }

    pub fn note_type(&self) -> Option<&str> {
        self.note_type.as_deref()
    }

    pub fn dots(&self) -> u32 {
        self.dots
    }

    pub fn time_modification(&self) -> Option<&TimeModification> {
        self.time_modification.as_ref()
    }

    pub fn stem(&self) -> Option<Stem> {
        self.stem
    }

    pub fn accidental(&self) -> Option<&str> {
        self.accidental.as_deref()
    }

    pub fn slurs(&self) -> &[Slur] {
        &self.slurs
    }

    pub fn ties(&self) -> &[Tie] {
        &self.ties
    }

    pub fn articulations(&self) -> &[Articulation] {
        &self.articulations
    }

    pub fn is_chord(&self) -> bool {
        self.chord
    }

    pub fn grace(&self) -> Option<Grace> {
        self.grace
    }

    pub fn lyrics(&self) -> &[Lyric] {
        &self.lyrics
    }

    pub fn default_x(&self) -> Option<f64> {
        self.default_x
    }

    pub fn default_y(&self) -> Option<f64> {
        self.default_y
    }

    /// Rest standing for a forward/backup marker.
    pub fn is_synthesized(&self) -> bool {
        self.synthesized
    }

    pub fn pitch(&self) -> Option<&Pitch> {
        match self.content {
            NoteContent::Pitched(ref p) => Some(p),
            _ => None,
        }
    }

    pub fn is_rest(&self) -> bool {
        matches!(self.content, NoteContent::Rest { .. })
    }

    pub fn is_grace(&self) -> bool {
        self.grace.is_some()
    }

    /// Sounding length in quarter notes, if the duration is known.
    pub fn quarters(&self) -> Option<f64> {
        self.duration.map(|d| d.quarters())
    }

    /// Length implied by the notated type, dots and tuplet ratio.
    pub fn notated_quarters(&self) -> Option<f64> {
        let base = crate::values::note_type_quarters(self.note_type.as_deref()?)?;
        let mut total = base;
        let mut add = base;
        for _ in 0..self.dots {
            add /= 2.0;
            total += add;
        }
        Some(match self.time_modification {
            Some(ref tm) => tm.apply(total),
            None => total,
        })
    }
}

fn positive(value: Option<u32>, rule: Rule, what: &str) -> Result<Option<NonZeroU32>, ValidationFailure> {
    match value {
        None => Ok(None),
        Some(v) => NonZeroU32::new(v)
            .map(Some)
            .ok_or_else(|| ValidationFailure::new(rule, format!("{what} must be > 0"))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stem {
    Up,
    Down,
    None,
    Double,
}

impl FromStr for Stem {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "up" => Ok(Stem::Up),
            "down" => Ok(Stem::Down),
            "none" => Ok(Stem::None),
            "double" => Ok(Stem::Double),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Above,
    Below,
}

impl FromStr for Placement {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "above" => Ok(Placement::Above),
            "below" => Ok(Placement::Below),
            _ => Err(()),
        }
    }
}

/// Role of a slur or tie marker on a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartStop {
    Start,
    Stop,
    Continue,
}

impl FromStr for StartStop {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "start" => Ok(StartStop::Start),
            "stop" => Ok(StartStop::Stop),
            "continue" => Ok(StartStop::Continue),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slur {
    pub slur_type: StartStop,
    /// Distinguishes overlapping slurs (defaults to 1)
    pub number: u32,
    pub placement: Option<Placement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tie {
    pub tie_type: StartStop,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Articulation {
    /// Element name: "staccato", "accent", "tenuto", ...
    pub name: String,
    pub placement: Option<Placement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grace {
    /// Acciaccatura (slashed) vs. appoggiatura
    pub slash: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lyric {
    /// Verse number or name (defaults to "1")
    pub number: String,
    pub text: String,
    /// "single", "begin", "middle", "end"
    pub syllabic: Option<String>,
}

// ─── Beams ───────────────────────────────────────────────────────────

/// Per-note beam marker as written in `<beam>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BeamMarker {
    Begin,
    Continue,
    End,
    ForwardHook,
    BackwardHook,
}

impl FromStr for BeamMarker {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "begin" => Ok(BeamMarker::Begin),
            "continue" => Ok(BeamMarker::Continue),
            "end" => Ok(BeamMarker::End),
            "forward hook" => Ok(BeamMarker::ForwardHook),
            "backward hook" => Ok(BeamMarker::BackwardHook),
            _ => Err(()),
        }
    }
}

/// One `<beam>` element of one note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeamFragment {
    /// Beam level (1 = eighth-note beam, 2 = sixteenth-note beam, etc.)
    pub level: u32,
    pub marker: BeamMarker,
}

/// Summary of the markers that formed a beam group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BeamRole {
    /// begin / continue / end only
    Plain,
    /// at least one forward or backward hook inside the group
    Hooked,
}

/// A beam group spanning at least two notes of one measure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beam {
    pub level: u32,
    /// Indices into `Measure::notes`, ascending
    pub notes: Vec<usize>,
    pub role: BeamRole,
}

// ─── Measure markings ────────────────────────────────────────────────

/// A chord symbol (harmony).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Harmony {
    pub root: HarmonyRoot,
    /// Chord quality: "major", "minor", "dominant", "diminished", etc.
    pub kind: String,
    /// Bass note (for slash chords)
    pub bass: Option<HarmonyRoot>,
}

/// Root or bass note of a harmony.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarmonyRoot {
    /// Note name: A–G
    pub step: String,
    /// Alteration: -1 = flat, 1 = sharp
    pub alter: Option<f64>,
}

/// A barline (may include repeat signs).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Barline {
    /// Location: "left", "right", "middle"
    pub location: String,
    /// Visual style: "regular", "light-light", "light-heavy", ...
    pub bar_style: Option<String>,
    pub repeat: Option<Repeat>,
}

/// A repeat sign on a barline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repeat {
    /// "forward" or "backward"
    pub direction: String,
    pub times: Option<u32>,
}

/// A volta bracket (1st/2nd ending).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ending {
    /// Ending number(s), e.g., "1", "2", "1, 2"
    pub number: String,
    /// "start", "stop", or "discontinue"
    pub ending_type: String,
    pub text: Option<String>,
    /// Barline location the ending was attached to
    pub location: String,
}

/// A direction: words, tempo, dynamics, navigation marks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Direction {
    pub placement: Option<Placement>,
    pub voice: Option<u32>,
    pub staff: Option<u32>,
    pub words: Vec<String>,
    pub metronome: Option<MetronomeMark>,
    /// Playback tempo from `<sound tempo>` in quarter notes per minute
    pub sound_tempo: Option<f64>,
    /// "p", "mf", "ff", ...
    pub dynamics: Vec<String>,
    /// "crescendo", "diminuendo" or "stop"
    pub wedge: Option<String>,
    pub octave_shift: Option<OctaveShift>,
    pub rehearsal: Option<String>,
    pub segno: bool,
    pub coda: bool,
    pub dacapo: bool,
    pub dalsegno: bool,
    pub fine: bool,
    pub tocoda: bool,
}

impl Direction {
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
            && self.metronome.is_none()
            && self.sound_tempo.is_none()
            && self.dynamics.is_empty()
            && self.wedge.is_none()
            && self.octave_shift.is_none()
            && self.rehearsal.is_none()
            && !(self.segno || self.coda || self.dacapo || self.dalsegno || self.fine || self.tocoda)
    }
}

/// A metronome mark, e.g. ♩ = 120.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetronomeMark {
    pub beat_unit: String,
    pub dotted: bool,
    pub per_minute: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OctaveShift {
    /// "up", "down" or "stop"
    pub shift_type: String,
    /// 8, 15, ...
    pub size: u32,
}

/// Layout hints from `<print>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintHints {
    /// This measure starts a new system (line break)
    pub new_system: bool,
    pub new_page: bool,
    pub page_number: Option<String>,
    /// A `<system-layout>` child is present
    pub system_layout: bool,
}

impl PrintHints {
    pub fn starts_system(&self) -> bool {
        self.new_system || self.new_page || self.system_layout
    }
}

// ─── Score helpers ───────────────────────────────────────────────────

impl Score {
    /// Create a new empty score.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of measures in the first part.
    pub fn measure_count(&self) -> usize {
        self.parts.first().map_or(0, |p| p.measures.len())
    }

    pub fn part(&self, id: &str) -> Option<&Part> {
        self.parts.iter().find(|p| p.id == id)
    }

    /// Distinct effective time signatures, in order of first appearance.
    pub fn time_signatures(&self) -> Vec<TimeSignature> {
        let mut sigs: Vec<TimeSignature> = Vec::new();
        for part in &self.parts {
            for ts in part.measures.iter().filter_map(|m| m.time) {
                if !sigs.contains(&ts) {
                    sigs.push(ts);
                }
            }
        }
        sigs
    }
}

impl Part {
    pub fn measure(&self, number: &str) -> Option<&Measure> {
        self.measures.iter().find(|m| m.number == number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c4() -> Pitch {
        Pitch::new("C", 4, None).unwrap()
    }

    #[test]
    fn rest_with_pitch_is_rejected() {
        let err = Note::new(NoteFields {
            rest: true,
            pitch: Some(c4()),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.rule, Rule::NoteRestExclusive);
    }

    #[test]
    fn pitched_note_needs_a_pitch() {
        let err = Note::new(NoteFields::default()).unwrap_err();
        assert_eq!(err.rule, Rule::NoteRestExclusive);
    }

    #[test]
    fn valid_notes_build() {
        let rest = Note::new(NoteFields {
            rest: true,
            ..Default::default()
        })
        .unwrap();
        assert!(rest.is_rest());
        assert!(rest.pitch().is_none());

        let note = Note::new(NoteFields {
            pitch: Some(c4()),
            voice: Some(2),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(note.pitch(), Some(&c4()));
        assert_eq!(note.voice.map(NonZeroU32::get), Some(2));
    }

    #[test]
    fn zero_voice_is_rejected() {
        let err = Note::new(NoteFields {
            pitch: Some(c4()),
            voice: Some(0),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.rule, Rule::NoteVoice);
    }

    #[test]
    fn notated_length_with_dots_and_tuplets() {
        let mut fields = NoteFields {
            pitch: Some(c4()),
            note_type: Some("quarter".into()),
            dots: 1,
            ..Default::default()
        };
        assert_eq!(Note::new(fields.clone()).unwrap().notated_quarters(), Some(1.5));

        fields.note_type = Some("eighth".into());
        fields.dots = 0;
        fields.time_modification = Some(TimeModification::new(3, 2, None, 0).unwrap());
        let q = Note::new(fields).unwrap().notated_quarters().unwrap();
        assert!((q - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn beam_markers_parse() {
        assert_eq!("forward hook".parse::<BeamMarker>(), Ok(BeamMarker::ForwardHook));
        assert!("sideways".parse::<BeamMarker>().is_err());
    }
}
