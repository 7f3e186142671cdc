//! Self-validating leaf value types.
//!
//! Each type can only be built through a constructor that checks its
//! invariant, and deserialization goes through the same constructor, so
//! an out-of-range `Pitch` or `TimeSignature` never exists.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationFailure;
use crate::validation::{self, Rule};

// ─── Pitch ───────────────────────────────────────────────────────────

/// Diatonic step name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Step {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Step {
    /// Semitones above C.
    pub fn semitone(self) -> i32 {
        match self {
            Step::C => 0,
            Step::D => 2,
            Step::E => 4,
            Step::F => 5,
            Step::G => 7,
            Step::A => 9,
            Step::B => 11,
        }
    }
}

impl FromStr for Step {
    type Err = ValidationFailure;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "C" => Ok(Step::C),
            "D" => Ok(Step::D),
            "E" => Ok(Step::E),
            "F" => Ok(Step::F),
            "G" => Ok(Step::G),
            "A" => Ok(Step::A),
            "B" => Ok(Step::B),
            other => Err(ValidationFailure::new(
                Rule::PitchStep,
                format!("'{other}' is not a step (C D E F G A B)"),
            )),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Pitch of a note.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PitchFields")]
pub struct Pitch {
    step: Step,
    octave: i32,
    alter: Option<f64>,
}

#[derive(Deserialize)]
struct PitchFields {
    step: Step,
    octave: i32,
    alter: Option<f64>,
}

impl TryFrom<PitchFields> for Pitch {
    type Error = ValidationFailure;

    fn try_from(f: PitchFields) -> Result<Self, Self::Error> {
        Pitch::from_step(f.step, f.octave, f.alter)
    }
}

impl Pitch {
    /// Build a pitch from a step name, octave (0..=9) and optional
    /// chromatic alteration (-2..=2, fractional values allowed for microtones).
    pub fn new(step: &str, octave: i32, alter: Option<f64>) -> Result<Self, ValidationFailure> {
        Self::from_step(step.parse()?, octave, alter)
    }

    pub fn from_step(step: Step, octave: i32, alter: Option<f64>) -> Result<Self, ValidationFailure> {
        validation::check_octave(octave)?;
        if let Some(a) = alter {
            validation::check_alter(a)?;
        }
        Ok(Self {
            step,
            octave,
            alter,
        })
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn octave(&self) -> i32 {
        self.octave
    }

    pub fn alter(&self) -> Option<f64> {
        self.alter
    }

    /// MIDI note number, middle C (C4) = 60.
    pub fn to_midi(&self) -> i32 {
        let alter = self.alter.unwrap_or(0.0).round() as i32;
        (self.octave + 1) * 12 + self.step.semitone() + alter
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let accidental = match self.alter.map(|a| a.round() as i32) {
            Some(2) => "##",
            Some(1) => "#",
            Some(-1) => "b",
            Some(-2) => "bb",
            _ => "",
        };
        write!(f, "{}{}{}", self.step, accidental, self.octave)
    }
}

// ─── Duration ────────────────────────────────────────────────────────

/// A length in divisions, with the divisions-per-quarter that were in
/// effect when it was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "DurationFields")]
pub struct Duration {
    value: u32,
    divisions: u32,
}

#[derive(Deserialize)]
struct DurationFields {
    value: u32,
    divisions: u32,
}

impl TryFrom<DurationFields> for Duration {
    type Error = ValidationFailure;

    fn try_from(f: DurationFields) -> Result<Self, Self::Error> {
        Duration::new(f.value, f.divisions)
    }
}

impl Duration {
    pub fn new(value: u32, divisions: u32) -> Result<Self, ValidationFailure> {
        validation::check_positive(Rule::DurationPositive, "duration", value)?;
        validation::check_positive(Rule::Divisions, "divisions", divisions)?;
        Ok(Self { value, divisions })
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn divisions(&self) -> u32 {
        self.divisions
    }

    /// Length in quarter notes.
    pub fn quarters(&self) -> f64 {
        f64::from(self.value) / f64::from(self.divisions)
    }

    /// Standard notated type and dot count matching this length, if any.
    pub fn note_type(&self) -> Option<(&'static str, u32)> {
        note_type_for(self.value, self.divisions)
    }
}

// ─── Note types ──────────────────────────────────────────────────────

/// Standard note values as quarter-note fractions `(name, num, den)`.
pub const NOTE_TYPES: &[(&str, u64, u64)] = &[
    ("maxima", 32, 1),
    ("long", 16, 1),
    ("breve", 8, 1),
    ("whole", 4, 1),
    ("half", 2, 1),
    ("quarter", 1, 1),
    ("eighth", 1, 2),
    ("16th", 1, 4),
    ("32nd", 1, 8),
    ("64th", 1, 16),
    ("128th", 1, 32),
    ("256th", 1, 64),
    ("512th", 1, 128),
    ("1024th", 1, 256),
];

/// Map `value / divisions` quarter notes to a standard note type.
///
/// Exact matches win; a length 1.5 times a standard value maps to that
/// value with one dot. Anything else has no standard type.
pub fn note_type_for(value: u32, divisions: u32) -> Option<(&'static str, u32)> {
    if value == 0 || divisions == 0 {
        return None;
    }
    let (v, d) = (u64::from(value), u64::from(divisions));
    NOTE_TYPES
        .iter()
        .find(|&&(_, num, den)| v * den == d * num)
        .map(|&(name, _, _)| (name, 0))
        .or_else(|| {
            NOTE_TYPES
                .iter()
                .find(|&&(_, num, den)| 2 * v * den == 3 * d * num)
                .map(|&(name, _, _)| (name, 1))
        })
}

/// Quarter-note length of a named note type, if standard.
pub fn note_type_quarters(name: &str) -> Option<f64> {
    NOTE_TYPES
        .iter()
        .find(|&&(n, _, _)| n == name)
        .map(|&(_, num, den)| num as f64 / den as f64)
}

// ─── Time signature ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "TimeFields")]
pub struct TimeSignature {
    beats: u32,
    beat_type: u32,
}

#[derive(Deserialize)]
struct TimeFields {
    beats: u32,
    beat_type: u32,
}

impl TryFrom<TimeFields> for TimeSignature {
    type Error = ValidationFailure;

    fn try_from(f: TimeFields) -> Result<Self, Self::Error> {
        TimeSignature::new(f.beats, f.beat_type)
    }
}

impl TimeSignature {
    pub fn new(beats: u32, beat_type: u32) -> Result<Self, ValidationFailure> {
        validation::check_positive(Rule::TimeBeats, "beats", beats)?;
        validation::check_beat_type(beat_type)?;
        Ok(Self { beats, beat_type })
    }

    pub fn beats(&self) -> u32 {
        self.beats
    }

    pub fn beat_type(&self) -> u32 {
        self.beat_type
    }

    /// Measure length in quarter notes.
    pub fn quarters(&self) -> f64 {
        f64::from(self.beats) * 4.0 / f64::from(self.beat_type)
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.beats, self.beat_type)
    }
}

// ─── Key signature ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Major,
    Minor,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Aeolian,
    Ionian,
    Locrian,
    None,
}

impl FromStr for Mode {
    type Err = ValidationFailure;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "major" => Ok(Mode::Major),
            "minor" => Ok(Mode::Minor),
            "dorian" => Ok(Mode::Dorian),
            "phrygian" => Ok(Mode::Phrygian),
            "lydian" => Ok(Mode::Lydian),
            "mixolydian" => Ok(Mode::Mixolydian),
            "aeolian" => Ok(Mode::Aeolian),
            "ionian" => Ok(Mode::Ionian),
            "locrian" => Ok(Mode::Locrian),
            "none" => Ok(Mode::None),
            other => Err(ValidationFailure::new(
                Rule::KeyMode,
                format!("unknown mode '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "KeyFields")]
pub struct KeySignature {
    fifths: i32,
    mode: Option<Mode>,
}

#[derive(Deserialize)]
struct KeyFields {
    fifths: i32,
    mode: Option<Mode>,
}

impl TryFrom<KeyFields> for KeySignature {
    type Error = ValidationFailure;

    fn try_from(f: KeyFields) -> Result<Self, Self::Error> {
        KeySignature::new(f.fifths, f.mode)
    }
}

impl KeySignature {
    pub fn new(fifths: i32, mode: Option<Mode>) -> Result<Self, ValidationFailure> {
        validation::check_fifths(fifths)?;
        Ok(Self { fifths, mode })
    }

    /// Sharps when positive, flats when negative.
    pub fn fifths(&self) -> i32 {
        self.fifths
    }

    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }
}

// ─── Clef ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClefSign {
    G,
    F,
    C,
    Percussion,
    Tab,
    Jianpu,
    None,
}

impl ClefSign {
    /// G, F and C clefs are positioned by a staff line.
    pub fn expects_line(self) -> bool {
        matches!(self, ClefSign::G | ClefSign::F | ClefSign::C)
    }
}

impl FromStr for ClefSign {
    type Err = ValidationFailure;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "G" => Ok(ClefSign::G),
            "F" => Ok(ClefSign::F),
            "C" => Ok(ClefSign::C),
            "percussion" => Ok(ClefSign::Percussion),
            "TAB" => Ok(ClefSign::Tab),
            "jianpu" => Ok(ClefSign::Jianpu),
            "none" => Ok(ClefSign::None),
            other => Err(ValidationFailure::new(
                Rule::ClefSign,
                format!("unknown clef sign '{other}'"),
            )),
        }
    }
}

impl fmt::Display for ClefSign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClefSign::G => "G",
            ClefSign::F => "F",
            ClefSign::C => "C",
            ClefSign::Percussion => "percussion",
            ClefSign::Tab => "TAB",
            ClefSign::Jianpu => "jianpu",
            ClefSign::None => "none",
        };
        f.write_str(s)
    }
}

/// Clef on one staff. The staff line is optional: some valid documents
/// omit it even for G/F/C clefs (see [`validation::check_clef_line`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ClefFields")]
pub struct Clef {
    sign: ClefSign,
    line: Option<u32>,
    octave_change: Option<i32>,
    staff_number: u32,
}

#[derive(Deserialize)]
struct ClefFields {
    sign: ClefSign,
    line: Option<u32>,
    octave_change: Option<i32>,
    staff_number: u32,
}

impl TryFrom<ClefFields> for Clef {
    type Error = ValidationFailure;

    fn try_from(f: ClefFields) -> Result<Self, Self::Error> {
        Clef::new(f.sign, f.line, f.octave_change, f.staff_number)
    }
}

impl Clef {
    pub fn new(
        sign: ClefSign,
        line: Option<u32>,
        octave_change: Option<i32>,
        staff_number: u32,
    ) -> Result<Self, ValidationFailure> {
        validation::check_positive(Rule::ClefLine, "staff number", staff_number)?;
        if let Some(l) = line {
            validation::check_positive(Rule::ClefLine, "clef line", l)?;
        }
        Ok(Self {
            sign,
            line,
            octave_change,
            staff_number,
        })
    }

    pub fn sign(&self) -> ClefSign {
        self.sign
    }

    pub fn line(&self) -> Option<u32> {
        self.line
    }

    /// Octave transposition, e.g. -1 for the guitar's octave-lower treble clef
    pub fn octave_change(&self) -> Option<i32> {
        self.octave_change
    }

    /// 1-based staff this clef applies to
    pub fn staff_number(&self) -> u32 {
        self.staff_number
    }
}

// ─── Time modification ───────────────────────────────────────────────

/// Tuplet ratio: `actual_notes` are played in the time of `normal_notes`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "TimeModificationFields")]
pub struct TimeModification {
    actual_notes: u32,
    normal_notes: u32,
    normal_type: Option<String>,
    normal_dots: u32,
}

#[derive(Deserialize)]
struct TimeModificationFields {
    actual_notes: u32,
    normal_notes: u32,
    normal_type: Option<String>,
    normal_dots: u32,
}

impl TryFrom<TimeModificationFields> for TimeModification {
    type Error = ValidationFailure;

    fn try_from(f: TimeModificationFields) -> Result<Self, Self::Error> {
        TimeModification::new(f.actual_notes, f.normal_notes, f.normal_type, f.normal_dots)
    }
}

impl TimeModification {
    pub fn new(
        actual_notes: u32,
        normal_notes: u32,
        normal_type: Option<String>,
        normal_dots: u32,
    ) -> Result<Self, ValidationFailure> {
        validation::check_positive(Rule::TimeModificationRatio, "actual-notes", actual_notes)?;
        validation::check_positive(Rule::TimeModificationRatio, "normal-notes", normal_notes)?;
        Ok(Self {
            actual_notes,
            normal_notes,
            normal_type,
            normal_dots,
        })
    }

    pub fn actual_notes(&self) -> u32 {
        self.actual_notes
    }

    pub fn normal_notes(&self) -> u32 {
        self.normal_notes
    }

    pub fn normal_type(&self) -> Option<&str> {
        self.normal_type.as_deref()
    }

    pub fn normal_dots(&self) -> u32 {
        self.normal_dots
    }

    /// Sounding length of a notated length under this ratio
    /// (a triplet eighth: 0.5 * 2/3).
    pub fn apply(&self, notated_quarters: f64) -> f64 {
        notated_quarters * f64::from(self.normal_notes) / f64::from(self.actual_notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn pitch_fields_round_trip_for_valid_ranges() {
        for step in ["C", "D", "E", "F", "G", "A", "B"] {
            for octave in 0..=9 {
                for alter in [None, Some(-2.0), Some(-1.0), Some(0.5), Some(2.0)] {
                    let p = Pitch::new(step, octave, alter).unwrap();
                    assert_eq!(p.step().to_string(), step);
                    assert_eq!(p.octave(), octave);
                    assert_eq!(p.alter(), alter);
                }
            }
        }
    }

    #[test]
    fn pitch_rejects_out_of_range() {
        assert_eq!(Pitch::new("H", 4, None).unwrap_err().rule, Rule::PitchStep);
        assert_eq!(Pitch::new("c", 4, None).unwrap_err().rule, Rule::PitchStep);
        assert_eq!(Pitch::new("C", 10, None).unwrap_err().rule, Rule::PitchOctave);
        assert_eq!(Pitch::new("C", -1, None).unwrap_err().rule, Rule::PitchOctave);
        assert_eq!(Pitch::new("C", 4, Some(3.0)).unwrap_err().rule, Rule::PitchAlter);
    }

    #[test]
    fn midi_numbers() {
        assert_eq!(Pitch::new("C", 4, None).unwrap().to_midi(), 60);
        assert_eq!(Pitch::new("A", 4, None).unwrap().to_midi(), 69);
        assert_eq!(Pitch::new("B", 3, Some(1.0)).unwrap().to_midi(), 60);
        assert_eq!(Pitch::new("F", 4, Some(1.0)).unwrap().to_string(), "F#4");
    }

    #[test]
    fn duration_needs_positive_parts() {
        assert!(Duration::new(480, 480).is_ok());
        assert_eq!(Duration::new(0, 480).unwrap_err().rule, Rule::DurationPositive);
        assert_eq!(Duration::new(480, 0).unwrap_err().rule, Rule::Divisions);
        assert_eq!(Duration::new(240, 480).unwrap().quarters(), 0.5);
        assert_eq!(Duration::new(720, 480).unwrap().note_type(), Some(("quarter", 1)));
    }

    #[test]
    fn note_type_mapping() {
        assert_eq!(note_type_for(480, 480), Some(("quarter", 0)));
        assert_eq!(note_type_for(960, 480), Some(("half", 0)));
        assert_eq!(note_type_for(1920, 480), Some(("whole", 0)));
        assert_eq!(note_type_for(240, 480), Some(("eighth", 0)));
        assert_eq!(note_type_for(720, 480), Some(("quarter", 1)));
        assert_eq!(note_type_for(1440, 480), Some(("half", 1)));
        assert_eq!(note_type_for(3, 4), Some(("eighth", 1)));
        assert_eq!(note_type_for(160, 480), None);
        assert_eq!(note_type_for(0, 480), None);
    }

    #[test]
    fn time_signature_beat_types() {
        for bt in [1, 2, 4, 8, 16, 32] {
            assert!(TimeSignature::new(3, bt).is_ok());
        }
        for bt in [3, 5, 6, 7] {
            assert_eq!(TimeSignature::new(4, bt).unwrap_err().rule, Rule::TimeBeatType);
        }
        assert_eq!(TimeSignature::new(0, 4).unwrap_err().rule, Rule::TimeBeats);
        assert_eq!(TimeSignature::new(6, 8).unwrap().quarters(), 3.0);
    }

    #[test]
    fn key_signature_range() {
        assert!(KeySignature::new(-7, Some(Mode::Minor)).is_ok());
        assert!(KeySignature::new(7, None).is_ok());
        assert_eq!(KeySignature::new(8, None).unwrap_err().rule, Rule::KeyFifths);
        assert_eq!("dorian".parse::<Mode>().unwrap(), Mode::Dorian);
        assert!("bluesy".parse::<Mode>().is_err());
    }

    #[test]
    fn clef_line_is_optional() {
        let clef = Clef::new(ClefSign::G, None, None, 1).unwrap();
        assert_eq!(clef.line(), None);
        assert!(Clef::new(ClefSign::F, Some(4), None, 0).is_err());
        assert_eq!("percussion".parse::<ClefSign>().unwrap(), ClefSign::Percussion);
    }

    #[test]
    fn triplet_ratio() {
        let tm = TimeModification::new(3, 2, Some("eighth".into()), 0).unwrap();
        assert!((tm.apply(0.5) - 1.0 / 3.0).abs() < 1e-9);
        assert!(TimeModification::new(0, 2, None, 0).is_err());
    }

    #[test]
    fn deserialization_goes_through_validation() {
        let ok: TimeSignature = serde_json::from_str(r#"{"beats":3,"beat_type":4}"#).unwrap();
        assert_eq!(ok.beats(), 3);
        let bad = serde_json::from_str::<TimeSignature>(r#"{"beats":3,"beat_type":6}"#);
        assert!(bad.is_err());
        let bad_pitch = serde_json::from_str::<Pitch>(r#"{"step":"C","octave":12,"alter":null}"#);
        assert!(bad_pitch.is_err());
    }
}
