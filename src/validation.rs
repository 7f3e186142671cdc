//! Rule checks.
//!
//! Every check here is a pure function: it either succeeds or names the
//! [`Rule`] that was broken. Leaf value constructors in [`crate::values`]
//! call the range checks; the measure engine calls the measure-scope ones.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationFailure;
use crate::values::{Clef, TimeSignature};
use crate::warning::{Category, Warning};

/// Identifier of a validation rule, carried by failures and warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rule {
    PitchStep,
    PitchOctave,
    PitchAlter,
    DurationPositive,
    Divisions,
    TimeBeats,
    TimeBeatType,
    KeyFifths,
    KeyMode,
    ClefSign,
    ClefLine,
    TimeModificationRatio,
    NoteRestExclusive,
    NoteVoice,
    NoteStaff,
    NoteDuration,
    NoteField,
    SlurType,
    TieType,
    MeasureNumber,
    MeasureDuration,
    TimelineUnderflow,
    BeamOrphan,
    BeamDegenerate,
    BeamUnterminated,
    PartList,
    DocumentVersion,
}

impl Rule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rule::PitchStep => "pitch-step",
            Rule::PitchOctave => "pitch-octave",
            Rule::PitchAlter => "pitch-alter",
            Rule::DurationPositive => "duration-positive",
            Rule::Divisions => "divisions",
            Rule::TimeBeats => "time-beats",
            Rule::TimeBeatType => "time-beat-type",
            Rule::KeyFifths => "key-fifths",
            Rule::KeyMode => "key-mode",
            Rule::ClefSign => "clef-sign",
            Rule::ClefLine => "clef-line",
            Rule::TimeModificationRatio => "time-modification-ratio",
            Rule::NoteRestExclusive => "note-rest-exclusive",
            Rule::NoteVoice => "note-voice",
            Rule::NoteStaff => "note-staff",
            Rule::NoteDuration => "note-duration",
            Rule::NoteField => "note-field",
            Rule::SlurType => "slur-type",
            Rule::TieType => "tie-type",
            Rule::MeasureNumber => "measure-number",
            Rule::MeasureDuration => "measure-duration",
            Rule::TimelineUnderflow => "timeline-underflow",
            Rule::BeamOrphan => "beam-orphan",
            Rule::BeamDegenerate => "beam-degenerate",
            Rule::BeamUnterminated => "beam-unterminated",
            Rule::PartList => "part-list",
            Rule::DocumentVersion => "document-version",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const MIN_OCTAVE: i32 = 0;
pub const MAX_OCTAVE: i32 = 9;
pub const MAX_ALTER: f64 = 2.0;
pub const MAX_FIFTHS: i32 = 7;

// ─── Leaf ranges ─────────────────────────────────────────────────────

pub fn check_octave(octave: i32) -> Result<(), ValidationFailure> {
    if (MIN_OCTAVE..=MAX_OCTAVE).contains(&octave) {
        Ok(())
    } else {
        Err(ValidationFailure::new(
            Rule::PitchOctave,
            format!("octave {octave} outside {MIN_OCTAVE}..={MAX_OCTAVE}"),
        ))
    }
}

pub fn check_alter(alter: f64) -> Result<(), ValidationFailure> {
    if alter.is_finite() && alter.abs() <= MAX_ALTER {
        Ok(())
    } else {
        Err(ValidationFailure::new(
            Rule::PitchAlter,
            format!("alter {alter} outside -{MAX_ALTER}..={MAX_ALTER}"),
        ))
    }
}

pub fn check_positive(rule: Rule, what: &str, value: u32) -> Result<(), ValidationFailure> {
    if value > 0 {
        Ok(())
    } else {
        Err(ValidationFailure::new(rule, format!("{what} must be > 0")))
    }
}

pub fn check_beat_type(beat_type: u32) -> Result<(), ValidationFailure> {
    if beat_type.is_power_of_two() {
        Ok(())
    } else {
        Err(ValidationFailure::new(
            Rule::TimeBeatType,
            format!("beat type {beat_type} is not a power of two"),
        ))
    }
}

pub fn check_fifths(fifths: i32) -> Result<(), ValidationFailure> {
    if fifths.abs() <= MAX_FIFTHS {
        Ok(())
    } else {
        Err(ValidationFailure::new(
            Rule::KeyFifths,
            format!("fifths {fifths} outside -{MAX_FIFTHS}..={MAX_FIFTHS}"),
        ))
    }
}

// ─── Measure scope ───────────────────────────────────────────────────

/// A measure number must be a non-negative integer; "0" is only legal on
/// an implicit (pickup) measure.
pub fn check_measure_number(number: &str, implicit: bool) -> Result<(), ValidationFailure> {
    let trimmed = number.trim();
    let value: i64 = trimmed.parse().map_err(|_| {
        ValidationFailure::new(
            Rule::MeasureNumber,
            format!("measure number '{number}' is not an integer"),
        )
    })?;
    if value < 0 {
        return Err(ValidationFailure::new(
            Rule::MeasureNumber,
            format!("measure number {value} is negative"),
        ));
    }
    if value == 0 && !implicit {
        return Err(ValidationFailure::new(
            Rule::MeasureNumber,
            "measure number 0 is only allowed on an implicit (pickup) measure",
        ));
    }
    Ok(())
}

/// Compare how far the measure timeline reached against the time
/// signature. Informational only: grace notes and layered voices make
/// strict equality unreliable, so a mismatch is an `Info` warning.
/// Pickup measures are exempt.
pub fn check_measure_duration(
    extent: u64,
    divisions: u32,
    time: &TimeSignature,
    implicit: bool,
) -> Option<Warning> {
    if implicit || divisions == 0 {
        return None;
    }
    // extent / divisions quarters == beats * 4 / beat_type quarters
    let lhs = u128::from(extent) * u128::from(time.beat_type());
    let rhs = u128::from(time.beats()) * 4 * u128::from(divisions);
    if lhs == rhs {
        return None;
    }
    let expected = rhs as f64 / f64::from(time.beat_type());
    Some(
        Warning::info(
            Category::Timing,
            format!(
                "measure spans {extent} divisions, {}/{} expects {expected}",
                time.beats(),
                time.beat_type()
            ),
        )
        .with_rule(Rule::MeasureDuration)
        .with_context("extent", extent.to_string())
        .with_context("expected", expected.to_string()),
    )
}

/// Opt-in: G, F and C clefs should name their staff line.
pub fn check_clef_line(clef: &Clef) -> Result<(), ValidationFailure> {
    if clef.sign().expects_line() && clef.line().is_none() {
        Err(ValidationFailure::new(
            Rule::ClefLine,
            format!("{} clef on staff {} has no line", clef.sign(), clef.staff_number()),
        ))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measure_numbers() {
        assert!(check_measure_number("1", false).is_ok());
        assert!(check_measure_number("0", true).is_ok());
        assert_eq!(
            check_measure_number("0", false).unwrap_err().rule,
            Rule::MeasureNumber
        );
        assert!(check_measure_number("-3", false).is_err());
        assert!(check_measure_number("12a", false).is_err());
        assert!(check_measure_number("", true).is_err());
    }

    #[test]
    fn beat_types() {
        for bt in [1, 2, 4, 8, 16, 32] {
            assert!(check_beat_type(bt).is_ok(), "{bt} should be accepted");
        }
        for bt in [3, 5, 6, 7] {
            assert!(check_beat_type(bt).is_err(), "{bt} should be rejected");
        }
    }

    #[test]
    fn measure_duration_is_informational() {
        let four_four = TimeSignature::new(4, 4).unwrap();
        assert!(check_measure_duration(1920, 480, &four_four, false).is_none());
        let w = check_measure_duration(1440, 480, &four_four, false).unwrap();
        assert_eq!(w.severity, crate::warning::Severity::Info);
        assert_eq!(w.rule, Some(Rule::MeasureDuration));
        // pickup measures may be short
        assert!(check_measure_duration(480, 480, &four_four, true).is_none());
    }

    #[test]
    fn measure_duration_with_extreme_values() {
        let huge = TimeSignature::new(u32::MAX, 4).unwrap();
        let full = u64::from(u32::MAX) * u64::from(u32::MAX);
        assert!(check_measure_duration(full, u32::MAX, &huge, false).is_none());
        let short = check_measure_duration(u64::from(u32::MAX), u32::MAX, &huge, false).unwrap();
        assert_eq!(short.rule, Some(Rule::MeasureDuration));
        assert!(check_measure_duration(u64::MAX, u32::MAX, &TimeSignature::new(1, 32).unwrap(), false).is_some());
    }

    #[test]
    fn six_eight_in_eighth_divisions() {
        let six_eight = TimeSignature::new(6, 8).unwrap();
        // divisions=2 per quarter: 6 eighths = 3 quarters = 6 divisions
        assert!(check_measure_duration(6, 2, &six_eight, false).is_none());
    }
}
