//! Measure engine.
//!
//! One [`MeasureEngine`] builds one measure. It starts from the state
//! inherited from the previous measure, visits the `<measure>` children in
//! document order and closes with the final working state as the measure's
//! effective key, time and clefs.

use std::fmt;

use roxmltree::Node;

use crate::attributes::resolve_attributes;
use crate::beams::BeamReconstructor;
use crate::error::ParseError;
use crate::markings;
use crate::model::{AttributesUpdate, Measure, Transpose};
use crate::note::resolve_note;
use crate::options::ParseOptions;
use crate::timeline::{Relocation, Timeline};
use crate::validation;
use crate::values::{Clef, KeySignature, TimeSignature};
use crate::warning::{emit, WarningSink};
use crate::xml::{self, Scope};

/// Effective attribute state carried from one measure to the next.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasureContext {
    pub divisions: Option<u32>,
    pub key: Option<KeySignature>,
    pub time: Option<TimeSignature>,
    /// At most one clef per staff, ordered by staff number
    pub clefs: Vec<Clef>,
    pub staves: Option<u32>,
    pub transpose: Option<Transpose>,
}

impl MeasureContext {
    /// Overwrite the fields present in `update`. A clef replaces the clef
    /// previously in effect on the same staff.
    pub fn apply(&mut self, update: &AttributesUpdate) {
        if update.divisions.is_some() {
            self.divisions = update.divisions;
        }
        if update.key.is_some() {
            self.key = update.key;
        }
        if update.time.is_some() {
            self.time = update.time;
        }
        for clef in &update.clefs {
            match self
                .clefs
                .iter_mut()
                .find(|c| c.staff_number() == clef.staff_number())
            {
                Some(existing) => *existing = *clef,
                None => self.clefs.push(*clef),
            }
        }
        self.clefs.sort_by_key(|c| c.staff_number());
        if update.staves.is_some() {
            self.staves = update.staves;
        }
        if update.transpose.is_some() {
            self.transpose = update.transpose;
        }
    }
}

impl From<&Measure> for MeasureContext {
    fn from(measure: &Measure) -> Self {
        Self {
            divisions: measure.divisions,
            key: measure.key,
            time: measure.time,
            clefs: measure.clefs.clone(),
            staves: measure.staves,
            transpose: measure.transpose,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing but attributes/print seen so far
    AwaitingAttributes,
    InMeasure,
    Closed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::AwaitingAttributes => "awaiting-attributes",
            Phase::InMeasure => "in-measure",
            Phase::Closed => "closed",
        })
    }
}

pub struct MeasureEngine<'o> {
    phase: Phase,
    state: MeasureContext,
    measure: Measure,
    timeline: Timeline,
    beams: BeamReconstructor,
    options: &'o ParseOptions,
}

impl<'o> MeasureEngine<'o> {
    /// Open a measure. Fails on a measure number that is not a
    /// non-negative integer, or on "0" outside a pickup.
    pub fn open(
        node: &Node,
        inherited: &MeasureContext,
        scope: &Scope,
        options: &'o ParseOptions,
    ) -> Result<Self, ParseError> {
        let number = node
            .attribute("number")
            .ok_or_else(|| scope.structure(node, "<measure> is missing its number attribute"))?;
        let implicit = xml::is_yes(node, "implicit");
        validation::check_measure_number(number, implicit).map_err(|f| scope.locate(node, f))?;

        Ok(Self {
            phase: Phase::AwaitingAttributes,
            state: inherited.clone(),
            measure: Measure {
                number: number.trim().to_string(),
                implicit,
                width: xml::attribute_f64(node, "width"),
                ..Default::default()
            },
            timeline: Timeline::new(inherited.divisions),
            beams: BeamReconstructor::new(),
            options,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Dispatch one child of `<measure>`.
    pub fn visit(&mut self, child: &Node, scope: &Scope, sink: &mut dyn WarningSink) -> Result<(), ParseError> {
        if self.phase == Phase::Closed {
            return Err(scope.structure(child, "measure is already closed").into());
        }
        let tag = child.tag_name().name();
        match tag {
            "attributes" => {
                if self.phase == Phase::InMeasure {
                    log::trace!("mid-measure attributes in measure {}", self.measure.number);
                }
                let update = resolve_attributes(child, self.state.divisions, scope, self.options, sink)?;
                self.merge(update);
                return Ok(());
            }
            "print" => {
                self.measure.print = Some(markings::parse_print(child));
                return Ok(());
            }
            _ => {}
        }
        self.phase = Phase::InMeasure;

        match tag {
            "note" => {
                if let Some(resolved) = resolve_note(child, self.state.divisions, scope, sink)? {
                    let index = self.measure.notes.len();
                    self.beams.push(index, &resolved.beams, xml::line_of(child), scope, sink);
                    self.timeline.advance_note(&resolved.note);
                    self.measure.notes.push(resolved.note);
                }
            }
            "forward" | "backup" => {
                if let Some(kind) = Relocation::from_tag(tag) {
                    if let Some(rest) = self.timeline.relocate(child, kind, scope, sink) {
                        self.measure.notes.push(rest);
                    }
                }
            }
            "harmony" => {
                if let Some(harmony) = markings::parse_harmony(child, scope, sink) {
                    self.measure.harmonies.push(harmony);
                }
            }
            "barline" => {
                let (barline, ending) = markings::parse_barline(child, scope, sink);
                self.measure.barlines.push(barline);
                self.measure.endings.extend(ending);
            }
            "direction" => {
                if let Some(direction) = markings::parse_direction(child, scope, sink) {
                    self.measure.directions.push(direction);
                }
            }
            "sound" => {
                if let Some(direction) = markings::parse_sound(child, scope, sink) {
                    self.measure.directions.push(direction);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn merge(&mut self, update: AttributesUpdate) {
        if let Some(d) = update.divisions {
            self.timeline.set_divisions(d);
        }
        self.state.apply(&update);
        match self.measure.attributes {
            Some(ref mut local) => local.merge(update),
            None => self.measure.attributes = Some(update),
        }
    }

    /// Close the measure: settle beams, run the duration check and stamp
    /// the effective state.
    pub fn close(&mut self, node: &Node, scope: &Scope, sink: &mut dyn WarningSink) -> Measure {
        log::trace!("closing measure {} ({})", self.measure.number, self.phase);
        self.phase = Phase::Closed;
        let beams = std::mem::take(&mut self.beams);
        self.measure.beams = beams.finish(scope, sink);
        self.measure.extent = self.timeline.extent();

        if self.options.check_measure_durations {
            if let (Some(divisions), Some(time)) = (self.state.divisions, self.state.time) {
                if let Some(warning) =
                    validation::check_measure_duration(self.measure.extent, divisions, &time, self.measure.implicit)
                {
                    emit(
                        sink,
                        warning
                            .with_element("measure")
                            .with_line(xml::line_of(node))
                            .in_scope(scope),
                    );
                }
            }
        }

        let state = std::mem::take(&mut self.state);
        let mut measure = std::mem::take(&mut self.measure);
        measure.divisions = state.divisions;
        measure.key = state.key;
        measure.time = state.time;
        measure.clefs = state.clefs;
        measure.staves = state.staves;
        measure.transpose = state.transpose;
        measure
    }
}

/// Build one measure from its element, given the previous measure's
/// effective state.
pub fn parse_measure(
    node: &Node,
    inherited: &MeasureContext,
    scope: &Scope,
    options: &ParseOptions,
    sink: &mut dyn WarningSink,
) -> Result<Measure, ParseError> {
    let number = node.attribute("number").map(str::trim);
    let scope = match number {
        Some(n) => scope.measure(n),
        None => *scope,
    };
    let mut engine = MeasureEngine::open(node, inherited, &scope, options)?;
    for child in xml::elements(node) {
        engine.visit(&child, &scope, sink)?;
    }
    Ok(engine.close(node, &scope, sink))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use crate::model::{BeamRole, NoteContent};
    use crate::validation::Rule;
    use crate::values::{ClefSign, Step};
    use crate::warning::{Severity, Warning};
    use pretty_assertions::assert_eq;

    fn run(xml_text: &str, inherited: &MeasureContext) -> (Result<Measure, ParseError>, Vec<Warning>) {
        let doc = roxmltree::Document::parse(xml_text).unwrap();
        let mut warnings = Vec::new();
        let result = parse_measure(
            &doc.root_element(),
            inherited,
            &Scope::part("P1"),
            &ParseOptions::default(),
            &mut warnings,
        );
        (result, warnings)
    }

    const FOUR_FOUR: &str = "<attributes><divisions>480</divisions><key><fifths>0</fifths></key>\
        <time><beats>4</beats><beat-type>4</beat-type></time><clef><sign>G</sign><line>2</line></clef></attributes>";

    fn quarter(step: &str) -> String {
        format!("<note><pitch><step>{step}</step><octave>4</octave></pitch><duration>480</duration><type>quarter</type></note>")
    }

    #[test]
    fn forward_markers_become_rests() {
        let xml_text = format!(
            r#"<measure number="1">{FOUR_FOUR}{}<forward><duration>480</duration></forward>{}<forward><duration>960</duration></forward></measure>"#,
            quarter("C"),
            quarter("E")
        );
        let (result, warnings) = run(&xml_text, &MeasureContext::default());
        let measure = result.unwrap();
        // five quarters of content in 4/4: only the informational length check fires
        assert!(warnings.iter().all(|w| w.severity == Severity::Info), "{warnings:?}");
        let summary: Vec<(bool, Option<&str>)> = measure
            .notes
            .iter()
            .map(|n| (n.is_rest(), n.note_type()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (false, Some("quarter")),
                (true, Some("quarter")),
                (false, Some("quarter")),
                (true, Some("half")),
            ]
        );
        assert_eq!(measure.notes[0].pitch().unwrap().step(), Step::C);
        assert_eq!(measure.notes[2].pitch().unwrap().step(), Step::E);
        assert_eq!(measure.extent, 5 * 480);
    }

    #[test]
    fn markers_without_duration_add_nothing() {
        let xml_text = format!(
            r#"<measure number="1">{FOUR_FOUR}{}<forward/>{}<backup/>{}{}</measure>"#,
            quarter("C"),
            quarter("D"),
            quarter("E"),
            quarter("F")
        );
        let (result, _) = run(&xml_text, &MeasureContext::default());
        assert_eq!(result.unwrap().notes.len(), 4);
    }

    #[test]
    fn effective_state_is_inherited() {
        let first = format!(r#"<measure number="1">{FOUR_FOUR}<note><rest/><duration>1920</duration></note></measure>"#);
        let (m1, _) = run(&first, &MeasureContext::default());
        let m1 = m1.unwrap();
        let carried = MeasureContext::from(&m1);

        let (m2, warnings) = run(r#"<measure number="2"><note><rest/><duration>1920</duration></note></measure>"#, &carried);
        let m2 = m2.unwrap();
        assert!(warnings.is_empty());
        assert_eq!(m2.divisions, Some(480));
        assert_eq!(m2.key, m1.key);
        assert_eq!(m2.time, m1.time);
        assert_eq!(m2.clefs, m1.clefs);
        assert_eq!(m2.attributes, None);
    }

    #[test]
    fn clefs_merge_by_staff() {
        let mut ctx = MeasureContext::default();
        ctx.apply(&AttributesUpdate {
            clefs: vec![
                Clef::new(ClefSign::F, Some(4), None, 2).unwrap(),
                Clef::new(ClefSign::G, Some(2), None, 1).unwrap(),
            ],
            ..Default::default()
        });
        ctx.apply(&AttributesUpdate {
            clefs: vec![Clef::new(ClefSign::G, Some(2), None, 2).unwrap()],
            ..Default::default()
        });
        let signs: Vec<(u32, ClefSign)> = ctx.clefs.iter().map(|c| (c.staff_number(), c.sign())).collect();
        assert_eq!(signs, vec![(1, ClefSign::G), (2, ClefSign::G)]);
    }

    #[test]
    fn bad_measure_numbers_are_fatal() {
        for (number, implicit) in [("abc", ""), ("-1", ""), ("0", "")] {
            let xml_text = format!(r#"<measure number="{number}" {implicit}/>"#);
            let (result, _) = run(&xml_text, &MeasureContext::default());
            match result {
                Err(ParseError::Validation(f)) => {
                    assert_eq!(f.rule, Rule::MeasureNumber);
                    assert_eq!(f.context.part_id.as_deref(), Some("P1"));
                }
                other => panic!("expected validation failure for {number}, got {other:?}"),
            }
        }
        let (pickup, _) = run(r#"<measure number="0" implicit="yes"/>"#, &MeasureContext::default());
        assert!(pickup.unwrap().implicit);
    }

    #[test]
    fn short_measure_is_reported_but_pickup_is_not() {
        let ctx = {
            let (m, _) = run(&format!(r#"<measure number="1">{FOUR_FOUR}</measure>"#), &MeasureContext::default());
            MeasureContext::from(&m.unwrap())
        };
        let (result, warnings) = run(&format!(r#"<measure number="2">{}</measure>"#, quarter("C")), &ctx);
        assert!(result.is_ok());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].rule, Some(Rule::MeasureDuration));
        assert_eq!(warnings[0].severity, Severity::Info);

        let (_, warnings) = run(&format!(r#"<measure number="0" implicit="yes">{}</measure>"#, quarter("C")), &ctx);
        assert!(warnings.is_empty());
    }

    #[test]
    fn two_voices_with_backup() {
        let eighth = |step: &str, beam: &str| {
            format!(
                "<note><pitch><step>{step}</step><octave>5</octave></pitch><duration>240</duration><voice>1</voice>\
                 <type>eighth</type><beam number=\"1\">{beam}</beam></note>"
            )
        };
        let xml_text = format!(
            r#"<measure number="1">{FOUR_FOUR}
                {}{}{}{}{}{}{}{}
                <backup><duration>1920</duration></backup>
                <note><pitch><step>C</step><octave>3</octave></pitch><duration>1920</duration><voice>2</voice><type>whole</type></note>
              </measure>"#,
            eighth("C", "begin"),
            eighth("D", "continue"),
            eighth("E", "continue"),
            eighth("F", "end"),
            eighth("G", "begin"),
            eighth("A", "continue"),
            eighth("B", "continue"),
            eighth("C", "end"),
        );
        let (result, warnings) = run(&xml_text, &MeasureContext::default());
        let measure = result.unwrap();
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(measure.notes.len(), 10);
        assert_eq!(measure.notes[8].content(), NoteContent::Rest { measure: false });
        assert!(measure.notes[8].is_synthesized());
        assert_eq!(measure.beams.len(), 2);
        assert_eq!(measure.beams[1].notes, vec![4, 5, 6, 7]);
        assert_eq!(measure.beams[0].role, BeamRole::Plain);
        assert_eq!(measure.extent, 1920);
    }

    #[test]
    fn markings_are_collected() {
        let xml_text = r#"<measure number="5" width="210.5">
            <print new-system="yes"/>
            <harmony><root><root-step>G</root-step></root><kind>dominant</kind></harmony>
            <direction placement="below"><direction-type><dynamics><p/></dynamics></direction-type></direction>
            <sound tempo="90"/>
            <barline location="left"><ending number="2" type="start"/></barline>
          </measure>"#;
        let ctx = MeasureContext {
            divisions: Some(1),
            ..Default::default()
        };
        let (result, _) = run(xml_text, &ctx);
        let measure = result.unwrap();
        assert_eq!(measure.width, Some(210.5));
        assert!(measure.print.unwrap().new_system);
        assert_eq!(measure.harmonies.len(), 1);
        assert_eq!(measure.directions.len(), 2);
        assert_eq!(measure.directions[1].sound_tempo, Some(90.0));
        assert_eq!(measure.endings[0].number, "2");
    }

    #[test]
    fn closed_engine_rejects_more_children() {
        let doc = roxmltree::Document::parse(r#"<measure number="1"><note/></measure>"#).unwrap();
        let root = doc.root_element();
        let opts = ParseOptions::default();
        let scope = Scope::part("P1").measure("1");
        let mut sink = Vec::new();
        let mut engine = MeasureEngine::open(&root, &MeasureContext::default(), &scope, &opts).unwrap();
        assert_eq!(engine.phase(), Phase::AwaitingAttributes);
        engine.close(&root, &scope, &mut sink);
        assert_eq!(engine.phase(), Phase::Closed);
        let note = xml::child(&root, "note").unwrap();
        assert!(engine.visit(&note, &scope, &mut sink).is_err());
    }
}
