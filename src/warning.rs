//! Non-fatal diagnostics.
//!
//! Resolvers never throw for problems in optional regions of a document;
//! they describe the problem as a [`Warning`] and hand it to the
//! [`WarningSink`] the caller passed in, then keep going.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::error::{FailureContext, ValidationFailure};
use crate::validation::Rule;
use crate::xml::Scope;

/// What kind of problem a warning describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Missing or unparsable optional element/attribute
    Structure,
    /// A value outside its musical range, caught and skipped
    Validation,
    /// Durations, divisions and the measure timeline
    Timing,
    /// Beam group reconstruction
    Beam,
    /// Slurs, ties, articulations
    Notation,
    /// Header, part-list and other descriptive data
    Metadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    Info,
    Warning,
}

/// One accumulated diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub category: Category,
    pub severity: Severity,
    pub message: String,
    pub rule: Option<Rule>,
    /// Best-effort 1-based source line
    pub line: Option<u32>,
    /// Element the warning refers to
    pub element: Option<String>,
    /// Free-form extra context (part id, measure number, offending text, ...)
    pub context: BTreeMap<String, String>,
}

impl Warning {
    pub fn new(category: Category, message: impl Into<String>) -> Self {
        Self {
            category,
            severity: Severity::Warning,
            message: message.into(),
            rule: None,
            line: None,
            element: None,
            context: BTreeMap::new(),
        }
    }

    pub fn info(category: Category, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            ..Self::new(category, message)
        }
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rule = Some(rule);
        self
    }

    pub fn with_element(mut self, element: impl Into<String>) -> Self {
        self.element = Some(element.into());
        self
    }

    pub fn with_line(mut self, line: Option<u32>) -> Self {
        self.line = line;
        self
    }

    pub fn with_context(mut self, key: &str, value: impl Into<String>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }

    /// Attach part id / measure number from a diagnostic scope.
    pub fn in_scope(mut self, scope: &Scope) -> Self {
        if let Some(part) = scope.part_id {
            self.context
                .entry("part".to_string())
                .or_insert_with(|| part.to_string());
        }
        if let Some(measure) = scope.measure_number {
            self.context
                .entry("measure".to_string())
                .or_insert_with(|| measure.to_string());
        }
        self
    }

    fn with_failure_context(mut self, ctx: &FailureContext) -> Self {
        if self.line.is_none() {
            self.line = ctx.line;
        }
        if self.element.is_none() {
            self.element = ctx.element.clone();
        }
        if let Some(ref part) = ctx.part_id {
            self = self.with_context("part", part.clone());
        }
        if let Some(ref measure) = ctx.measure_number {
            self = self.with_context("measure", measure.clone());
        }
        self
    }
}

impl From<ValidationFailure> for Warning {
    /// A validation failure caught in an optional/skippable unit.
    fn from(failure: ValidationFailure) -> Self {
        Warning::new(Category::Validation, failure.message)
            .with_rule(failure.rule)
            .with_failure_context(&failure.context)
    }
}

/// Destination for warnings produced while parsing.
///
/// One sink per parse is the simple case (`Vec<Warning>`). To share one
/// collection across parallel parses, give each parse a clone of
/// [`SharedWarnings`].
pub trait WarningSink {
    fn push(&mut self, warning: Warning);
}

impl WarningSink for Vec<Warning> {
    fn push(&mut self, warning: Warning) {
        Vec::push(self, warning);
    }
}

/// Thread-safe warning collection; clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct SharedWarnings {
    inner: Arc<Mutex<Vec<Warning>>>,
}

impl SharedWarnings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy out everything collected so far.
    pub fn snapshot(&self) -> Vec<Warning> {
        match self.inner.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self.inner.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl WarningSink for SharedWarnings {
    fn push(&mut self, warning: Warning) {
        // A panic in another parse must not lose this one's warnings.
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push(warning);
    }
}

/// Log and record a warning.
pub(crate) fn emit(sink: &mut dyn WarningSink, warning: Warning) {
    log::debug!(
        "{:?} {:?}{}: {}",
        warning.severity,
        warning.category,
        warning
            .line
            .map(|l| format!(" (line {l})"))
            .unwrap_or_default(),
        warning.message
    );
    sink.push(warning);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_failure_becomes_validation_warning() {
        let failure = ValidationFailure::new(Rule::PitchOctave, "octave 12 out of range")
            .with_context(FailureContext {
                part_id: Some("P1".into()),
                measure_number: Some("3".into()),
                line: Some(42),
                element: Some("note".into()),
            });
        let warning = Warning::from(failure);
        assert_eq!(warning.category, Category::Validation);
        assert_eq!(warning.rule, Some(Rule::PitchOctave));
        assert_eq!(warning.line, Some(42));
        assert_eq!(warning.element.as_deref(), Some("note"));
        assert_eq!(warning.context.get("measure").map(String::as_str), Some("3"));
    }

    #[test]
    fn shared_warnings_collect_across_threads() {
        let shared = SharedWarnings::new();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let mut sink = shared.clone();
                std::thread::spawn(move || {
                    sink.push(Warning::new(Category::Timing, format!("w{i}")));
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(shared.len(), 4);
    }
}
