//! Error types.
//!
//! Parsing distinguishes two fatal failure kinds:
//!   - [`StructureFailure`]: a required element or attribute is missing or its
//!     text cannot be parsed, and no safe default exists.
//!   - [`ValidationFailure`]: a parsed value breaks a musical rule (ranges,
//!     power-of-two beat types, measure numbering).
//!
//! Everything else is reported as a [`Warning`](crate::warning::Warning).
//! [`ParseError`] wraps both kinds together with the failures of the
//! surrounding layers (XML tokenizer, MXL archive, file I/O).

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validation::Rule;

/// Where a failure happened, as far as it is known.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureContext {
    pub part_id: Option<String>,
    pub measure_number: Option<String>,
    /// Best-effort 1-based source line
    pub line: Option<u32>,
    /// Element name the failure was detected on
    pub element: Option<String>,
}

impl FailureContext {
    pub fn is_empty(&self) -> bool {
        self.part_id.is_none()
            && self.measure_number.is_none()
            && self.line.is_none()
            && self.element.is_none()
    }

    /// Fill in whatever this context is missing from `outer`.
    pub fn or(mut self, outer: &FailureContext) -> Self {
        if self.part_id.is_none() {
            self.part_id = outer.part_id.clone();
        }
        if self.measure_number.is_none() {
            self.measure_number = outer.measure_number.clone();
        }
        if self.line.is_none() {
            self.line = outer.line;
        }
        if self.element.is_none() {
            self.element = outer.element.clone();
        }
        self
    }
}

impl fmt::Display for FailureContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref p) = self.part_id {
            parts.push(format!("part {p}"));
        }
        if let Some(ref m) = self.measure_number {
            parts.push(format!("measure {m}"));
        }
        if let Some(ref e) = self.element {
            parts.push(format!("<{e}>"));
        }
        if let Some(l) = self.line {
            parts.push(format!("line {l}"));
        }
        write!(f, "{}", parts.join(", "))
    }
}

fn located(context: &FailureContext) -> String {
    if context.is_empty() {
        String::new()
    } else {
        format!(" ({context})")
    }
}

/// A required child/attribute is missing or unparsable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}{}", located(.context))]
pub struct StructureFailure {
    pub message: String,
    pub context: FailureContext,
}

impl StructureFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: FailureContext::default(),
        }
    }

    pub fn with_context(mut self, context: FailureContext) -> Self {
        self.context = self.context.or(&context);
        self
    }
}

/// A parsed value violates a musical-domain rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{rule}] {message}{}", located(.context))]
pub struct ValidationFailure {
    pub rule: Rule,
    pub message: String,
    pub context: FailureContext,
}

impl ValidationFailure {
    pub fn new(rule: Rule, message: impl Into<String>) -> Self {
        Self {
            rule,
            message: message.into(),
            context: FailureContext::default(),
        }
    }

    pub fn with_context(mut self, context: FailureContext) -> Self {
        self.context = self.context.or(&context);
        self
    }
}

/// Top-level error returned by the public parse functions.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("unsupported document: {0}")]
    UnsupportedDocument(String),

    #[error("MXL archive: {0}")]
    Archive(String),

    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("structure error: {0}")]
    Structure(#[from] StructureFailure),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationFailure),
}

impl ParseError {
    /// The failure context, for the two core failure kinds.
    pub fn context(&self) -> Option<&FailureContext> {
        match self {
            ParseError::Structure(f) => Some(&f.context),
            ParseError::Validation(f) => Some(&f.context),
            _ => None,
        }
    }
}
