//! Small helpers over the roxmltree element tree.

use std::str::FromStr;

use roxmltree::Node;

use crate::error::{FailureContext, StructureFailure, ValidationFailure};
use crate::validation::Rule;
use crate::warning::{emit, Category, Warning, WarningSink};

/// Part id / measure number a resolver is working in, for diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scope<'a> {
    pub part_id: Option<&'a str>,
    pub measure_number: Option<&'a str>,
}

impl<'a> Scope<'a> {
    pub fn part(part_id: &'a str) -> Self {
        Self {
            part_id: Some(part_id),
            measure_number: None,
        }
    }

    pub fn measure(self, number: &'a str) -> Self {
        Self {
            measure_number: Some(number),
            ..self
        }
    }

    pub fn context(&self, node: &Node) -> FailureContext {
        FailureContext {
            part_id: self.part_id.map(String::from),
            measure_number: self.measure_number.map(String::from),
            line: line_of(node),
            element: Some(node.tag_name().name().to_string()),
        }
    }

    pub fn structure(&self, node: &Node, message: impl Into<String>) -> StructureFailure {
        StructureFailure::new(message).with_context(self.context(node))
    }

    pub fn locate(&self, node: &Node, failure: ValidationFailure) -> ValidationFailure {
        failure.with_context(self.context(node))
    }

    pub fn warning(&self, node: &Node, category: Category, message: impl Into<String>) -> Warning {
        Warning::new(category, message)
            .with_element(node.tag_name().name())
            .with_line(line_of(node))
            .in_scope(self)
    }

    /// Number from a required element; anything but a parsable value is fatal.
    pub fn required<T: FromStr>(&self, node: &Node) -> Result<T, StructureFailure> {
        let tag = node.tag_name().name();
        match parse_text::<T>(node) {
            Ok(Some(v)) => Ok(v),
            Ok(None) => Err(self.structure(node, format!("<{tag}> is empty"))),
            Err(t) => Err(self.structure(node, format!("<{tag}> has unparsable value '{t}'"))),
        }
    }

    /// Number from an optional element. Empty or unparsable text is
    /// reported and treated as absent.
    pub fn optional<T: FromStr>(
        &self,
        node: &Node,
        rule: Rule,
        sink: &mut dyn WarningSink,
    ) -> Option<T> {
        let tag = node.tag_name().name();
        match parse_text::<T>(node) {
            Ok(Some(v)) => Some(v),
            Ok(None) => {
                emit(
                    sink,
                    self.warning(node, Category::Structure, format!("ignoring empty <{tag}>"))
                        .with_rule(rule),
                );
                None
            }
            Err(t) => {
                emit(
                    sink,
                    self.warning(
                        node,
                        Category::Structure,
                        format!("ignoring unparsable <{tag}> value '{t}'"),
                    )
                    .with_rule(rule)
                    .with_context("text", t),
                );
                None
            }
        }
    }
}

/// Best-effort 1-based line number of a node.
pub fn line_of(node: &Node) -> Option<u32> {
    let pos = node.document().text_pos_at(node.range().start);
    (pos.row > 0).then_some(pos.row)
}

/// Element children only.
pub fn elements<'a, 'input>(node: &Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| n.is_element())
}

/// First element child with the given name.
pub fn child<'a, 'input>(node: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    elements(node).find(|n| n.tag_name().name() == tag)
}

pub fn has_child(node: &Node, tag: &str) -> bool {
    child(node, tag).is_some()
}

/// Trimmed text content; `None` when absent or blank.
pub fn text<'a>(node: &Node<'a, '_>) -> Option<&'a str> {
    node.text().map(str::trim).filter(|t| !t.is_empty())
}

pub fn child_text<'a>(node: &Node<'a, '_>, tag: &str) -> Option<&'a str> {
    child(node, tag).and_then(|c| text(&c))
}

pub fn is_yes(node: &Node, attribute: &str) -> bool {
    node.attribute(attribute) == Some("yes")
}

/// Parse trimmed text as a number, distinguishing "absent" (`Ok(None)`)
/// from "present but malformed" (`Err(text)`).
pub fn parse_text<T: FromStr>(node: &Node) -> Result<Option<T>, String> {
    match text(node) {
        None => Ok(None),
        Some(t) => t.parse::<T>().map(Some).map_err(|_| t.to_string()),
    }
}

pub fn parse_f64(node: &Node) -> Option<f64> {
    text(node)?.parse().ok()
}

pub fn attribute_f64(node: &Node, attribute: &str) -> Option<f64> {
    node.attribute(attribute)?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_numbers_are_one_based() {
        let doc = roxmltree::Document::parse("<a>\n  <b> 12 </b>\n  <c/>\n</a>").unwrap();
        let root = doc.root_element();
        assert_eq!(line_of(&root), Some(1));
        let b = child(&root, "b").unwrap();
        assert_eq!(line_of(&b), Some(2));
        assert_eq!(text(&b), Some("12"));
        assert_eq!(parse_text::<u32>(&b), Ok(Some(12)));
        let c = child(&root, "c").unwrap();
        assert_eq!(parse_text::<u32>(&c), Ok(None));
    }

    #[test]
    fn malformed_number_keeps_offending_text() {
        let doc = roxmltree::Document::parse("<a>x1</a>").unwrap();
        assert_eq!(parse_text::<i32>(&doc.root_element()), Err("x1".to_string()));
    }
}
