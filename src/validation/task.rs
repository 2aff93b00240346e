//! Validation tasks extracted from a Cypher statement

use crate::schema::PropertyType;
use std::fmt;

/// How the labels of a combined label expression relate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// A single label or type
    Single,
    /// `A&B` or `A:B`: the entity carries every label
    And,
    /// `A|B`: the entity carries at least one label
    Or,
}

/// A label or relationship-type expression split into its parts.
///
/// Negated parts (`!Label`) are dropped: they constrain nothing to validate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelExpression {
    pub labels: Vec<String>,
    pub combinator: Combinator,
}

impl LabelExpression {
    /// Split on `&` (AND), `|` (OR) or `:` (AND), in that order of precedence.
    pub fn parse(raw: &str) -> Self {
        let (parts, combinator): (Vec<&str>, Combinator) = if raw.contains('&') {
            (raw.split('&').collect(), Combinator::And)
        } else if raw.contains('|') {
            (raw.split('|').collect(), Combinator::Or)
        } else if raw.contains(':') {
            (raw.split(':').collect(), Combinator::And)
        } else {
            (vec![raw], Combinator::Single)
        };

        let labels = parts
            .into_iter()
            .map(|l| l.trim().trim_matches('`').trim())
            .filter(|l| !l.is_empty() && !l.starts_with('!'))
            .map(str::to_string)
            .collect();

        Self { labels, combinator }
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// A literal compared against a property in the statement
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Integer(i64),
    Float(f64),
    /// `$name`, bound at run time; never value-checked
    Parameter(String),
    /// `[...]` list literal; never value-checked
    List(String),
}

impl PropertyValue {
    /// Interpret the raw text of a literal as written in the statement
    pub fn parse_literal(raw: &str) -> Self {
        let raw = raw.trim();
        for quote in ['\'', '"'] {
            if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
                return Self::String(raw[1..raw.len() - 1].to_string());
            }
        }
        if let Some(name) = raw.strip_prefix('$') {
            return Self::Parameter(name.to_string());
        }
        if raw.starts_with('[') {
            return Self::List(raw.to_string());
        }
        if let Ok(i) = raw.parse::<i64>() {
            return Self::Integer(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            return Self::Float(f);
        }
        Self::String(raw.trim_matches(|c| c == '"' || c == '\'').to_string())
    }

    /// Numeric reading of the literal, used by range checks
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::String(s) => s.trim().parse().ok(),
            Self::Parameter(_) | Self::List(_) => None,
        }
    }

    /// Whether the literal is known at validation time
    pub fn is_literal(&self) -> bool {
        !matches!(self, Self::Parameter(_) | Self::List(_))
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{}", s),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Parameter(name) => write!(f, "${}", name),
            Self::List(raw) => write!(f, "{}", raw),
        }
    }
}

/// One `(label/type, property, operator, value)` unit to check.
///
/// Created per validation pass from the statement parser's output and
/// discarded afterwards.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationTask {
    /// Raw label/type expression as written, e.g. `NodeA&NodeB`
    pub labels_or_types: Option<String>,
    pub operator: Option<String>,
    pub property_name: Option<String>,
    pub property_value: Option<PropertyValue>,
    /// Filled in from the schema; `None` when absent or ambiguous
    pub property_type: Option<PropertyType>,
}

impl ValidationTask {
    /// A pattern that was seen but constrains no property
    pub fn bare(labels_or_types: Option<String>) -> Self {
        Self {
            labels_or_types,
            ..Self::default()
        }
    }

    pub fn with_property(
        labels_or_types: Option<String>,
        operator: &str,
        property_name: &str,
        property_value: PropertyValue,
    ) -> Self {
        Self {
            labels_or_types,
            operator: Some(operator.to_string()),
            property_name: Some(property_name.to_string()),
            property_value: Some(property_value),
            property_type: None,
        }
    }

    /// Parsed label expression; empty when the pattern had no label
    pub fn label_expression(&self) -> LabelExpression {
        LabelExpression::parse(self.labels_or_types.as_deref().unwrap_or_default())
    }

    /// Value checks only make sense for equality against a known literal
    pub fn is_equality(&self) -> bool {
        self.operator.as_deref() == Some("=")
            && self
                .property_value
                .as_ref()
                .is_some_and(PropertyValue::is_literal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labels_or() {
        let expr = LabelExpression::parse("NodeA|NodeB");
        assert_eq!(expr.labels, vec!["NodeA", "NodeB"]);
        assert_eq!(expr.combinator, Combinator::Or);
    }

    #[test]
    fn test_parse_labels_and() {
        let expr = LabelExpression::parse("NodeA&NodeB");
        assert_eq!(expr.labels, vec!["NodeA", "NodeB"]);
        assert_eq!(expr.combinator, Combinator::And);
    }

    #[test]
    fn test_parse_labels_colon() {
        let expr = LabelExpression::parse("NodeA:NodeB");
        assert_eq!(expr.labels, vec!["NodeA", "NodeB"]);
        assert_eq!(expr.combinator, Combinator::And);
    }

    #[test]
    fn test_parse_labels_and_length_4() {
        let expr = LabelExpression::parse("NodeA & NodeB & NodeC & NodeD");
        assert_eq!(expr.labels, vec!["NodeA", "NodeB", "NodeC", "NodeD"]);
    }

    #[test]
    fn test_parse_labels_exclamation() {
        assert_eq!(LabelExpression::parse("NodeA:!NodeB").labels, vec!["NodeA"]);
        assert!(LabelExpression::parse("!NodeA").is_empty());
    }

    #[test]
    fn test_parse_labels_single_and_backticks() {
        let expr = LabelExpression::parse("NodeA");
        assert_eq!(expr.labels, vec!["NodeA"]);
        assert_eq!(expr.combinator, Combinator::Single);

        assert_eq!(LabelExpression::parse("`Node one`").labels, vec!["Node one"]);
        assert!(LabelExpression::parse("").is_empty());
    }

    #[test]
    fn test_parse_literal() {
        assert_eq!(
            PropertyValue::parse_literal("'001'"),
            PropertyValue::String("001".into())
        );
        assert_eq!(
            PropertyValue::parse_literal("\"Odyssey\""),
            PropertyValue::String("Odyssey".into())
        );
        assert_eq!(PropertyValue::parse_literal("10"), PropertyValue::Integer(10));
        assert_eq!(PropertyValue::parse_literal("-2.5"), PropertyValue::Float(-2.5));
        assert_eq!(
            PropertyValue::parse_literal("$make"),
            PropertyValue::Parameter("make".into())
        );
        assert_eq!(
            PropertyValue::parse_literal("['a', 'b']"),
            PropertyValue::List("['a', 'b']".into())
        );
        assert_eq!(
            PropertyValue::parse_literal("true"),
            PropertyValue::String("true".into())
        );
    }

    #[test]
    fn test_as_number() {
        assert_eq!(PropertyValue::Integer(5).as_number(), Some(5.0));
        assert_eq!(PropertyValue::String("7.5".into()).as_number(), Some(7.5));
        assert_eq!(PropertyValue::String("abc".into()).as_number(), None);
        assert_eq!(PropertyValue::Parameter("x".into()).as_number(), None);
    }

    #[test]
    fn test_is_equality() {
        let eq = ValidationTask::with_property(
            Some("NodeA".into()),
            "=",
            "prop_1",
            PropertyValue::String("a".into()),
        );
        assert!(eq.is_equality());

        let param = ValidationTask::with_property(
            Some("NodeA".into()),
            "=",
            "prop_1",
            PropertyValue::Parameter("p".into()),
        );
        assert!(!param.is_equality());

        let contains = ValidationTask::with_property(
            Some("NodeA".into()),
            "CONTAINS",
            "prop_1",
            PropertyValue::String("a".into()),
        );
        assert!(!contains.is_equality());
        assert!(!ValidationTask::bare(None).is_equality());
    }
}
