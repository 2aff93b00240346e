//! Static validation of extracted tasks against the schema snapshot.
//!
//! Three checks run per task, in order: the property exists on the label(s),
//! an equality value is one of the property's enumerated values, and a numeric
//! equality value lies within the observed range. Labels missing from the
//! schema make a check pass silently, since the snapshot may be incomplete.

use super::parser::extract_entities;
use super::task::{Combinator, ValidationTask};
use crate::schema::{EntityKind, NumericRange, PropertyType, SchemaModel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Whether the observed min/max are themselves acceptable values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeBoundary {
    /// `min < v < max`
    #[default]
    Exclusive,
    /// `min <= v <= max`
    Inclusive,
}

impl RangeBoundary {
    fn is_out_of_range(self, value: f64, range: &NumericRange) -> bool {
        match self {
            Self::Exclusive => value <= range.min || value >= range.max,
            Self::Inclusive => value < range.min || value > range.max,
        }
    }
}

/// Parse the statement and check every node and relationship task
pub fn validate_with_schema(
    statement: &str,
    schema: &SchemaModel,
    boundary: RangeBoundary,
) -> Vec<String> {
    let entities = extract_entities(statement);

    let mut errors = validate_tasks(&entities.node_tasks, schema, EntityKind::Node, boundary);
    for e in validate_tasks(
        &entities.relationship_tasks,
        schema,
        EntityKind::Relationship,
        boundary,
    ) {
        if !errors.contains(&e) {
            errors.push(e);
        }
    }
    errors
}

/// Check tasks of one entity kind. Duplicate messages are reported once.
pub fn validate_tasks(
    tasks: &[ValidationTask],
    schema: &SchemaModel,
    kind: EntityKind,
    boundary: RangeBoundary,
) -> Vec<String> {
    let mut errors: Vec<String> = Vec::new();
    let mut push = |message: Option<String>| {
        if let Some(m) = message {
            if !errors.contains(&m) {
                errors.push(m);
            }
        }
    };

    for task in tasks {
        let mut task = task.clone();
        task.property_type = resolve_property_type(&task, schema, kind);

        push(check_property_name(&task, schema, kind));
        if !task.is_equality() {
            continue;
        }
        match task.property_type {
            Some(PropertyType::String) => push(check_enum_value(&task, schema, kind)),
            Some(PropertyType::Integer | PropertyType::Float) => {
                push(check_range(&task, schema, kind, boundary))
            }
            _ => {}
        }
    }
    errors
}

/// The property's type across the task's labels, when they agree
pub fn resolve_property_type(
    task: &ValidationTask,
    schema: &SchemaModel,
    kind: EntityKind,
) -> Option<PropertyType> {
    let name = task.property_name.as_deref()?;
    let types: BTreeSet<&PropertyType> = task
        .label_expression()
        .labels
        .iter()
        .filter_map(|l| schema.property(kind, l, name))
        .map(|p| &p.property_type)
        .collect();

    match types.len() {
        1 => types.into_iter().next().cloned(),
        0 => {
            debug!(
                labels = ?task.labels_or_types,
                property = name,
                "Property not declared on any label, skipping value checks"
            );
            None
        }
        _ => {
            debug!(
                labels = ?task.labels_or_types,
                property = name,
                "Ambiguous property type across labels, skipping value checks"
            );
            None
        }
    }
}

fn check_property_name(task: &ValidationTask, schema: &SchemaModel, kind: EntityKind) -> Option<String> {
    let name = task.property_name.as_deref()?;
    let expr = task.label_expression();

    let mut invalid = Vec::new();
    for label in &expr.labels {
        let Some(properties) = schema.properties(kind, label) else {
            debug!(%kind, label = %label, "Label not in schema, skipping property check");
            return None;
        };
        if !properties.iter().any(|p| p.name == name) {
            invalid.push(label.as_str());
        }
    }

    if invalid.is_empty() {
        return None;
    }
    match expr.combinator {
        Combinator::Single => Some(format!(
            "{} {} does not have the property {} in the graph database.",
            kind,
            expr.labels.join(", "),
            name
        )),
        Combinator::And => Some(format!(
            "{}(s) {} do(es) not have the property {} in the graph database.",
            kind,
            invalid.join(", "),
            name
        )),
        Combinator::Or if invalid.len() == expr.labels.len() => Some(format!(
            "None of {}s {} have the property {} in the graph database.",
            kind,
            expr.labels.join(", "),
            name
        )),
        Combinator::Or => None,
    }
}

fn check_enum_value(task: &ValidationTask, schema: &SchemaModel, kind: EntityKind) -> Option<String> {
    let name = task.property_name.as_deref()?;
    let value = task.property_value.as_ref()?.to_string();
    let expr = task.label_expression();

    let mut invalid = Vec::new();
    for label in &expr.labels {
        // Only exhaustive samples are authoritative
        let values = schema.property(kind, label, name)?.values.as_ref()?;
        if !values.contains(&value) {
            invalid.push(label.as_str());
        }
    }

    if invalid.is_empty() {
        return None;
    }
    match expr.combinator {
        Combinator::Single => Some(format!(
            "{} {} with property {} = {} not found in graph database.",
            kind,
            expr.labels.join(", "),
            name,
            value
        )),
        Combinator::And => Some(format!(
            "{}(s) {} with property {} = {} not found in graph database.",
            kind,
            invalid.join(", "),
            name,
            value
        )),
        Combinator::Or if invalid.len() == expr.labels.len() => Some(format!(
            "None of {}s {} have property {} = {} in graph database.",
            kind,
            expr.labels.join(", "),
            name,
            value
        )),
        Combinator::Or => None,
    }
}

fn check_range(
    task: &ValidationTask,
    schema: &SchemaModel,
    kind: EntityKind,
    boundary: RangeBoundary,
) -> Option<String> {
    let name = task.property_name.as_deref()?;
    let value = task.property_value.as_ref()?;
    let number = value.as_number()?;
    let expr = task.label_expression();

    let mut invalid: Vec<(&str, NumericRange)> = Vec::new();
    for label in &expr.labels {
        schema.properties(kind, label)?;
        let range = schema.property(kind, label, name).and_then(|p| p.range);
        if let Some(range) = range {
            if boundary.is_out_of_range(number, &range) {
                invalid.push((label.as_str(), range));
            }
        }
    }

    let (_, first_range) = *invalid.first()?;
    let described = invalid
        .iter()
        .map(|(label, r)| format!("{} with range {} to {}", label, r.min, r.max))
        .collect::<Vec<_>>()
        .join(", ");

    match expr.combinator {
        Combinator::Single => Some(format!(
            "{} {} has property {} = {} which is out of range {} to {} in graph database.",
            kind,
            expr.labels.join(", "),
            name,
            value,
            first_range.min,
            first_range.max
        )),
        Combinator::And => Some(format!(
            "{}(s) {} have property {} = {} which is out of range in graph database.",
            kind, described, name, value
        )),
        Combinator::Or if invalid.len() == expr.labels.len() => Some(format!(
            "All of {}s {} have property {} = {} which is out of range in graph database.",
            kind, described, name, value
        )),
        Combinator::Or => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PropertyDescriptor;
    use crate::validation::task::PropertyValue;

    fn schema() -> SchemaModel {
        SchemaModel::new()
            .with_node(
                "NodeA",
                vec![
                    PropertyDescriptor::new("prop_1", PropertyType::String).with_values(["a", "b"]),
                    PropertyDescriptor::new("prop_2", PropertyType::Integer).with_range(0.0, 10.0),
                ],
            )
            .with_node(
                "NodeB",
                vec![
                    PropertyDescriptor::new("prop_1", PropertyType::String).with_values(["a", "b"]),
                    PropertyDescriptor::new("prop_3", PropertyType::String).with_values(["x"]),
                    PropertyDescriptor::new("prop_4", PropertyType::Float).with_range(1.0, 2.0),
                ],
            )
            .with_node(
                "NodeC",
                vec![PropertyDescriptor::new("prop_1", PropertyType::String)],
            )
            .with_relationship_type(
                "REL_A",
                vec![PropertyDescriptor::new("prop_1", PropertyType::String).with_values(["a", "b"])],
            )
            .with_triple("NodeA", "REL_A", "NodeB")
    }

    fn task(labels: &str, property: &str, value: PropertyValue) -> ValidationTask {
        ValidationTask::with_property(Some(labels.to_string()), "=", property, value)
    }

    fn s(v: &str) -> PropertyValue {
        PropertyValue::String(v.to_string())
    }

    fn check(tasks: &[ValidationTask]) -> Vec<String> {
        validate_tasks(tasks, &schema(), EntityKind::Node, RangeBoundary::Exclusive)
    }

    #[test]
    fn test_valid_tasks() {
        let errors = check(&[
            task("NodeA", "prop_1", s("a")),
            task("NodeA", "prop_2", PropertyValue::Integer(5)),
            task("NodeA&NodeB", "prop_1", s("a")),
        ]);
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_missing_property_single() {
        let errors = check(&[task("NodeA", "prop_9", s("a"))]);
        assert_eq!(
            errors,
            vec!["Node NodeA does not have the property prop_9 in the graph database."]
        );
    }

    #[test]
    fn test_missing_property_and_names_failing_labels() {
        let errors = check(&[task("NodeA&NodeB", "prop_3", s("x"))]);
        assert_eq!(
            errors,
            vec!["Node(s) NodeA do(es) not have the property prop_3 in the graph database."]
        );
    }

    #[test]
    fn test_missing_property_or() {
        assert!(check(&[task("NodeA|NodeB", "prop_3", s("x"))]).is_empty());

        let errors = check(&[task("NodeA|NodeB", "prop_9", s("x"))]);
        assert_eq!(
            errors,
            vec!["None of Nodes NodeA, NodeB have the property prop_9 in the graph database."]
        );
    }

    #[test]
    fn test_enum_value_precision() {
        assert!(check(&[task("NodeA", "prop_1", s("b"))]).is_empty());

        let errors = check(&[task("NodeA", "prop_1", s("z"))]);
        assert_eq!(
            errors,
            vec!["Node NodeA with property prop_1 = z not found in graph database."]
        );
    }

    #[test]
    fn test_enum_value_and_or() {
        let and = check(&[task("NodeA&NodeB", "prop_1", s("z"))]);
        assert_eq!(
            and,
            vec!["Node(s) NodeA, NodeB with property prop_1 = z not found in graph database."]
        );

        let or = check(&[task("NodeA|NodeB", "prop_1", s("z"))]);
        assert_eq!(
            or,
            vec!["None of Nodes NodeA, NodeB have property prop_1 = z in graph database."]
        );
    }

    #[test]
    fn test_non_exhaustive_enum_is_not_checked() {
        assert!(check(&[task("NodeC", "prop_1", s("anything"))]).is_empty());
    }

    #[test]
    fn test_range_boundary_exclusive() {
        let errors = check(&[task("NodeA", "prop_2", PropertyValue::Integer(10))]);
        assert_eq!(
            errors,
            vec!["Node NodeA has property prop_2 = 10 which is out of range 0 to 10 in graph database."]
        );
        assert_eq!(check(&[task("NodeA", "prop_2", PropertyValue::Integer(0))]).len(), 1);
        assert_eq!(check(&[task("NodeA", "prop_2", PropertyValue::Integer(11))]).len(), 1);
    }

    #[test]
    fn test_range_boundary_inclusive() {
        let inclusive = |v: i64| {
            validate_tasks(
                &[task("NodeA", "prop_2", PropertyValue::Integer(v))],
                &schema(),
                EntityKind::Node,
                RangeBoundary::Inclusive,
            )
        };
        assert!(inclusive(10).is_empty());
        assert!(inclusive(0).is_empty());
        assert_eq!(inclusive(11).len(), 1);
    }

    #[test]
    fn test_range_only_for_equality() {
        let gt = ValidationTask::with_property(
            Some("NodeA".into()),
            ">",
            "prop_2",
            PropertyValue::Integer(100),
        );
        assert!(check(&[gt]).is_empty());
    }

    #[test]
    fn test_unknown_label_is_skipped() {
        assert!(check(&[task("Unknown", "prop_9", s("z"))]).is_empty());
        assert!(check(&[task("NodeA&Unknown", "prop_9", s("z"))]).is_empty());
    }

    #[test]
    fn test_ambiguous_type_resolves_to_none() {
        let schema = schema().with_node(
            "NodeD",
            vec![PropertyDescriptor::new("prop_2", PropertyType::String)],
        );
        let t = task("NodeA|NodeD", "prop_2", PropertyValue::Integer(100));
        assert_eq!(resolve_property_type(&t, &schema, EntityKind::Node), None);
        assert!(validate_tasks(&[t], &schema, EntityKind::Node, RangeBoundary::Exclusive).is_empty());
    }

    #[test]
    fn test_absent_property_resolves_to_none() {
        let t = task("NodeA", "prop_9", PropertyValue::Integer(100));
        assert_eq!(resolve_property_type(&t, &schema(), EntityKind::Node), None);
        // only the name check reports; no value check runs without a type
        assert_eq!(
            check(&[t]),
            vec!["Node NodeA does not have the property prop_9 in the graph database."]
        );
    }

    #[test]
    fn test_duplicate_errors_are_collapsed() {
        let t = task("NodeA", "prop_9", s("a"));
        assert_eq!(check(&[t.clone(), t]).len(), 1);
    }

    #[test]
    fn test_relationship_tasks() {
        let errors = validate_tasks(
            &[task("REL_A", "prop_1", s("c"))],
            &schema(),
            EntityKind::Relationship,
            RangeBoundary::Exclusive,
        );
        assert_eq!(
            errors,
            vec!["Relationship REL_A with property prop_1 = c not found in graph database."]
        );
    }

    #[test]
    fn test_validate_statement() {
        let schema = schema();
        let statement = "MATCH (a:NodeA {prop_1: 'a'})-[r:REL_A]->(b:NodeB) WHERE a.prop_2 = 42 AND b.color = 'red' RETURN a";
        let errors = validate_with_schema(statement, &schema, RangeBoundary::Exclusive);
        assert_eq!(
            errors,
            vec![
                "Node NodeA has property prop_2 = 42 which is out of range 0 to 10 in graph database.",
                "Node NodeB does not have the property color in the graph database.",
            ]
        );

        // Pure: repeated runs agree
        assert_eq!(
            validate_with_schema(statement, &schema, RangeBoundary::Exclusive),
            errors
        );
    }
}
