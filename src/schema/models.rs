//! Normalized snapshot of a graph database schema

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Declared type of a property, normalized from the database's type names
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyType {
    String,
    Integer,
    Float,
    Boolean,
    List,
    Temporal,
    Other(String),
}

impl PropertyType {
    /// Map a Neo4j type name (`String`, `Long`, `Double`, `StringArray`, ...)
    /// onto a property type.
    pub fn from_db_type(name: &str) -> Self {
        let trimmed = name.trim();
        let upper = trimmed.to_ascii_uppercase();
        if upper.ends_with("ARRAY") || upper.starts_with("LIST") {
            return Self::List;
        }
        match upper.as_str() {
            "STRING" => Self::String,
            "LONG" | "INTEGER" | "INT" => Self::Integer,
            "DOUBLE" | "FLOAT" => Self::Float,
            "BOOLEAN" => Self::Boolean,
            "DATE" | "DATETIME" | "LOCALDATETIME" | "TIME" | "LOCALTIME" | "DURATION"
            | "DATE_TIME" | "LOCAL_DATE_TIME" | "ZONED DATETIME" => Self::Temporal,
            _ => Self::Other(trimmed.to_string()),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "STRING"),
            Self::Integer => write!(f, "INTEGER"),
            Self::Float => write!(f, "FLOAT"),
            Self::Boolean => write!(f, "BOOLEAN"),
            Self::List => write!(f, "LIST"),
            Self::Temporal => write!(f, "TEMPORAL"),
            Self::Other(name) => write!(f, "{}", name.to_ascii_uppercase()),
        }
    }
}

/// Observed numeric bounds of an INTEGER/FLOAT property
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    pub min: f64,
    pub max: f64,
}

/// A property declared on a label or relationship type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    pub name: String,
    pub property_type: PropertyType,
    /// Every distinct value, present only when the sample was exhaustive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<NumericRange>,
}

impl PropertyDescriptor {
    pub fn new(name: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            name: name.into(),
            property_type,
            values: None,
            range: None,
        }
    }

    /// Attach an exhaustive value set (STRING properties)
    pub fn with_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Attach observed bounds (INTEGER/FLOAT properties)
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.range = Some(NumericRange { min, max });
        self
    }
}

/// One declared `(start)-[type]->(end)` connection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationshipTriple {
    pub start: String,
    pub rel_type: String,
    pub end: String,
}

impl RelationshipTriple {
    pub fn new(start: &str, rel_type: &str, end: &str) -> Self {
        Self {
            start: start.to_string(),
            rel_type: rel_type.to_string(),
            end: end.to_string(),
        }
    }
}

/// Which property table a lookup targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Node,
    Relationship,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node => write!(f, "Node"),
            Self::Relationship => write!(f, "Relationship"),
        }
    }
}

/// Read-only snapshot of labels, relationship types, their properties and the
/// label→type→label topology.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaModel {
    pub node_properties: BTreeMap<String, Vec<PropertyDescriptor>>,
    pub relationship_properties: BTreeMap<String, Vec<PropertyDescriptor>>,
    pub relationships: Vec<RelationshipTriple>,
}

impl SchemaModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a label with its properties, builder style
    pub fn with_node(mut self, label: &str, properties: Vec<PropertyDescriptor>) -> Self {
        self.node_properties.insert(label.to_string(), properties);
        self
    }

    /// Declare a relationship type with its properties, builder style
    pub fn with_relationship_type(
        mut self,
        rel_type: &str,
        properties: Vec<PropertyDescriptor>,
    ) -> Self {
        self.relationship_properties
            .insert(rel_type.to_string(), properties);
        self
    }

    /// Declare a `(start)-[rel_type]->(end)` connection, builder style
    pub fn with_triple(mut self, start: &str, rel_type: &str, end: &str) -> Self {
        self.relationships
            .push(RelationshipTriple::new(start, rel_type, end));
        self
    }

    fn table(&self, kind: EntityKind) -> &BTreeMap<String, Vec<PropertyDescriptor>> {
        match kind {
            EntityKind::Node => &self.node_properties,
            EntityKind::Relationship => &self.relationship_properties,
        }
    }

    /// Properties of a label or relationship type; `None` when it is unknown
    pub fn properties(&self, kind: EntityKind, label_or_type: &str) -> Option<&[PropertyDescriptor]> {
        self.table(kind).get(label_or_type).map(Vec::as_slice)
    }

    pub fn property(
        &self,
        kind: EntityKind,
        label_or_type: &str,
        name: &str,
    ) -> Option<&PropertyDescriptor> {
        self.properties(kind, label_or_type)?
            .iter()
            .find(|p| p.name == name)
    }

    /// A relationship type counts as known when it appears in the topology or
    /// carries properties.
    pub fn has_relationship_type(&self, rel_type: &str) -> bool {
        self.relationship_properties.contains_key(rel_type)
            || self.relationships.iter().any(|r| r.rel_type == rel_type)
    }

    /// Render the schema as prompt text for the language model
    pub fn to_prompt_string(&self) -> String {
        let mut out = String::from("Node properties:\n");
        render_properties(&mut out, &self.node_properties);

        out.push_str("Relationship properties:\n");
        render_properties(&mut out, &self.relationship_properties);

        out.push_str("The relationships:\n");
        for r in &self.relationships {
            out.push_str(&format!("(:{})-[:{}]->(:{})\n", r.start, r.rel_type, r.end));
        }
        out
    }
}

fn render_properties(out: &mut String, table: &BTreeMap<String, Vec<PropertyDescriptor>>) {
    for (name, properties) in table {
        out.push_str(&format!("- **{}**\n", name));
        for p in properties {
            out.push_str(&format!("  - `{}`: {}", p.name, p.property_type));
            if let Some(values) = &p.values {
                let options: Vec<String> = values.iter().map(|v| format!("'{}'", v)).collect();
                out.push_str(&format!(" Available options: [{}]", options.join(", ")));
            }
            if let Some(range) = &p.range {
                out.push_str(&format!(" Min: {}, Max: {}", range.min, range.max));
            }
            out.push('\n');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicle_schema() -> SchemaModel {
        SchemaModel::new()
            .with_node(
                "Vehicle",
                vec![
                    PropertyDescriptor::new("make", PropertyType::String)
                        .with_values(["Honda", "Acura"]),
                    PropertyDescriptor::new("year", PropertyType::Integer).with_range(2018.0, 2024.0),
                ],
            )
            .with_node("Customer", vec![PropertyDescriptor::new("name", PropertyType::String)])
            .with_relationship_type(
                "OWNS",
                vec![PropertyDescriptor::new("since", PropertyType::Temporal)],
            )
            .with_triple("Customer", "OWNS", "Vehicle")
    }

    #[test]
    fn test_from_db_type() {
        assert_eq!(PropertyType::from_db_type("String"), PropertyType::String);
        assert_eq!(PropertyType::from_db_type("Long"), PropertyType::Integer);
        assert_eq!(PropertyType::from_db_type("INTEGER"), PropertyType::Integer);
        assert_eq!(PropertyType::from_db_type("Double"), PropertyType::Float);
        assert_eq!(PropertyType::from_db_type("StringArray"), PropertyType::List);
        assert_eq!(PropertyType::from_db_type("LIST"), PropertyType::List);
        assert_eq!(PropertyType::from_db_type("Date"), PropertyType::Temporal);
        assert_eq!(
            PropertyType::from_db_type("Point"),
            PropertyType::Other("Point".into())
        );
    }

    #[test]
    fn test_property_lookup() {
        let schema = vehicle_schema();
        let make = schema.property(EntityKind::Node, "Vehicle", "make").unwrap();
        assert_eq!(make.property_type, PropertyType::String);
        assert!(make.values.as_ref().unwrap().contains("Honda"));

        assert!(schema.property(EntityKind::Node, "Vehicle", "color").is_none());
        assert!(schema.properties(EntityKind::Node, "Truck").is_none());
        assert!(schema
            .property(EntityKind::Relationship, "OWNS", "since")
            .is_some());
        assert!(schema.has_relationship_type("OWNS"));
        assert!(!schema.has_relationship_type("DRIVES"));
    }

    #[test]
    fn test_prompt_string() {
        let text = vehicle_schema().to_prompt_string();
        assert!(text.contains("- **Vehicle**"));
        assert!(text.contains("`make`: STRING Available options: ['Acura', 'Honda']"));
        assert!(text.contains("`year`: INTEGER Min: 2018, Max: 2024"));
        assert!(text.contains("- **OWNS**"));
        assert!(text.contains("(:Customer)-[:OWNS]->(:Vehicle)"));
    }
}
