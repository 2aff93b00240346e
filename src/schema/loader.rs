//! Schema introspection against a live graph database
//!
//! Builds a [`SchemaModel`] from Neo4j's built-in schema procedures, then
//! samples STRING properties for exhaustive value sets and INTEGER/FLOAT
//! properties for their observed bounds.

use super::models::{EntityKind, NumericRange, PropertyDescriptor, PropertyType, RelationshipTriple, SchemaModel};
use crate::error::{Result, Text2CypherError};
use crate::neo4j::{escape_identifier, GraphStore, QueryParams, Record};
use anyhow::Context;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

const NODE_PROPERTIES_QUERY: &str = "CALL db.schema.nodeTypeProperties() \
     YIELD nodeLabels, propertyName, propertyTypes \
     RETURN nodeLabels, propertyName, propertyTypes";

const REL_PROPERTIES_QUERY: &str = "CALL db.schema.relTypeProperties() \
     YIELD relType, propertyName, propertyTypes \
     RETURN relType, propertyName, propertyTypes";

const TOPOLOGY_QUERY: &str = "MATCH (a)-[r]->(b) \
     UNWIND labels(a) AS start UNWIND labels(b) AS end \
     RETURN DISTINCT start, type(r) AS type, end";

/// Knobs for value sampling during introspection
#[derive(Debug, Clone)]
pub struct SchemaOptions {
    /// A STRING property is enumerated only when it has at most this many
    /// distinct values.
    pub enum_value_limit: usize,
    /// Sample values and ranges at all. Disabling skips the per-property
    /// queries on large databases.
    pub sample_values: bool,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            enum_value_limit: 10,
            sample_values: true,
        }
    }
}

/// Introspect the database behind `graph`.
///
/// Any failure is reported as [`Text2CypherError::SchemaUnavailable`]; callers
/// must not validate without a schema.
pub async fn load_schema(graph: &dyn GraphStore, options: &SchemaOptions) -> Result<SchemaModel> {
    load(graph, options)
        .await
        .map_err(Text2CypherError::SchemaUnavailable)
}

async fn load(graph: &dyn GraphStore, options: &SchemaOptions) -> anyhow::Result<SchemaModel> {
    let empty = QueryParams::new();

    let node_rows = graph
        .query(NODE_PROPERTIES_QUERY, &empty)
        .await
        .context("Failed to list node properties")?;
    let rel_rows = graph
        .query(REL_PROPERTIES_QUERY, &empty)
        .await
        .context("Failed to list relationship properties")?;
    let topology_rows = graph
        .query(TOPOLOGY_QUERY, &empty)
        .await
        .context("Failed to list relationship topology")?;

    let mut schema = SchemaModel {
        node_properties: collect_node_properties(&node_rows),
        relationship_properties: collect_relationship_properties(&rel_rows),
        relationships: collect_topology(&topology_rows),
    };

    if options.sample_values {
        sample_table(graph, EntityKind::Node, &mut schema.node_properties, options).await?;
        sample_table(
            graph,
            EntityKind::Relationship,
            &mut schema.relationship_properties,
            options,
        )
        .await?;
    }

    info!(
        labels = schema.node_properties.len(),
        relationship_types = schema.relationship_properties.len(),
        triples = schema.relationships.len(),
        "Loaded graph schema"
    );

    Ok(schema)
}

fn collect_node_properties(rows: &[Record]) -> BTreeMap<String, Vec<PropertyDescriptor>> {
    let mut table: BTreeMap<String, Vec<PropertyDescriptor>> = BTreeMap::new();
    for row in rows {
        let labels = string_list(row.get("nodeLabels"));
        let property = row.get("propertyName").and_then(Value::as_str);
        let types = string_list(row.get("propertyTypes"));
        for label in labels {
            let entry = table.entry(label).or_default();
            if let Some(name) = property {
                push_property(entry, name, &types);
            }
        }
    }
    table
}

fn collect_relationship_properties(rows: &[Record]) -> BTreeMap<String, Vec<PropertyDescriptor>> {
    let mut table: BTreeMap<String, Vec<PropertyDescriptor>> = BTreeMap::new();
    for row in rows {
        let Some(raw_type) = row.get("relType").and_then(Value::as_str) else {
            continue;
        };
        // Reported as ":`TYPE`"
        let rel_type = raw_type.trim_start_matches(':').trim_matches('`').to_string();
        let entry = table.entry(rel_type).or_default();
        if let Some(name) = row.get("propertyName").and_then(Value::as_str) {
            push_property(entry, name, &string_list(row.get("propertyTypes")));
        }
    }
    table
}

fn collect_topology(rows: &[Record]) -> Vec<RelationshipTriple> {
    let triples: BTreeSet<RelationshipTriple> = rows
        .iter()
        .filter_map(|row| {
            Some(RelationshipTriple::new(
                row.get("start")?.as_str()?,
                row.get("type")?.as_str()?,
                row.get("end")?.as_str()?,
            ))
        })
        .collect();
    triples.into_iter().collect()
}

fn push_property(entry: &mut Vec<PropertyDescriptor>, name: &str, types: &[String]) {
    if entry.iter().any(|p| p.name == name) {
        return;
    }
    let distinct: BTreeSet<PropertyType> = types.iter().map(|t| PropertyType::from_db_type(t)).collect();
    let property_type = match distinct.len() {
        1 => distinct.into_iter().next().unwrap_or(PropertyType::Other(String::new())),
        _ => PropertyType::Other(types.join("|")),
    };
    entry.push(PropertyDescriptor::new(name, property_type));
}

async fn sample_table(
    graph: &dyn GraphStore,
    kind: EntityKind,
    table: &mut BTreeMap<String, Vec<PropertyDescriptor>>,
    options: &SchemaOptions,
) -> anyhow::Result<()> {
    for (label_or_type, properties) in table.iter_mut() {
        let pattern = match kind {
            EntityKind::Node => format!("(n:{})", escape_identifier(label_or_type)),
            EntityKind::Relationship => format!("()-[n:{}]->()", escape_identifier(label_or_type)),
        };
        for property in properties.iter_mut() {
            let key = escape_identifier(&property.name);
            match property.property_type {
                PropertyType::String => {
                    property.values = sample_values(graph, &pattern, &key, options.enum_value_limit)
                        .await
                        .with_context(|| {
                            format!("Failed to sample values of {}.{}", label_or_type, property.name)
                        })?;
                }
                PropertyType::Integer | PropertyType::Float => {
                    property.range = sample_range(graph, &pattern, &key).await.with_context(|| {
                        format!("Failed to sample range of {}.{}", label_or_type, property.name)
                    })?;
                }
                _ => {}
            }
        }
    }
    Ok(())
}

/// Distinct values of a STRING property, or `None` when there are more than
/// `limit` of them.
async fn sample_values(
    graph: &dyn GraphStore,
    pattern: &str,
    key: &str,
    limit: usize,
) -> anyhow::Result<Option<BTreeSet<String>>> {
    let statement = format!(
        "MATCH {pattern} WHERE n.{key} IS NOT NULL \
         WITH DISTINCT toString(n.{key}) AS value LIMIT $limit \
         RETURN collect(value) AS values"
    );
    let params = QueryParams::new().with("limit", limit as i64 + 1);
    let rows = graph.query(&statement, &params).await?;

    let values: BTreeSet<String> = rows
        .first()
        .map(|row| string_list(row.get("values")))
        .unwrap_or_default()
        .into_iter()
        .collect();

    if values.len() > limit {
        debug!(pattern, key, "Too many distinct values to enumerate");
        return Ok(None);
    }
    Ok(Some(values))
}

async fn sample_range(
    graph: &dyn GraphStore,
    pattern: &str,
    key: &str,
) -> anyhow::Result<Option<NumericRange>> {
    let statement = format!(
        "MATCH {pattern} WHERE n.{key} IS NOT NULL \
         RETURN min(n.{key}) AS min, max(n.{key}) AS max"
    );
    let rows = graph.query(&statement, &QueryParams::new()).await?;
    let range = rows.first().and_then(|row| {
        Some(NumericRange {
            min: row.get("min")?.as_f64()?,
            max: row.get("max")?.as_f64()?,
        })
    });
    Ok(range)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}
