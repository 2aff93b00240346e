//! Pattern-based extraction of node/relationship constraints from Cypher text.
//!
//! This is not a Cypher grammar. Node patterns `( ... )` and relationship
//! patterns `-[ ... ]-` are located with regular expressions, and every bound
//! variable is followed through the statement to collect `var.prop <op> value`
//! filters. Anything the patterns don't recognise is ignored.

use super::task::{PropertyValue, ValidationTask};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::debug;

/// Parenthesised group not preceded by an identifier character (so function
/// calls such as `count(n)` are skipped).
static NODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\w`])\(([^()]*)\)").expect("NODE_PATTERN is valid")
});

static NODE_BODY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?P<var>[A-Za-z_]\w*|`[^`]+`)?\s*(?::\s*(?P<labels>(?:`[^`]+`|[\w&|:!\s])+?))?\s*(?P<props>\{.*\})?\s*$",
    )
    .expect("NODE_BODY is valid")
});

static REL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-\s*\[([^\[\]]*)\]\s*-").expect("REL_PATTERN is valid"));

static REL_BODY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?P<var>[A-Za-z_]\w*|`[^`]+`)?\s*(?::\s*(?P<types>(?:`[^`]+`|[\w&|:!\s])+?))?\s*(?:\*[\d.\s]*)?\s*(?P<props>\{.*\})?\s*$",
    )
    .expect("REL_BODY is valid")
});

const FILTER_OPERATORS: &str =
    r"=~|<>|<=|>=|=|<|>|(?i:\bCONTAINS\b)|(?i:\bSTARTS\s+WITH\b)|(?i:\bENDS\s+WITH\b)|(?i:\bIN\b)";
const FILTER_VALUES: &str = r#"'[^']*'|"[^"]*"|-?\d+(?:\.\d+)?|\$\w+|\[[^\]]*\]"#;

/// Validation tasks for the nodes and relationships of one statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedEntities {
    pub node_tasks: Vec<ValidationTask>,
    pub relationship_tasks: Vec<ValidationTask>,
}

/// One `( ... )` or `[ ... ]` pattern after its body was parsed
struct PatternMatch {
    variable: Option<String>,
    labels: Option<String>,
    props: Option<String>,
}

/// Extract every validation task from a statement, in order of appearance
pub fn extract_entities(statement: &str) -> ExtractedEntities {
    let nodes = find_patterns(statement, &NODE_PATTERN, &NODE_BODY, "labels");
    let rels = find_patterns(statement, &REL_PATTERN, &REL_BODY, "types");

    let entities = ExtractedEntities {
        node_tasks: build_tasks(statement, &nodes),
        relationship_tasks: build_tasks(statement, &rels),
    };
    debug!(
        node_tasks = entities.node_tasks.len(),
        relationship_tasks = entities.relationship_tasks.len(),
        "Extracted validation tasks"
    );
    entities
}

fn find_patterns(statement: &str, outer: &Regex, body: &Regex, labels_group: &str) -> Vec<PatternMatch> {
    outer
        .captures_iter(statement)
        .filter_map(|caps| {
            let inner = caps.get(1)?.as_str();
            let parsed = body.captures(inner)?;
            Some(PatternMatch {
                variable: parsed
                    .name("var")
                    .map(|m| m.as_str().trim_matches('`').to_string()),
                labels: parsed
                    .name(labels_group)
                    .map(|m| m.as_str().trim().to_string())
                    .filter(|l| !l.is_empty()),
                props: parsed.name("props").map(|m| m.as_str().to_string()),
            })
        })
        .collect()
}

fn build_tasks(statement: &str, patterns: &[PatternMatch]) -> Vec<ValidationTask> {
    // A variable bound with a label anywhere lends that label to its bare uses
    let mut bound: HashMap<&str, &str> = HashMap::new();
    for p in patterns {
        if let (Some(var), Some(labels)) = (&p.variable, &p.labels) {
            bound.entry(var.as_str()).or_insert(labels.as_str());
        }
    }

    let mut tasks = Vec::new();
    let mut scanned: Vec<&str> = Vec::new();

    for p in patterns {
        let labels = p.labels.clone().or_else(|| {
            p.variable
                .as_deref()
                .and_then(|v| bound.get(v))
                .map(|l| l.to_string())
        });

        match &p.props {
            Some(props) => {
                for (name, value) in split_inline_properties(props) {
                    tasks.push(ValidationTask::with_property(
                        labels.clone(),
                        "=",
                        &name,
                        value,
                    ));
                }
            }
            None => tasks.push(ValidationTask::bare(labels.clone())),
        }

        if let Some(var) = p.variable.as_deref() {
            if scanned.contains(&var) {
                continue;
            }
            scanned.push(var);
            tasks.extend(variable_filters(statement, var, labels.as_deref()));
        }
    }
    tasks
}

/// `var.prop <op> literal` filters anywhere in the statement
fn variable_filters(statement: &str, variable: &str, labels: Option<&str>) -> Vec<ValidationTask> {
    let pattern = format!(
        r"(?:^|[^\w.`]){}\.(?P<prop>\w+|`[^`]+`)\s*(?P<op>{})\s*(?P<value>{})",
        regex::escape(variable),
        FILTER_OPERATORS,
        FILTER_VALUES
    );
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => {
            debug!(variable, error = %e, "Skipping filters for variable");
            return Vec::new();
        }
    };

    re.captures_iter(statement)
        .map(|caps| {
            let prop = caps["prop"].trim_matches('`');
            let op = normalize_operator(&caps["op"]);
            let value = PropertyValue::parse_literal(&caps["value"]);
            ValidationTask::with_property(labels.map(str::to_string), &op, prop, value)
        })
        .collect()
}

fn normalize_operator(op: &str) -> String {
    op.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase()
}

/// Split an inline map `{k: v, ...}` into `(key, value)` pairs.
///
/// Commas and colons inside quotes or brackets don't split. Entries that don't
/// hold exactly one top-level `:` are skipped.
pub fn split_inline_properties(map: &str) -> Vec<(String, PropertyValue)> {
    let body = map.trim().trim_start_matches('{').trim_end_matches('}');

    split_top_level(body, ',')
        .into_iter()
        .filter_map(|entry| {
            let parts = split_top_level(entry, ':');
            if parts.len() != 2 {
                return None;
            }
            let key = parts[0].trim().trim_matches('`').trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), PropertyValue::parse_literal(parts[1])))
        })
        .collect()
}

fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' | '`' => quote = Some(c),
                '[' | '{' | '(' => depth += 1,
                ']' | '}' | ')' => depth = depth.saturating_sub(1),
                c if c == separator && depth == 0 => {
                    parts.push(&text[start..i]);
                    start = i + c.len_utf8();
                }
                _ => {}
            },
        }
    }
    parts.push(&text[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string(s: &str) -> Option<PropertyValue> {
        Some(PropertyValue::String(s.to_string()))
    }

    #[test]
    fn test_inline_properties_single() {
        let props = split_inline_properties(r#"{model: "Odyssey"}"#);
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].0, "model");
        assert_eq!(props[0].1, PropertyValue::String("Odyssey".into()));
    }

    #[test]
    fn test_inline_properties_multiple() {
        let props = split_inline_properties(r#"{make: "Honda", model: "Odyssey"}"#);
        assert_eq!(props.len(), 2);
        assert_eq!(props[1].0, "model");
    }

    #[test]
    fn test_inline_properties_bad_input() {
        assert!(split_inline_properties("bad input!").is_empty());
    }

    #[test]
    fn test_inline_properties_quoted_separators() {
        let props = split_inline_properties("{name: 'Smith, J', time: '12:00', tags: ['a', 'b']}");
        assert_eq!(props.len(), 3);
        assert_eq!(props[0].1, PropertyValue::String("Smith, J".into()));
        assert_eq!(props[1].1, PropertyValue::String("12:00".into()));
        assert!(matches!(props[2].1, PropertyValue::List(_)));
    }

    #[test]
    fn test_extract_simple_statement() {
        let entities = extract_entities(
            "match (n:Node)-[r:RELATIONSHIP {id: 1}]->(m {id:'001'}) return n, r, m limit 5",
        );

        assert_eq!(entities.node_tasks.len(), 2);
        assert_eq!(entities.node_tasks[0], ValidationTask::bare(Some("Node".into())));
        assert_eq!(entities.node_tasks[1].labels_or_types, None);
        assert_eq!(entities.node_tasks[1].property_name.as_deref(), Some("id"));
        assert_eq!(entities.node_tasks[1].property_value, string("001"));
        assert_eq!(entities.node_tasks[1].operator.as_deref(), Some("="));

        assert_eq!(entities.relationship_tasks.len(), 1);
        let rel = &entities.relationship_tasks[0];
        assert_eq!(rel.labels_or_types.as_deref(), Some("RELATIONSHIP"));
        assert_eq!(rel.property_name.as_deref(), Some("id"));
        assert_eq!(rel.property_value, Some(PropertyValue::Integer(1)));
    }

    #[test]
    fn test_extract_filters_and_subqueries() {
        let statement = r#"
MATCH (v:Verbatim {make: "Honda", model: "Odyssey"})
WHERE v.verbatimText CONTAINS "cup holder"
WITH SUM(COUNT {MATCH (v:Verbatim) WHERE v.gender = "Male" RETURN v}) AS males
RETURN males, toFloat(males) / (CASE WHEN males = 0 THEN 1 ELSE males END) AS ratio
"#;
        let tasks = extract_entities(statement).node_tasks;

        let described: Vec<(Option<&str>, Option<&str>, Option<&str>)> = tasks
            .iter()
            .map(|t| {
                (
                    t.labels_or_types.as_deref(),
                    t.property_name.as_deref(),
                    t.operator.as_deref(),
                )
            })
            .collect();

        assert_eq!(
            described,
            vec![
                (Some("Verbatim"), Some("make"), Some("=")),
                (Some("Verbatim"), Some("model"), Some("=")),
                (Some("Verbatim"), Some("verbatimText"), Some("CONTAINS")),
                (Some("Verbatim"), Some("gender"), Some("=")),
                (Some("Verbatim"), None, None),
            ]
        );
        assert_eq!(tasks[3].property_value, string("Male"));
    }

    #[test]
    fn test_function_calls_are_not_nodes() {
        let entities = extract_entities("MATCH (v:Vehicle) RETURN count(v) AS total");
        assert_eq!(entities.node_tasks, vec![ValidationTask::bare(Some("Vehicle".into()))]);
    }

    #[test]
    fn test_unlabeled_variable_inherits_label() {
        let entities =
            extract_entities("MATCH (c:Customer)-[:OWNS]->(v) MATCH (v:Vehicle) WHERE v.year >= 2020 RETURN c");
        let tasks = entities.node_tasks;

        assert_eq!(tasks[0].labels_or_types.as_deref(), Some("Customer"));
        assert_eq!(tasks[1].labels_or_types.as_deref(), Some("Vehicle"));
        let year = tasks
            .iter()
            .find(|t| t.property_name.as_deref() == Some("year"))
            .unwrap();
        assert_eq!(year.labels_or_types.as_deref(), Some("Vehicle"));
        assert_eq!(year.operator.as_deref(), Some(">="));
        assert_eq!(year.property_value, Some(PropertyValue::Integer(2020)));
    }

    #[test]
    fn test_label_expressions_and_backticks() {
        let entities = extract_entities("MATCH (n:NodeA&NodeB {`first name`: 'a'}) RETURN n");
        let task = &entities.node_tasks[0];
        assert_eq!(task.labels_or_types.as_deref(), Some("NodeA&NodeB"));
        assert_eq!(task.property_name.as_deref(), Some("first name"));
    }

    #[test]
    fn test_parameters_and_lists() {
        let entities = extract_entities(
            "MATCH (v:Vehicle) WHERE v.make = $make AND v.model IN ['Civic', 'Accord'] RETURN v",
        );
        let tasks = entities.node_tasks;
        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[1].property_value, Some(PropertyValue::Parameter("make".into())));
        assert_eq!(tasks[2].operator.as_deref(), Some("IN"));
        assert!(matches!(tasks[2].property_value, Some(PropertyValue::List(_))));
    }

    #[test]
    fn test_relationship_variants() {
        let entities = extract_entities(
            "MATCH (a)<-[r:KNOWS|LIKES]-(b)-[:FOLLOWS*1..3]->(c)-[]-(d) WHERE r.since > 2001 RETURN a",
        );
        let rels = entities.relationship_tasks;
        assert_eq!(rels[0], ValidationTask::bare(Some("KNOWS|LIKES".into())));
        assert_eq!(rels[1].property_name.as_deref(), Some("since"));
        assert_eq!(rels[2], ValidationTask::bare(Some("FOLLOWS".into())));
        assert_eq!(rels[3], ValidationTask::bare(None));
        assert_eq!(rels.len(), 4);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let statement = "MATCH (c:Customer {name: 'Ann'})-[o:OWNS]->(v:Vehicle) WHERE v.make = 'Honda' RETURN c";
        assert_eq!(extract_entities(statement), extract_entities(statement));
    }
}
