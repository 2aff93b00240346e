//! Relationship-direction correction.
//!
//! Walks every `(node)-[rel]-(node)` hop, resolves the labels on each side
//! (directly or through the node variable) and compares the hop with the
//! schema's declared `(start)-[type]->(end)` triples. A hop that only fits when
//! reversed gets its arrow flipped. Untyped, variable-length and unknown-type
//! relationships are never touched.

use crate::schema::SchemaModel;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::debug;

static NODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\w`])(\(([^()]*)\))").expect("NODE pattern is valid")
});

static NODE_PARTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<var>[A-Za-z_]\w*|`[^`]+`)?\s*(?::(?P<labels>[^{]*))?").expect("NODE_PARTS pattern is valid")
});

/// The whole text between two adjacent node patterns must be one hop
static HOP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<left><?)-\s*(?:\[(?P<body>[^\[\]]*)\])?\s*-(?P<right>>?)\s*$")
        .expect("HOP pattern is valid")
});

static REL_TYPES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[A-Za-z_]\w*|`[^`]+`)?\s*:(?P<types>[^{*]*)").expect("REL_TYPES pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Outgoing,
    Incoming,
    Undirected,
}

/// Corrected statement plus the hops that fit no declared triple
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectionCorrection {
    pub statement: String,
    /// `(:Start)-[:TYPE]->(:End)` renderings of the offending hops
    pub mismatches: Vec<String>,
}

impl DirectionCorrection {
    pub fn fits_schema(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Rewrites relationship arrows so each typed hop matches the topology
pub struct DirectionCorrector<'a> {
    schema: &'a SchemaModel,
}

/// One textual edit, applied back to front
struct Edit {
    start: usize,
    end: usize,
    replacement: &'static str,
}

struct NodeMatch {
    start: usize,
    end: usize,
    labels: Vec<String>,
    variable: Option<String>,
}

impl<'a> DirectionCorrector<'a> {
    pub fn new(schema: &'a SchemaModel) -> Self {
        Self { schema }
    }

    pub fn correct(&self, statement: &str) -> DirectionCorrection {
        let nodes = find_nodes(statement);

        let mut bound: HashMap<&str, &[String]> = HashMap::new();
        for n in &nodes {
            if let Some(var) = &n.variable {
                if !n.labels.is_empty() {
                    bound.entry(var.as_str()).or_insert(n.labels.as_slice());
                }
            }
        }
        let labels_of = |n: &NodeMatch| -> Vec<String> {
            if !n.labels.is_empty() {
                return n.labels.clone();
            }
            n.variable
                .as_deref()
                .and_then(|v| bound.get(v))
                .map(|l| l.to_vec())
                .unwrap_or_default()
        };

        let mut edits = Vec::new();
        let mut mismatches = Vec::new();

        for pair in nodes.windows(2) {
            let (left, right) = (&pair[0], &pair[1]);
            let Some(hop) = HOP.captures(&statement[left.end..right.start]) else {
                continue;
            };
            let Some(types) = self.hop_types(&hop) else {
                continue;
            };

            let from = labels_of(left);
            let to = labels_of(right);
            let offset = left.end;

            match direction(&hop) {
                Direction::Outgoing => {
                    if self.fits(&from, &types, &to) {
                        continue;
                    }
                    if self.fits(&to, &types, &from) {
                        debug!(types = ?types, "Flipping outgoing relationship");
                        if let Some(l) = hop.name("left") {
                            edits.push(Edit {
                                start: offset + l.start(),
                                end: offset + l.end(),
                                replacement: "<",
                            });
                        }
                        if let Some(r) = hop.name("right") {
                            edits.push(Edit {
                                start: offset + r.start(),
                                end: offset + r.end(),
                                replacement: "",
                            });
                        }
                    } else {
                        mismatches.push(describe(&from, &types, &to));
                    }
                }
                Direction::Incoming => {
                    if self.fits(&to, &types, &from) {
                        continue;
                    }
                    if self.fits(&from, &types, &to) {
                        debug!(types = ?types, "Flipping incoming relationship");
                        if let Some(l) = hop.name("left") {
                            edits.push(Edit {
                                start: offset + l.start(),
                                end: offset + l.end(),
                                replacement: "",
                            });
                        }
                        if let Some(r) = hop.name("right") {
                            edits.push(Edit {
                                start: offset + r.start(),
                                end: offset + r.end(),
                                replacement: ">",
                            });
                        }
                    } else {
                        mismatches.push(describe(&to, &types, &from));
                    }
                }
                Direction::Undirected => {
                    if !self.fits(&from, &types, &to) && !self.fits(&to, &types, &from) {
                        mismatches.push(describe(&from, &types, &to));
                    }
                }
            }
        }

        let mut corrected = statement.to_string();
        edits.sort_by(|a, b| b.start.cmp(&a.start));
        for e in edits {
            corrected.replace_range(e.start..e.end, e.replacement);
        }

        if corrected != statement {
            debug!(statement = %corrected, "Corrected relationship directions");
        }
        DirectionCorrection {
            statement: corrected,
            mismatches,
        }
    }

    /// Relationship types of a hop worth checking: `None` for untyped,
    /// variable-length or unknown-type relationships.
    fn hop_types(&self, hop: &Captures<'_>) -> Option<Vec<String>> {
        let body = hop.name("body")?.as_str();
        if body.contains('*') {
            return None;
        }
        let raw = REL_TYPES.captures(body)?.name("types")?.as_str();
        let types: Vec<String> = raw
            .split('|')
            .map(|t| t.trim().trim_start_matches(':').trim_matches('`').to_string())
            .filter(|t| !t.is_empty() && !t.starts_with('!'))
            .collect();

        if types.is_empty() || !types.iter().all(|t| self.schema.has_relationship_type(t)) {
            return None;
        }
        Some(types)
    }

    /// Whether some declared triple joins `from` to `to` with one of `types`.
    /// Empty label lists match any label.
    fn fits(&self, from: &[String], types: &[String], to: &[String]) -> bool {
        self.schema.relationships.iter().any(|t| {
            types.contains(&t.rel_type)
                && (from.is_empty() || from.contains(&t.start))
                && (to.is_empty() || to.contains(&t.end))
        })
    }
}

/// Best-effort correction; see [`DirectionCorrector::correct`]
pub fn correct_directions(statement: &str, schema: &SchemaModel) -> String {
    DirectionCorrector::new(schema).correct(statement).statement
}

fn find_nodes(statement: &str) -> Vec<NodeMatch> {
    NODE.captures_iter(statement)
        .filter_map(|caps| {
            let whole = caps.get(1)?;
            let parts = NODE_PARTS.captures(caps.get(2)?.as_str())?;
            Some(NodeMatch {
                start: whole.start(),
                end: whole.end(),
                variable: parts
                    .name("var")
                    .map(|v| v.as_str().trim_matches('`').to_string()),
                labels: parts
                    .name("labels")
                    .map(|l| split_labels(l.as_str()))
                    .unwrap_or_default(),
            })
        })
        .collect()
}

fn split_labels(raw: &str) -> Vec<String> {
    raw.split([':', '&', '|'])
        .map(|l| l.trim().trim_matches('`').to_string())
        .filter(|l| !l.is_empty() && !l.starts_with('!'))
        .collect()
}

fn direction(hop: &Captures<'_>) -> Direction {
    let incoming = hop.name("left").is_some_and(|m| !m.as_str().is_empty());
    let outgoing = hop.name("right").is_some_and(|m| !m.as_str().is_empty());
    match (incoming, outgoing) {
        (false, true) => Direction::Outgoing,
        (true, false) => Direction::Incoming,
        _ => Direction::Undirected,
    }
}

fn describe(from: &[String], types: &[String], to: &[String]) -> String {
    format!("(:{})-[:{}]->(:{})", from.join(":"), types.join("|"), to.join(":"))
}
