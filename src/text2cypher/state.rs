//! Typed state carried through one generate/validate/correct/execute run

use crate::neo4j::Record;
use crate::validation::RangeBoundary;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Value};
use std::fmt;

/// Loop tuning for a single run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Text2CypherConfig {
    /// Validation passes allowed before giving up (at least 1)
    pub max_attempts: usize,
    /// Use the language model for semantic validation instead of the static
    /// schema checks
    pub llm_validation: bool,
    /// Execute on the last attempt even with outstanding errors. Dangerous: the
    /// statement has not passed validation.
    pub allow_execute_on_final_attempt: bool,
    pub range_boundary: RangeBoundary,
}

impl Default for Text2CypherConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            llm_validation: true,
            allow_execute_on_final_attempt: false,
            range_boundary: RangeBoundary::Exclusive,
        }
    }
}

/// Where the loop goes after a validation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    Correct,
    Execute,
    End,
}

/// Trace entry for every stage that ran
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    GenerateCypher,
    ValidateCypher,
    CorrectCypher,
    ExecuteCypher,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GenerateCypher => "generate_cypher",
            Self::ValidateCypher => "validate_cypher",
            Self::CorrectCypher => "correct_cypher",
            Self::ExecuteCypher => "execute_cypher",
        };
        write!(f, "{}", name)
    }
}

/// Rows returned by execution, or the no-results sentinel
#[derive(Debug, Clone, PartialEq)]
pub enum Records {
    Rows(Vec<Record>),
    NoResults,
}

impl Records {
    pub const NO_RESULTS_MESSAGE: &'static str =
        "I couldn't find any relevant information in the database.";

    /// Empty result sets become the sentinel
    pub fn from_rows(rows: Vec<Record>) -> Self {
        if rows.is_empty() {
            Self::NoResults
        } else {
            Self::Rows(rows)
        }
    }

    pub fn rows(&self) -> &[Record] {
        match self {
            Self::Rows(rows) => rows,
            Self::NoResults => &[],
        }
    }

    pub fn is_no_results(&self) -> bool {
        matches!(self, Self::NoResults)
    }

    /// Renderable form: the rows, or `[{"error": "..."}]` for the sentinel
    pub fn to_value(&self) -> Value {
        match self {
            Self::Rows(rows) => Value::Array(rows.iter().cloned().map(Value::Object).collect()),
            Self::NoResults => json!([{ "error": Self::NO_RESULTS_MESSAGE }]),
        }
    }
}

impl Serialize for Records {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Terminal state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Executed,
    GaveUp,
}

/// Working state of one run. `attempts` grows by exactly one per validation
/// pass.
#[derive(Debug, Clone, PartialEq)]
pub struct CypherState {
    pub question: String,
    pub statement: String,
    pub errors: Vec<String>,
    pub records: Option<Records>,
    pub attempts: usize,
    pub next_action: NextAction,
    pub steps: Vec<Step>,
}

impl CypherState {
    pub fn new(question: &str) -> Self {
        Self {
            question: question.to_string(),
            statement: String::new(),
            errors: Vec::new(),
            records: None,
            attempts: 0,
            next_action: NextAction::End,
            steps: Vec::new(),
        }
    }

    pub fn into_output(self, outcome: Outcome) -> Text2CypherOutput {
        Text2CypherOutput {
            question: self.question,
            statement: self.statement,
            records: self.records,
            errors: self.errors,
            attempts: self.attempts,
            outcome,
            steps: self.steps,
        }
    }
}

/// Result of a run, as handed back to the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Text2CypherOutput {
    pub question: String,
    pub statement: String,
    /// `None` when the run gave up without executing
    pub records: Option<Records>,
    /// Errors of the last validation pass
    pub errors: Vec<String>,
    pub attempts: usize,
    pub outcome: Outcome,
    pub steps: Vec<Step>,
}

/// Transition after a validation pass.
///
/// While attempts remain, errors lead to correction and a clean statement
/// executes. Once the limit is reached the run ends, unless
/// `allow_execute_on_final_attempt` forces execution regardless of errors.
pub fn decide(has_errors: bool, attempts: usize, config: &Text2CypherConfig) -> NextAction {
    let max_attempts = config.max_attempts.max(1);
    if attempts < max_attempts {
        if has_errors {
            NextAction::Correct
        } else {
            NextAction::Execute
        }
    } else if config.allow_execute_on_final_attempt {
        NextAction::Execute
    } else {
        NextAction::End
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neo4j::mock::record;

    fn config(allow: bool) -> Text2CypherConfig {
        Text2CypherConfig {
            allow_execute_on_final_attempt: allow,
            ..Text2CypherConfig::default()
        }
    }

    #[test]
    fn test_decide_table() {
        let strict = config(false);
        assert_eq!(decide(false, 1, &strict), NextAction::Execute);
        assert_eq!(decide(true, 1, &strict), NextAction::Correct);
        assert_eq!(decide(true, 2, &strict), NextAction::Correct);
        assert_eq!(decide(false, 2, &strict), NextAction::Execute);
        assert_eq!(decide(true, 3, &strict), NextAction::End);

        let forced = config(true);
        assert_eq!(decide(true, 2, &forced), NextAction::Correct);
        assert_eq!(decide(true, 3, &forced), NextAction::Execute);
        assert_eq!(decide(false, 3, &forced), NextAction::Execute);
    }

    #[test]
    fn test_clean_statement_on_final_attempt_ends() {
        assert_eq!(decide(false, 3, &Text2CypherConfig::default()), NextAction::End);
        assert_eq!(decide(false, 4, &config(false)), NextAction::End);
    }

    #[test]
    fn test_zero_max_attempts_behaves_like_one() {
        let cfg = Text2CypherConfig {
            max_attempts: 0,
            ..config(false)
        };
        assert_eq!(decide(true, 1, &cfg), NextAction::End);
        assert_eq!(decide(false, 1, &cfg), NextAction::End);

        let forced = Text2CypherConfig {
            max_attempts: 0,
            ..config(true)
        };
        assert_eq!(decide(true, 1, &forced), NextAction::Execute);
    }

    #[test]
    fn test_records_sentinel() {
        let empty = Records::from_rows(Vec::new());
        assert!(empty.is_no_results());
        assert!(empty.rows().is_empty());
        assert_eq!(
            serde_json::to_value(&empty).unwrap(),
            json!([{"error": "I couldn't find any relevant information in the database."}])
        );

        let rows = Records::from_rows(vec![record([("count(v)", json!(42))])]);
        assert_eq!(rows.rows().len(), 1);
        assert_eq!(serde_json::to_value(&rows).unwrap(), json!([{"count(v)": 42}]));
    }

    #[test]
    fn test_output_serialization() {
        let mut state = CypherState::new("How many?");
        state.statement = "MATCH (n) RETURN count(n)".into();
        state.attempts = 1;
        state.steps = vec![Step::GenerateCypher, Step::ValidateCypher];
        let value = serde_json::to_value(state.into_output(Outcome::GaveUp)).unwrap();

        assert_eq!(value["outcome"], "GAVE_UP");
        assert_eq!(value["records"], Value::Null);
        assert_eq!(value["steps"], json!(["generate_cypher", "validate_cypher"]));
    }

    #[test]
    fn test_config_defaults_from_partial_yaml() {
        let cfg: Text2CypherConfig = serde_yaml::from_str("max_attempts: 5").unwrap();
        assert_eq!(cfg.max_attempts, 5);
        assert!(cfg.llm_validation);
        assert!(!cfg.allow_execute_on_final_attempt);
        assert_eq!(cfg.range_boundary, RangeBoundary::Exclusive);
    }
}
