//! Prompt construction and model-output cleanup

use crate::retriever::CypherExample;
use crate::schema::SchemaModel;
use regex::Regex;
use std::fmt::Write;
use std::sync::LazyLock;

static CYPHER_CODE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:cypher|Cypher|CYPHER)?\s*(.*?)\s*```").expect("CYPHER_CODE_BLOCK pattern is valid")
});

pub fn generation_prompt(schema: &SchemaModel, examples: &[CypherExample], question: &str) -> String {
    let mut prompt = String::from(
        "Generate a Cypher statement that answers the question, using only the \
         labels, relationship types and properties of this graph schema.\n\
         Return the statement only, without explanation.\n\n",
    );
    let _ = write!(prompt, "Schema:\n{}\n", schema.to_prompt_string());

    if !examples.is_empty() {
        prompt.push_str("Examples:\n");
        for e in examples {
            let _ = writeln!(prompt, "Question: {}\nCypher: {}\n", e.question, e.statement);
        }
    }
    let _ = write!(prompt, "Question: {}\nCypher:", question);
    prompt
}

pub fn correction_prompt(
    schema: &SchemaModel,
    question: &str,
    statement: &str,
    errors: &[String],
) -> String {
    let mut prompt = String::from(
        "Correct the Cypher statement so that it answers the question and fixes \
         every listed error. Use only the given graph schema.\n\
         Return the corrected statement only, without explanation.\n\n",
    );
    let _ = write!(prompt, "Schema:\n{}\n", schema.to_prompt_string());
    let _ = write!(prompt, "Question: {}\n\nStatement:\n{}\n\nErrors:\n", question, statement);
    for e in errors {
        let _ = writeln!(prompt, "- {}", e);
    }
    prompt.push_str("\nCorrected Cypher:");
    prompt
}

pub fn validation_prompt(question: &str, schema: &SchemaModel, statement: &str) -> String {
    let mut prompt = String::from(
        "Check the Cypher statement against the question and the graph schema. \
         Report problems such as labels, relationship types or properties that \
         do not exist, wrong relationship directions, or a statement that does \
         not answer the question. Also list every literal value the statement \
         filters nodes on.\n\
         Reply with JSON: {\"errors\": [string], \"filters\": [{\"node_label\": \
         string, \"property_key\": string, \"property_value\": string}]}\n\n",
    );
    let _ = write!(
        prompt,
        "Schema:\n{}\nQuestion: {}\n\nStatement:\n{}\n",
        schema.to_prompt_string(),
        question,
        statement
    );
    prompt
}

/// Strip markdown code fences from a model reply; the first fenced block wins
pub fn extract_cypher(text: &str) -> String {
    CYPHER_CODE_BLOCK
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text)
        .trim()
        .to_string()
}
