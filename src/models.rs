//! Data models for the majority voter.
//!
//! This module contains the core data structures used throughout
//! the application for representing responses, vote outcomes, and reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// A response value produced by one upstream run.
///
/// Producers are heterogeneous: a bare string, a payload wrapping a nested
/// response list, or a list of either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawResponse {
    /// Plain response text.
    PlainText(String),
    /// A structured payload carrying a nested `responses` list.
    StructuredPayload { responses: Vec<RawResponse> },
    /// An ordered list of responses.
    Sequence(Vec<RawResponse>),
}

impl RawResponse {
    /// Wrap a list of strings as a structured payload.
    pub fn payload<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RawResponse::StructuredPayload {
            responses: responses
                .into_iter()
                .map(|s| RawResponse::PlainText(s.into()))
                .collect(),
        }
    }

    /// Parse free-form text input: JSON if it parses, otherwise one
    /// response per non-empty line.
    pub fn from_input_text(input: &str) -> Self {
        match serde_json::from_str::<Value>(input) {
            Ok(value) => RawResponse::from(value),
            Err(_) => RawResponse::Sequence(
                input
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(|line| RawResponse::PlainText(line.to_string()))
                    .collect(),
            ),
        }
    }

    /// Text form used for answer extraction.
    pub fn as_text(&self) -> String {
        match self {
            RawResponse::PlainText(text) => text.clone(),
            RawResponse::Sequence(items) => format!("[{}]", join_texts(items)),
            RawResponse::StructuredPayload { responses } => {
                format!("{{responses: [{}]}}", join_texts(responses))
            }
        }
    }

    /// JSON form, the inverse of `From<Value>`.
    ///
    /// Payloads serialize as `{"data": {"responses": [...]}}`.
    pub fn to_json(&self) -> Value {
        match self {
            RawResponse::PlainText(text) => Value::String(text.clone()),
            RawResponse::Sequence(items) => {
                Value::Array(items.iter().map(RawResponse::to_json).collect())
            }
            RawResponse::StructuredPayload { responses } => json!({
                "data": {
                    "responses": responses.iter().map(RawResponse::to_json).collect::<Vec<_>>()
                }
            }),
        }
    }
}

fn join_texts(items: &[RawResponse]) -> String {
    items
        .iter()
        .map(RawResponse::as_text)
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<&str> for RawResponse {
    fn from(s: &str) -> Self {
        RawResponse::PlainText(s.to_string())
    }
}

impl From<String> for RawResponse {
    fn from(s: String) -> Self {
        RawResponse::PlainText(s)
    }
}

impl<T: Into<RawResponse>> From<Vec<T>> for RawResponse {
    fn from(items: Vec<T>) -> Self {
        RawResponse::Sequence(items.into_iter().map(Into::into).collect())
    }
}

impl From<Value> for RawResponse {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => RawResponse::PlainText(s),
            Value::Array(items) => {
                RawResponse::Sequence(items.into_iter().map(RawResponse::from).collect())
            }
            Value::Object(map) => from_object(map),
            other => RawResponse::PlainText(other.to_string()),
        }
    }
}

/// Objects with a `data` mapping (or a bare top-level `responses` field)
/// become payloads; any other object is treated as opaque text.
fn from_object(mut map: Map<String, Value>) -> RawResponse {
    let data = match map.remove("data") {
        Some(Value::Object(data)) => Some(data),
        Some(other) => {
            map.insert("data".to_string(), other);
            None
        }
        None => None,
    };

    let nested = match data {
        Some(mut data) => Some(data.remove("responses")),
        None => map.remove("responses").map(Some),
    };

    match nested {
        Some(responses) => RawResponse::StructuredPayload {
            responses: match responses {
                None => Vec::new(),
                Some(Value::Array(items)) => items.into_iter().map(RawResponse::from).collect(),
                Some(other) => vec![RawResponse::from(other)],
            },
        },
        None => RawResponse::PlainText(Value::Object(map).to_string()),
    }
}

/// Occurrence count for one distinct answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCount {
    /// Answer in the casing it was first seen with.
    pub answer: String,
    /// Number of runs that produced it (case-insensitive).
    pub count: usize,
}

/// Result of a successful majority vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MajorityResult {
    /// Winning answer, in original casing.
    pub winner: String,
    /// Votes for the winner.
    pub count: usize,
    /// Total answers considered.
    pub total: usize,
    /// `floor(100 * count / total)`.
    pub confidence_percent: usize,
    /// Every extracted answer in input order, duplicates included.
    pub all_answers: Vec<String>,
    /// Distinct answers, most votes first.
    pub distribution: Vec<VoteCount>,
}

impl fmt::Display for MajorityResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (confidence: {}/{} = {}%)\nResponses: [{}]",
            self.winner,
            self.count,
            self.total,
            self.confidence_percent,
            self.all_answers.join(", ")
        )
    }
}

/// Outcome of a vote. Never an error: an empty input is a normal result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VoteOutcome {
    Majority(MajorityResult),
    NoResponses,
}

impl VoteOutcome {
    /// Returns the majority result, if there is one.
    pub fn majority(&self) -> Option<&MajorityResult> {
        match self {
            VoteOutcome::Majority(result) => Some(result),
            VoteOutcome::NoResponses => None,
        }
    }
}

impl fmt::Display for VoteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteOutcome::Majority(result) => write!(f, "{}", result),
            VoteOutcome::NoResponses => write!(f, "Error: no responses provided"),
        }
    }
}

/// Metadata about an agent voting session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// The question asked on every run.
    pub question: String,
    /// When the session started.
    pub started_at: DateTime<Utc>,
    /// Model used for the runs.
    pub model_used: String,
    /// Number of runs requested.
    pub runs: usize,
    /// Runs that ended in an error string.
    pub runs_failed: usize,
    /// Wall-clock duration in seconds.
    pub duration_seconds: f64,
}

/// Complete report of a voting session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteReport {
    pub metadata: ReportMetadata,
    /// Raw response of each run, in run order.
    pub responses: Vec<String>,
    pub outcome: VoteOutcome,
}

/// Prefix of the substitute text recorded for a failed run.
pub const RUN_ERROR_PREFIX: &str = "Error in run ";

impl VoteReport {
    /// Count the runs whose slot holds a substitute error string.
    pub fn count_failed(responses: &[String]) -> usize {
        responses
            .iter()
            .filter(|r| r.starts_with(RUN_ERROR_PREFIX))
            .count()
    }
}
