//! Answer extraction and plurality voting.

use crate::models::{MajorityResult, RawResponse, VoteCount, VoteOutcome};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

// Signed integer or decimal, e.g. `-3.5`, `42`.
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?\d+(?:\.\d+)?").unwrap());

/// Reduce a response to its comparable answer token.
///
/// Takes the last signed number in the text; falls back to the trimmed
/// text when there is none.
pub fn extract_answer(text: &str) -> String {
    match NUMBER_RE.find_iter(text).last() {
        Some(m) => m.as_str().to_string(),
        None => text.trim().to_string(),
    }
}

/// Flatten the accepted input shapes into the ordered list of responses
/// that get a vote.
pub fn normalize(responses: RawResponse) -> Vec<RawResponse> {
    let unwrapped = match responses {
        RawResponse::Sequence(mut items) if items.len() == 1 => items.remove(0),
        other => other,
    };

    match unwrapped {
        RawResponse::StructuredPayload { responses } => responses,
        RawResponse::Sequence(items) => items,
        single => vec![single],
    }
}

/// Case-insensitive tally that remembers first-seen order.
#[derive(Debug, Default)]
struct Tally {
    index: HashMap<String, usize>,
    entries: Vec<TallyEntry>,
}

#[derive(Debug)]
struct TallyEntry {
    key: String,
    first_answer: String,
    count: usize,
}

impl Tally {
    fn add(&mut self, answer: &str) {
        let key = answer.to_lowercase();
        match self.index.get(&key) {
            Some(&i) => self.entries[i].count += 1,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push(TallyEntry {
                    key,
                    first_answer: answer.to_string(),
                    count: 1,
                });
            }
        }
    }

    /// Highest count; ties go to the earliest-seen key.
    fn most_common(&self) -> Option<&TallyEntry> {
        self.entries.iter().fold(None, |best: Option<&TallyEntry>, entry| match best {
            Some(b) if b.count >= entry.count => Some(b),
            _ => Some(entry),
        })
    }

    fn distribution(&self) -> Vec<VoteCount> {
        let mut counts: Vec<VoteCount> = self
            .entries
            .iter()
            .map(|e| VoteCount {
                answer: e.first_answer.clone(),
                count: e.count,
            })
            .collect();
        // Stable sort keeps first-seen order among equal counts.
        counts.sort_by(|a, b| b.count.cmp(&a.count));
        counts
    }
}

/// Pick the plurality answer from a set of responses.
pub fn compute_majority(responses: RawResponse) -> VoteOutcome {
    let answers: Vec<String> = normalize(responses)
        .iter()
        .map(|r| extract_answer(&r.as_text()))
        .collect();

    if answers.is_empty() {
        debug!("No responses to vote on");
        return VoteOutcome::NoResponses;
    }

    let mut tally = Tally::default();
    for answer in &answers {
        tally.add(answer);
    }

    let Some(top) = tally.most_common() else {
        return VoteOutcome::NoResponses;
    };

    let winner = answers
        .iter()
        .find(|a| a.to_lowercase() == top.key)
        .unwrap_or(&answers[0])
        .clone();

    let total = answers.len();
    let count = top.count;
    debug!("Winner {} with {}/{} votes", winner, count, total);

    VoteOutcome::Majority(MajorityResult {
        winner,
        count,
        total,
        confidence_percent: (100 * count) / total,
        distribution: tally.distribution(),
        all_answers: answers,
    })
}
