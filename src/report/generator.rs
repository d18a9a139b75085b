//! Report generation.
//!
//! This module renders vote outcomes and full voting sessions as Markdown
//! or JSON.

use crate::models::{ReportMetadata, VoteOutcome, VoteReport};
use anyhow::Result;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &VoteReport) -> String {
    let mut output = String::new();

    output.push_str("# Majority Vote Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_outcome_section(&report.outcome));
    output.push_str(&generate_responses_section(&report.responses));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Question:** {}\n", metadata.question));
    section.push_str(&format!(
        "- **Started:** {}\n",
        metadata.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Model Used:** `{}`\n", metadata.model_used));
    section.push_str(&format!("- **Runs:** {}\n", metadata.runs));
    if metadata.runs_failed > 0 {
        section.push_str(&format!("- **Runs Failed:** {}\n", metadata.runs_failed));
    }
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the outcome section: winner, confidence and vote table.
pub fn generate_outcome_section(outcome: &VoteOutcome) -> String {
    let mut section = String::new();

    section.push_str("## Majority Answer\n\n");

    let Some(result) = outcome.majority() else {
        section.push_str(&format!("{}\n\n", outcome));
        return section;
    };

    section.push_str(&format!("**{}**\n\n", result.winner));
    section.push_str(&format!(
        "Confidence: {}/{} = {}%\n\n",
        result.count, result.total, result.confidence_percent
    ));

    section.push_str("| Answer | Votes |\n");
    section.push_str("|--------|-------|\n");
    for vote in &result.distribution {
        section.push_str(&format!("| {} | {} |\n", escape_cell(&vote.answer), vote.count));
    }
    section.push('\n');

    section
}

/// Generate the per-run responses section.
fn generate_responses_section(responses: &[String]) -> String {
    let mut section = String::new();

    section.push_str("## Responses\n\n");
    if responses.is_empty() {
        section.push_str("*No responses were collected.*\n\n");
        return section;
    }

    for (i, response) in responses.iter().enumerate() {
        section.push_str(&format!("### Run {}\n\n", i + 1));
        section.push_str(&format!("```\n{}\n```\n\n", response));
    }

    section
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

fn generate_footer() -> String {
    "---\n\n*Report generated by ensemble-vote*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report(report: &VoteReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Generate JSON for a bare vote outcome.
pub fn generate_outcome_json(outcome: &VoteOutcome) -> Result<String> {
    serde_json::to_string_pretty(outcome).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawResponse;
    use crate::voting::compute_majority;
    use chrono::Utc;

    fn create_test_report() -> VoteReport {
        let responses = vec![
            "The answer is 4".to_string(),
            "Error in run 2: request timed out after 30s".to_string(),
            "4".to_string(),
        ];
        let outcome = compute_majority(RawResponse::payload(responses.clone()));

        VoteReport {
            metadata: ReportMetadata {
                question: "What is 2+2?".to_string(),
                started_at: Utc::now(),
                model_used: "test-model".to_string(),
                runs: 3,
                runs_failed: VoteReport::count_failed(&responses),
                duration_seconds: 12.0,
            },
            responses,
            outcome,
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("# Majority Vote Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("What is 2+2?"));
        assert!(markdown.contains("- **Runs Failed:** 1"));
        assert!(markdown.contains("**4**"));
        assert!(markdown.contains("Confidence: 2/3 = 66%"));
        assert!(markdown.contains("| 4 | 2 |"));
        assert!(markdown.contains("### Run 3"));
    }

    #[test]
    fn test_outcome_section_without_responses() {
        let section = generate_outcome_section(&VoteOutcome::NoResponses);
        assert!(section.contains("Error: no responses provided"));
        assert!(!section.contains("| Answer |"));
    }

    #[test]
    fn test_escape_cell() {
        assert_eq!(escape_cell("a|b\nc"), "a\\|b c");
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"question\""));
        assert!(json.contains("\"status\": \"majority\""));
        assert!(json.contains("\"confidence_percent\": 66"));
    }

    #[test]
    fn test_outcome_json_no_responses() {
        let json = generate_outcome_json(&VoteOutcome::NoResponses).unwrap();
        assert!(json.contains("\"status\": \"no_responses\""));
    }
}
