//! Report rendering for vote outcomes.

pub mod generator;

pub use generator::{
    generate_json_report, generate_markdown_report, generate_outcome_json,
    generate_outcome_section,
};
