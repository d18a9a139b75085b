//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// ensemble-vote - ask an LLM agent the same question N times and keep
/// the majority answer
///
/// Examples:
///   ensemble-vote run --question "What is 17 * 23?" --runs 5
///   ensemble-vote run --question "sqrt(2) to 3 places?" --format markdown -o report.md
///   ensemble-vote run --question "2+2?" --responses-only > responses.json
///   ensemble-vote vote --input responses.json
///   ensemble-vote calc "sqrt(16) * 3"
///   ensemble-vote --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .ensemble-vote.toml in the current directory
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output (logs every run's answer)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (errors only, no progress bar)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Generate a default .ensemble-vote.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the agent N times on a question and vote on the answers
    Run(RunArgs),
    /// Vote on responses read from a file or stdin
    Vote(VoteArgs),
    /// Evaluate an arithmetic expression
    Calc(CalcArgs),
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct RunArgs {
    /// The question to ask the agent
    #[arg(long, value_name = "TEXT")]
    pub question: String,

    /// How many times to run the agent
    #[arg(short = 'n', long, value_name = "COUNT")]
    pub runs: Option<usize>,

    /// Ollama model to use
    #[arg(short, long, env = "ENSEMBLE_VOTE_MODEL")]
    pub model: Option<String>,

    /// Ollama API endpoint URL
    #[arg(long, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Instructions for the agent
    #[arg(long, value_name = "TEXT")]
    pub system_prompt: Option<String>,

    /// Temperature for LLM responses (0.0 - 2.0)
    ///
    /// Some variety between runs is what makes the vote meaningful
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Maximum tool-calling iterations per run
    #[arg(long, value_name = "COUNT")]
    pub max_iterations: Option<usize>,

    /// Number of runs in flight at once
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Do not offer the calculator tool to the agent
    #[arg(long)]
    pub no_tools: bool,

    /// Print the collected responses as JSON instead of voting
    #[arg(long)]
    pub responses_only: bool,

    /// Output format (text, markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write the result to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct VoteArgs {
    /// File with responses (JSON or one response per line); stdin if omitted
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Output format (text, markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct CalcArgs {
    /// The mathematical expression to evaluate
    #[arg(allow_hyphen_values = true, value_name = "EXPRESSION")]
    pub expression: String,
}

/// Output format for results.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain majority summary (default)
    #[default]
    Text,
    /// Markdown report
    Markdown,
    /// JSON report
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        // Skip remaining validation for --init-config
        if self.init_config {
            return Ok(());
        }

        match &self.command {
            None => Err("A subcommand is required (run, vote or calc)".to_string()),
            Some(Command::Run(run)) => run.validate(),
            Some(Command::Vote(vote)) => vote.validate(),
            Some(Command::Calc(_)) => Ok(()),
        }
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

impl RunArgs {
    pub fn validate(&self) -> Result<(), String> {
        if self.question.trim().is_empty() {
            return Err("Question must not be empty".to_string());
        }

        if let Some(ref url) = self.ollama_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 2.0".to_string());
            }
        }

        if self.runs == Some(0) {
            return Err("Runs must be at least 1".to_string());
        }

        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.max_iterations == Some(0) {
            return Err("Max iterations must be at least 1".to_string());
        }

        if self.responses_only && self.format.is_some() {
            return Err("--responses-only always prints JSON; drop --format".to_string());
        }

        Ok(())
    }
}

impl VoteArgs {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ref input) = self.input {
            if !input.is_file() {
                return Err(format!("Input file does not exist: {}", input.display()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    fn run_args() -> RunArgs {
        RunArgs {
            question: "What is 2+2?".to_string(),
            ..RunArgs::default()
        }
    }

    #[test]
    fn test_parse_run() {
        let args = parse(&[
            "ensemble-vote",
            "run",
            "--question",
            "2+2?",
            "-n",
            "5",
            "--no-tools",
            "--format",
            "json",
        ]);

        let Some(Command::Run(run)) = args.command else {
            panic!("expected run");
        };
        assert_eq!(run.question, "2+2?");
        assert_eq!(run.runs, Some(5));
        assert!(run.no_tools);
        assert_eq!(run.format, Some(OutputFormat::Json));
    }

    #[test]
    fn test_parse_calc_with_leading_minus() {
        let args = parse(&["ensemble-vote", "calc", "-2 ** 2"]);
        let Some(Command::Calc(calc)) = args.command else {
            panic!("expected calc");
        };
        assert_eq!(calc.expression, "-2 ** 2");
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = parse(&["ensemble-vote", "vote", "--verbose"]);
        assert!(args.verbose);
        assert!(matches!(args.command, Some(Command::Vote(_))));
    }

    #[test]
    fn test_validation_requires_subcommand() {
        assert!(parse(&["ensemble-vote"]).validate().is_err());
        assert!(parse(&["ensemble-vote", "--init-config"]).validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let args = parse(&["ensemble-vote", "-v", "-q", "calc", "1"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_run_validation() {
        assert!(run_args().validate().is_ok());

        let mut args = run_args();
        args.question = "   ".to_string();
        assert!(args.validate().is_err());

        let mut args = run_args();
        args.ollama_url = Some("localhost:11434".to_string());
        assert!(args.validate().is_err());

        let mut args = run_args();
        args.temperature = Some(3.0);
        assert!(args.validate().is_err());

        let mut args = run_args();
        args.runs = Some(0);
        assert!(args.validate().is_err());

        let mut args = run_args();
        args.responses_only = true;
        args.format = Some(OutputFormat::Markdown);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_vote_missing_input() {
        let args = VoteArgs {
            input: Some(PathBuf::from("/definitely/not/here.json")),
            format: None,
        };
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = parse(&["ensemble-vote", "calc", "1"]);
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
