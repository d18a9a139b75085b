//! ensemble-vote - self-consistency voting for LLM agents
//!
//! A CLI tool that asks a tool-calling Ollama agent the same question
//! several times and reports the majority answer with a confidence score.
//!
//! Exit codes:
//!   0 - Success (including "no responses" and calculator error results)
//!   1 - Runtime error (connection, config, unreadable input, etc.)

mod agent;
mod calculator;
mod cli;
mod config;
mod models;
mod report;
mod voting;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, CalcArgs, Command, OutputFormat, RunArgs, VoteArgs};
use config::Config;
use models::{RawResponse, ReportMetadata, VoteReport};
use std::io::Read;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("ensemble-vote v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    let result = match args.command.clone() {
        Some(Command::Run(run)) => handle_run(&args, run).await,
        Some(Command::Vote(vote)) => handle_vote(&args, vote),
        Some(Command::Calc(calc)) => handle_calc(calc),
        None => Ok(()),
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .ensemble-vote.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(config::CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            config::CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", config::CONFIG_FILE);
    println!("   Edit it to customize the model, run count, and system prompt.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr so stdout only carries results.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the agent N times, vote, and emit the result.
async fn handle_run(args: &Args, run: RunArgs) -> Result<()> {
    let start_time = Instant::now();
    let started_at = Utc::now();

    let mut config = load_config(args)?;
    config.merge_with_args(&run);

    if !args.quiet {
        eprintln!("🤖 Initializing agent...");
        eprintln!("   Model: {}", config.model.name);
        eprintln!("   Ollama: {}", config.model.ollama_url);
        eprintln!(
            "   Runs: {} (concurrency {})",
            config.runner.runs, config.runner.concurrency
        );
        eprintln!(
            "   Tools: {}",
            if config.runner.enable_calculator {
                "calculator"
            } else {
                "none"
            }
        );
    }

    let client = agent::OllamaClient::new(
        config.model.ollama_url.clone(),
        config.model.timeout_seconds,
    )
    .context("Failed to create Ollama client")?;

    let agent_config = agent::AgentConfig {
        model_name: config.model.name.clone(),
        temperature: config.model.temperature,
        max_iterations: config.model.max_iterations,
        system_prompt: config.runner.system_prompt.clone(),
        enable_calculator: config.runner.enable_calculator,
    };
    let question_agent = agent::QuestionAgent::new(agent_config, Arc::new(client));

    let runner = agent::AgentRunner::new(
        question_agent,
        agent::RunnerConfig {
            runs: config.runner.runs,
            concurrency: config.runner.concurrency,
            verbose: args.verbose || config.general.verbose,
            show_progress: !args.quiet,
        },
    );

    if run.responses_only {
        let payload = runner.run_payload(&run.question).await;
        let json = serde_json::to_string_pretty(&payload.to_json())?;
        return emit(&json, run.output.as_deref());
    }

    let responses = runner.run_multiple(&run.question).await;

    let outcome = voting::compute_majority(RawResponse::payload(responses.clone()));
    let runs_failed = VoteReport::count_failed(&responses);
    if runs_failed > 0 {
        warn!("{} of {} runs failed", runs_failed, responses.len());
    }

    let report = VoteReport {
        metadata: ReportMetadata {
            question: run.question.clone(),
            started_at,
            model_used: config.model.name.clone(),
            runs: responses.len(),
            runs_failed,
            duration_seconds: start_time.elapsed().as_secs_f64(),
        },
        responses,
        outcome,
    };

    let output = match config.general.format {
        OutputFormat::Text => report.outcome.to_string(),
        OutputFormat::Markdown => report::generate_markdown_report(&report),
        OutputFormat::Json => report::generate_json_report(&report)?,
    };

    emit(&output, run.output.as_deref())?;

    if !args.quiet {
        eprintln!("\n✅ Done in {:.1}s", report.metadata.duration_seconds);
    }
    Ok(())
}

/// Vote on responses from a file or stdin.
fn handle_vote(args: &Args, vote: VoteArgs) -> Result<()> {
    let input = match vote.input {
        Some(ref path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read responses from stdin")?;
            buffer
        }
    };

    let outcome = voting::compute_majority(RawResponse::from_input_text(&input));

    let format = match vote.format {
        Some(format) => format,
        None => load_config(args)?.general.format,
    };

    let output = match format {
        OutputFormat::Text => outcome.to_string(),
        OutputFormat::Markdown => report::generate_outcome_section(&outcome),
        OutputFormat::Json => report::generate_outcome_json(&outcome)?,
    };

    emit(&output, None)
}

fn handle_calc(calc: CalcArgs) -> Result<()> {
    println!("{}", calculator::calculate(&calc.expression));
    Ok(())
}

/// Print to stdout, or write to a file when one is given.
fn emit(content: &str, path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write output to {}", path.display()))?;
            info!("Output written to {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", config::CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
