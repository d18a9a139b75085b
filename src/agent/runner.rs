//! Repeated agent runs feeding the majority vote.

use crate::agent::agent_loop::QuestionAgent;
use crate::models::{RawResponse, RUN_ERROR_PREFIX};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

/// Settings for a batch of runs.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Number of runs; values below 1 are treated as 1.
    pub runs: usize,
    /// Runs in flight at once.
    pub concurrency: usize,
    /// Log every run's answer.
    pub verbose: bool,
    pub show_progress: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            runs: 3,
            concurrency: 1,
            verbose: false,
            show_progress: false,
        }
    }
}

/// Asks the same question several times and collects every answer.
pub struct AgentRunner {
    agent: QuestionAgent,
    config: RunnerConfig,
}

impl AgentRunner {
    pub fn new(agent: QuestionAgent, config: RunnerConfig) -> Self {
        Self { agent, config }
    }

    /// Run the agent N times. Always returns N entries in run order; a
    /// failed run is replaced by a description of its error.
    pub async fn run_multiple(&self, question: &str) -> Vec<String> {
        let n = self.config.runs.max(1);
        let concurrency = self.config.concurrency.max(1);

        if self.config.verbose {
            info!("Running agent {} times for: {}", n, question);
        }

        let pb = self.progress_bar(n);

        let responses: Vec<String> = stream::iter(1..=n)
            .map(|i| async move { (i, self.agent.invoke(question).await) })
            .buffered(concurrency)
            .map(|(i, result)| {
                pb.inc(1);
                match result {
                    Ok(answer) => {
                        if self.config.verbose {
                            info!("Run {}/{}: {}", i, n, answer);
                        }
                        answer
                    }
                    Err(e) => {
                        let message = format!("{}{}: {}", RUN_ERROR_PREFIX, i, e);
                        error!("{}", message);
                        message
                    }
                }
            })
            .collect()
            .await;

        pb.finish_and_clear();
        responses
    }

    /// Same as [`run_multiple`](Self::run_multiple), shaped for the voter.
    pub async fn run_payload(&self, question: &str) -> RawResponse {
        RawResponse::payload(self.run_multiple(question).await)
    }

    fn progress_bar(&self, n: usize) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(n as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} runs")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    }
}
