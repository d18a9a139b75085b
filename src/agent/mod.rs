//! LLM agent modules for answering questions.
//!
//! This module provides the tool-calling agent, the model client it talks
//! to, and the runner that repeats it for majority voting.

pub mod agent_loop;
pub mod ollama;
pub mod runner;
pub mod tools;

pub use agent_loop::{AgentConfig, QuestionAgent};
pub use ollama::OllamaClient;
pub use runner::{AgentRunner, RunnerConfig};
