//! Agent loop for a single tool-calling run.
//!
//! The model is asked the question, may call tools any number of times,
//! and the run ends at the first reply without tool calls.

use crate::agent::ollama::{ChatMessage, ChatModel, ChatRequest, ModelError};
use crate::agent::tools::ToolExecutor;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Answer used when the model produced nothing usable.
pub const NO_ANSWER: &str = "No answer generated";

/// Answer used when the iteration budget runs out.
pub const ITERATION_LIMIT_ANSWER: &str = "Agent stopped due to iteration limit or time limit.";

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that can use tools to answer questions accurately.";

/// Configuration for the agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub model_name: String,
    pub temperature: f32,
    pub max_iterations: usize,
    pub system_prompt: String,
    pub enable_calculator: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model_name: "llama3.2:latest".to_string(),
            temperature: 0.1,
            max_iterations: 15,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            enable_calculator: true,
        }
    }
}

/// A tool-calling agent bound to one model.
#[derive(Clone)]
pub struct QuestionAgent {
    config: AgentConfig,
    model: Arc<dyn ChatModel>,
    tool_executor: ToolExecutor,
}

impl QuestionAgent {
    pub fn new(config: AgentConfig, model: Arc<dyn ChatModel>) -> Self {
        let tool_executor = ToolExecutor::new(config.enable_calculator);
        Self {
            config,
            model,
            tool_executor,
        }
    }

    /// Run the agent once and return its answer.
    ///
    /// Only model transport failures are errors; tool failures are fed
    /// back to the model as observations.
    pub async fn invoke(&self, question: &str) -> Result<String, ModelError> {
        let tools = self.tool_executor.definitions();
        let mut messages = vec![
            ChatMessage::system(self.config.system_prompt.as_str()),
            ChatMessage::user(question),
        ];
        let mut last_observation: Option<String> = None;

        for iteration in 0..self.config.max_iterations {
            debug!("Agent iteration {}", iteration + 1);

            let request = ChatRequest {
                model: self.config.model_name.clone(),
                messages: messages.clone(),
                tools: tools.clone(),
                temperature: self.config.temperature,
            };
            let reply = self.model.chat(&request).await?;

            if reply.tool_calls.is_empty() {
                return Ok(final_answer(&reply.content, last_observation.as_deref()));
            }

            messages.push(ChatMessage::assistant(
                reply.content,
                Some(reply.tool_calls.clone()),
            ));

            for tool_call in &reply.tool_calls {
                let observation = self.tool_executor.execute(tool_call).into_observation();
                info!("Tool {} executed", tool_call.function.name);
                messages.push(ChatMessage::tool(observation.as_str()));
                last_observation = Some(observation);
            }
        }

        warn!(
            "Agent hit the iteration limit ({}) without a final answer",
            self.config.max_iterations
        );
        Ok(ITERATION_LIMIT_ANSWER.to_string())
    }
}

/// The reply text, else the last tool observation, else a placeholder.
fn final_answer(content: &str, last_observation: Option<&str>) -> String {
    let content = content.trim();
    if !content.is_empty() {
        return content.to_string();
    }

    match last_observation.map(str::trim) {
        Some(observation) if !observation.is_empty() => observation.to_string(),
        _ => NO_ANSWER.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::agent::ollama::ChatReply;
    use crate::agent::tools::ToolCall;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Model that replays canned replies and records every request.
    pub(crate) struct ScriptedModel {
        replies: Mutex<VecDeque<Result<ChatReply, ModelError>>>,
        pub(crate) requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedModel {
        pub(crate) fn new(replies: Vec<Result<ChatReply, ModelError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    pub(crate) fn text(content: &str) -> Result<ChatReply, ModelError> {
        Ok(ChatReply {
            content: content.to_string(),
            tool_calls: vec![],
        })
    }

    pub(crate) fn calc_call(expression: &str) -> Result<ChatReply, ModelError> {
        Ok(ChatReply {
            content: String::new(),
            tool_calls: vec![ToolCall::new("calculator", json!({"expression": expression}))],
        })
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, ModelError> {
            self.requests.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ModelError::InvalidResponse("script exhausted".into())))
        }
    }

    fn agent(model: Arc<ScriptedModel>, config: AgentConfig) -> QuestionAgent {
        QuestionAgent::new(config, model)
    }

    #[tokio::test]
    async fn test_direct_answer_is_trimmed() {
        let model = Arc::new(ScriptedModel::new(vec![text("  The answer is 4.\n")]));
        let answer = agent(model.clone(), AgentConfig::default())
            .invoke("2+2?")
            .await
            .unwrap();

        assert_eq!(answer, "The answer is 4.");

        let requests = model.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages[0].role, "system");
        assert_eq!(requests[0].messages[0].content, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(requests[0].messages[1].content, "2+2?");
        assert_eq!(requests[0].tools.len(), 1);
    }

    #[tokio::test]
    async fn test_tool_round_trip() {
        let model = Arc::new(ScriptedModel::new(vec![
            calc_call("6 * 7"),
            text("It is 42"),
        ]));
        let answer = agent(model.clone(), AgentConfig::default())
            .invoke("6 times 7?")
            .await
            .unwrap();

        assert_eq!(answer, "It is 42");

        let requests = model.requests.lock().unwrap();
        let second = &requests[1].messages;
        assert_eq!(second.len(), 4);
        assert_eq!(second[2].role, "assistant");
        assert!(second[2].tool_calls.is_some());
        assert_eq!(second[3].role, "tool");
        assert_eq!(second[3].content, "42");
    }

    #[tokio::test]
    async fn test_empty_reply_falls_back_to_observation() {
        let model = Arc::new(ScriptedModel::new(vec![calc_call("sqrt(81)"), text("   ")]));
        let answer = agent(model, AgentConfig::default())
            .invoke("root of 81")
            .await
            .unwrap();

        assert_eq!(answer, "9.0");
    }

    #[tokio::test]
    async fn test_empty_reply_without_tools() {
        let model = Arc::new(ScriptedModel::new(vec![text("")]));
        let answer = agent(model, AgentConfig::default()).invoke("?").await.unwrap();

        assert_eq!(answer, NO_ANSWER);
    }

    #[tokio::test]
    async fn test_iteration_limit() {
        let model = Arc::new(ScriptedModel::new(vec![
            calc_call("1"),
            calc_call("2"),
            calc_call("3"),
        ]));
        let config = AgentConfig {
            max_iterations: 2,
            ..AgentConfig::default()
        };
        let answer = agent(model.clone(), config).invoke("loop").await.unwrap();

        assert_eq!(answer, ITERATION_LIMIT_ANSWER);
        assert_eq!(model.requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_model_error_propagates() {
        let model = Arc::new(ScriptedModel::new(vec![Err(ModelError::Timeout(30))]));
        let err = agent(model, AgentConfig::default())
            .invoke("?")
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "request timed out after 30s");
    }

    #[tokio::test]
    async fn test_tools_disabled() {
        let model = Arc::new(ScriptedModel::new(vec![text("5")]));
        let config = AgentConfig {
            enable_calculator: false,
            ..AgentConfig::default()
        };
        agent(model.clone(), config).invoke("?").await.unwrap();

        assert!(model.requests.lock().unwrap()[0].tools.is_empty());
    }
}
