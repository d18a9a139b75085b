//! Tool definitions for the answering agent.
//!
//! This module defines the tools the LLM can call while working on a
//! question, and the executor that runs them.

use crate::calculator;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

/// Name of the arithmetic tool.
pub const CALCULATOR_TOOL: &str = "calculator";

/// Tool definition for Ollama's tool-calling API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A tool call made by the LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub function: FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            function: FunctionCall {
                name: name.into(),
                arguments,
            },
        }
    }
}

/// Result of executing a tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(output: String) -> Self {
        Self {
            success: true,
            output,
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(message),
        }
    }

    /// Text fed back to the model as the tool observation.
    pub fn into_observation(self) -> String {
        if self.success {
            self.output
        } else {
            format!("Error: {}", self.error.unwrap_or_default())
        }
    }
}

/// Runs tool calls on behalf of the agent.
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    calculator_enabled: bool,
}

impl ToolExecutor {
    pub fn new(calculator_enabled: bool) -> Self {
        Self { calculator_enabled }
    }

    /// Definitions for every enabled tool.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        if self.calculator_enabled {
            vec![calculator_definition()]
        } else {
            Vec::new()
        }
    }

    /// Execute a tool call and return the result.
    ///
    /// Unknown or disabled tools come back as an error result so the model
    /// can recover.
    pub fn execute(&self, tool_call: &ToolCall) -> ToolResult {
        let name = &tool_call.function.name;
        let args = &tool_call.function.arguments;

        debug!("Executing tool: {} with args: {:?}", name, args);

        match name.as_str() {
            CALCULATOR_TOOL if self.calculator_enabled => self.calculate(args),
            _ => ToolResult::error(format!("Unknown tool: {}", name)),
        }
    }

    fn calculate(&self, args: &Value) -> ToolResult {
        let expression = match args.get("expression") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return ToolResult::error("Missing required parameter: expression".to_string()),
        };

        // Calculator failures are ordinary text; the model reads them.
        ToolResult::success(calculator::calculate(&expression))
    }
}

fn calculator_definition() -> ToolDefinition {
    ToolDefinition {
        tool_type: "function".to_string(),
        function: FunctionDefinition {
            name: CALCULATOR_TOOL.to_string(),
            description: format!(
                "Evaluate a mathematical expression. Supports + - * / // % ** and the functions {}.",
                calculator::MATH_FUNCTIONS.join(", ")
            ),
            parameters: json!({
                "type": "object",
                "properties": {
                    "expression": {
                        "type": "string",
                        "description": "The mathematical expression to evaluate, e.g. 'sqrt(16) * 3'"
                    }
                },
                "required": ["expression"]
            }),
        },
    }
}
