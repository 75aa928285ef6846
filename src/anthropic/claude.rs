//! Client for the Anthropic messages API.
//!
//! Turns are converted into the messages format where system prompts
//! live outside of the message list, tool calls are `tool_use` blocks
//! on the assistant turn and tool results are `tool_result` blocks on a
//! user turn.

use std::time::Duration;

use anyhow::{Error, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::ai::{ChatModel, ChatTurn, ModelResponse, ToolSpec};
use crate::session::{ContentBlock, ToolCallRequest};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Content blocks returned by the API
#[derive(Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ResponseBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "thinking")]
    Thinking {
        thinking: String,
        #[serde(default)]
        signature: String,
    },

    #[serde(rename = "redacted_thinking")]
    RedactedThinking { data: String },

    #[serde(rename = "tool_use")]
    ToolUse { id: String, name: String, input: Value },

    /// Block types added later
    #[serde(other)]
    Other,
}

/// Token usage information
#[derive(Deserialize, Debug, Default)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

#[derive(Deserialize, Debug)]
pub struct MessagesResponse {
    pub content: Vec<ResponseBlock>,
    #[serde(default)]
    pub usage: Usage,
    #[serde(default)]
    pub stop_reason: Option<String>,
}

impl MessagesResponse {
    pub fn into_model_response(self) -> ModelResponse {
        let mut content = Vec::new();
        let mut tool_calls = Vec::new();
        for block in self.content {
            match block {
                ResponseBlock::Text { text } => content.push(ContentBlock::Text { text }),
                ResponseBlock::Thinking {
                    thinking,
                    signature,
                } => content.push(ContentBlock::Thinking {
                    thinking,
                    signature,
                }),
                ResponseBlock::ToolUse { id, name, input } => {
                    let args = match input {
                        Value::Object(args) => args,
                        _ => Map::new(),
                    };
                    tool_calls.push(ToolCallRequest { id, name, args });
                }
                ResponseBlock::RedactedThinking { data } => content.push(ContentBlock::Other(
                    json!({"type": "redacted_thinking", "data": data}),
                )),
                ResponseBlock::Other => {}
            }
        }
        ModelResponse {
            content,
            input_tokens: self.usage.input_tokens,
            output_tokens: self.usage.output_tokens,
            tool_calls,
        }
    }
}

fn push_turn(messages: &mut Vec<Value>, role: &str, mut blocks: Vec<Value>) {
    if blocks.is_empty() {
        return;
    }
    // The API wants alternating roles so merge into the previous turn
    // when the role repeats (e.g. several tool results in a row)
    if let Some(last) = messages.last_mut()
        && last["role"] == role
        && let Some(content) = last["content"].as_array_mut()
    {
        content.append(&mut blocks);
        return;
    }
    messages.push(json!({"role": role, "content": blocks}));
}

/// Build the `system` prompt and `messages` list for a request.
pub fn build_messages(turns: &[ChatTurn]) -> (Option<String>, Vec<Value>) {
    let mut system: Vec<&str> = Vec::new();
    let mut messages: Vec<Value> = Vec::new();

    for turn in turns {
        match turn {
            ChatTurn::System(content) => system.push(content),
            ChatTurn::Human(content) => {
                push_turn(
                    &mut messages,
                    "user",
                    vec![json!({"type": "text", "text": content})],
                );
            }
            ChatTurn::Ai {
                content,
                tool_calls,
            } => {
                let mut blocks: Vec<Value> = content
                    .iter()
                    .filter_map(|block| match block {
                        // Thinking can only be replayed with its signature
                        ContentBlock::Thinking {
                            thinking,
                            signature,
                        } if !signature.is_empty() => Some(json!({
                            "type": "thinking",
                            "thinking": thinking,
                            "signature": signature
                        })),
                        ContentBlock::Thinking { .. } => None,
                        ContentBlock::Text { text } if text.is_empty() => None,
                        ContentBlock::Text { text } => Some(json!({"type": "text", "text": text})),
                        // Tool use blocks are rebuilt from `tool_calls` below
                        ContentBlock::Other(block) if block["type"] == "redacted_thinking" => {
                            Some(block.clone())
                        }
                        ContentBlock::Other(_) => None,
                    })
                    .collect();
                blocks.extend(tool_calls.iter().map(|call| {
                    json!({
                        "type": "tool_use",
                        "id": call.id,
                        "name": call.name,
                        "input": call.args
                    })
                }));
                push_turn(&mut messages, "assistant", blocks);
            }
            ChatTurn::Tool {
                tool_call_id,
                content,
            } => {
                push_turn(
                    &mut messages,
                    "user",
                    vec![json!({
                        "type": "tool_result",
                        "tool_use_id": tool_call_id,
                        "content": content
                    })],
                );
            }
        }
    }

    let system = if system.is_empty() {
        None
    } else {
        Some(system.join("\n\n"))
    };
    (system, messages)
}

/// A chat model served by the Anthropic messages API
#[derive(Clone, Debug)]
pub struct ClaudeChat {
    pub api_hostname: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub thinking_budget: Option<u32>,
}

impl ClaudeChat {
    pub fn new(api_hostname: &str, api_key: &str, model: &str, max_tokens: u32) -> Self {
        Self {
            api_hostname: api_hostname.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            max_tokens,
            thinking_budget: None,
        }
    }

    /// Enable extended thinking with the given token budget
    pub fn thinking(mut self, budget_tokens: u32) -> Self {
        self.thinking_budget = Some(budget_tokens);
        self
    }

    pub fn payload(&self, turns: &[ChatTurn], tools: &[ToolSpec]) -> Value {
        let (system, messages) = build_messages(turns);
        let mut payload = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": messages,
        });
        if let Some(system) = system {
            payload["system"] = json!(system);
        }
        if let Some(budget) = self.thinking_budget {
            payload["thinking"] = json!({"type": "enabled", "budget_tokens": budget});
        }
        if !tools.is_empty() {
            payload["tools"] = json!(
                tools
                    .iter()
                    .map(|t| json!({
                        "name": t.name,
                        "description": t.description,
                        "input_schema": t.parameters
                    }))
                    .collect::<Vec<_>>()
            );
        }
        payload
    }
}

#[async_trait]
impl ChatModel for ClaudeChat {
    async fn invoke(&self, turns: &[ChatTurn], tools: &[ToolSpec]) -> Result<ModelResponse, Error> {
        let payload = self.payload(turns, tools);
        let url = format!("{}/v1/messages", self.api_hostname.trim_end_matches("/"));
        let response = reqwest::Client::new()
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .timeout(Duration::from_secs(60 * 10))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            // Gateways can answer with HTML so fall back to the raw body
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|body| body["error"]["message"].as_str().map(str::to_string))
                .unwrap_or(text);
            bail!("Anthropic request failed ({}): {}", status, message);
        }
        let body: Value = serde_json::from_str(&text)?;

        let parsed: MessagesResponse = serde_json::from_value(body)?;
        tracing::debug!("Stop reason: {:?}", parsed.stop_reason);
        Ok(parsed.into_model_response())
    }
}
