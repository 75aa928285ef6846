use std::time::Duration;

use anyhow::{Error, Result, anyhow, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::ai::{ChatModel, ChatTurn, ModelResponse, ToolSpec};
use crate::session::{ContentBlock, ToolCallRequest};

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub enum Role {
    #[serde(rename = "system")]
    System,
    #[serde(rename = "assistant")]
    Assistant,
    #[serde(rename = "user")]
    User,
    #[serde(rename = "tool")]
    Tool,
}

// Object {
//     "content": Null,
//     "refusal": Null,
//     "role": String("assistant"),
//     "tool_calls": Array [
//         Object {
//             "function": Object {
//                 "arguments": String("{\"query\":\"books\"}"),
//                 "name": String("search_notes")
//             },
//             "id": String("call_KCg5V0N5E7hHHrUwdefHBfgL"),
//             "type": String("function")
//         }
//     ]
// }
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct FunctionCallFn {
    pub arguments: String,
    pub name: String,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct FunctionCall {
    pub function: FunctionCallFn,
    pub id: String,
    pub r#type: String,
}

impl FunctionCall {
    pub fn from_request(call: &ToolCallRequest) -> Self {
        FunctionCall {
            function: FunctionCallFn {
                arguments: Value::Object(call.args.clone()).to_string(),
                name: call.name.clone(),
            },
            id: call.id.clone(),
            r#type: String::from("function"),
        }
    }

    /// Convert back into a tool call request. OpenAI sends arguments as
    /// JSON text so they need to be decoded into an object.
    pub fn into_request(self) -> Result<ToolCallRequest, Error> {
        let args = if self.function.arguments.trim().is_empty() {
            Map::new()
        } else {
            match serde_json::from_str::<Value>(&self.function.arguments)? {
                Value::Object(args) => args,
                other => bail!(
                    "Tool call {} arguments are not an object: {}",
                    self.id,
                    other
                ),
            }
        };
        Ok(ToolCallRequest {
            id: self.id,
            name: self.function.name,
            args,
        })
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Message {
    role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    refusal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<FunctionCall>>,
}

impl Message {
    pub fn new(role: Role, content: &str) -> Self {
        Message {
            role,
            refusal: None,
            content: Some(content.to_string()),
            tool_call_id: None,
            tool_calls: None,
        }
    }
    pub fn new_assistant(content: Option<String>, tool_calls: Vec<FunctionCall>) -> Self {
        Message {
            role: Role::Assistant,
            refusal: None,
            content,
            tool_call_id: None,
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(tool_calls)
            },
        }
    }
    pub fn new_tool_call_response(content: &str, tool_call_id: &str) -> Self {
        Message {
            role: Role::Tool,
            refusal: None,
            content: Some(content.to_string()),
            tool_call_id: Some(tool_call_id.to_string()),
            tool_calls: None,
        }
    }

    /// Map a provider neutral turn onto the chat completions format.
    /// Only text blocks are sent, OpenAI can't replay thinking or other
    /// provider blocks.
    pub fn from_turn(turn: &ChatTurn) -> Self {
        match turn {
            ChatTurn::System(content) => Message::new(Role::System, content),
            ChatTurn::Human(content) => Message::new(Role::User, content),
            ChatTurn::Ai {
                content,
                tool_calls,
            } => {
                let text = content
                    .iter()
                    .filter_map(|block| match block {
                        ContentBlock::Text { text } => Some(text.as_str()),
                        ContentBlock::Thinking { .. } | ContentBlock::Other(_) => None,
                    })
                    .collect::<Vec<_>>()
                    .join("");
                let text = if text.is_empty() { None } else { Some(text) };
                Message::new_assistant(
                    text,
                    tool_calls.iter().map(FunctionCall::from_request).collect(),
                )
            }
            ChatTurn::Tool {
                tool_call_id,
                content,
            } => Message::new_tool_call_response(content, tool_call_id),
        }
    }
}

#[derive(Serialize)]
pub struct Function<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub parameters: &'a Value,
}

#[derive(Serialize)]
pub enum ToolType {
    #[serde(rename = "function")]
    Function,
}

#[derive(Serialize)]
pub struct Tool<'a> {
    pub r#type: ToolType,
    pub function: Function<'a>,
}

impl<'a> From<&'a ToolSpec> for Tool<'a> {
    fn from(spec: &'a ToolSpec) -> Self {
        Tool {
            r#type: ToolType::Function,
            function: Function {
                name: &spec.name,
                description: &spec.description,
                parameters: &spec.parameters,
            },
        }
    }
}

pub async fn completion(
    messages: &[Message],
    tools: &[ToolSpec],
    api_hostname: &str,
    api_key: &str,
    model: &str,
    max_tokens: Option<u32>,
) -> Result<Value, Error> {
    let mut payload = json!({
        "model": model,
        "messages": messages,
    });
    if !tools.is_empty() {
        payload["tools"] = json!(tools.iter().map(Tool::from).collect::<Vec<_>>());
    }
    if let Some(max_tokens) = max_tokens {
        payload["max_completion_tokens"] = json!(max_tokens);
    }
    let url = format!("{}/v1/chat/completions", api_hostname.trim_end_matches("/"));
    let response = reqwest::Client::new()
        .post(url)
        .bearer_auth(api_key)
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
        bail!("OpenAI request failed ({}): {}", status, message);
    }
    let body: Value = serde_json::from_str(&text)?;

    Ok(body)
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Default, Deserialize)]
struct CompletionUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    usage: Option<CompletionUsage>,
}

pub fn parse_completion(resp: Value) -> Result<ModelResponse, Error> {
    let resp: CompletionResponse = serde_json::from_value(resp)?;
    let usage = resp.usage.unwrap_or_default();
    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or(anyhow!("Completion response has no choices"))?;

    let content = match choice.message.content {
        Some(text) if !text.is_empty() => vec![ContentBlock::Text { text }],
        _ => Vec::new(),
    };
    let tool_calls = choice
        .message
        .tool_calls
        .into_iter()
        .map(FunctionCall::into_request)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ModelResponse {
        content,
        input_tokens: usage.prompt_tokens,
        output_tokens: usage.completion_tokens,
        tool_calls,
    })
}

/// A chat model served by an OpenAI compatible chat completions API.
#[derive(Clone, Debug)]
pub struct OpenAiChat {
    pub api_hostname: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: Option<u32>,
}

impl OpenAiChat {
    pub fn new(api_hostname: &str, api_key: &str, model: &str) -> Self {
        Self {
            api_hostname: api_hostname.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            max_tokens: None,
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn invoke(&self, turns: &[ChatTurn], tools: &[ToolSpec]) -> Result<ModelResponse, Error> {
        let messages: Vec<Message> = turns.iter().map(Message::from_turn).collect();
        let resp = completion(
            &messages,
            tools,
            &self.api_hostname,
            &self.api_key,
            &self.model,
            self.max_tokens,
        )
        .await?;
        parse_completion(resp)
    }
}
