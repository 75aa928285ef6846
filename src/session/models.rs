//! The state model for debugging threads: tool definitions, threads and
//! the messages that make up a thread.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub const DEFAULT_SYSTEM_MESSAGE: &str = "You are a helpful assistant.";
pub const DEFAULT_HUMAN_MESSAGE: &str = "Hello, how are you?";

/// A user authored tool offered to the model. `schema` is kept as the
/// raw JSON-Schema text the user typed and is only parsed when a
/// request is made.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub schema: String,
}

impl ToolDefinition {
    pub fn new(name: &str, description: &str, schema: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            schema: schema.to_string(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Thinking {
        thinking: String,
        #[serde(default)]
        signature: String,
    },
    Text {
        text: String,
    },
    /// Any other provider block (`tool_use`, `redacted_thinking`, ...)
    /// kept as the raw JSON it arrived as.
    #[serde(untagged)]
    Other(Value),
}

impl ContentBlock {
    pub fn text(text: &str) -> Self {
        ContentBlock::Text {
            text: text.to_string(),
        }
    }
}

/// A request from the model to call a tool. The `id` links it to the
/// `Message::Tool` that carries the result.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(
    tag = "type",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum Message {
    System {
        content: String,
    },
    Human {
        content: String,
    },
    Ai {
        content: Vec<ContentBlock>,
        #[serde(default)]
        input_tokens: u64,
        #[serde(default)]
        output_tokens: u64,
        #[serde(default)]
        tool_calls: Vec<ToolCallRequest>,
    },
    Tool {
        tool_call_id: String,
        name: String,
        #[serde(default)]
        args: Map<String, Value>,
        content: String,
    },
    /// Marks where a model is invoked. `current` is the model that last
    /// answered here and `chosen` is the one to use on the next request.
    ModelChoice {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        current: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        chosen: Option<String>,
    },
}

impl Message {
    pub fn system(content: &str) -> Self {
        Message::System {
            content: content.to_string(),
        }
    }

    pub fn human(content: &str) -> Self {
        Message::Human {
            content: content.to_string(),
        }
    }

    pub fn model_choice(chosen: Option<&str>) -> Self {
        Message::ModelChoice {
            current: None,
            chosen: chosen.map(str::to_string),
        }
    }

    /// Empty tool result waiting for the user to fill it in.
    pub fn tool_placeholder(call: &ToolCallRequest) -> Self {
        Message::Tool {
            tool_call_id: call.id.clone(),
            name: call.name.clone(),
            args: call.args.clone(),
            content: String::new(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Message::System { .. } => "system",
            Message::Human { .. } => "human",
            Message::Ai { .. } => "ai",
            Message::Tool { .. } => "tool",
            Message::ModelChoice { .. } => "model-choice",
        }
    }

    /// Replace the editable text of a message. For AI messages this
    /// targets the text block at `block`; thinking blocks are read only.
    pub fn set_text(&mut self, block: usize, value: &str) -> bool {
        match self {
            Message::System { content } | Message::Human { content } => {
                *content = value.to_string();
                true
            }
            Message::Tool { content, .. } => {
                *content = value.to_string();
                true
            }
            Message::Ai { content, .. } => match content.get_mut(block) {
                Some(ContentBlock::Text { text }) => {
                    *text = value.to_string();
                    true
                }
                Some(ContentBlock::Thinking { .. } | ContentBlock::Other(_)) | None => false,
            },
            Message::ModelChoice { .. } => false,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: Uuid,
    pub name: String,
    pub tools: Vec<String>,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub is_pending: bool,
}

impl Thread {
    pub fn new(name: &str, tools: Vec<String>, messages: Vec<Message>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            tools,
            messages,
            created_at: now,
            updated_at: now,
            error: None,
            is_pending: false,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Index of the last model-choice turn, if any.
    pub fn last_model_choice(&self) -> Option<usize> {
        self.messages
            .iter()
            .rposition(|m| matches!(m, Message::ModelChoice { .. }))
    }
}
