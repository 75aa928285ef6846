//! Test utilities for integration tests
#![allow(dead_code)]
use std::sync::{Arc, Mutex};

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;

use debug_llm::ai::{ChatModel, ChatTurn, ModelRegistry, ModelResponse, ToolSpec};
use debug_llm::core::AppConfig;
use debug_llm::session::{ContentBlock, SessionStore, SharedStore, ThreadSeed, ToolCallRequest, shared};

/// What a scripted model answers with.
#[derive(Clone, Debug)]
pub enum Reply {
    Text(String),
    ToolCall { id: String, name: String, args: Value },
    Fail(String),
}

/// Every call a scripted model received, in order.
#[derive(Clone, Debug, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<(Vec<ChatTurn>, Vec<ToolSpec>)>>>,
}

impl CallLog {
    pub fn calls(&self) -> Vec<(Vec<ChatTurn>, Vec<ToolSpec>)> {
        self.calls.lock().unwrap().clone()
    }
}

/// A chat model that answers every request with the same reply.
#[derive(Clone)]
pub struct ScriptedModel {
    pub reply: Reply,
    pub log: CallLog,
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn invoke(&self, turns: &[ChatTurn], tools: &[ToolSpec]) -> Result<ModelResponse, Error> {
        self.log
            .calls
            .lock()
            .unwrap()
            .push((turns.to_vec(), tools.to_vec()));

        match &self.reply {
            Reply::Text(text) => Ok(ModelResponse {
                content: vec![ContentBlock::text(text)],
                input_tokens: 10,
                output_tokens: 2,
                tool_calls: vec![],
            }),
            Reply::ToolCall { id, name, args } => Ok(ModelResponse {
                content: vec![],
                input_tokens: 10,
                output_tokens: 5,
                tool_calls: vec![ToolCallRequest {
                    id: id.clone(),
                    name: name.clone(),
                    args: args.as_object().cloned().unwrap_or_default(),
                }],
            }),
            Reply::Fail(message) => Err(anyhow!(message.clone())),
        }
    }
}

/// Register a scripted model under `id` and return the log of its calls.
pub fn register_scripted(registry: &mut ModelRegistry, id: &str, reply: Reply) -> CallLog {
    let log = CallLog::default();
    let model = ScriptedModel {
        reply,
        log: log.clone(),
    };
    registry.register(id, move || Box::new(model.clone()));
    log
}

/// A store whose new threads start with `[system, human, model-choice]`
/// and choose `default_model`.
pub fn test_store(default_model: &str) -> SharedStore {
    shared(SessionStore::new(ThreadSeed {
        system_message: "You are a helpful assistant.".to_string(),
        default_model: Some(default_model.to_string()),
    }))
}

pub fn test_config(api_hostname: &str) -> AppConfig {
    AppConfig {
        storage_path: String::from("./"),
        openai_api_hostname: api_hostname.to_string(),
        openai_api_key: String::from("test-openai-key"),
        anthropic_api_hostname: api_hostname.to_string(),
        anthropic_api_key: String::from("test-anthropic-key"),
        max_tokens: 8192,
        thinking_budget: 2000,
        system_message: String::from("You are a helpful assistant."),
    }
}
