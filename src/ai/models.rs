//! Provider neutral chat types and the registry of models that can
//! answer a model-choice turn.
use anyhow::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::anthropic::ClaudeChat;
use crate::core::AppConfig;
use crate::openai::OpenAiChat;
use crate::session::{ContentBlock, ToolCallRequest};

/// A single turn of context sent to a model.
#[derive(Clone, Debug, PartialEq)]
pub enum ChatTurn {
    System(String),
    Human(String),
    Ai {
        content: Vec<ContentBlock>,
        tool_calls: Vec<ToolCallRequest>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

/// A tool offered to the model with its parsed JSON-Schema.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// One assistant turn returned by a model.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelResponse {
    pub content: Vec<ContentBlock>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub tool_calls: Vec<ToolCallRequest>,
}

#[async_trait]
pub trait ChatModel {
    async fn invoke(&self, turns: &[ChatTurn], tools: &[ToolSpec]) -> Result<ModelResponse, Error>;
}

pub type BoxedChatModel = Box<dyn ChatModel + Send + Sync + 'static>;

type ModelConstructor = Box<dyn Fn() -> BoxedChatModel + Send + Sync + 'static>;

/// Maps model ids to constructors. Order is preserved and the first
/// model registered is the default for new threads.
#[derive(Default)]
pub struct ModelRegistry {
    models: Vec<(String, ModelConstructor)>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The models available out of the box, configured from `config`.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut registry = Self::new();

        for model in ["claude-3-7-sonnet-latest", "claude-sonnet-4-20250514"] {
            let config = config.clone();
            registry.register(model, move || {
                Box::new(
                    ClaudeChat::new(
                        &config.anthropic_api_hostname,
                        &config.anthropic_api_key,
                        model,
                        config.max_tokens,
                    )
                    .thinking(config.thinking_budget),
                )
            });
        }

        let config = config.clone();
        registry.register("o4-mini-2025-04-16", move || {
            Box::new(
                OpenAiChat::new(
                    &config.openai_api_hostname,
                    &config.openai_api_key,
                    "o4-mini-2025-04-16",
                )
                .max_tokens(config.max_tokens),
            )
        });

        registry
    }

    /// Register a model constructor, replacing any existing entry with
    /// the same id.
    pub fn register<F>(&mut self, id: &str, constructor: F)
    where
        F: Fn() -> BoxedChatModel + Send + Sync + 'static,
    {
        let constructor: ModelConstructor = Box::new(constructor);
        match self.models.iter_mut().find(|(model_id, _)| model_id == id) {
            Some(entry) => entry.1 = constructor,
            None => self.models.push((id.to_string(), constructor)),
        }
    }

    pub fn ids(&self) -> Vec<&str> {
        self.models.iter().map(|(id, _)| id.as_str()).collect()
    }

    pub fn default_model(&self) -> Option<&str> {
        self.models.first().map(|(id, _)| id.as_str())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.models.iter().any(|(model_id, _)| model_id == id)
    }

    pub fn build(&self, id: &str) -> Option<BoxedChatModel> {
        self.models
            .iter()
            .find(|(model_id, _)| model_id == id)
            .map(|(_, constructor)| constructor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoModel;

    #[async_trait]
    impl ChatModel for EchoModel {
        async fn invoke(&self, turns: &[ChatTurn], _tools: &[ToolSpec]) -> Result<ModelResponse, Error> {
            Ok(ModelResponse {
                content: vec![ContentBlock::text(&format!("{} turns", turns.len()))],
                ..ModelResponse::default()
            })
        }
    }

    fn test_config() -> AppConfig {
        AppConfig {
            storage_path: String::from("./"),
            openai_api_hostname: String::from("https://api.openai.com"),
            openai_api_key: String::from("test-openai-key"),
            anthropic_api_hostname: String::from("https://api.anthropic.com"),
            anthropic_api_key: String::from("test-anthropic-key"),
            max_tokens: 8192,
            thinking_budget: 2000,
            system_message: String::from("You are a helpful assistant."),
        }
    }

    #[test]
    fn test_default_registry() {
        let registry = ModelRegistry::from_config(&test_config());
        assert_eq!(
            registry.ids(),
            vec![
                "claude-3-7-sonnet-latest",
                "claude-sonnet-4-20250514",
                "o4-mini-2025-04-16"
            ]
        );
        assert_eq!(registry.default_model(), Some("claude-3-7-sonnet-latest"));
        assert!(registry.build("o4-mini-2025-04-16").is_some());
        assert!(registry.build("gpt-2").is_none());
    }

    #[test]
    fn test_register_replaces_existing() {
        let mut registry = ModelRegistry::new();
        assert_eq!(registry.default_model(), None);
        registry.register("echo", || Box::new(EchoModel));
        registry.register("other", || Box::new(EchoModel));
        registry.register("echo", || Box::new(EchoModel));
        assert_eq!(registry.ids(), vec!["echo", "other"]);
        assert!(registry.contains("other"));
    }

    #[tokio::test]
    async fn test_build_and_invoke() {
        let mut registry = ModelRegistry::new();
        registry.register("echo", || Box::new(EchoModel));
        let model = registry.build("echo").unwrap();
        let resp = model
            .invoke(&[ChatTurn::Human("hi".to_string())], &[])
            .await
            .unwrap();
        assert_eq!(resp.content, vec![ContentBlock::text("1 turns")]);
    }
}
