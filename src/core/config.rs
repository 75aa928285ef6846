use std::env;
use std::path::PathBuf;

const DEFAULT_MAX_TOKENS: u32 = 8192;
const DEFAULT_THINKING_BUDGET: u32 = 2000;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub storage_path: String,
    pub openai_api_hostname: String,
    pub openai_api_key: String,
    pub anthropic_api_hostname: String,
    pub anthropic_api_key: String,
    pub max_tokens: u32,
    pub thinking_budget: u32,
    pub system_message: String,
}

impl AppConfig {
    /// Location of the persisted session snapshot.
    pub fn snapshot_path(&self) -> PathBuf {
        PathBuf::from(&self.storage_path).join("debug-llm.json")
    }
}

fn env_u32(key: &str, default: u32) -> u32 {
    match env::var(key) {
        Ok(val) => val.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid value for {}: {}", key, val);
            default
        }),
        Err(_) => default,
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let storage_path = env::var("DEBUG_LLM_STORAGE_PATH").unwrap_or("./".to_string());
        let openai_api_hostname = env::var("DEBUG_LLM_OPENAI_HOST")
            .unwrap_or_else(|_| "https://api.openai.com".to_string());
        let openai_api_key = env::var("OPENAI_API_KEY").unwrap_or_default();
        let anthropic_api_hostname = env::var("DEBUG_LLM_ANTHROPIC_HOST")
            .unwrap_or_else(|_| "https://api.anthropic.com".to_string());
        let anthropic_api_key = env::var("ANTHROPIC_API_KEY").unwrap_or_default();
        let max_tokens = env_u32("DEBUG_LLM_MAX_TOKENS", DEFAULT_MAX_TOKENS);
        let thinking_budget = env_u32("DEBUG_LLM_THINKING_BUDGET", DEFAULT_THINKING_BUDGET);
        let system_message = env::var("DEBUG_LLM_SYSTEM_MESSAGE")
            .unwrap_or_else(|_| "You are a helpful assistant.".to_string());

        Self {
            storage_path,
            openai_api_hostname,
            openai_api_key,
            anthropic_api_hostname,
            anthropic_api_key,
            max_tokens,
            thinking_budget,
            system_message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_path() {
        let config = AppConfig {
            storage_path: String::from("/tmp/debug-llm"),
            ..AppConfig::default()
        };
        assert_eq!(
            config.snapshot_path(),
            PathBuf::from("/tmp/debug-llm/debug-llm.json")
        );
    }

    #[test]
    fn test_env_u32_falls_back_when_unset() {
        assert_eq!(env_u32("DEBUG_LLM_TEST_UNSET_VALUE", 42), 42);
    }
}
