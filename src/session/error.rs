use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Thread not found: {0}")]
    ThreadNotFound(Uuid),

    #[error("Message index {index} is out of range for thread {thread_id}")]
    MessageIndexOutOfRange { thread_id: Uuid, index: usize },

    #[error("Message {0} is not a model choice")]
    NotModelChoice(usize),

    #[error("No model chosen for message {0}")]
    ModelNotChosen(usize),

    #[error("Invalid thread data format: {0}")]
    InvalidThreadData(String),

    #[error("Invalid tool definitions data format: {0}")]
    InvalidToolDefinitions(String),

    #[error("Invalid schema for tool {name}: {reason}")]
    InvalidToolSchema { name: String, reason: String },

    #[error("Tool name already exists: {0}")]
    DuplicateToolName(String),

    #[error("Failed to serialize export: {0}")]
    Export(#[from] serde_json::Error),
}
