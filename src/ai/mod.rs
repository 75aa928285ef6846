mod models;
pub use models::{BoxedChatModel, ChatModel, ChatTurn, ModelRegistry, ModelResponse, ToolSpec};

mod request;
pub use request::{request_model, resend_in_new_thread, resolve_tools, to_chat_turns};
