use std::sync::{Arc, RwLock};

mod error;
pub use error::SessionError;

mod models;
pub use models::{
    ContentBlock, DEFAULT_HUMAN_MESSAGE, DEFAULT_SYSTEM_MESSAGE, Message, Thread,
    ToolCallRequest, ToolDefinition,
};

mod store;
pub use store::{SessionStore, ThreadSeed, format_schema, parse_schema};

mod export;
pub use export::export_file_name;

pub mod snapshot;

/// The store shared between the front end and in flight requests.
pub type SharedStore = Arc<RwLock<SessionStore>>;

pub fn shared(store: SessionStore) -> SharedStore {
    Arc::new(RwLock::new(store))
}
