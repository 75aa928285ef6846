use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::error::SessionError;
use super::models::{DEFAULT_HUMAN_MESSAGE, DEFAULT_SYSTEM_MESSAGE, Message, Thread, ToolDefinition};

/// Values used to seed every new thread.
#[derive(Clone, Debug, PartialEq)]
pub struct ThreadSeed {
    pub system_message: String,
    pub default_model: Option<String>,
}

impl Default for ThreadSeed {
    fn default() -> Self {
        Self {
            system_message: DEFAULT_SYSTEM_MESSAGE.to_string(),
            default_model: None,
        }
    }
}

/// Owns every thread, the active thread pointer and the tool catalog.
///
/// Commands take `&mut self` and apply edits in place, queries take
/// `&self`. Nothing else mutates the state so sharing it across tasks
/// only needs a lock around the whole store (see `SharedStore`).
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionStore {
    #[serde(default)]
    threads: Vec<Thread>,
    #[serde(default)]
    active_thread_id: Option<Uuid>,
    #[serde(default)]
    tool_definitions: Vec<ToolDefinition>,
    #[serde(skip)]
    seed: ThreadSeed,
}

/// Parse a tool schema so bad JSON is caught when the tool is saved
/// rather than when a request is made. Schemas are JSON5 so unquoted
/// keys, single quotes, comments and trailing commas are accepted.
pub fn parse_schema(name: &str, schema: &str) -> Result<Value, SessionError> {
    json5::from_str::<Value>(schema).map_err(|e| SessionError::InvalidToolSchema {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

/// Pretty print a schema as plain JSON using two space indentation.
pub fn format_schema(schema: &str) -> Result<String, SessionError> {
    let value = parse_schema("", schema)?;
    Ok(serde_json::to_string_pretty(&value)?)
}

impl SessionStore {
    pub fn new(seed: ThreadSeed) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    pub fn set_seed(&mut self, seed: ThreadSeed) {
        self.seed = seed;
    }

    // Queries

    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    pub fn thread(&self, thread_id: Uuid) -> Option<&Thread> {
        self.threads.iter().find(|t| t.id == thread_id)
    }

    pub fn active_thread_id(&self) -> Option<Uuid> {
        self.active_thread_id
    }

    pub fn active_thread(&self) -> Option<&Thread> {
        self.active_thread_id.and_then(|id| self.thread(id))
    }

    pub fn state_at(&self, index: usize, thread_id: Uuid) -> Option<&Message> {
        self.thread(thread_id).and_then(|t| t.messages.get(index))
    }

    pub fn tool_definitions(&self) -> &[ToolDefinition] {
        &self.tool_definitions
    }

    pub fn tool_definition(&self, name: &str) -> Option<&ToolDefinition> {
        self.tool_definitions.iter().find(|t| t.name == name)
    }

    // Thread commands

    pub fn create_thread(&mut self) -> Uuid {
        let name = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let thread = Thread::new(
            &name,
            Vec::new(),
            vec![
                Message::system(&self.seed.system_message),
                Message::human(DEFAULT_HUMAN_MESSAGE),
                Message::model_choice(self.seed.default_model.as_deref()),
            ],
        );
        self.adopt_thread(thread)
    }

    /// Append a thread and make it the active one.
    pub(super) fn adopt_thread(&mut self, thread: Thread) -> Uuid {
        let id = thread.id;
        tracing::debug!("Adding thread {} ({})", id, thread.name);
        self.threads.push(thread);
        self.active_thread_id = Some(id);
        id
    }

    pub fn update_thread<F>(&mut self, thread_id: Uuid, update: F) -> Result<(), SessionError>
    where
        F: FnOnce(&mut Thread),
    {
        let thread = self.thread_mut(thread_id)?;
        update(thread);
        Ok(())
    }

    pub fn delete_thread(&mut self, thread_id: Uuid) {
        self.threads.retain(|t| t.id != thread_id);

        if self.active_thread_id == Some(thread_id) {
            self.active_thread_id = self.threads.first().map(|t| t.id);
        }
    }

    pub fn set_active_thread(&mut self, thread_id: Uuid) {
        self.active_thread_id = Some(thread_id);
    }

    /// Rename a thread. Surrounding whitespace is dropped and blank names
    /// are ignored.
    pub fn rename_thread(&mut self, thread_id: Uuid, name: &str) -> Result<(), SessionError> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(());
        }
        self.update_thread(thread_id, |thread| {
            thread.name = name.to_string();
            thread.touch();
        })
    }

    /// Copy messages `[0, index]` of a thread into a new active thread
    /// with no tools selected.
    pub fn fork_thread(&mut self, thread_id: Uuid, index: usize) -> Result<Uuid, SessionError> {
        let source = self
            .thread(thread_id)
            .ok_or(SessionError::ThreadNotFound(thread_id))?;
        if index >= source.messages.len() {
            return Err(SessionError::MessageIndexOutOfRange { thread_id, index });
        }
        let name = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let messages = source.messages[..=index].to_vec();
        Ok(self.adopt_thread(Thread::new(&name, Vec::new(), messages)))
    }

    pub fn update_state(
        &mut self,
        index: usize,
        thread_id: Uuid,
        state: Message,
    ) -> Result<(), SessionError> {
        let thread = self.thread_mut(thread_id)?;
        let slot = thread
            .messages
            .get_mut(index)
            .ok_or(SessionError::MessageIndexOutOfRange { thread_id, index })?;
        *slot = state;
        thread.touch();
        Ok(())
    }

    /// Drop every message after `index` so a response can be
    /// regenerated from that point.
    pub fn remove_states_after(&mut self, index: usize, thread_id: Uuid) -> Result<(), SessionError> {
        let thread = self.thread_mut(thread_id)?;
        thread.messages.truncate(index.saturating_add(1));
        thread.touch();
        Ok(())
    }

    // Tool catalog commands

    pub fn set_tool_definitions(&mut self, tool_definitions: Vec<ToolDefinition>) {
        self.tool_definitions = tool_definitions;
    }

    /// Add a tool to the catalog. Returns `false` without changing
    /// anything when the name is already taken.
    pub fn add_tool_definition(&mut self, tool: ToolDefinition) -> Result<bool, SessionError> {
        parse_schema(&tool.name, &tool.schema)?;
        if self.tool_definition(&tool.name).is_some() {
            return Ok(false);
        }
        self.tool_definitions.push(tool);
        Ok(true)
    }

    /// Replace the tool at `index`. Threads that selected the old name
    /// are left alone, as are any messages that reference it.
    pub fn update_tool_definition(
        &mut self,
        index: usize,
        tool: ToolDefinition,
    ) -> Result<(), SessionError> {
        if index >= self.tool_definitions.len() {
            return Ok(());
        }
        parse_schema(&tool.name, &tool.schema)?;
        let taken = self
            .tool_definitions
            .iter()
            .enumerate()
            .any(|(i, t)| i != index && t.name == tool.name);
        if taken {
            return Err(SessionError::DuplicateToolName(tool.name));
        }
        self.tool_definitions[index] = tool;
        Ok(())
    }

    /// Remove the tool at `index` from the catalog and from every
    /// thread's selection.
    pub fn delete_tool_definition(&mut self, index: usize) {
        if index >= self.tool_definitions.len() {
            return;
        }
        let removed = self.tool_definitions.remove(index);
        for thread in self.threads.iter_mut() {
            thread.tools.retain(|name| *name != removed.name);
        }
    }

    pub(super) fn tool_definitions_mut(&mut self) -> &mut Vec<ToolDefinition> {
        &mut self.tool_definitions
    }

    // Thread tool selection

    pub fn add_tool_to_thread(&mut self, thread_id: Uuid, tool_name: &str) {
        match self.thread_mut(thread_id) {
            Ok(thread) => {
                if !thread.tools.iter().any(|t| t == tool_name) {
                    thread.tools.push(tool_name.to_string());
                    thread.touch();
                }
            }
            Err(e) => tracing::warn!("Not adding tool {}: {}", tool_name, e),
        }
    }

    pub fn remove_tool_from_thread(&mut self, thread_id: Uuid, tool_name: &str) {
        match self.thread_mut(thread_id) {
            Ok(thread) => {
                thread.tools.retain(|t| t != tool_name);
                thread.touch();
            }
            Err(e) => tracing::warn!("Not removing tool {}: {}", tool_name, e),
        }
    }

    /// Clear pending flags left behind by requests that can no longer
    /// complete, e.g. after loading a snapshot.
    pub fn clear_pending(&mut self) {
        for thread in self.threads.iter_mut() {
            thread.is_pending = false;
        }
    }

    fn thread_mut(&mut self, thread_id: Uuid) -> Result<&mut Thread, SessionError> {
        self.threads
            .iter_mut()
            .find(|t| t.id == thread_id)
            .ok_or(SessionError::ThreadNotFound(thread_id))
    }
}
