//! Import and export of threads and the tool catalog as pretty printed
//! JSON files.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::error::SessionError;
use super::models::{Message, Thread, ToolDefinition};
use super::store::SessionStore;

const IMPORTED_THREAD_NAME: &str = "Imported Thread";

#[derive(Serialize)]
struct ThreadExport<'a> {
    name: &'a str,
    tools: &'a [String],
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

#[derive(Deserialize)]
struct ThreadImport {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    tools: Option<Vec<String>>,
    #[serde(default)]
    messages: Option<Vec<Message>>,
    #[serde(default)]
    error: Option<String>,
}

/// File name used when saving an exported thread,
/// e.g. `thread-Weather-2025-06-01.json`.
pub fn export_file_name(thread: &Thread) -> String {
    let name = if thread.name.is_empty() {
        "export"
    } else {
        thread.name.as_str()
    };
    format!(
        "thread-{}-{}.json",
        name,
        chrono::Utc::now().format("%Y-%m-%d")
    )
}

fn non_empty_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value[key].as_str().filter(|s| !s.is_empty())
}

impl SessionStore {
    pub fn export_thread(&self, thread_id: Uuid) -> Result<String, SessionError> {
        let thread = self
            .thread(thread_id)
            .ok_or(SessionError::ThreadNotFound(thread_id))?;
        let data = ThreadExport {
            name: &thread.name,
            tools: &thread.tools,
            messages: &thread.messages,
            error: thread.error.as_deref(),
        };
        Ok(serde_json::to_string_pretty(&data)?)
    }

    /// Create a new active thread from exported JSON. Missing fields
    /// fall back to defaults and the thread always gets a fresh id.
    pub fn import_thread(&mut self, thread_data: &str) -> Result<Uuid, SessionError> {
        let parsed: ThreadImport = serde_json::from_str(thread_data)
            .map_err(|e| SessionError::InvalidThreadData(e.to_string()))?;

        let name = parsed
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| IMPORTED_THREAD_NAME.to_string());
        let mut thread = Thread::new(
            &name,
            parsed.tools.unwrap_or_default(),
            parsed.messages.unwrap_or_default(),
        );
        thread.error = parsed.error;

        Ok(self.adopt_thread(thread))
    }

    pub fn export_tool_definitions(&self) -> Result<String, SessionError> {
        Ok(serde_json::to_string_pretty(self.tool_definitions())?)
    }

    /// Merge tool definitions from exported JSON into the catalog.
    /// Entries missing a name, description or schema are skipped and
    /// existing names win. Returns how many tools were added.
    pub fn import_tool_definitions(&mut self, tools_data: &str) -> Result<usize, SessionError> {
        let parsed: Value = serde_json::from_str(tools_data)
            .map_err(|e| SessionError::InvalidToolDefinitions(e.to_string()))?;
        let entries = parsed.as_array().ok_or_else(|| {
            SessionError::InvalidToolDefinitions(
                "Data must be an array of tool definitions".to_string(),
            )
        })?;

        let catalog = self.tool_definitions_mut();
        let mut imported = 0;
        for entry in entries {
            let (Some(name), Some(description), Some(schema)) = (
                non_empty_str(entry, "name"),
                non_empty_str(entry, "description"),
                non_empty_str(entry, "schema"),
            ) else {
                tracing::debug!("Skipping incomplete tool definition: {}", entry);
                continue;
            };
            if catalog.iter().any(|t| t.name == name) {
                continue;
            }
            catalog.push(ToolDefinition::new(name, description, schema));
            imported += 1;
        }

        Ok(imported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::models::{ContentBlock, ToolCallRequest};
    use serde_json::json;

    #[test]
    fn test_export_then_import_thread() {
        let mut store = SessionStore::default();
        let id = store.create_thread();
        store.add_tool_to_thread(id, "foo");
        store
            .update_thread(id, |t| {
                t.name = "Weather".to_string();
                t.error = Some("boom".to_string());
                t.messages.push(Message::Ai {
                    content: vec![ContentBlock::text("hello")],
                    input_tokens: 5,
                    output_tokens: 2,
                    tool_calls: vec![ToolCallRequest {
                        id: "c1".to_string(),
                        name: "foo".to_string(),
                        args: json!({"x": 1}).as_object().unwrap().clone(),
                    }],
                });
            })
            .unwrap();

        let exported = store.export_thread(id).unwrap();
        let imported = store.import_thread(&exported).unwrap();

        assert_ne!(imported, id);
        assert_eq!(store.active_thread_id(), Some(imported));
        let original = store.thread(id).unwrap();
        let copy = store.thread(imported).unwrap();
        assert_eq!(copy.name, original.name);
        assert_eq!(copy.tools, original.tools);
        assert_eq!(copy.messages, original.messages);
        assert_eq!(copy.error, original.error);
        assert!(!copy.is_pending);
    }

    #[test]
    fn test_export_thread_shape() {
        let mut store = SessionStore::default();
        let id = store.create_thread();
        let exported: Value = serde_json::from_str(&store.export_thread(id).unwrap()).unwrap();
        let keys: Vec<&String> = exported.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 3);
        assert!(exported.get("id").is_none());
        assert_eq!(exported["messages"][2]["type"], "model-choice");
    }

    #[test]
    fn test_export_missing_thread() {
        let store = SessionStore::default();
        assert!(matches!(
            store.export_thread(Uuid::new_v4()),
            Err(SessionError::ThreadNotFound(_))
        ));
    }

    #[test]
    fn test_import_thread_defaults() {
        let mut store = SessionStore::default();
        let id = store.import_thread("{}").unwrap();
        let thread = store.thread(id).unwrap();
        assert_eq!(thread.name, "Imported Thread");
        assert!(thread.tools.is_empty());
        assert!(thread.messages.is_empty());
        assert!(thread.error.is_none());

        let id = store.import_thread(r#"{"name": ""}"#).unwrap();
        assert_eq!(store.thread(id).unwrap().name, "Imported Thread");
    }

    #[test]
    fn test_import_thread_invalid_json_leaves_store_unchanged() {
        let mut store = SessionStore::default();
        let id = store.create_thread();

        let result = store.import_thread("not json");
        assert!(matches!(result, Err(SessionError::InvalidThreadData(_))));

        let result = store.import_thread(r#"{"messages": [{"type": "bogus"}]}"#);
        assert!(matches!(result, Err(SessionError::InvalidThreadData(_))));

        assert_eq!(store.threads().len(), 1);
        assert_eq!(store.active_thread_id(), Some(id));
    }

    #[test]
    fn test_tool_definitions_round_trip() {
        let mut store = SessionStore::default();
        store
            .add_tool_definition(ToolDefinition::new("foo", "Foo", r#"{"type":"object"}"#))
            .unwrap();
        let exported = store.export_tool_definitions().unwrap();

        let mut other = SessionStore::default();
        assert_eq!(other.import_tool_definitions(&exported).unwrap(), 1);
        assert_eq!(other.tool_definitions(), store.tool_definitions());
    }

    #[test]
    fn test_import_tool_definitions_skips_incomplete_and_duplicates() {
        let mut store = SessionStore::default();
        store
            .add_tool_definition(ToolDefinition::new("existing", "Old", "{}"))
            .unwrap();
        let data = json!([
            {"name": "foo", "description": "Foo", "schema": "{}"},
            {"name": "bar", "schema": "{}"},
            {"name": "existing", "description": "New", "schema": "{}"},
            {"name": "baz", "description": "Baz", "schema": "{}"},
            {"name": "baz", "description": "Second baz", "schema": "{}"}
        ])
        .to_string();

        assert_eq!(store.import_tool_definitions(&data).unwrap(), 2);
        let names: Vec<&str> = store
            .tool_definitions()
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, vec!["existing", "foo", "baz"]);
        assert_eq!(store.tool_definition("existing").unwrap().description, "Old");
        assert_eq!(store.tool_definition("baz").unwrap().description, "Baz");
    }

    #[test]
    fn test_import_tool_definitions_requires_array() {
        let mut store = SessionStore::default();
        let result = store.import_tool_definitions(r#"{"name": "foo"}"#);
        assert!(matches!(result, Err(SessionError::InvalidToolDefinitions(_))));
        let result = store.import_tool_definitions("[");
        assert!(matches!(result, Err(SessionError::InvalidToolDefinitions(_))));
        assert!(store.tool_definitions().is_empty());
    }

    #[test]
    fn test_export_file_name() {
        let thread = Thread::new("Weather", vec![], vec![]);
        let file_name = export_file_name(&thread);
        assert!(file_name.starts_with("thread-Weather-"));
        assert!(file_name.ends_with(".json"));
    }
}
