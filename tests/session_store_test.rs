mod test_utils;

#[cfg(test)]
mod tests {
    use debug_llm::ai::{ModelRegistry, request_model};
    use debug_llm::session::{ContentBlock, Message, SessionStore, ToolDefinition, snapshot};
    use serde_json::{Value, json};

    use crate::test_utils::{Reply, register_scripted, test_store};

    #[tokio::test]
    async fn it_moves_a_thread_between_stores() {
        let store = test_store("m1");
        let mut registry = ModelRegistry::new();
        register_scripted(&mut registry, "m1", Reply::Text("hello".to_string()));

        let id = {
            let mut state = store.write().unwrap();
            state
                .add_tool_definition(ToolDefinition::new("foo", "Does foo", "{}"))
                .unwrap();
            let id = state.create_thread();
            state.rename_thread(id, "Greeting").unwrap();
            state.add_tool_to_thread(id, "foo");
            id
        };
        request_model(&store, &registry, id, 2).await.unwrap();

        let (exported, tools) = {
            let state = store.read().unwrap();
            (
                state.export_thread(id).unwrap(),
                state.export_tool_definitions().unwrap(),
            )
        };

        let mut other = SessionStore::default();
        assert_eq!(other.import_tool_definitions(&tools).unwrap(), 1);
        let imported = other.import_thread(&exported).unwrap();

        assert_ne!(imported, id);
        assert_eq!(other.active_thread_id(), Some(imported));
        let thread = other.thread(imported).unwrap();
        let original = store.read().unwrap().thread(id).unwrap().clone();
        assert_eq!(thread.name, "Greeting");
        assert_eq!(thread.tools, vec!["foo".to_string()]);
        assert_eq!(thread.messages, original.messages);
        assert_eq!(other.tool_definition("foo").unwrap().description, "Does foo");
    }

    #[test]
    fn it_imports_threads_with_provider_blocks() {
        let exported = r#"{
            "name": "Weather",
            "tools": ["weather"],
            "messages": [
                {"type": "human", "content": "Weather in Paris?"},
                {"type": "model-choice", "current": "claude-3-7-sonnet-latest", "chosen": "claude-3-7-sonnet-latest"},
                {"type": "ai", "content": [
                    {"type": "text", "text": "Checking."},
                    {"type": "tool_use", "id": "toolu_1", "name": "weather", "input": {"city": "Paris"}},
                    {"type": "redacted_thinking", "data": "abc"}
                ], "inputTokens": 12, "outputTokens": 8,
                 "toolCalls": [{"id": "toolu_1", "name": "weather", "args": {"city": "Paris"}}]},
                {"type": "tool", "toolCallId": "toolu_1", "name": "weather", "args": {"city": "Paris"}, "content": "Sunny"}
            ]
        }"#;

        let mut store = SessionStore::default();
        let id = store.import_thread(exported).unwrap();
        match store.state_at(2, id) {
            Some(Message::Ai { content, .. }) => {
                assert_eq!(content.len(), 3);
                assert_eq!(
                    content[1],
                    ContentBlock::Other(json!({
                        "type": "tool_use",
                        "id": "toolu_1",
                        "name": "weather",
                        "input": {"city": "Paris"}
                    }))
                );
            }
            other => panic!("Expected ai message, got {:?}", other),
        }

        // Exporting again keeps the raw blocks
        let again: Value = serde_json::from_str(&store.export_thread(id).unwrap()).unwrap();
        let original: Value = serde_json::from_str(exported).unwrap();
        assert_eq!(again["messages"], original["messages"]);
    }

    #[test]
    fn it_restores_a_snapshot_without_pending_requests() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("debug-llm.json");

        let mut store = SessionStore::default();
        let id = store.create_thread();
        store
            .update_thread(id, |t| {
                t.is_pending = true;
                t.error = Some("timeout".to_string());
            })
            .unwrap();
        snapshot::save(&store, &path).unwrap();

        let restored = snapshot::load(&path).unwrap();
        let thread = restored.thread(id).unwrap();
        assert!(!thread.is_pending);
        assert_eq!(thread.error.as_deref(), Some("timeout"));
        assert_eq!(restored.active_thread_id(), Some(id));
    }

    #[test]
    fn it_rejects_a_corrupt_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("debug-llm.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(snapshot::load(&path).is_err());
    }

    #[test]
    fn it_deletes_tools_from_every_thread() {
        let mut store = SessionStore::default();
        store
            .add_tool_definition(ToolDefinition::new("foo", "Foo", "{}"))
            .unwrap();
        store
            .add_tool_definition(ToolDefinition::new("bar", "Bar", "{}"))
            .unwrap();
        let first = store.create_thread();
        let second = store.create_thread();
        for id in [first, second] {
            store.add_tool_to_thread(id, "foo");
            store.add_tool_to_thread(id, "bar");
        }

        store.delete_tool_definition(0);

        assert_eq!(store.tool_definitions().len(), 1);
        for id in [first, second] {
            assert_eq!(store.thread(id).unwrap().tools, vec!["bar".to_string()]);
        }
        // Messages referencing the tool stay as they were
        assert_eq!(store.state_at(1, first), Some(&Message::human("Hello, how are you?")));
    }
}
