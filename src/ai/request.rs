//! Runs a model for a model-choice turn and writes the result back into
//! the thread.
//!
//! The tool calling loop is manual. When the model asks for tools the
//! thread gets one empty tool message per call for the user to fill in
//! before requesting again, nothing is executed here.

use anyhow::{Error, Result, anyhow};
use uuid::Uuid;

use super::models::{BoxedChatModel, ChatTurn, ModelRegistry, ModelResponse, ToolSpec};
use crate::session::{Message, SessionError, SharedStore, Thread, ToolDefinition, parse_schema};

/// Convert thread messages into turns for the model. Model-choice
/// turns are control messages and never sent.
pub fn to_chat_turns(messages: &[Message]) -> Vec<ChatTurn> {
    messages
        .iter()
        .filter_map(|message| match message {
            Message::System { content } => Some(ChatTurn::System(content.clone())),
            Message::Human { content } => Some(ChatTurn::Human(content.clone())),
            Message::Ai {
                content,
                tool_calls,
                ..
            } => Some(ChatTurn::Ai {
                content: content.clone(),
                tool_calls: tool_calls.clone(),
            }),
            Message::Tool {
                tool_call_id,
                content,
                ..
            } => Some(ChatTurn::Tool {
                tool_call_id: tool_call_id.clone(),
                content: content.clone(),
            }),
            Message::ModelChoice { .. } => None,
        })
        .collect()
}

/// Look up the thread's selected tools in the catalog. Names that are no
/// longer in the catalog are skipped.
pub fn resolve_tools(
    selected: &[String],
    catalog: &[ToolDefinition],
) -> Result<Vec<ToolSpec>, SessionError> {
    selected
        .iter()
        .filter_map(|name| catalog.iter().find(|t| t.name == *name))
        .map(|tool| {
            Ok(ToolSpec {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: parse_schema(&tool.name, &tool.schema)?,
            })
        })
        .collect()
}

/// Append the model's answer followed by whatever the user needs to fill
/// in next and a fresh model choice for the following round.
fn append_response(thread: &mut Thread, response: ModelResponse, chosen: &str) {
    let placeholders: Vec<Message> = if response.tool_calls.is_empty() {
        vec![Message::human("")]
    } else {
        response
            .tool_calls
            .iter()
            .map(Message::tool_placeholder)
            .collect()
    };

    thread.messages.push(Message::Ai {
        content: response.content,
        input_tokens: response.input_tokens,
        output_tokens: response.output_tokens,
        tool_calls: response.tool_calls,
    });
    thread.messages.extend(placeholders);
    thread.messages.push(Message::model_choice(Some(chosen)));
    thread.touch();
}

/// Validate that `message_index` is a model choice with a model picked.
fn chosen_model(thread: &Thread, message_index: usize) -> Result<String, SessionError> {
    match thread.messages.get(message_index) {
        Some(Message::ModelChoice {
            chosen: Some(chosen),
            ..
        }) if !chosen.is_empty() => Ok(chosen.clone()),
        Some(Message::ModelChoice { .. }) => Err(SessionError::ModelNotChosen(message_index)),
        Some(_) => Err(SessionError::NotModelChoice(message_index)),
        None => Err(SessionError::MessageIndexOutOfRange {
            thread_id: thread.id,
            index: message_index,
        }),
    }
}

/// Record the model about to answer, drop the old continuation and
/// gather everything needed for the call.
fn prepare_request(
    store: &SharedStore,
    registry: &ModelRegistry,
    thread_id: Uuid,
    message_index: usize,
    chosen: &str,
) -> Result<(BoxedChatModel, Vec<ChatTurn>, Vec<ToolSpec>), Error> {
    let model = registry
        .build(chosen)
        .ok_or(anyhow!("Unknown model: {}", chosen))?;

    let mut state = store.write().expect("Unable to write shared state");
    state.update_state(
        message_index,
        thread_id,
        Message::ModelChoice {
            current: Some(chosen.to_string()),
            chosen: Some(chosen.to_string()),
        },
    )?;
    state.remove_states_after(message_index, thread_id)?;

    let thread = state
        .thread(thread_id)
        .ok_or(SessionError::ThreadNotFound(thread_id))?;
    let tools = resolve_tools(&thread.tools, state.tool_definitions())?;
    let turns = to_chat_turns(&thread.messages[..message_index]);

    Ok((model, turns, tools))
}

/// Ask the model chosen at `message_index` to answer the messages before
/// it.
///
/// Failing preconditions (missing thread, not a model choice, no model
/// chosen) return an error without touching the thread. Everything that
/// goes wrong after that, including the model call itself, is recorded
/// on the thread as `error` and nothing is appended.
pub async fn request_model(
    store: &SharedStore,
    registry: &ModelRegistry,
    thread_id: Uuid,
    message_index: usize,
) -> Result<(), SessionError> {
    let chosen = {
        let mut state = store.write().expect("Unable to write shared state");
        let thread = state
            .thread(thread_id)
            .ok_or(SessionError::ThreadNotFound(thread_id))?;
        let chosen = chosen_model(thread, message_index)?;
        state.update_thread(thread_id, |thread| {
            thread.is_pending = true;
            thread.error = None;
        })?;
        chosen
    };

    let outcome = match prepare_request(store, registry, thread_id, message_index, &chosen) {
        Ok((model, turns, tools)) => {
            tracing::debug!("Requesting {} with messages {:?}", chosen, turns);
            let resp = model.invoke(&turns, &tools).await;
            tracing::debug!("Response from {}: {:?}", chosen, resp);
            resp
        }
        Err(e) => Err(e),
    };

    let mut state = store.write().expect("Unable to write shared state");
    state.update_thread(thread_id, |thread| {
        thread.is_pending = false;
        match outcome {
            Ok(response) => append_response(thread, response, &chosen),
            Err(e) => {
                tracing::warn!("Request to {} failed for thread {}: {:#}", chosen, thread_id, e);
                thread.error = Some(format!("{:#}", e));
            }
        }
    })
}

/// Copy the thread up to `message_index` into a new thread and request
/// the model there, leaving the original untouched. Returns the new
/// thread's id.
pub async fn resend_in_new_thread(
    store: &SharedStore,
    registry: &ModelRegistry,
    thread_id: Uuid,
    message_index: usize,
) -> Result<Uuid, SessionError> {
    let fork_id = {
        let mut state = store.write().expect("Unable to write shared state");
        let thread = state
            .thread(thread_id)
            .ok_or(SessionError::ThreadNotFound(thread_id))?;
        chosen_model(thread, message_index)?;
        state.fork_thread(thread_id, message_index)?
    };
    request_model(store, registry, fork_id, message_index).await?;
    Ok(fork_id)
}
