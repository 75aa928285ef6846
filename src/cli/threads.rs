use std::fs;
use std::path::PathBuf;

use anyhow::{Result, bail};
use uuid::Uuid;

use super::workspace::Workspace;
use crate::session::{ContentBlock, Message, Thread, export_file_name};

/// Render a message for the terminal.
pub fn format_message(index: usize, message: &Message) -> String {
    match message {
        Message::System { content } => format!("[{}] system: {}", index, content),
        Message::Human { content } => format!("[{}] human: {}", index, content),
        Message::Ai {
            content,
            input_tokens,
            output_tokens,
            tool_calls,
        } => {
            let mut out = format!(
                "[{}] ai ({} in / {} out):",
                index, input_tokens, output_tokens
            );
            for block in content {
                match block {
                    ContentBlock::Thinking { thinking, .. } => {
                        out.push_str(&format!("\n    thinking: {}", thinking))
                    }
                    ContentBlock::Text { text } => out.push_str(&format!("\n    {}", text)),
                    ContentBlock::Other(block) => out.push_str(&format!("\n    {}", block)),
                }
            }
            for call in tool_calls {
                out.push_str(&format!(
                    "\n    tool call {} {}({})",
                    call.id,
                    call.name,
                    serde_json::Value::Object(call.args.clone())
                ));
            }
            out
        }
        Message::Tool {
            tool_call_id,
            name,
            content,
            ..
        } => format!("[{}] tool {} ({}): {}", index, name, tool_call_id, content),
        Message::ModelChoice { current, chosen } => format!(
            "[{}] model-choice: chosen={} current={}",
            index,
            chosen.as_deref().unwrap_or("-"),
            current.as_deref().unwrap_or("-")
        ),
    }
}

pub fn format_thread(thread: &Thread) -> String {
    let mut out = format!("{} {}", thread.id, thread.name);
    if !thread.tools.is_empty() {
        out.push_str(&format!("\ntools: {}", thread.tools.join(", ")));
    }
    for (index, message) in thread.messages.iter().enumerate() {
        out.push('\n');
        out.push_str(&format_message(index, message));
    }
    if thread.is_pending {
        out.push_str("\n(pending)");
    }
    if let Some(error) = &thread.error {
        out.push_str(&format!("\nerror: {}", error));
    }
    out
}

pub fn list(workspace: &Workspace) {
    let state = workspace.store.read().expect("Unable to read shared state");
    for thread in state.threads() {
        let marker = if state.active_thread_id() == Some(thread.id) {
            "*"
        } else {
            " "
        };
        println!(
            "{} {} {} ({} messages, updated {})",
            marker,
            thread.id,
            thread.name,
            thread.messages.len(),
            thread.updated_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
}

pub fn create(workspace: &Workspace) -> Result<()> {
    let id = workspace
        .store
        .write()
        .expect("Unable to write shared state")
        .create_thread();
    workspace.save()?;
    println!("{}", id);
    Ok(())
}

pub fn show(workspace: &Workspace, thread: Option<Uuid>) -> Result<()> {
    let id = workspace.thread_or_active(thread)?;
    let state = workspace.store.read().expect("Unable to read shared state");
    if let Some(thread) = state.thread(id) {
        println!("{}", format_thread(thread));
    }
    Ok(())
}

pub fn activate(workspace: &Workspace, thread: Uuid) -> Result<()> {
    let id = workspace.thread_or_active(Some(thread))?;
    workspace
        .store
        .write()
        .expect("Unable to write shared state")
        .set_active_thread(id);
    workspace.save()
}

pub fn rename(workspace: &Workspace, thread: Option<Uuid>, name: &str) -> Result<()> {
    let id = workspace.thread_or_active(thread)?;
    workspace
        .store
        .write()
        .expect("Unable to write shared state")
        .rename_thread(id, name)?;
    workspace.save()
}

pub fn delete(workspace: &Workspace, thread: Uuid) -> Result<()> {
    workspace
        .store
        .write()
        .expect("Unable to write shared state")
        .delete_thread(thread);
    workspace.save()
}

/// Edit the message at `index`. Text turns take `value` as their new
/// content, AI turns replace the text block at `block` and model-choice
/// turns take `value` as the chosen model.
pub fn set(
    workspace: &Workspace,
    thread: Option<Uuid>,
    index: usize,
    block: usize,
    value: &str,
) -> Result<()> {
    let id = workspace.thread_or_active(thread)?;
    let mut state = workspace.store.write().expect("Unable to write shared state");
    let Some(mut message) = state.state_at(index, id).cloned() else {
        bail!("No message at index {}", index);
    };

    if let Message::ModelChoice { chosen, .. } = &mut message {
        if !workspace.registry.contains(value) {
            bail!(
                "Unknown model {}. Available: {}",
                value,
                workspace.registry.ids().join(", ")
            );
        }
        *chosen = Some(value.to_string());
    } else if !message.set_text(block, value) {
        bail!("Message {} has no editable text at block {}", index, block);
    }

    state.update_state(index, id, message)?;
    drop(state);
    workspace.save()
}

pub fn truncate(workspace: &Workspace, thread: Option<Uuid>, index: usize) -> Result<()> {
    let id = workspace.thread_or_active(thread)?;
    workspace
        .store
        .write()
        .expect("Unable to write shared state")
        .remove_states_after(index, id)?;
    workspace.save()
}

pub fn export(workspace: &Workspace, thread: Option<Uuid>, out: Option<PathBuf>) -> Result<()> {
    let id = workspace.thread_or_active(thread)?;
    let state = workspace.store.read().expect("Unable to read shared state");
    let data = state.export_thread(id)?;
    let path = match (out, state.thread(id)) {
        (Some(path), _) => path,
        (None, Some(thread)) => PathBuf::from(export_file_name(thread)),
        (None, None) => bail!("Thread not found: {}", id),
    };
    fs::write(&path, data)?;
    println!("Exported thread to {}", path.display());
    Ok(())
}

pub fn import(workspace: &Workspace, file: PathBuf) -> Result<()> {
    let data = fs::read_to_string(&file)?;
    let id = workspace
        .store
        .write()
        .expect("Unable to write shared state")
        .import_thread(&data)?;
    workspace.save()?;
    println!("{}", id);
    Ok(())
}
