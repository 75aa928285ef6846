use anyhow::{Result, bail};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use uuid::Uuid;

use super::threads::{format_message, format_thread};
use super::workspace::Workspace;
use crate::ai::request_model;
use crate::session::{Message, SessionStore};

#[derive(Debug, PartialEq)]
pub enum NextTurn {
    /// Everything is filled in, request the model choice at this index
    Request(usize),
    /// Tool results that still need to be typed in
    AwaitingToolResults(usize),
}

/// Put a line typed by the user into the thread. Lines fill empty tool
/// results first (in order), otherwise they replace the human turn in
/// front of the last model choice.
pub fn fill_next_turn(store: &mut SessionStore, thread_id: Uuid, line: &str) -> Result<NextTurn> {
    let Some(thread) = store.thread(thread_id) else {
        bail!("Thread not found: {}", thread_id);
    };
    let Some(choice_index) = thread.last_model_choice() else {
        bail!("Thread has no model choice");
    };

    let before = &thread.messages[..choice_index];
    let tool_start = before
        .iter()
        .rposition(|m| !matches!(m, Message::Tool { .. }))
        .map(|i| i + 1)
        .unwrap_or(0);
    let empty_tools: Vec<usize> = (tool_start..choice_index)
        .filter(|i| matches!(&before[*i], Message::Tool { content, .. } if content.is_empty()))
        .collect();

    if let Some(&index) = empty_tools.first() {
        let mut message = before[index].clone();
        message.set_text(0, line);
        store.update_state(index, thread_id, message)?;
        return Ok(match empty_tools.len() - 1 {
            0 => NextTurn::Request(choice_index),
            remaining => NextTurn::AwaitingToolResults(remaining),
        });
    }

    match choice_index.checked_sub(1).map(|i| before[i].kind()) {
        Some("human") => {
            store.update_state(choice_index - 1, thread_id, Message::human(line))?;
            Ok(NextTurn::Request(choice_index))
        }
        Some("tool") => bail!(
            "Tool results are already filled in, use `request` to send them as they are"
        ),
        _ => bail!("There is no human or tool turn before the model choice"),
    }
}

pub async fn run(workspace: &Workspace, thread: Option<Uuid>) -> Result<()> {
    let thread_id = match workspace.thread_or_active(thread) {
        Ok(id) => id,
        Err(_) if thread.is_none() => workspace
            .store
            .write()
            .expect("Unable to write shared state")
            .create_thread(),
        Err(e) => return Err(e),
    };

    {
        let state = workspace.store.read().expect("Unable to read shared state");
        if let Some(thread) = state.thread(thread_id) {
            println!("{}", format_thread(thread));
        }
    }

    let mut rl = DefaultEditor::new()?;

    loop {
        let readline = rl.readline(">>> ");
        match readline {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                let next = {
                    let mut state = workspace.store.write().expect("Unable to write shared state");
                    fill_next_turn(&mut state, thread_id, &line)
                };
                match next {
                    Ok(NextTurn::Request(index)) => {
                        if let Err(e) =
                            request_model(&workspace.store, &workspace.registry, thread_id, index)
                                .await
                        {
                            println!("Error: {}", e);
                        }
                        let state = workspace.store.read().expect("Unable to read shared state");
                        if let Some(thread) = state.thread(thread_id) {
                            if let Some(error) = &thread.error {
                                println!("Error: {}", error);
                            }
                            for (i, message) in thread.messages.iter().enumerate().skip(index + 1) {
                                println!("{}", format_message(i, message));
                            }
                        }
                    }
                    Ok(NextTurn::AwaitingToolResults(remaining)) => {
                        println!("{} tool results left to fill in", remaining);
                    }
                    Err(e) => println!("Error: {}", e),
                }
                workspace.save()?;
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    workspace.save()
}
