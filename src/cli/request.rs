use anyhow::{Result, anyhow};
use uuid::Uuid;

use super::threads::format_message;
use super::workspace::Workspace;
use crate::ai::{request_model, resend_in_new_thread};

fn latest_model_choice(workspace: &Workspace, thread_id: Uuid) -> Result<usize> {
    let state = workspace.store.read().expect("Unable to read shared state");
    state
        .thread(thread_id)
        .and_then(|t| t.last_model_choice())
        .ok_or(anyhow!("Thread {} has no model choice to request", thread_id))
}

/// Print everything after `index` along with any recorded error.
fn print_since(workspace: &Workspace, thread_id: Uuid, index: usize) {
    let state = workspace.store.read().expect("Unable to read shared state");
    let Some(thread) = state.thread(thread_id) else {
        return;
    };
    if let Some(error) = &thread.error {
        eprintln!("Error: {}", error);
        return;
    }
    for (i, message) in thread.messages.iter().enumerate().skip(index + 1) {
        println!("{}", format_message(i, message));
    }
}

pub async fn run(workspace: &Workspace, thread: Option<Uuid>, index: Option<usize>) -> Result<()> {
    let thread_id = workspace.thread_or_active(thread)?;
    let index = match index {
        Some(index) => index,
        None => latest_model_choice(workspace, thread_id)?,
    };

    let result = request_model(&workspace.store, &workspace.registry, thread_id, index).await;
    workspace.save()?;
    result?;

    print_since(workspace, thread_id, index);
    Ok(())
}

pub async fn resend(workspace: &Workspace, thread: Option<Uuid>, index: usize) -> Result<()> {
    let thread_id = workspace.thread_or_active(thread)?;
    let result = resend_in_new_thread(&workspace.store, &workspace.registry, thread_id, index).await;
    workspace.save()?;
    let fork_id = result?;

    println!("{}", fork_id);
    print_since(workspace, fork_id, index);
    Ok(())
}
