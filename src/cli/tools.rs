use std::fs;
use std::path::PathBuf;

use anyhow::{Result, anyhow, bail};
use clap::Subcommand;
use uuid::Uuid;

use super::workspace::Workspace;
use crate::session::{ToolDefinition, format_schema};

#[derive(Subcommand)]
pub enum ToolCommand {
    /// List tool definitions in the catalog
    List {},
    /// Add a tool definition
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        /// JSON-Schema for the tool arguments
        #[arg(long, conflicts_with = "schema_file")]
        schema: Option<String>,
        /// Read the JSON-Schema from a file
        #[arg(long)]
        schema_file: Option<PathBuf>,
    },
    /// Replace the tool definition at an index
    Update {
        #[arg(long)]
        index: usize,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        #[arg(long, conflicts_with = "schema_file")]
        schema: Option<String>,
        #[arg(long)]
        schema_file: Option<PathBuf>,
    },
    /// Delete a tool definition and remove it from every thread
    Delete {
        #[arg(long)]
        index: usize,
    },
    /// Offer a tool to the model in a thread
    Select {
        name: String,
        #[arg(long)]
        thread: Option<Uuid>,
    },
    /// Stop offering a tool in a thread
    Deselect {
        name: String,
        #[arg(long)]
        thread: Option<Uuid>,
    },
    /// Write the catalog to a JSON file
    Export {
        #[arg(long, default_value = "tools.json")]
        out: PathBuf,
    },
    /// Merge tool definitions from a JSON file
    Import { file: PathBuf },
}

fn read_schema(schema: Option<String>, schema_file: Option<PathBuf>) -> Result<String> {
    match (schema, schema_file) {
        (Some(schema), _) => Ok(schema),
        (None, Some(path)) => Ok(fs::read_to_string(path)?),
        (None, None) => Err(anyhow!("Provide --schema or --schema-file")),
    }
}

fn tool_definition(
    name: String,
    description: String,
    schema: Option<String>,
    schema_file: Option<PathBuf>,
) -> Result<ToolDefinition> {
    let name = name.trim().to_string();
    if name.is_empty() {
        bail!("Tool name can't be empty");
    }
    let schema = format_schema(&read_schema(schema, schema_file)?)?;
    Ok(ToolDefinition {
        name,
        description,
        schema,
    })
}

pub fn run(workspace: &Workspace, command: ToolCommand) -> Result<()> {
    match command {
        ToolCommand::List {} => {
            let state = workspace.store.read().expect("Unable to read shared state");
            for (index, tool) in state.tool_definitions().iter().enumerate() {
                println!("[{}] {}: {}", index, tool.name, tool.description);
            }
            return Ok(());
        }
        ToolCommand::Add {
            name,
            description,
            schema,
            schema_file,
        } => {
            let tool = tool_definition(name, description, schema, schema_file)?;
            let name = tool.name.clone();
            let added = workspace
                .store
                .write()
                .expect("Unable to write shared state")
                .add_tool_definition(tool)?;
            if !added {
                bail!("Tool name already exists: {}", name);
            }
        }
        ToolCommand::Update {
            index,
            name,
            description,
            schema,
            schema_file,
        } => {
            let tool = tool_definition(name, description, schema, schema_file)?;
            workspace
                .store
                .write()
                .expect("Unable to write shared state")
                .update_tool_definition(index, tool)?;
        }
        ToolCommand::Delete { index } => {
            workspace
                .store
                .write()
                .expect("Unable to write shared state")
                .delete_tool_definition(index);
        }
        ToolCommand::Select { name, thread } => {
            let id = workspace.thread_or_active(thread)?;
            let mut state = workspace.store.write().expect("Unable to write shared state");
            if state.tool_definition(&name).is_none() {
                bail!("No tool named {}", name);
            }
            state.add_tool_to_thread(id, &name);
        }
        ToolCommand::Deselect { name, thread } => {
            let id = workspace.thread_or_active(thread)?;
            workspace
                .store
                .write()
                .expect("Unable to write shared state")
                .remove_tool_from_thread(id, &name);
        }
        ToolCommand::Export { out } => {
            let data = workspace
                .store
                .read()
                .expect("Unable to read shared state")
                .export_tool_definitions()?;
            fs::write(&out, data)?;
            println!("Exported tools to {}", out.display());
            return Ok(());
        }
        ToolCommand::Import { file } => {
            let data = fs::read_to_string(&file)?;
            let imported = workspace
                .store
                .write()
                .expect("Unable to write shared state")
                .import_tool_definitions(&data)?;
            println!("Imported {} tools", imported);
        }
    }

    workspace.save()
}
