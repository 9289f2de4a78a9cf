use serde_json::json;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::errors::{AgentError, AgentResult};
use crate::registry::ToolRegistry;
use crate::tool::{ParamType, ToolArgs, ToolFunction};

pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Search tools report at most this many hits
pub const MAX_SEARCH_RESULTS: usize = 20;

pub async fn read_file(file_path: String) -> AgentResult<String> {
    tokio::fs::read_to_string(&file_path)
        .await
        .map_err(|e| AgentError::ExecutionError(format!("Error reading file {}: {}", file_path, e)))
}

/// Run a shell command, returning stdout with any stderr appended
pub async fn run_command(command: String) -> AgentResult<String> {
    let child = Command::new("sh")
        .arg("-c")
        .arg(&command)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output();

    let output = tokio::time::timeout(COMMAND_TIMEOUT, child)
        .await
        .map_err(|_| {
            AgentError::ExecutionError(format!(
                "Command timed out after {} seconds",
                COMMAND_TIMEOUT.as_secs()
            ))
        })?
        .map_err(|e| AgentError::ExecutionError(format!("Error running command: {}", e)))?;

    let mut result = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
        result.push_str(&format!("\nErrors: {}", stderr));
    }
    Ok(result)
}

pub async fn search_files(pattern: String, path: String) -> AgentResult<String> {
    let lines = first_lines(
        Command::new("find")
            .arg(&path)
            .args(["-name", pattern.as_str(), "-type", "f"]),
    )
    .await?;
    Ok(or_placeholder(lines, "No files found"))
}

pub async fn search_content(query: String, path: String) -> AgentResult<String> {
    let lines =
        first_lines(Command::new("grep").args(["-r", "--", query.as_str(), path.as_str()])).await?;
    Ok(or_placeholder(lines, "No matches found"))
}

/// Stdout of a search command, cut to [`MAX_SEARCH_RESULTS`] lines.
/// Exit status is ignored: grep and find report "nothing found" that way.
async fn first_lines(command: &mut Command) -> AgentResult<Vec<String>> {
    let output = command
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| AgentError::ExecutionError(format!("Error searching: {}", e)))?;

    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(MAX_SEARCH_RESULTS)
        .map(str::to_string)
        .collect())
}

fn or_placeholder(lines: Vec<String>, placeholder: &str) -> String {
    if lines.is_empty() {
        placeholder.to_string()
    } else {
        lines.join("\n")
    }
}

fn read_file_tool() -> ToolFunction {
    ToolFunction::new("read_file", |args: ToolArgs| async move {
        Ok::<_, anyhow::Error>(read_file(args.get("file_path")?).await?)
    })
    .doc("Read and return contents of a file.")
    .param("file_path", ParamType::String)
}

fn run_command_tool() -> ToolFunction {
    ToolFunction::new("run_command", |args: ToolArgs| async move {
        Ok::<_, anyhow::Error>(run_command(args.get("command")?).await?)
    })
    .doc("Execute a shell command and return output.")
    .param("command", ParamType::String)
}

fn search_files_tool() -> ToolFunction {
    ToolFunction::new("search_files", |args: ToolArgs| async move {
        Ok::<_, anyhow::Error>(search_files(args.get("pattern")?, args.get("path")?).await?)
    })
    .doc("Find files matching a pattern.")
    .param("pattern", ParamType::String)
    .param_with_default("path", ParamType::String, json!("."))
}

fn search_content_tool() -> ToolFunction {
    ToolFunction::new("search_content", |args: ToolArgs| async move {
        Ok::<_, anyhow::Error>(search_content(args.get("query")?, args.get("path")?).await?)
    })
    .doc("Search for text in files.")
    .param("query", ParamType::String)
    .param_with_default("path", ParamType::String, json!("."))
}

/// The file and shell tools every interactive session starts with
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register_function(read_file_tool(), None);
    registry.register_function(run_command_tool(), None);
    registry.register_function(search_files_tool(), None);
    registry.register_function(search_content_tool(), None);
    registry
}
