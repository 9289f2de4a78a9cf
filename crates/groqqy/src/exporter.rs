use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::path::Path;

use crate::models::message::{Message, ToolCallRequest};
use crate::models::role::Role;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const CSS: &str = r#"  <style>
    * { margin: 0; padding: 0; box-sizing: border-box; }
    body {
      font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Arial, sans-serif;
      background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
      padding: 20px;
      line-height: 1.6;
    }
    .container {
      max-width: 900px;
      margin: 0 auto;
      background: white;
      border-radius: 12px;
      box-shadow: 0 10px 40px rgba(0,0,0,0.2);
      overflow: hidden;
    }
    header {
      background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
      color: white;
      padding: 30px;
      text-align: center;
    }
    header h1 { font-size: 2em; margin-bottom: 10px; }
    .meta { display: flex; justify-content: center; gap: 20px; font-size: 0.9em; opacity: 0.9; }
    .conversation { padding: 30px; }
    .message { margin-bottom: 25px; border-radius: 8px; padding: 20px; border-left: 4px solid; }
    .message.user { background: #e3f2fd; border-left-color: #2196f3; }
    .message.assistant { background: #f3e5f5; border-left-color: #9c27b0; }
    .message.tool { background: #fff3e0; border-left-color: #ff9800; }
    .message-header { font-weight: bold; font-size: 1.1em; margin-bottom: 12px; color: #333; }
    .message-content { color: #555; white-space: pre-wrap; word-wrap: break-word; }
    .tool-calls { background: rgba(0,0,0,0.03); border-radius: 6px; padding: 15px; margin-bottom: 15px; }
    .tool-calls-header { font-weight: bold; margin-bottom: 10px; color: #666; }
    .tool-call {
      background: white;
      border-radius: 4px;
      padding: 12px;
      margin-bottom: 8px;
      border: 1px solid rgba(0,0,0,0.1);
    }
    .tool-name { font-weight: bold; color: #9c27b0; margin-bottom: 8px; }
    .tool-args, .tool-result {
      background: #2d2d2d;
      color: #f8f8f2;
      padding: 12px;
      border-radius: 4px;
      overflow-x: auto;
      font-family: 'Courier New', Courier, monospace;
      font-size: 0.9em;
    }
    .tool-id { font-size: 0.85em; color: #666; margin-bottom: 10px; font-family: monospace; }
    footer {
      background: #f5f5f5;
      padding: 20px;
      text-align: center;
      color: #666;
      font-size: 0.9em;
      border-top: 1px solid #e0e0e0;
    }
  </style>"#;

/// Output format of an exported transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Markdown,
    Html,
}

impl ExportFormat {
    /// `.html`/`.htm` export as HTML, anything else as Markdown
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("html") | Some("htm") => ExportFormat::Html,
            _ => ExportFormat::Markdown,
        }
    }
}

/// Renders a conversation as a readable Markdown or HTML transcript
pub struct ConversationExporter<'a> {
    history: &'a [Message],
    timestamp: DateTime<Local>,
}

impl<'a> ConversationExporter<'a> {
    pub fn new(history: &'a [Message]) -> Self {
        Self {
            history,
            timestamp: Local::now(),
        }
    }

    fn stamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    pub fn to_markdown(&self) -> String {
        let mut lines = vec![
            "# Groqqy Conversation".to_string(),
            format!("\n**Date**: {}", self.stamp()),
            format!("**Messages**: {}", self.history.len()),
            "\n---\n".to_string(),
        ];

        for (i, message) in self.history.iter().enumerate() {
            let number = i + 1;
            match message.role {
                Role::User => {
                    lines.push(format!("## Message {}: User\n", number));
                    lines.push(format!("{}\n", message.content));
                }
                Role::Assistant => {
                    lines.push(format!("## Message {}: Assistant\n", number));
                    if message.has_tool_calls() {
                        lines.push("**Tool Calls:**\n".to_string());
                        for call in message.tool_calls() {
                            lines.push(format!("- **{}**", call.name()));
                            lines.push("  ```json".to_string());
                            lines.push(format!("  {}", pretty_arguments(call)));
                            lines.push("  ```".to_string());
                        }
                        lines.push(String::new());
                    }
                    if !message.content.is_empty() {
                        lines.push(format!("{}\n", message.content));
                    }
                }
                Role::Tool => {
                    lines.push(format!("## Message {}: Tool Result\n", number));
                    lines.push(format!(
                        "**Tool Call ID**: `{}`\n",
                        message.tool_call_id.as_deref().unwrap_or("unknown")
                    ));
                    lines.push("**Result:**\n".to_string());
                    lines.push("```".to_string());
                    lines.push(message.content.clone());
                    lines.push("```\n".to_string());
                }
            }
        }

        lines.push("\n---\n".to_string());
        lines.push(format!("*Exported by Groqqy on {}*\n", self.stamp()));
        lines.join("\n")
    }

    pub fn to_html(&self, include_css: bool) -> String {
        let mut html = vec![
            "<!DOCTYPE html>".to_string(),
            "<html lang='en'>".to_string(),
            "<head>".to_string(),
            "  <meta charset='UTF-8'>".to_string(),
            "  <meta name='viewport' content='width=device-width, initial-scale=1.0'>".to_string(),
            "  <title>Groqqy Conversation</title>".to_string(),
        ];
        if include_css {
            html.push(CSS.to_string());
        }
        html.push("</head>".to_string());
        html.push("<body>".to_string());
        html.push("  <div class='container'>".to_string());
        html.push("    <header>".to_string());
        html.push("      <h1>Groqqy Conversation</h1>".to_string());
        html.push("      <div class='meta'>".to_string());
        html.push(format!("        <span>{}</span>", self.stamp()));
        html.push(format!("        <span>{} messages</span>", self.history.len()));
        html.push("      </div>".to_string());
        html.push("    </header>".to_string());
        html.push("    <div class='conversation'>".to_string());

        for message in self.history {
            html.push(format!("      <div class='message {}'>", message.role));
            match message.role {
                Role::User => {
                    html.push("        <div class='message-header'>User</div>".to_string());
                    html.push(content_div(&message.content));
                }
                Role::Assistant => {
                    html.push("        <div class='message-header'>Assistant</div>".to_string());
                    if message.has_tool_calls() {
                        html.push("        <div class='tool-calls'>".to_string());
                        html.push(
                            "          <div class='tool-calls-header'>Tool Calls:</div>".to_string(),
                        );
                        for call in message.tool_calls() {
                            html.push("          <div class='tool-call'>".to_string());
                            html.push(format!(
                                "            <div class='tool-name'>{}</div>",
                                escape_html(call.name())
                            ));
                            html.push(format!(
                                "            <pre class='tool-args'>{}</pre>",
                                escape_html(&pretty_arguments(call))
                            ));
                            html.push("          </div>".to_string());
                        }
                        html.push("        </div>".to_string());
                    }
                    if !message.content.is_empty() {
                        html.push(content_div(&message.content));
                    }
                }
                Role::Tool => {
                    html.push("        <div class='message-header'>Tool Result</div>".to_string());
                    html.push(format!(
                        "        <div class='tool-id'>ID: {}</div>",
                        escape_html(message.tool_call_id.as_deref().unwrap_or("unknown"))
                    ));
                    html.push(format!(
                        "        <pre class='tool-result'>{}</pre>",
                        escape_html(&message.content)
                    ));
                }
            }
            html.push("      </div>".to_string());
        }

        html.push("    </div>".to_string());
        html.push("    <footer>".to_string());
        html.push(format!("      <p>Exported by Groqqy on {}</p>", self.stamp()));
        html.push("    </footer>".to_string());
        html.push("  </div>".to_string());
        html.push("</body>".to_string());
        html.push("</html>".to_string());
        html.join("\n")
    }

    /// Write the transcript, picking the format from the file extension
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<ExportFormat> {
        let path = path.as_ref();
        let format = ExportFormat::from_path(path);
        let rendered = match format {
            ExportFormat::Markdown => self.to_markdown(),
            ExportFormat::Html => self.to_html(true),
        };
        std::fs::write(path, rendered)
            .with_context(|| format!("Failed to write transcript to {}", path.display()))?;
        tracing::info!(path = %path.display(), format = ?format, "Exported conversation");
        Ok(format)
    }
}

fn content_div(content: &str) -> String {
    format!(
        "        <div class='message-content'>{}</div>",
        escape_html(content)
    )
}

/// Arguments pretty-printed when they are valid JSON, raw otherwise
fn pretty_arguments(call: &ToolCallRequest) -> String {
    call.parse_arguments()
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| call.arguments().to_string())
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
