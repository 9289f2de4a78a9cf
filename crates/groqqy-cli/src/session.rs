use anyhow::Result;
use bat::WrappingMode;
use cliclack::{input, spinner};
use console::style;
use std::path::{Path, PathBuf};

use groqqy::agent::{Agent, AgentRunResult};
use groqqy::exporter::ConversationExporter;

const THEME: &str = "zenburn";

/// One line of REPL input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Exit,
    Reset,
    Export(PathBuf),
    Message(String),
    Empty,
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let lowered = line.to_ascii_lowercase();

        match lowered.as_str() {
            "" => return ReplCommand::Empty,
            "quit" | "exit" | "bye" => return ReplCommand::Exit,
            "reset" => return ReplCommand::Reset,
            _ => {}
        }

        if lowered.starts_with("export ") {
            let target = line["export ".len()..].trim();
            if !target.is_empty() {
                return ReplCommand::Export(PathBuf::from(target));
            }
        }
        ReplCommand::Message(line.to_string())
    }
}

/// Render model output as Markdown, falling back to plain text
pub fn render_markdown(content: &str) {
    let printed = bat::PrettyPrinter::new()
        .input(bat::Input::from_bytes(content.as_bytes()))
        .theme(THEME)
        .language("Markdown")
        .wrapping_mode(WrappingMode::Character)
        .print();
    match printed {
        Ok(_) => println!(),
        Err(e) => {
            tracing::debug!(error = %e, "Falling back to plain output");
            println!("{}", content);
        }
    }
}

pub fn export(agent: &Agent, path: &Path) -> Result<()> {
    let format = ConversationExporter::new(agent.conversation()).save(path)?;
    println!(
        "{}",
        style(format!("Exported conversation to {} ({:?})", path.display(), format)).dim()
    );
    Ok(())
}

pub fn print_summary(result: &AgentRunResult) {
    println!(
        "{}",
        style(format!(
            "Iterations: {} | Tool calls: {} | Cost: ${:.6}",
            result.iterations, result.tool_calls_made, result.total_cost
        ))
        .dim()
    );
}

/// Interactive chat over a single long-lived agent
pub struct Session {
    agent: Agent,
}

impl Session {
    pub fn new(agent: Agent) -> Self {
        Session { agent }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub async fn start(&mut self) -> Result<()> {
        println!(
            "Groqqy - your helpful assistant {}",
            style("- type \"exit\" to end, \"reset\" to clear, \"export <file>\" to save").dim()
        );
        println!();

        loop {
            let line: String = input("You:").placeholder("").interact()?;

            match ReplCommand::parse(&line) {
                ReplCommand::Empty => continue,
                ReplCommand::Exit => break,
                ReplCommand::Reset => {
                    self.agent.reset();
                    println!("{}", style("Conversation reset").dim());
                }
                ReplCommand::Export(path) => {
                    if let Err(e) = export(&self.agent, &path) {
                        eprintln!("{} {:#}", style("Error:").red(), e);
                    }
                }
                ReplCommand::Message(text) => self.send(&text).await,
            }
        }

        println!("Goodbye! Total cost: ${:.6}", self.agent.total_cost());
        Ok(())
    }

    async fn send(&mut self, text: &str) {
        let before = self.agent.total_cost();
        let spin = spinner();
        spin.start("awaiting reply");

        let outcome = self.agent.run(text).await;
        spin.stop("");

        match outcome {
            Ok(result) => {
                render_markdown(&result.response);
                println!(
                    "{}",
                    style(format!(
                        "Cost: ${:.6} | Total: ${:.6}",
                        result.total_cost - before,
                        result.total_cost
                    ))
                    .dim()
                );
                println!();
            }
            Err(e) => {
                tracing::error!(error = %e, "Agent run failed");
                eprintln!("{} {:#}\n", style("Error:").red(), e);
            }
        }
    }
}
