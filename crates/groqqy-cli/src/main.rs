use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use groqqy::agent::Agent;
use groqqy::developer::default_registry;
use groqqy::providers::groq::GroqProvider;
use groqqy::registry::ToolRegistry;

mod configuration;
mod instructions;
mod logging;
mod session;

use configuration::Settings;
use instructions::GroqqyHome;
use session::Session;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Model to use (overrides provider.model from the settings)
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Maximum model calls per request
    #[arg(long, global = true)]
    max_iterations: Option<usize>,

    /// Extra file to append to the system instruction, may be repeated
    #[arg(short, long = "context", value_name = "FILE", global = true)]
    context: Vec<PathBuf>,

    /// Additional instructions appended after boot and context files
    #[arg(long, value_name = "TEXT", global = true)]
    prompt: Option<String>,

    /// Start without the built-in file and shell tools
    #[arg(long, global = true)]
    no_tools: bool,

    /// Declare a tool the platform executes, e.g. browser_search
    #[arg(long = "platform-tool", value_name = "TYPE", global = true)]
    platform_tools: Vec<String>,

    /// Log filter, e.g. debug or groqqy=info (defaults to GROQQY_LOG, RUST_LOG, then warn)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Write the transcript to this file when done (.md or .html)
    #[arg(long, value_name = "FILE", global = true)]
    export: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Start an interactive chat (the default)
    Chat,

    /// Run a single request and exit
    Run {
        #[arg(value_name = "PROMPT")]
        task: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_level.as_deref(), cli.log_json)?;

    let home = GroqqyHome::from_home();
    home.ensure_exists()?;

    let agent = build_agent(&cli, &home)?;
    tracing::info!(
        strategy = %agent.strategy(),
        max_iterations = agent.max_iterations(),
        "Agent ready"
    );

    match cli.command {
        Some(Command::Run { task }) => run_once(agent, &task, cli.export.as_ref()).await,
        Some(Command::Chat) | None => {
            let mut session = Session::new(agent);
            session.start().await?;
            if let Some(path) = &cli.export {
                session::export(session.agent(), path)?;
            }
            Ok(())
        }
    }
}

async fn run_once(mut agent: Agent, task: &str, export: Option<&PathBuf>) -> Result<()> {
    let result = agent.run(task).await?;

    session::render_markdown(&result.response);
    session::print_summary(&result);

    if let Some(path) = export {
        session::export(&agent, path)?;
    }
    Ok(())
}

fn build_agent(cli: &Cli, home: &GroqqyHome) -> Result<Agent> {
    let mut settings = Settings::load(Some(home.config_file().as_path()))
        .with_context(|| format!("Failed to load {}", home.config_file().display()))?;
    if let Some(model) = &cli.model {
        settings.provider.model = model.clone();
    }
    if let Some(max_iterations) = cli.max_iterations {
        settings.agent.max_iterations = max_iterations;
    }

    let instruction = home.load_system_instruction(&cli.context, cli.prompt.as_deref());
    let config = settings.provider.into_config(Some(instruction))?;
    let provider = GroqProvider::new(config).context("Failed to create the Groq provider")?;

    let tools = build_registry(cli.no_tools, &cli.platform_tools);
    Ok(Agent::new(Box::new(provider), tools).with_max_iterations(settings.agent.max_iterations))
}

fn build_registry(no_tools: bool, platform_tools: &[String]) -> Option<ToolRegistry> {
    let mut registry = if no_tools {
        ToolRegistry::new()
    } else {
        default_registry()
    };
    for tool_type in platform_tools {
        registry.register_platform_tool(tool_type.as_str());
    }

    if registry.is_empty() {
        None
    } else {
        Some(registry)
    }
}
