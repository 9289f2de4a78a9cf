use anyhow::{Context, Result};
use indoc::indoc;
use std::path::{Path, PathBuf};

pub const DEFAULT_BOOT: &str = indoc! {"
    # Groqqy Boot Instructions

    You are Groqqy, a helpful AI assistant powered by Groq's fast LLM inference.

    ## Your Capabilities

    You have access to tools for:
    - **read_file**: Read contents of files
    - **run_command**: Execute shell commands (use carefully!)
    - **search_files**: Find files matching patterns
    - **search_content**: Search for text in files

    ## Guidelines

    - Keep responses concise and friendly
    - Use tools when they help answer the question
    - Explain what you're doing when using tools
    - If a command might be destructive, ask first
    - Provide context with your answers

    ## Custom Instructions

    Add your own instructions below this line:

    ---

"};

/// Used when neither boot file, context files nor extra instructions load
pub const DEFAULT_INSTRUCTION: &str = indoc! {"
    You are Groqqy, a helpful assistant.
    You have access to tools for reading files, running commands, and searching.
    Keep responses concise and friendly. Use tools when needed to help the user."};

/// The `~/.groqqy` directory: boot instructions, a knowledge folder and settings
#[derive(Debug, Clone)]
pub struct GroqqyHome {
    root: PathBuf,
}

impl GroqqyHome {
    /// `~/.groqqy`, or `./.groqqy` when the home directory is unknown
    pub fn from_home() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::at(home.join(".groqqy"))
    }

    pub fn at<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn boot_file(&self) -> PathBuf {
        self.root.join("boot.md")
    }

    pub fn knowledge_dir(&self) -> PathBuf {
        self.root.join("knowledge")
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// Create the directory layout and a default boot file if they are missing
    pub fn ensure_exists(&self) -> Result<()> {
        std::fs::create_dir_all(self.knowledge_dir())
            .with_context(|| format!("Failed to create {}", self.knowledge_dir().display()))?;

        let boot_file = self.boot_file();
        if !boot_file.exists() {
            std::fs::write(&boot_file, DEFAULT_BOOT)
                .with_context(|| format!("Failed to write {}", boot_file.display()))?;
            tracing::info!(path = %boot_file.display(), "Created default boot instructions");
        }
        Ok(())
    }

    /// Boot instructions, then each context file, then the extra prompt.
    /// Unreadable context files are skipped.
    pub fn load_system_instruction(
        &self,
        context_files: &[PathBuf],
        extra_prompt: Option<&str>,
    ) -> String {
        let mut parts = Vec::new();

        if let Some(boot) = read_optional(&self.boot_file()) {
            parts.push(boot);
        }

        for path in context_files {
            if let Some(content) = read_optional(path) {
                parts.push(format!(
                    "\n# Additional Context: {}\n\n{}",
                    path.display(),
                    content
                ));
            }
        }

        if let Some(prompt) = extra_prompt.filter(|p| !p.is_empty()) {
            parts.push(format!("\n# Additional Instructions\n\n{}", prompt));
        }

        if parts.is_empty() {
            return DEFAULT_INSTRUCTION.to_string();
        }
        parts.join("\n\n")
    }
}

fn read_optional(path: &Path) -> Option<String> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "Instruction file not found");
        return None;
    }
    match std::fs::read_to_string(path) {
        Ok(content) if !content.is_empty() => Some(content),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Could not read instruction file");
            None
        }
    }
}
