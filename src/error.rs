//! Failures the provisioning pipeline can classify.
//!
//! Everything else (path resolution, temp file I/O, spawn failures) travels as
//! plain `anyhow` context.

use std::fmt;
use std::path::PathBuf;

/// A host tool that could not be resolved on `PATH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingTool {
    pub command: String,
    pub package: String,
}

impl fmt::Display for MissingTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  {} (install: {})", self.command, self.package)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error(
        "Missing required commands: {}\n{}\nPlease install the missing commands and try again.",
        names(.0),
        lines(.0)
    )]
    MissingTools(Vec<MissingTool>),

    #[error("Image file does not exist: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error(
        "Image file already exists at {}. Please choose a different VM name or remove the existing image.",
        .0.display()
    )]
    DestinationExists(PathBuf),

    #[error("A VM with the name '{0}' already exists. Please choose a different name.")]
    DomainExists(String),

    #[error("{what}: {status}{}{}", command_suffix(.command), output_suffix(.output))]
    Subprocess {
        what: String,
        status: String,
        command: Option<String>,
        output: String,
    },
}

impl ProvisionError {
    /// Names of the missing tools, if this is a [`ProvisionError::MissingTools`].
    pub fn missing_tools(&self) -> Vec<&str> {
        match self {
            ProvisionError::MissingTools(tools) => {
                tools.iter().map(|t| t.command.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }
}

fn names(tools: &[MissingTool]) -> String {
    tools
        .iter()
        .map(|t| t.command.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn lines(tools: &[MissingTool]) -> String {
    tools
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

fn command_suffix(command: &Option<String>) -> String {
    match command {
        Some(command) => format!("\nCommand: {command}"),
        None => String::new(),
    }
}

fn output_suffix(output: &str) -> String {
    if output.is_empty() {
        String::new()
    } else {
        format!("\nOutput: {output}")
    }
}
