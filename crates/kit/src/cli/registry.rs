//! Immutable command tree

use std::collections::HashSet;
use thiserror::Error;

use super::{Command, OptionSpec};

/// Configuration mistakes in a command tree, fatal at startup
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Command at '{0}' has neither a name nor a matcher")]
    Unaddressable(String),

    #[error("Token '{token}' is used by more than one command under '{parent}'")]
    Duplicate { token: String, parent: String },
}

/// Root of the command tree; built once per process, never mutated
#[derive(Debug)]
pub struct CommandRegistry {
    commands: Vec<Command>,
}

impl CommandRegistry {
    pub fn new(commands: Vec<Command>) -> Result<Self, RegistryError> {
        validate_siblings(&commands, "<root>")?;
        Ok(Self { commands })
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Every option declared anywhere in the tree, outermost first
    pub fn options(&self) -> Vec<OptionSpec> {
        let mut options = Vec::new();
        collect_options(&self.commands, &mut options);
        options
    }
}

fn validate_siblings(commands: &[Command], parent: &str) -> Result<(), RegistryError> {
    let mut seen: HashSet<&str> = HashSet::new();

    for (index, command) in commands.iter().enumerate() {
        if command.name.trim().is_empty() && command.matcher.is_none() {
            return Err(RegistryError::Unaddressable(format!("{}[{}]", parent, index)));
        }

        let tokens = std::iter::once(command.name.as_str())
            .filter(|name| !name.is_empty())
            .chain(command.aliases.iter().map(String::as_str));
        for token in tokens {
            if !seen.insert(token) {
                return Err(RegistryError::Duplicate {
                    token: token.to_string(),
                    parent: parent.to_string(),
                });
            }
        }

        let path = if parent == "<root>" {
            command.name.clone()
        } else {
            format!("{} {}", parent, command.name)
        };
        validate_siblings(&command.sub_commands, &path)?;
    }

    Ok(())
}

fn collect_options(commands: &[Command], options: &mut Vec<OptionSpec>) {
    for command in commands {
        options.extend(command.options.iter().cloned());
        collect_options(&command.sub_commands, options);
    }
}
