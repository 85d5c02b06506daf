//! The fixed table of commands understood by the dispatcher.

use std::collections::BTreeMap;

/// Static description of one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandDefinition {
    /// Canonical command name.
    pub name: &'static str,
    /// One-line help text.
    pub description: &'static str,
    /// Whether the command is executed by the backend.
    pub requires_server: bool,
    /// Whether the command needs non-blank input text.
    pub requires_input: bool,
}

impl CommandDefinition {
    const fn server(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            requires_server: true,
            requires_input: true,
        }
    }

    const fn local(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            requires_server: false,
            requires_input: false,
        }
    }

    /// Returns `true` when the command can run given the backend readiness.
    #[must_use]
    pub const fn is_available(&self, server_ready: bool) -> bool {
        !self.requires_server || server_ready
    }
}

const BUILTIN_COMMANDS: &[CommandDefinition] = &[
    CommandDefinition::server(
        "summarise",
        "Generate a summary of the input text. Usage: 'summarise' (20-30%) or \
         'summarise <percentage>' (e.g. 'summarise 50' for a 45-55% range)",
    ),
    CommandDefinition::server("tone", "Analyse and adjust the tone of the text"),
    CommandDefinition::server("keywords", "Extract key words and phrases from the text"),
    CommandDefinition::server("rephrase", "Rephrase the text while maintaining meaning"),
    CommandDefinition::server(
        "rewrite",
        "Rewrite the text with improved clarity and structure",
    ),
    CommandDefinition::local("help", "Show available commands and their descriptions"),
    CommandDefinition::local("clear", "Clear the input text"),
];

/// Immutable name-to-definition map, iterated in name order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRegistry {
    commands: BTreeMap<&'static str, CommandDefinition>,
}

impl CommandRegistry {
    /// Registry holding the built-in commands.
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_definitions(BUILTIN_COMMANDS.iter().copied())
    }

    /// Builds a registry from arbitrary definitions. Later duplicates replace
    /// earlier ones.
    #[must_use]
    pub fn from_definitions(definitions: impl IntoIterator<Item = CommandDefinition>) -> Self {
        Self {
            commands: definitions
                .into_iter()
                .map(|definition| (definition.name, definition))
                .collect(),
        }
    }

    /// Looks up a command by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CommandDefinition> {
        self.commands.get(name)
    }

    /// Returns `true` if `name` is a registered command.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Command names in order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.commands.keys().copied()
    }

    /// Definitions in name order.
    pub fn definitions(&self) -> impl Iterator<Item = &CommandDefinition> {
        self.commands.values()
    }

    /// Number of registered commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` when no commands are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
