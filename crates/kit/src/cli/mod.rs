//! Command engine
//!
//! A command tree is plain data: every [`Command`] carries its name, aliases,
//! declared arguments and options, an optional matcher and validator, and a
//! required executor. Resolution ([`resolver`]) is a pure recursive walk over
//! that tree; the [`dispatcher`] validates and runs whatever it finds.

pub mod args;
pub mod dispatcher;
pub mod registry;
pub mod resolver;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::config::KitConfig;

pub use args::ParsedArgs;
pub use dispatcher::Dispatcher;
pub use registry::{CommandRegistry, RegistryError};
pub use resolver::{find_command, find_command_at};

/// Boxed future returned by every executor
pub type CommandFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// Runs a command; its side effects are the command's entire behavior
pub type Executor = Arc<dyn Fn(CommandContext) -> CommandFuture + Send + Sync>;

/// Claims a command from the full argument set, regardless of position
pub type Matcher = fn(&ParsedArgs) -> bool;

/// Returns a human-readable rejection reason, or `None` to accept
pub type Validator = fn(&CommandContext) -> Option<String>;

/// Declared positional argument (help text and validator input only)
#[derive(Debug, Clone)]
pub struct ArgSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
    pub variadic: bool,
}

impl ArgSpec {
    pub fn required(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            required: true,
            variadic: false,
        }
    }

    pub fn optional(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            required: false,
            variadic: false,
        }
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    /// `<name>`, `[name]`, `[name...]`
    pub fn usage(&self) -> String {
        let dots = if self.variadic { "..." } else { "" };
        if self.required {
            format!("<{}{}>", self.name, dots)
        } else {
            format!("[{}{}]", self.name, dots)
        }
    }
}

/// Declared option
#[derive(Debug, Clone)]
pub struct OptionSpec {
    pub long: &'static str,
    pub short: Option<char>,
    pub description: &'static str,
    pub takes_value: bool,
}

impl OptionSpec {
    pub fn flag(long: &'static str, description: &'static str) -> Self {
        Self {
            long,
            short: None,
            description,
            takes_value: false,
        }
    }

    pub fn value(long: &'static str, description: &'static str) -> Self {
        Self {
            long,
            short: None,
            description,
            takes_value: true,
        }
    }

    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    pub fn usage(&self) -> String {
        let mut usage = match self.short {
            Some(s) => format!("-{}, --{}", s, self.long),
            None => format!("    --{}", self.long),
        };
        if self.takes_value {
            usage.push_str(" <value>");
        }
        usage
    }
}

/// One invocable operation in the command tree
#[derive(Clone)]
pub struct Command {
    pub(crate) name: String,
    pub(crate) aliases: Vec<String>,
    pub(crate) description: String,
    pub(crate) hidden: bool,
    pub(crate) sub_commands: Vec<Command>,
    pub(crate) args: Vec<ArgSpec>,
    pub(crate) options: Vec<OptionSpec>,
    pub(crate) matcher: Option<Matcher>,
    pub(crate) validator: Option<Validator>,
    pub(crate) executor: Executor,
}

impl Command {
    pub fn new<F, Fut>(name: impl Into<String>, executor: F) -> Self
    where
        F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let executor: Executor =
            Arc::new(move |ctx: CommandContext| -> CommandFuture { Box::pin(executor(ctx)) });
        Self {
            name: name.into(),
            aliases: Vec::new(),
            description: String::new(),
            hidden: false,
            sub_commands: Vec::new(),
            args: Vec::new(),
            options: Vec::new(),
            matcher: None,
            validator: None,
            executor,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Leave the command out of the help overview
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn sub_command(mut self, command: Command) -> Self {
        self.sub_commands.push(command);
        self
    }

    pub fn arg(mut self, arg: ArgSpec) -> Self {
        self.args.push(arg);
        self
    }

    pub fn option(mut self, option: OptionSpec) -> Self {
        self.options.push(option);
        self
    }

    pub fn matcher(mut self, matcher: Matcher) -> Self {
        self.matcher = Some(matcher);
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alias_list(&self) -> &[String] {
        &self.aliases
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn sub_commands(&self) -> &[Command] {
        &self.sub_commands
    }

    pub fn args(&self) -> &[ArgSpec] {
        &self.args
    }

    pub fn options(&self) -> &[OptionSpec] {
        &self.options
    }

    /// Whether `token` is this command's name or one of its aliases
    pub fn answers_to(&self, token: &str) -> bool {
        (!self.name.is_empty() && self.name == token) || self.aliases.iter().any(|a| a == token)
    }

    /// Whether the matcher claims this argument set
    pub fn claims(&self, args: &ParsedArgs) -> bool {
        self.matcher.is_some_and(|m| m(args))
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("sub_commands", &self.sub_commands)
            .field("args", &self.args)
            .field("has_matcher", &self.matcher.is_some())
            .field("has_validator", &self.validator.is_some())
            .finish()
    }
}

/// Per-invocation bundle handed to validators and executors
#[derive(Clone)]
pub struct CommandContext {
    /// Full tokenized command line
    pub args: Arc<ParsedArgs>,
    /// Resolved project configuration
    pub config: Arc<KitConfig>,
    /// Positional depth the command matched at
    pub depth: usize,
    /// The tree the command was resolved from
    pub registry: Arc<CommandRegistry>,
}

impl CommandContext {
    /// Positional arguments after the command path
    pub fn command_args(&self) -> &[String] {
        let positionals = self.args.positionals();
        positionals.get(self.depth + 1..).unwrap_or(&[])
    }

    /// One positional argument after the command path
    pub fn command_arg(&self, index: usize) -> Option<&str> {
        self.command_args().get(index).map(String::as_str)
    }
}
