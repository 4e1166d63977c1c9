//! Validate-then-execute for resolved commands

use std::sync::Arc;
use tracing::debug;

use super::{find_command_at, Command, CommandContext, CommandRegistry, ParsedArgs};
use crate::config::KitConfig;
use crate::error::{KitError, Result};

/// Runs command lines against a registry
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self { registry }
    }

    /// Resolve, validate and execute one command line.
    ///
    /// The executor is only invoked when the validator (if any) accepts the
    /// context. Executor errors come back unchanged inside
    /// [`KitError::Execution`].
    pub async fn run(&self, args: ParsedArgs, config: Arc<KitConfig>) -> Result<()> {
        let args = Arc::new(args);

        let (command, depth) = find_command_at(&args, self.registry.commands(), 0)
            .ok_or_else(|| KitError::CommandNotFound(unmatched_path(&args, self.registry.commands())))?;

        debug!(command = command.name(), depth, "resolved command");

        let ctx = CommandContext {
            args: Arc::clone(&args),
            config,
            depth,
            registry: Arc::clone(&self.registry),
        };

        if let Some(validator) = command.validator {
            if let Some(reason) = validator(&ctx).filter(|r| !r.is_empty()) {
                return Err(KitError::Validation(reason));
            }
        }

        (command.executor)(ctx).await.map_err(KitError::Execution)
    }
}

/// Positional tokens up to and including the first one no command answers to
fn unmatched_path(args: &ParsedArgs, commands: &[Command]) -> String {
    let mut level = commands;
    let mut path = Vec::new();
    for token in args.positionals() {
        path.push(token.as_str());
        match level.iter().find(|c| c.answers_to(token)) {
            Some(command) => level = command.sub_commands(),
            None => break,
        }
    }

    if path.is_empty() {
        args.raw().join(" ")
    } else {
        path.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ArgSpec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    static EXECUTED: AtomicUsize = AtomicUsize::new(0);
    static SEEN_NAME: Mutex<Option<String>> = Mutex::new(None);

    async fn done(_ctx: CommandContext) -> anyhow::Result<()> {
        Ok(())
    }

    async fn record_component(ctx: CommandContext) -> anyhow::Result<()> {
        *SEEN_NAME.lock().unwrap() = ctx.command_arg(0).map(str::to_string);
        Ok(())
    }

    async fn count(_ctx: CommandContext) -> anyhow::Result<()> {
        EXECUTED.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn fail(_ctx: CommandContext) -> anyhow::Result<()> {
        anyhow::bail!("compiler exited with status 2")
    }

    fn require_name(ctx: &CommandContext) -> Option<String> {
        ctx.command_arg(0)
            .is_none()
            .then(|| "You must provide a component name.".to_string())
    }

    fn always_reject(_ctx: &CommandContext) -> Option<String> {
        Some("rejected".to_string())
    }

    fn empty_reason(_ctx: &CommandContext) -> Option<String> {
        Some(String::new())
    }

    fn dispatcher(commands: Vec<Command>) -> Dispatcher {
        Dispatcher::new(Arc::new(CommandRegistry::new(commands).unwrap()))
    }

    fn parse(tokens: &[&str]) -> ParsedArgs {
        ParsedArgs::parse(tokens.iter().copied(), &[]).unwrap()
    }

    fn config() -> Arc<KitConfig> {
        Arc::new(KitConfig::default())
    }

    fn example_tree() -> Vec<Command> {
        vec![
            Command::new("help", done).alias("h"),
            Command::new("build", done).alias("b").sub_command(
                Command::new("component", record_component)
                    .alias("c")
                    .arg(ArgSpec::required("name", "component to build"))
                    .validator(require_name),
            ),
        ]
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let d = dispatcher(example_tree());
        let err = d.run(parse(&["deploy"]), config()).await.unwrap_err();
        assert!(matches!(err, KitError::CommandNotFound(ref t) if t == "deploy"));
        assert!(err.to_string().contains("kit help"));
    }

    #[tokio::test]
    async fn test_unknown_sub_command_names_the_full_path() {
        let d = dispatcher(example_tree());
        let err = d.run(parse(&["b", "x-card"]), config()).await.unwrap_err();
        assert!(matches!(err, KitError::CommandNotFound(ref t) if t == "b x-card"));
        assert!(err.to_string().starts_with("Unknown command 'b x-card'"));
    }

    #[tokio::test]
    async fn test_validator_blocks_executor() {
        let before = EXECUTED.load(Ordering::SeqCst);
        let d = dispatcher(vec![Command::new("guarded", count).validator(always_reject)]);

        let err = d.run(parse(&["guarded"]), config()).await.unwrap_err();
        assert!(matches!(err, KitError::Validation(_)));
        assert_eq!(err.to_string(), "rejected");
        assert_eq!(EXECUTED.load(Ordering::SeqCst), before);
    }

    #[tokio::test]
    async fn test_empty_validation_reason_accepts() {
        let d = dispatcher(vec![Command::new("lenient", done).validator(empty_reason)]);
        assert!(d.run(parse(&["lenient"]), config()).await.is_ok());
    }

    #[tokio::test]
    async fn test_executor_error_passes_through() {
        let d = dispatcher(vec![Command::new("broken", fail)]);
        let err = d.run(parse(&["broken"]), config()).await.unwrap_err();
        assert!(matches!(err, KitError::Execution(_)));
        assert_eq!(err.to_string(), "compiler exited with status 2");
    }

    #[tokio::test]
    async fn test_end_to_end_example() {
        let d = dispatcher(example_tree());

        d.run(parse(&["b"]), config()).await.unwrap();

        d.run(parse(&["b", "c", "widget-a"]), config()).await.unwrap();
        assert_eq!(SEEN_NAME.lock().unwrap().as_deref(), Some("widget-a"));

        let err = d
            .run(parse(&["build", "component"]), config())
            .await
            .unwrap_err();
        assert!(matches!(err, KitError::Validation(_)));
        assert_eq!(err.to_string(), "You must provide a component name.");
    }
}
