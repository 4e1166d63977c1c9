//! The kit command tree

pub mod build;
pub mod clean;
pub mod help;
pub mod lint;
pub mod list;
pub mod status;
pub mod version;

use crate::cli::{Command, CommandRegistry, OptionSpec, ParsedArgs, RegistryError};
use crate::error::KitError;

/// Options accepted by every command
pub fn global_options() -> Vec<OptionSpec> {
    vec![
        OptionSpec::flag("verbose", "Show debug logs and full error chains"),
        OptionSpec::value("bundler", "Override the bundler (esbuild, rollup, webpack)"),
        OptionSpec::flag("help", "Show help for the command").short('h'),
        OptionSpec::flag("version", "Print the kit version").short('v'),
    ]
}

/// Top-level commands in resolution order; matchers run before names
pub fn commands() -> Vec<Command> {
    vec![
        help::command(),
        version::command(),
        build::command(),
        list::command(),
        lint::command(),
        test::command(),
        clean::command(),
        status::command(),
    ]
}

pub fn registry() -> Result<CommandRegistry, RegistryError> {
    CommandRegistry::new(commands())
}

/// Tokenize a raw command line against every option the tree declares
pub fn parse_args<I, S>(registry: &CommandRegistry, raw: I) -> Result<ParsedArgs, KitError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut options = global_options();
    options.extend(registry.options());
    Ok(ParsedArgs::parse(raw, &options)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{find_command, find_command_at, Dispatcher};
    use crate::config::KitConfig;
    use std::sync::Arc;

    fn resolve<'a>(registry: &'a CommandRegistry, tokens: &[&str]) -> Option<&'a str> {
        let args = parse_args(registry, tokens.iter().copied()).unwrap();
        find_command(&args, registry.commands(), 0).map(|c| c.name())
    }

    #[test]
    fn test_registry_is_valid() {
        assert!(registry().is_ok());
    }

    #[test]
    fn test_every_name_and_alias_resolves() {
        let registry = registry().unwrap();
        let cases: &[(&[&str], &str)] = &[
            (&["help"], "help"),
            (&["h"], "help"),
            (&["version"], "version"),
            (&["v"], "version"),
            (&["build"], "build"),
            (&["b"], "build"),
            (&["build", "component", "x-card"], "component"),
            (&["b", "c", "x-card"], "component"),
            (&["build", "stylesheet"], "stylesheet"),
            (&["b", "sass"], "stylesheet"),
            (&["list"], "list"),
            (&["ls"], "list"),
            (&["ll"], "list"),
            (&["lint"], "lint"),
            (&["l"], "lint"),
            (&["lint", "eslint"], "eslint"),
            (&["l", "js"], "eslint"),
            (&["lint", "styles"], "styles"),
            (&["l", "css"], "styles"),
            (&["test"], "test"),
            (&["t"], "test"),
            (&["test", "component", "x-card", "x-tabs"], "component"),
            (&["t", "c", "x-card"], "component"),
            (&["clean"], "clean"),
            (&["status"], "status"),
        ];
        for (tokens, expected) in cases {
            assert_eq!(resolve(&registry, tokens), Some(*expected), "{:?}", tokens);
        }
    }

    #[test]
    fn test_matchers_win_over_names() {
        let registry = registry().unwrap();
        assert_eq!(resolve(&registry, &["build", "--help"]), Some("help"));
        assert_eq!(resolve(&registry, &["--version"]), Some("version"));
        assert_eq!(resolve(&registry, &["-v"]), Some("version"));
        assert_eq!(resolve(&registry, &[]), Some("help"));
        assert_eq!(resolve(&registry, &["--verbose"]), Some("help"));
    }

    #[test]
    fn test_build_absorbs_component_names() {
        let registry = registry().unwrap();
        let args = parse_args(&registry, ["build", "x-button", "x-card"]).unwrap();
        let (command, depth) = find_command_at(&args, registry.commands(), 0).unwrap();
        assert_eq!(command.name(), "build");
        assert_eq!(depth, 0);
    }

    #[test]
    fn test_value_options_consume_their_value() {
        let registry = registry().unwrap();
        let args = parse_args(&registry, ["build", "-j", "4", "--bundler", "rollup", "x-card"]).unwrap();
        assert_eq!(args.value("jobs"), Some("4"));
        assert_eq!(args.value("bundler"), Some("rollup"));
        assert_eq!(args.positionals(), ["build", "x-card"]);
    }

    #[test]
    fn test_options_of_nested_commands_are_known() {
        let registry = registry().unwrap();
        let args = parse_args(&registry, ["t", "c", "x-card", "--watch"]).unwrap();
        assert!(args.flag("watch"));
        let args = parse_args(&registry, ["lint", "styles", "--fix"]).unwrap();
        assert!(args.flag("fix"));
    }

    #[test]
    fn test_undeclared_option_is_a_usage_error() {
        let registry = registry().unwrap();
        let err = parse_args(&registry, ["build", "--minify"]).unwrap_err();
        assert!(matches!(err, KitError::InvalidArguments(_)));
        assert!(err.is_usage());
        assert!(err.to_string().contains("'--minify'"));
    }

    #[tokio::test]
    async fn test_unknown_sub_command_is_reported_in_full() {
        let registry = Arc::new(registry().unwrap());
        let args = parse_args(&registry, ["test", "x-card"]).unwrap();
        let err = Dispatcher::new(Arc::clone(&registry))
            .run(args, Arc::new(KitConfig::default()))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown command 'test x-card'. Run 'kit help' to see available commands."
        );
    }

    #[test]
    fn test_unknown_command() {
        let registry = registry().unwrap();
        assert_eq!(resolve(&registry, &["deploy"]), None);
    }
}
