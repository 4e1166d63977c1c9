//! `kit help [command...]`

use anyhow::{anyhow, Result};
use std::fmt::Write;

use super::global_options;
use crate::cli::{ArgSpec, Command, CommandContext, CommandRegistry, ParsedArgs};

const COLUMN: usize = 30;

pub fn command() -> Command {
    Command::new("help", show_help)
        .alias("h")
        .describe("Show help for kit or for one command")
        .arg(ArgSpec::optional("command", "command to describe").variadic())
        .matcher(wants_help)
        .hidden()
}

/// `--help`/`-h` anywhere, or no command at all; version flags take priority
fn wants_help(args: &ParsedArgs) -> bool {
    if args.flag("version") {
        return false;
    }
    args.positionals().is_empty() || args.flag("help")
}

async fn show_help(ctx: CommandContext) -> Result<()> {
    let mut tokens: Vec<&str> = ctx.args.positionals().iter().map(String::as_str).collect();
    // `kit help build` and `kit build --help` describe the same command
    if tokens.first().is_some_and(|t| *t == "help" || *t == "h") {
        tokens.remove(0);
    }

    if tokens.is_empty() {
        print!("{}", render_overview(&ctx.registry));
        return Ok(());
    }

    let path = command_path(ctx.registry.commands(), &tokens);
    if path.is_empty() {
        return Err(anyhow!(
            "Unknown command '{}'. Run 'kit help' to see available commands.",
            tokens.join(" ")
        ));
    }
    print!("{}", render_command(&path));
    Ok(())
}

/// Commands named by the leading tokens, outermost first
fn command_path<'a>(commands: &'a [Command], tokens: &[&str]) -> Vec<&'a Command> {
    let mut path = Vec::new();
    let mut level = commands;
    for token in tokens {
        let Some(command) = level.iter().find(|c| c.answers_to(token)) else {
            break;
        };
        path.push(command);
        level = command.sub_commands();
    }
    path
}

pub fn render_overview(registry: &CommandRegistry) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "kit {} - build tooling for the component library", env!("CARGO_PKG_VERSION"));
    let _ = writeln!(out);
    let _ = writeln!(out, "Usage: kit <command> [arguments] [options]");
    let _ = writeln!(out);
    let _ = writeln!(out, "Commands:");
    let mut visible: Vec<&Command> = registry.commands().iter().filter(|c| !c.is_hidden()).collect();
    visible.sort_by(|a, b| a.name().cmp(b.name()));
    for command in visible {
        write_tree(&mut out, command, 1);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Options:");
    for option in global_options() {
        write_row(&mut out, 1, &option.usage(), option.description);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Run 'kit help <command>' for details on a command.");
    out
}

pub fn render_command(path: &[&Command]) -> String {
    let mut out = String::new();
    let Some(command) = path.last() else {
        return out;
    };

    let names: Vec<&str> = path.iter().map(|c| c.name()).collect();
    let mut usage = format!("kit {}", names.join(" "));
    for arg in command.args() {
        usage.push(' ');
        usage.push_str(&arg.usage());
    }
    if !command.sub_commands().is_empty() {
        usage.push_str(" | <command>");
    }
    let _ = writeln!(out, "Usage: {} [options]", usage);

    if !command.description().is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", command.description());
    }

    if !command.alias_list().is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Aliases: {}", command.alias_list().join(", "));
    }

    if !command.args().is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Arguments:");
        for arg in command.args() {
            write_row(&mut out, 1, &arg.usage(), arg.description);
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Options:");
    for option in command.options().iter().cloned().chain(global_options()) {
        write_row(&mut out, 1, &option.usage(), option.description);
    }

    if !command.sub_commands().is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Commands:");
        for sub in command.sub_commands().iter().filter(|c| !c.is_hidden()) {
            write_tree(&mut out, sub, 1);
        }
    }
    out
}

fn write_tree(out: &mut String, command: &Command, depth: usize) {
    let mut label = std::iter::once(command.name())
        .chain(command.alias_list().iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(", ");
    for arg in command.args() {
        label.push(' ');
        label.push_str(&arg.usage());
    }
    write_row(out, depth, &label, command.description());

    for sub in command.sub_commands().iter().filter(|c| !c.is_hidden()) {
        write_tree(out, sub, depth + 1);
    }
}

fn write_row(out: &mut String, depth: usize, label: &str, description: &str) {
    let indented = format!("{}{}", "  ".repeat(depth), label);
    if indented.len() >= COLUMN {
        let _ = writeln!(out, "{}", indented);
        let _ = writeln!(out, "{}{}", " ".repeat(COLUMN), description);
    } else {
        let _ = writeln!(out, "{:<width$}{}", indented, description, width = COLUMN);
    }
}
