//! Recursive command resolution
//!
//! Walks the tree one positional token per level. At each level siblings are
//! tried in declaration order and the first match wins: a matcher that claims
//! the whole argument set, then the command name, then its aliases. A match
//! with further tokens and sub-commands recurses; if nothing below matches, a
//! parent that declares its own positional args absorbs the remaining tokens.

use super::{Command, ParsedArgs};

/// Find the command to run for `args`, starting at positional `depth`.
pub fn find_command<'a>(
    args: &ParsedArgs,
    commands: &'a [Command],
    depth: usize,
) -> Option<&'a Command> {
    find_command_at(args, commands, depth).map(|(command, _)| command)
}

/// Like [`find_command`], also returning the depth the command matched at.
pub fn find_command_at<'a>(
    args: &ParsedArgs,
    commands: &'a [Command],
    depth: usize,
) -> Option<(&'a Command, usize)> {
    let tokens = args.positionals();
    let current = tokens.get(depth).map(String::as_str);

    for command in commands {
        let matched = command.claims(args) || current.is_some_and(|t| command.answers_to(t));
        if !matched {
            continue;
        }

        let more_tokens = tokens.len() > depth + 1;
        if !more_tokens || command.sub_commands.is_empty() {
            return Some((command, depth));
        }

        if let Some(found) = find_command_at(args, &command.sub_commands, depth + 1) {
            return Some(found);
        }

        if !command.args.is_empty() {
            return Some((command, depth));
        }
    }

    None
}
