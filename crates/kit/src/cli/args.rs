//! Command-line tokenizer
//!
//! A flat clap grammar is generated from every option the command tree
//! declares, plus one trailing list of positionals. Clap does the lexing
//! (`--x=v`, `--x v`, `-abc`, `-j4`, `--`); subcommand selection is left to
//! the resolver, which walks the positionals.

use clap::{value_parser, Arg, ArgAction, ArgMatches};
use std::collections::{BTreeMap, HashSet};

use super::OptionSpec;

/// Clap id of the positional token list
const TOKENS: &str = "tokens";

const FLAG_SET: &str = "true";

/// Tokenized command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArgs {
    positionals: Vec<String>,
    options: BTreeMap<String, Vec<String>>,
    raw: Vec<String>,
}

impl ParsedArgs {
    /// Tokenize `raw` against the declared `options`, keyed by long name.
    ///
    /// An option declared twice keeps its first declaration. Undeclared
    /// options are rejected.
    pub fn parse<I, S>(raw: I, options: &[OptionSpec]) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let raw: Vec<String> = raw.into_iter().map(Into::into).collect();

        let mut seen = HashSet::new();
        let declared: Vec<&OptionSpec> = options.iter().filter(|o| seen.insert(o.long)).collect();

        let matches = grammar(&declared).try_get_matches_from(&raw)?;

        let positionals = matches
            .get_many::<String>(TOKENS)
            .map(|values| values.cloned().collect())
            .unwrap_or_default();

        let mut options = BTreeMap::new();
        for option in declared {
            let values = option_values(&matches, option);
            if !values.is_empty() {
                options.insert(option.long.to_string(), values);
            }
        }

        Ok(Self {
            positionals,
            options,
            raw,
        })
    }

    /// Positional tokens, in order
    pub fn positionals(&self) -> &[String] {
        &self.positionals
    }

    /// Positional token at `index`
    pub fn positional(&self, index: usize) -> Option<&str> {
        self.positionals.get(index).map(String::as_str)
    }

    /// Whether a flag was given, by long name
    pub fn flag(&self, name: &str) -> bool {
        self.options.contains_key(name)
    }

    /// Last value given for an option, by long name
    pub fn value(&self, name: &str) -> Option<&str> {
        self.options
            .get(name)
            .and_then(|values| values.last())
            .map(String::as_str)
    }

    /// The untouched argument list
    pub fn raw(&self) -> &[String] {
        &self.raw
    }
}

fn grammar(options: &[&OptionSpec]) -> clap::Command {
    let mut command = clap::Command::new("kit")
        .no_binary_name(true)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .override_usage("kit <command> [arguments] [options]")
        .arg(
            Arg::new(TOKENS)
                .num_args(1..)
                .action(ArgAction::Append)
                .allow_negative_numbers(true)
                .value_parser(value_parser!(String)),
        );

    for option in options {
        let mut arg = Arg::new(option.long).long(option.long);
        if let Some(short) = option.short {
            arg = arg.short(short);
        }
        arg = if option.takes_value {
            arg.num_args(1)
                .action(ArgAction::Append)
                .value_parser(value_parser!(String))
        } else {
            arg.action(ArgAction::Count)
        };
        command = command.arg(arg);
    }

    command
}

fn option_values(matches: &ArgMatches, option: &OptionSpec) -> Vec<String> {
    if option.takes_value {
        matches
            .get_many::<String>(option.long)
            .map(|values| values.cloned().collect())
            .unwrap_or_default()
    } else {
        (0..matches.get_count(option.long))
            .map(|_| FLAG_SET.to_string())
            .collect()
    }
}
