//! Clap adapter.
//!
//! [`ClapParser`] is a [`Parser`] over command-line tokens. It builds a
//! [`clap::Command`] at run time from the target schema: one long flag per
//! leaf (`--database.url`), and one subcommand per top-level candidate.
//! Nothing is marked required on the clap side, so a missing value never
//! aborts the parse; it comes back as a gap the resolver can ask about.
//! Nested union fields get no flags and are settled from defaults or by
//! asking.
//!
//! Compiled only with the `clap` feature (on by default).

use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command};
use toml::{Table, Value};

use crate::merge::merge_layers;
use crate::overrides::{set_nested, split_key};
use crate::parse::{Attempt, Gap, ParseOutcome, Parser, chosen_candidate, evaluate, narrow};
use crate::schema::{Schema, Target};
use crate::value::TypeTag;

/// Parses command-line tokens (without the binary name).
#[derive(Debug, Clone)]
pub struct ClapParser {
    name: String,
    tokens: Vec<String>,
}

impl ClapParser {
    pub fn new<I, T>(name: impl Into<String>, tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            name: name.into(),
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// The clap command for `target`.
    pub fn command(&self, target: &Target) -> Command {
        let root = Command::new(self.name.clone())
            .no_binary_name(true)
            .disable_help_subcommand(true);
        match target {
            Target::Single(schema) => with_flags(root, schema),
            Target::Candidates(candidates) => candidates.iter().fold(root, |cmd, candidate| {
                let mut sub = with_flags(Command::new(subcommand_name(candidate)), candidate);
                if let Some(doc) = &candidate.doc {
                    sub = sub.about(doc.clone());
                }
                cmd.subcommand(sub)
            }),
        }
    }
}

impl Parser for ClapParser {
    fn attempt(&mut self, attempt: &Attempt<'_>) -> ParseOutcome {
        let target = attempt.target;
        let matches = match self.command(target).try_get_matches_from(&self.tokens) {
            Ok(matches) => matches,
            Err(err) => return ParseOutcome::Rejected(err.render().to_string()),
        };

        let (raw, picked) = match target {
            Target::Single(schema) => (read_flags(schema, &matches), None),
            Target::Candidates(candidates) => {
                let picked = matches.subcommand().and_then(|(name, sub)| {
                    let candidate = candidates.iter().find(|c| subcommand_name(c) == name)?;
                    Some((candidate, sub))
                });
                match picked {
                    Some((candidate, sub)) => {
                        let values = read_flags(candidate, sub);
                        let raw = Table::from_iter([(candidate.name.clone(), Value::Table(values))]);
                        (raw, Some(candidate.name.clone()))
                    }
                    None => (Table::new(), None),
                }
            }
        };

        let chosen = picked.or_else(|| chosen_candidate(target, &[attempt.answers]));
        let merged = merge_layers(target, &[attempt.defaults, &raw, attempt.answers]);
        match evaluate(target, &narrow(target, merged, chosen.as_deref())) {
            ParseOutcome::Unresolved { gaps, .. } => {
                let diagnostic = flag_diagnostic(target, &gaps);
                ParseOutcome::Unresolved { gaps, diagnostic }
            }
            other => other,
        }
    }
}

fn subcommand_name(candidate: &Schema) -> String {
    candidate.name.to_lowercase()
}

fn leaves(schema: &Schema) -> Vec<(String, TypeTag, Option<String>)> {
    schema
        .leaf_paths()
        .into_iter()
        .filter_map(|path| {
            let field = schema.locate(&split_key(&path)[..])?;
            let ty = field.leaf_type()?.clone();
            Some((path, ty, field.doc.clone()))
        })
        .collect()
}

fn with_flags(cmd: Command, schema: &Schema) -> Command {
    leaves(schema).into_iter().fold(cmd, |cmd, (path, ty, doc)| {
        let mut arg = Arg::new(path.clone()).long(path);
        arg = if *ty.inner() == TypeTag::Bool {
            arg.action(ArgAction::SetTrue)
        } else if ty.is_collection() {
            arg.action(ArgAction::Append)
                .num_args(1..)
                .value_parser(clap::value_parser!(String))
        } else {
            arg.action(ArgAction::Set)
                .num_args(1)
                .value_parser(clap::value_parser!(String))
        };
        if let Some(doc) = doc {
            arg = arg.help(doc);
        }
        cmd.arg(arg)
    })
}

/// Values given on the command line, as strings for the schema check to
/// coerce. A single value for a collection stays a string so it can still be
/// split (`--tags "a, b"`).
fn read_flags(schema: &Schema, matches: &ArgMatches) -> Table {
    let mut raw = Table::new();
    for (path, ty, _) in leaves(schema) {
        if matches.value_source(&path) != Some(ValueSource::CommandLine) {
            continue;
        }
        let value = if *ty.inner() == TypeTag::Bool {
            Value::Boolean(true)
        } else {
            let values: Vec<String> = match matches.try_get_many::<String>(&path) {
                Ok(Some(values)) => values.cloned().collect(),
                _ => continue,
            };
            match <[String; 1]>::try_from(values) {
                Ok([single]) => Value::String(single),
                Err(values) => Value::Array(values.into_iter().map(Value::String).collect()),
            }
        };
        set_nested(&mut raw, &split_key(&path)[..], value);
    }
    raw
}

/// Gaps phrased in terms of flags.
fn flag_diagnostic(target: &Target, gaps: &[Gap]) -> String {
    let mut lines = vec!["error: the following arguments are missing or invalid:".to_string()];
    for gap in gaps {
        let flag = match (target, gap.path.split_once('.')) {
            (_, _) if gap.path.is_empty() => "<COMMAND>".to_string(),
            (Target::Candidates(_), Some((_, rest))) => format!("--{rest}"),
            _ => format!("--{}", gap.path),
        };
        lines.push(format!("  {flag}: {}", gap.reason));
    }
    lines.join("\n")
}
