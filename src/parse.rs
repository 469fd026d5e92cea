//! The parser boundary.
//!
//! A [`Parser`] turns its raw input plus the layered defaults and the
//! answers gathered so far into a [`ParseOutcome`]. Instead of failing on a
//! missing or invalid field it reports a [`Gap`] for it, which is what the
//! resolver asks about. [`evaluate`] is the schema check both bundled parsers
//! share; [`TableParser`] takes its raw input as an already-parsed table.

use toml::{Table, Value};

use crate::check::Rejection;
use crate::merge::merge_layers;
use crate::overrides::join_key;
use crate::schema::{FieldKind, Schema, Target, find_variant};
use crate::tree::{chosen_variant, field_cell};
use crate::value::Slot;

/// Input to one parse attempt.
#[derive(Debug, Clone, Copy)]
pub struct Attempt<'a> {
    pub target: &'a Target,
    /// Lowest priority: files, env and programmatic overrides.
    pub defaults: &'a Table,
    /// Highest priority: values gathered from the value provider.
    pub answers: &'a Table,
}

/// A field the parser could not resolve.
#[derive(Debug, Clone, PartialEq)]
pub struct Gap {
    /// Dotted path. Empty for the top-level candidate choice.
    pub path: String,
    pub reason: String,
    /// The value that was present but refused, if any.
    pub rejected: Option<Value>,
    pub suggestion: Option<Slot>,
}

impl Gap {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
            rejected: None,
            suggestion: None,
        }
    }

    /// A gap for a value that failed coercion or validation.
    pub fn rejected(path: impl Into<String>, rejection: Rejection, value: Option<Value>) -> Self {
        Self {
            rejected: value,
            suggestion: rejection.suggestion,
            ..Self::new(path, rejection.message)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// Every field has a valid value. For candidates the table holds a single
    /// key, the chosen candidate's name.
    Resolved(Table),
    Unresolved { gaps: Vec<Gap>, diagnostic: String },
    /// The raw input cannot be accepted at all. Not recoverable by asking.
    Rejected(String),
}

pub trait Parser {
    fn attempt(&mut self, attempt: &Attempt<'_>) -> ParseOutcome;
}

impl<P: Parser + ?Sized> Parser for &mut P {
    fn attempt(&mut self, attempt: &Attempt<'_>) -> ParseOutcome {
        (**self).attempt(attempt)
    }
}

impl<P: Parser + ?Sized> Parser for Box<P> {
    fn attempt(&mut self, attempt: &Attempt<'_>) -> ParseOutcome {
        (**self).attempt(attempt)
    }
}

/// A parser over an already-structured raw table.
#[derive(Debug, Clone, Default)]
pub struct TableParser {
    raw: Table,
}

impl TableParser {
    pub fn new(raw: Table) -> Self {
        Self { raw }
    }
}

impl Parser for TableParser {
    fn attempt(&mut self, attempt: &Attempt<'_>) -> ParseOutcome {
        let chosen = chosen_candidate(attempt.target, &[&self.raw, attempt.answers]);
        let merged = merge_layers(attempt.target, &[attempt.defaults, &self.raw, attempt.answers]);
        evaluate(attempt.target, &narrow(attempt.target, merged, chosen.as_deref()))
    }
}

/// The candidate explicitly picked by one of `layers`, highest priority
/// (last) first. Defaults are never passed here: a config file holds
/// settings for every candidate and picks none of them.
pub fn chosen_candidate(target: &Target, layers: &[&Table]) -> Option<String> {
    let Target::Candidates(candidates) = target else {
        return None;
    };
    layers.iter().rev().find_map(|layer| {
        let mut named = candidates.iter().filter(|c| layer.contains_key(&c.name));
        match (named.next(), named.next()) {
            (Some(only), None) => Some(only.name.clone()),
            _ => None,
        }
    })
}

/// Drop every candidate section except `chosen`. Without a choice all
/// candidate sections go, leaving nothing to pick.
pub fn narrow(target: &Target, mut merged: Table, chosen: Option<&str>) -> Table {
    if let Target::Candidates(candidates) = target {
        for candidate in candidates {
            if Some(candidate.name.as_str()) != chosen {
                merged.remove(&candidate.name);
            }
        }
        if let Some(name) = chosen {
            merged
                .entry(name.to_string())
                .or_insert_with(|| Value::Table(Table::new()));
        }
    }
    merged
}

/// Check a merged table against the target.
///
/// Absent leaves take their schema fallback. Present leaves run through the
/// same pipeline as [`Cell::accept`](crate::Cell::accept) and the accepted
/// form lands in the result. Groups and chosen variants are entered; an
/// unchosen union is a single gap at the union's path. Keys outside the
/// schema are dropped. Gaps come out in schema order.
pub fn evaluate(target: &Target, merged: &Table) -> ParseOutcome {
    let mut gaps = Vec::new();
    let resolved = match target {
        Target::Single(schema) => check_schema(schema, merged, &mut Vec::new(), &mut gaps),
        Target::Candidates(candidates) => {
            let named: Vec<&Schema> = candidates
                .iter()
                .filter(|c| merged.contains_key(&c.name))
                .collect();
            match named.as_slice() {
                [candidate] => {
                    let sub = match merged.get(&candidate.name) {
                        Some(Value::Table(sub)) => sub.clone(),
                        _ => Table::new(),
                    };
                    let mut path = vec![candidate.name.clone()];
                    let values = check_schema(candidate, &sub, &mut path, &mut gaps);
                    Table::from_iter([(candidate.name.clone(), Value::Table(values))])
                }
                _ => {
                    let names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
                    gaps.push(Gap::new("", format!("no command selected: one of {}", names.join(", "))));
                    Table::new()
                }
            }
        }
    };
    if gaps.is_empty() {
        ParseOutcome::Resolved(resolved)
    } else {
        let diagnostic = describe_gaps(&gaps);
        ParseOutcome::Unresolved { gaps, diagnostic }
    }
}

/// One line per gap, `path: reason`.
pub fn describe_gaps(gaps: &[Gap]) -> String {
    gaps.iter()
        .map(|g| {
            let path = if g.path.is_empty() { "<command>" } else { &g.path };
            format!("{path}: {}", g.reason)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn check_schema(schema: &Schema, table: &Table, path: &mut Vec<String>, gaps: &mut Vec<Gap>) -> Table {
    let mut out = Table::new();
    for field in &schema.fields {
        path.push(field.name.clone());
        let raw = table.get(&field.name);
        match &field.kind {
            FieldKind::Leaf(ty) => {
                let slot = match raw {
                    Some(value) => Slot::Filled(value.clone()),
                    None => field.fallback(),
                };
                if slot.is_missing() {
                    gaps.push(Gap::new(join_key(&path[..]), "missing required value"));
                } else {
                    match field_cell(field, ty).accept(slot) {
                        Ok(value) => {
                            if let Some(value) = value.into_value() {
                                out.insert(field.name.clone(), value);
                            }
                        }
                        Err(rejection) => {
                            gaps.push(Gap::rejected(join_key(&path[..]), rejection, raw.cloned()))
                        }
                    }
                }
            }
            FieldKind::Group(group) => match raw {
                None => {
                    let sub = check_schema(group, &Table::new(), path, gaps);
                    out.insert(field.name.clone(), Value::Table(sub));
                }
                Some(Value::Table(sub)) => {
                    let sub = check_schema(group, sub, path, gaps);
                    out.insert(field.name.clone(), Value::Table(sub));
                }
                Some(_) => gaps.push(Gap::new(join_key(&path[..]), "expected a table")),
            },
            FieldKind::Union(variants) => {
                let chosen = chosen_variant(raw, variants).or_else(|| {
                    field
                        .default
                        .as_ref()
                        .and_then(Slot::as_str)
                        .and_then(|name| find_variant(variants, name))
                });
                match chosen {
                    Some(variant) => {
                        let sub = match raw.and_then(|v| v.get(&variant.name)) {
                            Some(Value::Table(sub)) => sub.clone(),
                            _ => Table::new(),
                        };
                        path.push(variant.name.clone());
                        let values = check_schema(variant, &sub, path, gaps);
                        path.pop();
                        let tagged = Table::from_iter([(variant.name.clone(), Value::Table(values))]);
                        out.insert(field.name.clone(), Value::Table(tagged));
                    }
                    None => {
                        let names: Vec<&str> = variants.iter().map(|v| v.name.as_str()).collect();
                        gaps.push(Gap::new(
                            join_key(&path[..]),
                            format!("no variant selected: one of {}", names.join(", ")),
                        ));
                    }
                }
            }
        }
        path.pop();
    }
    out
}

/// Whether a gap names a union position rather than a value.
pub fn is_union_gap(target: &Target, gap: &Gap) -> bool {
    if gap.path.is_empty() {
        return matches!(target, Target::Candidates(_));
    }
    matches!(
        target.locate(&gap.path).map(|f| &f.kind),
        Some(FieldKind::Union(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{commands, person, server};

    fn table(s: &str) -> Table {
        s.parse().unwrap()
    }

    fn attempt(parser: &mut impl Parser, target: &Target, defaults: &Table, answers: &Table) -> ParseOutcome {
        parser.attempt(&Attempt {
            target,
            defaults,
            answers,
        })
    }

    fn gap_paths(outcome: &ParseOutcome) -> Vec<String> {
        match outcome {
            ParseOutcome::Unresolved { gaps, .. } => gaps.iter().map(|g| g.path.clone()).collect(),
            other => panic!("Expected unresolved, got {other:?}"),
        }
    }

    #[test]
    fn missing_required_is_the_only_gap() {
        let target = Target::Single(person());
        let outcome = evaluate(&target, &Table::new());
        assert_eq!(gap_paths(&outcome), vec!["name"]);
        let ParseOutcome::Unresolved { diagnostic, .. } = outcome else {
            unreachable!()
        };
        assert_eq!(diagnostic, "name: missing required value");
    }

    #[test]
    fn defaults_fill_and_values_are_coerced() {
        let target = Target::Single(person());
        let outcome = evaluate(&target, &table("name = \"Ann\""));
        assert_eq!(outcome, ParseOutcome::Resolved(table("name = \"Ann\"\nage = 4")));

        let outcome = evaluate(&target, &table("name = \"Ann\"\nage = \"31\""));
        assert_eq!(outcome, ParseOutcome::Resolved(table("name = \"Ann\"\nage = 31")));
    }

    #[test]
    fn invalid_value_is_a_gap_with_its_reason() {
        let target = Target::Single(person());
        let outcome = evaluate(&target, &table("name = \"Ann\"\nage = \"old\""));
        let ParseOutcome::Unresolved { gaps, .. } = outcome else {
            panic!("Expected unresolved");
        };
        assert_eq!(gaps[0].path, "age");
        assert!(gaps[0].reason.contains("expected int"));
        assert_eq!(gaps[0].rejected, Some(Value::String("old".into())));
    }

    #[test]
    fn validators_run_during_evaluation() {
        let target = Target::Single(person());
        let outcome = evaluate(&target, &table("name = \"\""));
        assert_eq!(gap_paths(&outcome), vec!["name"]);
    }

    #[test]
    fn unchosen_union_is_a_single_gap() {
        let target = Target::Single(server());
        let outcome = evaluate(&target, &table("name = \"srv\""));
        assert_eq!(gap_paths(&outcome), vec!["mode"]);
        let ParseOutcome::Unresolved { gaps, .. } = outcome else {
            unreachable!()
        };
        assert!(is_union_gap(&target, &gaps[0]));
    }

    #[test]
    fn chosen_variant_fields_are_checked() {
        let target = Target::Single(server());
        let outcome = evaluate(&target, &table("name = \"srv\"\nmode = \"Tls\""));
        assert_eq!(gap_paths(&outcome), vec!["mode.Tls.cert"]);

        let outcome = evaluate(&target, &table("name = \"srv\"\n[mode.Plain]"));
        let ParseOutcome::Resolved(values) = outcome else {
            panic!("Expected resolved");
        };
        assert!(values["mode"]["Plain"].as_table().unwrap().is_empty());
        assert_eq!(values["database"]["pool_size"].as_integer(), Some(5));
        assert!(!values["database"].as_table().unwrap().contains_key("url"));
    }

    #[test]
    fn empty_collection_input_commits_empty_list() {
        let target = Target::Single(server());
        let outcome = evaluate(&target, &table("name = \"s\"\ntags = \"\"\nmode = \"Plain\""));
        let ParseOutcome::Resolved(values) = outcome else {
            panic!("Expected resolved");
        };
        assert_eq!(values["tags"].as_array().map(Vec::len), Some(0));
    }

    #[test]
    fn candidates_without_choice_report_root_gap() {
        let target = Target::Candidates(commands());
        let outcome = evaluate(&target, &Table::new());
        assert_eq!(gap_paths(&outcome), vec![""]);
        let ParseOutcome::Unresolved { gaps, .. } = outcome else {
            unreachable!()
        };
        assert!(is_union_gap(&target, &gaps[0]));
        assert!(gaps[0].reason.contains("Build, Deploy"));
    }

    #[test]
    fn chosen_candidate_is_wrapped_in_its_name() {
        let target = Target::Candidates(commands());
        let outcome = evaluate(&target, &table("[Deploy]\nshared = 1\ntarget = \"prod\""));
        assert_eq!(
            outcome,
            ParseOutcome::Resolved(table("[Deploy]\nshared = 1\ntarget = \"prod\""))
        );
    }

    #[test]
    fn table_parser_layers_defaults_raw_and_answers() {
        let target = Target::Single(person());
        let mut parser = TableParser::new(table("name = \"raw\""));
        let defaults = table("name = \"file\"\nage = 9");
        let outcome = attempt(&mut parser, &target, &defaults, &Table::new());
        assert_eq!(outcome, ParseOutcome::Resolved(table("name = \"raw\"\nage = 9")));

        let answers = table("name = \"answer\"");
        let outcome = attempt(&mut parser, &target, &defaults, &answers);
        assert_eq!(outcome, ParseOutcome::Resolved(table("name = \"answer\"\nage = 9")));
    }

    #[test]
    fn candidate_sections_in_defaults_do_not_choose() {
        let target = Target::Candidates(commands());
        let mut parser = TableParser::default();
        let defaults = table("[Deploy]\nshared = 3\ntarget = \"prod\"");
        let outcome = attempt(&mut parser, &target, &defaults, &Table::new());
        assert_eq!(gap_paths(&outcome), vec![""]);

        let answers = table("[Deploy]");
        let outcome = attempt(&mut parser, &target, &defaults, &answers);
        assert_eq!(
            outcome,
            ParseOutcome::Resolved(table("[Deploy]\nshared = 3\ntarget = \"prod\""))
        );
    }

    #[test]
    fn chosen_candidate_prefers_later_layers() {
        let target = Target::Candidates(commands());
        let raw = table("[Build]");
        let answers = table("[Deploy]");
        assert_eq!(chosen_candidate(&target, &[&raw]).as_deref(), Some("Build"));
        assert_eq!(chosen_candidate(&target, &[&raw, &answers]).as_deref(), Some("Deploy"));
        assert_eq!(chosen_candidate(&Target::Single(person()), &[&raw]), None);
    }
}
