//! Strict mode: config-file keys the target schema does not declare.
//!
//! The walk follows the schema: groups are entered, union fields are entered
//! through their variant key (`[mode.Tls]`), and with candidates every
//! top-level key must name a candidate.

use std::path::Path;

use toml::{Table, Value};

use crate::error::AskfigError;
use crate::schema::{FieldKind, Schema, Target, find_variant};

/// Dotted paths of keys in `table` that `target` does not declare.
pub fn unknown_keys(target: &Target, table: &Table) -> Vec<String> {
    let mut out = Vec::new();
    match target {
        Target::Single(schema) => walk(schema, table, "", &mut out),
        Target::Candidates(candidates) => {
            for (key, value) in table {
                match (find_variant(candidates, key), value) {
                    (Some(schema), Value::Table(sub)) => walk(schema, sub, key, &mut out),
                    (Some(_), _) => {}
                    (None, _) => out.push(key.clone()),
                }
            }
        }
    }
    out
}

fn walk(schema: &Schema, table: &Table, prefix: &str, out: &mut Vec<String>) {
    let dotted = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        }
    };
    for (key, value) in table {
        let Some(field) = schema.get(key) else {
            out.push(dotted(key));
            continue;
        };
        match (&field.kind, value) {
            (FieldKind::Group(group), Value::Table(sub)) => walk(group, sub, &dotted(key), out),
            (FieldKind::Union(variants), Value::Table(tagged)) => {
                for (name, inner) in tagged {
                    let path = format!("{}.{name}", dotted(key));
                    match (find_variant(variants, name), inner) {
                        (Some(variant), Value::Table(sub)) => walk(variant, sub, &path, out),
                        (Some(_), _) => {}
                        (None, _) => out.push(path),
                    }
                }
            }
            _ => {}
        }
    }
}

/// Parse a TOML config file and reject keys unknown to `target`.
///
/// Each unknown key is reported with the file path and a best-effort line.
pub fn validate_unknown_keys(target: &Target, content: &str, path: &Path) -> Result<Table, AskfigError> {
    let table: Table = toml::from_str(content).map_err(|e| AskfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let unknown = unknown_keys(target, &table);
    if unknown.is_empty() {
        return Ok(table);
    }
    let errors = unknown
        .into_iter()
        .map(|key| AskfigError::UnknownKey {
            line: find_key_line(content, &key),
            key,
            path: path.to_path_buf(),
        })
        .collect();
    Err(AskfigError::UnknownKeys(errors))
}

/// 1-indexed line of a dotted key, tracking `[section]` headers. Handles bare
/// keys under standard headers only; 0 when not found.
fn find_key_line(content: &str, dotted_key: &str) -> usize {
    let (section, leaf) = match dotted_key.rsplit_once('.') {
        Some((section, leaf)) => (section, leaf),
        None => ("", dotted_key),
    };
    let mut current = String::new();
    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') && !trimmed.starts_with("[[") {
            let header = trimmed.trim_start_matches('[').trim_end_matches(']');
            current = header.split('.').map(str::trim).collect::<Vec<_>>().join(".");
            // A table header can itself be the unknown key.
            if current == dotted_key {
                return i + 1;
            }
            continue;
        }
        if current == section
            && let Some(rest) = trimmed.strip_prefix(leaf)
            && rest.trim_start().starts_with('=')
        {
            return i + 1;
        }
    }
    0
}
