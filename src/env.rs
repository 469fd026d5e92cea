//! Environment variables as a defaults layer.
//!
//! `{PREFIX}__DATABASE__POOL_SIZE=20` becomes `database.pool_size = 20`:
//! double underscores separate levels, single underscores are literal.
//! Segments are matched against the target's field, variant and candidate
//! names ignoring case, so `APP__DEPLOY__TARGET` lands under `Deploy`.
//! Segments the schema does not know are lowercased.

use toml::Table;
use tracing::debug;

use crate::overrides::set_nested;
use crate::schema::{FieldKind, Schema, Target};
use crate::value::parse_scalar;

/// Build a table from the variables matching `{prefix}__*`. Values are typed
/// heuristically (bool, integer, float, string); the schema check coerces
/// them further.
///
/// Takes an iterator so tests can pass synthetic data instead of `std::env::vars()`.
pub fn env_to_table(
    target: &Target,
    prefix: &str,
    vars: impl IntoIterator<Item = (String, String)>,
) -> Table {
    let needle = format!("{prefix}__");
    let mut table = Table::new();
    for (key, value) in vars {
        let Some(rest) = key.strip_prefix(&needle) else {
            continue;
        };
        if rest.is_empty() {
            continue;
        }
        let segments: Vec<&str> = rest.split("__").collect();
        let path = schema_path(target, &segments);
        debug!(var = %key, path = %path.join("."), "env override");
        set_nested(&mut table, &path[..], parse_scalar(&value));
    }
    table
}

fn schema_path(target: &Target, segments: &[&str]) -> Vec<String> {
    match (target, segments.split_first()) {
        (Target::Single(schema), _) => field_path(Some(schema), segments),
        (Target::Candidates(candidates), Some((first, rest))) => {
            let candidate = candidates.iter().find(|c| c.name.eq_ignore_ascii_case(first));
            let head = match candidate {
                Some(c) => c.name.clone(),
                None => first.to_lowercase(),
            };
            let mut path = vec![head];
            path.extend(field_path(candidate, rest));
            path
        }
        (Target::Candidates(_), None) => Vec::new(),
    }
}

fn field_path(schema: Option<&Schema>, segments: &[&str]) -> Vec<String> {
    let Some((first, rest)) = segments.split_first() else {
        return Vec::new();
    };
    let field = schema.and_then(|s| s.fields.iter().find(|f| f.name.eq_ignore_ascii_case(first)));
    let Some(field) = field else {
        return segments.iter().map(|s| s.to_lowercase()).collect();
    };
    let mut path = vec![field.name.clone()];
    match &field.kind {
        FieldKind::Leaf(_) => path.extend(rest.iter().map(|s| s.to_lowercase())),
        FieldKind::Group(group) => path.extend(field_path(Some(group), rest)),
        FieldKind::Union(variants) => {
            if let Some((name, rest)) = rest.split_first() {
                let variant = variants.iter().find(|v| v.name.eq_ignore_ascii_case(name));
                path.push(match variant {
                    Some(v) => v.name.clone(),
                    None => name.to_lowercase(),
                });
                path.extend(field_path(variant, rest));
            }
        }
    }
    path
}
