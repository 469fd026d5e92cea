//! Dotted-key paths over nested `toml::Table`s.
//!
//! Programmatic defaults arrive as `("database.url", Value)` pairs and are
//! expanded into the nested table shape needed for deep-merge with the other
//! layers. The same path helpers back cell write-through: a bound cell
//! commits into its owner table at a path of segments.

use toml::{Table, Value};

/// Convert dotted-key overrides into a nested `toml::Table`.
///
/// `("database.url", Value::String("pg://"))` becomes `{database = {url = "pg://"}}`
///
/// If multiple entries target the same key, the last one wins.
pub fn overrides_to_table(entries: &[(String, Value)]) -> Table {
    let mut table = Table::new();
    for (dotted_key, value) in entries {
        set_nested(&mut table, &split_key(dotted_key), value.clone());
    }
    table
}

/// Split a dotted key into segments. The empty key has no segments.
pub fn split_key(dotted_key: &str) -> Vec<&str> {
    if dotted_key.is_empty() {
        Vec::new()
    } else {
        dotted_key.split('.').collect()
    }
}

/// Insert `value` at `path`, creating intermediate tables. An intermediate
/// that is not a table is replaced by one, the same way an overlay scalar
/// replaces a table in [`deep_merge`](crate::merge::deep_merge).
pub fn set_nested<S: AsRef<str>>(table: &mut Table, path: &[S], value: Value) {
    let Some((leaf, parents)) = path.split_last() else {
        return;
    };
    let mut current = table;
    for segment in parents {
        let entry = current
            .entry(segment.as_ref())
            .or_insert_with(|| Value::Table(Table::new()));
        if !entry.is_table() {
            *entry = Value::Table(Table::new());
        }
        let Value::Table(next) = entry else {
            return;
        };
        current = next;
    }
    current.insert(leaf.as_ref().to_string(), value);
}

pub fn get_nested<'a, S: AsRef<str>>(table: &'a Table, path: &[S]) -> Option<&'a Value> {
    let (leaf, parents) = path.split_last()?;
    let mut current = table;
    for segment in parents {
        current = current.get(segment.as_ref())?.as_table()?;
    }
    current.get(leaf.as_ref())
}

/// Remove the value at `path`. Intermediate tables are left in place.
pub fn remove_nested<S: AsRef<str>>(table: &mut Table, path: &[S]) -> Option<Value> {
    let (leaf, parents) = path.split_last()?;
    let mut current = table;
    for segment in parents {
        current = current.get_mut(segment.as_ref())?.as_table_mut()?;
    }
    current.remove(leaf.as_ref())
}

/// Join segments into a dotted key, skipping empty grouping segments.
pub fn join_key<S: AsRef<str>>(path: &[S]) -> String {
    path.iter()
        .map(AsRef::as_ref)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(pairs: &[(&str, Value)]) -> Vec<(String, Value)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn flat_key() {
        let table = overrides_to_table(&entries(&[("host", Value::String("0.0.0.0".into()))]));
        assert_eq!(table["host"].as_str().unwrap(), "0.0.0.0");
    }

    #[test]
    fn nested_key() {
        let table =
            overrides_to_table(&entries(&[("database.url", Value::String("pg://".into()))]));
        let db = table["database"].as_table().unwrap();
        assert_eq!(db["url"].as_str().unwrap(), "pg://");
    }

    #[test]
    fn deep_nesting() {
        let table = overrides_to_table(&entries(&[("a.b.c.d", Value::Integer(42))]));
        assert_eq!(table["a"]["b"]["c"]["d"].as_integer().unwrap(), 42);
    }

    #[test]
    fn last_entry_wins_for_same_key() {
        let table = overrides_to_table(&entries(&[
            ("port", Value::Integer(3000)),
            ("port", Value::Integer(5000)),
        ]));
        assert_eq!(table["port"].as_integer().unwrap(), 5000);
    }

    #[test]
    fn scalar_intermediate_is_replaced() {
        let mut table: Table = "database = \"flat\"".parse().unwrap();
        set_nested(&mut table, &["database", "url"], Value::String("pg://".into()));
        assert_eq!(table["database"]["url"].as_str().unwrap(), "pg://");
    }

    #[test]
    fn get_and_remove_nested() {
        let mut table: Table = "[a.b]\nc = 1\nd = 2".parse().unwrap();
        assert_eq!(get_nested(&table, &["a", "b", "c"]), Some(&Value::Integer(1)));
        assert_eq!(get_nested(&table, &["a", "x", "c"]), None);
        assert_eq!(remove_nested(&mut table, &["a", "b", "c"]), Some(Value::Integer(1)));
        assert!(get_nested(&table, &["a", "b", "c"]).is_none());
        assert!(get_nested(&table, &["a", "b", "d"]).is_some());
    }

    #[test]
    fn empty_path_is_a_no_op() {
        let mut table = Table::new();
        set_nested::<&str>(&mut table, &[], Value::Integer(1));
        assert!(table.is_empty());
        assert!(split_key("").is_empty());
    }

    #[test]
    fn join_skips_grouping_segments() {
        assert_eq!(join_key(&["deploy", "", "target"]), "deploy.target");
        assert_eq!(join_key::<&str>(&[]), "");
    }
}
