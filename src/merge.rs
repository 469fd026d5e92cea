use toml::{Table, Value};

use crate::schema::{FieldKind, Schema, Target, find_variant};
use crate::tree::chosen_variant;

/// Deep-merge `overlay` on top of `base`.
/// If both sides have a Table for the same key, recurse.
/// Otherwise, `overlay`'s value wins.
pub fn deep_merge(mut base: Table, overlay: Table) -> Table {
    for (key, overlay_val) in overlay {
        match (base.remove(&key), overlay_val) {
            (Some(Value::Table(base_tbl)), Value::Table(overlay_tbl)) => {
                base.insert(key, Value::Table(deep_merge(base_tbl, overlay_tbl)));
            }
            (_, overlay_val) => {
                base.insert(key, overlay_val);
            }
        }
    }
    base
}

/// Merge layers in ascending priority, following the target's schema.
///
/// Works like [`deep_merge`] except at union positions: when a higher layer
/// names a different variant than a lower one, the lower layer's variant is
/// dropped instead of merged alongside, so the result never names two
/// variants at once. Top-level candidate sections always merge side by side;
/// they are per-candidate settings, not a choice.
pub fn merge_layers(target: &Target, layers: &[&Table]) -> Table {
    let mut merged = Table::new();
    for layer in layers {
        let layer = (*layer).clone();
        merged = match target {
            Target::Single(schema) => overlay_schema(schema, merged, layer),
            Target::Candidates(candidates) => overlay_candidates(candidates, merged, layer),
        };
    }
    merged
}

fn overlay_candidates(candidates: &[Schema], mut base: Table, overlay: Table) -> Table {
    for (key, value) in overlay {
        let merged = match (find_variant(candidates, &key), base.remove(&key), value) {
            (Some(schema), Some(Value::Table(b)), Value::Table(o)) => {
                Value::Table(overlay_schema(schema, b, o))
            }
            (None, Some(Value::Table(b)), Value::Table(o)) => Value::Table(deep_merge(b, o)),
            (_, _, o) => o,
        };
        base.insert(key, merged);
    }
    base
}

fn overlay_schema(schema: &Schema, mut base: Table, overlay: Table) -> Table {
    for (key, value) in overlay {
        let kind = schema.get(&key).map(|f| &f.kind);
        let merged = match (kind, base.remove(&key), value) {
            (Some(FieldKind::Group(group)), Some(Value::Table(b)), Value::Table(o)) => {
                Value::Table(overlay_schema(group, b, o))
            }
            (Some(FieldKind::Union(variants)), Some(b), o) => overlay_union(variants, b, o),
            (_, Some(Value::Table(b)), Value::Table(o)) => Value::Table(deep_merge(b, o)),
            (_, _, o) => o,
        };
        base.insert(key, merged);
    }
    base
}

fn overlay_union(variants: &[Schema], base: Value, overlay: Value) -> Value {
    let same = match (
        chosen_variant(Some(&base), variants),
        chosen_variant(Some(&overlay), variants),
    ) {
        (Some(b), Some(o)) if b.name == o.name => Some(o),
        _ => None,
    };
    let Some(variant) = same else {
        return overlay;
    };
    let inner = |v: Value| match v {
        Value::Table(mut t) => match t.remove(&variant.name) {
            Some(Value::Table(inner)) => inner,
            _ => Table::new(),
        },
        _ => Table::new(),
    };
    let merged = overlay_schema(variant, inner(base), inner(overlay));
    Value::Table(Table::from_iter([(variant.name.clone(), Value::Table(merged))]))
}
