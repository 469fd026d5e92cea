//! Cell trees and schema traversal.
//!
//! A [`CellTree`] mirrors one schema instance: a leaf field is a
//! [`Node::Cell`], a nested group or a chosen union variant is a
//! [`Node::Tree`]. An unchosen union is a single selection cell over the
//! variant names. The empty key `""` groups cells that belong to the
//! enclosing level; [`resolve_tree`] hoists them back into it.
//!
//! [`to_tree`], [`bind_tree`] and [`from_dict`] are a standalone API for
//! front ends that edit a whole instance or dict. The resolver does not walk
//! whole schemas: it builds each request from the gaps of one parse attempt,
//! one cell per gap, and front ends read a request back through
//! [`Form::values`](crate::Form::values), which is [`resolve_tree`].

use toml::{Table, Value};

use crate::cell::{Binding, Cell};
use crate::kinds::{CellKind, SelectOption, SelectSpec};
use crate::merge::deep_merge;
use crate::overrides::{get_nested, join_key, split_key};
use crate::schema::{Field, FieldKind, Schema, find_variant};
use crate::store::{CellId, CellStore, ObjectId, ObjectKind};
use crate::value::{Slot, TypeTag};

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Cell(CellId),
    Tree(CellTree),
}

/// Ordered mapping of names to cells and subtrees.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellTree {
    entries: Vec<(String, Node)>,
}

impl CellTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace, keeping the position of an existing key.
    pub fn insert(&mut self, key: impl Into<String>, node: Node) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = node,
            None => self.entries.push((key, node)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, n)| n)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(k, n)| (k.as_str(), n))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every cell with its dotted path, depth first in insertion order.
    /// Grouping keys do not appear in paths.
    pub fn leaves(&self) -> Vec<(String, CellId)> {
        let mut out = Vec::new();
        self.collect_leaves(&mut Vec::new(), &mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, prefix: &mut Vec<&'a str>, out: &mut Vec<(String, CellId)>) {
        for (key, node) in &self.entries {
            prefix.push(key);
            match node {
                Node::Cell(id) => out.push((join_key(&prefix[..]), *id)),
                Node::Tree(sub) => sub.collect_leaves(prefix, out),
            }
            prefix.pop();
        }
    }

    pub fn cells(&self) -> Vec<CellId> {
        self.leaves().into_iter().map(|(_, id)| id).collect()
    }

    /// The node at a dotted path. A segment not found at a level is looked
    /// up inside that level's `""` group.
    pub fn get_path(&self, path: &str) -> Option<&Node> {
        let segments = split_key(path);
        let (first, rest) = segments.split_first()?;
        let mut node = self.find(first)?;
        for segment in rest {
            match node {
                Node::Tree(sub) => node = sub.find(segment)?,
                Node::Cell(_) => return None,
            }
        }
        Some(node)
    }

    pub fn cell_at(&self, path: &str) -> Option<CellId> {
        match self.get_path(path)? {
            Node::Cell(id) => Some(*id),
            Node::Tree(_) => None,
        }
    }

    fn find(&self, key: &str) -> Option<&Node> {
        if let Some(node) = self.get(key) {
            return Some(node);
        }
        match self.get("") {
            Some(Node::Tree(group)) if !key.is_empty() => group.find(key),
            _ => None,
        }
    }

    /// Insert at a dotted path, creating intermediate subtrees.
    pub fn insert_path(&mut self, path: &str, node: Node) {
        self.insert_at(&split_key(path), node);
    }

    /// Insert at a path of segments. Unlike [`insert_path`](Self::insert_path)
    /// the segments may include the `""` grouping key.
    pub fn insert_at<S: AsRef<str>>(&mut self, path: &[S], node: Node) {
        let Some((first, rest)) = path.split_first() else {
            return;
        };
        let key = first.as_ref();
        if rest.is_empty() {
            self.insert(key, node);
            return;
        }
        let pos = match self.entries.iter().position(|(k, _)| k == key) {
            Some(pos) => pos,
            None => {
                self.entries.push((key.to_string(), Node::Tree(CellTree::new())));
                self.entries.len() - 1
            }
        };
        if let Node::Cell(_) = self.entries[pos].1 {
            self.entries[pos].1 = Node::Tree(CellTree::new());
        }
        if let Node::Tree(sub) = &mut self.entries[pos].1 {
            sub.insert_at(rest, node);
        }
    }
}

/// Walk `schema` and produce one bound cell per leaf.
///
/// With an instance, cells start from its values; without one they start
/// from field defaults, `None` for optional fields, and `Missing` otherwise.
/// Defaults are written into the new owner object so it always mirrors the
/// cells.
pub fn to_tree(store: &mut CellStore, schema: &Schema, instance: Option<&Table>) -> CellTree {
    let object = store.add_object(ObjectKind::Instance, instance.cloned().unwrap_or_default());
    bind_tree(store, object, schema, &[])
}

/// Like [`to_tree`], over an existing owner object, rooted at `prefix`.
pub fn bind_tree(
    store: &mut CellStore,
    object: ObjectId,
    schema: &Schema,
    prefix: &[String],
) -> CellTree {
    let mut tree = CellTree::new();
    for field in &schema.fields {
        let mut path = prefix.to_vec();
        path.push(field.name.clone());
        let node = match &field.kind {
            FieldKind::Leaf(ty) => {
                let value = match get_nested(store.object(object), &path) {
                    Some(v) => Slot::Filled(v.clone()),
                    None => field.fallback(),
                };
                let cell = field_cell(field, ty)
                    .with_value(value)
                    .with_binding(Binding::Field { object, path });
                Node::Cell(store.insert(cell))
            }
            FieldKind::Group(group) => Node::Tree(bind_tree(store, object, group, &path)),
            FieldKind::Union(variants) => {
                let current = get_nested(store.object(object), &path).cloned();
                let chosen = chosen_variant(current.as_ref(), variants)
                    .or_else(|| default_variant(field, variants));
                match chosen {
                    Some(variant) => {
                        let name = variant.name.clone();
                        if current.as_ref().and_then(|v| v.get(&name)).is_none() {
                            let mut tagged = Table::new();
                            tagged.insert(name.clone(), Value::Table(Table::new()));
                            store.force_write(object, &path, Value::Table(tagged));
                        }
                        path.push(name.clone());
                        let mut sub = CellTree::new();
                        sub.insert(name, Node::Tree(bind_tree(store, object, variant, &path)));
                        Node::Tree(sub)
                    }
                    None => {
                        let cell = variant_cell(field, variants)
                            .with_binding(Binding::Field { object, path });
                        Node::Cell(store.insert(cell))
                    }
                }
            }
        };
        tree.insert(field.name.clone(), node);
    }
    tree
}

/// Walk a plain dict. Every non-table entry becomes a cell with an inferred
/// type, bound to the dict entry.
pub fn from_dict(store: &mut CellStore, dict: &Table) -> CellTree {
    let object = store.add_object(ObjectKind::Dict, dict.clone());
    dict_tree(store, object, dict, &[])
}

fn dict_tree(store: &mut CellStore, dict: ObjectId, table: &Table, prefix: &[String]) -> CellTree {
    let mut tree = CellTree::new();
    for (key, value) in table {
        let mut path = prefix.to_vec();
        path.push(key.clone());
        let node = match value {
            Value::Table(sub) => Node::Tree(dict_tree(store, dict, sub, &path)),
            other => {
                let cell = Cell::new(TypeTag::infer(other))
                    .with_label(key.clone())
                    .with_value(other.clone())
                    .with_binding(Binding::Entry { dict, path });
                Node::Cell(store.insert(cell))
            }
        };
        tree.insert(key.clone(), node);
    }
    tree
}

/// Read every cell back into a nested table shaped like the tree.
///
/// `""` groups are merged into their parent level. `Missing` and `None`
/// cells are left out; a variant selection reads as `{Variant = {}}`.
pub fn resolve_tree(store: &CellStore, tree: &CellTree) -> Table {
    let mut out = Table::new();
    for (key, node) in tree.iter() {
        match node {
            Node::Cell(id) => {
                let cell = store.cell(*id);
                if let Some(value) = cell.owned_form(cell.value()) {
                    out = deep_merge(out, Table::from_iter([(key.to_string(), value)]));
                }
            }
            Node::Tree(sub) => {
                let inner = resolve_tree(store, sub);
                if key.is_empty() {
                    out = deep_merge(out, inner);
                } else {
                    out = deep_merge(out, Table::from_iter([(key.to_string(), Value::Table(inner))]));
                }
            }
        }
    }
    out
}

/// A cell carrying a field's presentation and validation.
pub(crate) fn field_cell(field: &Field, ty: &TypeTag) -> Cell {
    let mut cell = Cell::new(ty.clone())
        .with_label(field.label.clone().unwrap_or_else(|| field.name.clone()))
        .with_validators(field.validators.iter().cloned());
    if let Some(doc) = &field.doc {
        cell = cell.with_description(doc.clone());
    }
    if let Some(kind) = &field.cell_kind {
        cell = cell.with_kind(kind.clone());
    }
    cell
}

/// A selection over union variants, annotated with each variant's doc.
pub(crate) fn variant_cell(field: &Field, variants: &[Schema]) -> Cell {
    let mut cell = Cell::new(TypeTag::Str)
        .with_kind(CellKind::Select(variant_spec(variants)))
        .with_label(field.label.clone().unwrap_or_else(|| field.name.clone()));
    if let Some(doc) = &field.doc {
        cell = cell.with_description(doc.clone());
    }
    cell
}

pub(crate) fn variant_spec(variants: &[Schema]) -> SelectSpec {
    let options = variants
        .iter()
        .map(|v| {
            let option = SelectOption::new(v.name.clone(), v.name.clone());
            match &v.doc {
                Some(doc) => option.description(doc.clone()),
                None => option,
            }
        })
        .collect();
    SelectSpec {
        options,
        multiple: false,
        variants: true,
    }
}

/// The variant named by an owner value: `{Variant = {...}}` with a single
/// key, or a bare variant name.
pub(crate) fn chosen_variant<'a>(value: Option<&Value>, variants: &'a [Schema]) -> Option<&'a Schema> {
    match value? {
        Value::Table(table) if table.len() == 1 => {
            let (name, _) = table.iter().next()?;
            find_variant(variants, name)
        }
        Value::String(name) => find_variant(variants, name),
        _ => None,
    }
}

fn default_variant<'a>(field: &Field, variants: &'a [Schema]) -> Option<&'a Schema> {
    let name = field.default.as_ref()?.as_str()?;
    find_variant(variants, name)
}
