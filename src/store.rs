//! Arena of cells and the owner objects they write into.
//!
//! Cells never point at their owners directly. Each cell carries a
//! [`Binding`] naming an [`ObjectId`] and a path; the store owns the tables
//! behind those ids. Extra write targets registered by [`CellStore::fetch`]
//! are kept in an explicit link list keyed by [`CellId`], so a commit is a
//! bounded walk over ids.

use std::collections::{HashMap, HashSet};

use toml::{Table, Value};

use crate::cell::{Binding, Cell};
use crate::kinds::CellKind;
use crate::overrides::{get_nested, remove_nested, set_nested};
use crate::value::Slot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// Instance of a schema: keys are field names.
    Instance,
    /// Plain dict: keys are arbitrary.
    Dict,
}

#[derive(Debug, Clone)]
struct Object {
    kind: ObjectKind,
    table: Table,
}

/// Owns every cell and owner table of one resolution.
///
/// Cloning takes a snapshot; assigning the clone back restores it.
#[derive(Debug, Clone, Default)]
pub struct CellStore {
    cells: Vec<Cell>,
    objects: Vec<Object>,
    links: HashMap<CellId, Vec<CellId>>,
}

impl CellStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_object(&mut self, kind: ObjectKind, table: Table) -> ObjectId {
        self.objects.push(Object { kind, table });
        ObjectId(self.objects.len() - 1)
    }

    /// The table behind an owner.
    pub fn object(&self, id: ObjectId) -> &Table {
        &self.objects[id.0].table
    }

    pub fn object_kind(&self, id: ObjectId) -> ObjectKind {
        self.objects[id.0].kind
    }

    /// Add a cell. A filled initial value is mirrored into the owner so the
    /// owner and the cell agree from the start.
    pub fn insert(&mut self, cell: Cell) -> CellId {
        let id = CellId(self.cells.len());
        let value = cell.value.clone();
        self.cells.push(cell);
        if matches!(value, Slot::Filled(_)) {
            self.write_owner(id, &value);
        }
        id
    }

    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id.0]
    }

    pub fn get(&self, id: CellId) -> Option<&Cell> {
        self.cells.get(id.0)
    }

    pub(crate) fn cell_mut(&mut self, id: CellId) -> &mut Cell {
        &mut self.cells[id.0]
    }

    pub fn ids(&self) -> impl Iterator<Item = CellId> + '_ {
        (0..self.cells.len()).map(CellId)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Coerce and validate `raw`, then commit it.
    ///
    /// On failure the cell keeps its previous value and records the error
    /// (and any suggestion). On success the value is written to the cell, its
    /// owner, and every linked cell and owner. Returns whether it committed.
    pub fn update(&mut self, id: CellId, raw: impl Into<Slot>) -> bool {
        let raw = raw.into();
        match self.cells[id.0].accept(raw.clone()) {
            Ok(value) => {
                self.commit(id, value);
                true
            }
            Err(rejection) => {
                tracing::debug!(cell = id.0, ?raw, reason = %rejection.message, "update rejected");
                let cell = &mut self.cells[id.0];
                cell.error = Some(rejection.message);
                cell.suggestion = rejection.suggestion;
                false
            }
        }
    }

    /// Write `value` with no coercion or validation, through the same
    /// targets as a successful [`update`](Self::update).
    pub fn force_set(&mut self, id: CellId, value: impl Into<Slot>) {
        self.commit(id, value.into());
    }

    /// Make `target` the interactive stand-in for `source`.
    ///
    /// Label, description, validators and kind are copied from `source`
    /// where `target` has none, and `source` becomes an extra write target:
    /// every later commit through `target` is also committed to `source`.
    pub fn fetch(&mut self, target: CellId, source: CellId) {
        if target == source {
            return;
        }
        let from = self.cells[source.0].clone();
        let cell = &mut self.cells[target.0];
        if cell.label.is_none() {
            cell.label = from.label;
        }
        if cell.description.is_none() {
            cell.description = from.description;
        }
        if cell.validators.is_empty() {
            cell.validators = from.validators;
        }
        if cell.kind == CellKind::Plain {
            cell.kind = from.kind;
        }
        let links = self.links.entry(target).or_default();
        if !links.contains(&source) {
            links.push(source);
        }
    }

    /// Cells that receive commits made through `id`, excluding `id`.
    pub fn linked(&self, id: CellId) -> Vec<CellId> {
        self.reach(id).into_iter().filter(|c| *c != id).collect()
    }

    /// Flip a secret cell's visibility. Returns the new state; `false` for
    /// anything that is not a secret. The value is untouched.
    pub fn toggle_visibility(&mut self, id: CellId) -> bool {
        match &mut self.cells[id.0].kind {
            CellKind::Secret(spec) => {
                spec.show = !spec.show;
                spec.show
            }
            _ => false,
        }
    }

    /// Take the current value as the clean snapshot.
    pub fn mark_clean(&mut self, id: CellId) {
        let cell = &mut self.cells[id.0];
        cell.original = cell.value.clone();
    }

    /// The value stored in the owner of `id`, if it has one.
    pub fn owner_value(&self, id: CellId) -> Option<&Value> {
        let (object, path) = self.cells[id.0].binding.owner()?;
        get_nested(&self.objects[object.0].table, path)
    }

    /// Write straight into an owner table, outside any cell.
    pub(crate) fn force_write<S: AsRef<str>>(&mut self, object: ObjectId, path: &[S], value: Value) {
        set_nested(&mut self.objects[object.0].table, path, value);
    }

    fn commit(&mut self, id: CellId, value: Slot) {
        for target in self.reach(id) {
            let cell = &mut self.cells[target.0];
            cell.value = value.clone();
            cell.error = None;
            cell.suggestion = None;
            self.write_owner(target, &value);
        }
    }

    /// `id` followed by every cell reachable through links, each once.
    fn reach(&self, id: CellId) -> Vec<CellId> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if !seen.insert(next) {
                continue;
            }
            order.push(next);
            if let Some(targets) = self.links.get(&next) {
                stack.extend(targets.iter().rev().copied());
            }
        }
        order
    }

    fn write_owner(&mut self, id: CellId, value: &Slot) {
        let cell = &self.cells[id.0];
        let owned = cell.owned_form(value);
        let (object, path) = match &cell.binding {
            Binding::Free => return,
            Binding::Field { object, path } => (*object, path.clone()),
            Binding::Entry { dict, path } => (*dict, path.clone()),
        };
        let table = &mut self.objects[object.0].table;
        match owned {
            Some(v) => set_nested(table, &path, v),
            None => {
                remove_nested(table, &path);
            }
        }
    }
}
