//! The value cell: one typed, validated value bound back to its owner.

use toml::{Table, Value};

use crate::check::{Rejection, Validator, run_all};
use crate::kinds::{CellKind, SelectSpec};
use crate::store::ObjectId;
use crate::value::{Slot, TypeTag, accepts_slot, coerce, format_value};

/// Where a committed value is written.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Binding {
    /// Free-standing; the value lives only in the cell.
    #[default]
    Free,
    /// A field of a schema instance, at a path of nested field names.
    Field { object: ObjectId, path: Vec<String> },
    /// An entry of a plain dict.
    Entry { dict: ObjectId, path: Vec<String> },
}

impl Binding {
    pub fn owner(&self) -> Option<(ObjectId, &[String])> {
        match self {
            Binding::Free => None,
            Binding::Field { object, path } => Some((*object, path)),
            Binding::Entry { dict, path } => Some((*dict, path)),
        }
    }
}

/// A typed value holder.
///
/// Cells live in a [`CellStore`](crate::CellStore); all mutation goes through
/// the store so commits can reach owners and linked cells. A cell on its own
/// only knows how to judge raw input ([`Cell::accept`]).
#[derive(Debug, Clone)]
pub struct Cell {
    pub(crate) value: Slot,
    pub(crate) original: Slot,
    pub(crate) ty: TypeTag,
    pub(crate) validators: Vec<Validator>,
    pub(crate) label: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) error: Option<String>,
    pub(crate) suggestion: Option<Slot>,
    pub(crate) kind: CellKind,
    pub(crate) binding: Binding,
}

impl Cell {
    /// An empty (`Missing`) cell of type `ty`. Paths and dates get their
    /// specialized kind automatically.
    pub fn new(ty: TypeTag) -> Self {
        Self {
            value: Slot::Missing,
            original: Slot::Missing,
            kind: CellKind::for_type(&ty),
            ty,
            validators: Vec::new(),
            label: None,
            description: None,
            error: None,
            suggestion: None,
            binding: Binding::Free,
        }
    }

    /// A selection over `spec`'s options. Multiple selections hold a list.
    pub fn select(spec: SelectSpec) -> Self {
        let ty = if spec.multiple {
            TypeTag::list(TypeTag::Any)
        } else {
            TypeTag::Any
        };
        Self::new(ty).with_kind(CellKind::Select(spec))
    }

    /// Initial value, also taken as the clean snapshot.
    pub fn with_value(mut self, value: impl Into<Slot>) -> Self {
        self.value = value.into();
        self.original = self.value.clone();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn with_validators(mut self, validators: impl IntoIterator<Item = Validator>) -> Self {
        self.validators.extend(validators);
        self
    }

    pub fn with_kind(mut self, kind: CellKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_binding(mut self, binding: Binding) -> Self {
        self.binding = binding;
        self
    }

    pub fn value(&self) -> &Slot {
        &self.value
    }

    pub fn original_value(&self) -> &Slot {
        &self.original
    }

    pub fn type_tag(&self) -> &TypeTag {
        &self.ty
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Message from the last failed update.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Replacement proposed by the last rejecting validator.
    pub fn suggestion(&self) -> Option<&Slot> {
        self.suggestion.as_ref()
    }

    pub fn kind(&self) -> &CellKind {
        &self.kind
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    /// The value differs from the clean snapshot.
    pub fn is_changed(&self) -> bool {
        self.value != self.original
    }

    /// Holds a value of its type and the last update did not fail.
    pub fn is_accepted(&self) -> bool {
        self.error.is_none() && accepts_slot(&self.ty, &self.value)
    }

    /// Run raw input through the pipeline without touching the cell:
    /// kind normalization, coercion, the kind's own check, then validators.
    pub fn accept(&self, raw: impl Into<Slot>) -> Result<Slot, Rejection> {
        let raw = self.kind.normalize(raw.into());
        let value = coerce(&raw, &self.ty).map_err(Rejection::new)?;
        let value = self.kind.check(&value).apply(value)?;
        run_all(&self.validators, value)
    }

    /// The form a value takes in the owner table. A variant selection
    /// commits as `{Variant = {}}`; `Missing` and `Null` have no TOML form.
    pub fn owned_form(&self, value: &Slot) -> Option<Value> {
        let value = value.as_value()?;
        match (&self.kind, value) {
            (CellKind::Select(spec), Value::String(name)) if spec.variants => {
                let mut table = Table::new();
                table.insert(name.clone(), Value::Table(Table::new()));
                Some(Value::Table(table))
            }
            _ => Some(value.clone()),
        }
    }

    /// Text for a front end: option labels for selections, masked secrets,
    /// empty for `Missing` and `None`.
    pub fn display(&self) -> String {
        match (&self.kind, &self.value) {
            (CellKind::Secret(spec), value) => spec.mask(&value.to_string()),
            (CellKind::Select(spec), Slot::Filled(Value::Array(items))) if spec.multiple => items
                .iter()
                .map(|item| option_text(spec, item))
                .collect::<Vec<_>>()
                .join(", "),
            (CellKind::Select(spec), Slot::Filled(value)) => option_text(spec, value),
            (_, value) => value.to_string(),
        }
    }
}

fn option_text(spec: &SelectSpec, value: &Value) -> String {
    spec.label_of(value)
        .map(str::to_string)
        .unwrap_or_else(|| format_value(value))
}
