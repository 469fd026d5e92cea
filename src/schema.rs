//! Explicit schema description.
//!
//! A [`Schema`] is a named, ordered list of [`Field`]s. A field is a typed
//! leaf, a nested group, or a union of structured variants (the shape of a
//! subcommand). Schemas are built once per configuration type, either by hand
//! through the builder methods here, from a confique config's metadata
//! ([`Schema::from_confique`]), or by implementing [`Describe`].

use confique::meta::{FieldKind as MetaKind, LeafKind, Meta};

use crate::check::Validator;
use crate::kinds::CellKind;
use crate::value::{Slot, TypeTag};

#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub name: String,
    pub doc: Option<String>,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub doc: Option<String>,
    /// Display label. Falls back to the field name.
    pub label: Option<String>,
    pub kind: FieldKind,
    /// `None` means required: without input the field is missing.
    pub default: Option<Slot>,
    pub validators: Vec<Validator>,
    /// Overrides the kind derived from the type (selection, secret, bounds).
    pub cell_kind: Option<CellKind>,
    /// Name of the ancestor schema that declared this field, for fields
    /// inherited with [`Schema::extends`]. Variants sharing an origin share
    /// the field's answer.
    pub origin: Option<String>,
}

#[derive(Debug, Clone)]
pub enum FieldKind {
    Leaf(TypeTag),
    Group(Schema),
    /// Exactly one of these variants, keyed by schema name.
    Union(Vec<Schema>),
}

/// What a parse attempt resolves against.
#[derive(Debug, Clone)]
pub enum Target {
    Single(Schema),
    /// A top-level union: exactly one candidate is chosen.
    Candidates(Vec<Schema>),
}

/// Types that know their own schema.
pub trait Describe {
    fn describe() -> Target;
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Inherit `parent`'s fields, placed before this schema's own. Inherited
    /// fields remember `parent` as their origin unless they already have one.
    pub fn extends(mut self, parent: &Schema) -> Self {
        let mut inherited: Vec<Field> = parent
            .fields
            .iter()
            .filter(|f| !self.fields.iter().any(|own| own.name == f.name))
            .cloned()
            .map(|mut f| {
                f.origin.get_or_insert_with(|| parent.name.clone());
                f
            })
            .collect();
        inherited.append(&mut self.fields);
        self.fields = inherited;
        self
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The field at `path`. Union fields are entered through a variant name:
    /// `["command", "Deploy", "target"]`.
    pub fn locate<S: AsRef<str>>(&self, path: &[S]) -> Option<&Field> {
        let (first, rest) = path.split_first()?;
        let field = self.get(first.as_ref())?;
        if rest.is_empty() {
            return Some(field);
        }
        match &field.kind {
            FieldKind::Leaf(_) => None,
            FieldKind::Group(schema) => schema.locate(rest),
            FieldKind::Union(variants) => {
                let (variant, rest) = rest.split_first()?;
                let schema = find_variant(variants, variant.as_ref())?;
                if rest.is_empty() {
                    return Some(field);
                }
                schema.locate(rest)
            }
        }
    }

    /// Dotted paths of every leaf reachable without choosing a variant.
    pub fn leaf_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect_leaves(self, "", &mut out);
        out
    }

    /// Build a schema from a confique config's metadata.
    ///
    /// Doc comments become docs, `#[config(nested)]` becomes a group,
    /// `Option<T>` fields default to `None`, and `#[config(default = ...)]`
    /// expressions become defaults. Leaf types are inferred from the default;
    /// fields without one are `Any`.
    pub fn from_confique(meta: &Meta) -> Schema {
        Schema {
            name: meta.name.to_string(),
            doc: join_doc(meta.doc),
            fields: meta.fields.iter().map(field_from_meta).collect(),
        }
    }
}

fn field_from_meta(meta: &confique::meta::Field) -> Field {
    let doc = join_doc(meta.doc);
    let field = match &meta.kind {
        MetaKind::Nested { meta: nested, .. } => {
            Field::group(meta.name, Schema::from_confique(nested))
        }
        MetaKind::Leaf { kind, .. } => match kind {
            LeafKind::Optional => Field::new(meta.name, TypeTag::optional(TypeTag::Any)),
            LeafKind::Required { default, .. } => {
                let default = default
                    .as_ref()
                    .and_then(|expr| toml::Value::try_from(expr).ok());
                match default {
                    Some(value) => Field::new(meta.name, TypeTag::infer(&value)).default(value),
                    None => Field::new(meta.name, TypeTag::Any),
                }
            }
        },
    };
    match doc {
        Some(doc) => field.doc(doc),
        None => field,
    }
}

fn join_doc(lines: &[&str]) -> Option<String> {
    let text = lines
        .iter()
        .map(|l| l.trim())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string();
    (!text.is_empty()).then_some(text)
}

fn collect_leaves(schema: &Schema, prefix: &str, out: &mut Vec<String>) {
    for field in &schema.fields {
        let dotted = if prefix.is_empty() {
            field.name.clone()
        } else {
            format!("{prefix}.{}", field.name)
        };
        match &field.kind {
            FieldKind::Leaf(_) => out.push(dotted),
            FieldKind::Group(group) => collect_leaves(group, &dotted, out),
            FieldKind::Union(_) => {}
        }
    }
}

pub fn find_variant<'a>(variants: &'a [Schema], name: &str) -> Option<&'a Schema> {
    variants.iter().find(|v| v.name == name)
}

impl Field {
    /// A required leaf.
    pub fn new(name: impl Into<String>, ty: TypeTag) -> Self {
        Self::with_kind(name, FieldKind::Leaf(ty))
    }

    pub fn group(name: impl Into<String>, schema: Schema) -> Self {
        Self::with_kind(name, FieldKind::Group(schema))
    }

    pub fn union(name: impl Into<String>, variants: Vec<Schema>) -> Self {
        Self::with_kind(name, FieldKind::Union(variants))
    }

    fn with_kind(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            doc: None,
            label: None,
            kind,
            default: None,
            validators: Vec::new(),
            cell_kind: None,
            origin: None,
        }
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn default(mut self, value: impl Into<Slot>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn cell_kind(mut self, kind: CellKind) -> Self {
        self.cell_kind = Some(kind);
        self
    }

    pub fn leaf_type(&self) -> Option<&TypeTag> {
        match &self.kind {
            FieldKind::Leaf(ty) => Some(ty),
            _ => None,
        }
    }

    /// The value a field takes when no layer supplies one: its default,
    /// `None` for nullable leaves, otherwise `Missing`.
    pub fn fallback(&self) -> Slot {
        match (&self.default, &self.kind) {
            (Some(default), _) => default.clone(),
            (None, FieldKind::Leaf(ty)) if ty.is_nullable() => Slot::Null,
            _ => Slot::Missing,
        }
    }

    /// Key under which answers to this field are shared between variants.
    pub fn share_key(&self) -> Option<String> {
        self.origin
            .as_ref()
            .map(|origin| format!("{origin}.{}", self.name))
    }
}

impl Target {
    /// The field at a dotted path. With candidates, the first segment names
    /// the candidate.
    pub fn locate(&self, path: &str) -> Option<&Field> {
        let segments: Vec<&str> = crate::overrides::split_key(path);
        match self {
            Target::Single(schema) => schema.locate(&segments[..]),
            Target::Candidates(candidates) => {
                let (first, rest) = segments.split_first()?;
                find_variant(candidates, first)?.locate(rest)
            }
        }
    }

    pub fn candidate_names(&self) -> Vec<&str> {
        match self {
            Target::Single(schema) => vec![schema.name.as_str()],
            Target::Candidates(candidates) => candidates.iter().map(|c| c.name.as_str()).collect(),
        }
    }
}

impl From<Schema> for Target {
    fn from(schema: Schema) -> Self {
        Target::Single(schema)
    }
}
