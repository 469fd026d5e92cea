//! The resolution protocol.
//!
//! A [`Resolver`] alternates between a [`Parser`] and a [`ValueProvider`]:
//!
//! 1. Attempt a parse with the defaults and the answers gathered so far.
//! 2. If a union position is undecided, ask for a variant (outermost first)
//!    and go back to 1.
//! 3. Otherwise gather every reported value gap into one request, ask, write
//!    the answers back, and go back to 1.
//!
//! Answers live in an owner object of the resolver's [`CellStore`], so
//! request cells write through to it like any other bound cell and a
//! cancelled request is undone by restoring the store.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use toml::{Table, Value};
use tracing::{debug, info, warn};

use crate::cell::{Binding, Cell};
use crate::check::required;
use crate::error::AskfigError;
use crate::kinds::CellKind;
use crate::overrides::split_key;
use crate::parse::{Attempt, Gap, ParseOutcome, Parser, is_union_gap};
use crate::provider::{Form, RequestOutcome, ValueProvider};
use crate::schema::{FieldKind, Target};
use crate::store::{CellId, CellStore, ObjectId, ObjectKind};
use crate::tree::{CellTree, Node, field_cell, variant_spec};
use crate::value::{Slot, TypeTag};

const DEFAULT_TITLE: &str = "Please provide the missing values";

/// Label of the top-level candidate choice.
const COMMAND_LABEL: &str = "command";

/// How a resolution ended, short of an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Resolved(T),
    /// The value provider cancelled. Nothing from the cancelled pass was
    /// committed.
    Cancelled,
}

impl<T> Outcome<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }

    pub fn resolved(self) -> Option<T> {
        match self {
            Outcome::Resolved(value) => Some(value),
            Outcome::Cancelled => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Resolved(value) => Outcome::Resolved(f(value)),
            Outcome::Cancelled => Outcome::Cancelled,
        }
    }

    /// Process exit code for a CLI wrapper: 0 when resolved, 1 when cancelled.
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Resolved(_) => 0,
            Outcome::Cancelled => 1,
        }
    }
}

/// A fully resolved instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// The chosen top-level candidate, for candidate targets.
    pub variant: Option<String>,
    /// Field values. For candidate targets, a single key naming the
    /// candidate, the serde external-tagging shape of an enum.
    pub values: Table,
    /// Requests sent to the value provider.
    pub passes: usize,
}

impl Resolution {
    /// The chosen candidate's own values, or all values for a single schema.
    pub fn variant_values(&self) -> &Table {
        match &self.variant {
            Some(name) => self
                .values
                .get(name)
                .and_then(Value::as_table)
                .unwrap_or(&self.values),
            None => &self.values,
        }
    }

    /// Deserialize into `T`. Keys `T` does not know are logged and skipped.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, AskfigError> {
        let mut ignored = Vec::new();
        let value: T = serde_ignored::deserialize(Value::Table(self.values.clone()), |path| {
            ignored.push(path.to_string());
        })
        .map_err(|e: toml::de::Error| AskfigError::InvalidValue {
            key: self.variant.clone().unwrap_or_else(|| "<root>".into()),
            reason: e.to_string(),
        })?;
        for key in &ignored {
            warn!(key = %key, "resolved key ignored by the target type");
        }
        Ok(value)
    }
}

/// A provider that never gets asked. Resolvers built with
/// [`Resolver::unattended`] fail instead of asking.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unattended;

impl ValueProvider for Unattended {
    fn request(&mut self, _form: &mut Form<'_>, _title: &str) -> RequestOutcome {
        RequestOutcome::RenderingFailed("no value provider".into())
    }
}

/// Drives parse attempts and value requests until a target resolves.
pub struct Resolver<P, V = Unattended> {
    parser: P,
    provider: Option<V>,
    store: CellStore,
    defaults: Table,
    title: String,
    reask_limit: usize,
    /// First cell asked for each shared field, across resolutions.
    shared: HashMap<String, CellId>,
}

impl<P: Parser> Resolver<P, Unattended> {
    /// A resolver with no one to ask: any gap is fatal.
    pub fn unattended(parser: P) -> Self {
        Self::build(parser, None)
    }
}

/// Per-resolution bookkeeping.
struct Pass {
    answers: ObjectId,
    /// Request cell of each asked path.
    cells: HashMap<String, CellId>,
    /// How often each path has been answered.
    answered: HashMap<String, usize>,
    passes: usize,
}

enum Step {
    Continue,
    Cancelled,
}

impl<P: Parser, V: ValueProvider> Resolver<P, V> {
    pub fn new(parser: P, provider: V) -> Self {
        Self::build(parser, Some(provider))
    }

    fn build(parser: P, provider: Option<V>) -> Self {
        Self {
            parser,
            provider,
            store: CellStore::new(),
            defaults: Table::new(),
            title: DEFAULT_TITLE.to_string(),
            reask_limit: 0,
            shared: HashMap::new(),
        }
    }

    /// Lowest-priority values: files, env and overrides.
    pub fn defaults(mut self, defaults: Table) -> Self {
        self.defaults = defaults;
        self
    }

    /// Title of value requests.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// How many times a field the parser reports again after it was answered
    /// is asked anew before the resolution fails. `0` fails on the first
    /// repeat.
    pub fn reask_limit(mut self, limit: usize) -> Self {
        self.reask_limit = limit;
        self
    }

    pub fn store(&self) -> &CellStore {
        &self.store
    }

    /// The interactive cell registered for a shared field
    /// (`"{origin}.{field}"`).
    pub fn shared_cell(&self, key: &str) -> Option<CellId> {
        self.shared.get(key).copied()
    }

    pub fn provider(&self) -> Option<&V> {
        self.provider.as_ref()
    }

    pub fn into_provider(self) -> Option<V> {
        self.provider
    }

    /// Resolve `target`, asking the value provider for whatever the parser
    /// cannot settle.
    pub fn resolve(&mut self, target: &Target) -> Result<Outcome<Resolution>, AskfigError> {
        let mut pass = Pass {
            answers: self.store.add_object(ObjectKind::Instance, Table::new()),
            cells: HashMap::new(),
            answered: HashMap::new(),
            passes: 0,
        };
        loop {
            let outcome = {
                let answers = self.store.object(pass.answers);
                self.parser.attempt(&Attempt {
                    target,
                    defaults: &self.defaults,
                    answers,
                })
            };
            let (gaps, diagnostic) = match outcome {
                ParseOutcome::Resolved(values) => {
                    let variant = match target {
                        Target::Candidates(_) => values.keys().next().cloned(),
                        Target::Single(_) => None,
                    };
                    debug!(passes = pass.passes, ?variant, "resolved");
                    return Ok(Outcome::Resolved(Resolution {
                        variant,
                        values,
                        passes: pass.passes,
                    }));
                }
                ParseOutcome::Rejected(diagnostic) => return Err(AskfigError::Rejected(diagnostic)),
                ParseOutcome::Unresolved { gaps, diagnostic } => (gaps, diagnostic),
            };
            debug!(gaps = gaps.len(), "parse attempt left gaps");

            for gap in &gaps {
                let times = pass.answered.get(&gap.path).copied().unwrap_or(0);
                if times > self.reask_limit {
                    debug!(path = %gap.path, times, "field reported again after answering");
                    return Err(AskfigError::Unresolvable { diagnostic });
                }
            }

            let step = match gaps.iter().find(|g| is_union_gap(target, g)) {
                Some(gap) => self.choose(target, gap, &mut pass, &diagnostic)?,
                None => self.ask(target, &gaps, &mut pass, &diagnostic)?,
            };
            if let Step::Cancelled = step {
                return Ok(Outcome::Cancelled);
            }
        }
    }

    /// Ask for the variant at a union gap and record it in the answers.
    fn choose(&mut self, target: &Target, gap: &Gap, pass: &mut Pass, diagnostic: &str) -> Result<Step, AskfigError> {
        let (variants, label, doc, path) = match target.locate(&gap.path) {
            _ if gap.path.is_empty() => {
                let Target::Candidates(candidates) = target else {
                    return Err(AskfigError::Unresolvable {
                        diagnostic: diagnostic.to_string(),
                    });
                };
                (candidates.as_slice(), COMMAND_LABEL.to_string(), None, Vec::new())
            }
            Some(field) => {
                let FieldKind::Union(variants) = &field.kind else {
                    return Err(AskfigError::Unresolvable {
                        diagnostic: diagnostic.to_string(),
                    });
                };
                let label = field.label.clone().unwrap_or_else(|| field.name.clone());
                let path: Vec<String> = split_key(&gap.path).into_iter().map(String::from).collect();
                (variants.as_slice(), label, field.doc.clone(), path)
            }
            None => {
                return Err(AskfigError::Unresolvable {
                    diagnostic: diagnostic.to_string(),
                });
            }
        };
        if self.provider.is_none() {
            return Err(AskfigError::AmbiguousUnion { position: label });
        }

        let mut cell = Cell::new(TypeTag::Str)
            .with_kind(CellKind::Select(variant_spec(variants)))
            .with_label(label.clone())
            .with_validator(required());
        if let Some(doc) = doc {
            cell = cell.with_description(doc);
        }
        if !path.is_empty() {
            cell = cell.with_binding(Binding::Field {
                object: pass.answers,
                path: path.clone(),
            });
        }
        let id = self.store.insert(cell);
        self.store.cell_mut(id).error = Some(gap.reason.clone());

        let mut request = CellTree::new();
        request.insert(label.clone(), Node::Cell(id));
        let title = format!("Choose {label}");
        if let Step::Cancelled = self.dispatch(&request, &title, pass, diagnostic)? {
            return Ok(Step::Cancelled);
        }

        let chosen = match self.store.cell(id).value() {
            Slot::Filled(Value::String(name)) => name.clone(),
            _ => {
                return Err(AskfigError::Unresolvable {
                    diagnostic: diagnostic.to_string(),
                });
            }
        };
        if !self.store.update(id, chosen.clone()) {
            return Err(AskfigError::Unresolvable {
                diagnostic: diagnostic.to_string(),
            });
        }
        if path.is_empty() {
            self.store
                .force_write(pass.answers, &[chosen.as_str()], Value::Table(Table::new()));
        }
        *pass.answered.entry(gap.path.clone()).or_default() += 1;
        info!(position = %label, variant = %chosen, "variant chosen");
        Ok(Step::Continue)
    }

    /// Ask for every value gap in one request.
    fn ask(&mut self, target: &Target, gaps: &[Gap], pass: &mut Pass, diagnostic: &str) -> Result<Step, AskfigError> {
        let mut request = CellTree::new();
        let mut asked: Vec<(String, CellId)> = Vec::new();
        let mut propagated = false;

        for gap in gaps {
            let Some(field) = target.locate(&gap.path) else {
                warn!(path = %gap.path, "parser reported a field outside the schema");
                continue;
            };
            let Some(ty) = field.leaf_type() else {
                continue;
            };
            let id = match pass.cells.get(&gap.path) {
                Some(id) => *id,
                None => {
                    let path: Vec<String> = split_key(&gap.path).into_iter().map(String::from).collect();
                    let mut cell = field_cell(field, ty).with_binding(Binding::Field {
                        object: pass.answers,
                        path,
                    });
                    if !ty.is_nullable() {
                        cell = cell.with_validator(required());
                    }
                    if let Some(value) = &gap.rejected {
                        cell = cell.with_value(value.clone());
                    }
                    cell.suggestion = gap.suggestion.clone();
                    let id = self.store.insert(cell);
                    pass.cells.insert(gap.path.clone(), id);
                    id
                }
            };
            self.store.cell_mut(id).error = Some(gap.reason.clone());

            let mut node = id;
            if let Some(key) = field.share_key() {
                match self.shared.get(&key).copied() {
                    Some(first) if first != id => {
                        self.store.fetch(first, id);
                        if self.store.cell(first).is_accepted() {
                            let value = self.store.cell(first).value().clone();
                            debug!(path = %gap.path, shared = %key, "reusing shared answer");
                            self.store.force_set(id, value);
                            *pass.answered.entry(gap.path.clone()).or_default() += 1;
                            propagated = true;
                            continue;
                        }
                        node = first;
                    }
                    Some(_) => {}
                    None => {
                        self.shared.insert(key, id);
                    }
                }
            }

            // Two groups extending one parent share a single cell.
            if asked.iter().any(|(_, asked_id)| *asked_id == node) {
                continue;
            }
            let mut segments: Vec<&str> = split_key(&gap.path);
            if field.origin.is_some() {
                segments.insert(segments.len().saturating_sub(1), "");
            }
            request.insert_at(&segments[..], Node::Cell(node));
            asked.push((gap.path.clone(), node));
        }

        if asked.is_empty() {
            if propagated {
                return Ok(Step::Continue);
            }
            return Err(AskfigError::Unresolvable {
                diagnostic: diagnostic.to_string(),
            });
        }
        if self.provider.is_none() {
            return Err(AskfigError::Unresolvable {
                diagnostic: diagnostic.to_string(),
            });
        }
        self.disambiguate_labels(target, &asked);

        let title = self.title.clone();
        if let Step::Cancelled = self.dispatch(&request, &title, pass, diagnostic)? {
            return Ok(Step::Cancelled);
        }

        let mut progress = propagated;
        for (path, id) in &asked {
            let value = self.store.cell(*id).value().clone();
            if value.is_missing() {
                continue;
            }
            if self.store.update(*id, value) {
                *pass.answered.entry(path.clone()).or_default() += 1;
                progress = true;
            }
        }
        if !progress {
            debug!("value provider answered nothing new");
            return Err(AskfigError::Unresolvable {
                diagnostic: diagnostic.to_string(),
            });
        }
        Ok(Step::Continue)
    }

    /// Short labels, except where two request fields share one: those show
    /// their full path.
    fn disambiguate_labels(&mut self, target: &Target, asked: &[(String, CellId)]) {
        let short = |path: &str| path.rsplit('.').next().unwrap_or(path).to_string();
        let mut counts: HashMap<String, usize> = HashMap::new();
        for (path, _) in asked {
            *counts.entry(short(path)).or_default() += 1;
        }
        for (path, id) in asked {
            let label = if counts.get(&short(path)).copied().unwrap_or(0) > 1 {
                path.clone()
            } else {
                match target.locate(path).and_then(|f| f.label.clone()) {
                    Some(label) => label,
                    None => short(path),
                }
            };
            self.store.cell_mut(*id).label = Some(label);
        }
    }

    /// Hand a request to the provider. Cancellation and rendering failure
    /// restore the store.
    fn dispatch(&mut self, request: &CellTree, title: &str, pass: &mut Pass, diagnostic: &str) -> Result<Step, AskfigError> {
        let Some(provider) = self.provider.as_mut() else {
            return Err(AskfigError::Unresolvable {
                diagnostic: diagnostic.to_string(),
            });
        };
        let snapshot = self.store.clone();
        pass.passes += 1;
        debug!(pass = pass.passes, fields = request.leaves().len(), title, "requesting values");
        let mut form = Form::new(request, &mut self.store);
        match provider.request(&mut form, title) {
            RequestOutcome::Answered => Ok(Step::Continue),
            RequestOutcome::Cancelled => {
                self.store = snapshot;
                info!(pass = pass.passes, "resolution cancelled");
                Ok(Step::Cancelled)
            }
            RequestOutcome::RenderingFailed(reason) => {
                self.store = snapshot;
                warn!(%reason, "value provider could not render the request");
                Err(AskfigError::Unresolvable {
                    diagnostic: diagnostic.to_string(),
                })
            }
        }
    }
}
