//! Typed configuration that asks only for what is missing or wrong.
//!
//! Askfig resolves a described type from layered defaults (config files,
//! environment variables, programmatic values), raw input (command-line
//! tokens), and, for whatever those leave open, answers from a value
//! provider such as a terminal prompt.
//!
//! ```ignore
//! let outcome = Askfig::builder()
//!     .app_name("myapp")
//!     .args(std::env::args().skip(1))
//!     .run::<Deploy, _>(TextProvider::stdio())?;
//! std::process::exit(outcome.exit_code());
//! ```
//!
//! # Schemas
//!
//! A [`Schema`] is an explicit description of a type: named fields with a
//! [`TypeTag`], an optional default, a doc string, and [`Validator`]s.
//! Fields can be groups (nested schemas) or unions (exactly one of several
//! variant schemas). A [`Target`] is either one schema or a set of
//! top-level candidates, exactly one of which gets chosen, which is how
//! subcommands are modelled. Types implement [`Describe`] to hand out their
//! target. Schemas can also be imported from a confique config struct with
//! [`Schema::from_confique`].
//!
//! # Cells
//!
//! Every value the user can edit is a [`Cell`]: a slot holding a value, the
//! type it must coerce to, and the validators it must pass. Updating a cell
//! runs the coerce-then-validate pipeline; a rejected value rolls back and
//! leaves an error on the cell. Cells live in a [`CellStore`] arena and may be
//! bound to a path in an owner table, so an accepted value is written
//! through to every bound owner at once. Specialized cells ([`CellKind`])
//! add selection, path, temporal, and secret behaviour.
//!
//! A [`CellTree`] is a nested mapping of cells built from a schema; it is
//! what a value provider is shown.
//!
//! # Resolution
//!
//! A [`Resolver`] pairs a [`Parser`] with a [`ValueProvider`]:
//!
//! ```text
//! parse ── resolved ──────────────────────────▶ done
//!   │
//!   ├─ union undecided ─▶ ask for a variant ──▶ parse again
//!   │
//!   └─ values missing ──▶ ask for all of them ▶ parse again
//! ```
//!
//! Precedence is `defaults < raw input < answers`. A cancelled request
//! leaves nothing behind and ends in [`Outcome::Cancelled`]. A provider that
//! cannot render, a field that keeps coming back, or a pass that makes no
//! progress ends in [`AskfigError::Unresolvable`].
//!
//! Fields inherited from a common parent schema ([`Schema::extends`]) are
//! asked once per resolver and reused by every candidate that shares them.
//!
//! # Defaults layers
//!
//! ```text
//! Schema defaults       Field::default
//!        ↑ overridden by
//! Config files          search paths in order, later paths win
//!        ↑ overridden by
//! Environment vars      PREFIX__KEY
//!        ↑ overridden by
//! Programmatic values   .default_value()
//!        ↑ overridden by
//! Command line          --key value
//!        ↑ overridden by
//! Answers               the value provider
//! ```
//!
//! Config files are TOML and discovered through [`SearchPath`]s, either all
//! merged or only the nearest ([`SearchMode`]). In strict mode (the default)
//! a key the schema does not declare fails loading with the file path and
//! line. A config file may hold a section for every candidate; only the
//! command line or an answer picks one.
//!
//! # Clap
//!
//! With the `clap` feature (on by default), [`ClapParser`] turns a target
//! into a `clap::Command` at run time: one `--a.b` flag per leaf, one
//! subcommand per candidate. Nothing is required on the clap side; missing
//! values come back as gaps for the resolver to ask about.

pub mod cell;
pub mod check;
pub mod error;
pub mod kinds;
pub mod parse;
pub mod provider;
pub mod resolve;
pub mod schema;
pub mod store;
pub mod tree;
pub mod types;
pub mod value;

mod builder;
#[cfg(feature = "clap")]
mod cli;
mod env;
mod file;
pub(crate) mod merge;
mod overrides;
mod validate;

#[cfg(test)]
mod fixtures;

pub use builder::{Askfig, AskfigBuilder};
pub use cell::{Binding, Cell};
pub use check::{Validator, Verdict};
#[cfg(feature = "clap")]
pub use cli::ClapParser;
pub use error::AskfigError;
pub use kinds::{CellKind, PathSpec, SecretSpec, SelectOption, SelectSpec, TemporalSpec};
pub use parse::{Attempt, Gap, ParseOutcome, Parser, TableParser};
pub use provider::{Form, RequestOutcome, ScriptedProvider, TextProvider, ValueProvider};
pub use resolve::{Outcome, Resolution, Resolver, Unattended};
pub use schema::{Describe, Field, FieldKind, Schema, Target};
pub use store::{CellId, CellStore, ObjectId};
pub use tree::{CellTree, Node};
pub use types::{Boundary, SearchMode, SearchPath};
pub use value::{Slot, TypeTag};
