//! Specialized cells: selections, paths, dates and secrets.
//!
//! A specialized cell is an ordinary [`Cell`](crate::Cell) whose
//! [`CellKind`] carries extra constraints. The kind's check runs after
//! coercion and before the cell's own validators.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use toml::Value;
use toml::value::Datetime;

use crate::check::Verdict;
use crate::value::{Slot, TypeTag, parse_sequence};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellKind {
    #[default]
    Plain,
    Select(SelectSpec),
    Path(PathSpec),
    Temporal(TemporalSpec),
    Secret(SecretSpec),
}

impl CellKind {
    /// The kind a field of type `ty` gets when nothing more specific is
    /// declared.
    pub fn for_type(ty: &TypeTag) -> CellKind {
        match ty.inner() {
            TypeTag::Path => CellKind::Path(PathSpec::default()),
            TypeTag::List(inner) | TypeTag::Set(inner) if **inner == TypeTag::Path => {
                CellKind::Path(PathSpec {
                    multiple: true,
                    ..PathSpec::default()
                })
            }
            TypeTag::Date | TypeTag::Time | TypeTag::Datetime => {
                CellKind::Temporal(TemporalSpec::for_type(ty.inner()))
            }
            _ => CellKind::Plain,
        }
    }

    /// Map raw input onto the kind's vocabulary before coercion.
    pub(crate) fn normalize(&self, raw: Slot) -> Slot {
        match self {
            CellKind::Select(spec) => spec.normalize(raw),
            _ => raw,
        }
    }

    pub(crate) fn check(&self, value: &Slot) -> Verdict {
        if !matches!(value, Slot::Filled(_)) {
            return Verdict::Accept;
        }
        match self {
            CellKind::Plain | CellKind::Secret(_) => Verdict::Accept,
            CellKind::Select(spec) => spec.check(value),
            CellKind::Path(spec) => spec.check(value),
            CellKind::Temporal(spec) => spec.check(value),
        }
    }
}

/// One entry of a selection.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectOption {
    pub label: String,
    pub value: Value,
    pub description: Option<String>,
    /// Highlighted / recommended option.
    pub tip: bool,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            description: None,
            tip: false,
        }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn tip(mut self) -> Self {
        self.tip = true;
        self
    }
}

/// A value restricted to an enumerated option set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectSpec {
    pub options: Vec<SelectOption>,
    pub multiple: bool,
    /// The options name the variants of a union field. Committing writes
    /// `{Variant = {}}` into the owner instead of the bare name.
    pub variants: bool,
}

impl SelectSpec {
    pub fn new(options: Vec<SelectOption>) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Options whose label is also their value.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            labels
                .into_iter()
                .map(|l| {
                    let label: String = l.into();
                    SelectOption::new(label.clone(), label)
                })
                .collect(),
        )
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    /// Mark the options with these labels as recommended.
    pub fn tips(mut self, labels: &[&str]) -> Self {
        for opt in &mut self.options {
            if labels.contains(&opt.label.as_str()) {
                opt.tip = true;
            }
        }
        self
    }

    pub fn label_of(&self, value: &Value) -> Option<&str> {
        self.options
            .iter()
            .find(|o| &o.value == value)
            .map(|o| o.label.as_str())
    }

    fn by_label(&self, label: &str) -> Option<&Value> {
        self.options
            .iter()
            .find(|o| o.label == label)
            .map(|o| &o.value)
    }

    fn contains(&self, value: &Value) -> bool {
        self.options.iter().any(|o| &o.value == value)
    }

    fn normalize(&self, raw: Slot) -> Slot {
        let map_one = |v: Value| {
            let mapped = v.as_str().and_then(|s| self.by_label(s)).cloned();
            mapped.unwrap_or(v)
        };
        match raw {
            Slot::Filled(Value::String(s)) if self.multiple => {
                Slot::Filled(Value::Array(parse_sequence(&s).into_iter().map(map_one).collect()))
            }
            Slot::Filled(Value::Array(items)) if self.multiple => {
                Slot::Filled(Value::Array(items.into_iter().map(map_one).collect()))
            }
            Slot::Filled(v) => Slot::Filled(map_one(v)),
            other => other,
        }
    }

    fn check(&self, value: &Slot) -> Verdict {
        let ok = match value.as_value() {
            Some(Value::Array(items)) if self.multiple => items.iter().all(|i| self.contains(i)),
            Some(v) if !self.multiple => self.contains(v),
            _ => false,
        };
        let labels: Vec<&str> = self.options.iter().map(|o| o.label.as_str()).collect();
        Verdict::check(ok, format!("Must be one of: {}", labels.join(", ")))
    }
}

/// Filesystem constraints on a path (or list of paths).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathSpec {
    /// `Some(true)`: must exist. `Some(false)`: must not exist.
    pub exists: Option<bool>,
    pub is_file: bool,
    pub is_dir: bool,
    pub multiple: bool,
}

impl PathSpec {
    fn check(&self, value: &Slot) -> Verdict {
        let paths: Vec<&str> = match value.as_value() {
            Some(Value::String(s)) => vec![s.as_str()],
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => return Verdict::Accept,
        };
        for p in paths {
            if let Some(message) = self.check_one(Path::new(p)) {
                return Verdict::reject(message);
            }
        }
        Verdict::Accept
    }

    fn check_one(&self, path: &Path) -> Option<String> {
        let exists = path.exists();
        match self.exists {
            Some(true) if !exists => return Some(format!("{} does not exist", path.display())),
            Some(false) if exists => return Some(format!("{} already exists", path.display())),
            _ => {}
        }
        if self.is_file && !path.is_file() {
            return Some(format!("{} is not a file", path.display()));
        }
        if self.is_dir && !path.is_dir() {
            return Some(format!("{} is not a directory", path.display()));
        }
        None
    }
}

/// Which date/time components are active, plus optional bounds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TemporalSpec {
    pub date: bool,
    pub time: bool,
    /// Keep sub-second digits. Without it they are dropped on accept.
    pub full_precision: bool,
    /// Latest accepted value, inclusive.
    pub before: Option<Datetime>,
    /// Earliest accepted value, inclusive.
    pub after: Option<Datetime>,
}

impl TemporalSpec {
    pub fn for_type(ty: &TypeTag) -> Self {
        Self {
            date: matches!(ty, TypeTag::Date | TypeTag::Datetime),
            time: matches!(ty, TypeTag::Time | TypeTag::Datetime),
            ..Self::default()
        }
    }

    fn check(&self, value: &Slot) -> Verdict {
        let Some(Value::Datetime(dt)) = value.as_value() else {
            return Verdict::Accept;
        };
        if self.date != dt.date.is_some() || self.time != dt.time.is_some() {
            return Verdict::reject(self.expected_shape());
        }
        let Some(stamp) = naive(dt) else {
            return Verdict::reject(format!("{dt} is not a valid calendar value"));
        };
        if let Some(after) = &self.after
            && naive(after).is_some_and(|bound| stamp < bound)
        {
            return Verdict::reject_with(format!("Must not be before {after}"), Value::Datetime(*after));
        }
        if let Some(before) = &self.before
            && naive(before).is_some_and(|bound| stamp > bound)
        {
            return Verdict::reject_with(format!("Must not be after {before}"), Value::Datetime(*before));
        }
        if !self.full_precision
            && let Some(mut time) = dt.time
            && time.nanosecond != 0
        {
            time.nanosecond = 0;
            return Verdict::Transform(Slot::Filled(Value::Datetime(Datetime {
                time: Some(time),
                ..*dt
            })));
        }
        Verdict::Accept
    }

    fn expected_shape(&self) -> &'static str {
        match (self.date, self.time) {
            (true, false) => "Expected a date (YYYY-MM-DD)",
            (false, true) => "Expected a time (HH:MM:SS)",
            _ => "Expected a date and time (YYYY-MM-DDTHH:MM:SS)",
        }
    }
}

/// Convert to chrono for validity and ordering. A missing date counts as
/// 1970-01-01 and a missing time as midnight; the offset is ignored.
fn naive(dt: &Datetime) -> Option<NaiveDateTime> {
    let date = match dt.date {
        Some(d) => NaiveDate::from_ymd_opt(i32::from(d.year), u32::from(d.month), u32::from(d.day))?,
        None => NaiveDate::from_ymd_opt(1970, 1, 1)?,
    };
    let time = match dt.time {
        Some(t) => NaiveTime::from_hms_nano_opt(
            u32::from(t.hour),
            u32::from(t.minute),
            u32::from(t.second),
            t.nanosecond,
        )?,
        None => NaiveTime::MIN,
    };
    Some(date.and_time(time))
}

/// Masked secret. `show` is presentation state only.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SecretSpec {
    pub show: bool,
}

impl SecretSpec {
    pub fn mask(&self, text: &str) -> String {
        if self.show {
            text.to_string()
        } else {
            "•".repeat(text.chars().count())
        }
    }
}
