//! Values held by cells and the coercion rules that produce them.
//!
//! A cell never stores "raw" input. Whatever arrives (a string typed into a
//! form, a TOML value from a config file, a JSON answer) goes through
//! [`coerce`] against the cell's [`TypeTag`] first. The result is a [`Slot`]:
//!
//! - [`Slot::Missing`]: the field is structurally required and nothing has
//!   been supplied yet. It never compares equal to a real value.
//! - [`Slot::Null`]: an optional field deliberately left empty (`None`).
//! - [`Slot::Filled`]: a concrete `toml::Value`.
//!
//! TOML values are the currency everywhere else in the crate (instance tables,
//! defaults, answers), so a filled slot can be written straight back into an
//! owner table.

use std::fmt;

use toml::Value;
use toml::value::Datetime;

/// A cell's value, including the two "no value" states.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Slot {
    #[default]
    Missing,
    Null,
    Filled(Value),
}

impl Slot {
    pub fn is_missing(&self) -> bool {
        matches!(self, Slot::Missing)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Slot::Null)
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Slot::Filled(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Slot::Filled(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    /// `true` for `Missing`, `Null`, an empty string and an empty array.
    pub fn is_blank(&self) -> bool {
        match self {
            Slot::Missing | Slot::Null => true,
            Slot::Filled(v) => is_blank(v),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Missing | Slot::Null => Ok(()),
            Slot::Filled(v) => write!(f, "{}", format_value(v)),
        }
    }
}

impl From<Value> for Slot {
    fn from(v: Value) -> Self {
        Slot::Filled(v)
    }
}

impl From<&str> for Slot {
    fn from(s: &str) -> Self {
        Slot::Filled(Value::String(s.to_string()))
    }
}

impl From<String> for Slot {
    fn from(s: String) -> Self {
        Slot::Filled(Value::String(s))
    }
}

impl From<i64> for Slot {
    fn from(i: i64) -> Self {
        Slot::Filled(Value::Integer(i))
    }
}

impl From<i32> for Slot {
    fn from(i: i32) -> Self {
        Slot::Filled(Value::Integer(i64::from(i)))
    }
}

impl From<u16> for Slot {
    fn from(i: u16) -> Self {
        Slot::Filled(Value::Integer(i64::from(i)))
    }
}

impl From<u32> for Slot {
    fn from(i: u32) -> Self {
        Slot::Filled(Value::Integer(i64::from(i)))
    }
}

impl From<f64> for Slot {
    fn from(f: f64) -> Self {
        Slot::Filled(Value::Float(f))
    }
}

impl From<bool> for Slot {
    fn from(b: bool) -> Self {
        Slot::Filled(Value::Boolean(b))
    }
}

impl<T: Into<Slot>> From<Option<T>> for Slot {
    fn from(v: Option<T>) -> Self {
        v.map_or(Slot::Null, Into::into)
    }
}

impl From<serde_json::Value> for Slot {
    fn from(v: serde_json::Value) -> Self {
        json_to_toml(v).map_or(Slot::Null, Slot::Filled)
    }
}

/// Convert JSON to TOML. `null` has no TOML counterpart: it maps to `None` at
/// the top and is dropped inside arrays and objects.
pub fn json_to_toml(v: serde_json::Value) -> Option<Value> {
    match v {
        serde_json::Value::Null => None,
        serde_json::Value::Bool(b) => Some(Value::Boolean(b)),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Some(Value::Integer(i)),
            None => n.as_f64().map(Value::Float),
        },
        serde_json::Value::String(s) => Some(Value::String(s)),
        serde_json::Value::Array(items) => Some(Value::Array(
            items.into_iter().filter_map(json_to_toml).collect(),
        )),
        serde_json::Value::Object(map) => Some(Value::Table(
            map.into_iter()
                .filter_map(|(k, v)| json_to_toml(v).map(|v| (k, v)))
                .collect(),
        )),
    }
}

/// Declared type of a leaf field.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeTag {
    /// Untyped: strings are parsed heuristically.
    Any,
    Bool,
    Int,
    Float,
    Str,
    Path,
    Date,
    Time,
    Datetime,
    Optional(Box<TypeTag>),
    List(Box<TypeTag>),
    Set(Box<TypeTag>),
    Tuple(Vec<TypeTag>),
    /// Alternatives tried in declaration order.
    Union(Vec<TypeTag>),
}

impl TypeTag {
    pub fn optional(inner: TypeTag) -> Self {
        TypeTag::Optional(Box::new(inner))
    }

    pub fn list(inner: TypeTag) -> Self {
        TypeTag::List(Box::new(inner))
    }

    pub fn set(inner: TypeTag) -> Self {
        TypeTag::Set(Box::new(inner))
    }

    /// Whether `None` is an acceptable value.
    pub fn is_nullable(&self) -> bool {
        match self {
            TypeTag::Optional(_) => true,
            TypeTag::Union(alts) => alts.iter().any(TypeTag::is_nullable),
            _ => false,
        }
    }

    pub fn is_collection(&self) -> bool {
        match self {
            TypeTag::List(_) | TypeTag::Set(_) | TypeTag::Tuple(_) => true,
            TypeTag::Optional(inner) => inner.is_collection(),
            _ => false,
        }
    }

    /// The type with any `Optional` wrapper removed.
    pub fn inner(&self) -> &TypeTag {
        match self {
            TypeTag::Optional(inner) => inner.inner(),
            other => other,
        }
    }

    /// Value of a zero-argument construction, tried last for empty input.
    fn zero(&self) -> Option<Value> {
        match self {
            TypeTag::List(_) | TypeTag::Set(_) => Some(Value::Array(Vec::new())),
            TypeTag::Str => Some(Value::String(String::new())),
            _ => None,
        }
    }

    /// Guess a type from a concrete value (used for untyped dict entries and
    /// confique defaults).
    pub fn infer(value: &Value) -> TypeTag {
        match value {
            Value::String(_) => TypeTag::Str,
            Value::Integer(_) => TypeTag::Int,
            Value::Float(_) => TypeTag::Float,
            Value::Boolean(_) => TypeTag::Bool,
            Value::Datetime(dt) => match (dt.date, dt.time) {
                (Some(_), None) => TypeTag::Date,
                (None, Some(_)) => TypeTag::Time,
                _ => TypeTag::Datetime,
            },
            Value::Array(items) => {
                TypeTag::list(items.first().map(TypeTag::infer).unwrap_or(TypeTag::Any))
            }
            Value::Table(_) => TypeTag::Any,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Any => write!(f, "any"),
            TypeTag::Bool => write!(f, "bool"),
            TypeTag::Int => write!(f, "int"),
            TypeTag::Float => write!(f, "float"),
            TypeTag::Str => write!(f, "str"),
            TypeTag::Path => write!(f, "path"),
            TypeTag::Date => write!(f, "date"),
            TypeTag::Time => write!(f, "time"),
            TypeTag::Datetime => write!(f, "datetime"),
            TypeTag::Optional(inner) => write!(f, "{inner} | None"),
            TypeTag::List(inner) => write!(f, "list[{inner}]"),
            TypeTag::Set(inner) => write!(f, "set[{inner}]"),
            TypeTag::Tuple(items) => {
                write!(f, "tuple[")?;
                for (i, t) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{t}")?;
                }
                write!(f, "]")
            }
            TypeTag::Union(alts) => {
                for (i, t) in alts.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{t}")?;
                }
                Ok(())
            }
        }
    }
}

/// Coerce `raw` into a value of type `ty`.
///
/// 1. `Missing` never coerces.
/// 2. Empty input against a nullable type commits `Null`.
/// 3. Direct cast: scalars parse from strings, collections take arrays or a
///    string in sequence syntax and coerce element-wise, unions try each
///    alternative in order and keep the first that casts and type-checks.
/// 4. Empty input falls back to the type's zero value if it has one.
pub fn coerce(raw: &Slot, ty: &TypeTag) -> Result<Slot, String> {
    let value = match raw {
        Slot::Missing => return Err("a value is required".into()),
        Slot::Null if ty.is_nullable() => return Ok(Slot::Null),
        Slot::Null => return Err(format!("expected {ty}, got nothing")),
        Slot::Filled(v) => v,
    };

    if is_blank_scalar(value) && ty.is_nullable() {
        return Ok(Slot::Null);
    }

    if let Some(v) = cast(value, ty) {
        return Ok(Slot::Filled(v));
    }

    if is_blank(value)
        && let Some(zero) = ty.zero()
    {
        return Ok(Slot::Filled(zero));
    }

    Err(format!("expected {ty}, got {}", describe(value)))
}

/// Type-check a slot without converting it.
pub fn accepts_slot(ty: &TypeTag, slot: &Slot) -> bool {
    match slot {
        Slot::Missing => false,
        Slot::Null => ty.is_nullable(),
        Slot::Filled(v) => accepts(ty, v),
    }
}

/// Type-check a concrete value without converting it.
pub fn accepts(ty: &TypeTag, value: &Value) -> bool {
    match (ty, value) {
        (TypeTag::Any, _) => true,
        (TypeTag::Bool, Value::Boolean(_)) => true,
        (TypeTag::Int, Value::Integer(_)) => true,
        (TypeTag::Float, Value::Float(_)) => true,
        (TypeTag::Str | TypeTag::Path, Value::String(_)) => true,
        (TypeTag::Date | TypeTag::Time | TypeTag::Datetime, Value::Datetime(dt)) => {
            has_shape(ty, dt)
        }
        (TypeTag::Optional(inner), v) => accepts(inner, v),
        (TypeTag::List(inner) | TypeTag::Set(inner), Value::Array(items)) => {
            items.iter().all(|item| accepts(inner, item))
        }
        (TypeTag::Tuple(types), Value::Array(items)) => {
            types.len() == items.len() && types.iter().zip(items).all(|(t, v)| accepts(t, v))
        }
        (TypeTag::Union(alts), v) => alts.iter().any(|alt| accepts(alt, v)),
        _ => false,
    }
}

fn cast(value: &Value, ty: &TypeTag) -> Option<Value> {
    match ty {
        TypeTag::Any => Some(match value {
            Value::String(s) => parse_scalar(s),
            other => other.clone(),
        }),
        TypeTag::Bool => match value {
            Value::Boolean(b) => Some(Value::Boolean(*b)),
            Value::String(s) => parse_bool(s).map(Value::Boolean),
            Value::Integer(0) => Some(Value::Boolean(false)),
            Value::Integer(1) => Some(Value::Boolean(true)),
            _ => None,
        },
        TypeTag::Int => match value {
            Value::Integer(i) => Some(Value::Integer(*i)),
            Value::String(s) => s.trim().parse::<i64>().ok().map(Value::Integer),
            _ => None,
        },
        TypeTag::Float => match value {
            Value::Float(f) => Some(Value::Float(*f)),
            Value::Integer(i) => Some(Value::Float(*i as f64)),
            Value::String(s) => s.trim().parse::<f64>().ok().map(Value::Float),
            _ => None,
        },
        TypeTag::Str => match value {
            Value::String(s) => Some(Value::String(s.clone())),
            Value::Integer(_) | Value::Float(_) | Value::Boolean(_) | Value::Datetime(_) => {
                Some(Value::String(format_value(value)))
            }
            _ => None,
        },
        TypeTag::Path => match value {
            Value::String(s) => Some(Value::String(s.clone())),
            _ => None,
        },
        TypeTag::Date | TypeTag::Time | TypeTag::Datetime => {
            let dt = match value {
                Value::Datetime(dt) => *dt,
                Value::String(s) => s.trim().parse::<Datetime>().ok()?,
                _ => return None,
            };
            has_shape(ty, &dt).then_some(Value::Datetime(dt))
        }
        TypeTag::Optional(inner) => cast(value, inner),
        TypeTag::List(inner) => {
            let items = sequence_items(value)?;
            items
                .iter()
                .map(|item| cast(item, inner))
                .collect::<Option<Vec<_>>>()
                .map(Value::Array)
        }
        TypeTag::Set(inner) => {
            let items = sequence_items(value)?;
            let mut out: Vec<Value> = Vec::with_capacity(items.len());
            for item in &items {
                let v = cast(item, inner)?;
                if !out.contains(&v) {
                    out.push(v);
                }
            }
            Some(Value::Array(out))
        }
        TypeTag::Tuple(types) => {
            let items = sequence_items(value)?;
            if items.len() != types.len() {
                return None;
            }
            items
                .iter()
                .zip(types)
                .map(|(item, t)| cast(item, t))
                .collect::<Option<Vec<_>>>()
                .map(Value::Array)
        }
        TypeTag::Union(alts) => {
            // Strings are untyped input and always go through the alternatives.
            if !matches!(value, Value::String(_)) && accepts(ty, value) {
                return Some(value.clone());
            }
            alts.iter()
                .find_map(|alt| cast(value, alt).filter(|v| accepts(alt, v)))
        }
    }
}

fn has_shape(ty: &TypeTag, dt: &Datetime) -> bool {
    match ty {
        TypeTag::Date => dt.date.is_some() && dt.time.is_none(),
        TypeTag::Time => dt.date.is_none() && dt.time.is_some(),
        TypeTag::Datetime => dt.date.is_some() && dt.time.is_some(),
        _ => false,
    }
}

fn sequence_items(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items.clone()),
        Value::String(s) => Some(parse_sequence(s)),
        _ => None,
    }
}

/// Parse a string in ordered-sequence syntax.
///
/// `[1, 2]` and bare `1, 2` are read as a TOML array. Input that is not valid
/// TOML (unquoted words) is split on commas, or on whitespace when there are
/// no commas, and each part becomes a string.
pub fn parse_sequence(s: &str) -> Vec<Value> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    let body = if trimmed.starts_with('[') {
        trimmed.to_string()
    } else {
        format!("[{trimmed}]")
    };
    if let Ok(mut table) = toml::from_str::<toml::Table>(&format!("v = {body}"))
        && let Some(Value::Array(items)) = table.remove("v")
    {
        return items;
    }

    let inner = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(trimmed);
    let parts: Vec<&str> = if inner.contains(',') {
        inner.split(',').collect()
    } else {
        inner.split_whitespace().collect()
    };
    parts
        .into_iter()
        .map(|p| p.trim().trim_matches(|c| c == '"' || c == '\''))
        .filter(|p| !p.is_empty())
        .map(|p| Value::String(p.to_string()))
        .collect()
}

/// Parse a string into a typed TOML value.
/// Tries: bool → integer → float → string.
pub fn parse_scalar(s: &str) -> Value {
    if s.eq_ignore_ascii_case("true") {
        return Value::Boolean(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Value::Boolean(false);
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        // Only use float if the string actually contains a dot,
        // to avoid "NaN" / "inf" being parsed as float.
        if s.contains('.') {
            return Value::Float(f);
        }
    }
    Value::String(s.to_string())
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "on" | "1" => Some(true),
        "false" | "no" | "n" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.is_empty(),
        other => is_blank_scalar(other),
    }
}

fn is_blank_scalar(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.trim().is_empty())
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{s}'"),
        other => format_value(other),
    }
}

/// Format a TOML value for display. Strings are shown bare, collections in
/// TOML inline syntax so the text can be typed back in.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Datetime(dt) => dt.to_string(),
        Value::Array(_) | Value::Table(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Slot {
        Slot::from(v)
    }

    fn strings(items: &[&str]) -> Value {
        Value::Array(items.iter().map(|i| Value::String(i.to_string())).collect())
    }

    #[test]
    fn missing_never_equals_a_value() {
        assert_ne!(Slot::Missing, Slot::from(""));
        assert_ne!(Slot::Missing, Slot::Null);
        assert_ne!(Slot::Missing, Slot::from(0));
    }

    #[test]
    fn missing_does_not_coerce() {
        assert!(coerce(&Slot::Missing, &TypeTag::Str).is_err());
        assert!(coerce(&Slot::Missing, &TypeTag::optional(TypeTag::Int)).is_err());
    }

    #[test]
    fn empty_input_against_optional_is_null() {
        let ty = TypeTag::optional(TypeTag::Int);
        assert_eq!(coerce(&s(""), &ty).unwrap(), Slot::Null);
        assert_eq!(coerce(&s("5"), &ty).unwrap(), Slot::from(5));
    }

    #[test]
    fn empty_input_against_list_is_empty_list() {
        let ty = TypeTag::list(TypeTag::Str);
        assert_eq!(coerce(&s(""), &ty).unwrap(), Slot::Filled(Value::Array(vec![])));
    }

    #[test]
    fn empty_input_against_int_fails() {
        assert!(coerce(&s(""), &TypeTag::Int).is_err());
    }

    #[test]
    fn string_to_scalars() {
        assert_eq!(coerce(&s(" 42 "), &TypeTag::Int).unwrap(), Slot::from(42));
        assert_eq!(coerce(&s("1.5"), &TypeTag::Float).unwrap(), Slot::from(1.5));
        assert_eq!(coerce(&s("yes"), &TypeTag::Bool).unwrap(), Slot::from(true));
        assert_eq!(coerce(&s("Off"), &TypeTag::Bool).unwrap(), Slot::from(false));
        assert!(coerce(&s("abc"), &TypeTag::Int).is_err());
    }

    #[test]
    fn integer_widens_to_float() {
        assert_eq!(coerce(&Slot::from(3), &TypeTag::Float).unwrap(), Slot::from(3.0));
    }

    #[test]
    fn scalars_stringify_for_str() {
        assert_eq!(coerce(&Slot::from(7), &TypeTag::Str).unwrap(), Slot::from("7"));
    }

    #[test]
    fn list_from_toml_syntax() {
        let ty = TypeTag::list(TypeTag::Int);
        let expected = Slot::Filled(Value::Array(vec![Value::Integer(1), Value::Integer(2)]));
        assert_eq!(coerce(&s("[1, 2]"), &ty).unwrap(), expected);
        assert_eq!(coerce(&s("1, 2"), &ty).unwrap(), expected);
    }

    #[test]
    fn list_elements_are_coerced_recursively() {
        let ty = TypeTag::list(TypeTag::Int);
        let raw = Slot::Filled(strings(&["3", "4"]));
        assert_eq!(
            coerce(&raw, &ty).unwrap(),
            Slot::Filled(Value::Array(vec![Value::Integer(3), Value::Integer(4)]))
        );
        assert!(coerce(&Slot::Filled(strings(&["x"])), &ty).is_err());
    }

    #[test]
    fn list_of_bare_words_splits() {
        let ty = TypeTag::list(TypeTag::Str);
        assert_eq!(
            coerce(&s("alpha, beta"), &ty).unwrap(),
            Slot::Filled(strings(&["alpha", "beta"]))
        );
        assert_eq!(
            coerce(&s("alpha beta"), &ty).unwrap(),
            Slot::Filled(strings(&["alpha", "beta"]))
        );
    }

    #[test]
    fn set_deduplicates_in_order() {
        let ty = TypeTag::set(TypeTag::Int);
        assert_eq!(
            coerce(&s("[3, 1, 3]"), &ty).unwrap(),
            Slot::Filled(Value::Array(vec![Value::Integer(3), Value::Integer(1)]))
        );
    }

    #[test]
    fn tuple_checks_arity_and_types() {
        let ty = TypeTag::Tuple(vec![TypeTag::Str, TypeTag::Int]);
        assert_eq!(
            coerce(&s(r#"["a", "2"]"#), &ty).unwrap(),
            Slot::Filled(Value::Array(vec![Value::String("a".into()), Value::Integer(2)]))
        );
        assert!(coerce(&s("[1]"), &ty).is_err());
    }

    #[test]
    fn union_tries_alternatives_in_order() {
        let ty = TypeTag::Union(vec![TypeTag::Int, TypeTag::Str]);
        assert_eq!(coerce(&s("12"), &ty).unwrap(), Slot::from(12));
        assert_eq!(coerce(&s("twelve"), &ty).unwrap(), Slot::from("twelve"));

        let reversed = TypeTag::Union(vec![TypeTag::Str, TypeTag::Int]);
        assert_eq!(coerce(&s("12"), &reversed).unwrap(), Slot::from("12"));
    }

    #[test]
    fn union_keeps_already_typed_value() {
        let ty = TypeTag::Union(vec![TypeTag::Str, TypeTag::Int]);
        assert_eq!(coerce(&Slot::from(12), &ty).unwrap(), Slot::from(12));
    }

    #[test]
    fn union_with_none_accepts_empty() {
        let ty = TypeTag::Union(vec![TypeTag::Int, TypeTag::optional(TypeTag::Str)]);
        assert_eq!(coerce(&s(""), &ty).unwrap(), Slot::Null);
    }

    #[test]
    fn dates_parse_and_check_shape() {
        assert!(coerce(&s("2024-02-29"), &TypeTag::Date).is_ok());
        assert!(coerce(&s("12:30:00"), &TypeTag::Time).is_ok());
        assert!(coerce(&s("2024-02-29T12:30:00"), &TypeTag::Datetime).is_ok());
        assert!(coerce(&s("12:30:00"), &TypeTag::Date).is_err());
        assert!(coerce(&s("2024-02-29"), &TypeTag::Datetime).is_err());
    }

    #[test]
    fn any_parses_heuristically() {
        assert_eq!(coerce(&s("true"), &TypeTag::Any).unwrap(), Slot::from(true));
        assert_eq!(coerce(&s("8080"), &TypeTag::Any).unwrap(), Slot::from(8080));
        assert_eq!(coerce(&s("1.5"), &TypeTag::Any).unwrap(), Slot::from(1.5));
        assert_eq!(coerce(&s("inf"), &TypeTag::Any).unwrap(), Slot::from("inf"));
    }

    #[test]
    fn accepts_checks_nested_types() {
        let ty = TypeTag::optional(TypeTag::list(TypeTag::Int));
        assert!(accepts_slot(&ty, &Slot::Null));
        assert!(accepts(&ty, &Value::Array(vec![Value::Integer(1)])));
        assert!(!accepts(&ty, &strings(&["1"])));
        assert!(!accepts_slot(&ty, &Slot::Missing));
    }

    #[test]
    fn infer_from_values() {
        assert_eq!(TypeTag::infer(&Value::Integer(1)), TypeTag::Int);
        assert_eq!(
            TypeTag::infer(&strings(&["a"])),
            TypeTag::list(TypeTag::Str)
        );
        assert_eq!(
            TypeTag::infer(&Value::Array(vec![])),
            TypeTag::list(TypeTag::Any)
        );
    }

    #[test]
    fn json_answers_convert() {
        let slot = Slot::from(serde_json::json!({"a": 1, "b": null, "c": [true, null]}));
        let table = slot.into_value().unwrap();
        let table = table.as_table().unwrap();
        assert_eq!(table["a"].as_integer(), Some(1));
        assert!(!table.contains_key("b"));
        assert_eq!(table["c"].as_array().unwrap().len(), 1);
        assert_eq!(Slot::from(serde_json::Value::Null), Slot::Null);
    }

    #[test]
    fn display_round_trips_through_coerce() {
        let ty = TypeTag::list(TypeTag::Str);
        let value = coerce(&s(r#"["a b", "c"]"#), &ty).unwrap();
        let shown = value.to_string();
        assert_eq!(coerce(&Slot::from(shown), &ty).unwrap(), value);
    }

    #[test]
    fn type_display() {
        let ty = TypeTag::optional(TypeTag::list(TypeTag::Int));
        assert_eq!(ty.to_string(), "list[int] | None");
    }
}
