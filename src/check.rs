//! Validators: ordered callbacks that accept, transform or reject a coerced
//! value.

use std::fmt;
use std::sync::Arc;

use crate::value::Slot;

/// What a validator decided about a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Accept,
    /// Accept, replacing the value. Later validators see the replacement.
    Transform(Slot),
    /// Reject. A suggestion is kept on the cell so the next redisplay can be
    /// pre-filled with it; the value itself is rolled back.
    Reject {
        message: String,
        suggestion: Option<Slot>,
    },
}

impl Verdict {
    pub fn reject(message: impl Into<String>) -> Self {
        Verdict::Reject {
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn reject_with(message: impl Into<String>, suggestion: impl Into<Slot>) -> Self {
        Verdict::Reject {
            message: message.into(),
            suggestion: Some(suggestion.into()),
        }
    }

    /// Apply the verdict to `value`.
    pub fn apply(self, value: Slot) -> Result<Slot, Rejection> {
        match self {
            Verdict::Accept => Ok(value),
            Verdict::Transform(next) => Ok(next),
            Verdict::Reject {
                message,
                suggestion,
            } => Err(Rejection {
                message,
                suggestion,
            }),
        }
    }

    /// `Accept` when `ok`, otherwise `Reject` with `message`.
    pub fn check(ok: bool, message: impl Into<String>) -> Self {
        if ok {
            Verdict::Accept
        } else {
            Verdict::reject(message)
        }
    }
}

/// A failed coercion or validation, as stored on the cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub message: String,
    pub suggestion: Option<Slot>,
}

impl Rejection {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
        }
    }
}

type CheckFn = dyn Fn(&Slot) -> Verdict + Send + Sync;

/// A shared validation callback. Cloning is cheap; `fetch` copies validators
/// between cells.
#[derive(Clone)]
pub struct Validator {
    name: &'static str,
    f: Arc<CheckFn>,
}

impl Validator {
    pub fn new<F>(name: &'static str, f: F) -> Self
    where
        F: Fn(&Slot) -> Verdict + Send + Sync + 'static,
    {
        Self {
            name,
            f: Arc::new(f),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn run(&self, value: &Slot) -> Verdict {
        (self.f)(value)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Validator").field(&self.name).finish()
    }
}

/// Reject `Missing`, `None`, empty strings and empty collections.
pub fn required() -> Validator {
    Validator::new("required", |value| {
        Verdict::check(!value.is_blank(), "This field is required")
    })
}

/// Reject values whose text is empty after trimming. `None` passes.
pub fn non_empty() -> Validator {
    Validator::new("non_empty", |value| match value {
        Slot::Filled(toml::Value::String(s)) => {
            Verdict::check(!s.trim().is_empty(), "Must not be empty")
        }
        _ => Verdict::Accept,
    })
}

/// Numeric bounds, inclusive. Out-of-range values are rejected with the
/// nearest bound as a suggestion.
pub fn range(min: Option<f64>, max: Option<f64>) -> Validator {
    Validator::new("range", move |value| {
        let n = match value.as_value() {
            Some(toml::Value::Integer(i)) => *i as f64,
            Some(toml::Value::Float(f)) => *f,
            _ => return Verdict::Accept,
        };
        let integral = matches!(value.as_value(), Some(toml::Value::Integer(_)));
        let clamp = |bound: f64| -> Slot {
            if integral {
                Slot::from(bound as i64)
            } else {
                Slot::from(bound)
            }
        };
        if let Some(lo) = min
            && n < lo
        {
            return Verdict::reject_with(format!("Must be at least {lo}"), clamp(lo));
        }
        if let Some(hi) = max
            && n > hi
        {
            return Verdict::reject_with(format!("Must be at most {hi}"), clamp(hi));
        }
        Verdict::Accept
    })
}

/// Trim surrounding whitespace from string values.
pub fn trim() -> Validator {
    Validator::new("trim", |value| match value {
        Slot::Filled(toml::Value::String(s)) if s.trim() != s => {
            Verdict::Transform(Slot::from(s.trim()))
        }
        _ => Verdict::Accept,
    })
}

/// Accept only the listed values. `None` passes.
pub fn one_of<I, V>(allowed: I) -> Validator
where
    I: IntoIterator<Item = V>,
    V: Into<toml::Value>,
{
    let allowed: Vec<toml::Value> = allowed.into_iter().map(Into::into).collect();
    Validator::new("one_of", move |value| match value.as_value() {
        Some(v) if !allowed.contains(v) => {
            let names: Vec<String> = allowed.iter().map(crate::value::format_value).collect();
            Verdict::reject(format!("Must be one of: {}", names.join(", ")))
        }
        _ => Verdict::Accept,
    })
}

/// Build a validator from a plain predicate.
pub fn predicate<F>(message: &'static str, f: F) -> Validator
where
    F: Fn(&Slot) -> bool + Send + Sync + 'static,
{
    Validator::new("predicate", move |value| Verdict::check(f(value), message))
}

/// Run validators in order. Returns the possibly transformed value, or the
/// first rejection.
pub fn run_all(validators: &[Validator], mut value: Slot) -> Result<Slot, Rejection> {
    for v in validators {
        let verdict = v.run(&value);
        value = verdict.apply(value)?;
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_of_limits_values() {
        let v = one_of(["fast", "slow"]);
        assert_eq!(v.run(&Slot::from("fast")), Verdict::Accept);
        assert_eq!(v.run(&Slot::Null), Verdict::Accept);
        match v.run(&Slot::from("medium")) {
            Verdict::Reject { message, .. } => assert_eq!(message, "Must be one of: fast, slow"),
            other => panic!("Expected reject, got {other:?}"),
        }
    }

    #[test]
    fn required_rejects_blank_values() {
        let v = required();
        assert!(matches!(v.run(&Slot::Missing), Verdict::Reject { .. }));
        assert!(matches!(v.run(&Slot::Null), Verdict::Reject { .. }));
        assert!(matches!(v.run(&Slot::from("  ")), Verdict::Reject { .. }));
        assert_eq!(v.run(&Slot::from("Ann")), Verdict::Accept);
        assert_eq!(v.run(&Slot::from(0)), Verdict::Accept);
    }

    #[test]
    fn range_suggests_nearest_bound() {
        let v = range(Some(1.0), Some(10.0));
        assert_eq!(v.run(&Slot::from(5)), Verdict::Accept);
        assert_eq!(
            v.run(&Slot::from(42)),
            Verdict::reject_with("Must be at most 10", 10i64)
        );
        assert_eq!(
            v.run(&Slot::from(0.5)),
            Verdict::reject_with("Must be at least 1", 1.0)
        );
    }

    #[test]
    fn run_all_applies_transforms_in_order() {
        let shout = Validator::new("shout", |value| match value.as_str() {
            Some(s) => Verdict::Transform(Slot::from(s.to_uppercase())),
            None => Verdict::Accept,
        });
        let out = run_all(&[trim(), shout], Slot::from("  hi ")).unwrap();
        assert_eq!(out, Slot::from("HI"));
    }

    #[test]
    fn run_all_stops_at_first_rejection() {
        let never = predicate("never", |_| false);
        let unreachable = Validator::new("unreachable", |_| panic!("must not run"));
        let err = run_all(&[never, unreachable], Slot::from(1)).unwrap_err();
        assert_eq!(err, Rejection::new("never"));
    }

    #[test]
    fn validator_debug_shows_name() {
        assert_eq!(format!("{:?}", non_empty()), "Validator(\"non_empty\")");
    }
}
