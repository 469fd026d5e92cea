use std::path::PathBuf;
use thiserror::Error;

/// Every failure askfig reports to its caller.
///
/// Per-field coercion and validation failures are not errors: they stay on the
/// cell ([`Cell::error`](crate::Cell::error)) so a front end can show them next
/// to the field. Cancellation is not an error either; it is
/// [`Outcome::Cancelled`](crate::Outcome::Cancelled).
#[derive(Debug, Error)]
#[cfg_attr(feature = "rich-errors", derive(miette::Diagnostic))]
pub enum AskfigError {
    #[error("Unknown key '{key}' in {path} (line {line})")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(askfig::unknown_key)))]
    UnknownKey {
        key: String,
        path: PathBuf,
        line: usize,
    },

    #[error("Unknown keys in config file")]
    UnknownKeys(Vec<AskfigError>),

    #[error("Failed to parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to read {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("No field '{0}' in the schema")]
    UnknownField(String),

    /// The parser kept rejecting a field after it was answered, or the value
    /// provider could not render the request. Carries the parser's message.
    #[error("{diagnostic}")]
    #[cfg_attr(
        feature = "rich-errors",
        diagnostic(code(askfig::unresolvable), help("check the value against the parser's rules"))
    )]
    Unresolvable { diagnostic: String },

    #[error("No variant selected for '{position}' and no value provider to ask")]
    #[cfg_attr(
        feature = "rich-errors",
        diagnostic(code(askfig::ambiguous_union), help("pass a value provider to the resolver"))
    )]
    AmbiguousUnion { position: String },

    /// The parser refused the raw input outright (unknown flag, `--help`).
    #[error("{0}")]
    Rejected(String),

    #[error("App name is required: call .app_name() on the builder")]
    AppNameRequired,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_key_formats_correctly() {
        let err = AskfigError::UnknownKey {
            key: "typo_key".into(),
            path: "/home/user/.config/myapp/config.toml".into(),
            line: 42,
        };
        let msg = err.to_string();
        assert!(msg.contains("typo_key"));
        assert!(msg.contains("config.toml"));
        assert!(msg.contains("42"));
    }

    #[test]
    fn unresolvable_shows_parser_message_verbatim() {
        let err = AskfigError::Unresolvable {
            diagnostic: "the following required arguments were not provided: --name".into(),
        };
        assert_eq!(
            err.to_string(),
            "the following required arguments were not provided: --name"
        );
    }

    #[test]
    fn ambiguous_union_names_position() {
        let err = AskfigError::AmbiguousUnion {
            position: "command".into(),
        };
        assert!(err.to_string().contains("command"));
    }

    #[test]
    fn app_name_required_formats() {
        let err = AskfigError::AppNameRequired;
        assert!(err.to_string().contains("app_name"));
    }
}
