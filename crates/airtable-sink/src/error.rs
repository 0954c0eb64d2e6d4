use serde::Deserialize;
use thiserror::Error;

/// Airtable's `error.type`, for the types the sync reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AirtableErrorKind {
    /// The field already exists, or the name is empty.
    DuplicateOrEmptyFieldName,
    /// A select value is not among the field's choices and the token may not add it.
    InvalidMultipleChoiceOptions,
    /// A value does not fit the field's type.
    InvalidValueForColumn,
    UnknownFieldName,
    Other(String),
}

impl AirtableErrorKind {
    pub fn from_type(error_type: &str) -> Self {
        match error_type {
            "DUPLICATE_OR_EMPTY_FIELD_NAME" => Self::DuplicateOrEmptyFieldName,
            "INVALID_MULTIPLE_CHOICE_OPTIONS" => Self::InvalidMultipleChoiceOptions,
            "INVALID_VALUE_FOR_COLUMN" => Self::InvalidValueForColumn,
            "UNKNOWN_FIELD_NAME" => Self::UnknownFieldName,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::DuplicateOrEmptyFieldName => "DUPLICATE_OR_EMPTY_FIELD_NAME",
            Self::InvalidMultipleChoiceOptions => "INVALID_MULTIPLE_CHOICE_OPTIONS",
            Self::InvalidValueForColumn => "INVALID_VALUE_FOR_COLUMN",
            Self::UnknownFieldName => "UNKNOWN_FIELD_NAME",
            Self::Other(other) => other,
        }
    }
}

impl std::fmt::Display for AirtableErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Airtable API request to {url} failed with status {status} ({kind}): {message}")]
    Api {
        url: String,
        status: u16,
        kind: AirtableErrorKind,
        message: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid Airtable response: {0}")]
    InvalidResponse(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Airtable sends either `{"error": {"type", "message"}}` or `{"error": "TYPE"}`.
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Detailed {
        #[serde(rename = "type")]
        error_type: String,
        #[serde(default)]
        message: String,
    },
    Bare(String),
}

impl Error {
    /// Build an [`Error::Api`] from a non-success response body.
    pub fn from_response(url: impl Into<String>, status: u16, body: &str) -> Self {
        let (kind, message) = match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(ErrorEnvelope {
                error: ErrorBody::Detailed {
                    error_type,
                    message,
                },
            }) => (AirtableErrorKind::from_type(&error_type), message),
            Ok(ErrorEnvelope {
                error: ErrorBody::Bare(error_type),
            }) => (AirtableErrorKind::from_type(&error_type), String::new()),
            Err(_) => (AirtableErrorKind::Other(String::new()), body.to_string()),
        };
        Self::Api {
            url: url.into(),
            status,
            kind,
            message,
        }
    }

    pub fn kind(&self) -> Option<&AirtableErrorKind> {
        match self {
            Self::Api { kind, .. } => Some(kind),
            _ => None,
        }
    }

    pub fn is_duplicate_field(&self) -> bool {
        self.kind() == Some(&AirtableErrorKind::DuplicateOrEmptyFieldName)
    }

    fn message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. } => Some(message),
            _ => None,
        }
    }

    /// The select option Airtable refused to add, for
    /// `INVALID_MULTIPLE_CHOICE_OPTIONS`.
    pub fn rejected_choice(&self) -> Option<&str> {
        if self.kind() != Some(&AirtableErrorKind::InvalidMultipleChoiceOptions) {
            return None;
        }
        quoted_after(self.message()?, "select option \"")
    }

    /// The field a value was rejected for, for `INVALID_VALUE_FOR_COLUMN`
    /// and `UNKNOWN_FIELD_NAME`.
    pub fn problem_field(&self) -> Option<&str> {
        let message = self.message()?;
        match self.kind()? {
            AirtableErrorKind::InvalidValueForColumn => quoted_after(message, "Field \""),
            AirtableErrorKind::UnknownFieldName => quoted_after(message, "field name: \""),
            _ => None,
        }
    }
}

/// Text between the quote that ends `marker` and the next quote.
/// Airtable sometimes doubles the quotes (`""value""`).
fn quoted_after<'a>(message: &'a str, marker: &str) -> Option<&'a str> {
    let start = message.find(marker)? + marker.len();
    let rest = message[start..].trim_start_matches('"');
    let end = rest.find('"')?;
    let value = &rest[..end];
    (!value.is_empty()).then_some(value)
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detailed_error_body() {
        let err = Error::from_response(
            "http://x",
            422,
            r#"{"error":{"type":"DUPLICATE_OR_EMPTY_FIELD_NAME","message":"Field \"Email\" already exists"}}"#,
        );
        assert!(err.is_duplicate_field());
        assert_eq!(err.problem_field(), None);
    }

    #[test]
    fn test_bare_error_body() {
        let err = Error::from_response("http://x", 404, r#"{"error":"NOT_FOUND"}"#);
        assert_eq!(
            err.kind(),
            Some(&AirtableErrorKind::Other("NOT_FOUND".to_string()))
        );
    }

    #[test]
    fn test_non_json_body_is_kept_as_message() {
        let err = Error::from_response("http://x", 502, "Bad Gateway");
        match err {
            Error::Api { message, kind, .. } => {
                assert_eq!(message, "Bad Gateway");
                assert_eq!(kind, AirtableErrorKind::Other(String::new()));
            }
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn test_rejected_choice() {
        let err = Error::from_response(
            "http://x",
            422,
            r#"{"error":{"type":"INVALID_MULTIPLE_CHOICE_OPTIONS","message":"Insufficient permissions to create new select option \"Prospect\""}}"#,
        );
        assert_eq!(err.rejected_choice(), Some("Prospect"));

        let doubled = Error::from_response(
            "http://x",
            422,
            r#"{"error":{"type":"INVALID_MULTIPLE_CHOICE_OPTIONS","message":"Insufficient permissions to create new select option \"\"Cold Lead\"\""}}"#,
        );
        assert_eq!(doubled.rejected_choice(), Some("Cold Lead"));
    }

    #[test]
    fn test_problem_field() {
        let err = Error::from_response(
            "http://x",
            422,
            r#"{"error":{"type":"INVALID_VALUE_FOR_COLUMN","message":"Field \"Annual_Revenue\" cannot accept the provided value"}}"#,
        );
        assert_eq!(err.problem_field(), Some("Annual_Revenue"));
        assert_eq!(err.rejected_choice(), None);

        let unknown = Error::from_response(
            "http://x",
            422,
            r#"{"error":{"type":"UNKNOWN_FIELD_NAME","message":"Unknown field name: \"Foo\""}}"#,
        );
        assert_eq!(unknown.problem_field(), Some("Foo"));
    }

    #[test]
    fn test_message_without_quotes() {
        let err = Error::from_response(
            "http://x",
            422,
            r#"{"error":{"type":"INVALID_VALUE_FOR_COLUMN","message":"cannot accept value"}}"#,
        );
        assert_eq!(err.problem_field(), None);
    }
}
