//! Schema error types
//!
//! Two families live here:
//! - Validation failures (`ValidationError`, batched in `ValidationErrors`).
//!   These are ordinary outcomes of checking untrusted input.
//! - Definition and loading failures (`SchemaDefinitionError`, `SchemaError`).
//!   These are programmer or deployment errors and are reported once, when a
//!   schema is built or loaded.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

use super::types::Constraint;

/// Category of a field-level validation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// Required field absent and no default declared
    MissingField,
    /// Value could not be coerced to the declared type
    TypeMismatch,
    /// Coerced value failed a declared constraint
    ConstraintViolation,
    /// Undeclared key present while extras are forbidden
    ExtraField,
}

impl ErrorKind {
    /// Stable snake_case code for logs and machine consumers
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::MissingField => "missing_field",
            ErrorKind::TypeMismatch => "type_mismatch",
            ErrorKind::ConstraintViolation => "constraint_violation",
            ErrorKind::ExtraField => "extra_field",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// One step in a field path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, "{}", key),
            PathSegment::Index(i) => write!(f, "{}", i),
        }
    }
}

/// Location of a value inside the input, rendered as `friends.0.age`.
///
/// The empty path is the input itself and renders as `$root`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Returns this path extended by an object key.
    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Key(key.into()));
        Self(segments)
    }

    /// Returns this path extended by a list index.
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "$root");
        }
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    /// Path of the offending value
    pub path: FieldPath,
    /// Failure category
    pub kind: ErrorKind,
    /// Human-readable description
    pub message: String,
    /// Constraint name for `ConstraintViolation`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint: Option<&'static str>,
    /// Constraint bound for `ConstraintViolation`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bound: Option<Value>,
}

impl ValidationError {
    pub(crate) fn missing_field(path: FieldPath) -> Self {
        let message = format!("{} is required", path);
        Self {
            path,
            kind: ErrorKind::MissingField,
            message,
            constraint: None,
            bound: None,
        }
    }

    pub(crate) fn type_mismatch(path: FieldPath, expected: &str, actual: &str) -> Self {
        let message = format!("{}: expected {}, got {}", path, expected, actual);
        Self {
            path,
            kind: ErrorKind::TypeMismatch,
            message,
            constraint: None,
            bound: None,
        }
    }

    pub(crate) fn constraint_violation(
        path: FieldPath,
        constraint: &Constraint,
        message: String,
    ) -> Self {
        Self {
            path,
            kind: ErrorKind::ConstraintViolation,
            message,
            constraint: Some(constraint.name()),
            bound: Some(constraint.bound()),
        }
    }

    pub(crate) fn extra_field(path: FieldPath) -> Self {
        let message = format!("{} is not a declared field", path);
        Self {
            path,
            kind: ErrorKind::ExtraField,
            message,
            constraint: None,
            bound: None,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

/// Every problem found in one input. Never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    /// Wraps a batch, returning `None` when there is nothing to report.
    pub(crate) fn from_vec(errors: Vec<ValidationError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self(errors))
        }
    }

    pub(crate) fn single(error: ValidationError) -> Self {
        Self(vec![error])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[ValidationError] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<ValidationError> {
        self.0
    }

    /// Errors whose rendered path equals `path`.
    pub fn at<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a ValidationError> + 'a {
        self.0.iter().filter(move |e| e.path.to_string() == path)
    }

    /// Errors of the given kind.
    pub fn of_kind(&self, kind: ErrorKind) -> impl Iterator<Item = &ValidationError> + '_ {
        self.0.iter().filter(move |e| e.kind == kind)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", error.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Malformed schema declaration, reported by `SchemaBuilder::build`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaDefinitionError {
    #[error("schema name must not be empty")]
    EmptySchemaName,

    #[error("schema '{schema}' declares a field with an empty name or alias")]
    EmptyFieldName { schema: String },

    #[error("schema '{schema}' declares '{field}' more than once")]
    DuplicateField { schema: String, field: String },

    #[error("field '{field}' declares an enum with no variants")]
    EmptyEnum { field: String },

    #[error("constraint '{constraint}' cannot apply to {field_type} field '{field}'")]
    InapplicableConstraint {
        field: String,
        constraint: &'static str,
        field_type: &'static str,
    },

    #[error("field '{field}' has conflicting bounds: {reason}")]
    ConflictingBounds { field: String, reason: String },

    #[error("field '{field}' has an invalid '{constraint}' bound: {reason}")]
    InvalidBound {
        field: String,
        constraint: &'static str,
        reason: String,
    },

    #[error("field '{field}' has an invalid pattern: {reason}")]
    InvalidPattern { field: String, reason: String },

    #[error("field '{field}' has an invalid default: {reason}")]
    InvalidDefault { field: String, reason: String },
}

/// Failure while loading or looking up registered schemas
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed schema file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid schema definition in '{path}': {source}")]
    Definition {
        path: String,
        #[source]
        source: SchemaDefinitionError,
    },

    #[error("schema '{0}' is already registered")]
    Duplicate(String),

    #[error("schema '{0}' not found")]
    Unknown(String),
}

/// Result type for schema loading operations
pub type SchemaResult<T> = Result<T, SchemaError>;
