//! Schema subsystem for modelguard
//!
//! Schemas are built once, through `SchemaBuilder` or from JSON definition
//! files, and never change afterwards. Validation turns untyped JSON input
//! into a `Record` or a batch of `ValidationError`s.
//!
//! # Design Principles
//!
//! - Records only come out of validation
//! - All field errors are reported together
//! - Malformed schemas fail at build time, malformed input never panics
//! - Validation is deterministic and side-effect free

mod coerce;
mod errors;
mod loader;
mod record;
mod types;
mod validator;

pub use coerce::CoercionMode;
pub use errors::{
    ErrorKind, FieldPath, PathSegment, SchemaDefinitionError, SchemaError, SchemaResult,
    ValidationError, ValidationErrors,
};
pub use loader::{
    ConstraintDefinition, FieldDefinition, SchemaDefinition, SchemaLoader, TypeDefinition,
};
pub use record::{FieldValue, Record};
pub use types::{
    Constraint, DefaultValue, ExtraPolicy, FieldSpec, FieldType, Schema, SchemaBuilder,
};
pub use validator::{validate, validate_value, Validator};
