//! modelguard - declarative schema validation
//!
//! Build a [`Schema`] from [`FieldSpec`]s, then validate untyped JSON input
//! against it. Validation yields a typed [`Record`] or every
//! [`ValidationError`] found, never both.
//!
//! ```
//! use modelguard::{validate, FieldSpec, Schema};
//! use serde_json::json;
//!
//! let schema = Schema::builder("user")
//!     .field(FieldSpec::int("age").ge(0.0).le(99.0))
//!     .field(FieldSpec::str("name").default_value("x"))
//!     .build()
//!     .unwrap();
//!
//! let input = json!({"age": -1});
//! let errors = validate(&schema, input.as_object().unwrap()).unwrap_err();
//! assert_eq!(errors.as_slice()[0].message, "age must be >= 0");
//! ```

pub mod cli;
pub mod schema;

pub use schema::{
    validate, validate_value, CoercionMode, Constraint, ErrorKind, ExtraPolicy, FieldPath,
    FieldSpec, FieldType, FieldValue, Record, Schema, SchemaBuilder, SchemaDefinitionError,
    SchemaLoader, ValidationError, ValidationErrors, Validator,
};
