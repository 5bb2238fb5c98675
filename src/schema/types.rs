//! Schema type definitions
//!
//! Supported field types:
//! - str: UTF-8 string
//! - int: 64-bit signed integer
//! - float: 64-bit floating point
//! - bool: Boolean
//! - datetime: UTC timestamp (RFC 3339 on the wire)
//! - date: calendar date (YYYY-MM-DD)
//! - uuid: hyphenated UUID
//! - email: string with an address shape
//! - enum: string drawn from a fixed variant list
//! - list: homogeneous list with element type
//! - nested: object validated against its own schema
//!
//! A `Schema` is only obtainable from `SchemaBuilder::build`, which rejects
//! malformed definitions. Once built it cannot be changed.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::{SchemaDefinitionError, ValidationErrors};
use super::record::{FieldValue, Record};
use super::validator::{self, Validator};

/// Declared type of a field.
#[derive(Debug, Clone)]
pub enum FieldType {
    /// UTF-8 string
    Str,
    /// 64-bit signed integer
    Int,
    /// 64-bit floating point
    Float,
    /// Boolean
    Bool,
    /// UTC timestamp
    DateTime,
    /// Calendar date without time zone
    Date,
    /// UUID of any version
    Uuid,
    /// String shaped like `local@domain.tld`
    Email,
    /// String restricted to the listed variants
    Enum(Vec<String>),
    /// Homogeneous list
    List(Box<FieldType>),
    /// Nested object with its own schema
    Nested(Schema),
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Str => "str",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Bool => "bool",
            FieldType::DateTime => "datetime",
            FieldType::Date => "date",
            FieldType::Uuid => "uuid",
            FieldType::Email => "email",
            FieldType::Enum(_) => "enum",
            FieldType::List(_) => "list",
            FieldType::Nested(_) => "object",
        }
    }

    /// Creates a list type over the given element type.
    pub fn list(element: FieldType) -> Self {
        FieldType::List(Box::new(element))
    }

    /// Creates an enum type from string variants.
    pub fn enumeration<I, S>(variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldType::Enum(variants.into_iter().map(Into::into).collect())
    }

    fn is_textual(&self) -> bool {
        matches!(self, FieldType::Str | FieldType::Email)
    }

    fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Int | FieldType::Float)
    }

    fn has_length(&self) -> bool {
        self.is_textual() || matches!(self, FieldType::List(_))
    }

    /// True for an empty enum here or anywhere down a list's element types.
    fn has_empty_enum(&self) -> bool {
        match self {
            FieldType::Enum(variants) => variants.is_empty(),
            FieldType::List(element) => element.has_empty_enum(),
            _ => false,
        }
    }
}

/// A single check applied to a successfully coerced value.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// Minimum string length in characters, or minimum list length
    MinLength(usize),
    /// Maximum string length in characters, or maximum list length
    MaxLength(usize),
    /// Value must be >= bound
    Ge(f64),
    /// Value must be > bound
    Gt(f64),
    /// Value must be <= bound
    Le(f64),
    /// Value must be < bound
    Lt(f64),
    /// Value must be an integral multiple of the bound
    MultipleOf(f64),
    /// String must match the regex (unanchored search)
    Pattern(Regex),
}

impl Constraint {
    /// Short constraint name as it appears in error output.
    pub fn name(&self) -> &'static str {
        match self {
            Constraint::MinLength(_) => "min_length",
            Constraint::MaxLength(_) => "max_length",
            Constraint::Ge(_) => "ge",
            Constraint::Gt(_) => "gt",
            Constraint::Le(_) => "le",
            Constraint::Lt(_) => "lt",
            Constraint::MultipleOf(_) => "multiple_of",
            Constraint::Pattern(_) => "pattern",
        }
    }

    /// The constraint's bound as a JSON value.
    pub fn bound(&self) -> Value {
        match self {
            Constraint::MinLength(n) | Constraint::MaxLength(n) => Value::from(*n as u64),
            Constraint::Ge(b)
            | Constraint::Gt(b)
            | Constraint::Le(b)
            | Constraint::Lt(b)
            | Constraint::MultipleOf(b) => number_value(*b),
            Constraint::Pattern(re) => Value::String(re.as_str().to_string()),
        }
    }

    fn applies_to(&self, field_type: &FieldType) -> bool {
        match self {
            Constraint::MinLength(_) | Constraint::MaxLength(_) => field_type.has_length(),
            Constraint::Ge(_)
            | Constraint::Gt(_)
            | Constraint::Le(_)
            | Constraint::Lt(_)
            | Constraint::MultipleOf(_) => field_type.is_numeric(),
            Constraint::Pattern(_) => field_type.is_textual(),
        }
    }
}

/// Integral bounds render as JSON integers so `ge=0` reports `0`, not `0.0`.
fn number_value(bound: f64) -> Value {
    if bound.fract() == 0.0 && bound.abs() < i64::MAX as f64 {
        Value::from(bound as i64)
    } else {
        Value::from(bound)
    }
}

/// Value used when a field is absent from the input.
#[derive(Clone)]
pub enum DefaultValue {
    /// Fixed value, checked against the field when the schema is built
    Static(Value),
    /// Called once per validation that needs it
    Factory(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    /// Produces the raw default, before coercion and constraints.
    pub fn materialize(&self) -> Value {
        match self {
            DefaultValue::Static(value) => value.clone(),
            DefaultValue::Factory(factory) => factory(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Static(value) => f.debug_tuple("Static").field(value).finish(),
            DefaultValue::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// Field declaration: name, type, optionality, default and constraints.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: String,
    alias: Option<String>,
    field_type: FieldType,
    optional: bool,
    default: Option<DefaultValue>,
    /// Static default after coercion, filled in by `SchemaBuilder::build`
    resolved_default: Option<FieldValue>,
    constraints: Vec<Constraint>,
}

impl FieldSpec {
    /// Creates a required field with no constraints.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            alias: None,
            field_type,
            optional: false,
            default: None,
            resolved_default: None,
            constraints: Vec::new(),
        }
    }

    /// Create a required string field
    pub fn str(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Str)
    }

    /// Create a required int field
    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Int)
    }

    /// Create a required float field
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Float)
    }

    /// Create a required bool field
    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Bool)
    }

    /// Create a required nested object field
    pub fn nested(name: impl Into<String>, schema: Schema) -> Self {
        Self::new(name, FieldType::Nested(schema))
    }

    /// Create a required list field
    pub fn list(name: impl Into<String>, element: FieldType) -> Self {
        Self::new(name, FieldType::list(element))
    }

    /// Marks the field as optional: `null` is accepted, and absence yields
    /// `null` unless a default is set.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Reads the field from `alias` in the input. The field name is still
    /// accepted as a fallback key.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Sets a static default.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Static(value.into()));
        self.resolved_default = None;
        self
    }

    /// Sets a default computed on each use.
    pub fn default_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Factory(Arc::new(factory)));
        self.resolved_default = None;
        self
    }

    /// Appends a constraint. Constraints run in the order they are added.
    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn min_length(self, n: usize) -> Self {
        self.constraint(Constraint::MinLength(n))
    }

    pub fn max_length(self, n: usize) -> Self {
        self.constraint(Constraint::MaxLength(n))
    }

    pub fn ge(self, bound: f64) -> Self {
        self.constraint(Constraint::Ge(bound))
    }

    pub fn gt(self, bound: f64) -> Self {
        self.constraint(Constraint::Gt(bound))
    }

    pub fn le(self, bound: f64) -> Self {
        self.constraint(Constraint::Le(bound))
    }

    pub fn lt(self, bound: f64) -> Self {
        self.constraint(Constraint::Lt(bound))
    }

    pub fn multiple_of(self, bound: f64) -> Self {
        self.constraint(Constraint::MultipleOf(bound))
    }

    /// Appends a regex constraint, compiling the pattern now.
    pub fn pattern(self, pattern: &str) -> Result<Self, SchemaDefinitionError> {
        let re = Regex::new(pattern).map_err(|e| SchemaDefinitionError::InvalidPattern {
            field: self.name.clone(),
            reason: e.to_string(),
        })?;
        Ok(self.constraint(Constraint::Pattern(re)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The key this field is read from: the alias if set, else the name.
    pub fn input_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn alias_name(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn default(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// The coerced static default. Only set on fields of a built schema.
    pub(crate) fn resolved_default(&self) -> Option<&FieldValue> {
        self.resolved_default.as_ref()
    }

    /// Checks the declaration itself, independent of its siblings, and
    /// resolves a static default to its coerced value.
    fn check_definition(&mut self) -> Result<(), SchemaDefinitionError> {
        if self.field_type.has_empty_enum() {
            return Err(SchemaDefinitionError::EmptyEnum {
                field: self.name.clone(),
            });
        }

        let mut min_len = None;
        let mut max_len = None;
        let mut lower: Option<NumericBound> = None;
        let mut upper: Option<NumericBound> = None;

        for constraint in &self.constraints {
            if !constraint.applies_to(&self.field_type) {
                return Err(SchemaDefinitionError::InapplicableConstraint {
                    field: self.name.clone(),
                    constraint: constraint.name(),
                    field_type: self.field_type.type_name(),
                });
            }

            match constraint {
                Constraint::MinLength(n) => min_len = Some(*n),
                Constraint::MaxLength(n) => max_len = Some(*n),
                Constraint::Ge(b) | Constraint::Gt(b) => {
                    self.check_finite(constraint, *b)?;
                    let bound = NumericBound {
                        value: *b,
                        exclusive: matches!(constraint, Constraint::Gt(_)),
                    };
                    if lower.map_or(true, |cur| bound.tighter_lower_than(&cur)) {
                        lower = Some(bound);
                    }
                }
                Constraint::Le(b) | Constraint::Lt(b) => {
                    self.check_finite(constraint, *b)?;
                    let bound = NumericBound {
                        value: *b,
                        exclusive: matches!(constraint, Constraint::Lt(_)),
                    };
                    if upper.map_or(true, |cur| bound.tighter_upper_than(&cur)) {
                        upper = Some(bound);
                    }
                }
                Constraint::MultipleOf(b) => {
                    self.check_finite(constraint, *b)?;
                    if *b <= 0.0 {
                        return Err(SchemaDefinitionError::InvalidBound {
                            field: self.name.clone(),
                            constraint: constraint.name(),
                            reason: "must be greater than zero".into(),
                        });
                    }
                }
                Constraint::Pattern(_) => {}
            }
        }

        if let (Some(min), Some(max)) = (min_len, max_len) {
            if min > max {
                return Err(SchemaDefinitionError::ConflictingBounds {
                    field: self.name.clone(),
                    reason: format!("min_length {} exceeds max_length {}", min, max),
                });
            }
        }

        if let (Some(lo), Some(hi)) = (lower, upper) {
            let empty = lo.value > hi.value
                || (lo.value == hi.value && (lo.exclusive || hi.exclusive));
            if empty {
                return Err(SchemaDefinitionError::ConflictingBounds {
                    field: self.name.clone(),
                    reason: format!(
                        "no value satisfies lower bound {} {} and upper bound {} {}",
                        lo.lower_op(),
                        lo.value,
                        hi.upper_op(),
                        hi.value
                    ),
                });
            }
        }

        if let Some(default @ DefaultValue::Static(_)) = &self.default {
            let resolved = validator::check_default(self, default).map_err(|errors| {
                SchemaDefinitionError::InvalidDefault {
                    field: self.name.clone(),
                    reason: errors.to_string(),
                }
            })?;
            self.resolved_default = Some(resolved);
        }

        Ok(())
    }

    fn check_finite(&self, constraint: &Constraint, bound: f64) -> Result<(), SchemaDefinitionError> {
        if bound.is_finite() {
            Ok(())
        } else {
            Err(SchemaDefinitionError::InvalidBound {
                field: self.name.clone(),
                constraint: constraint.name(),
                reason: "must be a finite number".into(),
            })
        }
    }
}

/// One end of a numeric range, as declared by a comparison constraint.
#[derive(Debug, Clone, Copy)]
struct NumericBound {
    value: f64,
    exclusive: bool,
}

impl NumericBound {
    fn tighter_lower_than(&self, other: &NumericBound) -> bool {
        self.value > other.value || (self.value == other.value && self.exclusive)
    }

    fn tighter_upper_than(&self, other: &NumericBound) -> bool {
        self.value < other.value || (self.value == other.value && self.exclusive)
    }

    fn lower_op(&self) -> &'static str {
        if self.exclusive { ">" } else { ">=" }
    }

    fn upper_op(&self) -> &'static str {
        if self.exclusive { "<" } else { "<=" }
    }
}

/// How keys not declared in the schema are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtraPolicy {
    /// Undeclared keys are dropped
    #[default]
    Ignore,
    /// Each undeclared key is an `ExtraField` error
    Forbid,
}

#[derive(Debug)]
struct SchemaInner {
    name: String,
    fields: Vec<FieldSpec>,
    extra: ExtraPolicy,
}

/// Ordered, immutable set of field declarations.
///
/// Cloning is cheap; nested schemas share their definition.
#[derive(Debug, Clone)]
pub struct Schema {
    inner: Arc<SchemaInner>,
}

impl Schema {
    /// Starts a new schema definition.
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Field declarations in declaration order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.inner.fields
    }

    /// Looks up a field by its declared name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.inner.fields.iter().find(|f| f.name == name)
    }

    pub fn extra(&self) -> ExtraPolicy {
        self.inner.extra
    }

    pub fn len(&self) -> usize {
        self.inner.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.fields.is_empty()
    }

    /// Returns true if `key` names a field or a field's alias.
    pub fn accepts_key(&self, key: &str) -> bool {
        self.inner
            .fields
            .iter()
            .any(|f| f.name == key || f.alias.as_deref() == Some(key))
    }

    /// Validates `input` with lax coercion.
    pub fn validate(&self, input: &Map<String, Value>) -> Result<Record, ValidationErrors> {
        Validator::default().validate(self, input)
    }
}

/// Collects field declarations and checks them in `build`.
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<FieldSpec>,
    extra: ExtraPolicy,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            extra: ExtraPolicy::default(),
        }
    }

    /// Appends a field declaration.
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Appends several field declarations in order.
    pub fn fields(mut self, fields: impl IntoIterator<Item = FieldSpec>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn extra(mut self, extra: ExtraPolicy) -> Self {
        self.extra = extra;
        self
    }

    /// Shorthand for `extra(ExtraPolicy::Forbid)`.
    pub fn forbid_extra(self) -> Self {
        self.extra(ExtraPolicy::Forbid)
    }

    /// Checks every declaration and freezes the schema.
    ///
    /// # Errors
    ///
    /// Returns the first `SchemaDefinitionError` found, in declaration order.
    pub fn build(self) -> Result<Schema, SchemaDefinitionError> {
        let SchemaBuilder {
            name,
            mut fields,
            extra,
        } = self;

        if name.trim().is_empty() {
            return Err(SchemaDefinitionError::EmptySchemaName);
        }

        let mut seen: HashSet<String> = HashSet::new();
        for field in &mut fields {
            if field.name.is_empty() || field.alias.as_deref() == Some("") {
                return Err(SchemaDefinitionError::EmptyFieldName {
                    schema: name.clone(),
                });
            }

            let mut keys = vec![field.name.as_str()];
            if let Some(alias) = field.alias.as_deref() {
                if alias != field.name {
                    keys.push(alias);
                }
            }
            for key in keys {
                if !seen.insert(key.to_string()) {
                    return Err(SchemaDefinitionError::DuplicateField {
                        schema: name.clone(),
                        field: key.to_string(),
                    });
                }
            }

            field.check_definition()?;
        }

        Ok(Schema {
            inner: Arc::new(SchemaInner {
                name,
                fields,
                extra,
            }),
        })
    }
}
