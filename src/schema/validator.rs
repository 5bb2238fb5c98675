//! Schema validator for untyped input
//!
//! Validation semantics:
//! - Fields are visited in declaration order
//! - Absent fields take their default, become null if optional, or are missing
//! - Present values are coerced, then checked against constraints in order
//! - Every failure is collected; validation never stops at the first one
//! - Nested schemas and list elements report dotted paths (`friends.0.age`)
//! - Undeclared keys are dropped or reported, per the schema's `ExtraPolicy`
//!
//! The result is a `Record` or a non-empty `ValidationErrors`, never both.

use std::cmp::Ordering;

use serde_json::{Map, Value};
use tracing::{debug, debug_span, trace};

use super::coerce::{self, CoercionMode};
use super::errors::{FieldPath, ValidationError, ValidationErrors};
use super::record::{FieldValue, Record};
use super::types::{Constraint, DefaultValue, ExtraPolicy, FieldSpec, FieldType, Schema};

/// Validates input against schemas using a fixed coercion mode.
///
/// The validator holds no state between calls and may be shared freely.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    mode: CoercionMode,
}

impl Validator {
    pub fn new(mode: CoercionMode) -> Self {
        Self { mode }
    }

    /// Validator that only accepts each type's natural JSON encoding.
    pub fn strict() -> Self {
        Self::new(CoercionMode::Strict)
    }

    pub fn mode(&self) -> CoercionMode {
        self.mode
    }

    /// Validates an input mapping against a schema.
    ///
    /// # Errors
    ///
    /// Returns every `MissingField`, `TypeMismatch`, `ConstraintViolation`
    /// and `ExtraField` problem found in the input.
    pub fn validate(
        &self,
        schema: &Schema,
        input: &Map<String, Value>,
    ) -> Result<Record, ValidationErrors> {
        let span = debug_span!("validate", schema = %schema.name(), mode = ?self.mode);
        let _enter = span.enter();

        let mut errors = Vec::new();
        let record = self.validate_object(schema, input, &FieldPath::root(), &mut errors);

        match (record, ValidationErrors::from_vec(errors)) {
            (Some(record), None) => {
                trace!(fields = record.len(), "validation succeeded");
                Ok(record)
            }
            (_, Some(errors)) => {
                debug!(errors = errors.len(), "validation failed");
                Err(errors)
            }
            // validate_object only withholds a record after pushing an error
            (None, None) => unreachable!("validation produced neither record nor errors"),
        }
    }

    /// Validates any JSON value. Non-objects fail with a `TypeMismatch` at `$root`.
    pub fn validate_value(&self, schema: &Schema, value: &Value) -> Result<Record, ValidationErrors> {
        match value.as_object() {
            Some(obj) => self.validate(schema, obj),
            None => {
                let error = ValidationError::type_mismatch(
                    FieldPath::root(),
                    "object",
                    &coerce::describe(value),
                );
                debug!(schema = %schema.name(), "input is not an object");
                Err(ValidationErrors::single(error))
            }
        }
    }

    /// Validates an object's fields, pushing failures onto `errors`.
    ///
    /// Returns a record only when this object added no errors.
    fn validate_object(
        &self,
        schema: &Schema,
        obj: &Map<String, Value>,
        path: &FieldPath,
        errors: &mut Vec<ValidationError>,
    ) -> Option<Record> {
        let before = errors.len();
        let mut fields = Vec::with_capacity(schema.len());

        for spec in schema.fields() {
            // Errors point at the key the value was read from
            let found = [spec.input_key(), spec.name()]
                .into_iter()
                .find_map(|key| obj.get(key).map(|value| (key, value)));

            let value = match found {
                Some((key, value)) => self.validate_field(spec, value, &path.key(key), errors),
                None => self.materialize_absent(spec, &path.key(spec.name()), errors),
            };

            if let Some(value) = value {
                fields.push((spec.name().to_string(), value));
            }
        }

        if schema.extra() == ExtraPolicy::Forbid {
            for key in obj.keys() {
                if !schema.accepts_key(key) {
                    errors.push(ValidationError::extra_field(path.key(key.as_str())));
                }
            }
        }

        if errors.len() == before {
            Some(Record::from_validated(schema.name(), fields))
        } else {
            None
        }
    }

    fn materialize_absent(
        &self,
        spec: &FieldSpec,
        path: &FieldPath,
        errors: &mut Vec<ValidationError>,
    ) -> Option<FieldValue> {
        if let Some(value) = spec.resolved_default() {
            trace!(field = %path, "using static default");
            return Some(value.clone());
        }
        if let Some(default) = spec.default() {
            let value = default.materialize();
            trace!(field = %path, "using default factory");
            return self.validate_field(spec, &value, path, errors);
        }
        if spec.is_optional() {
            return Some(FieldValue::Null);
        }
        errors.push(ValidationError::missing_field(path.clone()));
        None
    }

    /// Coerces one present value and applies the field's constraints.
    fn validate_field(
        &self,
        spec: &FieldSpec,
        value: &Value,
        path: &FieldPath,
        errors: &mut Vec<ValidationError>,
    ) -> Option<FieldValue> {
        if value.is_null() && spec.is_optional() {
            return Some(FieldValue::Null);
        }

        let coerced = self.coerce(spec.field_type(), value, path, errors)?;

        let before = errors.len();
        for constraint in spec.constraints() {
            if let Some(message) = check_constraint(constraint, &coerced, path) {
                errors.push(ValidationError::constraint_violation(
                    path.clone(),
                    constraint,
                    message,
                ));
            }
        }

        if errors.len() == before {
            Some(coerced)
        } else {
            None
        }
    }

    fn coerce(
        &self,
        field_type: &FieldType,
        value: &Value,
        path: &FieldPath,
        errors: &mut Vec<ValidationError>,
    ) -> Option<FieldValue> {
        match field_type {
            FieldType::Nested(schema) => match value.as_object() {
                Some(obj) => self
                    .validate_object(schema, obj, path, errors)
                    .map(FieldValue::Record),
                None => {
                    errors.push(ValidationError::type_mismatch(
                        path.clone(),
                        "object",
                        &coerce::describe(value),
                    ));
                    None
                }
            },
            FieldType::List(element) => match value.as_array() {
                Some(items) => {
                    let before = errors.len();
                    let mut out = Vec::with_capacity(items.len());
                    for (i, item) in items.iter().enumerate() {
                        let item_path = path.index(i);
                        if item.is_null() {
                            errors.push(ValidationError::type_mismatch(
                                item_path,
                                element.type_name(),
                                "null",
                            ));
                            continue;
                        }
                        if let Some(v) = self.coerce(element, item, &item_path, errors) {
                            out.push(v);
                        }
                    }
                    (errors.len() == before).then_some(FieldValue::List(out))
                }
                None => {
                    errors.push(ValidationError::type_mismatch(
                        path.clone(),
                        "list",
                        &coerce::describe(value),
                    ));
                    None
                }
            },
            scalar => match coerce::coerce_scalar(value, scalar, self.mode) {
                Ok(v) => Some(v),
                Err(mismatch) => {
                    errors.push(ValidationError::type_mismatch(
                        path.clone(),
                        &mismatch.expected,
                        &mismatch.actual,
                    ));
                    None
                }
            },
        }
    }
}

/// Returns a failure message when `value` violates `constraint`.
fn check_constraint(constraint: &Constraint, value: &FieldValue, path: &FieldPath) -> Option<String> {
    match constraint {
        Constraint::MinLength(min) => {
            let (len, unit) = measure(value)?;
            (len < *min).then(|| format!("{} must have at least {} {}", path, min, unit))
        }
        Constraint::MaxLength(max) => {
            let (len, unit) = measure(value)?;
            (len > *max).then(|| format!("{} must have at most {} {}", path, max, unit))
        }
        Constraint::Ge(bound) => {
            let ord = compare_to_bound(value, *bound)?;
            (ord == Ordering::Less).then(|| format!("{} must be >= {}", path, bound))
        }
        Constraint::Gt(bound) => {
            let ord = compare_to_bound(value, *bound)?;
            (ord != Ordering::Greater).then(|| format!("{} must be > {}", path, bound))
        }
        Constraint::Le(bound) => {
            let ord = compare_to_bound(value, *bound)?;
            (ord == Ordering::Greater).then(|| format!("{} must be <= {}", path, bound))
        }
        Constraint::Lt(bound) => {
            let ord = compare_to_bound(value, *bound)?;
            (ord != Ordering::Less).then(|| format!("{} must be < {}", path, bound))
        }
        Constraint::MultipleOf(step) => {
            let off = match value {
                FieldValue::Int(i) if fits_i64(*step) && step.fract() == 0.0 => i % (*step as i64) != 0,
                _ => {
                    let q = value.as_f64()? / step;
                    (q - q.round()).abs() > 1e-9
                }
            };
            off.then(|| format!("{} must be a multiple of {}", path, step))
        }
        Constraint::Pattern(re) => {
            let s = value.as_str()?;
            (!re.is_match(s)).then(|| format!("{} must match pattern '{}'", path, re.as_str()))
        }
    }
}

/// Orders a numeric value against a bound. Ints are compared exactly, so
/// values beyond 2^53 are not rounded onto the bound.
fn compare_to_bound(value: &FieldValue, bound: f64) -> Option<Ordering> {
    match value {
        FieldValue::Int(i) if fits_i64(bound) => {
            let floor = bound.floor() as i64;
            Some(match i.cmp(&floor) {
                Ordering::Equal if bound.fract() != 0.0 => Ordering::Less,
                ord => ord,
            })
        }
        other => other.as_f64()?.partial_cmp(&bound),
    }
}

fn fits_i64(bound: f64) -> bool {
    bound >= i64::MIN as f64 && bound < i64::MAX as f64
}

fn measure(value: &FieldValue) -> Option<(usize, &'static str)> {
    match value {
        FieldValue::Str(s) => Some((s.chars().count(), "characters")),
        FieldValue::List(items) => Some((items.len(), "items")),
        _ => None,
    }
}

/// Validates `input` with the default lax validator.
pub fn validate(schema: &Schema, input: &Map<String, Value>) -> Result<Record, ValidationErrors> {
    Validator::default().validate(schema, input)
}

/// Validates any JSON value with the default lax validator.
pub fn validate_value(schema: &Schema, value: &Value) -> Result<Record, ValidationErrors> {
    Validator::default().validate_value(schema, value)
}

/// Runs a field's default through lax coercion and constraints, returning
/// the value every validator will use when the field is absent.
pub(crate) fn check_default(
    spec: &FieldSpec,
    default: &DefaultValue,
) -> Result<FieldValue, ValidationErrors> {
    let path = FieldPath::root().key(spec.name());
    let mut errors = Vec::new();
    let value = default.materialize();
    let resolved = Validator::default().validate_field(spec, &value, &path, &mut errors);
    match (resolved, ValidationErrors::from_vec(errors)) {
        (Some(value), None) => Ok(value),
        (_, Some(errors)) => Err(errors),
        // validate_field only withholds a value after pushing an error
        (None, None) => Err(ValidationErrors::single(ValidationError::type_mismatch(
            path,
            spec.field_type().type_name(),
            &coerce::describe(&value),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::errors::ErrorKind;
    use serde_json::json;

    fn user_schema() -> Schema {
        Schema::builder("user")
            .field(FieldSpec::str("name").min_length(2).max_length(20))
            .field(FieldSpec::int("age").ge(0.0).le(99.0))
            .field(FieldSpec::str("nickname").optional())
            .field(FieldSpec::bool("active").default_value(true))
            .build()
            .unwrap()
    }

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_valid_input_produces_record() {
        let record = validate(&user_schema(), &obj(json!({"name": "Alice", "age": 30}))).unwrap();
        assert_eq!(record.get("name").and_then(FieldValue::as_str), Some("Alice"));
        assert_eq!(record.get("age").and_then(FieldValue::as_i64), Some(30));
        assert!(record.get("nickname").unwrap().is_null());
        assert_eq!(record.get("active").and_then(FieldValue::as_bool), Some(true));
    }

    #[test]
    fn test_age_below_bound() {
        let errors = validate(&user_schema(), &obj(json!({"name": "Al", "age": -1}))).unwrap_err();
        assert_eq!(errors.len(), 1);
        let err = &errors.as_slice()[0];
        assert_eq!(err.path.to_string(), "age");
        assert_eq!(err.kind, ErrorKind::ConstraintViolation);
        assert_eq!(err.message, "age must be >= 0");
        assert_eq!(err.constraint, Some("ge"));
    }

    #[test]
    fn test_errors_are_collected_not_short_circuited() {
        let errors = validate(&user_schema(), &obj(json!({"name": "A", "age": 120}))).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.at("name").count(), 1);
        assert_eq!(errors.at("age").count(), 1);
    }

    #[test]
    fn test_missing_required_field() {
        let errors = validate(&user_schema(), &obj(json!({"name": "Alice"}))).unwrap_err();
        let missing: Vec<_> = errors.of_kind(ErrorKind::MissingField).collect();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].path.to_string(), "age");
    }

    #[test]
    fn test_null_on_required_field_is_type_mismatch() {
        let errors =
            validate(&user_schema(), &obj(json!({"name": null, "age": 1}))).unwrap_err();
        let err = &errors.as_slice()[0];
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
        assert_eq!(err.message, "name: expected str, got null");
    }

    #[test]
    fn test_constraints_skipped_after_type_mismatch() {
        let errors =
            validate(&user_schema(), &obj(json!({"name": "Alice", "age": "old"}))).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.as_slice()[0].kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_multiple_constraint_failures_on_one_field() {
        let schema = Schema::builder("code")
            .field(FieldSpec::str("code").min_length(4).pattern("^[A-Z]+$").unwrap())
            .build()
            .unwrap();
        let errors = validate(&schema, &obj(json!({"code": "ab"}))).unwrap_err();
        let names: Vec<_> = errors.iter().filter_map(|e| e.constraint).collect();
        assert_eq!(names, vec!["min_length", "pattern"]);
    }

    #[test]
    fn test_factory_default_called_per_validation() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let schema = Schema::builder("post")
            .field(FieldSpec::list("tags", FieldType::Str).default_factory(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                json!([])
            }))
            .build()
            .unwrap();

        validate(&schema, &Map::new()).unwrap();
        validate(&schema, &Map::new()).unwrap();
        validate(&schema, &obj(json!({"tags": ["a"]}))).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_factory_default_still_checked() {
        let schema = Schema::builder("n")
            .field(FieldSpec::int("n").ge(10.0).default_factory(|| json!(1)))
            .build()
            .unwrap();
        let errors = validate(&schema, &Map::new()).unwrap_err();
        assert_eq!(errors.as_slice()[0].message, "n must be >= 10");
    }

    #[test]
    fn test_nested_and_list_paths() {
        let friend = Schema::builder("friend")
            .field(FieldSpec::str("name"))
            .field(FieldSpec::int("age").ge(0.0))
            .build()
            .unwrap();
        let schema = Schema::builder("person")
            .field(FieldSpec::list("friends", FieldType::Nested(friend)))
            .build()
            .unwrap();

        let input = obj(json!({
            "friends": [
                {"name": "Bob", "age": 3},
                {"name": "Eve", "age": -2},
                {"age": 4},
                null
            ]
        }));
        let errors = validate(&schema, &input).unwrap_err();
        let paths: Vec<_> = errors.iter().map(|e| e.path.to_string()).collect();
        assert_eq!(paths, vec!["friends.1.age", "friends.2.name", "friends.3"]);
    }

    #[test]
    fn test_list_constraints_count_items() {
        let schema = Schema::builder("post")
            .field(FieldSpec::list("tags", FieldType::Str).max_length(2))
            .build()
            .unwrap();
        let errors = validate(&schema, &obj(json!({"tags": ["a", "b", "c"]}))).unwrap_err();
        assert_eq!(errors.as_slice()[0].message, "tags must have at most 2 items");
    }

    #[test]
    fn test_forbidden_extras_reported_per_key() {
        let schema = Schema::builder("user")
            .field(FieldSpec::str("name"))
            .forbid_extra()
            .build()
            .unwrap();
        let errors =
            validate(&schema, &obj(json!({"name": "a", "x": 1, "y": 2}))).unwrap_err();
        assert_eq!(errors.of_kind(ErrorKind::ExtraField).count(), 2);

        let ignoring = Schema::builder("user")
            .field(FieldSpec::str("name"))
            .build()
            .unwrap();
        let record = validate(&ignoring, &obj(json!({"name": "a", "x": 1}))).unwrap();
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_alias_is_preferred_and_name_accepted() {
        let schema = Schema::builder("user")
            .field(FieldSpec::str("user_name").alias("userName"))
            .forbid_extra()
            .build()
            .unwrap();
        let record = validate(&schema, &obj(json!({"userName": "a"}))).unwrap();
        assert_eq!(record.get("user_name").and_then(FieldValue::as_str), Some("a"));
        assert!(validate(&schema, &obj(json!({"user_name": "b"}))).is_ok());
    }

    #[test]
    fn test_strict_mode_rejects_string_numbers() {
        let schema = Schema::builder("n").field(FieldSpec::int("n")).build().unwrap();
        let input = obj(json!({"n": "42"}));
        assert!(validate(&schema, &input).is_ok());
        let errors = Validator::strict().validate(&schema, &input).unwrap_err();
        assert_eq!(errors.as_slice()[0].kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_non_object_root() {
        let errors = validate_value(&user_schema(), &json!([1, 2])).unwrap_err();
        assert_eq!(errors.as_slice()[0].path.to_string(), "$root");
        assert_eq!(errors.as_slice()[0].message, "$root: expected object, got list");
    }

    #[test]
    fn test_static_default_used_in_strict_mode() {
        let schema = Schema::builder("s")
            .field(FieldSpec::int("count").default_value("5"))
            .build()
            .unwrap();

        let lax = validate(&schema, &Map::new()).unwrap();
        let strict = Validator::strict().validate(&schema, &Map::new()).unwrap();
        assert_eq!(lax, strict);
        assert_eq!(strict.get("count").and_then(FieldValue::as_i64), Some(5));

        // Present values are still held to strict coercion
        let errors = Validator::strict()
            .validate(&schema, &obj(json!({"count": "5"})))
            .unwrap_err();
        assert_eq!(errors.as_slice()[0].kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_errors_reported_at_alias_key() {
        let schema = Schema::builder("user")
            .field(FieldSpec::str("user_name").alias("userName").min_length(3))
            .build()
            .unwrap();

        let errors = validate(&schema, &obj(json!({"userName": "a"}))).unwrap_err();
        assert_eq!(errors.as_slice()[0].path.to_string(), "userName");
        assert_eq!(errors.as_slice()[0].message, "userName must have at least 3 characters");

        let errors = validate(&schema, &obj(json!({"user_name": "a"}))).unwrap_err();
        assert_eq!(errors.as_slice()[0].path.to_string(), "user_name");

        let errors = validate(&schema, &Map::new()).unwrap_err();
        assert_eq!(errors.as_slice()[0].path.to_string(), "user_name");
    }

    #[test]
    fn test_large_int_bounds_compared_exactly() {
        let limit = 9_007_199_254_740_992_i64; // 2^53
        let schema = Schema::builder("n")
            .field(FieldSpec::int("n").le(limit as f64))
            .build()
            .unwrap();

        assert!(validate(&schema, &obj(json!({"n": limit}))).is_ok());
        let errors = validate(&schema, &obj(json!({"n": limit + 1}))).unwrap_err();
        assert_eq!(errors.as_slice()[0].constraint, Some("le"));
    }

    #[test]
    fn test_int_against_fractional_bound() {
        let schema = Schema::builder("n")
            .field(FieldSpec::int("n").ge(-2.5).lt(2.5))
            .build()
            .unwrap();

        assert!(validate(&schema, &obj(json!({"n": -2}))).is_ok());
        assert!(validate(&schema, &obj(json!({"n": 2}))).is_ok());
        assert!(validate(&schema, &obj(json!({"n": -3}))).is_err());
        assert!(validate(&schema, &obj(json!({"n": 3}))).is_err());
    }

    #[test]
    fn test_int_multiple_of_is_exact() {
        let schema = Schema::builder("n")
            .field(FieldSpec::int("n").multiple_of(3.0))
            .build()
            .unwrap();

        assert!(validate(&schema, &obj(json!({"n": 9_007_199_254_740_993_i64}))).is_ok());
        assert!(validate(&schema, &obj(json!({"n": 9_007_199_254_740_992_i64}))).is_err());
    }

    #[test]
    fn test_multiple_of_and_exclusive_bounds() {
        let schema = Schema::builder("n")
            .field(FieldSpec::float("price").gt(0.0).lt(10.0).multiple_of(0.25))
            .build()
            .unwrap();
        assert!(validate(&schema, &obj(json!({"price": 2.5}))).is_ok());
        let errors = validate(&schema, &obj(json!({"price": 10.1}))).unwrap_err();
        let names: Vec<_> = errors.iter().filter_map(|e| e.constraint).collect();
        assert_eq!(names, vec!["lt", "multiple_of"]);
    }
}
