//! Schema loader for reading schema definitions from disk
//!
//! - One JSON file per schema, any `*.json` name, in a single directory
//! - Files are read in name order so loading is deterministic
//! - A schema name may be registered once; the registry is append-only
//! - Any unreadable, malformed or invalid file aborts the load

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::errors::{SchemaDefinitionError, SchemaError, SchemaResult};
use super::types::{Constraint, ExtraPolicy, FieldSpec, FieldType, Schema};

/// On-disk form of a schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDefinition {
    pub name: String,
    #[serde(default)]
    pub extra: ExtraPolicy,
    pub fields: Vec<FieldDefinition>,
}

/// On-disk form of a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: TypeDefinition,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<ConstraintDefinition>,
}

/// Scalar types are plain strings (`"int"`); compound types are
/// single-key objects (`{"list": "str"}`, `{"enum": ["a", "b"]}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeDefinition {
    #[serde(alias = "string")]
    Str,
    #[serde(alias = "integer")]
    Int,
    #[serde(alias = "number")]
    Float,
    #[serde(alias = "boolean")]
    Bool,
    DateTime,
    Date,
    Uuid,
    Email,
    Enum(Vec<String>),
    List(Box<TypeDefinition>),
    Nested(SchemaDefinition),
}

/// On-disk form of a constraint, e.g. `{"ge": 0}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintDefinition {
    MinLength(usize),
    MaxLength(usize),
    Ge(f64),
    Gt(f64),
    Le(f64),
    Lt(f64),
    MultipleOf(f64),
    Pattern(String),
}

impl SchemaDefinition {
    /// Builds the schema, nested definitions included.
    pub fn build(&self) -> Result<Schema, SchemaDefinitionError> {
        let mut builder = Schema::builder(&self.name).extra(self.extra);
        for field in &self.fields {
            builder = builder.field(field.to_spec()?);
        }
        builder.build()
    }
}

impl FieldDefinition {
    fn to_spec(&self) -> Result<FieldSpec, SchemaDefinitionError> {
        let mut spec = FieldSpec::new(&self.name, self.field_type.to_field_type()?);
        if self.optional {
            spec = spec.optional();
        }
        if let Some(alias) = &self.alias {
            spec = spec.alias(alias);
        }
        if let Some(default) = &self.default {
            spec = spec.default_value(default.clone());
        }
        for constraint in &self.constraints {
            spec = match constraint {
                ConstraintDefinition::MinLength(n) => spec.min_length(*n),
                ConstraintDefinition::MaxLength(n) => spec.max_length(*n),
                ConstraintDefinition::Ge(b) => spec.constraint(Constraint::Ge(*b)),
                ConstraintDefinition::Gt(b) => spec.constraint(Constraint::Gt(*b)),
                ConstraintDefinition::Le(b) => spec.constraint(Constraint::Le(*b)),
                ConstraintDefinition::Lt(b) => spec.constraint(Constraint::Lt(*b)),
                ConstraintDefinition::MultipleOf(b) => spec.multiple_of(*b),
                ConstraintDefinition::Pattern(p) => spec.pattern(p)?,
            };
        }
        Ok(spec)
    }
}

impl TypeDefinition {
    fn to_field_type(&self) -> Result<FieldType, SchemaDefinitionError> {
        Ok(match self {
            TypeDefinition::Str => FieldType::Str,
            TypeDefinition::Int => FieldType::Int,
            TypeDefinition::Float => FieldType::Float,
            TypeDefinition::Bool => FieldType::Bool,
            TypeDefinition::DateTime => FieldType::DateTime,
            TypeDefinition::Date => FieldType::Date,
            TypeDefinition::Uuid => FieldType::Uuid,
            TypeDefinition::Email => FieldType::Email,
            TypeDefinition::Enum(variants) => FieldType::Enum(variants.clone()),
            TypeDefinition::List(element) => FieldType::list(element.to_field_type()?),
            TypeDefinition::Nested(definition) => FieldType::Nested(definition.build()?),
        })
    }
}

/// Reads schema files from a directory into a name-keyed registry.
pub struct SchemaLoader {
    /// Directory containing schema files
    schema_dir: PathBuf,
    /// Loaded schemas indexed by name
    schemas: BTreeMap<String, Schema>,
}

impl SchemaLoader {
    pub fn new(schema_dir: impl Into<PathBuf>) -> Self {
        Self {
            schema_dir: schema_dir.into(),
            schemas: BTreeMap::new(),
        }
    }

    pub fn schema_dir(&self) -> &Path {
        &self.schema_dir
    }

    /// Loads every `*.json` file in the schema directory.
    ///
    /// Returns the number of schemas loaded by this call.
    pub fn load_all(&mut self) -> SchemaResult<usize> {
        let dir_display = self.schema_dir.display().to_string();
        let io_err = |source: std::io::Error| SchemaError::Io {
            path: dir_display.clone(),
            source,
        };

        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.schema_dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in &paths {
            self.load_schema_file(path)?;
        }

        info!(dir = %dir_display, count = paths.len(), "schemas loaded");
        Ok(paths.len())
    }

    /// Loads and registers a single schema file.
    pub fn load_schema_file(&mut self, path: &Path) -> SchemaResult<&Schema> {
        let path_display = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path_display.clone(),
            source,
        })?;

        let definition: SchemaDefinition =
            serde_json::from_str(&content).map_err(|source| SchemaError::Parse {
                path: path_display.clone(),
                source,
            })?;

        let schema = definition.build().map_err(|source| SchemaError::Definition {
            path: path_display.clone(),
            source,
        })?;

        debug!(path = %path_display, schema = %schema.name(), "schema file parsed");
        self.register(schema)
    }

    /// Registers a schema built in code.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Duplicate` if the name is already taken.
    pub fn register(&mut self, schema: Schema) -> SchemaResult<&Schema> {
        let name = schema.name().to_string();
        if self.schemas.contains_key(&name) {
            return Err(SchemaError::Duplicate(name));
        }
        Ok(self.schemas.entry(name).or_insert(schema))
    }

    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    /// Like `get`, but a missing schema is an error.
    pub fn require(&self, name: &str) -> SchemaResult<&Schema> {
        self.get(name)
            .ok_or_else(|| SchemaError::Unknown(name.to_string()))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Registered schemas in name order.
    pub fn schemas(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.values()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
