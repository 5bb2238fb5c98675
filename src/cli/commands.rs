//! CLI command implementations
//!
//! `check` loads the schema directory and reports what it found.
//! `validate` streams stdin documents through one schema, writing a response
//! per document. A bad document never stops the stream; only configuration
//! and schema loading problems are fatal.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::schema::{CoercionMode, Schema, SchemaLoader, Validator};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_documents, write_error, write_invalid, write_response, InputLine};

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory holding schema definition files (required).
    /// Relative paths resolve against the config file's directory.
    pub schema_dir: String,

    /// Reject cross-type coercion (optional, default false)
    #[serde(default)]
    pub strict: bool,

    /// tracing filter directive (optional, default "warn").
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    #[serde(skip)]
    base_dir: PathBuf,
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::config_error(format!("Failed to read config '{}': {}", path.display(), e))
        })?;

        let mut config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.schema_dir.trim().is_empty() {
            return Err(CliError::config_error("schema_dir must not be empty"));
        }

        EnvFilter::try_new(&self.log_filter).map_err(|e| {
            CliError::config_error(format!("Invalid log_filter '{}': {}", self.log_filter, e))
        })?;

        Ok(())
    }

    /// Schema directory with relative paths resolved
    pub fn schema_path(&self) -> PathBuf {
        let dir = Path::new(&self.schema_dir);
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.base_dir.join(dir)
        }
    }

    /// Coercion mode, with `--strict` overriding the config
    pub fn coercion_mode(&self, strict_flag: bool) -> CoercionMode {
        if strict_flag || self.strict {
            CoercionMode::Strict
        } else {
            CoercionMode::Lax
        }
    }
}

/// Install the stderr log subscriber. Later calls are no-ops.
pub fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Run a parsed command against a loaded configuration
pub fn run_command(command: &Command, config: &Config) -> CliResult<()> {
    let stdout = io::stdout();
    match command {
        Command::Check { .. } => check(config, &mut stdout.lock()),
        Command::Validate { schema, strict, .. } => {
            let stdin = io::stdin();
            let summary = validate(
                config,
                schema,
                config.coercion_mode(*strict),
                stdin.lock(),
                &mut stdout.lock(),
            )?;
            info!(
                valid = summary.valid,
                invalid = summary.invalid,
                malformed = summary.malformed,
                "validation run finished"
            );
            Ok(())
        }
    }
}

fn load_schemas(config: &Config) -> CliResult<SchemaLoader> {
    let mut loader = SchemaLoader::new(config.schema_path());
    loader.load_all()?;
    Ok(loader)
}

/// Load all schemas and write a summary of each
pub fn check<W: Write>(config: &Config, out: &mut W) -> CliResult<()> {
    let loader = load_schemas(config)?;
    let schemas: Vec<_> = loader.schemas().map(describe_schema).collect();
    write_response(out, json!({ "schemas": schemas }))
}

fn describe_schema(schema: &Schema) -> serde_json::Value {
    let fields: Vec<_> = schema.fields().iter().map(|f| f.name()).collect();
    json!({
        "name": schema.name(),
        "extra": schema.extra(),
        "fields": fields,
    })
}

/// Counts of documents by outcome
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ValidateSummary {
    pub valid: usize,
    pub invalid: usize,
    pub malformed: usize,
}

/// Validate every document from `input` against the named schema
pub fn validate<R: BufRead, W: Write>(
    config: &Config,
    schema_name: &str,
    mode: CoercionMode,
    input: R,
    out: &mut W,
) -> CliResult<ValidateSummary> {
    let loader = load_schemas(config)?;
    let schema = loader.require(schema_name)?;
    validate_stream(schema, Validator::new(mode), input, out)
}

/// Validate a stream of documents against an already loaded schema
pub fn validate_stream<R: BufRead, W: Write>(
    schema: &Schema,
    validator: Validator,
    input: R,
    out: &mut W,
) -> CliResult<ValidateSummary> {
    let mut summary = ValidateSummary::default();

    for line in read_documents(input) {
        match line? {
            InputLine::Document(doc) => match validator.validate_value(schema, &doc) {
                Ok(record) => {
                    summary.valid += 1;
                    write_response(out, record.to_value())?;
                }
                Err(errors) => {
                    summary.invalid += 1;
                    write_invalid(out, &errors)?;
                }
            },
            InputLine::Malformed(err) => {
                summary.malformed += 1;
                warn!(error = %err, "skipping malformed input line");
                write_error(out, err.code().code(), err.message())?;
            }
        }
    }

    Ok(summary)
}
