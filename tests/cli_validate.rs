//! CLI Command Tests
//!
//! Drives `check` and `validate` against a temporary schema directory,
//! capturing output in memory.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use modelguard::cli::{check, validate, CliErrorCode, Config};
use modelguard::schema::CoercionMode;
use serde_json::{json, Value};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup() -> (TempDir, Config) {
    let tmp = TempDir::new().unwrap();
    let schema_dir = tmp.path().join("schemas");
    fs::create_dir(&schema_dir).unwrap();

    let user = json!({
        "name": "user",
        "extra": "forbid",
        "fields": [
            {"name": "name", "type": "str", "constraints": [{"min_length": 2}]},
            {"name": "age", "type": "int", "constraints": [{"ge": 0}, {"le": 99}]},
            {"name": "role", "type": {"enum": ["admin", "user"]}, "default": "user"}
        ]
    });
    fs::write(schema_dir.join("user.json"), user.to_string()).unwrap();

    let config_path = tmp.path().join("modelguard.json");
    fs::write(&config_path, r#"{"schema_dir": "schemas"}"#).unwrap();
    let config = Config::load(&config_path).unwrap();

    (tmp, config)
}

fn output_lines(out: &[u8]) -> Vec<Value> {
    String::from_utf8(out.to_vec())
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn run_validate(config: &Config, mode: CoercionMode, input: &str) -> Vec<Value> {
    let mut out = Vec::new();
    validate(config, "user", mode, Cursor::new(input.to_string()), &mut out).unwrap();
    output_lines(&out)
}

// =============================================================================
// check
// =============================================================================

#[test]
fn test_check_lists_schemas() {
    let (_tmp, config) = setup();
    let mut out = Vec::new();
    check(&config, &mut out).unwrap();

    let lines = output_lines(&out);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["status"], "ok");
    assert_eq!(
        lines[0]["data"]["schemas"],
        json!([{"name": "user", "extra": "forbid", "fields": ["name", "age", "role"]}])
    );
}

#[test]
fn test_check_fails_on_broken_schema() {
    let (tmp, config) = setup();
    fs::write(tmp.path().join("schemas").join("bad.json"), "{").unwrap();

    let mut out = Vec::new();
    let err = check(&config, &mut out).unwrap_err();
    assert_eq!(err.code(), CliErrorCode::SchemaLoadError);
    assert!(out.is_empty());
}

// =============================================================================
// validate
// =============================================================================

#[test]
fn test_validate_mixed_stream() {
    let (_tmp, config) = setup();
    let input = concat!(
        "{\"name\": \"Alice\", \"age\": 30}\n",
        "\n",
        "{\"name\": \"A\", \"age\": -1, \"extra\": true}\n",
        "not json\n",
        "[1, 2]\n",
    );

    let lines = run_validate(&config, CoercionMode::Lax, input);
    assert_eq!(lines.len(), 4);

    assert_eq!(lines[0]["status"], "ok");
    assert_eq!(lines[0]["data"], json!({"name": "Alice", "age": 30, "role": "user"}));

    assert_eq!(lines[1]["status"], "invalid");
    let errors = lines[1]["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 3);
    let kinds: Vec<_> = errors.iter().map(|e| e["kind"].as_str().unwrap()).collect();
    assert_eq!(kinds, vec!["ConstraintViolation", "ConstraintViolation", "ExtraField"]);

    assert_eq!(lines[2]["status"], "error");
    assert_eq!(lines[2]["code"], "MODELGUARD_PARSE_ERROR");

    assert_eq!(lines[3]["status"], "invalid");
    assert_eq!(lines[3]["errors"][0]["path"], "$root");
}

#[test]
fn test_validate_strict_mode() {
    let (_tmp, config) = setup();
    let input = "{\"name\": \"Alice\", \"age\": \"30\"}\n";

    let lax = run_validate(&config, CoercionMode::Lax, input);
    assert_eq!(lax[0]["status"], "ok");
    assert_eq!(lax[0]["data"]["age"], 30);

    let strict = run_validate(&config, CoercionMode::Strict, input);
    assert_eq!(strict[0]["status"], "invalid");
    assert_eq!(strict[0]["errors"][0]["kind"], "TypeMismatch");
}

#[test]
fn test_validate_unknown_schema() {
    let (_tmp, config) = setup();
    let mut out = Vec::new();
    let err = validate(&config, "order", CoercionMode::Lax, Cursor::new(String::new()), &mut out)
        .unwrap_err();
    assert_eq!(err.code(), CliErrorCode::UnknownSchema);
}

#[test]
fn test_absolute_schema_dir() {
    let (tmp, _) = setup();
    let elsewhere = TempDir::new().unwrap();
    let abs = tmp.path().join("schemas");
    let config_path = elsewhere.path().join("cfg.json");
    fs::write(
        &config_path,
        json!({"schema_dir": abs.to_string_lossy()}).to_string(),
    )
    .unwrap();

    let config = Config::load(&config_path).unwrap();
    assert_eq!(config.schema_path(), abs);
    assert!(Path::new(&config.schema_path()).is_dir());
}
