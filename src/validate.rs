//! Schema-driven validation with repair-to-default.
//!
//! Walks a merged settings record against the catalog in [`crate::schema`].
//! Every constraint violation is repaired by substituting the field's default
//! and reported as a warning [`Finding`]; no path-level violation is ever fatal.
//! The one fatal case is a null record, which is a caller bug, not user input.
//!
//! Validation is a transform, not a mutation: the caller's record is untouched
//! and a new, fully-repaired record comes back with the findings.

use crate::error::{ConfigError, Result};
use crate::merge::{set_value_at, value_at};
use crate::schema::Schema;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Severity of a validation finding.
///
/// Everything the validator itself produces is a warning; `Error` is reserved for
/// loader-level failures surfaced alongside findings in diagnostics output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

/// One validation outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    /// Dotted path of the offending field.
    pub path: String,
    /// The value that violated the constraint.
    pub value: Value,
    /// Which constraint failed, in human-readable form.
    pub message: String,
    pub severity: Severity,
    /// The default substituted in the repaired record, if the field was repaired.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacement: Option<Value>,
}

impl Finding {
    fn repaired(path: &str, value: Value, message: String, replacement: Value) -> Self {
        Self {
            path: path.to_string(),
            value,
            message,
            severity: Severity::Warning,
            replacement: Some(replacement),
        }
    }
}

/// Validate a record against the global schema, repairing violations.
///
/// Returns the repaired record and every finding. Validating an already-repaired
/// record yields the same record and no new findings for the repaired fields.
pub fn validate(record: &Value) -> Result<(Value, Vec<Finding>)> {
    validate_with(record, Schema::global())
}

/// Validate against an explicit schema. Split out for tests.
pub fn validate_with(record: &Value, schema: &Schema) -> Result<(Value, Vec<Finding>)> {
    if record.is_null() {
        return Err(ConfigError::NullRecord);
    }

    let mut repaired = record.clone();
    let mut findings = Vec::new();

    for path in schema.paths() {
        let Some(spec) = schema.lookup(path) else {
            continue;
        };
        let Some(current) = value_at(&repaired, path).cloned() else {
            // Defaults are merged in before validation, so a hole means the
            // caller skipped that step; fill it rather than guessing.
            set_value_at(&mut repaired, path, spec.default.clone());
            continue;
        };

        // Shape before constraints: a wrong-typed value can never reach the
        // final typed deserialization, it is repaired like any other violation.
        if !spec.kind.matches(&current) {
            findings.push(Finding::repaired(
                path,
                current,
                spec.kind.expectation().to_string(),
                spec.default.clone(),
            ));
            set_value_at(&mut repaired, path, spec.default.clone());
            continue;
        }

        for constraint in &spec.constraints {
            if !constraint.check(&current) {
                findings.push(Finding::repaired(
                    path,
                    current.clone(),
                    constraint.message(),
                    spec.default.clone(),
                ));
                set_value_at(&mut repaired, path, spec.default.clone());
                break;
            }
        }
    }

    findings.extend(check_keybinding_conflicts(&repaired));

    Ok((repaired, findings))
}

/// Detect two actions claiming the same key within the same context.
///
/// The first action encountered for a (context, key) pair wins; each later
/// claimant produces a warning naming the key and the action it collided with.
/// Nothing is repaired: a conflicting binding has no canonical default, the
/// duplicate is simply ignored by the UI layer.
fn check_keybinding_conflicts(record: &Value) -> Vec<Finding> {
    let Some(bindings) = record.get("keybindings").and_then(Value::as_object) else {
        return Vec::new();
    };

    let mut findings = Vec::new();
    let mut claimed: BTreeMap<(String, String), &str> = BTreeMap::new();

    for (action, binding) in bindings {
        let Some(key) = binding.get("key").and_then(Value::as_str) else {
            continue;
        };
        let context = binding
            .get("context")
            .and_then(Value::as_str)
            .unwrap_or("global");

        match claimed.entry((context.to_string(), key.to_string())) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(action);
            }
            std::collections::btree_map::Entry::Occupied(winner) => {
                findings.push(Finding {
                    path: format!("keybindings.{action}"),
                    value: binding.clone(),
                    message: format!(
                        "key '{key}' in context '{context}' already bound to action '{}'",
                        winner.get()
                    ),
                    severity: Severity::Warning,
                    replacement: None,
                });
            }
        }
    }

    findings
}
