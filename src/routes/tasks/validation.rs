use serde_json::{Map, Value};

use super::dto::{NewTask, TaskChanges};
use crate::error::{AppError, ValidationErrors};

const TITLE: &str = "title";
const DESCRIPTION: &str = "description";
const STATUS: &str = "status";

// Create: every field required, must be a non-blank string
pub fn validate_new_task(input: &Map<String, Value>) -> Result<NewTask, AppError> {
    let mut invalid = ValidationErrors::new();

    let title = required_string(input, TITLE, &mut invalid);
    let description = required_string(input, DESCRIPTION, &mut invalid);
    let status = required_string(input, STATUS, &mut invalid);

    // a field is None exactly when a reason was recorded for it
    match (title, description, status) {
        (Some(title), Some(description), Some(status)) => Ok(NewTask {
            title,
            description,
            status,
        }),
        _ => Err(AppError::Validation(invalid)),
    }
}

// Update: fields may be absent, but a present one must be a non-blank string
pub fn validate_task_changes(input: &Map<String, Value>) -> Result<TaskChanges, AppError> {
    let mut invalid = ValidationErrors::new();

    let changes = TaskChanges {
        title: optional_string(input, TITLE, &mut invalid),
        description: optional_string(input, DESCRIPTION, &mut invalid),
        status: optional_string(input, STATUS, &mut invalid),
    };

    invalid.into_result()?;

    Ok(changes)
}

fn required_string(
    input: &Map<String, Value>,
    field: &str,
    invalid: &mut ValidationErrors,
) -> Option<String> {
    match input.get(field).map(trimmed) {
        None | Some(Value::Null) => {
            invalid.add(field, format!("The {field} field is required."));
            None
        }
        Some(Value::String(s)) => Some(s),
        Some(_) => {
            invalid.add(field, format!("The {field} field must be a string."));
            None
        }
    }
}

fn optional_string(
    input: &Map<String, Value>,
    field: &str,
    invalid: &mut ValidationErrors,
) -> Option<String> {
    match input.get(field).map(trimmed) {
        None => None,
        Some(Value::String(s)) => Some(s),
        Some(_) => {
            invalid.add(field, format!("The {field} field must be a string."));
            None
        }
    }
}

// Strings are kept trimmed; one that trims to nothing counts as null.
fn trimmed(value: &Value) -> Value {
    match value {
        Value::String(s) if s.trim().is_empty() => Value::Null,
        Value::String(s) => Value::String(s.trim().to_string()),
        other => other.clone(),
    }
}
