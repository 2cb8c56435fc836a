use chrono::NaiveDate;
use rusqlite::Connection;
use serde_json::Value;
use std::path::PathBuf;

use crate::error::StoreError;
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::model::{parse_date_of_birth, parse_enrollment_year};

pub fn require_db<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn require_workspace(state: &AppState, req: &Request) -> Result<PathBuf, Value> {
    state
        .workspace
        .clone()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

/// Required non-blank string parameter, trimmed.
pub fn path_param(req: &Request, key: &str) -> Result<String, Value> {
    match req.params.get(key).and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(err(&req.id, "bad_params", format!("missing {key}"), None)),
    }
}

/// Required string parameter, returned as given.
pub fn str_param(req: &Request, key: &str) -> Result<String, Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {key}"), None))
}

pub fn opt_str_param(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
}

/// Student ids arrive as JSON numbers; numeric strings are accepted too.
pub fn id_value(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn id_param(req: &Request, key: &str) -> Result<i64, Value> {
    req.params
        .get(key)
        .and_then(id_value)
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {key}"), None))
}

/// `null`, `""` or a `YYYY-MM-DD` string.
pub fn date_value(v: &Value) -> Result<Option<NaiveDate>, StoreError> {
    match v {
        Value::Null => Ok(None),
        Value::String(s) => parse_date_of_birth(s),
        _ => Err(StoreError::validation(
            "date_of_birth",
            "Date of birth must be YYYY-MM-DD.",
        )),
    }
}

/// `null`, `""`, a non-negative integer, or a string of digits.
pub fn year_value(v: &Value) -> Result<Option<i32>, StoreError> {
    let bad = || StoreError::validation("enrollment_year", "Enrollment year must be an integer.");
    match v {
        Value::Null => Ok(None),
        Value::Number(n) => {
            let y = n.as_i64().ok_or_else(bad)?;
            if y < 0 {
                return Err(bad());
            }
            i32::try_from(y).map(Some).map_err(|_| bad())
        }
        Value::String(s) => parse_enrollment_year(s),
        _ => Err(bad()),
    }
}

/// Text field that may be `null` (treated as blank).
pub fn text_value(v: &Value, field: &'static str) -> Result<String, StoreError> {
    match v {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s.clone()),
        _ => Err(StoreError::validation(
            field,
            format!("{field} must be a string"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn year_value_accepts_numbers_and_digit_strings() {
        assert_eq!(year_value(&json!(2024)).unwrap(), Some(2024));
        assert_eq!(year_value(&json!("2024")).unwrap(), Some(2024));
        assert_eq!(year_value(&json!("")).unwrap(), None);
        assert_eq!(year_value(&Value::Null).unwrap(), None);
        assert!(year_value(&json!(-1)).is_err());
        assert!(year_value(&json!(20.5)).is_err());
        assert!(year_value(&json!(true)).is_err());
    }

    #[test]
    fn date_value_parses_iso() {
        assert_eq!(
            date_value(&json!("2000-02-29")).unwrap(),
            NaiveDate::from_ymd_opt(2000, 2, 29)
        );
        assert_eq!(date_value(&Value::Null).unwrap(), None);
        assert!(date_value(&json!(20000229)).is_err());
    }

    #[test]
    fn id_value_accepts_numeric_strings() {
        assert_eq!(id_value(&json!(5)), Some(5));
        assert_eq!(id_value(&json!(" 6 ")), Some(6));
        assert_eq!(id_value(&json!("x")), None);
    }
}
