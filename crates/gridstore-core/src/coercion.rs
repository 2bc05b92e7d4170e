//! Value coercion: loosely-typed input → the physical value a column stores.
//!
//! Pure; no I/O. Blank input always becomes `Value::Null` regardless of the
//! column type. Whether null is acceptable is decided by the caller.

use crate::errors::{GridError, GridResult};
use crate::types::{TypeHint, Value};

/// Why a value was rejected. Carries the expectation for error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoercionError {
    pub expected: &'static str,
}

impl CoercionError {
    /// Attach the column name and offending value.
    pub fn into_grid_error(self, column: &str, raw: &Value) -> GridError {
        GridError::InvalidValue {
            column: column.to_string(),
            expected: self.expected,
            value: raw.to_text(),
        }
    }
}

const EXPECT_INTEGER: CoercionError = CoercionError { expected: "an integer" };
const EXPECT_NUMBER: CoercionError = CoercionError { expected: "a number" };
const EXPECT_BOOLEAN: CoercionError = CoercionError { expected: "yes/no" };

/// Coerce `raw` to the physical form implied by `hint`.
pub fn coerce(hint: TypeHint, raw: &Value) -> Result<Value, CoercionError> {
    if raw.is_blank() {
        return Ok(Value::Null);
    }
    match hint {
        TypeHint::Integer => coerce_integer(raw),
        TypeHint::Decimal => coerce_decimal(raw),
        TypeHint::Boolean => coerce_boolean(raw),
        TypeHint::Text | TypeHint::DateTime => Ok(coerce_text(raw)),
    }
}

/// Coerce with column context on failure.
pub fn coerce_column(column: &str, hint: TypeHint, raw: &Value) -> GridResult<Value> {
    coerce(hint, raw).map_err(|e| e.into_grid_error(column, raw))
}

fn coerce_integer(raw: &Value) -> Result<Value, CoercionError> {
    match raw {
        Value::Integer(i) => Ok(Value::Integer(*i)),
        // JSON clients may send 3.0 for 3.
        Value::Real(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.007_199_254_740_992e15 => {
            Ok(Value::Integer(*f as i64))
        }
        Value::Text(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| EXPECT_INTEGER),
        _ => Err(EXPECT_INTEGER),
    }
}

fn coerce_decimal(raw: &Value) -> Result<Value, CoercionError> {
    match raw {
        Value::Integer(i) => Ok(Value::Real(*i as f64)),
        Value::Real(f) if f.is_finite() => Ok(Value::Real(*f)),
        Value::Text(s) => match s.trim().parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(Value::Real(f)),
            _ => Err(EXPECT_NUMBER),
        },
        _ => Err(EXPECT_NUMBER),
    }
}

fn coerce_boolean(raw: &Value) -> Result<Value, CoercionError> {
    match raw {
        Value::Bool(b) => Ok(Value::Bool(*b)),
        Value::Text(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "是" | "yes" => Ok(Value::Bool(true)),
            "false" | "0" | "否" | "no" => Ok(Value::Bool(false)),
            _ => Err(EXPECT_BOOLEAN),
        },
        _ => Err(EXPECT_BOOLEAN),
    }
}

fn coerce_text(raw: &Value) -> Value {
    match raw {
        Value::Text(s) => Value::Text(s.clone()),
        other => Value::Text(other.to_text()),
    }
}
