//! Property value equality.
//!
//! Values are `serde_json::Value`s. Equality differs from `Value`'s own
//! `PartialEq` in two ways:
//!
//! - `null` and empty or whitespace-only strings all mean "no value" and
//!   are equal to each other, but never to a present value.
//! - Numbers compare by numeric value (`1` equals `1.0`); values of
//!   different kinds (a number and a string, say) are simply unequal.

use serde_json::Value;

/// Returns `true` for `null` and for empty or whitespace-only strings.
pub fn is_no_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Compare two property values.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (is_no_value(a), is_no_value(b)) {
        (true, true) => return true,
        (true, false) | (false, true) => return false,
        (false, false) => {}
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                x == y
            } else if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                x == y
            } else {
                match (x.as_f64(), y.as_f64()) {
                    (Some(x), Some(y)) => x == y,
                    _ => false,
                }
            }
        }
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => false,
    }
}
