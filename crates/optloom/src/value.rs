//! Dynamic values held in the result mapping, and the coercion functions
//! that produce them from raw tokens.

use std::fmt;
use std::sync::Arc;

pub use serde_json::Value;

type CoerceFn = dyn Fn(&str) -> Result<Value, String> + Send + Sync;

/// Converts one raw token into a [`Value`].
///
/// Coercion must be deterministic: the same input always yields the same
/// value or the same failure.
#[derive(Clone)]
pub struct Coerce {
    name: &'static str,
    f: Arc<CoerceFn>,
}

impl Coerce {
    pub fn new<F>(name: &'static str, f: F) -> Self
    where
        F: Fn(&str) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            name,
            f: Arc::new(f),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn apply(&self, raw: &str) -> Result<Value, String> {
        (self.f)(raw)
    }
}

impl Default for Coerce {
    fn default() -> Self {
        string()
    }
}

impl fmt::Debug for Coerce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Coerce").field(&self.name).finish()
    }
}

/// Keep the token as a string.
pub fn string() -> Coerce {
    Coerce::new("string", |raw| Ok(Value::String(raw.to_string())))
}

/// Parse the token as a signed 64-bit integer.
pub fn integer() -> Coerce {
    Coerce::new("int", |raw| {
        raw.trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|e| format!("{raw:?} is not an integer: {e}"))
    })
}

/// Parse the token as a finite float.
pub fn float() -> Coerce {
    Coerce::new("float", |raw| {
        let v = raw
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("{raw:?} is not a number: {e}"))?;
        serde_json::Number::from_f64(v)
            .map(Value::Number)
            .ok_or_else(|| format!("{raw:?} is not a finite number"))
    })
}

/// Parse the token as a boolean (`true/false`, `yes/no`, `on/off`, `1/0`).
pub fn boolean() -> Coerce {
    Coerce::new("bool", |raw| {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
            "false" | "no" | "off" | "0" => Ok(Value::Bool(false)),
            _ => Err(format!("{raw:?} is not a boolean")),
        }
    })
}

/// Look up a built-in coercion by its name (`string`, `int`, `float`, `bool`).
pub fn by_name(name: &str) -> Option<Coerce> {
    match name {
        "string" | "str" => Some(string()),
        "int" | "integer" => Some(integer()),
        "float" | "number" => Some(float()),
        "bool" | "boolean" => Some(boolean()),
        _ => None,
    }
}

/// Truthiness used by the short-circuit check.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
