use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
enum Slot {
    /// The destination has no value and no default.
    Unset,
    Set(Value),
}

/// Parsed destinations and their values, in option order.
///
/// Every destination is seeded before parsing starts. Destinations that end
/// up with neither a value nor a default are removed before `execute` runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgMap {
    slots: IndexMap<String, Slot>,
    explicit: IndexSet<String>,
}

impl ArgMap {
    /// Get the value stored under `dest`.
    pub fn get(&self, dest: &str) -> Option<&Value> {
        match self.slots.get(dest)? {
            Slot::Set(v) => Some(v),
            Slot::Unset => None,
        }
    }

    pub fn get_str(&self, dest: &str) -> Option<&str> {
        self.get(dest).and_then(Value::as_str)
    }

    pub fn get_bool(&self, dest: &str) -> Option<bool> {
        self.get(dest).and_then(Value::as_bool)
    }

    pub fn get_i64(&self, dest: &str) -> Option<i64> {
        self.get(dest).and_then(Value::as_i64)
    }

    /// Get all values of a sequence destination (e.g. an `append` option).
    pub fn get_all(&self, dest: &str) -> Option<&[Value]> {
        self.get(dest).and_then(Value::as_array).map(Vec::as_slice)
    }

    /// Whether `dest` has a value (explicit or defaulted).
    pub fn contains(&self, dest: &str) -> bool {
        self.get(dest).is_some()
    }

    /// Whether `dest` was set from argv.
    ///
    /// This does not include values sourced from defaults.
    pub fn is_explicit(&self, dest: &str) -> bool {
        self.explicit.contains(dest)
    }

    /// Number of destinations, including ones still waiting for a value.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Destinations that hold a value, in option order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.slots.iter().filter_map(|(k, slot)| match slot {
            Slot::Set(v) => Some((k.as_str(), v)),
            Slot::Unset => None,
        })
    }

    /// Render the destinations that hold a value as a JSON object.
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        Value::Object(map)
    }
}

impl ArgMap {
    /// Seed `dest` unless it is already present. `None` seeds the no-value
    /// marker.
    pub(crate) fn seed(&mut self, dest: &str, default: Option<Value>) {
        if !self.slots.contains_key(dest) {
            let slot = default.map_or(Slot::Unset, Slot::Set);
            self.slots.insert(dest.to_string(), slot);
        }
    }

    pub(crate) fn set(&mut self, dest: &str, value: Value) {
        self.slots.insert(dest.to_string(), Slot::Set(value));
        self.explicit.insert(dest.to_string());
    }

    /// Push onto the sequence under `dest`, replacing the no-value marker or
    /// a non-sequence value with an empty sequence first.
    pub(crate) fn push(&mut self, dest: &str, value: Value) {
        let slot = self
            .slots
            .entry(dest.to_string())
            .or_insert(Slot::Unset);
        match slot {
            Slot::Set(Value::Array(items)) => items.push(value),
            _ => *slot = Slot::Set(Value::Array(vec![value])),
        }
        self.explicit.insert(dest.to_string());
    }

    /// Drop destinations that never received a value.
    pub(crate) fn strip_unset(&mut self) {
        self.slots.retain(|_, slot| matches!(slot, Slot::Set(_)));
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.explicit.clear();
    }
}
