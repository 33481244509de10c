// src/timesheet/values.rs — Submitted card input values

use serde_json::{Map, Value};

/// Input values posted back by a card action, keyed by input id.
///
/// Teams sends most inputs as strings (numbers included), but some clients
/// send raw JSON numbers, so lookups accept both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormValues(Map<String, Value>);

impl FormValues {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn insert(&mut self, id: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(id.into(), value.into());
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// The trimmed value as text. `None` when absent or null; may be empty.
    pub fn text(&self, id: &str) -> Option<String> {
        match self.0.get(id)? {
            Value::Null => None,
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            other => Some(other.to_string()),
        }
    }

    /// Like [`text`](Self::text) but treats blank input as absent.
    pub fn non_empty(&self, id: &str) -> Option<String> {
        self.text(id).filter(|s| !s.is_empty())
    }

    /// `None` when blank or absent, `Some(Err(raw))` when the input is not a
    /// finite number.
    pub fn number(&self, id: &str) -> Option<Result<f64, String>> {
        if let Some(Value::Number(n)) = self.0.get(id) {
            return n.as_f64().filter(|f| f.is_finite()).map(Ok);
        }
        let raw = self.non_empty(id)?;
        Some(
            raw.parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .ok_or(raw),
        )
    }
}

impl From<Map<String, Value>> for FormValues {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
