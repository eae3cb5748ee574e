//! Condition normalization
//!
//! Turns loosely structured query input into a [`ConditionSpec`]: a bundle of
//! SELECT/WHERE/ORDER/LIMIT fragments.
//!
//! # Security Warning
//!
//! Fragments are copied into SQL verbatim. They are neither validated nor escaped; keep
//! them static and pass user input through bound parameters (`:name` or `?`).

use super::error::{DatabaseError, Result};
use serde::Deserialize;
use std::collections::HashMap;

/// Normalized query shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionSpec {
    select_clause: String,
    where_clause: String,
    order_clause: String,
    limit_clause: String,
}

impl ConditionSpec {
    /// Column list; `*` unless one was given
    pub fn select_clause(&self) -> &str {
        &self.select_clause
    }

    /// WHERE body, possibly empty
    pub fn where_clause(&self) -> &str {
        &self.where_clause
    }

    /// ORDER BY body, possibly empty
    pub fn order_clause(&self) -> &str {
        &self.order_clause
    }

    /// LIMIT body, possibly empty
    pub fn limit_clause(&self) -> &str {
        &self.limit_clause
    }
}

impl Default for ConditionSpec {
    fn default() -> Self {
        normalize(ConditionInput::Empty)
    }
}

/// Structured condition input; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StructuredCondition {
    /// WHERE body given without a key (element `0` of a list)
    #[serde(rename = "0")]
    pub positional: Option<String>,
    pub select: Option<String>,
    /// WHERE body; takes precedence over `positional`
    pub condition: Option<String>,
    #[serde(deserialize_with = "text_or_number")]
    pub limit: Option<String>,
    pub order: Option<String>,
}

impl StructuredCondition {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn select(mut self, select: impl Into<String>) -> Self {
        self.select = Some(select.into());
        self
    }

    #[must_use]
    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    #[must_use]
    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: impl ToString) -> Self {
        self.limit = Some(limit.to_string());
        self
    }
}

fn text_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Condition input accepted by `find_all` and `count`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConditionInput {
    /// No condition
    #[default]
    Empty,
    /// Bare WHERE body
    Filter(String),
    /// Keyed fragments
    Structured(StructuredCondition),
}

impl ConditionInput {
    /// Parse input given as JSON: a string (WHERE body), a list whose first element is the
    /// WHERE body, an object with `select`/`condition`/`order`/`limit`, or `null`
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| DatabaseError::unexpected(format!("invalid condition JSON: {}", e)))?;
        match value {
            serde_json::Value::Null => Ok(ConditionInput::Empty),
            serde_json::Value::String(s) => Ok(ConditionInput::Filter(s)),
            serde_json::Value::Array(items) => {
                let positional = items.into_iter().next().and_then(|v| match v {
                    serde_json::Value::String(s) => Some(s),
                    _ => None,
                });
                Ok(ConditionInput::Structured(StructuredCondition {
                    positional,
                    ..Default::default()
                }))
            }
            obj @ serde_json::Value::Object(_) => serde_json::from_value(obj)
                .map(ConditionInput::Structured)
                .map_err(|e| DatabaseError::unexpected(format!("invalid condition: {}", e))),
            other => Err(DatabaseError::unexpected(format!(
                "unsupported condition input: {}",
                other
            ))),
        }
    }
}

impl From<&str> for ConditionInput {
    fn from(s: &str) -> Self {
        ConditionInput::Filter(s.to_string())
    }
}

impl From<String> for ConditionInput {
    fn from(s: String) -> Self {
        ConditionInput::Filter(s)
    }
}

impl From<StructuredCondition> for ConditionInput {
    fn from(c: StructuredCondition) -> Self {
        ConditionInput::Structured(c)
    }
}

impl From<()> for ConditionInput {
    fn from(_: ()) -> Self {
        ConditionInput::Empty
    }
}

/// Keys `select`, `condition`, `order` and `limit` are recognized; `0` is the positional
/// WHERE body. Anything else is ignored.
impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for ConditionInput {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut structured = StructuredCondition::default();
        for (key, value) in iter {
            let value = value.into();
            match key.as_ref() {
                "0" => structured.positional = Some(value),
                "select" => structured.select = Some(value),
                "condition" => structured.condition = Some(value),
                "order" => structured.order = Some(value),
                "limit" => structured.limit = Some(value),
                _ => {}
            }
        }
        ConditionInput::Structured(structured)
    }
}

impl From<HashMap<String, String>> for ConditionInput {
    fn from(map: HashMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

/// Normalize condition input into a [`ConditionSpec`]
pub fn normalize(input: impl Into<ConditionInput>) -> ConditionSpec {
    let mut spec = ConditionSpec {
        select_clause: String::new(),
        where_clause: String::new(),
        order_clause: String::new(),
        limit_clause: String::new(),
    };

    match input.into() {
        ConditionInput::Empty => {}
        ConditionInput::Filter(filter) => spec.where_clause = filter,
        ConditionInput::Structured(c) => {
            if let Some(where_clause) = c.condition.or(c.positional) {
                spec.where_clause = where_clause;
            }
            spec.select_clause = c.select.unwrap_or_default();
            spec.order_clause = c.order.unwrap_or_default();
            spec.limit_clause = c.limit.unwrap_or_default();
        }
    }

    if spec.select_clause.trim().is_empty() {
        spec.select_clause = "*".to_string();
    }
    spec
}
