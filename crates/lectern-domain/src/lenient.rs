//! Lenient serde adapters for model-produced JSON
//!
//! Models routinely return a number where a string was asked for, a map where
//! a list was asked for, or a single string instead of an array. These
//! adapters coerce such shapes at the deserialization boundary so the typed
//! structs stay strict everywhere else.

use crate::document::Variable;
use crate::kind::ExampleKind;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Render any JSON scalar as text; arrays are joined, objects are serialized
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("; "),
        Value::Object(_) => value.to_string(),
    }
}

/// Deserialize a string from any JSON value
pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_text(&value))
}

/// Deserialize a list of strings from an array or a single value
pub fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .filter(|s| !s.trim().is_empty())
            .collect(),
        other => {
            let text = value_to_text(&other);
            if text.trim().is_empty() {
                Vec::new()
            } else {
                vec![text]
            }
        }
    })
}

/// Deserialize a list, silently skipping elements that do not fit `T`
pub fn vec_of<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        Value::Null => Vec::new(),
        single => serde_json::from_value(single).map(|t| vec![t]).unwrap_or_default(),
    })
}

/// Deserialize formula variables from a `{symbol: meaning}` map or a list
pub fn variables<'de, D>(deserializer: D) -> Result<Vec<Variable>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(variables_from_value(&value))
}

/// Coerce a JSON value into formula variables
pub fn variables_from_value(value: &Value) -> Vec<Variable> {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(symbol, meaning)| Variable {
                symbol: symbol.clone(),
                meaning: value_to_text(meaning),
            })
            .collect(),
        Value::Array(items) => items.iter().filter_map(variable_from_item).collect(),
        Value::String(s) => s
            .split([';', '\n'])
            .filter_map(|part| variable_from_item(&Value::String(part.to_string())))
            .collect(),
        _ => Vec::new(),
    }
}

fn variable_from_item(item: &Value) -> Option<Variable> {
    match item {
        Value::Object(map) => {
            let symbol = ["symbol", "name", "variable", "var"]
                .iter()
                .find_map(|k| map.get(*k))
                .map(value_to_text)?;
            let meaning = ["meaning", "description", "definition", "unit"]
                .iter()
                .find_map(|k| map.get(*k))
                .map(value_to_text)
                .unwrap_or_default();
            Some(Variable { symbol, meaning })
        }
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            match s.split_once([':', '=']) {
                Some((symbol, meaning)) => Some(Variable {
                    symbol: symbol.trim().to_string(),
                    meaning: meaning.trim().to_string(),
                }),
                None => Some(Variable {
                    symbol: s.to_string(),
                    meaning: String::new(),
                }),
            }
        }
        _ => None,
    }
}

/// Deserialize an example kind, mapping anything unrecognized to `None`
pub fn example_kind<'de, D>(deserializer: D) -> Result<Option<ExampleKind>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "numeric" | "number" | "quantitative" | "computation" => Some(ExampleKind::Numeric),
            "anchored" | "case" | "qualitative" | "historical" => Some(ExampleKind::Anchored),
            _ => None,
        },
        _ => None,
    })
}

/// Deserialize a non-negative count from a number or numeric string
pub fn count<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .map(|n| n as usize)
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}
