//! Typed setting values.

use crate::chain::Chain;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::collections::HashMap;

/// Value held by a brick setting.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Text(Chain),
    Number(f64),
    Boolean(bool),
    Enum(String),
    Bytes(Vec<u8>),
}

impl SettingValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            SettingValue::Text(_) => "text",
            SettingValue::Number(_) => "number",
            SettingValue::Boolean(_) => "boolean",
            SettingValue::Enum(_) => "enum",
            SettingValue::Bytes(_) => "bytes",
        }
    }

    pub fn as_text(&self) -> Option<&Chain> {
        match self {
            SettingValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            SettingValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Number value, if it is integral.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            SettingValue::Number(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&str> {
        match self {
            SettingValue::Enum(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            SettingValue::Bytes(v) => Some(v),
            _ => None,
        }
    }

    /// JSON form used in persisted pipes. Bytes are written as base64.
    pub fn to_json(&self) -> Result<serde_json::Value, String> {
        Ok(match self {
            SettingValue::Text(chain) => serde_json::Value::String(
                chain
                    .string()
                    .map_err(|e| format!("text value is not valid text: {}", e))?
                    .to_owned(),
            ),
            SettingValue::Number(v) if v.fract() == 0.0 && v.abs() < 9.0e15 => {
                serde_json::Value::from(*v as i64)
            }
            SettingValue::Number(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .ok_or_else(|| format!("number {} is not representable", v))?,
            SettingValue::Boolean(v) => serde_json::Value::Bool(*v),
            SettingValue::Enum(v) => serde_json::Value::String(v.clone()),
            SettingValue::Bytes(v) => serde_json::Value::String(BASE64.encode(v)),
        })
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::Text(Chain::from(value))
    }
}

impl From<Chain> for SettingValue {
    fn from(value: Chain) -> Self {
        SettingValue::Text(value)
    }
}

impl From<f64> for SettingValue {
    fn from(value: f64) -> Self {
        SettingValue::Number(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        SettingValue::Number(value as f64)
    }
}

impl From<i32> for SettingValue {
    fn from(value: i32) -> Self {
        SettingValue::Number(f64::from(value))
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Boolean(value)
    }
}

impl From<Vec<u8>> for SettingValue {
    fn from(value: Vec<u8>) -> Self {
        SettingValue::Bytes(value)
    }
}

/// Immutable snapshot of a brick's setting values.
///
/// Hooks receive this instead of the live collection, so a setting can change
/// while a translation is suspended without any borrow conflict.
#[derive(Debug, Clone, Default)]
pub struct SettingValues {
    values: HashMap<String, SettingValue>,
}

impl SettingValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: SettingValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&SettingValue> {
        self.values.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&Chain> {
        self.get(name).and_then(SettingValue::as_text)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(SettingValue::as_number)
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(SettingValue::as_integer)
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(SettingValue::as_bool)
    }

    pub fn enum_value(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(SettingValue::as_enum)
    }

    pub fn bytes(&self, name: &str) -> Option<&[u8]> {
        self.get(name).and_then(SettingValue::as_bytes)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
