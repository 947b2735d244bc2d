//! Setting kinds: validation, filtering and randomization per value type.

use crate::chain::Chain;
use crate::settings::value::SettingValue;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::seq::SliceRandom;
use rand::Rng;

/// Characters used when a text setting without a restricted alphabet is randomized.
const RANDOM_TEXT_CHARS: &str = "abcdefghijklmnopqrstuvwxyz";

/// Type and constraints of a setting.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingKind {
    Text {
        min_length: usize,
        max_length: Option<usize>,
        /// Only these characters may appear, if set.
        allowed: Option<Chain>,
        /// Lowercase values on input when false.
        case_sensitive: bool,
        /// Reject repeated characters (alphabets).
        unique: bool,
    },
    Number {
        min: Option<f64>,
        max: Option<f64>,
        integer: bool,
    },
    Boolean,
    Enum {
        elements: Vec<String>,
    },
    Bytes {
        min_size: usize,
        max_size: Option<usize>,
    },
}

impl SettingKind {
    /// Unconstrained, case sensitive text.
    pub fn text() -> Self {
        SettingKind::Text {
            min_length: 0,
            max_length: None,
            allowed: None,
            case_sensitive: true,
            unique: false,
        }
    }

    /// Alphabet text: at least two distinct characters.
    pub fn alphabet() -> Self {
        SettingKind::Text {
            min_length: 2,
            max_length: None,
            allowed: None,
            case_sensitive: true,
            unique: true,
        }
    }

    pub fn integer(min: Option<i64>, max: Option<i64>) -> Self {
        SettingKind::Number {
            min: min.map(|v| v as f64),
            max: max.map(|v| v as f64),
            integer: true,
        }
    }

    pub fn enumeration<S: Into<String>>(elements: impl IntoIterator<Item = S>) -> Self {
        SettingKind::Enum {
            elements: elements.into_iter().map(Into::into).collect(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            SettingKind::Text { .. } => "text",
            SettingKind::Number { .. } => "number",
            SettingKind::Boolean => "boolean",
            SettingKind::Enum { .. } => "enum",
            SettingKind::Bytes { .. } => "bytes",
        }
    }

    /// Normalize a value before validation.
    pub fn filter(&self, value: SettingValue) -> SettingValue {
        match (self, value) {
            (SettingKind::Number { integer: true, .. }, SettingValue::Number(v)) => {
                SettingValue::Number(v.round())
            }
            (
                SettingKind::Text {
                    case_sensitive: false,
                    ..
                },
                SettingValue::Text(chain),
            ) => SettingValue::Text(chain.to_lower_case().unwrap_or(chain)),
            (SettingKind::Enum { .. }, SettingValue::Text(chain)) => {
                match chain.string().map(str::to_owned) {
                    Ok(text) => SettingValue::Enum(text),
                    Err(_) => SettingValue::Text(chain),
                }
            }
            (_, value) => value,
        }
    }

    /// Check a (filtered) value against this kind. The error is user facing.
    pub fn validate(&self, value: &SettingValue) -> Result<(), String> {
        match (self, value) {
            (
                SettingKind::Text {
                    min_length,
                    max_length,
                    allowed,
                    unique,
                    ..
                },
                SettingValue::Text(chain),
            ) => {
                let code_points = chain
                    .code_points()
                    .map_err(|e| format!("Value is not valid text: {}", e))?;
                if code_points.len() < *min_length {
                    return Err(format!("Must have at least {} characters", min_length));
                }
                if let Some(max) = max_length {
                    if code_points.len() > *max {
                        return Err(format!("Must have at most {} characters", max));
                    }
                }
                if let Some(allowed) = allowed {
                    let allowed = allowed
                        .code_points()
                        .map_err(|e| format!("Allowed characters are not valid text: {}", e))?;
                    if let Some(&bad) = code_points.iter().find(|cp| !allowed.contains(cp)) {
                        return Err(format!(
                            "Character '{}' is not allowed",
                            char::from_u32(bad).unwrap_or(char::REPLACEMENT_CHARACTER)
                        ));
                    }
                }
                if *unique {
                    let mut seen = std::collections::HashSet::new();
                    if let Some(&dup) = code_points.iter().find(|cp| !seen.insert(**cp)) {
                        return Err(format!(
                            "Character '{}' appears more than once",
                            char::from_u32(dup).unwrap_or(char::REPLACEMENT_CHARACTER)
                        ));
                    }
                }
                Ok(())
            }
            (SettingKind::Number { min, max, integer }, SettingValue::Number(v)) => {
                if !v.is_finite() {
                    return Err("Must be a finite number".into());
                }
                if *integer && v.fract() != 0.0 {
                    return Err("Must be an integer".into());
                }
                if let Some(min) = min {
                    if v < min {
                        return Err(format!("Must be at least {}", min));
                    }
                }
                if let Some(max) = max {
                    if v > max {
                        return Err(format!("Must be at most {}", max));
                    }
                }
                Ok(())
            }
            (SettingKind::Boolean, SettingValue::Boolean(_)) => Ok(()),
            (SettingKind::Enum { elements }, SettingValue::Enum(v)) => {
                if elements.iter().any(|e| e == v) {
                    Ok(())
                } else {
                    Err(format!("Must be one of: {}", elements.join(", ")))
                }
            }
            (SettingKind::Bytes { min_size, max_size }, SettingValue::Bytes(bytes)) => {
                if bytes.len() < *min_size {
                    return Err(format!("Must have at least {} bytes", min_size));
                }
                match max_size {
                    Some(max) if bytes.len() > *max => {
                        Err(format!("Must have at most {} bytes", max))
                    }
                    _ => Ok(()),
                }
            }
            (kind, value) => Err(format!(
                "Expected a {} value, got {}",
                kind.type_name(),
                value.type_name()
            )),
        }
    }

    /// Produce a random valid value, or `None` if this kind cannot be randomized.
    pub fn randomize<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<SettingValue> {
        match self {
            SettingKind::Number {
                min: Some(min),
                max: Some(max),
                integer,
            } => {
                if *integer {
                    let (lo, hi) = (min.ceil() as i64, max.floor() as i64);
                    (lo <= hi).then(|| SettingValue::Number(rng.gen_range(lo..=hi) as f64))
                } else {
                    (min <= max).then(|| SettingValue::Number(rng.gen_range(*min..=*max)))
                }
            }
            SettingKind::Number { .. } => None,
            SettingKind::Boolean => Some(SettingValue::Boolean(rng.gen())),
            SettingKind::Enum { elements } => elements
                .choose(rng)
                .map(|e| SettingValue::Enum(e.clone())),
            SettingKind::Text {
                min_length,
                max_length,
                allowed,
                unique,
                ..
            } => {
                let pool: Vec<u32> = match allowed {
                    Some(allowed) => allowed.code_points().ok()?.to_vec(),
                    None => RANDOM_TEXT_CHARS.chars().map(u32::from).collect(),
                };
                if pool.is_empty() {
                    return None;
                }
                let upper = max_length.unwrap_or(min_length + 8).max(*min_length);
                let length = rng.gen_range(*min_length..=upper);
                let code_points: Vec<u32> = if *unique {
                    if length > pool.len() {
                        return None;
                    }
                    pool.choose_multiple(rng, length).copied().collect()
                } else {
                    (0..length)
                        .filter_map(|_| pool.choose(rng).copied())
                        .collect()
                };
                Chain::from_code_points(code_points)
                    .ok()
                    .map(SettingValue::Text)
            }
            SettingKind::Bytes { min_size, max_size } => {
                let upper = max_size.unwrap_or(min_size + 16).max(*min_size);
                let size = rng.gen_range(*min_size..=upper);
                Some(SettingValue::Bytes((0..size).map(|_| rng.gen()).collect()))
            }
        }
    }

    /// Read a persisted JSON value for this kind.
    pub fn value_from_json(&self, json: &serde_json::Value) -> Result<SettingValue, String> {
        match (self, json) {
            (SettingKind::Text { .. }, serde_json::Value::String(s)) => {
                Ok(SettingValue::Text(Chain::from(s.as_str())))
            }
            (SettingKind::Number { .. }, serde_json::Value::Number(n)) => n
                .as_f64()
                .map(SettingValue::Number)
                .ok_or_else(|| format!("number {} out of range", n)),
            (SettingKind::Boolean, serde_json::Value::Bool(b)) => Ok(SettingValue::Boolean(*b)),
            (SettingKind::Enum { .. }, serde_json::Value::String(s)) => {
                Ok(SettingValue::Enum(s.clone()))
            }
            (SettingKind::Bytes { .. }, serde_json::Value::String(s)) => BASE64
                .decode(s)
                .map(SettingValue::Bytes)
                .map_err(|e| format!("invalid base64 bytes: {}", e)),
            (kind, other) => Err(format!("expected {} value, got {}", kind.type_name(), other)),
        }
    }
}
