//! Persisted pipe format.
//!
//! ```json
//! {
//!   "title": "Caesar",
//!   "items": [
//!     { "name": "text" },
//!     { "name": "caesar-cipher", "settings": { "shift": 3 } },
//!     { "name": "text" }
//!   ],
//!   "content": { "data": "hello", "index": 0 }
//! }
//! ```

use crate::chain::Chain;
use crate::pipe::brick::{Brick, BrickInput};
use crate::pipe::engine::{Pipe, PipeContext};
use crate::pipe::error::{PipeError, PipeResult};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipeSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub items: Vec<BrickSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrickSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<BTreeMap<String, serde_json::Value>>,
}

impl BrickSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: None,
            hidden: None,
            reverse: None,
            settings: None,
        }
    }

    pub fn with_setting(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.settings
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value);
        self
    }

    pub fn reversed(mut self) -> Self {
        self.reverse = Some(true);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentEncoding {
    #[default]
    Text,
    Base64,
}

/// Content injected into one bucket after the pipe is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSpec {
    pub data: String,
    #[serde(default)]
    pub encoding: ContentEncoding,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub index: usize,
}

fn is_zero(value: &usize) -> bool {
    *value == 0
}

impl ContentSpec {
    /// Decode `data` into a chain; base64 data becomes byte content.
    pub fn chain(&self, context: &PipeContext) -> PipeResult<Chain> {
        match self.encoding {
            ContentEncoding::Text => Ok(Chain::from(self.data.as_str())),
            ContentEncoding::Base64 => BASE64
                .decode(self.data.trim())
                .map(|bytes| Chain::from_bytes_with_encoding(bytes, context.encoding()))
                .map_err(|e| {
                    PipeError::MalformedSpec(format!("content is not valid base64: {}", e))
                }),
        }
    }

    fn from_chain(content: &Chain, index: usize) -> PipeResult<Self> {
        if let Ok(text) = content.string() {
            return Ok(Self {
                data: text.to_owned(),
                encoding: ContentEncoding::Text,
                index,
            });
        }
        let bytes = content.bytes().map_err(|e| {
            PipeError::MalformedSpec(format!("bucket {} is unreadable: {}", index, e))
        })?;
        Ok(Self {
            data: BASE64.encode(bytes),
            encoding: ContentEncoding::Base64,
            index,
        })
    }
}

impl PipeSpec {
    pub fn from_json(json: &str) -> PipeResult<Self> {
        serde_json::from_str(json).map_err(|e| PipeError::MalformedSpec(e.to_string()))
    }

    pub fn to_json(&self) -> PipeResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| PipeError::MalformedSpec(e.to_string()))
    }
}

fn item_error(index: usize, error: PipeError) -> PipeError {
    let message = match error {
        PipeError::MalformedSpec(message) => message,
        other => other.to_string(),
    };
    PipeError::MalformedSpec(format!("item {}: {}", index, message))
}

impl Pipe {
    /// Build a pipe from its persisted form.
    ///
    /// Everything is validated before the pipe is created, so a malformed spec
    /// never yields a partial pipe. Injecting content starts translations;
    /// call this inside a `LocalSet`.
    pub fn extract(spec: &PipeSpec, context: PipeContext) -> PipeResult<Pipe> {
        if spec.items.is_empty() {
            return Err(PipeError::MalformedSpec("pipe has no items".into()));
        }

        let bricks = spec
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                context
                    .registry()
                    .materialize(item)
                    .map_err(|e| item_error(i, e))
            })
            .collect::<PipeResult<Vec<Brick>>>()?;

        let content = match &spec.content {
            Some(content_spec) => {
                let bucket_count = bricks.iter().filter(|b| b.is_encoder()).count() + 1;
                if content_spec.index >= bucket_count {
                    return Err(PipeError::MalformedSpec(format!(
                        "content index {} out of range, pipe has {} buckets",
                        content_spec.index, bucket_count
                    )));
                }
                Some((content_spec.chain(&context)?, content_spec.index))
            }
            None => None,
        };

        let pipe = Pipe::new(context);
        pipe.set_id(spec.id);
        pipe.set_url(spec.url.clone());
        pipe.set_title(spec.title.clone());
        pipe.set_description(spec.description.clone());
        pipe.append_bricks(bricks.into_iter().map(BrickInput::Brick).collect())?;
        if let Some((chain, index)) = content {
            pipe.set_content(chain, index, None)?;
        }
        tracing::debug!(
            bricks = pipe.brick_count(),
            buckets = pipe.bucket_count(),
            "pipe extracted"
        );
        Ok(pipe)
    }

    /// Persisted form, with content taken from the selected bucket.
    pub fn serialize(&self) -> PipeResult<PipeSpec> {
        let items = self
            .bricks()
            .iter()
            .map(Brick::serialize)
            .collect::<PipeResult<Vec<_>>>()?;
        let selected = self.selected_bucket();
        let content = self.content(selected)?;
        let content = if content.is_empty() {
            None
        } else {
            Some(ContentSpec::from_chain(&content, selected)?)
        };
        Ok(PipeSpec {
            id: self.id(),
            url: self.url(),
            title: self.title(),
            description: self.description(),
            items,
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let spec = PipeSpec::from_json(r#"{"items": [{"name": "text"}]}"#).unwrap();
        assert_eq!(spec.items, vec![BrickSpec::new("text")]);
        assert!(spec.content.is_none());
    }

    #[test]
    fn test_content_defaults() {
        let spec = PipeSpec::from_json(
            r#"{"items": [{"name": "text"}], "content": {"data": "hi"}}"#,
        )
        .unwrap();
        let content = spec.content.unwrap();
        assert_eq!(content.encoding, ContentEncoding::Text);
        assert_eq!(content.index, 0);
    }

    #[test]
    fn test_wrong_types_rejected() {
        let err = PipeSpec::from_json(r#"{"items": [{"name": 3}]}"#).unwrap_err();
        assert!(matches!(err, PipeError::MalformedSpec(_)));
        assert!(PipeSpec::from_json(r#"{"title": "no items"}"#).is_err());
    }

    #[test]
    fn test_optional_fields_omitted() {
        let spec = PipeSpec {
            id: None,
            url: None,
            title: None,
            description: None,
            items: vec![BrickSpec::new("base64")],
            content: None,
        };
        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            serde_json::json!({"items": [{"name": "base64"}]})
        );
    }

    #[test]
    fn test_base64_content() {
        let content = ContentSpec {
            data: "AP8=".into(),
            encoding: ContentEncoding::Base64,
            index: 0,
        };
        let chain = content.chain(&PipeContext::default()).unwrap();
        assert_eq!(chain.bytes().unwrap(), &[0x00, 0xff]);

        let back = ContentSpec::from_chain(&chain, 2).unwrap();
        assert_eq!(back.encoding, ContentEncoding::Base64);
        assert_eq!(back.data, "AP8=");
        assert_eq!(back.index, 2);

        let bad = ContentSpec {
            data: "***".into(),
            encoding: ContentEncoding::Base64,
            index: 0,
        };
        assert!(matches!(
            bad.chain(&PipeContext::default()),
            Err(PipeError::MalformedSpec(_))
        ));
    }
}
