//! Text encodings used when a chain translates between text and bytes.
//!
//! Only the text <-> byte boundary cares about encodings. Code points and
//! strings are always Unicode, so a [`TextEncodingError`] can only come out of
//! [`TextEncoding::decode`] (malformed bytes) or [`TextEncoding::encode`]
//! (a code point the encoding cannot represent).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Encoding a chain uses to translate between text and bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    #[default]
    Utf8,
    Utf16Le,
    Utf16Be,
    /// ISO-8859-1, one byte per code point up to U+00FF.
    Latin1,
}

/// Failure translating between text and bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TextEncodingError {
    #[error("byte sequence is not valid {encoding} (offset {offset})")]
    MalformedBytes {
        encoding: TextEncoding,
        offset: usize,
    },

    #[error("code point U+{code_point:04X} cannot be represented in {encoding}")]
    Unrepresentable {
        encoding: TextEncoding,
        code_point: u32,
    },
}

impl TextEncoding {
    /// Canonical lowercase name, as used in persisted pipes and config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf8",
            TextEncoding::Utf16Le => "utf16le",
            TextEncoding::Utf16Be => "utf16be",
            TextEncoding::Latin1 => "latin1",
        }
    }

    /// All supported encodings.
    pub fn all() -> &'static [TextEncoding] {
        &[
            TextEncoding::Utf8,
            TextEncoding::Utf16Le,
            TextEncoding::Utf16Be,
            TextEncoding::Latin1,
        ]
    }

    /// Decode bytes into a string.
    pub fn decode(&self, bytes: &[u8]) -> Result<String, TextEncodingError> {
        match self {
            TextEncoding::Utf8 => std::str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|e| TextEncodingError::MalformedBytes {
                    encoding: *self,
                    offset: e.valid_up_to(),
                }),
            TextEncoding::Utf16Le | TextEncoding::Utf16Be => self.decode_utf16(bytes),
            TextEncoding::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }

    /// Encode a string into bytes.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>, TextEncodingError> {
        match self {
            TextEncoding::Utf8 => Ok(text.as_bytes().to_vec()),
            TextEncoding::Utf16Le => Ok(text.encode_utf16().flat_map(u16::to_le_bytes).collect()),
            TextEncoding::Utf16Be => Ok(text.encode_utf16().flat_map(u16::to_be_bytes).collect()),
            TextEncoding::Latin1 => text
                .chars()
                .map(|c| {
                    u8::try_from(u32::from(c)).map_err(|_| TextEncodingError::Unrepresentable {
                        encoding: *self,
                        code_point: u32::from(c),
                    })
                })
                .collect(),
        }
    }

    fn decode_utf16(&self, bytes: &[u8]) -> Result<String, TextEncodingError> {
        if bytes.len() % 2 != 0 {
            return Err(TextEncodingError::MalformedBytes {
                encoding: *self,
                offset: bytes.len() - 1,
            });
        }

        let units = bytes.chunks_exact(2).map(|pair| {
            let pair = [pair[0], pair[1]];
            if *self == TextEncoding::Utf16Le {
                u16::from_le_bytes(pair)
            } else {
                u16::from_be_bytes(pair)
            }
        });

        let mut text = String::with_capacity(bytes.len() / 2);
        let mut consumed_units = 0usize;
        for decoded in char::decode_utf16(units) {
            match decoded {
                Ok(c) => {
                    consumed_units += c.len_utf16();
                    text.push(c);
                }
                Err(_) => {
                    return Err(TextEncodingError::MalformedBytes {
                        encoding: *self,
                        offset: consumed_units * 2,
                    })
                }
            }
        }
        Ok(text)
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TextEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "utf8" => Ok(TextEncoding::Utf8),
            "utf16le" => Ok(TextEncoding::Utf16Le),
            "utf16be" => Ok(TextEncoding::Utf16Be),
            "latin1" | "iso88591" => Ok(TextEncoding::Latin1),
            other => Err(format!("Unknown text encoding '{}'", other)),
        }
    }
}
