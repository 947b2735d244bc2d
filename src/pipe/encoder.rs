//! Encoder bricks: reversible translations between two adjacent buckets.

use crate::chain::Chain;
use crate::pipe::brick::{Brick, BrickCore};
use crate::pipe::error::{BrickError, BrickResult, PipeResult};
use crate::settings::{Setting, SettingValues, SettingsCollection};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Brick-specific behaviour of an encoder.
///
/// Each direction runs `will -> perform -> did`; every hook receives the
/// previous hook's output and an immutable settings snapshot taken when the
/// translation started.
#[async_trait(?Send)]
pub trait EncoderPlugin {
    /// Registry identifier, e.g. `caesar-cipher`.
    fn name(&self) -> &str;

    /// Default display title.
    fn title(&self) -> &str;

    /// Setting definitions with their defaults.
    fn settings(&self) -> Vec<Setting>;

    /// Decoding is disabled (hash functions and similar).
    fn encode_only(&self) -> bool {
        false
    }

    /// Re-check settings that depend on each other after any value changed.
    fn revalidate(&self, _settings: &mut SettingsCollection) {}

    async fn will_encode(&self, content: Chain, _settings: &SettingValues) -> BrickResult<Chain> {
        Ok(content)
    }

    async fn perform_encode(&self, content: Chain, settings: &SettingValues) -> BrickResult<Chain>;

    async fn did_encode(&self, content: Chain, _settings: &SettingValues) -> BrickResult<Chain> {
        Ok(content)
    }

    async fn will_decode(&self, content: Chain, _settings: &SettingValues) -> BrickResult<Chain> {
        Ok(content)
    }

    async fn perform_decode(&self, content: Chain, settings: &SettingValues) -> BrickResult<Chain>;

    async fn did_decode(&self, content: Chain, _settings: &SettingValues) -> BrickResult<Chain> {
        Ok(content)
    }
}

/// Bookkeeping for the last successful translation.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRecord {
    pub is_encode: bool,
    pub duration: Duration,
    pub byte_count: Option<usize>,
    pub char_count: Option<usize>,
    pub finished_at: DateTime<Utc>,
}

pub struct Encoder {
    core: BrickCore,
    plugin: Box<dyn EncoderPlugin>,
    reversed: Cell<bool>,
    last_translation: RefCell<Option<TranslationRecord>>,
}

impl Encoder {
    pub fn new(plugin: impl EncoderPlugin + 'static) -> PipeResult<Rc<Self>> {
        Self::from_boxed(Box::new(plugin))
    }

    pub fn from_boxed(plugin: Box<dyn EncoderPlugin>) -> PipeResult<Rc<Self>> {
        let mut settings = SettingsCollection::from_settings(plugin.settings())?;
        plugin.revalidate(&mut settings);
        Ok(Rc::new(Self {
            core: BrickCore::new(plugin.name(), plugin.title(), settings),
            plugin,
            reversed: Cell::new(false),
            last_translation: RefCell::new(None),
        }))
    }

    pub fn core(&self) -> &BrickCore {
        &self.core
    }

    pub fn plugin(&self) -> &dyn EncoderPlugin {
        self.plugin.as_ref()
    }

    pub fn is_encode_only(&self) -> bool {
        self.plugin.encode_only()
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed.get()
    }

    pub(crate) fn set_reversed_flag(&self, reversed: bool) {
        self.reversed.set(reversed);
    }

    /// Swap the default direction. The owning pipe treats this like a setting change.
    pub fn set_reversed(self: &Rc<Self>, reversed: bool) -> PipeResult<()> {
        if self.reversed.replace(reversed) == reversed {
            return Ok(());
        }
        if let Some(pipe) = self.core.pipe() {
            pipe.brick_setting_did_change(&Brick::Encoder(self.clone()))?;
        }
        Ok(())
    }

    pub fn last_translation(&self) -> Option<TranslationRecord> {
        self.last_translation.borrow().clone()
    }

    pub async fn encode(&self, content: impl Into<Chain>) -> BrickResult<Chain> {
        self.translate(content.into(), true).await
    }

    pub async fn decode(&self, content: impl Into<Chain>) -> BrickResult<Chain> {
        self.translate(content.into(), false).await
    }

    /// Translate `content` in the requested direction, honouring `reverse`.
    pub async fn translate(&self, content: Chain, is_encode: bool) -> BrickResult<Chain> {
        let encode = is_encode != self.reversed.get();
        let started = Instant::now();
        let result = self.run_hooks(content, encode).await;

        match &result {
            Ok(output) => {
                let record = TranslationRecord {
                    is_encode: encode,
                    duration: started.elapsed(),
                    byte_count: output.size().ok(),
                    char_count: output.len().ok(),
                    finished_at: Utc::now(),
                };
                tracing::trace!(
                    brick = self.core.name(),
                    encode,
                    duration_us = record.duration.as_micros() as u64,
                    "translation finished"
                );
                *self.last_translation.borrow_mut() = Some(record);
                *self.core.last_error.borrow_mut() = None;
            }
            Err(e) => {
                tracing::trace!(brick = self.core.name(), encode, error = %e, "translation failed");
                *self.core.last_error.borrow_mut() = Some(e.clone());
            }
        }
        result
    }

    async fn run_hooks(&self, content: Chain, encode: bool) -> BrickResult<Chain> {
        if !encode && self.plugin.encode_only() {
            return Err(BrickError::invalid_input(format!(
                "Decoding is not available for '{}'",
                self.core.title()
            )));
        }
        let settings = self.core.check_settings()?;

        // Content a cipher cannot read as text is malformed input, not a crash.
        self.run_plugin(content, encode, &settings)
            .await
            .map_err(|e| match e {
                BrickError::TextEncoding(inner) => BrickError::invalid_input(inner.to_string()),
                other => other,
            })
    }

    async fn run_plugin(
        &self,
        content: Chain,
        encode: bool,
        settings: &SettingValues,
    ) -> BrickResult<Chain> {
        let plugin = self.plugin.as_ref();
        if encode {
            let content = plugin.will_encode(content, settings).await?;
            let content = plugin.perform_encode(content, settings).await?;
            plugin.did_encode(content, settings).await
        } else {
            let content = plugin.will_decode(content, settings).await?;
            let content = plugin.perform_decode(content, settings).await?;
            plugin.did_decode(content, settings).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SettingKind;

    /// Appends a marker per hook so the call order is visible in the output.
    struct Marker {
        encode_only: bool,
    }

    #[async_trait(?Send)]
    impl EncoderPlugin for Marker {
        fn name(&self) -> &str {
            "marker"
        }

        fn title(&self) -> &str {
            "Marker"
        }

        fn settings(&self) -> Vec<Setting> {
            vec![
                Setting::new("limit", SettingKind::integer(Some(0), Some(10)), 5),
                Setting::new("padding", SettingKind::integer(Some(0), Some(4)), 0).hidden(),
            ]
        }

        fn encode_only(&self) -> bool {
            self.encode_only
        }

        async fn will_encode(&self, content: Chain, _: &SettingValues) -> BrickResult<Chain> {
            Ok(content.concat(&Chain::from("<"))?)
        }

        async fn perform_encode(&self, content: Chain, _: &SettingValues) -> BrickResult<Chain> {
            Ok(content.concat(&Chain::from("E"))?)
        }

        async fn did_encode(&self, content: Chain, _: &SettingValues) -> BrickResult<Chain> {
            Ok(content.concat(&Chain::from(">"))?)
        }

        async fn perform_decode(&self, content: Chain, _: &SettingValues) -> BrickResult<Chain> {
            Ok(content.concat(&Chain::from("D"))?)
        }
    }

    fn marker() -> Rc<Encoder> {
        Encoder::new(Marker { encode_only: false }).unwrap()
    }

    #[tokio::test]
    async fn test_hook_order() {
        let encoder = marker();
        assert_eq!(encoder.encode("x").await.unwrap(), Chain::from("x<E>"));
        assert_eq!(encoder.decode("x").await.unwrap(), Chain::from("xD"));
    }

    #[tokio::test]
    async fn test_reverse_swaps_direction() {
        let encoder = marker();
        encoder.set_reversed(true).unwrap();
        assert_eq!(encoder.encode("x").await.unwrap(), Chain::from("xD"));

        let record = encoder.last_translation().unwrap();
        assert!(!record.is_encode);
        assert_eq!(record.char_count, Some(2));
        assert_eq!(record.byte_count, Some(2));
    }

    #[tokio::test]
    async fn test_encode_only_rejects_decode() {
        let encoder = Encoder::new(Marker { encode_only: true }).unwrap();
        let err = encoder.decode("x").await.unwrap_err();
        assert!(matches!(err, BrickError::InvalidInput(_)));
        assert_eq!(encoder.core().last_error(), Some(err));
    }

    #[tokio::test]
    async fn test_invalid_settings_listed() {
        let encoder = marker();
        let brick = Brick::Encoder(encoder.clone());
        assert!(!brick.set_setting_value("limit", 99).unwrap());

        let err = encoder.encode("x").await.unwrap_err();
        assert_eq!(
            err,
            BrickError::invalid_input("The following settings are invalid: limit")
        );

        brick.set_setting_value("limit", 3).unwrap();
        assert!(encoder.encode("x").await.is_ok());
        assert!(encoder.core().last_error().is_none());
    }

    #[tokio::test]
    async fn test_hidden_invalid_setting_does_not_block() {
        let encoder = marker();
        let brick = Brick::Encoder(encoder.clone());
        assert!(!brick.set_setting_value("padding", 9).unwrap());
        assert!(brick.settings_valid());
        assert_eq!(encoder.encode("x").await.unwrap(), Chain::from("x<E>"));

        encoder
            .core()
            .settings
            .borrow_mut()
            .set_visible("padding", true)
            .unwrap();
        let err = encoder.encode("x").await.unwrap_err();
        assert_eq!(
            err,
            BrickError::invalid_input("The following settings are invalid: padding")
        );
    }

    #[tokio::test]
    async fn test_encoding_errors_become_invalid_input() {
        let encoder = marker();
        let err = encoder.encode(vec![0xffu8, 0xfe]).await.unwrap_err();
        assert!(err.is_recoverable());
    }
}
