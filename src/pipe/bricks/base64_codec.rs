use crate::chain::Chain;
use crate::pipe::encoder::EncoderPlugin;
use crate::pipe::error::{BrickError, BrickResult};
use crate::settings::{Setting, SettingKind, SettingValues};
use async_trait::async_trait;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;

/// Bytes <-> base64 text.
pub struct Base64Codec;

const VARIANTS: [&str; 2] = ["standard", "url-safe"];

fn engine(settings: &SettingValues) -> BrickResult<GeneralPurpose> {
    let variant = settings
        .enum_value("variant")
        .ok_or_else(|| BrickError::missing_setting("variant"))?;
    let padding = settings.boolean("padding").unwrap_or(true);
    let letters = match variant {
        "url-safe" => &alphabet::URL_SAFE,
        _ => &alphabet::STANDARD,
    };
    let config = GeneralPurposeConfig::new()
        .with_encode_padding(padding)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent);
    Ok(GeneralPurpose::new(letters, config))
}

#[async_trait(?Send)]
impl EncoderPlugin for Base64Codec {
    fn name(&self) -> &str {
        "base64"
    }

    fn title(&self) -> &str {
        "Base64"
    }

    fn settings(&self) -> Vec<Setting> {
        vec![
            Setting::new("variant", SettingKind::enumeration(VARIANTS), "standard"),
            Setting::new("padding", SettingKind::Boolean, true),
        ]
    }

    async fn perform_encode(&self, content: Chain, settings: &SettingValues) -> BrickResult<Chain> {
        let engine = engine(settings)?;
        Ok(Chain::from(engine.encode(content.bytes()?)))
    }

    async fn perform_decode(&self, content: Chain, settings: &SettingValues) -> BrickResult<Chain> {
        let engine = engine(settings)?;
        let text: String = content.string()?.split_whitespace().collect();
        let bytes = engine
            .decode(text)
            .map_err(|e| BrickError::invalid_input(format!("Input is not valid base64: {}", e)))?;
        Ok(Chain::from_bytes_with_encoding(bytes, content.encoding()))
    }
}
