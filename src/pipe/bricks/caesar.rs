use crate::chain::Chain;
use crate::pipe::bricks::alphabet::{modulo, Alphabet, DEFAULT_ALPHABET};
use crate::pipe::encoder::EncoderPlugin;
use crate::pipe::error::{BrickError, BrickResult};
use crate::settings::{Setting, SettingKind, SettingValues};
use async_trait::async_trait;

/// Shifts every alphabet letter by a fixed amount.
pub struct CaesarCipher;

impl CaesarCipher {
    fn shift(&self, content: Chain, settings: &SettingValues, sign: i64) -> BrickResult<Chain> {
        let shift = settings
            .integer("shift")
            .ok_or_else(|| BrickError::missing_setting("shift"))?;
        let alphabet = settings
            .text("alphabet")
            .ok_or_else(|| BrickError::missing_setting("alphabet"))?;
        let case_sensitive = settings.boolean("case-sensitivity").unwrap_or(false);

        let alphabet = Alphabet::new(alphabet, case_sensitive)?;
        let m = alphabet.len();
        alphabet.translate(&content, |i| modulo(i as i64 + sign * shift, m))
    }
}

#[async_trait(?Send)]
impl EncoderPlugin for CaesarCipher {
    fn name(&self) -> &str {
        "caesar-cipher"
    }

    fn title(&self) -> &str {
        "Caesar cipher"
    }

    fn settings(&self) -> Vec<Setting> {
        vec![
            Setting::new("shift", SettingKind::integer(Some(-100), Some(100)), 7),
            Setting::new("alphabet", SettingKind::alphabet(), DEFAULT_ALPHABET)
                .with_randomizable(false),
            Setting::new("case-sensitivity", SettingKind::Boolean, false)
                .with_randomizable(false),
        ]
    }

    async fn perform_encode(&self, content: Chain, settings: &SettingValues) -> BrickResult<Chain> {
        self.shift(content, settings, 1)
    }

    async fn perform_decode(&self, content: Chain, settings: &SettingValues) -> BrickResult<Chain> {
        self.shift(content, settings, -1)
    }
}
