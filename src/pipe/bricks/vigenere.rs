use crate::chain::Chain;
use crate::pipe::bricks::alphabet::{modulo, Alphabet, DEFAULT_ALPHABET};
use crate::pipe::encoder::EncoderPlugin;
use crate::pipe::error::{BrickError, BrickResult};
use crate::settings::{Setting, SettingKind, SettingValues, SettingsCollection};
use async_trait::async_trait;

/// Polyalphabetic shift driven by a repeating key.
///
/// The key only advances on alphabet letters, so spaces and punctuation do
/// not consume key letters.
pub struct VigenereCipher;

impl VigenereCipher {
    fn shift(&self, content: Chain, settings: &SettingValues, sign: i64) -> BrickResult<Chain> {
        let key = settings
            .text("key")
            .ok_or_else(|| BrickError::missing_setting("key"))?;
        let alphabet = settings
            .text("alphabet")
            .ok_or_else(|| BrickError::missing_setting("alphabet"))?;
        let case_sensitive = settings.boolean("case-sensitivity").unwrap_or(false);
        let alphabet = Alphabet::new(alphabet, case_sensitive)?;
        let shifts = key_shifts(key, &alphabet)?;

        let m = alphabet.len();
        let mut position = 0;
        alphabet.translate(&content, |i| {
            let shift = shifts[position % shifts.len()];
            position += 1;
            modulo(i as i64 + sign * shift as i64, m)
        })
    }
}

/// Alphabet index of every key letter.
fn key_shifts(key: &Chain, alphabet: &Alphabet) -> BrickResult<Vec<usize>> {
    let key = key.string()?;
    if key.is_empty() {
        return Err(BrickError::invalid_input("The key must not be empty"));
    }
    key.chars()
        .map(|c| {
            alphabet.index_of(c).ok_or_else(|| {
                BrickError::invalid_input(format!("Key letter '{}' is not part of the alphabet", c))
            })
        })
        .collect()
}

#[async_trait(?Send)]
impl EncoderPlugin for VigenereCipher {
    fn name(&self) -> &str {
        "vigenere-cipher"
    }

    fn title(&self) -> &str {
        "Vigenère cipher"
    }

    fn settings(&self) -> Vec<Setting> {
        let key_kind = SettingKind::Text {
            min_length: 1,
            max_length: Some(64),
            allowed: None,
            case_sensitive: true,
            unique: false,
        };
        vec![
            Setting::new("key", key_kind, "key"),
            Setting::new("alphabet", SettingKind::alphabet(), DEFAULT_ALPHABET)
                .with_randomizable(false),
            Setting::new("case-sensitivity", SettingKind::Boolean, false)
                .with_randomizable(false),
        ]
    }

    /// Key letters must come from the alphabet.
    fn revalidate(&self, settings: &mut SettingsCollection) {
        let case_sensitive = settings
            .value("case-sensitivity")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let alphabet = settings
            .value("alphabet")
            .and_then(|v| v.as_text())
            .and_then(|alphabet| Alphabet::new(alphabet, case_sensitive).ok());
        let error = match (settings.value("key").and_then(|v| v.as_text()), alphabet) {
            (Some(key), Some(alphabet)) => key_shifts(key, &alphabet).err().map(|e| match e {
                BrickError::InvalidInput(message) => message,
                other => other.to_string(),
            }),
            _ => None,
        };
        if let Err(e) = settings.set_external_error("key", error) {
            tracing::warn!(brick = self.name(), error = %e, "cannot revalidate settings");
        }
    }

    async fn perform_encode(&self, content: Chain, settings: &SettingValues) -> BrickResult<Chain> {
        self.shift(content, settings, 1)
    }

    async fn perform_decode(&self, content: Chain, settings: &SettingValues) -> BrickResult<Chain> {
        self.shift(content, settings, -1)
    }
}
