use crate::chain::Chain;
use crate::pipe::bricks::alphabet::{modulo, Alphabet, DEFAULT_ALPHABET};
use crate::pipe::encoder::EncoderPlugin;
use crate::pipe::error::{BrickError, BrickResult};
use crate::settings::{Setting, SettingKind, SettingValues, SettingsCollection};
use async_trait::async_trait;

/// Maps letter `x` to `a * x + b` modulo the alphabet length.
pub struct AffineCipher;

struct Params {
    a: i64,
    b: i64,
    alphabet: Alphabet,
}

impl AffineCipher {
    fn params(&self, settings: &SettingValues) -> BrickResult<Params> {
        let a = settings
            .integer("a")
            .ok_or_else(|| BrickError::missing_setting("a"))?;
        let b = settings
            .integer("b")
            .ok_or_else(|| BrickError::missing_setting("b"))?;
        let alphabet = settings
            .text("alphabet")
            .ok_or_else(|| BrickError::missing_setting("alphabet"))?;
        let case_sensitive = settings.boolean("case-sensitivity").unwrap_or(false);
        Ok(Params {
            a,
            b,
            alphabet: Alphabet::new(alphabet, case_sensitive)?,
        })
    }
}

fn gcd(mut a: i64, mut b: i64) -> i64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.abs()
}

/// Inverse of `a` modulo `m`, if it exists.
fn mod_inverse(a: i64, m: i64) -> Option<i64> {
    let (mut old_r, mut r) = (a.rem_euclid(m), m);
    let (mut old_s, mut s) = (1i64, 0i64);
    while r != 0 {
        let q = old_r / r;
        (old_r, r) = (r, old_r - q * r);
        (old_s, s) = (s, old_s - q * s);
    }
    (old_r == 1).then(|| old_s.rem_euclid(m))
}

#[async_trait(?Send)]
impl EncoderPlugin for AffineCipher {
    fn name(&self) -> &str {
        "affine-cipher"
    }

    fn title(&self) -> &str {
        "Affine cipher"
    }

    fn settings(&self) -> Vec<Setting> {
        vec![
            Setting::new("a", SettingKind::integer(Some(1), Some(1000)), 5)
                .with_label("Slope / a"),
            Setting::new("b", SettingKind::integer(Some(0), Some(1000)), 8)
                .with_label("Intercept / b"),
            Setting::new("alphabet", SettingKind::alphabet(), DEFAULT_ALPHABET)
                .with_randomizable(false),
            Setting::new("case-sensitivity", SettingKind::Boolean, false)
                .with_randomizable(false),
        ]
    }

    /// `a` must be coprime with the alphabet length or decoding is impossible.
    fn revalidate(&self, settings: &mut SettingsCollection) {
        let a = settings.value("a").and_then(|v| v.as_integer());
        let case_sensitive = settings
            .value("case-sensitivity")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let length = settings
            .value("alphabet")
            .and_then(|v| v.as_text())
            .and_then(|alphabet| Alphabet::new(alphabet, case_sensitive).ok())
            .map(|alphabet| alphabet.len() as i64);

        let error = match (a, length) {
            (Some(a), Some(m)) if gcd(a, m) != 1 => Some(format!(
                "Must be coprime with the alphabet length ({})",
                m
            )),
            _ => None,
        };
        if let Err(e) = settings.set_external_error("a", error) {
            tracing::warn!(brick = self.name(), error = %e, "cannot revalidate settings");
        }
    }

    async fn perform_encode(&self, content: Chain, settings: &SettingValues) -> BrickResult<Chain> {
        let Params { a, b, alphabet } = self.params(settings)?;
        let m = alphabet.len();
        alphabet.translate(&content, |x| modulo(a * x as i64 + b, m))
    }

    async fn perform_decode(&self, content: Chain, settings: &SettingValues) -> BrickResult<Chain> {
        let Params { a, b, alphabet } = self.params(settings)?;
        let m = alphabet.len();
        let inverse = mod_inverse(a, m as i64).ok_or_else(|| {
            BrickError::invalid_input(format!("{} has no inverse modulo {}", a, m))
        })?;
        alphabet.translate(&content, |y| modulo(inverse * (y as i64 - b), m))
    }
}
