//! Brick settings.
//!
//! Every setting is a named, typed value with its own validity. Kinds are a
//! closed set of tagged variants ([`SettingKind`]) that know how to filter,
//! validate and randomize their values; bricks express cross-setting rules
//! (an affine multiplier that must be coprime with the alphabet length, a key
//! that must only use alphabet letters) by setting an external error on the
//! dependent setting whenever the other one changes.
//!
//! The settings form widgets live outside this crate and only use the
//! get/set typed value + validity surface of [`SettingsCollection`].

mod kind;
mod value;

pub use kind::SettingKind;
pub use value::{SettingValue, SettingValues};

use rand::Rng;
use std::collections::BTreeMap;
use thiserror::Error;

/// Contract errors raised by a settings collection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Setting '{0}' is already defined")]
    Duplicate(String),

    #[error("Unknown setting '{0}'")]
    Unknown(String),

    #[error("Setting '{name}' cannot be serialized: {message}")]
    Serialization { name: String, message: String },
}

/// A single named, typed setting.
#[derive(Debug, Clone)]
pub struct Setting {
    name: String,
    label: String,
    kind: SettingKind,
    value: SettingValue,
    error: Option<String>,
    external_error: Option<String>,
    randomizable: bool,
    visible: bool,
}

impl Setting {
    /// Create a setting holding `default`. The default is filtered and
    /// validated like any other value.
    pub fn new(
        name: impl Into<String>,
        kind: SettingKind,
        default: impl Into<SettingValue>,
    ) -> Self {
        let name = name.into();
        let mut setting = Self {
            label: label_from_name(&name),
            name,
            kind,
            value: SettingValue::Boolean(false),
            error: None,
            external_error: None,
            randomizable: true,
            visible: true,
        };
        setting.set_value(default);
        setting
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_randomizable(mut self, randomizable: bool) -> Self {
        self.randomizable = randomizable;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> &SettingKind {
        &self.kind
    }

    pub fn value(&self) -> &SettingValue {
        &self.value
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn is_randomizable(&self) -> bool {
        self.randomizable
    }

    /// Filter, validate and store a value. Invalid values are stored too, so
    /// the form can keep showing what the user typed; returns validity.
    pub fn set_value(&mut self, value: impl Into<SettingValue>) -> bool {
        let value = self.kind.filter(value.into());
        self.error = self.kind.validate(&value).err();
        self.value = value;
        self.is_valid()
    }

    /// Mark the setting invalid (or valid again) because of another setting.
    pub fn set_external_error(&mut self, error: Option<String>) {
        self.external_error = error;
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none() && self.external_error.is_none()
    }

    /// Why the setting is invalid, own validation first.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref().or(self.external_error.as_deref())
    }

    /// Replace the value with a random valid one. Returns false when the kind cannot be randomized.
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        if !self.randomizable {
            return false;
        }
        match self.kind.randomize(rng) {
            Some(value) => {
                self.set_value(value);
                true
            }
            None => false,
        }
    }
}

/// "case-sensitivity" -> "Case sensitivity"
fn label_from_name(name: &str) -> String {
    let spaced = name.replace(['-', '_'], " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Ordered collection of a brick's settings.
#[derive(Debug, Clone, Default)]
pub struct SettingsCollection {
    settings: Vec<Setting>,
}

impl SettingsCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection, rejecting duplicate names.
    pub fn from_settings(
        settings: impl IntoIterator<Item = Setting>,
    ) -> Result<Self, SettingsError> {
        let mut collection = Self::new();
        for setting in settings {
            collection.add(setting)?;
        }
        Ok(collection)
    }

    pub fn add(&mut self, setting: Setting) -> Result<(), SettingsError> {
        if self.get(setting.name()).is_some() {
            return Err(SettingsError::Duplicate(setting.name().to_owned()));
        }
        self.settings.push(setting);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Setting> {
        self.settings.iter().find(|s| s.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Setting> {
        self.settings.iter_mut().find(|s| s.name == name)
    }

    pub fn value(&self, name: &str) -> Option<&SettingValue> {
        self.get(name).map(Setting::value)
    }

    /// Set a value by name. Returns the setting's validity afterwards.
    pub fn set_value(
        &mut self,
        name: &str,
        value: impl Into<SettingValue>,
    ) -> Result<bool, SettingsError> {
        let setting = self
            .get_mut(name)
            .ok_or_else(|| SettingsError::Unknown(name.to_owned()))?;
        Ok(setting.set_value(value))
    }

    pub fn set_external_error(
        &mut self,
        name: &str,
        error: Option<String>,
    ) -> Result<(), SettingsError> {
        let setting = self
            .get_mut(name)
            .ok_or_else(|| SettingsError::Unknown(name.to_owned()))?;
        setting.set_external_error(error);
        Ok(())
    }

    /// Show or hide a setting. Hidden settings are not currently relevant.
    pub fn set_visible(&mut self, name: &str, visible: bool) -> Result<(), SettingsError> {
        let setting = self
            .get_mut(name)
            .ok_or_else(|| SettingsError::Unknown(name.to_owned()))?;
        setting.set_visible(visible);
        Ok(())
    }

    /// Validity of the visible settings; hidden ones are ignored.
    pub fn is_valid(&self) -> bool {
        self.settings
            .iter()
            .filter(|s| s.is_visible())
            .all(Setting::is_valid)
    }

    /// Names of visible settings holding an invalid value.
    pub fn invalid_names(&self) -> Vec<&str> {
        self.settings
            .iter()
            .filter(|s| s.is_visible() && !s.is_valid())
            .map(Setting::name)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Setting> {
        self.settings.iter()
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    pub fn snapshot(&self) -> SettingValues {
        let mut values = SettingValues::new();
        for setting in &self.settings {
            values.insert(setting.name.clone(), setting.value.clone());
        }
        values
    }

    /// Randomize every randomizable setting; returns the names that changed.
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<String> {
        self.settings
            .iter_mut()
            .filter_map(|s| s.randomize(rng).then(|| s.name.clone()))
            .collect()
    }

    /// JSON form of all values, keyed by name.
    pub fn serialize(&self) -> Result<BTreeMap<String, serde_json::Value>, SettingsError> {
        self.settings
            .iter()
            .map(|s| {
                s.value
                    .to_json()
                    .map(|json| (s.name.clone(), json))
                    .map_err(|message| SettingsError::Serialization {
                        name: s.name.clone(),
                        message,
                    })
            })
            .collect()
    }
}
