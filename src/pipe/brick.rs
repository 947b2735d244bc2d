//! Brick abstraction for the pipe.
//!
//! Two-layer design, like encoders and viewers themselves:
//! - **Plugin traits** ([`EncoderPlugin`], [`ViewerPlugin`]) hold the
//!   brick-specific behaviour: hooks, settings definitions, dependent
//!   revalidation.
//! - **[`Encoder`] / [`Viewer`]** wrap a plugin with the state every brick of
//!   that variant shares (settings, title, last translation, presenter).
//!
//! [`Brick`] wraps either variant so the pipe can handle both uniformly.
//! Cloning a `Brick` clones the handle; identity is pointer identity.
//!
//! [`EncoderPlugin`]: crate::pipe::encoder::EncoderPlugin
//! [`ViewerPlugin`]: crate::pipe::viewer::ViewerPlugin

use crate::pipe::encoder::Encoder;
use crate::pipe::engine::{Pipe, PipeShared};
use crate::pipe::error::{BrickError, PipeError, PipeResult};
use crate::pipe::spec::BrickSpec;
use crate::pipe::viewer::Viewer;
use crate::settings::{Setting, SettingValue, SettingsCollection};
use rand::Rng;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// State shared by both brick variants.
pub struct BrickCore {
    name: String,
    default_title: String,
    title: RefCell<Option<String>>,
    hidden: Cell<bool>,
    pub(crate) settings: RefCell<SettingsCollection>,
    pub(crate) last_error: RefCell<Option<BrickError>>,
    pipe: RefCell<Weak<PipeShared>>,
}

impl BrickCore {
    pub(crate) fn new(
        name: impl Into<String>,
        default_title: impl Into<String>,
        settings: SettingsCollection,
    ) -> Self {
        Self {
            name: name.into(),
            default_title: default_title.into(),
            title: RefCell::new(None),
            hidden: Cell::new(false),
            settings: RefCell::new(settings),
            last_error: RefCell::new(None),
            pipe: RefCell::new(Weak::new()),
        }
    }

    pub(crate) fn attach(&self, pipe: Weak<PipeShared>) {
        *self.pipe.borrow_mut() = pipe;
    }

    pub(crate) fn detach(&self) {
        *self.pipe.borrow_mut() = Weak::new();
    }

    pub(crate) fn is_attached(&self) -> bool {
        self.pipe.borrow().strong_count() > 0
    }

    pub(crate) fn pipe(&self) -> Option<Pipe> {
        self.pipe.borrow().upgrade().map(Pipe::from_shared)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> String {
        self.title
            .borrow()
            .clone()
            .unwrap_or_else(|| self.default_title.clone())
    }

    pub fn title_override(&self) -> Option<String> {
        self.title.borrow().clone()
    }

    pub fn set_title(&self, title: Option<String>) {
        *self.title.borrow_mut() = title;
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden.get()
    }

    pub fn set_hidden(&self, hidden: bool) {
        self.hidden.set(hidden);
    }

    pub fn last_error(&self) -> Option<BrickError> {
        self.last_error.borrow().clone()
    }

    /// Fail with `InvalidInput` naming every invalid visible setting.
    pub(crate) fn check_settings(&self) -> Result<crate::settings::SettingValues, BrickError> {
        let settings = self.settings.borrow();
        let invalid = settings.invalid_names();
        if !invalid.is_empty() {
            return Err(BrickError::invalid_input(format!(
                "The following settings are invalid: {}",
                invalid.join(", ")
            )));
        }
        Ok(settings.snapshot())
    }
}

/// Which variant a brick is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrickKind {
    Encoder,
    Viewer,
}

/// Handle to a pipeline stage.
#[derive(Clone)]
pub enum Brick {
    Encoder(Rc<Encoder>),
    Viewer(Rc<Viewer>),
}

/// Input accepted by structural edits: a live brick or a serialized one to materialize.
#[derive(Debug, Clone)]
pub enum BrickInput {
    Brick(Brick),
    Spec(BrickSpec),
}

impl From<Brick> for BrickInput {
    fn from(brick: Brick) -> Self {
        BrickInput::Brick(brick)
    }
}

impl From<BrickSpec> for BrickInput {
    fn from(spec: BrickSpec) -> Self {
        BrickInput::Spec(spec)
    }
}

impl From<Rc<Encoder>> for Brick {
    fn from(encoder: Rc<Encoder>) -> Self {
        Brick::Encoder(encoder)
    }
}

impl From<Rc<Viewer>> for Brick {
    fn from(viewer: Rc<Viewer>) -> Self {
        Brick::Viewer(viewer)
    }
}

impl Brick {
    pub fn core(&self) -> &BrickCore {
        match self {
            Brick::Encoder(e) => e.core(),
            Brick::Viewer(v) => v.core(),
        }
    }

    pub fn kind(&self) -> BrickKind {
        match self {
            Brick::Encoder(_) => BrickKind::Encoder,
            Brick::Viewer(_) => BrickKind::Viewer,
        }
    }

    pub fn is_encoder(&self) -> bool {
        matches!(self, Brick::Encoder(_))
    }

    pub fn is_viewer(&self) -> bool {
        matches!(self, Brick::Viewer(_))
    }

    pub fn as_encoder(&self) -> Option<&Rc<Encoder>> {
        match self {
            Brick::Encoder(e) => Some(e),
            Brick::Viewer(_) => None,
        }
    }

    pub fn as_viewer(&self) -> Option<&Rc<Viewer>> {
        match self {
            Brick::Viewer(v) => Some(v),
            Brick::Encoder(_) => None,
        }
    }

    /// Same brick instance.
    pub fn ptr_eq(&self, other: &Brick) -> bool {
        match (self, other) {
            (Brick::Encoder(a), Brick::Encoder(b)) => Rc::ptr_eq(a, b),
            (Brick::Viewer(a), Brick::Viewer(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn name(&self) -> &str {
        self.core().name()
    }

    pub fn title(&self) -> String {
        self.core().title()
    }

    pub fn set_title(&self, title: Option<String>) {
        self.core().set_title(title);
    }

    pub fn is_hidden(&self) -> bool {
        self.core().is_hidden()
    }

    pub fn set_hidden(&self, hidden: bool) {
        self.core().set_hidden(hidden);
    }

    pub fn last_error(&self) -> Option<BrickError> {
        self.core().last_error()
    }

    /// Owning pipe, if attached.
    pub fn pipe(&self) -> Option<Pipe> {
        self.core().pipe()
    }

    pub fn setting_value(&self, name: &str) -> Option<SettingValue> {
        self.core().settings.borrow().value(name).cloned()
    }

    pub fn settings_valid(&self) -> bool {
        self.core().settings.borrow().is_valid()
    }

    /// Read access to the settings collection, for form adapters.
    pub fn with_settings<R>(&self, f: impl FnOnce(&SettingsCollection) -> R) -> R {
        f(&self.core().settings.borrow())
    }

    /// Change a setting and let the owning pipe re-run this brick.
    ///
    /// Returns whether the setting is valid afterwards. Invalid values are
    /// stored as well; the next translation then fails with `InvalidInput`.
    pub fn set_setting_value(
        &self,
        name: &str,
        value: impl Into<SettingValue>,
    ) -> PipeResult<bool> {
        let valid = {
            let mut settings = self.core().settings.borrow_mut();
            settings.set_value(name, value)?;
            self.revalidate(&mut settings);
            settings.get(name).is_some_and(Setting::is_valid)
        };
        if let Some(pipe) = self.pipe() {
            pipe.brick_setting_did_change(self)?;
        }
        Ok(valid)
    }

    /// Randomize every randomizable setting; returns the changed names.
    pub fn randomize_settings<R: Rng + ?Sized>(&self, rng: &mut R) -> PipeResult<Vec<String>> {
        let changed = {
            let mut settings = self.core().settings.borrow_mut();
            let changed = settings.randomize(rng);
            self.revalidate(&mut settings);
            changed
        };
        if !changed.is_empty() {
            if let Some(pipe) = self.pipe() {
                pipe.brick_setting_did_change(self)?;
            }
        }
        Ok(changed)
    }

    fn revalidate(&self, settings: &mut SettingsCollection) {
        match self {
            Brick::Encoder(e) => e.plugin().revalidate(settings),
            Brick::Viewer(v) => v.plugin().revalidate(settings),
        }
    }

    /// Apply persisted title, flags and settings. Used before the brick joins a pipe.
    pub fn apply_spec(&self, spec: &BrickSpec) -> PipeResult<()> {
        if spec.name != self.name() {
            return Err(PipeError::MalformedSpec(format!(
                "spec for '{}' applied to brick '{}'",
                spec.name,
                self.name()
            )));
        }
        if let Some(reverse) = spec.reverse {
            match self {
                Brick::Encoder(e) => e.set_reversed_flag(reverse),
                Brick::Viewer(_) => {
                    return Err(PipeError::MalformedSpec(format!(
                        "'reverse' is only valid on encoders, '{}' is a viewer",
                        spec.name
                    )))
                }
            }
        }
        if let Some(title) = &spec.title {
            self.set_title(Some(title.clone()));
        }
        if let Some(hidden) = spec.hidden {
            self.set_hidden(hidden);
        }
        if let Some(values) = &spec.settings {
            let mut settings = self.core().settings.borrow_mut();
            for (name, json) in values {
                let setting = settings.get_mut(name).ok_or_else(|| {
                    PipeError::MalformedSpec(format!(
                        "brick '{}' has no setting '{}'",
                        spec.name, name
                    ))
                })?;
                let value = setting.kind().value_from_json(json).map_err(|e| {
                    PipeError::MalformedSpec(format!(
                        "setting '{}' of '{}': {}",
                        name, spec.name, e
                    ))
                })?;
                setting.set_value(value);
            }
            self.revalidate(&mut settings);
            let invalid = settings.invalid_names();
            if !invalid.is_empty() {
                return Err(PipeError::MalformedSpec(format!(
                    "brick '{}' has invalid settings: {}",
                    spec.name,
                    invalid.join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Persisted form. Fails if any visible setting is currently invalid.
    pub fn serialize(&self) -> PipeResult<BrickSpec> {
        let settings = self.core().settings.borrow();
        let invalid = settings.invalid_names();
        if !invalid.is_empty() {
            return Err(PipeError::InvalidBrick {
                name: self.name().to_owned(),
                settings: invalid.join(", "),
            });
        }
        let values = settings.serialize()?;
        Ok(BrickSpec {
            name: self.name().to_owned(),
            title: self.core().title_override(),
            hidden: self.is_hidden().then_some(true),
            reverse: self
                .as_encoder()
                .and_then(|e| e.is_reversed().then_some(true)),
            settings: (!values.is_empty()).then_some(values),
        })
    }
}

impl fmt::Debug for Brick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Brick")
            .field("kind", &self.kind())
            .field("name", &self.name())
            .field("attached", &self.core().is_attached())
            .finish()
    }
}
