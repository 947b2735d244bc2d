//! Brick registry for creating bricks by name.
//!
//! Persisted pipes refer to bricks by identifier (`caesar-cipher`). The
//! registry maps those identifiers to constructors and is resolved once, when
//! the [`PipeContext`](crate::pipe::PipeContext) is built.

use crate::pipe::brick::{Brick, BrickKind};
use crate::pipe::bricks;
use crate::pipe::error::{PipeError, PipeResult};
use crate::pipe::spec::BrickSpec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Grouping used when listing bricks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrickCategory {
    View,
    Encoding,
    Ciphers,
}

impl BrickCategory {
    pub fn display_name(&self) -> &'static str {
        match self {
            BrickCategory::View => "View",
            BrickCategory::Encoding => "Encoding",
            BrickCategory::Ciphers => "Ciphers",
        }
    }
}

impl fmt::Display for BrickCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

pub type BrickFactory = Box<dyn Fn() -> PipeResult<Brick>>;

pub struct BrickDescriptor {
    pub name: String,
    pub title: String,
    pub category: BrickCategory,
    pub kind: BrickKind,
    factory: BrickFactory,
}

impl BrickDescriptor {
    pub fn new(
        name: impl Into<String>,
        title: impl Into<String>,
        category: BrickCategory,
        kind: BrickKind,
        factory: impl Fn() -> PipeResult<Brick> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            category,
            kind,
            factory: Box::new(factory),
        }
    }
}

impl fmt::Debug for BrickDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrickDescriptor")
            .field("name", &self.name)
            .field("title", &self.title)
            .field("category", &self.category)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Ordered name -> constructor mapping.
#[derive(Debug, Default)]
pub struct BrickRegistry {
    descriptors: Vec<BrickDescriptor>,
}

impl BrickRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in brick.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for descriptor in bricks::builtin_descriptors() {
            if let Err(e) = registry.register(descriptor) {
                tracing::warn!(error = %e, "skipping built-in brick");
            }
        }
        registry
    }

    pub fn register(&mut self, descriptor: BrickDescriptor) -> PipeResult<()> {
        if self.get(&descriptor.name).is_some() {
            return Err(PipeError::DuplicateBrick(descriptor.name));
        }
        self.descriptors.push(descriptor);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&BrickDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn descriptors(&self) -> &[BrickDescriptor] {
        &self.descriptors
    }

    /// Fresh brick with default settings.
    pub fn create(&self, name: &str) -> PipeResult<Brick> {
        let descriptor = self
            .get(name)
            .ok_or_else(|| PipeError::UnknownBrick(name.to_owned()))?;
        (descriptor.factory)()
    }

    /// Fresh brick configured from its persisted form.
    pub fn materialize(&self, spec: &BrickSpec) -> PipeResult<Brick> {
        let brick = self.create(&spec.name)?;
        brick.apply_spec(spec)?;
        Ok(brick)
    }
}
