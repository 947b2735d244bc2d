//! Test data builders for creating pipes

use brickpipe::pipe::{Brick, BrickInput, BrickSpec, Pipe, PipeContext};
use serde_json::json;

/// Builder for pipes made of registry bricks
pub struct PipeBuilder {
    context: PipeContext,
    items: Vec<BrickInput>,
    content: Option<(String, usize)>,
}

impl PipeBuilder {
    pub fn new() -> Self {
        Self {
            context: PipeContext::with_builtins().with_seed(7),
            items: Vec::new(),
            content: None,
        }
    }

    pub fn context(mut self, context: PipeContext) -> Self {
        self.context = context;
        self
    }

    pub fn text(self) -> Self {
        self.spec(BrickSpec::new("text"))
    }

    pub fn caesar(self, shift: i64) -> Self {
        self.spec(caesar_spec(shift))
    }

    pub fn affine(self, a: i64, b: i64) -> Self {
        self.spec(affine_spec(a, b))
    }

    pub fn vigenere(self, key: &str) -> Self {
        self.spec(vigenere_spec(key))
    }

    pub fn spec(mut self, spec: BrickSpec) -> Self {
        self.items.push(spec.into());
        self
    }

    pub fn brick(mut self, brick: Brick) -> Self {
        self.items.push(brick.into());
        self
    }

    /// Content written into `bucket` once the bricks are in place.
    pub fn content(mut self, text: &str, bucket: usize) -> Self {
        self.content = Some((text.to_string(), bucket));
        self
    }

    /// Must run inside a `LocalSet`.
    pub fn build(self) -> Pipe {
        let pipe = Pipe::new(self.context);
        pipe.append_bricks(self.items).expect("bricks should be valid");
        if let Some((text, bucket)) = self.content {
            pipe.set_content(text, bucket, None)
                .expect("content bucket should exist");
        }
        pipe
    }
}

impl Default for PipeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn caesar_spec(shift: i64) -> BrickSpec {
    BrickSpec::new("caesar-cipher").with_setting("shift", json!(shift))
}

pub fn affine_spec(a: i64, b: i64) -> BrickSpec {
    BrickSpec::new("affine-cipher")
        .with_setting("a", json!(a))
        .with_setting("b", json!(b))
}

pub fn vigenere_spec(key: &str) -> BrickSpec {
    BrickSpec::new("vigenere-cipher").with_setting("key", json!(key))
}
