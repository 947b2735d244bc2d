//! Brick pipeline.
//!
//! Content flows through an ordered list of bricks. Encoders translate
//! between the two buckets around them in both directions; viewers render the
//! bucket they sit on.
//!
//! # Architecture
//!
//! ```text
//!  bucket 0        bucket 1        bucket 2
//! [Text] ──► [Caesar] ──► [Text] ──► [Base64] ──► [Text]
//!        ◄──          ◄──        ◄──          ◄──
//! ```
//!
//! # Design
//!
//! - **Single threaded** - bricks are `Rc` handles, tasks run on a `LocalSet`.
//! - **Edit focus** - the selected bucket decides which way content flows
//!   after structural edits and setting changes.
//! - **No lost edits** - a translation whose input changed while it ran is
//!   repeated with the new input.
//! - **Observer** - rendering adapters subscribe through [`BrickObserver`].

pub mod brick;
pub mod bricks;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod observer;
pub mod registry;
pub mod relocation;
pub mod spec;
pub mod viewer;

pub use brick::{Brick, BrickCore, BrickInput, BrickKind};
pub use encoder::{Encoder, EncoderPlugin, TranslationRecord};
pub use engine::{Pipe, PipeContext};
pub use error::{BrickError, BrickResult, PipeError, PipeResult};
pub use observer::{BrickEvent, BrickObserver, ChannelObserver, ObserverMessage};
pub use registry::{BrickCategory, BrickDescriptor, BrickRegistry};
pub use relocation::{relocate_selection, Propagation, Relocation, RelocationCase};
pub use spec::{BrickSpec, ContentEncoding, ContentSpec, PipeSpec};
pub use viewer::{ViewPresenter, Viewer, ViewerPlugin};
