//! # brickpipe: interactive pipeline of reversible content transformations
//!
//! A pipe is an ordered list of bricks. Encoders (ciphers, codecs) translate
//! content in both directions between the buckets on either side of them;
//! viewers render a bucket. Editing any bucket, or any brick setting,
//! re-propagates content through the neighbouring encoders until the pipe
//! settles again.
//!
//! ## Architecture
//!
//! - **Chain**: immutable content viewable as text, code points or bytes
//! - **Settings**: typed, independently validated brick settings
//! - **Pipe**: the propagation engine, its bricks and their registry
//! - **Config**: TOML configuration in the platform config directory
//!
//! ## Example
//!
//! ```ignore
//! use brickpipe::pipe::{BrickSpec, Pipe, PipeContext};
//! use tokio::task::LocalSet;
//!
//! LocalSet::new().run_until(async {
//!     let pipe = Pipe::new(PipeContext::with_builtins());
//!     pipe.append_brick(BrickSpec::new("text"))?;
//!     pipe.append_brick(BrickSpec::new("caesar-cipher").with_setting("shift", 3.into()))?;
//!     pipe.append_brick(BrickSpec::new("text"))?;
//!
//!     pipe.set_content("hello", 0, None)?;
//!     assert_eq!(pipe.wait_for_content(1).await?.to_string(), "khoor");
//!     Ok::<_, brickpipe::pipe::PipeError>(())
//! }).await?;
//! ```

pub mod chain;
pub mod config;
pub mod error;
pub mod pipe;
pub mod settings;

// Re-export commonly used types
pub use chain::{Chain, ChainError, TextEncoding, TextEncodingError};
pub use config::AppConfig;
pub use error::{BrickpipeError, Result, ResultExt};
pub use pipe::{Brick, BrickSpec, Pipe, PipeContext, PipeError, PipeSpec};
pub use settings::{Setting, SettingKind, SettingValue, SettingsCollection};
