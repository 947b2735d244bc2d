//! Built-in bricks.

mod affine;
mod alphabet;
mod base64_codec;
mod caesar;
mod text;
mod vigenere;

pub use affine::AffineCipher;
pub use alphabet::{Alphabet, DEFAULT_ALPHABET};
pub use base64_codec::Base64Codec;
pub use caesar::CaesarCipher;
pub use text::TextViewer;
pub use vigenere::VigenereCipher;

use crate::pipe::brick::{Brick, BrickKind};
use crate::pipe::encoder::Encoder;
use crate::pipe::registry::{BrickCategory, BrickDescriptor};
use crate::pipe::viewer::Viewer;

/// Descriptors for every built-in brick, in listing order.
pub fn builtin_descriptors() -> Vec<BrickDescriptor> {
    vec![
        BrickDescriptor::new("text", "Text", BrickCategory::View, BrickKind::Viewer, || {
            Ok(Brick::Viewer(Viewer::new(TextViewer)?))
        }),
        BrickDescriptor::new(
            "base64",
            "Base64",
            BrickCategory::Encoding,
            BrickKind::Encoder,
            || Ok(Brick::Encoder(Encoder::new(Base64Codec)?)),
        ),
        BrickDescriptor::new(
            "caesar-cipher",
            "Caesar cipher",
            BrickCategory::Ciphers,
            BrickKind::Encoder,
            || Ok(Brick::Encoder(Encoder::new(CaesarCipher)?)),
        ),
        BrickDescriptor::new(
            "affine-cipher",
            "Affine cipher",
            BrickCategory::Ciphers,
            BrickKind::Encoder,
            || Ok(Brick::Encoder(Encoder::new(AffineCipher)?)),
        ),
        BrickDescriptor::new(
            "vigenere-cipher",
            "Vigenère cipher",
            BrickCategory::Ciphers,
            BrickKind::Encoder,
            || Ok(Brick::Encoder(Encoder::new(VigenereCipher)?)),
        ),
    ]
}
