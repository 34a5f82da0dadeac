//! Format normalization: every recording becomes one canonical mp3 file.

pub mod encoder;
pub mod normalizer;

pub use encoder::{
    AudioEncoder,
    FfmpegEncoder,
};
pub use normalizer::{
    normalize,
    NormalizeReport,
    CONVERTIBLE_EXTENSIONS,
};
