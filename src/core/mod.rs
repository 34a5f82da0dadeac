pub mod errors;
pub mod filename_parser;
pub mod http;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod settings;
pub mod tasks;
pub mod utils;

pub use errors::{
    LookupError,
    LookupErrorKind,
    TuneDeckError,
};
pub use models::{
    AudioAsset,
    OrganizedFile,
    TuneRecord,
};
pub use progress::{
    ProgressCallback,
    ProgressLog,
};
