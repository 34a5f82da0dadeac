use std::path::PathBuf;

use serde::{
    Deserialize,
    Serialize,
};

use crate::anki::CardLayoutConfig;

pub const DEFAULT_MP3_DIR: &str = "mp3_files";
pub const DEFAULT_EXPORT_DIR: &str = "export";
pub const DEFAULT_OUTPUT_FILE: &str = "irish_music.apkg";
pub const DEFAULT_DECK_NAME: &str = "Irish Traditional Music";
pub const DEFAULT_ENCODER: &str = "ffmpeg";

/// Everything a full run needs besides the input directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub input_dir: Option<PathBuf>,
    pub mp3_dir: PathBuf,
    pub export_dir: PathBuf,
    pub output_file: PathBuf,
    pub deck_name: String,
    pub randomize: bool,
    pub encoder: String,
    pub layout: CardLayoutConfig,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            input_dir: None,
            mp3_dir: PathBuf::from(DEFAULT_MP3_DIR),
            export_dir: PathBuf::from(DEFAULT_EXPORT_DIR),
            output_file: PathBuf::from(DEFAULT_OUTPUT_FILE),
            deck_name: DEFAULT_DECK_NAME.to_string(),
            randomize: true,
            encoder: DEFAULT_ENCODER.to_string(),
            layout: CardLayoutConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_fill_defaults() {
        let settings: PipelineSettings =
            serde_json::from_str(r#"{"deck_name": "Reels", "layout": {"back": {"name": true}}}"#).unwrap();

        assert_eq!(settings.deck_name, "Reels");
        assert!(settings.randomize);
        assert_eq!(settings.mp3_dir, PathBuf::from("mp3_files"));
        assert!(settings.layout.front.audio);
        assert!(settings.layout.back.name && !settings.layout.back.key);
    }
}
