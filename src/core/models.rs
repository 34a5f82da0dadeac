use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

use super::TuneDeckError;

/// A single audio file found by a directory scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioAsset {
    pub path: PathBuf,
    pub stem: String,      // File name without extension, used as the candidate title
    pub extension: String, // Lowercased, without the leading dot
    pub size: u64,
}

impl AudioAsset {
    pub fn from_path(path: &Path) -> Result<Self, TuneDeckError> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| TuneDeckError::Custom(format!("Invalid file name: {}", path.display())))?
            .to_string();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        let size = fs::metadata(path)?.len();

        Ok(Self { path: path.to_path_buf(), stem, extension, size })
    }

    pub fn file_name(&self) -> String {
        self.path.file_name().and_then(|n| n.to_str()).unwrap_or(&self.stem).to_string()
    }
}

/// Metadata resolved for one tune. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TuneRecord {
    pub title: String,
    pub rhythm: String,
    pub key: String, // Raw ABC key field, e.g. "Dmajor" or "Edor"
    pub source_url: String,
}

/// Where an asset ended up after organizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizedFile {
    pub category: String,
    pub file_name: String,
    pub source: PathBuf,
}

impl OrganizedFile {
    pub fn relative_path(&self) -> PathBuf {
        Path::new(&self.category).join(&self.file_name)
    }
}
