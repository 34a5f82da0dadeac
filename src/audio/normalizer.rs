use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

use tracing::{
    debug,
    warn,
};
use walkdir::WalkDir;

use super::AudioEncoder;
use crate::core::{
    filename_parser::CANONICAL_EXTENSION,
    AudioAsset,
    ProgressLog,
    TuneDeckError,
};

/// Extensions converted to mp3. The canonical extension itself is copied.
pub const CONVERTIBLE_EXTENSIONS: &[&str] = &["m4a", "wav", "flac", "aac", "ogg", "mp4", "webm"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub converted: usize,
    pub copied: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl NormalizeReport {
    pub fn success(&self) -> bool {
        self.converted + self.copied > 0
    }

    pub fn total(&self) -> usize {
        self.converted + self.copied + self.skipped + self.failed
    }
}

enum Action {
    Convert,
    Copy,
}

fn scan_audio(input_dir: &Path) -> Vec<(AudioAsset, Action)> {
    let mut files: Vec<PathBuf> = WalkDir::new(input_dir)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect();
    files.sort();

    files
        .into_iter()
        .filter_map(|path| {
            let asset = match AudioAsset::from_path(&path) {
                Ok(asset) => asset,
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    return None;
                }
            };

            if asset.extension == CANONICAL_EXTENSION {
                Some((asset, Action::Copy))
            } else if CONVERTIBLE_EXTENSIONS.contains(&asset.extension.as_str()) {
                Some((asset, Action::Convert))
            } else {
                None
            }
        })
        .collect()
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Converts or copies every recording under `input_dir` (recursively) into
/// `output_dir` as mp3.
///
/// Existing outputs are never overwritten, so re-running does no extra work.
/// Fails up front, before touching any file, when the input directory is
/// missing or when conversion is needed and the encoder is unavailable.
pub fn normalize(
    input_dir: &Path,
    output_dir: &Path,
    encoder: &dyn AudioEncoder,
    log: &ProgressLog,
) -> Result<NormalizeReport, TuneDeckError> {
    if !input_dir.is_dir() {
        return Err(TuneDeckError::MissingDirectory(input_dir.to_path_buf()));
    }

    let audio_files = scan_audio(input_dir);
    let mut report = NormalizeReport::default();

    if audio_files.is_empty() {
        log.line(format!("No audio files found in '{}'", input_dir.display()));
        return Ok(report);
    }

    let needs_encoder = audio_files.iter().any(|(_, action)| matches!(action, Action::Convert));
    if needs_encoder && !encoder.is_available() {
        return Err(TuneDeckError::EncoderUnavailable(encoder.name().to_string()));
    }

    fs::create_dir_all(output_dir)?;

    let total = audio_files.len();
    log.line(format!("Found {} audio files", total));
    log.line(format!("Normalizing to mp3 in '{}'...", output_dir.display()));

    for (idx, (asset, action)) in audio_files.iter().enumerate() {
        let file_name = asset.file_name();
        let destination = output_dir.join(format!("{}.{}", asset.stem, CANONICAL_EXTENSION));

        if destination.exists() || same_file(&asset.path, &destination) {
            log.line(format!("[{}/{}] Skipping (already exists): {}", idx + 1, total, file_name));
            report.skipped += 1;
            continue;
        }

        match action {
            Action::Convert => {
                log.line(format!("[{}/{}] Converting: {}", idx + 1, total, file_name));
                match encoder.encode(&asset.path, &destination) {
                    Ok(()) => {
                        log.line(format!("  ✓ Success: {}.{}", asset.stem, CANONICAL_EXTENSION));
                        report.converted += 1;
                    }
                    Err(e) => {
                        log.line(format!("  ✗ Failed: {}: {}", file_name, e));
                        if destination.exists() {
                            if let Err(e) = fs::remove_file(&destination) {
                                warn!("Could not remove partial output {}: {}", destination.display(), e);
                            }
                        }
                        report.failed += 1;
                    }
                }
            }
            Action::Copy => {
                log.line(format!("[{}/{}] Copying: {}", idx + 1, total, file_name));
                match fs::copy(&asset.path, &destination) {
                    Ok(bytes) => {
                        debug!("Copied {} bytes to {}", bytes, destination.display());
                        report.copied += 1;
                    }
                    Err(e) => {
                        log.line(format!("  ✗ Failed to copy {}: {}", file_name, e));
                        report.failed += 1;
                    }
                }
            }
        }
    }

    log.line("Normalization complete!");
    log.line(format!("  Converted: {}", report.converted));
    log.line(format!("  Copied: {}", report.copied));
    log.line(format!("  Skipped: {}", report.skipped));
    log.line(format!("  Failed: {}", report.failed));
    log.line(format!("MP3 files are in: {}", output_dir.display()));

    Ok(report)
}
