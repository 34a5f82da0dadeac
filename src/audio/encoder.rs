//! External encoder invocation.
//!
//! The encoder runs as a blocking child process; the calling stage waits for it
//! to exit and there is no timeout.

use std::{
    path::Path,
    process::{
        Command,
        Stdio,
    },
};

use tracing::debug;

use crate::core::TuneDeckError;

/// Target bitrate for every converted file.
pub const MP3_BITRATE: &str = "192k";

pub trait AudioEncoder {
    /// Program name, used in error messages.
    fn name(&self) -> &str;

    fn is_available(&self) -> bool;

    /// Encodes `source` into an mp3 at `destination`, overwriting it.
    fn encode(&self, source: &Path, destination: &Path) -> Result<(), TuneDeckError>;
}

#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    program: String,
}

impl FfmpegEncoder {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl AudioEncoder for FfmpegEncoder {
    fn name(&self) -> &str {
        &self.program
    }

    fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn encode(&self, source: &Path, destination: &Path) -> Result<(), TuneDeckError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-i")
            .arg(source)
            .arg("-codec:a")
            .arg("libmp3lame")
            .arg("-b:a")
            .arg(MP3_BITRATE)
            .arg("-y")
            .arg(destination)
            .stdin(Stdio::null());

        debug!("Running encoder: {:?}", cmd);

        let output = cmd.output().map_err(|e| {
            TuneDeckError::Custom(format!("Failed to spawn {}: {}", self.program, e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let last_line = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
            return Err(TuneDeckError::Custom(format!(
                "{} exited with code {:?}: {}",
                self.program,
                output.status.code(),
                last_line.trim()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_is_unavailable() {
        let encoder = FfmpegEncoder::new("tunedeck-no-such-encoder");
        assert!(!encoder.is_available());
        assert_eq!(encoder.name(), "tunedeck-no-such-encoder");
    }

    #[test]
    fn test_missing_program_fails_to_encode() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = FfmpegEncoder::new("tunedeck-no-such-encoder");
        let result = encoder.encode(&dir.path().join("a.wav"), &dir.path().join("a.mp3"));
        assert!(matches!(result, Err(TuneDeckError::Custom(_))));
    }
}
