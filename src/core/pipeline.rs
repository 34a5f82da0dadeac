use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

use tracing::warn;

use super::{
    settings::PipelineSettings,
    ProgressLog,
    TuneDeckError,
};
use crate::{
    anki::{
        generate_deck,
        DeckReport,
    },
    audio::{
        normalize,
        AudioEncoder,
        NormalizeReport,
    },
    organizer::{
        organize,
        OrganizeReport,
    },
    thesession::TuneLookup,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Normalize,
    Organize,
    GenerateDeck,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineSummary {
    pub normalize: NormalizeReport,
    pub organize: Option<OrganizeReport>,
    pub deck: Option<DeckReport>,
    pub stopped_at: Option<PipelineStage>, // Stage whose report said it failed
    pub mp3_dir_removed: bool,
}

impl PipelineSummary {
    pub fn success(&self) -> bool {
        self.deck.as_ref().is_some_and(|d| d.success())
    }
}

/// Checks the input directory and creates the working directories.
///
/// The input directory must always exist. With `skip_validation` the mp3 and
/// export directories are left for the stages to create.
pub fn prepare_directories(
    input_dir: &Path,
    mp3_dir: &Path,
    export_dir: &Path,
    skip_validation: bool,
    log: &ProgressLog,
) -> Result<(), TuneDeckError> {
    if !input_dir.is_dir() {
        return Err(TuneDeckError::MissingDirectory(input_dir.to_path_buf()));
    }
    if skip_validation {
        return Ok(());
    }

    for (label, dir) in [("MP3", mp3_dir), ("export", export_dir)] {
        if !dir.exists() {
            fs::create_dir_all(dir)?;
            log.line(format!("Created {} directory: {}", label, dir.display()));
        }
    }
    Ok(())
}

/// Canonical form of `path`, resolving the nearest existing ancestor when the
/// path itself does not exist yet.
fn resolved_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = fs::canonicalize(path) {
        return canonical;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) if parent.as_os_str().is_empty() => {
            resolved_path(Path::new(".")).join(name)
        }
        (Some(parent), Some(name)) => resolved_path(parent).join(name),
        _ => path.to_path_buf(),
    }
}

/// First of `keep` that lies at or below `dir`.
fn protected_by(dir: &Path, keep: &[&Path]) -> Option<PathBuf> {
    let dir = resolved_path(dir);
    keep.iter().map(|path| resolved_path(path)).find(|path| path.starts_with(&dir))
}

fn remove_mp3_dir(mp3_dir: &Path, summary: &mut PipelineSummary, log: &ProgressLog) {
    match fs::remove_dir_all(mp3_dir) {
        Ok(()) => {
            summary.mp3_dir_removed = true;
            log.line(format!("Removed intermediate directory: {}", mp3_dir.display()));
        }
        Err(e) => {
            warn!("Could not remove '{}': {}", mp3_dir.display(), e);
            log.line(format!("Warning: could not remove '{}': {}", mp3_dir.display(), e));
        }
    }
}

/// Normalize, organize and build the deck, stopping at the first stage that
/// reports no success.
///
/// The intermediate mp3 directory is removed once organizing succeeds, unless
/// it holds the input, the export tree or the output file. A failed removal is
/// only a warning.
pub fn run_all(
    input_dir: &Path,
    settings: &PipelineSettings,
    skip_validation: bool,
    encoder: &dyn AudioEncoder,
    lookup: &dyn TuneLookup,
    log: &ProgressLog,
) -> Result<PipelineSummary, TuneDeckError> {
    let mp3_dir = settings.mp3_dir.as_path();
    let export_dir = settings.export_dir.as_path();
    let mut summary = PipelineSummary::default();

    log.line("FULL WORKFLOW: Audio -> MP3 -> Organized -> Anki Deck");
    prepare_directories(input_dir, mp3_dir, export_dir, skip_validation, log)?;

    log.line("Step 1: Converting audio files to mp3...");
    summary.normalize = normalize(input_dir, mp3_dir, encoder, log)?;
    if !summary.normalize.success() {
        log.line("Conversion failed, skipping remaining steps");
        summary.stopped_at = Some(PipelineStage::Normalize);
        return Ok(summary);
    }

    log.line("Step 2: Organizing music files...");
    let organized = organize(mp3_dir, export_dir, lookup, log)?;
    let organized_ok = organized.success();
    summary.organize = Some(organized);
    if !organized_ok {
        log.line("Organization failed, skipping Anki card generation");
        summary.stopped_at = Some(PipelineStage::Organize);
        return Ok(summary);
    }

    let keep = [input_dir, export_dir, settings.output_file.as_path()];
    if let Some(path) = protected_by(mp3_dir, &keep) {
        log.line(format!(
            "Keeping '{}': it contains '{}'",
            mp3_dir.display(),
            path.display()
        ));
    } else {
        remove_mp3_dir(mp3_dir, &mut summary, log);
    }

    log.line("Step 3: Generating Anki .apkg file...");
    let deck = generate_deck(
        export_dir,
        &settings.output_file,
        &settings.deck_name,
        settings.randomize,
        &settings.layout,
        log,
    )?;
    if !deck.success() {
        summary.stopped_at = Some(PipelineStage::GenerateDeck);
    } else {
        log.line("All steps completed successfully!");
    }
    summary.deck = Some(deck);

    Ok(summary)
}
