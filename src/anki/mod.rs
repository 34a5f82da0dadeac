pub mod deck;
pub mod layout;
pub mod package;

use std::path::{
    Path,
    PathBuf,
};

pub use deck::{
    collect_cards,
    DeckPackage,
    FlashcardRecord,
};
pub use layout::{
    CardField,
    CardLayoutConfig,
    SideLayout,
};
pub use package::write_package;

use crate::core::{
    ProgressLog,
    TuneDeckError,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeckReport {
    pub cards: usize,
    pub skipped: usize,
    pub randomized: bool,
    pub output: PathBuf,
}

impl DeckReport {
    pub fn success(&self) -> bool {
        self.cards > 0
    }
}

/// Builds the deck from an organized export tree without writing it.
pub fn assemble_deck(
    export_dir: &Path,
    deck_name: &str,
    randomize: bool,
    layout: &CardLayoutConfig,
    log: &ProgressLog,
) -> Result<(DeckPackage, usize), TuneDeckError> {
    if !export_dir.is_dir() {
        return Err(TuneDeckError::MissingDirectory(export_dir.to_path_buf()));
    }

    log.line("Processing music directory for .apkg generation...");
    let mut package = DeckPackage::with_random_id(deck_name);
    let skipped = collect_cards(export_dir, layout, &mut package, log)?;

    if randomize {
        package.shuffle(&mut rand::rng());
    }

    Ok((package, skipped))
}

pub fn generate_deck(
    export_dir: &Path,
    output: &Path,
    deck_name: &str,
    randomize: bool,
    layout: &CardLayoutConfig,
    log: &ProgressLog,
) -> Result<DeckReport, TuneDeckError> {
    let (package, skipped) = assemble_deck(export_dir, deck_name, randomize, layout, log)?;
    let report =
        DeckReport { cards: package.len(), skipped, randomized: randomize, output: output.to_path_buf() };

    if package.is_empty() {
        log.line("No valid music files found!");
        return Ok(report);
    }

    let order = if randomize { "randomized order" } else { "original order" };
    log.line(format!("Found {} cards to generate ({})", package.len(), order));
    log.line(format!("Generating .apkg file: {}", output.display()));

    write_package(&package, output)?;

    log.line(format!("Generated {} with {} cards!", output.display(), package.len()));
    if skipped > 0 {
        log.line(format!("Skipped {} files with unrecognized names", skipped));
    }
    Ok(report)
}
