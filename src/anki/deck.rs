use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

use rand::{
    seq::SliceRandom,
    Rng,
};
use tracing::warn;

use super::layout::{
    render_card,
    CardContent,
    CardLayoutConfig,
};
use crate::core::{
    filename_parser::{
        clean_identifier,
        format_key,
        parse_filename,
        CANONICAL_EXTENSION,
    },
    ProgressLog,
    TuneDeckError,
};

pub const DECK_ID_RANGE: std::ops::RangeInclusive<i64> = 1_000_000_000..=9_999_999_999;

/// One note in the deck, already rendered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlashcardRecord {
    pub front: String,
    pub back: String,
    pub media_file: String,
    pub guid_seed: String, // clean("<rhythm>_<title>"), stable across exports
    pub tag: String,
}

/// Records plus the media files they reference, kept in the same order.
#[derive(Debug, Clone)]
pub struct DeckPackage {
    records: Vec<FlashcardRecord>,
    media: Vec<PathBuf>,
    pub deck_id: i64,
    pub deck_name: String,
}

impl DeckPackage {
    pub fn new(deck_name: impl Into<String>, deck_id: i64) -> Self {
        Self { records: Vec::new(), media: Vec::new(), deck_id, deck_name: deck_name.into() }
    }

    pub fn with_random_id(deck_name: impl Into<String>) -> Self {
        let deck_id = rand::rng().random_range(DECK_ID_RANGE);
        Self::new(deck_name, deck_id)
    }

    pub fn push(&mut self, record: FlashcardRecord, media_path: PathBuf) {
        self.records.push(record);
        self.media.push(media_path);
    }

    pub fn records(&self) -> &[FlashcardRecord] {
        &self.records
    }

    pub fn media(&self) -> &[PathBuf] {
        &self.media
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Uniform shuffle of the records. Media paths move with their record.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut pairs: Vec<(FlashcardRecord, PathBuf)> =
            self.records.drain(..).zip(self.media.drain(..)).collect();
        pairs.shuffle(rng);
        (self.records, self.media) = pairs.into_iter().unzip();
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, TuneDeckError> {
    let mut entries: Vec<PathBuf> =
        fs::read_dir(dir)?.filter_map(|entry| entry.ok()).map(|entry| entry.path()).collect();
    entries.sort();
    Ok(entries)
}

fn is_canonical_audio(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(CANONICAL_EXTENSION))
}

/// Walks `<export_dir>/<category>/*.mp3` in sorted order and renders one record
/// per decodable file. Files whose names don't parse are skipped with a warning.
pub fn collect_cards(
    export_dir: &Path,
    layout: &CardLayoutConfig,
    package: &mut DeckPackage,
    log: &ProgressLog,
) -> Result<usize, TuneDeckError> {
    let layout = layout.normalized();
    let mut skipped = 0;

    for category_dir in sorted_entries(export_dir)?.into_iter().filter(|p| p.is_dir()) {
        let Some(rhythm) = category_dir.file_name().and_then(|n| n.to_str()).map(str::to_string)
        else {
            continue;
        };

        for file in sorted_entries(&category_dir)?.into_iter().filter(|p| is_canonical_audio(p)) {
            let Some(media_file) = file.file_name().and_then(|n| n.to_str()).map(str::to_string)
            else {
                continue;
            };

            let Some((title, key)) = parse_filename(&media_file) else {
                warn!("Could not parse filename: {}/{}", rhythm, media_file);
                log.line(format!("Warning: Could not parse filename: {}", media_file));
                skipped += 1;
                continue;
            };

            let content = CardContent {
                title: title.clone(),
                media_file: media_file.clone(),
                key: format_key(&key),
                rhythm: rhythm.clone(),
            };
            let (front, back) = render_card(&layout, &content);

            package.push(
                FlashcardRecord {
                    front,
                    back,
                    media_file,
                    guid_seed: clean_identifier(&format!("{}_{}", rhythm, title)),
                    tag: clean_identifier(&rhythm),
                },
                file,
            );
        }
    }

    Ok(skipped)
}
