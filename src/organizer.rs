//! Sorts canonical mp3 files into rhythm folders using looked-up metadata.

use std::{
    collections::HashSet,
    fs,
    path::{
        Path,
        PathBuf,
    },
};

use tracing::warn;

use crate::{
    core::{
        filename_parser::{
            format_filename,
            CANONICAL_EXTENSION,
        },
        utils::SanitizeFileName,
        AudioAsset,
        LookupError,
        OrganizedFile,
        ProgressLog,
        TuneDeckError,
        TuneRecord,
    },
    thesession::TuneLookup,
};

/// Category for files whose metadata could not be resolved.
pub const UNKNOWN_CATEGORY: &str = "unknown";

#[derive(Debug, Clone, Default)]
pub struct OrganizeReport {
    pub total: usize,
    pub processed: Vec<OrganizedFile>,
    pub unknown: Vec<String>,
    pub errors: Vec<String>,
}

impl OrganizeReport {
    pub fn success(&self) -> bool {
        !self.processed.is_empty()
    }
}

fn list_canonical_files(input_dir: &Path) -> Result<Vec<AudioAsset>, TuneDeckError> {
    let mut paths: Vec<PathBuf> = fs::read_dir(input_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case(CANONICAL_EXTENSION))
        })
        .collect();
    paths.sort();

    paths.iter().map(|path| AudioAsset::from_path(path)).collect()
}

fn place_resolved(
    asset: &AudioAsset,
    record: &TuneRecord,
    export_dir: &Path,
    placed: &mut HashSet<PathBuf>,
) -> Result<OrganizedFile, TuneDeckError> {
    let category = record.rhythm.sanitize_file_name();
    let title = record.title.sanitize_file_name();
    let key = record.key.sanitize_file_name();

    if category.is_empty() || title.is_empty() || key.is_empty() {
        return Err(TuneDeckError::Custom(format!(
            "Metadata sanitizes to an empty name (R:{}, T:{}, K:{})",
            record.rhythm, record.title, record.key
        )));
    }

    let category_dir = export_dir.join(&category);
    fs::create_dir_all(&category_dir)?;

    let file_name = format_filename(&title, &key, &asset.extension);
    let target = category_dir.join(&file_name);
    if placed.contains(&target) {
        return Err(TuneDeckError::Custom(format!(
            "{}/{} was already organized from another file",
            category, file_name
        )));
    }
    if target.exists() {
        warn!("Overwriting existing file: {}", target.display());
    }
    fs::copy(&asset.path, &target)?;
    placed.insert(target);

    Ok(OrganizedFile { category, file_name, source: asset.path.clone() })
}

fn describe_failure(error: &LookupError) -> String {
    match error {
        LookupError::NotFound(_) => "No results found, copying to unknown".to_string(),
        LookupError::ParseIncomplete { title, rhythm, key, .. } => format!(
            "Could not extract complete metadata (T:{}, R:{}, K:{}), copying to unknown",
            title.as_deref().unwrap_or("None"),
            rhythm.as_deref().unwrap_or("None"),
            key.as_deref().unwrap_or("None"),
        ),
        LookupError::Network(e) | LookupError::Io(e) => {
            format!("Lookup failed ({}), copying to unknown", e)
        }
    }
}

/// Looks up every mp3 at the top level of `input_dir` and copies it into
/// `export_dir/<rhythm>/<title> (<key>).mp3`, or unchanged into
/// `export_dir/unknown/` when that is not possible.
///
/// Each file lands in exactly one of `processed`, `unknown` or `errors`.
pub fn organize(
    input_dir: &Path,
    export_dir: &Path,
    lookup: &dyn TuneLookup,
    log: &ProgressLog,
) -> Result<OrganizeReport, TuneDeckError> {
    if !input_dir.is_dir() {
        return Err(TuneDeckError::MissingDirectory(input_dir.to_path_buf()));
    }

    let unknown_dir = export_dir.join(UNKNOWN_CATEGORY);
    fs::create_dir_all(&unknown_dir)?;

    let files = list_canonical_files(input_dir)?;
    let mut report = OrganizeReport { total: files.len(), ..Default::default() };
    let mut placed = HashSet::new();

    if files.is_empty() {
        log.line(format!("No mp3 files found in '{}'", input_dir.display()));
        return Ok(report);
    }

    log.line(format!("Found {} mp3 files to process", files.len()));
    log.line("Starting processing with respectful delays...");

    for (idx, asset) in files.iter().enumerate() {
        log.line(format!("[{}/{}] Processing: {}", idx + 1, files.len(), asset.stem));

        let placed = match lookup.lookup(&asset.stem) {
            Ok(record) => {
                log.line(format!(
                    "  Metadata - Title: {}, Rhythm: {}, Key: {}",
                    record.title, record.rhythm, record.key
                ));
                match place_resolved(asset, &record, export_dir, &mut placed) {
                    Ok(file) => {
                        log.line(format!("  Copied to: {}", file.relative_path().display()));
                        Some(file)
                    }
                    Err(e) => {
                        log.line(format!("  Could not place resolved file ({}), copying to unknown", e));
                        None
                    }
                }
            }
            Err(e) => {
                log.line(format!("  {}", describe_failure(&e)));
                None
            }
        };

        if let Some(file) = placed {
            report.processed.push(file);
            continue;
        }

        match fs::copy(&asset.path, unknown_dir.join(asset.file_name())) {
            Ok(_) => report.unknown.push(asset.stem.clone()),
            Err(e) => {
                let message = format!("Failed to copy {}: {}", asset.stem, e);
                log.line(format!("  {}", message));
                report.errors.push(message);
            }
        }
    }

    log_summary(&report, log);

    Ok(report)
}

fn log_summary(report: &OrganizeReport, log: &ProgressLog) {
    log.line("=".repeat(60));
    log.line("ORGANIZATION SUMMARY");
    log.line("=".repeat(60));
    log.line(format!("Total files processed: {}", report.total));
    log.line(format!("Successfully organized: {}", report.processed.len()));
    log.line(format!("Moved to unknown: {}", report.unknown.len()));
    log.line(format!("Errors: {}", report.errors.len()));

    if !report.processed.is_empty() {
        log.line("Successfully organized files:");
        for file in &report.processed {
            let original =
                file.source.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            log.line(format!("  {} -> {}", original, file.relative_path().display()));
        }
    }

    if !report.unknown.is_empty() {
        log.line("Files moved to unknown (not found or incomplete metadata):");
        for name in &report.unknown {
            log.line(format!("  {}", name));
        }
    }

    if !report.errors.is_empty() {
        log.line("Errors encountered:");
        for error in &report.errors {
            log.line(format!("  {}", error));
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::core::utils::is_sanitized;

    /// Lookup table keyed by candidate title; anything else is not found.
    pub(crate) struct FakeLookup {
        pub records: HashMap<String, Result<TuneRecord, LookupError>>,
    }

    impl FakeLookup {
        pub(crate) fn with(entries: Vec<(&str, &str, &str, &str)>) -> Self {
            let records = entries
                .into_iter()
                .map(|(candidate, title, rhythm, key)| {
                    (
                        candidate.to_string(),
                        Ok(TuneRecord {
                            title: title.to_string(),
                            rhythm: rhythm.to_string(),
                            key: key.to_string(),
                            source_url: format!("https://thesession.org/tunes/{}", candidate.len()),
                        }),
                    )
                })
                .collect();
            Self { records }
        }
    }

    impl TuneLookup for FakeLookup {
        fn lookup(&self, title: &str) -> Result<TuneRecord, LookupError> {
            self.records
                .get(title)
                .cloned()
                .unwrap_or_else(|| Err(LookupError::NotFound(title.to_string())))
        }
    }

    #[test]
    fn test_resolved_and_unknown() {
        let input = tempfile::tempdir().unwrap();
        let export = tempfile::tempdir().unwrap();
        fs::write(input.path().join("musical priest.mp3"), b"1").unwrap();
        fs::write(input.path().join("mystery.mp3"), b"2").unwrap();

        let lookup =
            FakeLookup::with(vec![("musical priest", "The Musical Priest", "reel", "Bmin")]);
        let report = organize(input.path(), export.path(), &lookup, &ProgressLog::silent()).unwrap();

        assert!(report.success());
        assert_eq!(report.total, 2);
        assert_eq!(report.processed.len(), 1);
        assert_eq!(report.unknown, vec!["mystery".to_string()]);
        assert!(report.errors.is_empty());
        assert!(export.path().join("reel/The Musical Priest (Bmin).mp3").exists());
        assert!(export.path().join("unknown/mystery.mp3").exists());
    }

    #[test]
    fn test_names_are_sanitized() {
        let input = tempfile::tempdir().unwrap();
        let export = tempfile::tempdir().unwrap();
        fs::write(input.path().join("odd.mp3"), b"1").unwrap();

        let lookup = FakeLookup::with(vec![("odd", "Jig/Reel?", "slip jig/hop jig.", "A:mix")]);
        let report = organize(input.path(), export.path(), &lookup, &ProgressLog::silent()).unwrap();

        let file = &report.processed[0];
        assert_eq!(file.category, "slip jig_hop jig");
        assert_eq!(file.file_name, "Jig_Reel_ (A_mix).mp3");
        assert!(is_sanitized(&file.category));
        assert!(export.path().join("slip jig_hop jig/Jig_Reel_ (A_mix).mp3").exists());
    }

    #[test]
    fn test_empty_category_goes_to_unknown() {
        let input = tempfile::tempdir().unwrap();
        let export = tempfile::tempdir().unwrap();
        fs::write(input.path().join("dots.mp3"), b"1").unwrap();

        let lookup = FakeLookup::with(vec![("dots", "Dots", "...", "D")]);
        let report = organize(input.path(), export.path(), &lookup, &ProgressLog::silent()).unwrap();

        assert!(!report.success());
        assert_eq!(report.unknown, vec!["dots".to_string()]);
    }

    #[test]
    fn test_lookup_errors_degrade_to_unknown() {
        let input = tempfile::tempdir().unwrap();
        let export = tempfile::tempdir().unwrap();
        for name in ["a", "b", "c"] {
            fs::write(input.path().join(format!("{name}.mp3")), name).unwrap();
        }

        let mut lookup = FakeLookup::with(vec![]);
        lookup.records.insert("a".to_string(), Err(LookupError::Network("timeout".to_string())));
        lookup.records.insert(
            "b".to_string(),
            Err(LookupError::ParseIncomplete {
                url: "https://thesession.org/tunes/1".to_string(),
                title: Some("B".to_string()),
                rhythm: None,
                key: None,
            }),
        );

        let report = organize(input.path(), export.path(), &lookup, &ProgressLog::silent()).unwrap();

        assert_eq!(report.unknown.len(), 3);
        assert_eq!(
            report.processed.len() + report.unknown.len() + report.errors.len(),
            report.total
        );
    }

    #[test]
    fn test_only_top_level_mp3_files() {
        let input = tempfile::tempdir().unwrap();
        let export = tempfile::tempdir().unwrap();
        fs::create_dir(input.path().join("nested")).unwrap();
        fs::write(input.path().join("nested/deep.mp3"), b"1").unwrap();
        fs::write(input.path().join("cover.jpg"), b"1").unwrap();
        fs::write(input.path().join("Loud.MP3"), b"1").unwrap();

        let report = organize(
            input.path(),
            export.path(),
            &FakeLookup::with(vec![]),
            &ProgressLog::silent(),
        )
        .unwrap();

        assert_eq!(report.total, 1);
        assert!(export.path().join("unknown/Loud.MP3").exists());
    }

    #[test]
    fn test_missing_input_is_fatal() {
        let export = tempfile::tempdir().unwrap();
        let result = organize(
            &export.path().join("missing"),
            export.path(),
            &FakeLookup::with(vec![]),
            &ProgressLog::silent(),
        );
        assert!(matches!(result, Err(TuneDeckError::MissingDirectory(_))));
    }

    #[test]
    fn test_empty_input_creates_unknown_dir() {
        let input = tempfile::tempdir().unwrap();
        let export = tempfile::tempdir().unwrap();
        let report = organize(
            input.path(),
            &export.path().join("export"),
            &FakeLookup::with(vec![]),
            &ProgressLog::silent(),
        )
        .unwrap();

        assert_eq!(report.total, 0);
        assert!(!report.success());
        assert!(export.path().join("export/unknown").is_dir());
    }

    #[test]
    fn test_same_tune_twice_keeps_first_copy() {
        let input = tempfile::tempdir().unwrap();
        let export = tempfile::tempdir().unwrap();
        fs::write(input.path().join("kesh.mp3"), b"first").unwrap();
        fs::write(input.path().join("the kesh.mp3"), b"second").unwrap();

        let lookup = FakeLookup::with(vec![
            ("kesh", "The Kesh", "jig", "Gmaj"),
            ("the kesh", "The Kesh", "jig", "Gmaj"),
        ]);
        let report = organize(input.path(), export.path(), &lookup, &ProgressLog::silent()).unwrap();

        assert_eq!(report.processed.len(), 1);
        assert_eq!(report.unknown, vec!["the kesh".to_string()]);
        assert_eq!(report.processed.len() + report.unknown.len() + report.errors.len(), report.total);
        assert_eq!(fs::read(export.path().join("jig/The Kesh (Gmaj).mp3")).unwrap(), b"first");
        assert_eq!(fs::read_dir(export.path().join("jig")).unwrap().count(), 1);
        assert!(export.path().join("unknown/the kesh.mp3").exists());
    }

    #[test]
    fn test_failed_fallback_copy_is_an_error() {
        let input = tempfile::tempdir().unwrap();
        let export = tempfile::tempdir().unwrap();
        fs::write(input.path().join("mystery.mp3"), b"1").unwrap();
        fs::write(input.path().join("kesh.mp3"), b"2").unwrap();
        // A directory where the fallback copy should go makes the copy fail
        fs::create_dir_all(export.path().join("unknown/mystery.mp3")).unwrap();

        let lookup = FakeLookup::with(vec![("kesh", "The Kesh", "jig", "Gmaj")]);
        let report = organize(input.path(), export.path(), &lookup, &ProgressLog::silent()).unwrap();

        assert_eq!(report.total, 2);
        assert_eq!(report.processed.len(), 1);
        assert!(report.unknown.is_empty());
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("mystery"));
        assert_eq!(report.processed.len() + report.unknown.len() + report.errors.len(), report.total);
    }
}
