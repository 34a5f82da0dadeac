use std::sync::OnceLock;

use regex::Regex;

/// Extension every organized tune carries.
pub const CANONICAL_EXTENSION: &str = "mp3";

const MODE_SUFFIXES: [(&str, &str); 9] = [
    ("maj", "major"),
    ("min", "minor"),
    ("dor", "dorian"),
    ("mix", "mixolydian"),
    ("aeo", "aeolian"),
    ("ion", "ionian"),
    ("phr", "phrygian"),
    ("loc", "locrian"),
    ("lyd", "lydian"),
];

fn tune_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.+?)\s*\(([^)]+)\)$").unwrap())
}

/// Splits `"<title> (<key>).<ext>"` into `(title, key)`.
///
/// The title match is non-greedy, so the last parenthesized group is the key.
/// Returns `None` for any other shape.
pub fn parse_filename(filename: &str) -> Option<(String, String)> {
    let stem =
        std::path::Path::new(filename).file_stem().and_then(|s| s.to_str()).unwrap_or(filename);

    let captures = tune_name_regex().captures(stem)?;
    let title = captures.get(1)?.as_str().trim();
    let key = captures.get(2)?.as_str().trim();

    if title.is_empty() || key.is_empty() {
        return None;
    }

    Some((title.to_string(), key.to_string()))
}

pub fn format_filename(title: &str, key: &str, extension: &str) -> String {
    format!("{} ({}).{}", title, key, extension)
}

/// Expands a trailing mode abbreviation: `"Dmaj"` -> `"D major"`.
pub fn format_key(key: &str) -> String {
    if key.len() < 3 {
        return key.to_string();
    }

    let split = key.len() - 3;
    let (root, suffix) = match (key.get(..split), key.get(split..)) {
        (Some(root), Some(suffix)) => (root, suffix),
        _ => return key.to_string(),
    };

    MODE_SUFFIXES
        .iter()
        .find(|(abbrev, _)| suffix.eq_ignore_ascii_case(abbrev))
        .map(|(_, mode)| format!("{} {}", root, mode))
        .unwrap_or_else(|| key.to_string())
}

/// Lowercased identifier safe for tags and GUID seeds. Not a file name.
pub fn clean_identifier(text: &str) -> String {
    static STRIP: OnceLock<Regex> = OnceLock::new();
    static SPACES: OnceLock<Regex> = OnceLock::new();
    static HYPHENS: OnceLock<Regex> = OnceLock::new();

    let strip = STRIP.get_or_init(|| Regex::new(r"[^\w\s-]").unwrap());
    let spaces = SPACES.get_or_init(|| Regex::new(r"\s+").unwrap());
    let hyphens = HYPHENS.get_or_init(|| Regex::new(r"-+").unwrap());

    let lowered = text.to_lowercase();
    let cleaned = strip.replace_all(&lowered, "");
    let cleaned = spaces.replace_all(&cleaned, "_");
    hyphens.replace_all(&cleaned, "_").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_parsing() {
        assert_eq!(
            parse_filename("The Musical Priest (Bmin).mp3"),
            Some(("The Musical Priest".to_string(), "Bmin".to_string()))
        );

        // Last group is the key
        assert_eq!(
            parse_filename("Tom Billy's (No. 2) (Adorian).mp3"),
            Some(("Tom Billy's (No. 2)".to_string(), "Adorian".to_string()))
        );

        assert_eq!(parse_filename("no key here.mp3"), None);
        assert_eq!(parse_filename("(D).mp3"), None);
        assert_eq!(parse_filename("Trailing (D) extra.mp3"), None);
    }

    #[test]
    fn test_parse_inverts_format() {
        let cases = [
            ("Drowsy Maggie", "Edorian"),
            ("The Kesh", "Gmajor"),
            ("Tuttle's Reel", "Dmaj"),
            ("Out on the Ocean", "G"),
            ("Port na bPúcaí", "Amin"),
            ("Dr. O'Neill", "Dmix"),
        ];

        for (title, key) in cases {
            let filename = format_filename(title, key, CANONICAL_EXTENSION);
            assert_eq!(parse_filename(&filename), Some((title.to_string(), key.to_string())));
        }
    }

    #[test]
    fn test_format_key() {
        assert_eq!(format_key("Dmaj"), "D major");
        assert_eq!(format_key("Edor"), "E dorian");
        assert_eq!(format_key("G"), "G");
        assert_eq!(format_key("Amixolydian"), "Amixolydian");
        assert_eq!(format_key("F#MIN"), "F# minor");
        assert_eq!(format_key("Baeo"), "B aeolian");
        assert_eq!(format_key("Clyd"), "C lydian");
        assert_eq!(format_key(""), "");
    }

    #[test]
    fn test_clean_identifier() {
        assert_eq!(clean_identifier("Reel The Musical Priest"), "reel_the_musical_priest");
        assert_eq!(clean_identifier("slip jig_Drops of Brandy!"), "slip_jig_drops_of_brandy");
        assert_eq!(clean_identifier("Hop--Jig   (Alt)"), "hop_jig_alt");
        assert_eq!(clean_identifier("polka - A"), "polka___a");
    }
}
