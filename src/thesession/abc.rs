//! Line classifier for the ABC header block on a tune page.
//!
//! ```text
//! Seeking --"X:"--> Collecting --unknown prefix | "|..." | after "K:"--> Done
//! ```
//!
//! An `X:` line while collecting starts the block over. Once `Done`, remaining
//! input is ignored.

/// Header fields that may appear between `X:` and `K:`.
pub const HEADER_PREFIXES: [&str; 17] = [
    "T:", "R:", "M:", "L:", "K:", "X:", "C:", "O:", "A:", "N:", "Z:", "H:", "S:", "B:", "F:", "I:",
    "P:",
];

const START_MARKER: &str = "X:";
const TERMINATING_FIELD: &str = "K:";
const NOTATION_MARKER: char = '|';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Seeking,
    Collecting,
    Done,
}

#[derive(Debug)]
pub struct HeaderScanner {
    state: ScanState,
    lines: Vec<String>,
}

impl Default for HeaderScanner {
    fn default() -> Self {
        Self::new()
    }
}

fn is_header_line(line: &str) -> bool {
    HEADER_PREFIXES.iter().any(|prefix| line.starts_with(prefix))
}

impl HeaderScanner {
    pub fn new() -> Self {
        Self { state: ScanState::Seeking, lines: Vec::new() }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Classifies one line. Leading and trailing whitespace is ignored.
    pub fn feed(&mut self, line: &str) -> ScanState {
        let line = line.trim();

        match self.state {
            ScanState::Done => {}
            ScanState::Seeking => {
                if line.starts_with(START_MARKER) {
                    self.lines = vec![line.to_string()];
                    self.state = ScanState::Collecting;
                }
            }
            ScanState::Collecting => {
                if line.starts_with(START_MARKER) {
                    self.lines = vec![line.to_string()];
                } else if line.starts_with(NOTATION_MARKER)
                    || (!line.is_empty() && !is_header_line(line))
                {
                    self.state = ScanState::Done;
                } else if !line.is_empty() {
                    self.lines.push(line.to_string());
                    if line.starts_with(TERMINATING_FIELD) {
                        self.state = ScanState::Done;
                    }
                }
            }
        }

        self.state
    }

    /// Collected header lines, or `None` if no start marker was ever seen.
    pub fn into_block(self) -> Option<Vec<String>> {
        match self.state {
            ScanState::Seeking => None,
            ScanState::Collecting | ScanState::Done => Some(self.lines),
        }
    }
}

/// The three fields a tune needs. Any of them may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AbcHeader {
    pub title: Option<String>,
    pub rhythm: Option<String>,
    pub key: Option<String>,
}

impl AbcHeader {
    pub fn is_complete(&self) -> bool {
        self.title.is_some() && self.rhythm.is_some() && self.key.is_some()
    }
}

fn field_value(block: &[String], prefix: &str) -> Option<String> {
    block
        .iter()
        .filter_map(|line| line.strip_prefix(prefix))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

/// Scans page text for the first header block and pulls out T:, R: and K:.
///
/// Returns `None` when the text has no `X:` line at all.
pub fn parse_header(text: &str) -> Option<AbcHeader> {
    let mut scanner = HeaderScanner::new();
    for line in text.lines() {
        if scanner.feed(line) == ScanState::Done {
            break;
        }
    }

    let block = scanner.into_block()?;

    Some(AbcHeader {
        title: field_value(&block, "T:"),
        rhythm: field_value(&block, "R:"),
        key: field_value(&block, "K:"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        let mut scanner = HeaderScanner::new();
        assert_eq!(scanner.feed("The Musical Priest"), ScanState::Seeking);
        assert_eq!(scanner.feed("T: not yet"), ScanState::Seeking);
        assert_eq!(scanner.feed("X: 1"), ScanState::Collecting);
        assert_eq!(scanner.feed("T: The Musical Priest"), ScanState::Collecting);
        assert_eq!(scanner.feed(""), ScanState::Collecting);
        assert_eq!(scanner.feed("K: Bmin"), ScanState::Done);
        assert_eq!(scanner.feed("X: 2"), ScanState::Done);

        assert_eq!(
            scanner.into_block().unwrap(),
            vec!["X: 1", "T: The Musical Priest", "K: Bmin"]
        );
    }

    #[test]
    fn test_stops_on_notation_and_unknown_lines() {
        let mut scanner = HeaderScanner::new();
        scanner.feed("X: 1");
        assert_eq!(scanner.feed("|:FB~B2 FBAF|"), ScanState::Done);

        let mut scanner = HeaderScanner::new();
        scanner.feed("X: 1");
        assert_eq!(scanner.feed("Comments (3)"), ScanState::Done);
    }

    #[test]
    fn test_restart_on_second_marker() {
        let mut scanner = HeaderScanner::new();
        scanner.feed("X: 1");
        scanner.feed("T: First");
        scanner.feed("X: 2");
        scanner.feed("T: Second");
        assert_eq!(scanner.state(), ScanState::Collecting);
        assert_eq!(scanner.into_block().unwrap(), vec!["X: 2", "T: Second"]);
    }

    #[test]
    fn test_parse_header() {
        let text = "Tunes\n  X: 1\n  T: Drowsy Maggie\n  R: reel\n  M: 4/4\n  L: 1/8\n  K: Edor\n|:E2BE dEBE|\n";
        let header = parse_header(text).unwrap();
        assert_eq!(
            header,
            AbcHeader {
                title: Some("Drowsy Maggie".to_string()),
                rhythm: Some("reel".to_string()),
                key: Some("Edor".to_string()),
            }
        );
        assert!(header.is_complete());
    }

    #[test]
    fn test_fields_after_stop_are_ignored() {
        // Notation ends the block before R: is seen
        let text = "X: 1\nT: Tune\n|abc|\nR: jig\nK: G";
        let header = parse_header(text).unwrap();
        assert_eq!(header.title.as_deref(), Some("Tune"));
        assert_eq!(header.rhythm, None);
        assert_eq!(header.key, None);
        assert!(!header.is_complete());
    }

    #[test]
    fn test_no_block() {
        assert_eq!(parse_header("T: floating\nK: D"), None);
    }
}
