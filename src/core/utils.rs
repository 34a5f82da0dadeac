use std::sync::OnceLock;

use regex::{
    Captures,
    Regex,
};

const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

pub trait SanitizeFileName {
    fn sanitize_file_name(&self) -> String;
}

// Reel/Jig: "A" -> Reel_Jig_ _A_
impl SanitizeFileName for str {
    fn sanitize_file_name(&self) -> String {
        let replaced: String = self
            .chars()
            .map(|c| if RESERVED_CHARS.contains(&c) || c.is_control() { '_' } else { c })
            .collect();

        replaced.trim_matches(|c| c == ' ' || c == '.').to_string()
    }
}

impl SanitizeFileName for String {
    fn sanitize_file_name(&self) -> String {
        self.as_str().sanitize_file_name()
    }
}

pub fn is_sanitized(name: &str) -> bool {
    !name.is_empty()
        && !name.chars().any(|c| RESERVED_CHARS.contains(&c) || c.is_control())
        && !name.starts_with([' ', '.'])
        && !name.ends_with([' ', '.'])
}

pub fn decode_entities(text: &str) -> String {
    static ENTITY: OnceLock<Regex> = OnceLock::new();
    let entity = ENTITY.get_or_init(|| Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").unwrap());

    entity
        .replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            let decoded = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match name {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    "rsquo" => Some('’'),
                    "lsquo" => Some('‘'),
                    _ => None,
                }
            };

            decoded.map(String::from).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Removes tags and decodes entities, keeping `[sound:...]` references.
pub fn strip_html(text: &str) -> String {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    let tags = TAGS.get_or_init(|| Regex::new(r"(?s)<[^>]*>").unwrap());
    decode_entities(&tags.replace_all(text, "")).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!("Reel/Jig: \"A\"".sanitize_file_name(), "Reel_Jig_ _A_");
        assert_eq!("slip jig".sanitize_file_name(), "slip jig");
        assert_eq!(" ..hornpipe.. ".sanitize_file_name(), "hornpipe");
        assert_eq!("a<b>c|d?e*f\\g".sanitize_file_name(), "a_b_c_d_e_f_g");
        assert_eq!("tab\there".sanitize_file_name(), "tab_here");
        assert_eq!("...".sanitize_file_name(), "");
    }

    #[test]
    fn test_sanitized_names_pass_check() {
        for raw in ["Reel/Jig", "  waltz.", "C:\\tunes", "polka?"] {
            assert!(is_sanitized(&raw.sanitize_file_name()), "{raw}");
        }
        assert!(!is_sanitized("a/b"));
        assert!(!is_sanitized(""));
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("Tom &amp; Jerry &#x27;&quot;"), "Tom & Jerry '\"");
        assert_eq!(decode_entities("&unknown; stays"), "&unknown; stays");
    }

    #[test]
    fn test_html_helpers() {
        assert_eq!(escape_html("Tom & <Jerry>"), "Tom &amp; &lt;Jerry&gt;");
        assert_eq!(strip_html("[sound:a.mp3]<br><b>Reel</b> &amp; jig "), "[sound:a.mp3]Reel & jig");
    }
}
