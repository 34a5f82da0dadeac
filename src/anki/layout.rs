use std::{
    fmt,
    str::FromStr,
};

use serde::{
    Deserialize,
    Serialize,
};

use crate::core::utils::escape_html;

/// Separator between fragments on one side of a card.
pub const FRAGMENT_SEPARATOR: &str = "<br>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardField {
    Name,
    Audio,
    Key,
    Rhythm,
}

impl CardField {
    /// Render order on every side.
    pub const ALL: [CardField; 4] = [CardField::Name, CardField::Audio, CardField::Key, CardField::Rhythm];
}

impl fmt::Display for CardField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CardField::Name => "name",
            CardField::Audio => "audio",
            CardField::Key => "key",
            CardField::Rhythm => "rhythm",
        };
        f.write_str(name)
    }
}

impl FromStr for CardField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" | "title" => Ok(CardField::Name),
            "audio" | "sound" => Ok(CardField::Audio),
            "key" => Ok(CardField::Key),
            "rhythm" => Ok(CardField::Rhythm),
            other => Err(format!("Unknown card field '{}' (expected name, audio, key or rhythm)", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SideLayout {
    pub name: bool,
    pub audio: bool,
    pub key: bool,
    pub rhythm: bool,
}

impl SideLayout {
    pub fn from_fields(fields: &[CardField]) -> Self {
        let mut side = SideLayout::default();
        for field in fields {
            side.set(*field, true);
        }
        side
    }

    pub fn is_enabled(&self, field: CardField) -> bool {
        match field {
            CardField::Name => self.name,
            CardField::Audio => self.audio,
            CardField::Key => self.key,
            CardField::Rhythm => self.rhythm,
        }
    }

    pub fn set(&mut self, field: CardField, enabled: bool) {
        match field {
            CardField::Name => self.name = enabled,
            CardField::Audio => self.audio = enabled,
            CardField::Key => self.key = enabled,
            CardField::Rhythm => self.rhythm = enabled,
        }
    }

    pub fn enabled_fields(&self) -> Vec<CardField> {
        CardField::ALL.into_iter().filter(|f| self.is_enabled(*f)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.enabled_fields().is_empty()
    }
}

/// Parses a comma list such as `"name,key,rhythm"`. An empty string disables every field.
impl FromStr for SideLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields = s
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(CardField::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SideLayout::from_fields(&fields))
    }
}

/// Which fields show on the front and back of every card.
///
/// The front always shows at least one field; [`CardLayoutConfig::new`] and
/// [`CardLayoutConfig::normalized`] turn audio on when it would be empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardLayoutConfig {
    pub front: SideLayout,
    pub back: SideLayout,
}

impl Default for CardLayoutConfig {
    fn default() -> Self {
        Self {
            front: SideLayout::from_fields(&[CardField::Audio]),
            back: SideLayout::from_fields(&[CardField::Name, CardField::Key, CardField::Rhythm]),
        }
    }
}

impl CardLayoutConfig {
    pub fn new(front: SideLayout, back: SideLayout) -> Self {
        Self { front, back }.normalized()
    }

    pub fn normalized(mut self) -> Self {
        if self.front.is_empty() {
            self.front.audio = true;
        }
        self
    }
}

/// Values one card is rendered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardContent {
    pub title: String,
    pub media_file: String,
    pub key: String, // Already expanded for display, e.g. "D major"
    pub rhythm: String,
}

pub fn render_fragment(field: CardField, content: &CardContent) -> String {
    match field {
        CardField::Name => escape_html(&content.title),
        CardField::Audio => format!("[sound:{}]", content.media_file),
        CardField::Key => escape_html(&content.key),
        CardField::Rhythm => escape_html(&content.rhythm),
    }
}

pub fn render_side(side: &SideLayout, content: &CardContent) -> String {
    side.enabled_fields()
        .into_iter()
        .map(|field| render_fragment(field, content))
        .collect::<Vec<_>>()
        .join(FRAGMENT_SEPARATOR)
}

/// Front and back HTML for one card.
///
/// An empty front falls back to the audio reference, an empty back to the title.
pub fn render_card(layout: &CardLayoutConfig, content: &CardContent) -> (String, String) {
    let mut front = render_side(&layout.front, content);
    if front.is_empty() {
        front = render_fragment(CardField::Audio, content);
    }

    let mut back = render_side(&layout.back, content);
    if back.is_empty() {
        back = render_fragment(CardField::Name, content);
    }

    (front, back)
}
