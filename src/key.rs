use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

pub const UNKNOWN_KEY: &str = "unknown";

pub fn normalize(raw: &str) -> String {
    let folded: String = raw
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();

    let mut key = String::with_capacity(folded.len());
    let mut pending_separator = false;
    for c in folded.chars() {
        if c.is_alphanumeric() {
            if pending_separator && !key.is_empty() {
                key.push('-');
            }
            pending_separator = false;
            key.push(c);
        } else {
            pending_separator = true;
        }
    }
    if !key.is_empty() {
        return key;
    }

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        String::from(UNKNOWN_KEY)
    } else {
        trimmed
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackKey {
    pub artist: String,
    pub album: String,
    pub track: String,
}

impl TrackKey {
    pub fn new(artist: &str, album: &str, track: &str) -> Self {
        Self {
            artist: normalize(artist),
            album: normalize(album),
            track: normalize(track),
        }
    }
}
