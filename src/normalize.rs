//! Shazam Result Normalizer
//!
//! Flattens the nested, loosely structured match payload returned by the
//! recognition service into a fixed record. Every lookup falls back to a
//! default, so a missing or wrongly typed field never fails normalization.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

pub const SERVICE_NAME: &str = "Shazam";
pub const NO_MATCH_MESSAGE: &str = "No match found";

const DEFAULT_TITLE: &str = "Unknown";
const DEFAULT_ARTIST: &str = "Unknown Artist";
const DEFAULT_ALBUM: &str = "Unknown Album";
const DEFAULT_LINK_NAME: &str = "unknown";

const SECTION_LYRICS: &str = "LYRICS";
const SECTION_METADATA: &str = "METADATA";

/// Outcome of a recognition attempt, serialized with a `status` tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Recognition {
    Success { service: String, result: TrackInfo },
    NotFound { message: String },
    Error { message: String },
}

impl Recognition {
    pub fn not_found() -> Self {
        Recognition::NotFound {
            message: NO_MATCH_MESSAGE.to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Recognition::Error {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackInfo {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub image_url: String,
    /// Lower-cased service name -> URI
    pub streaming_links: BTreeMap<String, String>,
    pub lyrics: Vec<String>,
    /// Metadata label (e.g. "Album", "Label", "Released") -> value
    pub metadata: BTreeMap<String, String>,
    pub genre: String,
    pub release_date: String,
    pub isrc: String,
    pub music_video_url: String,
    pub artist_images: ArtistImages,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistImages {
    pub coverart: String,
    pub background: String,
}

/// Normalize a raw recognition payload. `None` means the service reported no match.
pub fn normalize(raw: Option<&Value>) -> Recognition {
    let track = match raw.and_then(|r| r.get("track")).filter(|t| t.is_object()) {
        Some(t) => t,
        None => return Recognition::not_found(),
    };

    let image_url = string_or(track, &["images", "coverart"], "");

    let result = TrackInfo {
        title: string_or(track, &["title"], DEFAULT_TITLE),
        artist: string_or(track, &["subtitle"], DEFAULT_ARTIST),
        album: album_of(track),
        image_url: image_url.clone(),
        streaming_links: streaming_links_of(track),
        lyrics: lyrics_of(track),
        metadata: metadata_of(track),
        genre: string_or(track, &["genres", "primary"], ""),
        release_date: string_or(track, &["release_date"], ""),
        isrc: string_or(track, &["isrc"], ""),
        music_video_url: string_or(track, &["url"], ""),
        artist_images: ArtistImages {
            coverart: image_url,
            background: string_or(track, &["share", "image"], ""),
        },
    };

    Recognition::Success {
        service: SERVICE_NAME.to_string(),
        result,
    }
}

/// Walk `path` through nested objects and return the string found there, or `default`.
fn string_or(value: &Value, path: &[&str], default: &str) -> String {
    path.iter()
        .try_fold(value, |node, key| node.get(*key))
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

fn sections_of(track: &Value) -> &[Value] {
    track
        .get("sections")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn section_is(section: &Value, kind: &str) -> bool {
    section.get("type").and_then(Value::as_str) == Some(kind)
}

// Reads the first metadata item of the first section, whatever that section's type.
fn album_of(track: &Value) -> String {
    sections_of(track)
        .first()
        .and_then(|section| section.get("metadata"))
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .and_then(|item| item.get("text"))
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_ALBUM)
        .to_string()
}

fn streaming_links_of(track: &Value) -> BTreeMap<String, String> {
    let mut links = BTreeMap::new();

    let actions = track
        .get("hub")
        .and_then(|hub| hub.get("actions"))
        .and_then(Value::as_array);

    for action in actions.into_iter().flatten() {
        if action.get("type").and_then(Value::as_str) != Some("uri") {
            continue;
        }
        let Some(uri) = action.get("uri").and_then(Value::as_str) else {
            continue;
        };
        let service = action
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_LINK_NAME)
            .to_lowercase();
        links.insert(service, uri.to_string());
    }

    links
}

fn lyrics_of(track: &Value) -> Vec<String> {
    sections_of(track)
        .iter()
        .find(|section| section_is(section, SECTION_LYRICS))
        .and_then(|section| section.get("text"))
        .and_then(Value::as_array)
        .map(|lines| {
            lines
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn metadata_of(track: &Value) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();

    for section in sections_of(track)
        .iter()
        .filter(|section| section_is(section, SECTION_METADATA))
    {
        let items = section.get("metadata").and_then(Value::as_array);
        for item in items.into_iter().flatten() {
            let title = item.get("title").and_then(Value::as_str);
            let text = item.get("text").and_then(Value::as_str);
            if let (Some(title), Some(text)) = (title, text) {
                metadata.insert(title.to_string(), text.to_string());
            }
        }
    }

    metadata
}
