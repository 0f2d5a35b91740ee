use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::normalize::join_artists;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Invalid catalog JSON in {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// A release from the Discogs collection with its tracklist.
///
/// Only the fields used for matching and search are modelled; the rest of the
/// Discogs release payload is ignored on read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocalRelease {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default = "unknown_release")]
    pub title: String,
    #[serde(default)]
    pub artists: Vec<LocalArtist>,
    #[serde(default)]
    pub tracklist: Vec<LocalTrack>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub styles: Vec<String>,
}

fn unknown_release() -> String {
    "Unknown Release".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocalArtist {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocalTrack {
    #[serde(default, deserialize_with = "opaque_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub position: String,
    pub title: String,
}

/// Track ids are opaque: strings are kept, numbers are rendered as text and
/// anything else counts as absent.
fn opaque_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

impl LocalRelease {
    /// Artist credits joined with ", ".
    pub fn artist_names(&self) -> String {
        join_artists(self.artists.iter().map(|a| a.name.as_str()))
    }
}

impl LocalTrack {
    /// Stable track key: the Discogs id when present, else `releaseId-position`,
    /// else the bare position.
    pub fn key(&self, release_id: Option<u64>) -> String {
        match (&self.id, release_id) {
            (Some(id), _) => id.clone(),
            (None, Some(release_id)) => format!("{release_id}-{}", self.position),
            (None, None) => self.position.clone(),
        }
    }
}

/// Read the local catalog document. The caller checks existence first when a
/// missing file needs its own diagnostic.
pub fn load_catalog(path: &Path) -> Result<Vec<LocalRelease>> {
    let contents = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| CatalogError::Json {
        path: path.display().to_string(),
        source,
    })
}

/// A track found by [`search_tracks`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrackHit<'a> {
    pub track_title: &'a str,
    pub release_title: &'a str,
    pub artist: String,
    pub year: Option<u32>,
    pub genres: &'a [String],
    pub styles: &'a [String],
}

/// Case-insensitive substring search over every track title in the catalog.
pub fn search_tracks<'a>(releases: &'a [LocalRelease], query: &str) -> Vec<TrackHit<'a>> {
    let needle = query.to_lowercase();
    let mut hits = Vec::new();

    for release in releases {
        for track in &release.tracklist {
            if track.title.to_lowercase().contains(&needle) {
                hits.push(TrackHit {
                    track_title: &track.title,
                    release_title: &release.title,
                    artist: release.artist_names(),
                    year: release.year,
                    genres: &release.genres,
                    styles: &release.styles,
                });
            }
        }
    }

    hits
}
