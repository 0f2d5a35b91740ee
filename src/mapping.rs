use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::document::write_json_document;
use crate::gateway::{AudioFeatures, RemoteTrackDetail};

#[derive(Error, Debug)]
pub enum MappingError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Invalid mapping JSON in {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, MappingError>;

/// The local side of a mapping record.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceTrack {
    pub release_title: String,
    pub track_artist: String,
    pub track_title: String,
}

/// Outcome of resolving one local track.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Every target field comes from `detail`. Features may still be missing
    /// when only the audio-feature lookup failed.
    Matched {
        detail: RemoteTrackDetail,
        features: Option<AudioFeatures>,
    },
    Unmatched,
}

/// One row of the mapping document: a local track and its remote counterpart.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingRecord {
    pub source: SourceTrack,
    pub resolution: Resolution,
}

impl MappingRecord {
    pub fn new(source: SourceTrack, resolution: Resolution) -> Self {
        Self { source, resolution }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self.resolution, Resolution::Matched { .. })
    }

    pub fn detail(&self) -> Option<&RemoteTrackDetail> {
        match &self.resolution {
            Resolution::Matched { detail, .. } => Some(detail),
            Resolution::Unmatched => None,
        }
    }
}

/// Wire shape of a record. Target keys serialize as `null` when unmatched.
#[derive(Serialize, Deserialize)]
struct MappingRow {
    #[serde(rename = "Discogs Release Title")]
    release_title: String,
    #[serde(rename = "Discogs Track Artist")]
    track_artist: String,
    #[serde(rename = "Discogs Track Title")]
    track_title: String,
    #[serde(rename = "Spotify Album", default)]
    album: Option<String>,
    #[serde(rename = "Spotify Track Artist", default)]
    artist: Option<String>,
    #[serde(rename = "Spotify Track Title", default)]
    title: Option<String>,
    #[serde(rename = "Spotify Track ID", default)]
    track_id: Option<String>,
    #[serde(rename = "Audio Features", default)]
    features: Option<AudioFeatures>,
}

impl From<&MappingRecord> for MappingRow {
    fn from(record: &MappingRecord) -> Self {
        let (album, artist, title, track_id, features) = match &record.resolution {
            Resolution::Matched { detail, features } => (
                Some(detail.album_name.clone()),
                Some(detail.artist_names.clone()),
                Some(detail.title.clone()),
                Some(detail.track_id.clone()),
                features.clone(),
            ),
            Resolution::Unmatched => (None, None, None, None, None),
        };

        Self {
            release_title: record.source.release_title.clone(),
            track_artist: record.source.track_artist.clone(),
            track_title: record.source.track_title.clone(),
            album,
            artist,
            title,
            track_id,
            features,
        }
    }
}

impl From<MappingRow> for MappingRecord {
    fn from(row: MappingRow) -> Self {
        let source = SourceTrack {
            release_title: row.release_title,
            track_artist: row.track_artist,
            track_title: row.track_title,
        };

        // A row missing any detail field is read back as unmatched.
        let resolution = match (row.album, row.artist, row.title, row.track_id) {
            (Some(album_name), Some(artist_names), Some(title), Some(track_id)) => Resolution::Matched {
                detail: RemoteTrackDetail { album_name, artist_names, title, track_id },
                features: row.features,
            },
            _ => Resolution::Unmatched,
        };

        MappingRecord::new(source, resolution)
    }
}

impl Serialize for MappingRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        MappingRow::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MappingRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        MappingRow::deserialize(deserializer).map(MappingRecord::from)
    }
}

/// Ordered accumulation of one run's records. No dedup and no merge with a
/// previous run: the finalized collection replaces the old document whole.
#[derive(Debug, Default)]
pub struct MappingStore {
    records: Vec<MappingRecord>,
}

impl MappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: MappingRecord) {
        self.records.push(record);
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = MappingRecord>) {
        self.records.extend(records);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn matched(&self) -> usize {
        self.records.iter().filter(|r| r.is_matched()).count()
    }

    pub fn finalize(self) -> Vec<MappingRecord> {
        self.records
    }
}

/// Write the mapping document, replacing any previous file at `path`.
pub fn write_mapping(path: &Path, records: &[MappingRecord]) -> Result<()> {
    write_json_document(path, records).map_err(|source| MappingError::Io {
        path: path.display().to_string(),
        source,
    })
}

pub fn load_mapping(path: &Path) -> Result<Vec<MappingRecord>> {
    let contents = std::fs::read_to_string(path).map_err(|source| MappingError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| MappingError::Json {
        path: path.display().to_string(),
        source,
    })
}

/// Match rate over a mapping document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchStats {
    pub total: usize,
    pub matched: usize,
}

impl MatchStats {
    pub fn from_records(records: &[MappingRecord]) -> Self {
        Self {
            total: records.len(),
            matched: records.iter().filter(|r| r.is_matched()).count(),
        }
    }

    /// Matched share in percent; 0 for an empty document.
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.matched as f64 / self.total as f64 * 100.0
        }
    }
}
