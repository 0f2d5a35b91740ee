pub mod spotify;

#[cfg(test)]
pub(crate) mod scripted;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Missing Spotify API credentials")]
    MissingCredentials,
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("HTTP error: {0}")]
    Http(#[from] ureq::Error),
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Bearer token for the remote catalog session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken(pub String);

impl AccessToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RemoteArtist {
    pub name: String,
}

/// Top album search hit.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RemoteAlbum {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<RemoteArtist>,
}

/// A track from an album listing or a track search.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RemoteTrack {
    pub id: String,
    pub name: String,
}

/// Full detail for a single remote track. All matched target fields of a
/// mapping record come from one of these.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteTrackDetail {
    pub album_name: String,
    /// Artist credits joined with ", ".
    pub artist_names: String,
    pub title: String,
    pub track_id: String,
}

/// Audio analysis attributes exactly as the remote catalog returned them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct AudioFeatures(pub serde_json::Map<String, serde_json::Value>);

impl AudioFeatures {
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.0.get(name).and_then(|v| v.as_f64())
    }
}

/// Capability interface over the remote catalog.
///
/// Lookups return `Ok(None)` for "not found" and `Err` for a non-success
/// response. Matching treats both as "no candidate"; only a failed
/// [`authenticate`](CatalogGateway::authenticate) aborts a run.
pub trait CatalogGateway {
    fn authenticate(&self) -> Result<AccessToken>;

    /// Top album hit for a release title and artist credit.
    fn search_album(&self, token: &AccessToken, title: &str, artist: &str) -> Result<Option<RemoteAlbum>>;

    fn list_album_tracks(&self, token: &AccessToken, album_id: &str) -> Result<Vec<RemoteTrack>>;

    /// Top track hit for a track title and artist credit.
    fn search_track(&self, token: &AccessToken, title: &str, artist: &str) -> Result<Option<RemoteTrack>>;

    fn track_detail(&self, token: &AccessToken, track_id: &str) -> Result<Option<RemoteTrackDetail>>;

    fn audio_features(&self, token: &AccessToken, track_id: &str) -> Result<Option<AudioFeatures>>;
}
