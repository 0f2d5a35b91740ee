//! Scripted in-memory gateway for tests. Unscripted lookups answer "not found".

use std::cell::RefCell;
use std::collections::HashMap;

use super::{
    AccessToken, AudioFeatures, CatalogGateway, GatewayError, RemoteAlbum, RemoteTrack,
    RemoteTrackDetail, Result,
};

type Scripted<T> = std::result::Result<Option<T>, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Authenticate,
    SearchAlbum { title: String, artist: String },
    ListAlbumTracks(String),
    SearchTrack { title: String, artist: String },
    TrackDetail(String),
    AudioFeatures(String),
}

#[derive(Default)]
pub(crate) struct ScriptedGateway {
    auth_error: Option<String>,
    albums: HashMap<String, Scripted<RemoteAlbum>>,
    album_tracks: HashMap<String, std::result::Result<Vec<RemoteTrack>, String>>,
    tracks: HashMap<String, Scripted<RemoteTrack>>,
    details: HashMap<String, Scripted<RemoteTrackDetail>>,
    features: HashMap<String, Scripted<AudioFeatures>>,
    calls: RefCell<Vec<Call>>,
}

fn fail<T>(msg: &str) -> Result<T> {
    Err(GatewayError::Other(msg.to_string()))
}

fn replay<T: Clone>(entry: Option<&Scripted<T>>) -> Result<Option<T>> {
    match entry {
        Some(Ok(v)) => Ok(v.clone()),
        Some(Err(msg)) => fail(msg),
        None => Ok(None),
    }
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_auth(mut self, msg: &str) -> Self {
        self.auth_error = Some(msg.to_string());
        self
    }

    /// Album search for `release_title` returns this album.
    pub fn album(mut self, release_title: &str, album_id: &str, album_name: &str) -> Self {
        self.albums.insert(
            release_title.to_string(),
            Ok(Some(RemoteAlbum {
                id: album_id.to_string(),
                name: album_name.to_string(),
                artists: Vec::new(),
            })),
        );
        self
    }

    pub fn album_error(mut self, release_title: &str) -> Self {
        self.albums.insert(release_title.to_string(), Err("album search 500".into()));
        self
    }

    pub fn album_tracks(mut self, album_id: &str, tracks: &[(&str, &str)]) -> Self {
        let tracks = tracks
            .iter()
            .map(|(id, name)| RemoteTrack { id: id.to_string(), name: name.to_string() })
            .collect();
        self.album_tracks.insert(album_id.to_string(), Ok(tracks));
        self
    }

    pub fn album_tracks_error(mut self, album_id: &str) -> Self {
        self.album_tracks.insert(album_id.to_string(), Err("album tracks 502".into()));
        self
    }

    /// Track search for `track_title` returns this track.
    pub fn track(mut self, track_title: &str, track_id: &str, name: &str) -> Self {
        self.tracks.insert(
            track_title.to_string(),
            Ok(Some(RemoteTrack { id: track_id.to_string(), name: name.to_string() })),
        );
        self
    }

    pub fn track_error(mut self, track_title: &str) -> Self {
        self.tracks.insert(track_title.to_string(), Err("track search 429".into()));
        self
    }

    pub fn detail(mut self, track_id: &str, album: &str, artists: &str, title: &str) -> Self {
        self.details.insert(
            track_id.to_string(),
            Ok(Some(RemoteTrackDetail {
                album_name: album.to_string(),
                artist_names: artists.to_string(),
                title: title.to_string(),
                track_id: track_id.to_string(),
            })),
        );
        self
    }

    pub fn detail_error(mut self, track_id: &str) -> Self {
        self.details.insert(track_id.to_string(), Err("track detail 500".into()));
        self
    }

    pub fn features(mut self, track_id: &str, value: serde_json::Value) -> Self {
        let map = match value {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        self.features.insert(track_id.to_string(), Ok(Some(AudioFeatures(map))));
        self
    }

    pub fn features_error(mut self, track_id: &str) -> Self {
        self.features.insert(track_id.to_string(), Err("audio features 403".into()));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl CatalogGateway for ScriptedGateway {
    fn authenticate(&self) -> Result<AccessToken> {
        self.record(Call::Authenticate);
        match &self.auth_error {
            Some(msg) => Err(GatewayError::Auth(msg.clone())),
            None => Ok(AccessToken("scripted-token".into())),
        }
    }

    fn search_album(&self, _token: &AccessToken, title: &str, artist: &str) -> Result<Option<RemoteAlbum>> {
        self.record(Call::SearchAlbum { title: title.into(), artist: artist.into() });
        replay(self.albums.get(title))
    }

    fn list_album_tracks(&self, _token: &AccessToken, album_id: &str) -> Result<Vec<RemoteTrack>> {
        self.record(Call::ListAlbumTracks(album_id.into()));
        match self.album_tracks.get(album_id) {
            Some(Ok(tracks)) => Ok(tracks.clone()),
            Some(Err(msg)) => fail(msg),
            None => Ok(Vec::new()),
        }
    }

    fn search_track(&self, _token: &AccessToken, title: &str, artist: &str) -> Result<Option<RemoteTrack>> {
        self.record(Call::SearchTrack { title: title.into(), artist: artist.into() });
        replay(self.tracks.get(title))
    }

    fn track_detail(&self, _token: &AccessToken, track_id: &str) -> Result<Option<RemoteTrackDetail>> {
        self.record(Call::TrackDetail(track_id.into()));
        replay(self.details.get(track_id))
    }

    fn audio_features(&self, _token: &AccessToken, track_id: &str) -> Result<Option<AudioFeatures>> {
        self.record(Call::AudioFeatures(track_id.into()));
        replay(self.features.get(track_id))
    }
}
