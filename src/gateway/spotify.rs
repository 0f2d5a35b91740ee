use std::time::Duration;

use serde::Deserialize;

use super::{
    AccessToken, AudioFeatures, CatalogGateway, GatewayError, RemoteAlbum, RemoteArtist,
    RemoteTrack, RemoteTrackDetail, Result,
};
use crate::normalize::join_artists;

const AUTH_URL: &str = "https://accounts.spotify.com/api/token";
const API_BASE: &str = "https://api.spotify.com/v1";

/// Spotify returns at most 50 items per album-tracks page.
const ALBUM_TRACKS_PAGE: &str = "50";

/// Client-credentials pair for the Spotify Web API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Blocking Spotify Web API client.
pub struct SpotifyGateway {
    credentials: Option<SpotifyCredentials>,
    agent: ureq::Agent,
    auth_url: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct AlbumSearchResponse {
    albums: Option<Page<RemoteAlbum>>,
}

#[derive(Debug, Deserialize)]
struct TrackSearchResponse {
    tracks: Option<Page<RemoteTrack>>,
}

/// Track object from `GET /tracks/{id}` (partial).
#[derive(Debug, Deserialize)]
struct TrackObject {
    name: Option<String>,
    album: Option<AlbumRef>,
    #[serde(default)]
    artists: Vec<RemoteArtist>,
}

#[derive(Debug, Deserialize)]
struct AlbumRef {
    name: Option<String>,
}

impl TrackObject {
    fn into_detail(self, track_id: &str) -> RemoteTrackDetail {
        RemoteTrackDetail {
            album_name: self
                .album
                .and_then(|a| a.name)
                .unwrap_or_else(|| "Unknown Album".to_string()),
            artist_names: join_artists(self.artists.iter().map(|a| a.name.as_str())),
            title: self.name.unwrap_or_else(|| "Unknown Track".to_string()),
            track_id: track_id.to_string(),
        }
    }
}

impl SpotifyGateway {
    /// Credentials may be absent; `authenticate` then fails and the run aborts.
    pub fn new(credentials: Option<SpotifyCredentials>) -> Self {
        Self::with_endpoints(credentials, AUTH_URL, API_BASE)
    }

    /// Client talking to a different token endpoint and API root.
    pub fn with_endpoints(credentials: Option<SpotifyCredentials>, auth_url: &str, api_base: &str) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(30)))
            .build();

        Self {
            credentials,
            agent: ureq::Agent::new_with_config(config),
            auth_url: auth_url.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    fn bearer(token: &AccessToken) -> String {
        format!("Bearer {}", token.as_str())
    }

    fn search_query(field: &str, title: &str, artist: &str) -> String {
        format!("{field}:{title} artist:{artist}")
    }

    /// GET a JSON resource, mapping 404 to `Ok(None)`.
    fn get_optional<T: serde::de::DeserializeOwned>(
        &self,
        token: &AccessToken,
        path: &str,
    ) -> Result<Option<T>> {
        let url = format!("{}{path}", self.api_base);
        log::debug!("GET {url}");

        match self.agent.get(&url).header("Authorization", &Self::bearer(token)).call() {
            Ok(mut response) => Ok(Some(response.body_mut().read_json::<T>()?)),
            Err(ureq::Error::StatusCode(404)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl CatalogGateway for SpotifyGateway {
    fn authenticate(&self) -> Result<AccessToken> {
        let creds = self.credentials.as_ref().ok_or(GatewayError::MissingCredentials)?;

        let response = self.agent.post(&self.auth_url).send_form([
            ("grant_type", "client_credentials"),
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
        ]);

        let token: TokenResponse = match response {
            Ok(mut resp) => resp.body_mut().read_json()?,
            Err(ureq::Error::StatusCode(code)) => {
                return Err(GatewayError::Auth(format!("token endpoint returned {code}")));
            }
            Err(e) => return Err(e.into()),
        };

        log::info!("Authenticated with Spotify");
        Ok(AccessToken(token.access_token))
    }

    fn search_album(&self, token: &AccessToken, title: &str, artist: &str) -> Result<Option<RemoteAlbum>> {
        let url = format!("{}/search", self.api_base);
        let response: AlbumSearchResponse = self
            .agent
            .get(&url)
            .header("Authorization", &Self::bearer(token))
            .query("q", Self::search_query("album", title, artist))
            .query("type", "album")
            .query("limit", "1")
            .call()?
            .body_mut()
            .read_json()?;

        Ok(response.albums.and_then(|p| p.items.into_iter().next()))
    }

    fn list_album_tracks(&self, token: &AccessToken, album_id: &str) -> Result<Vec<RemoteTrack>> {
        let url = format!("{}/albums/{album_id}/tracks", self.api_base);
        let page: Page<RemoteTrack> = self
            .agent
            .get(&url)
            .header("Authorization", &Self::bearer(token))
            .query("limit", ALBUM_TRACKS_PAGE)
            .call()?
            .body_mut()
            .read_json()?;

        Ok(page.items)
    }

    fn search_track(&self, token: &AccessToken, title: &str, artist: &str) -> Result<Option<RemoteTrack>> {
        let url = format!("{}/search", self.api_base);
        let response: TrackSearchResponse = self
            .agent
            .get(&url)
            .header("Authorization", &Self::bearer(token))
            .query("q", Self::search_query("track", title, artist))
            .query("type", "track")
            .query("limit", "1")
            .call()?
            .body_mut()
            .read_json()?;

        Ok(response.tracks.and_then(|p| p.items.into_iter().next()))
    }

    fn track_detail(&self, token: &AccessToken, track_id: &str) -> Result<Option<RemoteTrackDetail>> {
        let track: Option<TrackObject> = self.get_optional(token, &format!("/tracks/{track_id}"))?;
        Ok(track.map(|t| t.into_detail(track_id)))
    }

    fn audio_features(&self, token: &AccessToken, track_id: &str) -> Result<Option<AudioFeatures>> {
        self.get_optional(token, &format!("/audio-features/{track_id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Answer a single HTTP request on a local port with `status` and `body`.
    /// Returns the base URL and a handle yielding the request line.
    fn serve_once(status: &str, body: &str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );

        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();

            let mut content_length = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap();
                    }
                }
            }
            let mut request_body = vec![0; content_length];
            reader.read_exact(&mut request_body).unwrap();

            let mut stream = reader.into_inner();
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
            request_line
        });

        (base, handle)
    }

    fn creds() -> Option<SpotifyCredentials> {
        Some(SpotifyCredentials { client_id: "id".into(), client_secret: "secret".into() })
    }

    fn token() -> AccessToken {
        AccessToken("tok".into())
    }

    #[test]
    fn test_search_query_format() {
        assert_eq!(
            SpotifyGateway::search_query("album", "Kind Of Blue", "Miles Davis"),
            "album:Kind Of Blue artist:Miles Davis"
        );
    }

    #[test]
    fn test_album_search_response_top_hit() {
        let json = r#"{"albums": {"href": "x", "items": [
            {"id": "1weenld61qoidwYuZ1GESA", "name": "Kind Of Blue", "artists": [{"name": "Miles Davis"}]},
            {"id": "other", "name": "Kind Of Blue (Legacy)", "artists": []}
        ]}}"#;
        let r: AlbumSearchResponse = serde_json::from_str(json).unwrap();
        let top = r.albums.and_then(|p| p.items.into_iter().next()).unwrap();
        assert_eq!(top.id, "1weenld61qoidwYuZ1GESA");
    }

    #[test]
    fn test_track_search_response_empty() {
        let r: TrackSearchResponse = serde_json::from_str(r#"{"tracks": {"items": []}}"#).unwrap();
        assert!(r.tracks.and_then(|p| p.items.into_iter().next()).is_none());

        let r: TrackSearchResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(r.tracks.is_none());
    }

    #[test]
    fn test_track_object_into_detail() {
        let json = r#"{
            "name": "So What",
            "album": {"name": "Kind Of Blue"},
            "artists": [{"name": "Miles Davis"}, {"name": "John Coltrane"}]
        }"#;
        let t: TrackObject = serde_json::from_str(json).unwrap();
        let d = t.into_detail("abc123");
        assert_eq!(d.album_name, "Kind Of Blue");
        assert_eq!(d.artist_names, "Miles Davis, John Coltrane");
        assert_eq!(d.title, "So What");
        assert_eq!(d.track_id, "abc123");
    }

    #[test]
    fn test_track_object_missing_fields() {
        let t: TrackObject = serde_json::from_str("{}").unwrap();
        let d = t.into_detail("id");
        assert_eq!(d.album_name, "Unknown Album");
        assert_eq!(d.title, "Unknown Track");
        assert_eq!(d.artist_names, "");
    }

    #[test]
    fn test_authenticate_without_credentials() {
        let gw = SpotifyGateway::new(None);
        assert!(matches!(gw.authenticate(), Err(GatewayError::MissingCredentials)));
    }

    #[test]
    fn test_authenticate_reads_token() {
        let (base, server) = serve_once("200 OK", r#"{"access_token": "abc", "token_type": "Bearer"}"#);
        let gw = SpotifyGateway::with_endpoints(creds(), &format!("{base}/api/token"), &base);

        let token = gw.authenticate().unwrap();

        assert_eq!(token.as_str(), "abc");
        assert!(server.join().unwrap().starts_with("POST /api/token"));
    }

    #[test]
    fn test_authenticate_rejected_is_auth_error() {
        let (base, server) = serve_once("401 Unauthorized", r#"{"error": "invalid_client"}"#);
        let gw = SpotifyGateway::with_endpoints(creds(), &format!("{base}/api/token"), &base);

        let err = gw.authenticate().unwrap_err();

        assert!(matches!(err, GatewayError::Auth(ref msg) if msg.contains("401")));
        server.join().unwrap();
    }

    #[test]
    fn test_track_detail_not_found_is_none() {
        let (base, server) = serve_once("404 Not Found", r#"{"error": {"status": 404}}"#);
        let gw = SpotifyGateway::with_endpoints(None, "unused", &base);

        assert!(gw.track_detail(&token(), "gone").unwrap().is_none());
        assert!(server.join().unwrap().starts_with("GET /tracks/gone"));
    }

    #[test]
    fn test_audio_features_found() {
        let (base, server) = serve_once("200 OK", r#"{"danceability": 0.5, "tempo": 120.0}"#);
        let gw = SpotifyGateway::with_endpoints(None, "unused", &format!("{base}/"));

        let features = gw.audio_features(&token(), "abc").unwrap().unwrap();

        assert_eq!(features.get_f64("tempo"), Some(120.0));
        assert!(server.join().unwrap().starts_with("GET /audio-features/abc"));
    }

    #[test]
    fn test_server_error_is_err() {
        let (base, server) = serve_once("500 Internal Server Error", "{}");
        let gw = SpotifyGateway::with_endpoints(None, "unused", &base);

        let err = gw.search_album(&token(), "Kind Of Blue", "Miles Davis").unwrap_err();

        assert!(matches!(err, GatewayError::Http(ureq::Error::StatusCode(500))));
        assert!(server.join().unwrap().starts_with("GET /search?"));
    }

    #[test]
    fn test_features_server_error_is_err_not_none() {
        let (base, server) = serve_once("503 Service Unavailable", "{}");
        let gw = SpotifyGateway::with_endpoints(None, "unused", &base);

        assert!(gw.audio_features(&token(), "abc").is_err());
        server.join().unwrap();
    }
}
