use crate::catalog::{LocalRelease, LocalTrack};
use crate::gateway::{AccessToken, CatalogGateway, RemoteAlbum, RemoteTrack};
use crate::mapping::{MappingRecord, Resolution, SourceTrack};
use crate::normalize::normalize_title;

/// Which lookup produced a candidate track id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Cross-reference against the resolved album's track listing.
    AlbumTracklist,
    /// Direct track search.
    TrackSearch,
}

/// Structured narration of a matching run.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchEvent<'a> {
    ReleaseStarted { title: &'a str, artist: &'a str },
    AlbumFound { album: &'a RemoteAlbum },
    AlbumNotFound { title: &'a str, artist: &'a str },
    AlbumTracksFetched { album_id: &'a str, count: usize },
    TrackNotInAlbum { title: &'a str },
    TrackCandidate { title: &'a str, candidate: &'a RemoteTrack, tier: Tier },
    TrackNotFound { title: &'a str, artist: &'a str },
    DetailUnavailable { track_id: &'a str },
    FeaturesUnavailable { track_id: &'a str },
    LookupFailed { lookup: &'static str, subject: &'a str, error: String },
    TrackMatched { title: &'a str, remote_title: &'a str, remote_artist: &'a str },
}

/// Sink for [`MatchEvent`]s.
pub trait MatchObserver {
    fn on_event(&mut self, event: &MatchEvent<'_>);
}

/// Renders match events through the `log` facade.
#[derive(Debug, Default)]
pub struct LogObserver;

impl MatchObserver for LogObserver {
    fn on_event(&mut self, event: &MatchEvent<'_>) {
        match event {
            MatchEvent::ReleaseStarted { title, artist } => {
                log::info!("Processing release: '{title}' by '{artist}'");
            }
            MatchEvent::AlbumFound { album } => {
                let artist = album.artists.first().map(|a| a.name.as_str()).unwrap_or("");
                log::info!("  Album match: '{}' by '{artist}'", album.name);
            }
            MatchEvent::AlbumNotFound { title, artist } => {
                log::info!("  No album for '{title}' by '{artist}', searching tracks individually");
            }
            MatchEvent::AlbumTracksFetched { album_id, count } => {
                log::debug!("  Fetched {count} tracks for album {album_id}");
            }
            MatchEvent::TrackNotInAlbum { title } => {
                log::debug!("  '{title}' not in album listing, searching individually");
            }
            MatchEvent::TrackCandidate { title, candidate, tier } => {
                log::debug!("  '{title}' => '{}' ({}) via {tier:?}", candidate.name, candidate.id);
            }
            MatchEvent::TrackNotFound { title, artist } => {
                log::info!("  No match for '{title}' by '{artist}'");
            }
            MatchEvent::DetailUnavailable { track_id } => {
                log::warn!("  No details for track {track_id}, recording as unmatched");
            }
            MatchEvent::FeaturesUnavailable { track_id } => {
                log::debug!("  No audio features for track {track_id}");
            }
            MatchEvent::LookupFailed { lookup, subject, error } => {
                log::warn!("  {lookup} failed for '{subject}': {error}");
            }
            MatchEvent::TrackMatched { title, remote_title, remote_artist } => {
                log::info!("  '{title}' => '{remote_title}' by '{remote_artist}'");
            }
        }
    }
}

/// Resolves local releases against the remote catalog, one release at a time.
pub struct Matcher<'a, G: CatalogGateway + ?Sized, O: MatchObserver + ?Sized> {
    gateway: &'a G,
    token: &'a AccessToken,
    observer: &'a mut O,
}

impl<'a, G: CatalogGateway + ?Sized, O: MatchObserver + ?Sized> Matcher<'a, G, O> {
    pub fn new(gateway: &'a G, token: &'a AccessToken, observer: &'a mut O) -> Self {
        Self { gateway, token, observer }
    }

    /// Produce exactly one record per track of `release`, in tracklist order.
    ///
    /// Lookup failures degrade to "no candidate" at that tier and never
    /// escape the release.
    pub fn match_release(&mut self, release: &LocalRelease) -> Vec<MappingRecord> {
        let artist = release.artist_names();
        self.observer.on_event(&MatchEvent::ReleaseStarted { title: &release.title, artist: &artist });

        // Listing fetched once per release; `None` means no album resolved.
        let album_tracks = self.resolve_album(&release.title, &artist);

        release
            .tracklist
            .iter()
            .map(|track| self.match_track(release, track, &artist, album_tracks.as_deref()))
            .collect()
    }

    fn resolve_album(&mut self, title: &str, artist: &str) -> Option<Vec<RemoteTrack>> {
        let album = match self.gateway.search_album(self.token, title, artist) {
            Ok(Some(album)) => album,
            Ok(None) => {
                self.observer.on_event(&MatchEvent::AlbumNotFound { title, artist });
                return None;
            }
            Err(e) => {
                self.observer.on_event(&MatchEvent::LookupFailed {
                    lookup: "album search",
                    subject: title,
                    error: e.to_string(),
                });
                self.observer.on_event(&MatchEvent::AlbumNotFound { title, artist });
                return None;
            }
        };
        self.observer.on_event(&MatchEvent::AlbumFound { album: &album });

        let tracks = match self.gateway.list_album_tracks(self.token, &album.id) {
            Ok(tracks) => tracks,
            Err(e) => {
                self.observer.on_event(&MatchEvent::LookupFailed {
                    lookup: "album tracks",
                    subject: &album.id,
                    error: e.to_string(),
                });
                Vec::new()
            }
        };
        self.observer.on_event(&MatchEvent::AlbumTracksFetched { album_id: &album.id, count: tracks.len() });

        Some(tracks)
    }

    fn match_track(
        &mut self,
        release: &LocalRelease,
        track: &LocalTrack,
        artist: &str,
        album_tracks: Option<&[RemoteTrack]>,
    ) -> MappingRecord {
        log::trace!("Matching track {}", track.key(release.id));

        let source = SourceTrack {
            release_title: release.title.clone(),
            track_artist: artist.to_string(),
            track_title: track.title.clone(),
        };

        let candidate = album_tracks
            .and_then(|listing| self.find_in_listing(&track.title, listing))
            .or_else(|| self.search_track(&track.title, artist));

        let resolution = match candidate {
            Some(candidate) => self.enrich(&candidate),
            None => {
                self.observer.on_event(&MatchEvent::TrackNotFound { title: &track.title, artist });
                Resolution::Unmatched
            }
        };

        if let Resolution::Matched { detail, .. } = &resolution {
            self.observer.on_event(&MatchEvent::TrackMatched {
                title: &track.title,
                remote_title: &detail.title,
                remote_artist: &detail.artist_names,
            });
        }

        MappingRecord::new(source, resolution)
    }

    /// First listing entry whose normalized name equals the normalized title.
    fn find_in_listing(&mut self, title: &str, listing: &[RemoteTrack]) -> Option<RemoteTrack> {
        let wanted = normalize_title(title);
        match listing.iter().find(|t| normalize_title(&t.name) == wanted) {
            Some(hit) => {
                self.observer.on_event(&MatchEvent::TrackCandidate {
                    title,
                    candidate: hit,
                    tier: Tier::AlbumTracklist,
                });
                Some(hit.clone())
            }
            None => {
                self.observer.on_event(&MatchEvent::TrackNotInAlbum { title });
                None
            }
        }
    }

    fn search_track(&mut self, title: &str, artist: &str) -> Option<RemoteTrack> {
        match self.gateway.search_track(self.token, title, artist) {
            Ok(Some(hit)) => {
                self.observer.on_event(&MatchEvent::TrackCandidate {
                    title,
                    candidate: &hit,
                    tier: Tier::TrackSearch,
                });
                Some(hit)
            }
            Ok(None) => None,
            Err(e) => {
                self.observer.on_event(&MatchEvent::LookupFailed {
                    lookup: "track search",
                    subject: title,
                    error: e.to_string(),
                });
                None
            }
        }
    }

    /// Fetch detail and audio features for a candidate. Both lookups always
    /// run; only a missing detail makes the track unmatched.
    fn enrich(&mut self, candidate: &RemoteTrack) -> Resolution {
        let detail = self.gateway.track_detail(self.token, &candidate.id);
        let features = self.gateway.audio_features(self.token, &candidate.id);

        let features = match features {
            Ok(Some(f)) => Some(f),
            Ok(None) => {
                self.observer.on_event(&MatchEvent::FeaturesUnavailable { track_id: &candidate.id });
                None
            }
            Err(e) => {
                self.observer.on_event(&MatchEvent::LookupFailed {
                    lookup: "audio features",
                    subject: &candidate.id,
                    error: e.to_string(),
                });
                None
            }
        };

        match detail {
            Ok(Some(detail)) => Resolution::Matched { detail, features },
            Ok(None) => {
                self.observer.on_event(&MatchEvent::DetailUnavailable { track_id: &candidate.id });
                Resolution::Unmatched
            }
            Err(e) => {
                self.observer.on_event(&MatchEvent::LookupFailed {
                    lookup: "track detail",
                    subject: &candidate.id,
                    error: e.to_string(),
                });
                self.observer.on_event(&MatchEvent::DetailUnavailable { track_id: &candidate.id });
                Resolution::Unmatched
            }
        }
    }
}
