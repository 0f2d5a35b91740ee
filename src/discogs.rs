use std::thread;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use thiserror::Error;

const API_BASE: &str = "https://api.discogs.com";
const USER_AGENT: &str = concat!("discomatch/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum DiscogsError {
    #[error("HTTP error: {0}")]
    Http(#[from] ureq::Error),
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, DiscogsError>;

/// One page of `GET /users/{username}/collection/folders/0/releases` (partial).
#[derive(Debug, Deserialize)]
pub struct CollectionPage {
    #[serde(default)]
    pub releases: Vec<CollectionItem>,
}

#[derive(Debug, Deserialize)]
pub struct CollectionItem {
    pub id: u64,
}

/// Read access to a Discogs user's collection.
pub trait CollectionSource {
    fn collection_page(&self, username: &str, page: u32, per_page: usize) -> Result<CollectionPage>;

    /// Full release document, including its tracklist.
    fn release(&self, release_id: u64) -> Result<serde_json::Value>;
}

/// Blocking Discogs API client using a personal access token.
pub struct DiscogsClient {
    agent: ureq::Agent,
    token: Option<String>,
    rate_limit_wait: Duration,
}

impl DiscogsClient {
    pub fn new(token: Option<String>, rate_limit_wait: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(30)))
            .build();

        Self {
            agent: ureq::Agent::new_with_config(config),
            token,
            rate_limit_wait,
        }
    }

    /// GET JSON, waiting and retrying while the API answers 429.
    fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str, params: &[(&str, String)]) -> Result<T> {
        loop {
            let mut req = self.agent.get(url).header("User-Agent", USER_AGENT);
            if let Some(token) = &self.token {
                req = req.header("Authorization", &format!("Discogs token={token}"));
            }
            for (k, v) in params {
                req = req.query(k, v);
            }

            match req.call() {
                Ok(mut resp) => return Ok(resp.body_mut().read_json::<T>()?),
                Err(ureq::Error::StatusCode(429)) => {
                    log::warn!(
                        "Rate limit exceeded. Waiting {} seconds...",
                        self.rate_limit_wait.as_secs()
                    );
                    thread::sleep(self.rate_limit_wait);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl CollectionSource for DiscogsClient {
    fn collection_page(&self, username: &str, page: u32, per_page: usize) -> Result<CollectionPage> {
        let url = format!("{API_BASE}/users/{username}/collection/folders/0/releases");
        log::debug!("Fetching collection page {page} for {username}");
        self.get_json(&url, &[("page", page.to_string()), ("per_page", per_page.to_string())])
    }

    fn release(&self, release_id: u64) -> Result<serde_json::Value> {
        let url = format!("{API_BASE}/releases/{release_id}");
        log::debug!("Fetching release {release_id}");
        self.get_json(&url, &[])
    }
}

/// Result of a collection fetch.
pub struct FetchResult {
    pub releases: Vec<serde_json::Value>,
    pub pages: u32,
    pub failed: usize,
}

/// Download every release in the user's collection, with full details.
///
/// A release whose detail lookup fails is skipped and counted; a failed page
/// aborts the fetch so a partial collection never replaces a complete one.
pub fn fetch_collection<S: CollectionSource + ?Sized>(
    source: &S,
    username: &str,
    per_page: usize,
    page_pause: Duration,
) -> Result<FetchResult> {
    if per_page == 0 {
        return Err(DiscogsError::Other("per_page must be at least 1".into()));
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {pos} releases {msg}")
            .unwrap(),
    );

    let mut result = FetchResult {
        releases: Vec::new(),
        pages: 0,
        failed: 0,
    };
    let mut page = 1;

    loop {
        pb.set_message(format!("page {page}"));
        let listing = source.collection_page(username, page, per_page)?;
        result.pages += 1;

        for item in &listing.releases {
            match source.release(item.id) {
                Ok(release) => {
                    result.releases.push(release);
                    pb.inc(1);
                }
                Err(e) => {
                    result.failed += 1;
                    log::warn!("Error fetching release {}: {e}", item.id);
                }
            }
        }

        if listing.releases.len() < per_page {
            break;
        }
        page += 1;

        if !page_pause.is_zero() {
            thread::sleep(page_pause);
        }
    }

    pb.finish_and_clear();
    Ok(result)
}
