use std::path::PathBuf;
use std::thread;

use indicatif::{ProgressBar, ProgressStyle};
use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

use crate::catalog::{load_catalog, CatalogError};
use crate::config::RunConfig;
use crate::gateway::{CatalogGateway, GatewayError};
use crate::mapping::{write_mapping, MappingError, MappingStore};
use crate::matching::{MatchObserver, Matcher};

#[derive(Error, Debug)]
pub enum RunError {
    #[error("Local catalog not found at {0}. Run `discomatch fetch` first.")]
    CatalogMissing(String),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("Spotify authentication failed: {0}")]
    Auth(#[source] GatewayError),
    #[error(transparent)]
    Mapping(#[from] MappingError),
}

/// Result of a match run.
#[derive(Debug)]
pub struct RunSummary {
    pub releases_processed: usize,
    pub total_tracks: usize,
    pub matched_tracks: usize,
    pub output: PathBuf,
}

/// Match the local catalog against the remote catalog and write the mapping
/// document.
///
/// Fatal conditions (missing catalog, failed authentication) return before
/// any release is processed and leave an existing mapping document untouched.
pub fn run<G, O>(gateway: &G, config: &RunConfig, observer: &mut O) -> Result<RunSummary, RunError>
where
    G: CatalogGateway + ?Sized,
    O: MatchObserver + ?Sized,
{
    run_with_rng(gateway, config, observer, &mut rand::thread_rng())
}

/// [`run`] with an explicit RNG for the release shuffle.
pub fn run_with_rng<G, O, R>(
    gateway: &G,
    config: &RunConfig,
    observer: &mut O,
    rng: &mut R,
) -> Result<RunSummary, RunError>
where
    G: CatalogGateway + ?Sized,
    O: MatchObserver + ?Sized,
    R: Rng + ?Sized,
{
    if !config.catalog_path.exists() {
        return Err(RunError::CatalogMissing(config.catalog_path.display().to_string()));
    }

    let mut releases = load_catalog(&config.catalog_path)?;
    log::info!("Loaded {} releases from {}", releases.len(), config.catalog_path.display());

    if config.shuffle {
        log::info!("Shuffling releases for random order");
        releases.shuffle(rng);
    }

    let token = gateway.authenticate().map_err(RunError::Auth)?;

    // A limit of 0 means no limit, same as leaving it unset.
    let count = match config.limit {
        Some(n) if n > 0 => n.min(releases.len()),
        _ => releases.len(),
    };

    let pb = ProgressBar::new(count as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} releases ({eta}) {msg}"
        )
        .unwrap()
        .progress_chars("#>-"),
    );

    let mut store = MappingStore::new();
    let mut matcher = Matcher::new(gateway, &token, observer);

    for release in &releases[..count] {
        pb.set_message(release.title.clone());
        store.extend(matcher.match_release(release));
        pb.inc(1);

        // Fixed courtesy pause for the remote rate limit
        if !config.pace.is_zero() {
            thread::sleep(config.pace);
        }
    }
    pb.finish_and_clear();

    let total_tracks = store.len();
    let matched_tracks = store.matched();
    let records = store.finalize();

    write_mapping(&config.mapping_path, &records)?;
    log::info!("Saved {} mapping records to {}", records.len(), config.mapping_path.display());

    Ok(RunSummary {
        releases_processed: count,
        total_tracks,
        matched_tracks,
        output: config.mapping_path.clone(),
    })
}
