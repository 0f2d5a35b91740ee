use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use discomatch::catalog::{load_catalog, search_tracks};
use discomatch::config::AppConfig;
use discomatch::discogs::{fetch_collection, DiscogsClient};
use discomatch::document::write_json_document;
use discomatch::gateway::spotify::SpotifyGateway;
use discomatch::mapping::{load_mapping, MatchStats};
use discomatch::matching::LogObserver;

#[derive(Parser)]
#[command(name = "discomatch", version, about = "Match a Discogs collection against Spotify")]
struct Cli {
    /// Path to the local Discogs collection document
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Path to the Discogs→Spotify mapping document
    #[arg(long, global = true)]
    mapping: Option<PathBuf>,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the Discogs collection with full release details
    Fetch,

    /// Match collection tracks against Spotify and write the mapping document
    Match {
        /// Maximum number of releases to process (overrides MATCH_LIMIT)
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Process releases in random order
        #[arg(long)]
        shuffle: bool,
    },

    /// Show how many tracks in the mapping document were matched
    Stats,

    /// Search collection track titles (substring, case-insensitive)
    Search {
        /// Text to look for in track titles
        query: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Config file first, then environment, then CLI flags
    let mut config = AppConfig::load().with_env();
    if cli.catalog.is_some() {
        config.catalog_path = cli.catalog;
    }
    if cli.mapping.is_some() {
        config.mapping_path = cli.mapping;
    }

    match cli.command {
        Commands::Fetch => {
            let username = config
                .discogs
                .username
                .clone()
                .context("Missing Discogs username. Set DISCOGS_USERNAME or discogs.username in config.")?;
            let client = DiscogsClient::new(
                config.discogs.token.clone(),
                Duration::from_secs(config.discogs.rate_limit_wait_secs),
            );

            let result = fetch_collection(
                &client,
                &username,
                config.discogs.per_page,
                Duration::from_millis(config.discogs.page_pause_ms),
            )
            .context("Collection fetch failed")?;

            let path = config.catalog_path();
            write_json_document(&path, &result.releases)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "Saved {} releases to {} ({} pages, {} failed)",
                result.releases.len(),
                path.display(),
                result.pages,
                result.failed
            );
        }

        Commands::Match { limit, shuffle } => {
            let run_config = config.run_config(limit, shuffle);
            let gateway = SpotifyGateway::new(config.spotify_credentials());

            let summary = discomatch::runner::run(&gateway, &run_config, &mut LogObserver)
                .context("Match run failed")?;

            let stats = MatchStats {
                total: summary.total_tracks,
                matched: summary.matched_tracks,
            };
            println!(
                "Match complete: {} releases, {} tracks, {} matched ({:.2}%)",
                summary.releases_processed,
                stats.total,
                stats.matched,
                stats.percentage()
            );
            println!("Saved mapping to {}", summary.output.display());
        }

        Commands::Stats => {
            let path = config.mapping_path();
            let records = load_mapping(&path).context("Failed to load mapping document")?;
            let stats = MatchStats::from_records(&records);
            println!("Total tracks searched: {}", stats.total);
            println!("Matched tracks: {}", stats.matched);
            println!("Match percentage: {:.2}%", stats.percentage());
        }

        Commands::Search { query } => {
            let path = config.catalog_path();
            if !path.exists() {
                anyhow::bail!("Collection file {} not found. Run `discomatch fetch` first.", path.display());
            }
            let releases = load_catalog(&path).context("Failed to load collection")?;
            let hits = search_tracks(&releases, query.trim());

            if hits.is_empty() {
                println!("No tracks found matching \"{}\".", query);
                return Ok(());
            }

            for (i, hit) in hits.iter().enumerate() {
                println!("Result {}:", i + 1);
                println!("  Artist: {}", hit.artist);
                println!("  Track Title: {}", hit.track_title);
                println!("  Release Title: {}", hit.release_title);
                match hit.year {
                    Some(year) if year > 0 => println!("  Year: {year}"),
                    _ => println!("  Year: Unknown"),
                }
                println!("  Genre(s): {}", join_or_unknown(hit.genres));
                println!("  Style(s): {}", join_or_unknown(hit.styles));
                println!("{}", "-".repeat(40));
            }
        }
    }

    Ok(())
}

fn join_or_unknown(values: &[String]) -> String {
    if values.is_empty() {
        "Unknown".to_string()
    } else {
        values.join(", ")
    }
}
