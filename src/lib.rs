pub mod catalog;
pub mod config;
pub mod discogs;
pub mod document;
pub mod gateway;
pub mod mapping;
pub mod matching;
pub mod normalize;
pub mod runner;

/// Application name for XDG paths
pub const APP_NAME: &str = "discomatch";
