//! Singer tap for the Algolia Analytics API.
//!
//! Wires the extraction engine to a JSON config file, an on-disk state
//! document and Singer messages on stdout.

pub mod config;
pub mod output;
pub mod runner;

pub use config::{load_config, load_config_with, API_KEY_ENV, APPLICATION_ID_ENV};
pub use output::{discover_catalog, SingerWriter};
pub use runner::Tap;
