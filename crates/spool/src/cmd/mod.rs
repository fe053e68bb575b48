//! Command implementations for the spool CLI

pub mod bench;
pub mod clean;
pub mod pipe;
pub mod retention;

use spool_config::Config;
use spool_sinks::StreamOptions;

/// Options for `stream`: its config entry if there is one, defaults otherwise
pub fn stream_options(config: &Config, stream: &str) -> StreamOptions {
    match config.stream(stream) {
        Some(stream_config) => StreamOptions::from_config(stream_config),
        None => StreamOptions::new(stream),
    }
}
