//! Shared building blocks for the Sizewatch services.
//!
//! Holds the pieces that are not specific to any one service:
//! - `config`: JSON configuration with environment variable overrides
//! - `logging`: structured logging setup with HTTP-stack noise filtering

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod logging;

pub use config::Config;
pub use logging::init_logging;
