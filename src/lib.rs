//! Spotify Listening-History Daemon Library
//!
//! This library provides the building blocks for a small daemon that watches
//! a Spotify account, records tracks that genuinely finished playing, and
//! keeps locally cached artist metadata fresh. Two periodic tasks (the
//! playback tracker and the artist updater) run on a shared scheduler; both
//! obtain bearer tokens from a single credential manager.
//!
//! # Modules
//!
//! - `api` - HTTP API endpoints for the local callback server
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration management and environment variables
//! - `management` - Token lifecycle, byte cache and local persistence
//! - `scheduler` - Generic periodic-task scheduler
//! - `server` - Local HTTP server for OAuth callbacks
//! - `spotify` - Spotify Web API client implementation
//! - `tracker` - Playback state machine and polling cycle
//! - `types` - Data structures and type definitions
//! - `updater` - Staleness classification and batch artist refresh

use std::{future::Future, pin::Pin};

pub mod api;
pub mod cli;
pub mod config;
pub mod management;
pub mod scheduler;
pub mod server;
pub mod spotify;
pub mod tracker;
pub mod types;
pub mod updater;

/// A convenient Result type alias for operations that may fail.
///
/// Provides a standard error handling pattern throughout the application
/// using a boxed dynamic error trait object. This allows for flexible
/// error handling while maintaining Send + Sync bounds for async contexts.
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// A boxed, sendable future.
///
/// Used wherever a closure has to produce a future as plain data: scheduler
/// task actions and the injected wait primitive of the token manager.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Prints an informational message with a blue bullet point.
///
/// The macro accepts the same arguments as `println!`, supporting format
/// strings and interpolation.
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// This macro will cause the program to exit immediately after printing the
/// error message. It should only be used for fatal errors where recovery is
/// not possible, which in this crate means the composition root and the
/// authorization bootstrap.
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// Used for recoverable issues: a failed poll cycle, a skipped update run,
/// anything the next scheduled iteration may succeed at.
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
