//! # Scribe Configuration Library
//!
//! Typed configuration for the scribe capability and periodic-write system.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scribe_config::ScribeConfig;
//!
//! let config = ScribeConfig::load_or_default(&ScribeConfig::default_path())?;
//! let descriptor_mode = config.writer.access_mode;
//! # Ok::<(), scribe_config::ConfigError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod components;
mod config;

pub use components::*;
pub use config::*;
