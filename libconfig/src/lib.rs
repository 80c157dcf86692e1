//! # libconfig
//!
//! A safe, owned settings tree for the libconfig configuration format.
//!
//! Settings files hold typed scalars (booleans, 32/64-bit integers, floats,
//! strings) organised into groups, arrays and lists. This crate loads such a
//! file into an arena-backed tree, resolves path expressions against it,
//! reads and writes values through width-checked accessors and writes the
//! tree back out. Every failure is returned as a [`ConfigError`].
//!
//! ## Quick Start
//!
//! ```rust
//! use libconfig::{Config, ConfigError};
//!
//! let cfg = Config::load_str(
//!     r#"server = { port = 8080; host = "localhost"; tags = [1, 2, 3]; };"#,
//! ).unwrap();
//!
//! assert_eq!(cfg.lookup_value::<i32>("server.port").unwrap(), 8080);
//! assert_eq!(cfg.lookup("server.tags.[1]").unwrap().get::<i32>().unwrap(), 2);
//! assert_eq!(
//!     cfg.lookup_value::<i32>("server.missing"),
//!     Err(ConfigError::NotFound { path: "server.missing".to_string() })
//! );
//! ```
//!
//! ## Modules
//!
//! - [`config`] - The store: load, save, lookup and mutation
//! - [`setting`] - Borrowed view of a single setting
//! - [`path`] - Path expressions (`server.ports.[0]`) and resolution
//! - [`value`] - Type tags, scalar values and the typed codec
//! - [`iter`] - Child iteration and modification-checked cursors
//! - [`loader`] - Load options and `@include` handling
//! - [`format`] - Text format reader and writer
//! - [`error`] - Error types and result definitions

#[macro_use]
extern crate log;

mod arena;
mod fault;

/// The settings store.
pub mod config;

/// Error types and result definitions.
pub mod error;

/// Text format reader and writer.
pub mod format;

/// Child iteration.
pub mod iter;

/// Load options and entry points.
pub mod loader;

/// Path expressions and resolution.
pub mod path;

/// Borrowed setting views.
pub mod setting;

/// Type tags, scalar values and the typed codec.
pub mod value;

pub use arena::{SettingId, SourceLocation};
pub use config::Config;
pub use error::{ConfigError, Result};
pub use iter::{ChildCursor, Children};
pub use loader::{LoadOptions, Loader};
pub use path::{Path, Segment};
pub use setting::Setting;
pub use value::{FromSetting, IntoSetting, SettingType, Value};
