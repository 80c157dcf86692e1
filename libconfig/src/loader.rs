//! Load options and the entry points that build a [`Config`] from text.

use std::{
    fs,
    io::Read,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    error::Result,
    fault::{Fault, Translator},
    format::parse,
};

/// Name reported in parse errors for in-memory sources.
pub const STRING_SOURCE: &str = "<string>";

const DEFAULT_MAX_INCLUDE_DEPTH: usize = 10;

/// Options controlling how settings text is loaded.
///
/// Can be read from TOML:
///
/// ```toml
/// include_dir = "/etc/myapp/conf.d"
/// max_include_depth = 4
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoadOptions {
    /// Base directory for relative `@include` names.
    ///
    /// When unset, names resolve against the including file's directory,
    /// or the working directory for in-memory sources.
    pub include_dir: Option<PathBuf>,
    /// Maximum nesting of `@include` directives.
    pub max_include_depth: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            include_dir: None,
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }
}

/// Builds [`Config`]s from text, files and readers.
///
/// A failed load never yields a partially built store.
#[derive(Debug, Clone, Default)]
pub struct Loader {
    options: LoadOptions,
}

impl Loader {
    pub fn new(options: LoadOptions) -> Self {
        Self { options }
    }

    pub fn with_include_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.include_dir = Some(dir.into());
        self
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    pub fn load_str(&self, text: &str) -> Result<Config> {
        self.load_named(text, STRING_SOURCE)
    }

    /// Parses `text`, reporting errors against `name`.
    pub fn load_named(&self, text: &str, name: &str) -> Result<Config> {
        Translator::new("load").run(|| parse::parse_document(text, name, None, &self.options))
    }

    pub fn load_reader(&self, mut reader: impl Read, name: &str) -> Result<Config> {
        Translator::new("load").run(|| {
            let mut text = String::new();
            reader.read_to_string(&mut text)?;
            parse::parse_document(&text, name, None, &self.options)
        })
    }

    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        debug!("loading settings from {}", path.display());
        Translator::new("load").run(|| {
            let text = fs::read_to_string(path).map_err(|e| {
                Fault::Io(std::io::Error::new(
                    e.kind(),
                    format!("failed to read {}: {e}", path.display()),
                ))
            })?;
            let name = path.display().to_string();
            parse::parse_document(&text, &name, path.parent(), &self.options)
        })
    }
}
