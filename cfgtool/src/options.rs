//! Load options assembled from an optional TOML file and command-line flags.
//!
//! ```toml
//! include_dir = "conf.d"
//! max_include_depth = 4
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use libconfig::{LoadOptions, Loader};

/// Builds the loader; `--include-dir` overrides the file's `include_dir`.
pub fn loader(options_file: Option<&Path>, include_dir: Option<PathBuf>) -> anyhow::Result<Loader> {
    let mut options = match options_file {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            toml::from_str::<LoadOptions>(&content)
                .with_context(|| format!("Invalid load options in {}", path.display()))?
        }
        None => LoadOptions::default(),
    };
    if let Some(dir) = include_dir {
        options.include_dir = Some(dir);
    }
    Ok(Loader::new(options))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("opts.toml");
        fs::write(&file, "include_dir = \"from-file\"\nmax_include_depth = 2\n").unwrap();

        let loader = loader(Some(&file), None).unwrap();
        assert_eq!(loader.options().include_dir, Some(PathBuf::from("from-file")));
        assert_eq!(loader.options().max_include_depth, 2);

        let loader = super::loader(Some(&file), Some(PathBuf::from("flag"))).unwrap();
        assert_eq!(loader.options().include_dir, Some(PathBuf::from("flag")));
    }

    #[test]
    fn test_defaults_without_file() {
        let loader = loader(None, None).unwrap();
        assert_eq!(loader.options(), &LoadOptions::default());
    }

    #[test]
    fn test_bad_options_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("opts.toml");
        fs::write(&file, "max_include_depth = \"deep\"").unwrap();
        let err = loader(Some(&file), None).unwrap_err();
        assert!(err.to_string().contains("Invalid load options"));
    }
}
