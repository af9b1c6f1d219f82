//! Catalog configuration: which functions to describe and where they live.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;

use crate::error::{Error, Result};

/// File looked up in the working directory by [`Config::discover`].
pub const CONFIG_FILE: &str = "visualphp.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Function names eligible for the catalog.
    pub allow_list: Vec<String>,
    /// PHP files whose top-level functions make up the registry.
    pub sources: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            allow_list: vec!["add".to_string(), "multiply".to_string()],
            sources: vec![Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/functions.php")],
        }
    }
}

impl Config {
    /// Loads `visualphp.toml` from the working directory, falling back to
    /// the defaults when there is none.
    pub fn discover() -> Result<Self> {
        let path = Path::new(CONFIG_FILE);
        if path.is_file() {
            Self::load(path)
        } else {
            debug!("no {} found, using the default config", CONFIG_FILE);
            Ok(Self::default())
        }
    }

    /// Relative source paths are resolved against the config file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let mut config: Self = toml::from_str(&text).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        for source in config.sources.iter_mut() {
            if source.is_relative() {
                *source = base.join(&*source);
            }
        }
        debug!("loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    pub fn allows(&self, name: &str) -> bool {
        self.allow_list.iter().any(|allowed| allowed == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.allows("add"));
        assert!(config.allows("multiply"));
        assert!(!config.allows("Add"));
        assert!(config.sources[0].ends_with("demos/functions.php"));
    }

    #[test]
    fn test_load_resolves_relative_sources() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "allow_list = [\"greet\"]").unwrap();
        writeln!(file, "sources = [\"lib/functions.php\", \"/abs/more.php\"]").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.allow_list, vec!["greet".to_string()]);
        assert_eq!(config.sources[0], dir.path().join("lib/functions.php"));
        assert_eq!(config.sources[1], PathBuf::from("/abs/more.php"));
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "allow_list = []\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert!(config.allow_list.is_empty());
        assert_eq!(config.sources, Config::default().sources);
    }

    #[test]
    fn test_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "allow_list = 3\n").unwrap();
        assert!(matches!(Config::load(&path), Err(Error::Config { .. })));
        assert!(matches!(
            Config::load(&dir.path().join("missing.toml")),
            Err(Error::Io { .. })
        ));
    }
}
