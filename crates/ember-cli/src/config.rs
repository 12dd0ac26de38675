//! Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for ember
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address of the generation server
    pub server_url: Option<String>,
    /// Directory where transcripts are saved
    pub transcripts_dir: Option<String>,
    /// Give up connecting to the server after this many seconds
    pub connect_timeout_secs: Option<u64>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ember")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("EMBER_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Default transcript directory
    pub fn default_transcripts_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ember")
            .join("transcripts")
    }

    /// Load config from the default location
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load config from a file, falling back to defaults if it is missing or invalid
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Save config to a file
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let default_config = Config {
            server_url: Some(ember_stream::HttpTransport::DEFAULT_URL.to_string()),
            transcripts_dir: None,
            connect_timeout_secs: Some(10),
        };
        default_config.save_to(&path)?;
        Ok(path)
    }

    /// Transcript directory, expanding a leading `~/`
    pub fn transcripts_dir(&self) -> PathBuf {
        match self.transcripts_dir.as_deref() {
            Some(dir) => expand_home(dir),
            None => Self::default_transcripts_dir(),
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# ember configuration file
# Place at ~/.config/ember/config.toml (Linux) or set EMBER_CONFIG_PATH

# Address of the generation server (POST /chat)
server_url = "http://localhost:8000"

# Where /save writes transcripts (defaults to the local data directory)
# transcripts_dir = "~/chats"

# Stop waiting for the server to accept a connection after this many seconds.
# Generation itself is never timed out.
connect_timeout_secs = 10
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_parses() {
        let config: Config = toml::from_str(example_config()).unwrap();
        assert_eq!(config.server_url.as_deref(), Some("http://localhost:8000"));
        assert_eq!(config.connect_timeout_secs, Some(10));
        assert!(config.transcripts_dir.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("config.toml");
        let config = Config {
            server_url: Some("http://10.0.0.5:8000".into()),
            transcripts_dir: Some("/tmp/chats".into()),
            connect_timeout_secs: None,
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path), config);
    }

    #[test]
    fn test_missing_or_invalid_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::load_from(&dir.path().join("none.toml")), Config::default());

        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "server_url = [").unwrap();
        assert_eq!(Config::load_from(&bad), Config::default());
    }

    #[test]
    fn test_transcripts_dir() {
        let config = Config {
            transcripts_dir: Some("/var/chats".into()),
            ..Default::default()
        };
        assert_eq!(config.transcripts_dir(), PathBuf::from("/var/chats"));
        assert!(
            Config::default()
                .transcripts_dir()
                .ends_with("ember/transcripts")
        );
    }
}
