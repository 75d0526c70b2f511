use super::{LookupTable, TopicEntry};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

const CONFIG_DIR: &str = ".config/ftmq-bridge";
const LOOKUP_FILE: &str = "lookup.toml";

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Failed to read lookup file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse lookup file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid lookup table: {0}")]
    Invalid(String),
}

/// On-disk layout of the lookup file
#[derive(Deserialize, Debug)]
struct LookupDocument {
    #[serde(default)]
    mqtt_subscriptions: Vec<String>,
    #[serde(default)]
    lookup_table: Vec<TopicEntry>,
}

impl LookupTable {
    /// Parses and validates a lookup table from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, LookupError> {
        let document: LookupDocument = toml::from_str(content)?;
        debug!(
            "Parsed lookup document: {} subscriptions, {} entries",
            document.mqtt_subscriptions.len(),
            document.lookup_table.len()
        );

        let table = LookupTable::new(document.mqtt_subscriptions, document.lookup_table);
        table.validate()?;
        Ok(table)
    }

    /// Reads the lookup file from disk
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LookupError> {
        let path = path.as_ref();
        info!("Loading lookup table from {}", path.display());

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| LookupError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let table = Self::from_toml_str(&content)?;
        info!(
            "Lookup table loaded: {} entries, {} subscriptions",
            table.len(),
            table.subscriptions().len()
        );
        Ok(table)
    }
}

/// `~/.config/ftmq-bridge/lookup.toml`
pub fn default_lookup_path() -> PathBuf {
    let mut path = get_home_dir();
    path.push(CONFIG_DIR);
    path.push(LOOKUP_FILE);
    path
}

fn get_home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| {
        warn!("Could not determine home directory, using current directory");
        PathBuf::from(".")
    })
}
