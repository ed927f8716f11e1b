use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Configuration for community auditing.
///
/// Holds the location of the platform database and the host used when
/// building community URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Path to the SQLite database holding the platform data.
    database: PathBuf,

    /// Host prefix of community URLs.
    ///
    /// For example, 'app.couchers.org' produces
    /// 'app.couchers.org/community/42/berlin'.
    host: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database(),
            host: default_host(),
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// Returns the database path.
    #[must_use]
    pub fn database(&self) -> &Path {
        &self.database
    }

    /// Overrides the database path.
    pub fn set_database(&mut self, database: PathBuf) {
        self.database = database;
    }

    /// Returns the URL host prefix.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Overrides the URL host prefix.
    pub fn set_host(&mut self, host: String) {
        self.host = host;
    }
}

fn default_database() -> PathBuf {
    PathBuf::from("communities.db")
}

fn default_host() -> String {
    "app.couchers.org".to_string()
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_database")]
        database: PathBuf,

        #[serde(default = "default_host")]
        host: String,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 { database, host } => Self { database, host },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            database: config.database,
            host: config.host,
        }
    }
}
