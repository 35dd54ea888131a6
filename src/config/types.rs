use crate::discovery::ScanOptions;
use serde::{Deserialize, Serialize};

/// Top-level configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub store: StoreConfig,
    #[serde(default)]
    pub scan: ScanOptions,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Which graph store backs the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Neo4j,
    Memory,
}

/// Graph store connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub kind: StoreKind,

    /// Neo4j HTTP endpoint (e.g., "http://localhost:7474")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    // Password is read from NEO4J_PASSWORD environment variable

    /// JSON graph file for the in-memory store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixture: Option<String>,
}

fn default_database() -> String {
    "neo4j".to_string()
}

impl StoreConfig {
    pub fn neo4j(url: impl Into<String>, database: impl Into<String>, user: Option<String>) -> Self {
        Self {
            kind: StoreKind::Neo4j,
            url: Some(url.into()),
            database: database.into(),
            user,
            fixture: None,
        }
    }

    pub fn memory(fixture: impl Into<String>) -> Self {
        Self {
            kind: StoreKind::Memory,
            url: None,
            database: default_database(),
            user: None,
            fixture: Some(fixture.into()),
        }
    }

    /// Validate store configuration
    pub fn validate(&self) -> Result<(), String> {
        match self.kind {
            StoreKind::Neo4j => {
                let Some(url) = &self.url else {
                    return Err("Store kind 'neo4j' requires a url".to_string());
                };
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(format!("Store url '{}' must be a valid URL (http:// or https://)", url));
                }
                if self.database.is_empty() {
                    return Err("Store database must not be empty".to_string());
                }
            }
            StoreKind::Memory => {
                if self.fixture.is_none() {
                    return Err("Store kind 'memory' requires a fixture file".to_string());
                }
            }
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to bind the server to
    #[serde(default = "default_port")]
    pub port: u16,

    /// Interface to bind the server to
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
        }
    }
}

fn default_port() -> u16 {
    4000
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neo4j_validation_valid() {
        let store = StoreConfig::neo4j("http://localhost:7474", "neo4j", Some("neo4j".to_string()));
        assert!(store.validate().is_ok());
    }

    #[test]
    fn test_neo4j_validation_invalid_url() {
        let store = StoreConfig::neo4j("bolt://localhost:7687", "neo4j", None);
        assert!(store.validate().is_err());
    }

    #[test]
    fn test_neo4j_validation_missing_url() {
        let mut store = StoreConfig::neo4j("http://localhost:7474", "neo4j", None);
        store.url = None;
        assert!(store.validate().is_err());
    }

    #[test]
    fn test_memory_validation_requires_fixture() {
        let mut store = StoreConfig::memory("movies.json");
        assert!(store.validate().is_ok());

        store.fixture = None;
        assert!(store.validate().is_err());
    }
}
