mod types;

pub use types::{Config, ServerConfig, StoreConfig, StoreKind};

use crate::error::{GraphinatorError, Result};
use crate::store::{GraphStore, MemoryGraph, Neo4jHttpStore};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Prefix of environment overrides, e.g. `GRAPHINATOR__STORE__URL`
pub const ENV_PREFIX: &str = "GRAPHINATOR";

/// Environment variable holding the Neo4j password
pub const PASSWORD_ENV: &str = "NEO4J_PASSWORD";

/// Load configuration from a TOML file, layered with environment overrides
pub fn load_config(path: &str) -> Result<Config> {
    if !Path::new(path).is_file() {
        return Err(GraphinatorError::Config(format!(
            "Failed to read config file '{}': not found",
            path
        )));
    }

    let settings = ::config::Config::builder()
        .add_source(::config::File::new(path, ::config::FileFormat::Toml))
        .add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let config: Config = settings.try_deserialize()?;
    config.store.validate().map_err(GraphinatorError::Config)?;

    Ok(config)
}

/// Save configuration to a TOML file
pub fn save_config(config: &Config, path: &str) -> Result<()> {
    config.store.validate().map_err(GraphinatorError::Config)?;

    let toml_string = toml::to_string_pretty(config)?;
    fs::write(path, toml_string)
        .map_err(|e| GraphinatorError::Config(format!("Failed to write config file '{}': {}", path, e)))?;

    Ok(())
}

/// Open the configured graph store
///
/// A relative fixture path is resolved against `base_dir`, normally the
/// directory holding the config file.
pub fn connect_store(config: &Config, base_dir: &Path) -> Result<Arc<dyn GraphStore>> {
    let store = &config.store;
    match store.kind {
        StoreKind::Neo4j => {
            let url = store
                .url
                .as_deref()
                .ok_or_else(|| GraphinatorError::Config("Store kind 'neo4j' requires a url".to_string()))?;
            let mut neo4j = Neo4jHttpStore::new(url, &store.database)?;
            if let Some(user) = &store.user {
                let password = std::env::var(PASSWORD_ENV).unwrap_or_else(|_| {
                    tracing::warn!("{} is not set, connecting with an empty password", PASSWORD_ENV);
                    String::new()
                });
                neo4j = neo4j.with_credentials(user, &password);
            }
            tracing::info!("Using Neo4j store at {} (database '{}')", url, store.database);
            Ok(Arc::new(neo4j))
        }
        StoreKind::Memory => {
            let fixture = store
                .fixture
                .as_deref()
                .ok_or_else(|| GraphinatorError::Config("Store kind 'memory' requires a fixture file".to_string()))?;
            let path = base_dir.join(fixture);
            Ok(Arc::new(MemoryGraph::load(&path)?))
        }
    }
}
