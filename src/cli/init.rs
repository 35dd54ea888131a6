use graphinator::config::{Config, ServerConfig, StoreConfig};
use graphinator::discovery::{scan, ScanOptions};
use graphinator::error::Result;
use graphinator::store::Neo4jHttpStore;
use std::path::Path;

const EXAMPLE_FIXTURE: &str = "movies.json";

/// Run the init command to write a Neo4j configuration or an example setup
pub async fn run(
    example: bool,
    url: Option<String>,
    database: Option<String>,
    user: Option<String>,
    output: Option<String>,
) -> Result<()> {
    match (example, url) {
        (false, Some(url)) => run_neo4j(url, database.unwrap_or_else(|| "neo4j".to_string()), user, output).await,
        _ => run_example(output).await,
    }
}

/// Write the example movie graph and a configuration serving it
async fn run_example(output: Option<String>) -> Result<()> {
    tracing::info!("Setting up example movie graph...");

    let directory = output
        .as_deref()
        .and_then(|path| Path::new(path).parent())
        .unwrap_or_else(|| Path::new(""));
    let fixture_path = directory.join(EXAMPLE_FIXTURE);

    let graph = crate::cli::example::create_example_graph();
    std::fs::write(&fixture_path, graph.to_json_pretty()?)?;
    tracing::info!(
        "Wrote {} nodes and {} relationships to {}",
        graph.nodes.len(),
        graph.relationships.len(),
        fixture_path.display()
    );

    let config = Config {
        store: StoreConfig::memory(EXAMPLE_FIXTURE),
        scan: ScanOptions::default(),
        server: ServerConfig::default(),
    };

    write_config(&config, output.as_deref())?;

    tracing::info!("Next steps:");
    tracing::info!("   1. Inspect the inferred schema: graphinator scan --config <file> --sdl");
    tracing::info!("   2. Start server with 'graphinator serve --config <file>'");
    tracing::info!("   3. Try {{ Person(born: 1961) {{ name ACTED_IN_Movie {{ title }} }} }}");

    Ok(())
}

/// Check the Neo4j connection with a scan, then write its configuration
async fn run_neo4j(url: String, database: String, user: Option<String>, output: Option<String>) -> Result<()> {
    tracing::info!("Scanning {} (database '{}')...", url, database);

    let config = Config {
        store: StoreConfig::neo4j(url.clone(), database.clone(), user.clone()),
        scan: ScanOptions::default(),
        server: ServerConfig::default(),
    };

    let mut store = Neo4jHttpStore::new(&url, &database)?;
    if let Some(user) = &user {
        let password = std::env::var(graphinator::config::PASSWORD_ENV).unwrap_or_default();
        store = store.with_credentials(user, &password);
    }

    let registry = scan(&store, &config.scan).await?;
    if registry.is_empty() {
        tracing::warn!("No labels found in database '{}'", database);
    }
    for metadata in registry.types() {
        tracing::info!(
            "   • {} ({} properties, {} relationships)",
            metadata.label,
            metadata.properties.len(),
            metadata.relationships.len()
        );
    }

    write_config(&config, output.as_deref())
}

/// Write to file or stdout
fn write_config(config: &Config, output: Option<&str>) -> Result<()> {
    if let Some(output_path) = output {
        graphinator::config::save_config(config, output_path)?;
        tracing::info!("Generated {}", output_path);
    } else {
        let toml_string = toml::to_string_pretty(config)?;
        println!("{}", toml_string);
        tracing::info!("Tip: Add --output <file> to save to a file instead of stdout");
    }
    Ok(())
}
