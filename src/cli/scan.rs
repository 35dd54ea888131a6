use graphinator::engine::Engine;
use graphinator::error::Result;
use std::path::Path;

/// Run the scan command: print the inferred types as JSON, or the GraphQL SDL
pub async fn run(config_path: String, sdl: bool) -> Result<()> {
    tracing::info!("Loading configuration from {}", config_path);
    let config = graphinator::config::load_config(&config_path)?;
    let base_dir = Path::new(&config_path).parent().unwrap_or_else(|| Path::new(""));
    let store = graphinator::config::connect_store(&config, base_dir)?;

    let engine = Engine::new(store, config.scan);
    let snapshot = engine.refresh().await?;

    if sdl {
        println!("{}", snapshot.schema.sdl());
    } else {
        let types: Vec<_> = snapshot.registry.types().collect();
        println!("{}", serde_json::to_string_pretty(&types)?);
    }

    tracing::info!("Scanned {} label(s)", snapshot.registry.len());
    Ok(())
}
