use async_graphql::{Request, Response, Variables};
use graphinator::engine::Engine;
use graphinator::error::Result;
use std::path::Path;

/// Run the query command: execute one request and print the JSON response
pub async fn run(config_path: String, query: String, variables: Option<String>) -> Result<()> {
    let config = graphinator::config::load_config(&config_path)?;
    let base_dir = Path::new(&config_path).parent().unwrap_or_else(|| Path::new(""));
    let store = graphinator::config::connect_store(&config, base_dir)?;

    let mut request = Request::new(query);
    if let Some(variables) = variables {
        let json: serde_json::Value = serde_json::from_str(&variables)?;
        request = request.variables(Variables::from_json(json));
    }

    let engine = Engine::new(store, config.scan);
    let response: Response = engine.execute(request).await.into();
    if !response.errors.is_empty() {
        tracing::warn!("Query finished with {} error(s)", response.errors.len());
    }

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
