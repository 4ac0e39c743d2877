//! Scenarios command handler.

use anyhow::{Context, Result};
use engage_core::api::ApiClient;
use engage_core::config::Config;

pub async fn run(config: &Config) -> Result<()> {
    let api = ApiClient::new(config.backend.base_url.clone());
    let scenarios = api.scenarios().await.context("load scenarios")?;

    if scenarios.is_empty() {
        println!("No scenarios available.");
        return Ok(());
    }

    for scenario in &scenarios {
        println!("{}  {}", scenario.id, scenario.title);
    }
    Ok(())
}
