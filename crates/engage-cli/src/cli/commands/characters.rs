//! Characters command handler.

use anyhow::{Context, Result};
use engage_core::api::ApiClient;
use engage_core::config::Config;

pub async fn run(config: &Config) -> Result<()> {
    let api = ApiClient::new(config.backend.base_url.clone());
    let characters = api.characters().await.context("load characters")?;

    if characters.is_empty() {
        println!("No characters available.");
        return Ok(());
    }

    for character in &characters {
        match &character.persona {
            Some(persona) => println!("{}  {} ({persona})", character.id, character.name),
            None => println!("{}  {}", character.id, character.name),
        }
    }
    Ok(())
}
