pub mod config;
pub mod logging;
pub mod model;
pub mod model_gateway;
pub mod personas;
pub mod providers;
pub mod repl;

use anyhow::{Context, Result, anyhow, bail};
use reqwest::Client;
use std::env;
use tracing::info;

use config::Config;
use model_gateway::{HostModelGateway, ModelGateway};
use repl::run_repl;

fn available_personas() -> String {
    personas::names().collect::<Vec<_>>().join(", ")
}

/// `buddy <persona> <text...>`: a single exchange without the menu.
async fn run_once(gateway: &impl ModelGateway, args: &[String]) -> Result<String> {
    let (persona_arg, rest) = args
        .split_first()
        .ok_or_else(|| anyhow!("Missing persona name"))?;
    let persona = personas::find(persona_arg).ok_or_else(|| {
        anyhow!(
            "Unknown persona '{}'. Available personas: {}.",
            persona_arg,
            available_personas()
        )
    })?;

    let user_input = rest.join(" ");
    if user_input.trim().is_empty() {
        bail!(
            "Input cannot be empty! Usage: buddy <persona> <text...> (persona one of: {}).",
            available_personas()
        );
    }

    let prompt = persona.compose_prompt(&user_input);
    info!(
        persona = persona.name(),
        prompt_len = prompt.len(),
        "running one-shot persona turn"
    );
    let text = gateway
        .complete(&prompt)
        .await
        .with_context(|| format!("{} did not return a completion", persona.name()))?;
    if text.is_empty() {
        bail!("{} returned an empty completion", persona.name());
    }
    Ok(text)
}

pub async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = logging::init();

    let cfg = Config::from_env();
    info!(
        completion_url = %cfg.completion_url,
        model = %cfg.model,
        model_timeout_secs = cfg.model_timeout_secs,
        "loaded runtime configuration"
    );

    let client = Client::builder()
        .build()
        .context("Failed to initialize HTTP client")?;
    let gateway = HostModelGateway::new(&client, &cfg);

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        run_repl(&gateway).await
    } else {
        let answer = run_once(&gateway, &args).await?;
        println!("{}", answer);
        Ok(())
    }
}
