//! Non-interactive commands

use std::path::PathBuf;

use anyhow::{Context, Result};
use url::Url;

use ideagen_core::auth::{FileIdentity, IdentityProvider};
use ideagen_core::entitlement::matched_signals;
use ideagen_core::webhook::{process_webhook, MetadataClient, WebhookHeaders, DEFAULT_API_BASE};
use ideagen_core::{gate, resolve, Config, Gate};

/// One webhook delivery as given on the command line
pub struct Delivery {
    pub body: PathBuf,
    pub id: String,
    pub timestamp: String,
    pub signature: String,
}

pub async fn access(config: &Config) -> Result<()> {
    let identity = FileIdentity::new(config.session_path()).await;
    let snapshot = identity.current_profile();

    match gate(&snapshot) {
        Gate::Loading => println!("Profile still loading"),
        Gate::Paywall | Gate::Granted => {
            let profile = snapshot.profile();
            println!("Access: {}", resolve(profile));
            let signals = matched_signals(profile);
            if signals.is_empty() {
                println!("No entitlement signal matched");
            }
            for signal in signals {
                println!("  matched {}", signal);
            }
        }
    }

    let token = identity.get_token().await;
    println!(
        "Session token: {}",
        if token.is_some() { "present" } else { "missing or expired" }
    );
    Ok(())
}

pub async fn webhook(delivery: &Delivery, apply: bool) -> Result<()> {
    let secret = std::env::var("IDEAGEN_WEBHOOK_SECRET")
        .context("IDEAGEN_WEBHOOK_SECRET is not set")?;
    let body = tokio::fs::read_to_string(&delivery.body)
        .await
        .with_context(|| format!("Failed to read {}", delivery.body.display()))?;

    let headers = WebhookHeaders::from_lookup(|name| match name {
        "svix-id" => Some(delivery.id.as_str()),
        "svix-timestamp" => Some(delivery.timestamp.as_str()),
        "svix-signature" => Some(delivery.signature.as_str()),
        _ => None,
    })?;

    let Some(update) = process_webhook(&secret, &headers, &body)? else {
        println!("Verified; no subscription update");
        return Ok(());
    };
    println!("{}", serde_json::to_string_pretty(&update)?);

    if apply {
        let secret_key = std::env::var("IDEAGEN_SECRET_KEY")
            .context("IDEAGEN_SECRET_KEY is required with --apply")?;
        let base = std::env::var("IDEAGEN_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        let api_base = Url::parse(&base).with_context(|| format!("Invalid API base {}", base))?;
        MetadataClient::new(api_base, secret_key).apply(&update).await?;
        println!("Applied to {}", update.user_id);
    }
    Ok(())
}
