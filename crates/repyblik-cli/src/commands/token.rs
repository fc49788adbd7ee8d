//! `token request` and `token check`.

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::warn;

use repyblik_core::utils::format_remaining;
use repyblik_core::{ApiClient, Config, Credential, FileStore, Identity, TokenManager, TokenStore};

fn token_store(config: &Config) -> Result<TokenStore<FileStore>> {
    Ok(TokenStore::new(FileStore::new(config.token_dir()?)))
}

/// Request a challenge, wait until the user confirms it, then store the token
pub async fn request(config: &mut Config, email: &str, overwrite: bool) -> Result<()> {
    let tokens = token_store(config)?;
    // Check before asking the server so an existing token is never lost
    tokens.ensure_writable(email, overwrite)?;

    let client = ApiClient::with_base_url(config.api_url.clone())?;
    let mut manager = TokenManager::new(client);
    let challenge = manager.request_challenge(email).await?;

    println!("{}", challenge.token_kind.instructions());
    println!("Please check that the verification phrase is as follows:");
    println!("    {}", challenge.verification_phrase);
    println!(
        "The request expires {}",
        format_remaining(challenge.expires_at - Utc::now())
    );
    println!("Waiting for confirmation...");

    let credential = manager.await_confirmation(config.poll_interval()).await?;
    tokens.save(email, credential.value(), overwrite)?;

    config.last_email = Some(email.to_string());
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to remember email address in config");
    }

    println!("Token confirmed and stored for {}", email);
    Ok(())
}

/// Load the stored token for `email` and confirm it with the server
pub async fn authenticate(client: &ApiClient, config: &Config, email: &str) -> Result<(Credential, Identity)> {
    let token = token_store(config)?
        .load(email)?
        .with_context(|| format!("No token stored for {}. Run `repyblik token request` first.", email))?;

    let mut manager = TokenManager::new(client);
    let credential = manager
        .confirm_existing(token)
        .await
        .with_context(|| format!("The stored token for {} is not valid", email))?;
    let identity = manager
        .identity()
        .cloned()
        .context("Confirmed token has no identity")?;

    Ok((credential, identity))
}

/// Probe the stored token and report the result
pub async fn check(config: &Config, email: &str) -> Result<()> {
    let client = ApiClient::with_base_url(config.api_url.clone())?;
    let (_, identity) = authenticate(&client, config, email).await?;
    println!("The token for {} is valid (user id {})", email, identity.id);
    Ok(())
}
