//! `articles list` and `articles fetch`.

use std::path::Path;

use anyhow::Result;

use repyblik_core::utils::truncate_string;
use repyblik_core::{
    ApiClient, CdnClient, CheckpointStore, Config, FileStore, Gateway, SyncEngine, SyncOutcome, SyncQuery,
};

use super::token::authenticate;

/// Maximum title width in the article listing
const LIST_TITLE_WIDTH: usize = 60;

/// Print the most recent articles
pub async fn list(config: &Config, email: &str, count: Option<u32>) -> Result<()> {
    let client = ApiClient::with_base_url(config.api_url.clone())?;
    let (credential, _) = authenticate(&client, config, email).await?;

    let count = count.unwrap_or(config.fallback_count);
    let articles = client.list_articles(&credential, &SyncQuery::Latest(count)).await?;
    if articles.is_empty() {
        println!("No articles found.");
        return Ok(());
    }

    for article in &articles {
        println!(
            "{}  {:<width$}  {}",
            article.published_at.format("%Y-%m-%d %H:%M"),
            truncate_string(&article.title, LIST_TITLE_WIDTH),
            article.path,
            width = LIST_TITLE_WIDTH
        );
    }
    Ok(())
}

/// Download everything published since the last run into `dir`
pub async fn fetch(config: &Config, email: &str, dir: &Path, fallback: Option<u32>) -> Result<()> {
    let client = ApiClient::with_base_url(config.api_url.clone())?;
    let (credential, _) = authenticate(&client, config, email).await?;

    let cdn = CdnClient::with_base_url(config.cdn_url.clone())?;
    let engine = SyncEngine::new(&client, cdn, CheckpointStore::new(FileStore::new(dir)));
    let fallback = fallback.unwrap_or(config.fallback_count);

    match engine.run(&credential, dir, fallback).await? {
        SyncOutcome::NothingNew => {
            println!("No new articles since the last run.");
        }
        SyncOutcome::Synced {
            articles,
            checkpoint,
        } => {
            for article in &articles {
                println!(
                    "  {}  {}",
                    article.published_at.format("%Y-%m-%d %H:%M"),
                    truncate_string(&article.title, LIST_TITLE_WIDTH)
                );
            }
            println!(
                "Downloaded {} article(s) into {} (newest published {})",
                articles.len(),
                dir.display(),
                checkpoint.published_at().format("%Y-%m-%d %H:%M UTC")
            );
        }
    }
    Ok(())
}
