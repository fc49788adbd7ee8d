use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{ApiError, ContentStore, Gateway};
use crate::auth::Credential;
use crate::models::ArticleDescriptor;
use crate::store::StateStore;

use super::checkpoint::{Checkpoint, CheckpointStore};

/// Which articles a sync run asks the gateway for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncQuery {
    /// The most recent N articles (bootstrap mode)
    Latest(u32),
    /// Every article published at or after the given time
    Since(DateTime<Utc>),
}

#[derive(Debug)]
pub enum SyncOutcome {
    /// The gateway had no articles for the scope; nothing was touched
    NothingNew,
    Synced {
        articles: Vec<ArticleDescriptor>,
        checkpoint: Checkpoint,
    },
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to list articles: {0}")]
    Listing(#[source] ApiError),

    #[error("Failed to download '{title}' ({completed} of {total} articles done, checkpoint not advanced): {source}")]
    PartialSync {
        title: String,
        path: String,
        completed: usize,
        total: usize,
        #[source]
        source: ApiError,
    },

    #[error("Failed to write checkpoint: {0}")]
    Checkpoint(#[source] io::Error),

    #[error("Failed to prepare destination directory {}: {source}", .path.display())]
    Destination {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Nothing to synchronize: the batch is empty")]
    EmptyBatch,
}

/// Decide which articles count as new.
///
/// A usable checkpoint scopes the query to articles published after it.
/// Anything else (missing, unreadable, unparseable) falls back to the latest
/// `fallback_count` articles.
pub fn determine_scope<S: StateStore>(checkpoints: &CheckpointStore<S>, fallback_count: u32) -> SyncQuery {
    match checkpoints.load() {
        Some(checkpoint) => {
            debug!(checkpoint = %checkpoint, "Fetching articles since checkpoint");
            SyncQuery::Since(checkpoint.lower_bound())
        }
        None => {
            info!(count = fallback_count, "No usable checkpoint, fetching latest articles");
            SyncQuery::Latest(fallback_count)
        }
    }
}

/// File name for `article` that no earlier article of the same batch uses.
/// Collisions (same publish second, titles that sanitize alike) get a `_2`, `_3`, ... suffix.
fn unique_file_name(article: &ArticleDescriptor, used: &mut HashSet<String>) -> String {
    let mut name = article.file_name();
    let mut n = 2;
    while used.contains(&name) {
        name = article.file_name_numbered(n);
        n += 1;
    }
    used.insert(name.clone());
    name
}

/// Downloads new articles into one directory and keeps its checkpoint.
pub struct SyncEngine<G, C, S> {
    gateway: G,
    content: C,
    checkpoints: CheckpointStore<S>,
}

impl<G: Gateway, C: ContentStore, S: StateStore> SyncEngine<G, C, S> {
    pub fn new(gateway: G, content: C, checkpoints: CheckpointStore<S>) -> Self {
        Self {
            gateway,
            content,
            checkpoints,
        }
    }

    pub fn determine_scope(&self, fallback_count: u32) -> SyncQuery {
        determine_scope(&self.checkpoints, fallback_count)
    }

    /// Ask the gateway for the articles in `query`. An empty batch means nothing is new.
    pub async fn fetch_batch(
        &self,
        credential: &Credential,
        query: &SyncQuery,
    ) -> Result<Vec<ArticleDescriptor>, SyncError> {
        self.gateway
            .list_articles(credential, query)
            .await
            .map_err(SyncError::Listing)
    }

    /// Download every article of `batch` into `destination`, in batch order,
    /// then advance the checkpoint to the newest publish time in the batch.
    /// The checkpoint never moves backwards: a batch older than the stored
    /// checkpoint leaves it where it is.
    ///
    /// The first failed download aborts the batch. Articles downloaded before
    /// it stay on disk and the checkpoint is left as it was.
    pub async fn synchronize(
        &self,
        batch: &[ArticleDescriptor],
        destination: &Path,
    ) -> Result<Checkpoint, SyncError> {
        let newest = batch
            .iter()
            .map(|a| a.published_at)
            .max()
            .ok_or(SyncError::EmptyBatch)?;
        let previous = self.checkpoints.load();

        std::fs::create_dir_all(destination).map_err(|source| SyncError::Destination {
            path: destination.to_path_buf(),
            source,
        })?;

        let mut used_names = HashSet::with_capacity(batch.len());
        for (index, article) in batch.iter().enumerate() {
            let target = destination.join(unique_file_name(article, &mut used_names));
            let bytes = self
                .content
                .download(&article.path, &target)
                .await
                .map_err(|source| SyncError::PartialSync {
                    title: article.title.clone(),
                    path: article.path.clone(),
                    completed: index,
                    total: batch.len(),
                    source,
                })?;
            info!(
                title = %article.title,
                file = %target.display(),
                bytes,
                "Downloaded {}/{}",
                index + 1,
                batch.len()
            );
        }

        let checkpoint = match previous {
            Some(previous) if previous > Checkpoint::new(newest) => {
                warn!(checkpoint = %previous, newest = %newest, "Batch is older than the checkpoint, keeping it");
                previous
            }
            _ => Checkpoint::new(newest),
        };
        self.checkpoints.save(checkpoint).map_err(SyncError::Checkpoint)?;
        info!(checkpoint = %checkpoint, "Checkpoint advanced");
        Ok(checkpoint)
    }

    /// Determine the scope, fetch the batch and synchronize it
    pub async fn run(
        &self,
        credential: &Credential,
        destination: &Path,
        fallback_count: u32,
    ) -> Result<SyncOutcome, SyncError> {
        let query = self.determine_scope(fallback_count);
        let batch = self.fetch_batch(credential, &query).await?;
        if batch.is_empty() {
            info!("No new articles");
            return Ok(SyncOutcome::NothingNew);
        }

        let checkpoint = self.synchronize(&batch, destination).await?;
        Ok(SyncOutcome::Synced {
            articles: batch,
            checkpoint,
        })
    }
}
