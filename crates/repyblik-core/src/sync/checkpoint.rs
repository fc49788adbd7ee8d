use std::fmt;
use std::io;

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use tracing::{debug, warn};

use crate::store::StateStore;

/// Key (file name inside the download directory) of the checkpoint
pub const CHECKPOINT_KEY: &str = ".last";

/// Publish time of the most recent article that was fully synchronized
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Checkpoint(DateTime<Utc>);

impl Checkpoint {
    pub fn new(published_at: DateTime<Utc>) -> Self {
        Self(published_at)
    }

    pub fn published_at(&self) -> DateTime<Utc> {
        self.0
    }

    /// Earliest publish time that counts as new. One second past the
    /// checkpoint so the boundary article is not fetched again.
    pub fn lower_bound(&self) -> DateTime<Utc> {
        self.0 + TimeDelta::seconds(1)
    }

    pub fn parse(text: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(text.trim())
            .ok()
            .map(|dt| Self(dt.with_timezone(&Utc)))
    }

    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

/// Reads and writes the checkpoint through a `StateStore`
pub struct CheckpointStore<S> {
    store: S,
}

impl<S: StateStore> CheckpointStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Load the checkpoint. Missing, unreadable and unparseable checkpoints
    /// all yield `None`, which puts the next sync into bootstrap mode.
    pub fn load(&self) -> Option<Checkpoint> {
        match self.store.read(CHECKPOINT_KEY) {
            Ok(None) => {
                debug!("No checkpoint found");
                None
            }
            Ok(Some(text)) => {
                let checkpoint = Checkpoint::parse(&text);
                if checkpoint.is_none() {
                    warn!(content = %text.trim(), "Ignoring unparseable checkpoint");
                }
                checkpoint
            }
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable checkpoint");
                None
            }
        }
    }

    /// Persist `checkpoint`, replacing the previous one atomically
    pub fn save(&self, checkpoint: Checkpoint) -> io::Result<()> {
        self.store.write(CHECKPOINT_KEY, &checkpoint.to_rfc3339())
    }
}
