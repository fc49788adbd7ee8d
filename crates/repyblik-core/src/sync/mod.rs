//! Incremental synchronization of new articles.
//!
//! A checkpoint (the publish time of the newest article fetched so far)
//! scopes each run to articles published after it. The checkpoint only moves
//! once every article of a batch is on disk; a failed download leaves it
//! untouched so the next run picks the same articles up again.
//!
//! Without a usable checkpoint the engine falls back to the most recent N
//! articles (bootstrap mode).

pub mod checkpoint;
pub mod engine;

pub use checkpoint::{Checkpoint, CheckpointStore, CHECKPOINT_KEY};
pub use engine::{determine_scope, SyncEngine, SyncError, SyncOutcome, SyncQuery};
