//! Core library for repyblik, a personal client for the REPUBLIK news service.
//!
//! The crate turns an email address into a confirmed session token and uses
//! that token to download newly published articles as PDF documents.
//!
//! - `auth`: token lifecycle (challenge, bounded confirmation polling, token storage)
//! - `api`: GraphQL gateway and CDN content store
//! - `sync`: checkpoint handling and incremental batch synchronization
//! - `store`: key-value persisted state over files or memory
//! - `config`: user configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod store;
pub mod sync;
pub mod utils;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, ApiError, CdnClient, ContentStore, Gateway};
pub use auth::{Clock, Credential, SystemClock, TokenError, TokenManager, TokenState, TokenStore};
pub use config::Config;
pub use models::{ArticleDescriptor, Challenge, Identity, IssuedChallenge, TokenKind};
pub use store::{FileStore, MemoryStore, StateStore};
pub use sync::{Checkpoint, CheckpointStore, SyncEngine, SyncError, SyncOutcome, SyncQuery};
