//! Data models shared by the token lifecycle and the sync engine.
//!
//! - `Challenge`, `IssuedChallenge`, `TokenKind`: pending sign-in requests
//! - `Identity`: result of a successful identity probe
//! - `ArticleDescriptor`: a published article as listed by the gateway

pub mod article;
pub mod challenge;

pub use article::ArticleDescriptor;
pub use challenge::{Challenge, Identity, IssuedChallenge, TokenKind};
