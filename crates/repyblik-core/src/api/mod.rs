//! Remote collaborators: the REPUBLIK GraphQL gateway and the PDF CDN.
//!
//! The `Gateway` and `ContentStore` traits are the seams the token lifecycle
//! and sync engine depend on; `ApiClient` and `CdnClient` are the HTTP
//! implementations. The session is carried by the `connect.sid` cookie.

pub mod cdn;
pub mod client;
pub mod error;

use std::path::Path;

use crate::auth::Credential;
use crate::models::{ArticleDescriptor, Identity, IssuedChallenge};
use crate::sync::SyncQuery;

pub use cdn::CdnClient;
pub use client::ApiClient;
pub use error::ApiError;

/// Operations offered by the remote GraphQL API
#[allow(async_fn_in_trait)]
pub trait Gateway {
    /// Start a sign-in for `email`. Needs no session.
    async fn request_challenge(&self, email: &str) -> Result<IssuedChallenge, ApiError>;

    /// Ask who owns the session `secret`. `None` while the sign-in is unconfirmed.
    async fn probe(&self, secret: &str) -> Result<Option<Identity>, ApiError>;

    /// List feed articles matching `query`, most recent first
    async fn list_articles(
        &self,
        credential: &Credential,
        query: &SyncQuery,
    ) -> Result<Vec<ArticleDescriptor>, ApiError>;
}

/// Streams a remote article PDF to a local file
#[allow(async_fn_in_trait)]
pub trait ContentStore {
    /// Download the PDF for `article_path` into `destination`, returning the byte count
    async fn download(&self, article_path: &str, destination: &Path) -> Result<u64, ApiError>;
}

impl<G: Gateway> Gateway for &G {
    async fn request_challenge(&self, email: &str) -> Result<IssuedChallenge, ApiError> {
        (**self).request_challenge(email).await
    }

    async fn probe(&self, secret: &str) -> Result<Option<Identity>, ApiError> {
        (**self).probe(secret).await
    }

    async fn list_articles(
        &self,
        credential: &Credential,
        query: &SyncQuery,
    ) -> Result<Vec<ArticleDescriptor>, ApiError> {
        (**self).list_articles(credential, query).await
    }
}

impl<S: ContentStore> ContentStore for &S {
    async fn download(&self, article_path: &str, destination: &Path) -> Result<u64, ApiError> {
        (**self).download(article_path, destination).await
    }
}
