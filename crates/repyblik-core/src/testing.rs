//! Test doubles for the gateway, content store and clock.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::api::{ApiError, ContentStore, Gateway};
use crate::auth::{Clock, Credential};
use crate::models::{ArticleDescriptor, Identity, IssuedChallenge};
use crate::sync::SyncQuery;

/// Virtual clock: `sleep` returns immediately and moves time forward
pub struct ManualClock {
    start: DateTime<Utc>,
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            start,
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, delta: TimeDelta) {
        *self.now.lock().unwrap() += delta;
    }

    pub fn elapsed(&self) -> TimeDelta {
        *self.now.lock().unwrap() - self.start
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(TimeDelta::from_std(duration).unwrap());
    }
}

/// Gateway answering from scripted results
#[derive(Default)]
pub struct ScriptedGateway {
    challenge: Mutex<Option<Result<IssuedChallenge, ApiError>>>,
    probes: Mutex<VecDeque<Result<Option<Identity>, ApiError>>>,
    probed_secrets: Mutex<Vec<String>>,
    articles: Mutex<Vec<ArticleDescriptor>>,
    listing_error: Mutex<Option<ApiError>>,
    queries: Mutex<Vec<SyncQuery>>,
}

impl ScriptedGateway {
    pub fn with_challenge(issued: IssuedChallenge) -> Self {
        let gateway = Self::default();
        gateway.set_challenge(Ok(issued));
        gateway
    }

    pub fn with_articles(articles: Vec<ArticleDescriptor>) -> Self {
        let gateway = Self::default();
        gateway.set_articles(articles);
        gateway
    }

    pub fn set_challenge(&self, result: Result<IssuedChallenge, ApiError>) {
        *self.challenge.lock().unwrap() = Some(result);
    }

    /// Queue a probe result. Once the queue is empty probes return `None`.
    pub fn push_probe(&self, result: Result<Option<Identity>, ApiError>) {
        self.probes.lock().unwrap().push_back(result);
    }

    pub fn set_articles(&self, articles: Vec<ArticleDescriptor>) {
        *self.articles.lock().unwrap() = articles;
    }

    pub fn fail_listing(&self, error: ApiError) {
        *self.listing_error.lock().unwrap() = Some(error);
    }

    pub fn probe_count(&self) -> usize {
        self.probed_secrets.lock().unwrap().len()
    }

    pub fn probed_secrets(&self) -> Vec<String> {
        self.probed_secrets.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<SyncQuery> {
        self.queries.lock().unwrap().clone()
    }
}

impl Gateway for ScriptedGateway {
    async fn request_challenge(&self, _email: &str) -> Result<IssuedChallenge, ApiError> {
        let mut slot = self.challenge.lock().unwrap();
        match slot.take() {
            Some(Ok(issued)) => {
                *slot = Some(Ok(issued.clone()));
                Ok(issued)
            }
            Some(Err(e)) => Err(e),
            None => Err(ApiError::protocol("no challenge scripted")),
        }
    }

    async fn probe(&self, secret: &str) -> Result<Option<Identity>, ApiError> {
        self.probed_secrets.lock().unwrap().push(secret.to_string());
        self.probes.lock().unwrap().pop_front().unwrap_or(Ok(None))
    }

    async fn list_articles(
        &self,
        _credential: &Credential,
        query: &SyncQuery,
    ) -> Result<Vec<ArticleDescriptor>, ApiError> {
        self.queries.lock().unwrap().push(query.clone());
        if let Some(error) = self.listing_error.lock().unwrap().take() {
            return Err(error);
        }
        let articles = self.articles.lock().unwrap().clone();
        Ok(match query {
            SyncQuery::Latest(count) => articles.into_iter().take(*count as usize).collect(),
            SyncQuery::Since(since) => articles.into_iter().filter(|a| a.published_at >= *since).collect(),
        })
    }
}

/// Content store writing a small fake PDF and recording every call
#[derive(Default)]
pub struct RecordingContentStore {
    failing_paths: Mutex<HashSet<String>>,
    downloads: Mutex<Vec<(String, PathBuf)>>,
}

impl RecordingContentStore {
    pub fn fail_on(&self, article_path: &str) {
        self.failing_paths.lock().unwrap().insert(article_path.to_string());
    }

    pub fn downloads(&self) -> Vec<(String, PathBuf)> {
        self.downloads.lock().unwrap().clone()
    }
}

impl ContentStore for RecordingContentStore {
    async fn download(&self, article_path: &str, destination: &Path) -> Result<u64, ApiError> {
        self.downloads
            .lock()
            .unwrap()
            .push((article_path.to_string(), destination.to_path_buf()));

        if self.failing_paths.lock().unwrap().contains(article_path) {
            return Err(ApiError::NotFound(article_path.to_string()));
        }

        let body = format!("%PDF-1.7 {}", article_path);
        std::fs::write(destination, &body)?;
        Ok(body.len() as u64)
    }
}

pub fn credential() -> Credential {
    Credential::confirmed("s%3Aconfirmed".to_string())
}
