//! GraphQL client for the REPUBLIK API.
//!
//! Every operation is a POST of `{query, variables}` to a single endpoint.
//! Responses are decoded into typed payloads; anything that does not match
//! the expected shape becomes an `ApiError::Protocol` instead of a panic.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::auth::Credential;
use crate::models::{ArticleDescriptor, Challenge, Identity, IssuedChallenge, TokenKind};
use crate::sync::SyncQuery;

use super::{ApiError, Gateway};

// ============================================================================
// Constants
// ============================================================================

/// Default GraphQL endpoint
pub const DEFAULT_API_URL: &str = "https://api.republik.ch/graphql";

/// Name of the cookie that carries the session secret
pub const SESSION_COOKIE: &str = "connect.sid";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

const SIGN_IN_MUTATION: &str =
    "mutation signIn($email: String!) { signIn(email: $email) { phrase expiresAt tokenType } }";

const ME_QUERY: &str = "{ me { id } }";

const LATEST_DOCUMENTS_QUERY: &str = "query($first: Int) {\
  documents(feed: true, first: $first) {\
    nodes { meta { title path publishDate } }\
  }\
}";

/// Upper bound on the articles one since-query returns. The search endpoint
/// pages its results, so the bound is explicit rather than the server default.
const SINCE_PAGE_SIZE: u32 = 1000;

const DOCUMENTS_SINCE_QUERY: &str = "query($since: DateTime, $first: Int) {\
  search(first: $first, filter: {feed: true, publishedAt: {from: $since}},\
         sort: {key: publishedAt, direction: DESC}) {\
    nodes { entity { ... on Document { meta { title path publishDate } } } }\
  }\
}";

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

impl<T> GraphQlResponse<T> {
    fn into_data(self, part: &str) -> Result<T, ApiError> {
        match self.data {
            Some(data) => Ok(data),
            None if !self.errors.is_empty() => {
                let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
                Err(ApiError::protocol(format!("'{}' failed: {}", part, messages.join("; "))))
            }
            None => Err(ApiError::protocol(format!(
                "The response body is missing the '{}' data part",
                part
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SignInData {
    #[serde(rename = "signIn")]
    sign_in: Option<SignInPayload>,
}

#[derive(Debug, Deserialize)]
struct SignInPayload {
    phrase: String,
    #[serde(rename = "expiresAt")]
    expires_at: String,
    #[serde(rename = "tokenType")]
    token_type: String,
}

impl SignInPayload {
    fn into_challenge(self) -> Result<Challenge, ApiError> {
        let token_kind = TokenKind::from_wire(&self.token_type).ok_or_else(|| {
            ApiError::protocol(format!("Unknown token type in response: {}", self.token_type))
        })?;

        Ok(Challenge {
            verification_phrase: self.phrase,
            token_kind,
            expires_at: parse_timestamp(&self.expires_at, "expiresAt")?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct MeData {
    me: Option<Identity>,
}

#[derive(Debug, Deserialize)]
struct DocumentsData {
    documents: DocumentConnection,
}

#[derive(Debug, Deserialize)]
struct DocumentConnection {
    #[serde(default)]
    nodes: Vec<DocumentNode>,
}

#[derive(Debug, Deserialize)]
struct DocumentNode {
    meta: DocumentMeta,
}

#[derive(Debug, Deserialize)]
struct SearchData {
    search: SearchConnection,
}

#[derive(Debug, Deserialize)]
struct SearchConnection {
    #[serde(default)]
    nodes: Vec<SearchNode>,
}

#[derive(Debug, Deserialize)]
struct SearchNode {
    entity: Option<SearchEntity>,
}

/// Non-document search hits come back as `{}`, so `meta` is optional here
#[derive(Debug, Deserialize)]
struct SearchEntity {
    meta: Option<DocumentMeta>,
}

#[derive(Debug, Deserialize)]
struct DocumentMeta {
    title: Option<String>,
    path: String,
    #[serde(rename = "publishDate")]
    publish_date: String,
}

impl DocumentMeta {
    fn to_descriptor(&self) -> Result<ArticleDescriptor, ApiError> {
        Ok(ArticleDescriptor {
            title: self.title.clone().unwrap_or_default(),
            path: self.path.clone(),
            published_at: parse_timestamp(&self.publish_date, "publishDate")?,
        })
    }
}

fn parse_timestamp(value: &str, field: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ApiError::protocol(format!("Invalid '{}' timestamp '{}': {}", field, value, e)))
}

fn decode<T: DeserializeOwned>(body: &str, part: &str) -> Result<T, ApiError> {
    let response: GraphQlResponse<T> = serde_json::from_str(body)
        .map_err(|e| ApiError::protocol(format!("Failed to parse '{}' response: {}", part, e)))?;
    response.into_data(part)
}

fn descriptors_from_documents(data: DocumentsData) -> Result<Vec<ArticleDescriptor>, ApiError> {
    data.documents.nodes.iter().map(|n| n.meta.to_descriptor()).collect()
}

fn descriptors_from_search(data: SearchData) -> Result<Vec<ArticleDescriptor>, ApiError> {
    let mut articles = Vec::with_capacity(data.search.nodes.len());
    for node in &data.search.nodes {
        match node.entity.as_ref().and_then(|e| e.meta.as_ref()) {
            Some(meta) => articles.push(meta.to_descriptor()?),
            None => debug!("Skipping non-document search hit"),
        }
    }
    Ok(articles)
}

// ============================================================================
// Client
// ============================================================================

/// GraphQL client for the REPUBLIK API.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the default endpoint
    pub fn new() -> Result<Self, ApiError> {
        Self::with_base_url(DEFAULT_API_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn session_headers(secret: Option<&str>) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        if let Some(secret) = secret {
            let value = header::HeaderValue::from_str(&format!("{}={}", SESSION_COOKIE, secret))
                .map_err(|_| ApiError::protocol("Session secret contains invalid header characters"))?;
            headers.insert(header::COOKIE, value);
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn send(
        &self,
        secret: Option<&str>,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<reqwest::Response, ApiError> {
        let response = self
            .client
            .post(&self.base_url)
            .headers(Self::session_headers(secret)?)
            .json(&GraphQlRequest { query, variables })
            .send()
            .await?;

        Self::check_response(response).await
    }
}

impl Gateway for ApiClient {
    async fn request_challenge(&self, email: &str) -> Result<IssuedChallenge, ApiError> {
        debug!("Requesting sign-in challenge");
        let response = self
            .send(None, SIGN_IN_MUTATION, json!({ "email": email }))
            .await?;

        let secret = response
            .cookies()
            .find(|c| c.name() == SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                ApiError::protocol(format!("The response is missing the '{}' cookie", SESSION_COOKIE))
            })?;

        let body = response.text().await?;
        let data: SignInData = decode(&body, "signIn")?;
        let challenge = data
            .sign_in
            .ok_or_else(|| ApiError::protocol("The response body is missing the 'signIn' data part"))?
            .into_challenge()?;

        debug!(kind = %challenge.token_kind, expires_at = %challenge.expires_at, "Challenge issued");
        Ok(IssuedChallenge { challenge, secret })
    }

    async fn probe(&self, secret: &str) -> Result<Option<Identity>, ApiError> {
        let response = self.send(Some(secret), ME_QUERY, json!({})).await?;
        let body = response.text().await?;
        let data: MeData = decode(&body, "me")?;
        Ok(data.me)
    }

    async fn list_articles(
        &self,
        credential: &Credential,
        query: &SyncQuery,
    ) -> Result<Vec<ArticleDescriptor>, ApiError> {
        let secret = Some(credential.value());
        let articles = match query {
            SyncQuery::Latest(count) => {
                let response = self
                    .send(secret, LATEST_DOCUMENTS_QUERY, json!({ "first": count }))
                    .await?;
                let body = response.text().await?;
                descriptors_from_documents(decode(&body, "documents")?)?
            }
            SyncQuery::Since(since) => {
                let response = self
                    .send(secret, DOCUMENTS_SINCE_QUERY, since_variables(since))
                    .await?;
                let body = response.text().await?;
                let articles = descriptors_from_search(decode(&body, "search")?)?;
                if articles.len() >= SINCE_PAGE_SIZE as usize {
                    warn!(
                        limit = SINCE_PAGE_SIZE,
                        "Since-query hit its page size, older articles may be missing"
                    );
                }
                articles
            }
        };

        if articles.windows(2).any(|w| w[0].published_at < w[1].published_at) {
            warn!("Gateway returned articles out of publish order");
        }
        debug!(count = articles.len(), "Listed articles");
        Ok(articles)
    }
}

fn since_variables(since: &DateTime<Utc>) -> serde_json::Value {
    json!({ "since": since.to_rfc3339(), "first": SINCE_PAGE_SIZE })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_sign_in_response() {
        let json = r#"{"data":{"signIn":{"phrase":"Quick Brave Fox","expiresAt":"2024-01-01T12:10:00.000Z","tokenType":"EMAIL_TOKEN"}}}"#;

        let data: SignInData = decode(json, "signIn").expect("Failed to parse sign-in test JSON");
        let challenge = data.sign_in.unwrap().into_challenge().unwrap();
        assert_eq!(challenge.verification_phrase, "Quick Brave Fox");
        assert_eq!(challenge.token_kind, TokenKind::Email);
        assert_eq!(challenge.expires_at, Utc.with_ymd_and_hms(2024, 1, 1, 12, 10, 0).unwrap());
    }

    #[test]
    fn test_sign_in_unknown_token_kind() {
        let json = r#"{"data":{"signIn":{"phrase":"x","expiresAt":"2024-01-01T12:10:00Z","tokenType":"SMS"}}}"#;
        let data: SignInData = decode(json, "signIn").unwrap();
        let err = data.sign_in.unwrap().into_challenge().unwrap_err();
        assert!(matches!(err, ApiError::Protocol(ref m) if m.contains("Unknown token type")));
    }

    #[test]
    fn test_sign_in_bad_expiry() {
        let json = r#"{"data":{"signIn":{"phrase":"x","expiresAt":"tomorrow","tokenType":"APP"}}}"#;
        let data: SignInData = decode(json, "signIn").unwrap();
        assert!(matches!(data.sign_in.unwrap().into_challenge(), Err(ApiError::Protocol(_))));
    }

    #[test]
    fn test_missing_data_part() {
        let err = decode::<SignInData>(r#"{"foo":1}"#, "signIn").unwrap_err();
        assert!(matches!(err, ApiError::Protocol(ref m) if m.contains("missing the 'signIn' data part")));
    }

    #[test]
    fn test_graphql_errors_become_protocol_errors() {
        let json = r#"{"data":null,"errors":[{"message":"Email invalid"}]}"#;
        let err = decode::<SignInData>(json, "signIn").unwrap_err();
        assert!(matches!(err, ApiError::Protocol(ref m) if m.contains("Email invalid")));
    }

    #[test]
    fn test_parse_me_response() {
        let data: MeData = decode(r#"{"data":{"me":{"id":"a1b2"}}}"#, "me").unwrap();
        assert_eq!(data.me, Some(Identity { id: "a1b2".to_string() }));

        let data: MeData = decode(r#"{"data":{"me":null}}"#, "me").unwrap();
        assert_eq!(data.me, None);
    }

    #[test]
    fn test_parse_documents_response() {
        let json = r#"{"data":{"documents":{"nodes":[
            {"meta":{"title":"Zweiter","path":"/2024/01/03/zweiter","publishDate":"2024-01-03T00:00:00.000Z"}},
            {"meta":{"title":null,"path":"/2024/01/02/erster","publishDate":"2024-01-02T00:00:00.000Z"}}
        ]}}}"#;

        let articles = descriptors_from_documents(decode(json, "documents").unwrap()).unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].title, "Zweiter");
        assert_eq!(articles[0].path, "/2024/01/03/zweiter");
        assert_eq!(articles[0].published_at, Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap());
        assert_eq!(articles[1].title, "");
    }

    #[test]
    fn test_since_query_is_bounded() {
        assert!(DOCUMENTS_SINCE_QUERY.contains("$first: Int"));
        assert!(DOCUMENTS_SINCE_QUERY.contains("first: $first"));

        let since = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 1).unwrap();
        let variables = since_variables(&since);
        assert_eq!(variables["first"], SINCE_PAGE_SIZE);
        assert_eq!(variables["since"], "2024-01-01T00:00:01+00:00");
    }

    #[test]
    fn test_parse_search_response_skips_non_documents() {
        let json = r#"{"data":{"search":{"nodes":[
            {"entity":{"meta":{"title":"A","path":"/a","publishDate":"2024-01-03T00:00:00Z"}}},
            {"entity":{}},
            {"entity":null}
        ]}}}"#;

        let articles = descriptors_from_search(decode(json, "search").unwrap()).unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].path, "/a");
    }

    #[test]
    fn test_session_headers() {
        let headers = ApiClient::session_headers(Some("s%3Aabc.def")).unwrap();
        assert_eq!(headers.get(header::COOKIE).unwrap(), "connect.sid=s%3Aabc.def");
        assert!(ApiClient::session_headers(None).unwrap().is_empty());
        assert!(ApiClient::session_headers(Some("bad\nvalue")).is_err());
    }
}
