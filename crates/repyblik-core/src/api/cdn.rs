use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::{ApiError, ContentStore};

/// Default CDN serving article PDFs
pub const DEFAULT_CDN_URL: &str = "https://cdn.repub.ch";

/// Connect timeout for CDN requests. No overall timeout: PDFs can be large.
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Suffix of the file a download is written to before it is complete
const PARTIAL_SUFFIX: &str = "part";

/// Downloads article PDFs from the CDN
#[derive(Clone)]
pub struct CdnClient {
    client: Client,
    base_url: String,
}

impl CdnClient {
    pub fn new() -> Result<Self, ApiError> {
        Self::with_base_url(DEFAULT_CDN_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// URL of the PDF rendition of an article path
    pub fn pdf_url(&self, article_path: &str) -> String {
        format!("{}/pdf{}.pdf", self.base_url.trim_end_matches('/'), article_path)
    }

    async fn stream_to(&self, url: &str, partial: &Path) -> Result<u64, ApiError> {
        let mut response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body));
        }

        let mut file = fs::File::create(partial).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(PARTIAL_SUFFIX);
    destination.with_file_name(name)
}

impl ContentStore for CdnClient {
    async fn download(&self, article_path: &str, destination: &Path) -> Result<u64, ApiError> {
        let url = self.pdf_url(article_path);
        let partial = partial_path(destination);
        debug!(url = %url, destination = %destination.display(), "Downloading PDF");

        match self.stream_to(&url, &partial).await {
            Ok(written) => {
                fs::rename(&partial, destination).await?;
                Ok(written)
            }
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&partial).await {
                    if cleanup.kind() != std::io::ErrorKind::NotFound {
                        warn!(path = %partial.display(), error = %cleanup, "Failed to remove partial download");
                    }
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_url() {
        let cdn = CdnClient::with_base_url("https://cdn.repub.ch").unwrap();
        assert_eq!(
            cdn.pdf_url("/2024/01/03/die-woche"),
            "https://cdn.repub.ch/pdf/2024/01/03/die-woche.pdf"
        );

        let cdn = CdnClient::with_base_url("http://localhost:8080/").unwrap();
        assert_eq!(cdn.pdf_url("/a"), "http://localhost:8080/pdf/a.pdf");
    }

    #[test]
    fn test_partial_path() {
        let partial = partial_path(Path::new("/tmp/out/2024-01-03_000000_Title.pdf"));
        assert_eq!(partial, PathBuf::from("/tmp/out/2024-01-03_000000_Title.pdf.part"));
    }

    #[tokio::test]
    async fn test_download_unreachable_leaves_nothing_behind() {
        let dir = tempfile::TempDir::new().unwrap();
        // Port 9 (discard) on localhost is not expected to serve HTTP
        let cdn = CdnClient::with_base_url("http://127.0.0.1:9").unwrap();
        let destination = dir.path().join("article.pdf");

        let result = cdn.download("/a", &destination).await;
        assert!(result.is_err());
        assert!(!destination.exists());
        assert!(!partial_path(&destination).exists());
    }
}
