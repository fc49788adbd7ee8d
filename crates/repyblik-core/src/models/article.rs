use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::format::sanitize_filename_component;

/// File extension of downloaded articles
const PDF_EXTENSION: &str = "pdf";

/// Timestamp prefix used in file names. No colons so the name is valid on every platform.
const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H%M%S";

/// A published article as listed by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleDescriptor {
    pub title: String,
    /// Site path of the article, e.g. `/2024/01/03/some-article`
    pub path: String,
    pub published_at: DateTime<Utc>,
}

impl ArticleDescriptor {
    /// Local file name for the downloaded PDF: publish time followed by the title,
    /// both safe to use as a single path component.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.file_stem(), PDF_EXTENSION)
    }

    /// `file_name` with a `_<n>` suffix, for telling apart articles whose
    /// plain names collide.
    pub fn file_name_numbered(&self, n: usize) -> String {
        format!("{}_{}.{}", self.file_stem(), n, PDF_EXTENSION)
    }

    fn file_stem(&self) -> String {
        format!(
            "{}_{}",
            self.published_at.format(FILE_TIMESTAMP_FORMAT),
            sanitize_filename_component(&self.title)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn article(title: &str) -> ArticleDescriptor {
        ArticleDescriptor {
            title: title.to_string(),
            path: "/2024/01/03/x".to_string(),
            published_at: Utc.with_ymd_and_hms(2024, 1, 3, 5, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_file_name_plain_title() {
        assert_eq!(
            article("Die Woche im Überblick").file_name(),
            "2024-01-03_053000_Die Woche im Überblick.pdf"
        );
    }

    #[test]
    fn test_file_name_strips_path_separators() {
        let name = article("Krieg/Frieden: was nun?").file_name();
        assert!(!name.contains('/'));
        assert!(!name.contains(':'));
        assert!(!name.contains('?'));
        assert!(name.starts_with("2024-01-03_053000_"));
        assert!(name.ends_with(".pdf"));
    }

    #[test]
    fn test_file_name_numbered() {
        assert_eq!(article("Was nun?").file_name_numbered(3), "2024-01-03_053000_Was nun__3.pdf");
    }

    #[test]
    fn test_file_name_empty_title() {
        assert_eq!(article("  ").file_name(), "2024-01-03_053000_untitled.pdf");
    }
}
