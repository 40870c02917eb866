// Error types for the downloader core

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DownloadError {
    /// The URL field was empty
    #[error("URL is required")]
    MissingUrl,

    /// The URL did not parse or is not http(s)
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),

    /// The extractor returned nothing usable
    #[error("No downloadable content found")]
    EmptyResult,

    /// A metadata search is already loading
    #[error("Search in progress, try again later")]
    SearchInProgress,

    /// A download request is already being dispatched
    #[error("A download is already starting")]
    DownloadInProgress,

    /// Cancel requested while nothing was loading
    #[error("No search is loading")]
    NotLoading,

    /// No metadata has been loaded for the session
    #[error("No metadata loaded")]
    NoMetadata,

    /// Playlist index outside the entry list
    #[error("Playlist index {0} is out of range")]
    PlaylistIndexOutOfRange(String),

    /// Selection is not complete enough to download
    #[error("Incomplete selection: {0}")]
    IncompleteSelection(String),

    /// yt-dlp not found in system
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Failed to parse yt-dlp JSON output
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Command execution failed
    #[error("Execution error: {0}")]
    ExecutionError(String),

    /// Network timeout while talking to the site
    #[error("Network timeout: the site is not responding")]
    NetworkTimeout,

    /// Unknown error with details
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl DownloadError {
    /// Errors caused by the URL the user typed
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::MissingUrl | Self::InvalidUrl(_))
    }
}

impl From<serde_json::Error> for DownloadError {
    fn from(e: serde_json::Error) -> Self {
        Self::ParseError(format!("Invalid JSON: {}", e))
    }
}

impl From<std::io::Error> for DownloadError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            Self::ToolNotFound(e.to_string())
        } else {
            Self::ExecutionError(e.to_string())
        }
    }
}

// Classify raw yt-dlp stderr
impl From<String> for DownloadError {
    fn from(s: String) -> Self {
        let lower = s.to_lowercase();

        if lower.contains("timeout") || lower.contains("timed out") {
            return Self::NetworkTimeout;
        }

        if lower.contains("not found")
            || lower.contains("no such file")
            || lower.contains("command not found")
        {
            return Self::ToolNotFound(s);
        }

        if lower.contains("unsupported url") || lower.contains("invalid url") {
            return Self::InvalidUrl(s);
        }

        if lower.contains("json") || lower.contains("parse") {
            return Self::ParseError(s);
        }

        Self::Unknown(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stderr_classification() {
        assert_eq!(
            DownloadError::from("ERROR: Read timed out.".to_string()),
            DownloadError::NetworkTimeout
        );
        assert!(matches!(
            DownloadError::from("ERROR: Unsupported URL: https://example.com".to_string()),
            DownloadError::InvalidUrl(_)
        ));
        assert!(matches!(
            DownloadError::from("yt-dlp: command not found".to_string()),
            DownloadError::ToolNotFound(_)
        ));
        assert!(matches!(
            DownloadError::from("something odd".to_string()),
            DownloadError::Unknown(_)
        ));
    }

    #[test]
    fn test_validation_errors() {
        assert!(DownloadError::MissingUrl.is_validation());
        assert!(DownloadError::InvalidUrl("x".into()).is_validation());
        assert!(!DownloadError::EmptyResult.is_validation());
        assert_eq!(DownloadError::MissingUrl.to_string(), "URL is required");
    }
}
