// CLI metadata fetcher - uses the native `yt-dlp` binary
//
// Runs `yt-dlp --dump-single-json` and hands the pid out as soon as the
// process is up, so a cancel can terminate it while the JSON is still
// being produced.

use async_trait::async_trait;

use crate::downloader::config::DownloaderSettings;
use crate::downloader::errors::DownloadError;
use crate::downloader::models::MetadataItem;
use crate::downloader::traits::{MetadataFetcher, PidReporter};
use crate::downloader::utils::{find_ytdlp, network_args, run_output_reporting_pid};

/// Metadata fetcher backed by the yt-dlp binary
pub struct CliMetadataFetcher {
    ytdlp_path: String,
    settings: DownloaderSettings,
}

impl CliMetadataFetcher {
    pub fn new(settings: DownloaderSettings) -> Self {
        Self {
            ytdlp_path: find_ytdlp(&settings),
            settings,
        }
    }

    pub fn ytdlp_path(&self) -> &str {
        &self.ytdlp_path
    }

    /// Build command arguments
    fn build_args(&self, url: &str) -> Vec<String> {
        let mut args = vec![
            "--dump-single-json".to_string(),
            "--no-warnings".to_string(),
            "--yes-playlist".to_string(),
            "--retries".to_string(),
            "2".to_string(),
        ];
        args.extend(network_args(&self.settings));
        args.push(url.to_string());
        args
    }

    /// Parse the JSON tree; empty output means "nothing found"
    fn parse_json(stdout: &[u8]) -> Result<Option<MetadataItem>, DownloadError> {
        let json_str = String::from_utf8_lossy(stdout);
        if json_str.trim().is_empty() {
            return Ok(None);
        }

        let item: MetadataItem = serde_json::from_str(json_str.trim())?;
        Ok(Some(item))
    }
}

#[async_trait]
impl MetadataFetcher for CliMetadataFetcher {
    fn name(&self) -> &'static str {
        "cli-yt-dlp"
    }

    async fn fetch_metadata(
        &self,
        url: &str,
        report_pid: PidReporter,
    ) -> Result<Option<MetadataItem>, DownloadError> {
        let args = self.build_args(url);
        tracing::info!("[CliFetcher] {} {}", self.ytdlp_path, args.join(" "));

        let output = run_output_reporting_pid(&self.ytdlp_path, &args, report_pid, None).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!("[CliFetcher] yt-dlp exited with {}: {}", output.status, stderr.trim());
            return Err(DownloadError::from(stderr.to_string()));
        }

        let item = Self::parse_json(&output.stdout)?;
        tracing::info!(
            "[CliFetcher] Parsed {:?} with {} entries",
            item.as_ref().and_then(MetadataItem::kind),
            item.as_ref().map_or(0, MetadataItem::entry_count)
        );
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::models::SourceKind;

    #[test]
    fn test_args_include_network_settings() {
        let settings = DownloaderSettings::default()
            .with_ytdlp_path(Some("/bin/yt-dlp".into()))
            .with_proxy(Some("http://proxy:8080".into()));
        let fetcher = CliMetadataFetcher::new(settings);
        let args = fetcher.build_args("https://youtu.be/abc");

        assert_eq!(fetcher.ytdlp_path(), "/bin/yt-dlp");
        assert_eq!(args.first().map(String::as_str), Some("--dump-single-json"));
        assert!(args.windows(2).any(|w| w == ["--proxy", "http://proxy:8080"]));
        assert_eq!(args.last().map(String::as_str), Some("https://youtu.be/abc"));
    }

    #[test]
    fn test_parse_video_and_playlist() {
        let video = br#"{"_type": "video", "title": "t", "formats": []}"#;
        let parsed = CliMetadataFetcher::parse_json(video).unwrap().unwrap();
        assert_eq!(parsed.kind(), Some(SourceKind::Video));

        let playlist = br#"{"_type": "playlist", "title": "p", "entries": [null, {"title": "e"}]}"#;
        let parsed = CliMetadataFetcher::parse_json(playlist).unwrap().unwrap();
        assert_eq!(parsed.kind(), Some(SourceKind::Playlist));
        assert_eq!(parsed.entry_count(), 2);
    }

    #[test]
    fn test_parse_empty_and_garbage() {
        assert!(CliMetadataFetcher::parse_json(b"  \n").unwrap().is_none());
        assert!(matches!(
            CliMetadataFetcher::parse_json(b"not json"),
            Err(DownloadError::ParseError(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fetch_with_stub_binary() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("yt-dlp");
        std::fs::write(
            &script,
            "#!/bin/sh\necho '{\"_type\": \"video\", \"title\": \"stub\", \"formats\": []}'\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let settings = DownloaderSettings::default()
            .with_ytdlp_path(Some(script.to_string_lossy().to_string()));
        let fetcher = CliMetadataFetcher::new(settings);

        let (tx, rx) = std::sync::mpsc::channel();
        let item = fetcher
            .fetch_metadata(
                "https://youtu.be/abc",
                Box::new(move |pid| {
                    let _ = tx.send(pid);
                }),
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(item.kind(), Some(SourceKind::Video));
        assert!(rx.try_recv().is_ok());
    }
}
