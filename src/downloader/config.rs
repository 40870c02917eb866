// Persisted downloader settings

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::DownloadError;

/// Container value meaning "let the engine decide"
pub const AUTO_CONTAINER: &str = "auto";

const APP_DIR: &str = "media-downloader";
const SETTINGS_FILE: &str = "settings.json";

/// User settings consumed by the catalog, descriptor and collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloaderSettings {
    /// Forced container for video downloads, or "auto"
    pub video_format: String,
    /// Forced container for audio downloads, or "auto"
    pub audio_format: String,
    /// Delay before an external auto-submit request fires
    pub auto_submit_delay_ms: u64,
    /// Domains whose metadata gets av1+opus quality presets
    pub preset_domains: Vec<String>,
    /// Container label given to synthesized presets
    pub preset_container: String,
    /// Explicit yt-dlp binary, otherwise discovered
    pub ytdlp_path: Option<String>,
    /// SOCKS5/HTTP proxy URL passed to yt-dlp
    pub proxy: Option<String>,
    /// yt-dlp --socket-timeout value
    pub socket_timeout_secs: Option<u32>,
    /// Where downloads land
    pub download_dir: String,
}

impl Default for DownloaderSettings {
    fn default() -> Self {
        Self {
            video_format: AUTO_CONTAINER.to_string(),
            audio_format: AUTO_CONTAINER.to_string(),
            auto_submit_delay_ms: 300,
            preset_domains: vec!["youtube.com".to_string()],
            preset_container: "webm".to_string(),
            ytdlp_path: None,
            proxy: None,
            socket_timeout_secs: Some(15),
            download_dir: dirs::download_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .to_string_lossy()
                .to_string(),
        }
    }
}

impl DownloaderSettings {
    pub fn with_video_format(mut self, format: impl Into<String>) -> Self {
        self.video_format = format.into();
        self
    }

    pub fn with_audio_format(mut self, format: impl Into<String>) -> Self {
        self.audio_format = format.into();
        self
    }

    pub fn with_auto_submit_delay_ms(mut self, delay: u64) -> Self {
        self.auto_submit_delay_ms = delay;
        self
    }

    pub fn with_preset_domains(mut self, domains: Vec<String>) -> Self {
        self.preset_domains = domains;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_ytdlp_path(mut self, path: Option<String>) -> Self {
        self.ytdlp_path = path;
        self
    }

    pub fn with_download_dir(mut self, dir: impl Into<String>) -> Self {
        self.download_dir = dir.into();
        self
    }

    /// Forced video container, `None` when set to auto
    pub fn video_override(&self) -> Option<&str> {
        container_override(&self.video_format)
    }

    /// Forced audio container, `None` when set to auto
    pub fn audio_override(&self) -> Option<&str> {
        container_override(&self.audio_format)
    }

    /// Whether presets are synthesized for this source domain
    pub fn presets_enabled_for(&self, domain: Option<&str>) -> bool {
        domain.map_or(false, |d| {
            self.preset_domains
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(d))
        })
    }

    /// Default settings file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(SETTINGS_FILE))
    }

    /// Load from the default location, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            tracing::warn!("[Settings] No config directory, using defaults");
            return Self::default();
        };

        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::info!("[Settings] Using defaults ({}): {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, DownloadError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), DownloadError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::debug!("[Settings] Saved to {}", path.display());
        Ok(())
    }
}

fn container_override(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(AUTO_CONTAINER) {
        None
    } else {
        Some(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_means_no_override() {
        let settings = DownloaderSettings::default();
        assert_eq!(settings.video_override(), None);
        assert_eq!(settings.audio_override(), None);

        let settings = settings.with_video_format("mkv").with_audio_format("AUTO");
        assert_eq!(settings.video_override(), Some("mkv"));
        assert_eq!(settings.audio_override(), None);
    }

    #[test]
    fn test_preset_allow_list() {
        let settings = DownloaderSettings::default();
        assert!(settings.presets_enabled_for(Some("youtube.com")));
        assert!(!settings.presets_enabled_for(Some("vimeo.com")));
        assert!(!settings.presets_enabled_for(None));
    }

    #[test]
    fn test_custom_preset_domains() {
        let settings = DownloaderSettings::default()
            .with_preset_domains(vec!["vimeo.com".to_string()]);
        assert!(settings.presets_enabled_for(Some("vimeo.com")));
        assert!(!settings.presets_enabled_for(Some("youtube.com")));

        let disabled = DownloaderSettings::default().with_preset_domains(Vec::new());
        assert!(!disabled.presets_enabled_for(Some("youtube.com")));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE);

        let settings = DownloaderSettings::default()
            .with_video_format("mp4")
            .with_auto_submit_delay_ms(50)
            .with_download_dir("/tmp/media");
        settings.save_to(&path).unwrap();

        assert_eq!(DownloaderSettings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: DownloaderSettings = serde_json::from_str(r#"{"audio_format": "mp3"}"#).unwrap();
        assert_eq!(parsed.audio_override(), Some("mp3"));
        assert_eq!(parsed.auto_submit_delay_ms, 300);
        assert_eq!(parsed.preset_container, "webm");
    }
}
