// DownloadCommand - the exact arguments handed to the download engine

use serde::{Deserialize, Serialize};

use super::errors::DownloadError;
use super::models::{DownloadMode, MetadataItem, SelectionState, SourceKind, BEST_FORMAT};

/// Arguments for one download-engine invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadCommand {
    /// Video page, or the top-level playlist URL
    pub source_url: String,
    /// A concrete format_id, or "video+audio" in combine mode
    pub format_token: String,
    /// Comma-joined language codes in pick order
    pub subtitle_langs: Option<String>,
    /// Container the engine should remux/merge into, or the audio codec
    /// to convert to when `extract_audio` is set
    pub container_override: Option<String>,
    /// Audio-only selection converted with the audio override
    #[serde(default)]
    pub extract_audio: bool,
    /// 1-based entry to fetch, playlists only
    pub playlist_index: Option<String>,
    pub source_kind: SourceKind,
}

impl DownloadCommand {
    /// Build the command for the current selection
    pub fn build(item: &MetadataItem, selection: &SelectionState) -> Result<Self, DownloadError> {
        let source_kind = item.kind().ok_or(DownloadError::NoMetadata)?;
        let record = item
            .active_record(&selection.playlist_index)
            .ok_or_else(|| DownloadError::PlaylistIndexOutOfRange(selection.playlist_index.clone()))?;

        let source_url = match item {
            MetadataItem::Video(video) => video.webpage_url.clone().or_else(|| video.original_url.clone()),
            MetadataItem::Playlist(playlist) => playlist
                .original_url
                .clone()
                .or_else(|| playlist.webpage_url.clone()),
            MetadataItem::Unsupported => None,
        }
        .filter(|url| !url.is_empty())
        .ok_or_else(|| DownloadError::Unknown("Metadata has no source URL".to_string()))?;

        let format_token = match selection.mode {
            DownloadMode::Combine => {
                if !selection.combine_pair_complete() {
                    return Err(DownloadError::IncompleteSelection(
                        "choose a video and an audio stream".to_string(),
                    ));
                }
                format!("{}+{}", selection.combine_video_id, selection.combine_audio_id)
            }
            DownloadMode::Selective if selection.selected_format == BEST_FORMAT => record
                .best_format()
                .map(|f| f.format_id.clone())
                .filter(|id| !id.is_empty())
                .ok_or_else(|| {
                    DownloadError::IncompleteSelection("no best format reported".to_string())
                })?,
            DownloadMode::Selective => {
                if selection.selected_format.is_empty() {
                    return Err(DownloadError::IncompleteSelection("choose a stream".to_string()));
                }
                selection.selected_format.clone()
            }
        };

        let subtitle_langs = if selection.subtitle_codes.is_empty() {
            None
        } else {
            Some(selection.subtitle_codes.join(","))
        };

        let playlist_index = match source_kind {
            SourceKind::Playlist => Some(selection.playlist_index.clone()),
            SourceKind::Video => None,
        };

        Ok(Self {
            source_url,
            format_token,
            subtitle_langs,
            container_override: None,
            extract_audio: false,
            playlist_index,
            source_kind,
        })
    }

    pub fn with_container_override(mut self, container: Option<String>) -> Self {
        self.container_override = container;
        self.extract_audio = false;
        self
    }

    /// Convert the audio-only download to `format`; `None` keeps the source
    pub fn with_audio_extraction(mut self, format: Option<String>) -> Self {
        self.extract_audio = format.is_some();
        self.container_override = format;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::models::{PlaylistMetadata, VideoFormat, VideoMetadata};

    fn best(id: &str) -> VideoFormat {
        serde_json::from_value(serde_json::json!({
            "format_id": id,
            "ext": "mp4",
            "vcodec": "avc1",
            "acodec": "mp4a"
        }))
        .unwrap()
    }

    fn video_item() -> MetadataItem {
        MetadataItem::Video(VideoMetadata {
            webpage_url: Some("https://www.youtube.com/watch?v=abc".to_string()),
            original_url: Some("https://youtu.be/abc".to_string()),
            formats: vec![best("18")],
            requested_downloads: vec![best("18")],
            ..VideoMetadata::default()
        })
    }

    fn playlist_item() -> MetadataItem {
        let entry = |id: &str| {
            Some(VideoMetadata {
                webpage_url: Some(format!("https://www.youtube.com/watch?v={}", id)),
                requested_downloads: vec![best(id)],
                ..VideoMetadata::default()
            })
        };
        MetadataItem::Playlist(PlaylistMetadata {
            entries: vec![entry("first"), entry("second")],
            original_url: Some("https://www.youtube.com/playlist?list=PL1".to_string()),
            webpage_url: Some("https://www.youtube.com/playlist?list=PL1&x=1".to_string()),
            ..PlaylistMetadata::default()
        })
    }

    #[test]
    fn test_best_becomes_concrete_format_id() {
        let command = DownloadCommand::build(&video_item(), &SelectionState::default()).unwrap();

        assert_eq!(command.source_url, "https://www.youtube.com/watch?v=abc");
        assert_eq!(command.format_token, "18");
        assert_eq!(command.subtitle_langs, None);
        assert_eq!(command.playlist_index, None);
        assert_eq!(command.source_kind, SourceKind::Video);
    }

    #[test]
    fn test_explicit_token_passes_through() {
        let selection = SelectionState {
            selected_format: "399+251".to_string(),
            ..SelectionState::default()
        };
        let command = DownloadCommand::build(&video_item(), &selection).unwrap();
        assert_eq!(command.format_token, "399+251");
    }

    #[test]
    fn test_combine_joins_pair_and_subtitles() {
        let mut selection = SelectionState {
            mode: DownloadMode::Combine,
            combine_video_id: "137".to_string(),
            combine_audio_id: "251".to_string(),
            ..SelectionState::default()
        };
        selection.set_subtitles(["fr", "en"]);

        let command = DownloadCommand::build(&video_item(), &selection).unwrap();
        assert_eq!(command.format_token, "137+251");
        assert_eq!(command.subtitle_langs.as_deref(), Some("fr,en"));
    }

    #[test]
    fn test_incomplete_combine_is_rejected() {
        let selection = SelectionState {
            mode: DownloadMode::Combine,
            combine_video_id: "137".to_string(),
            ..SelectionState::default()
        };
        assert!(matches!(
            DownloadCommand::build(&video_item(), &selection),
            Err(DownloadError::IncompleteSelection(_))
        ));
    }

    #[test]
    fn test_playlist_uses_top_level_url_and_entry_best() {
        let selection = SelectionState::for_playlist_index("2");
        let command = DownloadCommand::build(&playlist_item(), &selection).unwrap();

        assert_eq!(command.source_url, "https://www.youtube.com/playlist?list=PL1");
        assert_eq!(command.format_token, "second");
        assert_eq!(command.playlist_index.as_deref(), Some("2"));
        assert_eq!(command.source_kind, SourceKind::Playlist);
    }

    #[test]
    fn test_audio_extraction_flag_follows_override() {
        let command = DownloadCommand::build(&video_item(), &SelectionState::default()).unwrap();

        let audio = command.clone().with_audio_extraction(Some("mp3".to_string()));
        assert!(audio.extract_audio);
        assert_eq!(audio.container_override.as_deref(), Some("mp3"));

        let video = audio.with_container_override(Some("mkv".to_string()));
        assert!(!video.extract_audio);

        assert!(!command.with_audio_extraction(None).extract_audio);
    }

    #[test]
    fn test_playlist_index_out_of_range() {
        let selection = SelectionState::for_playlist_index("7");
        assert_eq!(
            DownloadCommand::build(&playlist_item(), &selection),
            Err(DownloadError::PlaylistIndexOutOfRange("7".to_string()))
        );
    }
}
