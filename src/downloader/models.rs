// Common data models for the downloader core
//
// Mirrors the shape of yt-dlp's `--dump-single-json` output closely enough
// that the extractor output can be deserialized straight into these types.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Token meaning "use the extractor's own top pick".
pub const BEST_FORMAT: &str = "best";

/// Codec value yt-dlp uses for an absent stream.
pub const CODEC_NONE: &str = "none";

/// Dynamic range value that is not worth showing.
pub const STANDARD_DYNAMIC_RANGE: &str = "SDR";

fn codec_none() -> String {
    CODEC_NONE.to_string()
}

/// Missing and `null` codecs both collapse to the `"none"` sentinel.
fn codec_or_none<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(codec_none))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Byte counts sometimes come through as floats.
fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v.round() as u64))
}

/// Stream class of a format, derived from its codecs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileType {
    #[serde(rename = "video+audio")]
    VideoAudio,
    #[serde(rename = "video")]
    Video,
    #[serde(rename = "audio")]
    Audio,
    #[serde(rename = "unknown")]
    Unknown,
}

impl FileType {
    pub fn from_codecs(vcodec: Option<&str>, acodec: Option<&str>) -> Self {
        let has_video = vcodec.map_or(false, |v| v != CODEC_NONE && !v.is_empty());
        let has_audio = acodec.map_or(false, |a| a != CODEC_NONE && !a.is_empty());

        match (has_video, has_audio) {
            (true, true) => Self::VideoAudio,
            (true, false) => Self::Video,
            (false, true) => Self::Audio,
            (false, false) => Self::Unknown,
        }
    }

    /// Video and muxed formats honour the video container override
    pub fn has_video(&self) -> bool {
        matches!(self, Self::Video | Self::VideoAudio)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VideoAudio => write!(f, "video+audio"),
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// One downloadable encoding of a media item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoFormat {
    /// Format ID (e.g., "137", "140", or "399+251" for presets)
    #[serde(default)]
    pub format_id: String,
    /// yt-dlp's display string (e.g., "399 - 1920x1080 (1080p)")
    #[serde(default)]
    pub format: Option<String>,
    /// Container extension (mp4, webm, m4a)
    #[serde(default)]
    pub ext: String,
    /// Video codec, `"none"` when absent
    #[serde(default = "codec_none", deserialize_with = "codec_or_none")]
    pub vcodec: String,
    /// Audio codec, `"none"` when absent
    #[serde(default = "codec_none", deserialize_with = "codec_or_none")]
    pub acodec: String,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub fps: Option<f64>,
    /// Total bitrate in kbps
    #[serde(default)]
    pub tbr: Option<f64>,
    #[serde(default)]
    pub abr: Option<f64>,
    #[serde(default)]
    pub vbr: Option<f64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub filesize: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub filesize_approx: Option<u64>,
    #[serde(default)]
    pub dynamic_range: Option<String>,
    /// Format note (e.g., "1080p", "medium")
    #[serde(default)]
    pub format_note: Option<String>,
    #[serde(default)]
    pub audio_ext: Option<String>,
    #[serde(default)]
    pub video_ext: Option<String>,
}

impl VideoFormat {
    pub fn has_video(&self) -> bool {
        self.vcodec != CODEC_NONE && !self.vcodec.is_empty()
    }

    pub fn has_audio(&self) -> bool {
        self.acodec != CODEC_NONE && !self.acodec.is_empty()
    }

    pub fn file_type(&self) -> FileType {
        FileType::from_codecs(Some(&self.vcodec), Some(&self.acodec))
    }

    /// Check if format is AV1
    pub fn is_av1(&self) -> bool {
        self.vcodec.starts_with("av01")
    }

    /// Check if audio is Opus
    pub fn is_opus(&self) -> bool {
        self.acodec.starts_with("opus")
    }

    /// Dynamic range label, hidden for plain SDR
    pub fn notable_dynamic_range(&self) -> Option<&str> {
        self.dynamic_range
            .as_deref()
            .filter(|dr| !dr.is_empty() && *dr != STANDARD_DYNAMIC_RANGE)
    }
}

/// One subtitle track as listed by the extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleTrack {
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Selectable subtitle language of the active record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleLanguage {
    pub code: String,
    pub name: String,
}

/// A single video, or one entry of a playlist
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Duration in seconds
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub duration_string: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub view_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub like_count: Option<u64>,
    /// Upload date as `YYYYMMDD`
    #[serde(default)]
    pub upload_date: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub tbr: Option<f64>,
    #[serde(default)]
    pub fps: Option<f64>,
    #[serde(default)]
    pub dynamic_range: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subtitles: BTreeMap<String, Vec<SubtitleTrack>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub formats: Vec<VideoFormat>,
    /// The extractor's own pick; the first element is the canonical "best"
    #[serde(default, deserialize_with = "null_as_default")]
    pub requested_downloads: Vec<VideoFormat>,
    #[serde(default)]
    pub webpage_url: Option<String>,
    #[serde(default)]
    pub original_url: Option<String>,
    #[serde(default)]
    pub webpage_url_domain: Option<String>,
    #[serde(default)]
    pub extractor: Option<String>,

    // Present only on playlist entries
    #[serde(default)]
    pub playlist_index: Option<u32>,
    #[serde(default)]
    pub n_entries: Option<u32>,
    #[serde(default)]
    pub playlist_title: Option<String>,
    #[serde(default)]
    pub playlist_channel: Option<String>,
    #[serde(default)]
    pub playlist_uploader: Option<String>,
}

impl VideoMetadata {
    /// The extractor's top pick, if it reported one
    pub fn best_format(&self) -> Option<&VideoFormat> {
        self.requested_downloads.first()
    }

    /// Subtitle languages, named after their first track when possible
    pub fn subtitle_languages(&self) -> Vec<SubtitleLanguage> {
        self.subtitles
            .iter()
            .map(|(code, tracks)| SubtitleLanguage {
                code: code.clone(),
                name: tracks
                    .first()
                    .and_then(|t| t.name.clone())
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| code.clone()),
            })
            .collect()
    }
}

/// A playlist as returned by the extractor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaylistMetadata {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    /// Unavailable entries stay as `None` so positions keep matching
    /// `playlist_index`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub entries: Vec<Option<VideoMetadata>>,
    #[serde(default)]
    pub webpage_url: Option<String>,
    #[serde(default)]
    pub original_url: Option<String>,
    #[serde(default)]
    pub webpage_url_domain: Option<String>,
    #[serde(default)]
    pub extractor: Option<String>,
}

impl PlaylistMetadata {
    /// Entry at a 1-based position
    pub fn entry(&self, index: usize) -> Option<&VideoMetadata> {
        index
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .and_then(Option::as_ref)
    }

    fn first_entry(&self) -> Option<&VideoMetadata> {
        self.entries.iter().flatten().next()
    }
}

/// Where a metadata tree came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    Video,
    Playlist,
}

/// Extractor output, discriminated on yt-dlp's `_type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_type", rename_all = "lowercase")]
pub enum MetadataItem {
    Video(VideoMetadata),
    Playlist(PlaylistMetadata),
    /// Any other `_type` (url, url_transparent, ...)
    #[serde(other)]
    Unsupported,
}

impl MetadataItem {
    pub fn kind(&self) -> Option<SourceKind> {
        match self {
            Self::Video(_) => Some(SourceKind::Video),
            Self::Playlist(_) => Some(SourceKind::Playlist),
            Self::Unsupported => None,
        }
    }

    /// A video with at least one format, or a playlist with a non-null entry
    pub fn is_usable(&self) -> bool {
        match self {
            Self::Video(video) => !video.formats.is_empty(),
            Self::Playlist(playlist) => playlist.entries.iter().any(Option::is_some),
            Self::Unsupported => false,
        }
    }

    /// Domain of the top-level page (e.g., "youtube.com")
    pub fn source_domain(&self) -> Option<&str> {
        match self {
            Self::Video(video) => video.webpage_url_domain.as_deref(),
            Self::Playlist(playlist) => playlist.webpage_url_domain.as_deref(),
            Self::Unsupported => None,
        }
    }

    /// The video-like record every derivation works on: the video itself, or
    /// the playlist entry at the 1-based `playlist_index`.
    pub fn active_record(&self, playlist_index: &str) -> Option<&VideoMetadata> {
        match self {
            Self::Video(video) => Some(video),
            Self::Playlist(playlist) => playlist_index
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|index| playlist.entry(index)),
            Self::Unsupported => None,
        }
    }

    pub fn entry_count(&self) -> usize {
        match self {
            Self::Video(_) => 1,
            Self::Playlist(playlist) => playlist.entries.len(),
            Self::Unsupported => 0,
        }
    }

    /// Header shown above a playlist's entry list
    pub fn playlist_header(&self) -> Option<PlaylistHeader> {
        let Self::Playlist(playlist) = self else {
            return None;
        };
        let first = playlist.first_entry();

        let title = first
            .and_then(|e| e.playlist_title.clone())
            .or_else(|| playlist.title.clone())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "UNTITLED".to_string());
        let channel = first
            .and_then(|e| e.playlist_channel.clone().or_else(|| e.playlist_uploader.clone()))
            .or_else(|| playlist.channel.clone().or_else(|| playlist.uploader.clone()))
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "unknown".to_string());
        let entry_count = first
            .and_then(|e| e.n_entries)
            .map(|n| n as usize)
            .unwrap_or(playlist.entries.len());
        let extractor = first
            .and_then(|e| e.extractor.clone())
            .or_else(|| playlist.extractor.clone())
            .map(|name| capitalize(&name))
            .unwrap_or_else(|| "Unknown".to_string());

        Some(PlaylistHeader {
            title,
            channel,
            entry_count,
            extractor,
        })
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Display data for the playlist header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistHeader {
    pub title: String,
    pub channel: String,
    pub entry_count: usize,
    pub extractor: String,
}

/// How the user picks what to download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadMode {
    /// One format from the catalog, or the best sentinel
    #[default]
    Selective,
    /// A video-only and an audio-only format merged by the engine
    Combine,
}

/// Per-session selection, always reset as a whole
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    pub mode: DownloadMode,
    /// `"best"` or a `format_id`
    pub selected_format: String,
    pub combine_video_id: String,
    pub combine_audio_id: String,
    /// Language codes in the order they were picked
    pub subtitle_codes: Vec<String>,
    /// 1-based index into the playlist entries
    pub playlist_index: String,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self {
            mode: DownloadMode::Selective,
            selected_format: BEST_FORMAT.to_string(),
            combine_video_id: String::new(),
            combine_audio_id: String::new(),
            subtitle_codes: Vec::new(),
            playlist_index: "1".to_string(),
        }
    }
}

impl SelectionState {
    /// Fresh selection pointing at another playlist entry
    pub fn for_playlist_index(index: impl Into<String>) -> Self {
        Self {
            playlist_index: index.into(),
            ..Self::default()
        }
    }

    pub fn combine_pair_complete(&self) -> bool {
        !self.combine_video_id.is_empty() && !self.combine_audio_id.is_empty()
    }

    /// Add the code if missing, remove it otherwise
    pub fn toggle_subtitle(&mut self, code: &str) {
        if let Some(pos) = self.subtitle_codes.iter().position(|c| c == code) {
            self.subtitle_codes.remove(pos);
        } else {
            self.subtitle_codes.push(code.to_string());
        }
    }

    /// Replace the subtitle selection, dropping duplicates
    pub fn set_subtitles<I, S>(&mut self, codes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subtitle_codes.clear();
        for code in codes {
            let code = code.into();
            if !code.is_empty() && !self.subtitle_codes.contains(&code) {
                self.subtitle_codes.push(code);
            }
        }
    }
}

/// User-facing notice (toast) raised by the core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    EmptyResult,
    InvalidUrl,
    SearchInProgress,
    DownloadFailed(String),
}

impl Notice {
    pub fn title(&self) -> &'static str {
        match self {
            Self::EmptyResult => "Oops! No results found",
            Self::InvalidUrl => "Invalid URL",
            Self::SearchInProgress => "Search in progress",
            Self::DownloadFailed(_) => "Failed to Start Download",
        }
    }

    pub fn description(&self) -> String {
        match self {
            Self::EmptyResult => "The provided URL does not contain any downloadable content \
                or you are not connected to the internet. Please check the URL, your network \
                connection and try again."
                .to_string(),
            Self::InvalidUrl => "The provided URL is not valid.".to_string(),
            Self::SearchInProgress => "Search in progress, try again later.".to_string(),
            Self::DownloadFailed(reason) => {
                format!("There was an error initiating the download: {}", reason)
            }
        }
    }
}

/// Download progress information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadProgress {
    pub percent: f32,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_and_null_codecs_become_none() {
        let json = r#"{"format_id": "sb0", "ext": "mhtml", "acodec": null}"#;
        let format: VideoFormat = serde_json::from_str(json).unwrap();

        assert_eq!(format.vcodec, CODEC_NONE);
        assert_eq!(format.acodec, CODEC_NONE);
        assert_eq!(format.file_type(), FileType::Unknown);
    }

    #[test]
    fn test_file_type_classification() {
        assert_eq!(FileType::from_codecs(Some("avc1"), Some("mp4a")), FileType::VideoAudio);
        assert_eq!(FileType::from_codecs(Some("vp9"), Some("none")), FileType::Video);
        assert_eq!(FileType::from_codecs(Some("none"), Some("opus")), FileType::Audio);
        assert_eq!(FileType::from_codecs(None, None), FileType::Unknown);
    }

    #[test]
    fn test_metadata_tagged_on_type() {
        let video: MetadataItem = serde_json::from_str(
            r#"{"_type": "video", "title": "clip", "formats": [{"format_id": "18", "ext": "mp4", "vcodec": "avc1", "acodec": "mp4a", "filesize_approx": 1024.4}]}"#,
        )
        .unwrap();
        assert_eq!(video.kind(), Some(SourceKind::Video));
        assert!(video.is_usable());

        let playlist: MetadataItem =
            serde_json::from_str(r#"{"_type": "playlist", "entries": [null, {"title": "b"}]}"#)
                .unwrap();
        assert_eq!(playlist.kind(), Some(SourceKind::Playlist));
        assert!(playlist.active_record("1").is_none());
        assert_eq!(
            playlist.active_record("2").and_then(|e| e.title.as_deref()),
            Some("b")
        );

        let other: MetadataItem =
            serde_json::from_str(r#"{"_type": "url", "url": "https://example.com"}"#).unwrap();
        assert_eq!(other, MetadataItem::Unsupported);
        assert!(!other.is_usable());
    }

    #[test]
    fn test_empty_playlist_is_not_usable() {
        let playlist = MetadataItem::Playlist(PlaylistMetadata::default());
        assert!(!playlist.is_usable());

        let nulls: MetadataItem =
            serde_json::from_str(r#"{"_type": "playlist", "entries": [null, null]}"#).unwrap();
        assert!(!nulls.is_usable());
        assert!(playlist.active_record("1").is_none());
        assert!(playlist.active_record("0").is_none());
    }

    #[test]
    fn test_subtitle_languages_fall_back_to_code() {
        let mut video = VideoMetadata::default();
        video.subtitles.insert(
            "en".to_string(),
            vec![SubtitleTrack { ext: None, url: None, name: Some("English".to_string()) }],
        );
        video.subtitles.insert("xx".to_string(), vec![]);

        let languages = video.subtitle_languages();
        assert_eq!(languages[0], SubtitleLanguage { code: "en".into(), name: "English".into() });
        assert_eq!(languages[1], SubtitleLanguage { code: "xx".into(), name: "xx".into() });
    }

    #[test]
    fn test_playlist_header_fallbacks() {
        let entry = VideoMetadata {
            n_entries: Some(12),
            playlist_uploader: Some("Uploader".to_string()),
            extractor: Some("youtube:tab".to_string()),
            ..VideoMetadata::default()
        };
        let item = MetadataItem::Playlist(PlaylistMetadata {
            entries: vec![Some(entry)],
            ..PlaylistMetadata::default()
        });

        let header = item.playlist_header().unwrap();
        assert_eq!(header.title, "UNTITLED");
        assert_eq!(header.channel, "Uploader");
        assert_eq!(header.entry_count, 12);
        assert_eq!(header.extractor, "Youtube:tab");
    }

    #[test]
    fn test_subtitle_selection_keeps_pick_order() {
        let mut selection = SelectionState::default();
        selection.toggle_subtitle("fr");
        selection.toggle_subtitle("en");
        selection.toggle_subtitle("de");
        selection.toggle_subtitle("en");
        assert_eq!(selection.subtitle_codes, vec!["fr", "de"]);

        selection.set_subtitles(["en", "en", "ja"]);
        assert_eq!(selection.subtitle_codes, vec!["en", "ja"]);
    }

    #[test]
    fn test_playlist_index_change_resets_everything_else() {
        let selection = SelectionState::for_playlist_index("3");
        assert_eq!(selection.playlist_index, "3");
        assert_eq!(selection.selected_format, BEST_FORMAT);
        assert_eq!(selection.mode, DownloadMode::Selective);
        assert!(!selection.combine_pair_complete());
    }
}
