// Selection summary line shown next to the download button

use super::config::DownloaderSettings;
use super::format_selector::ResolvedSelection;
use super::formatters::{
    format_bitrate, format_compact_count, format_duration, format_duration_string,
    format_file_size, format_release_date,
};
use super::models::{DownloadMode, FileType, SelectionState, VideoMetadata};

pub const CHOOSE_PAIR_PROMPT: &str = "Choose a video and audio stream to combine";
pub const CHOOSE_STREAM_PROMPT: &str = "Choose a stream to download";
pub const SUBTITLE_MARKER: &str = "ESUB";
const UNKNOWN: &str = "unknown";
const UNKNOWN_SIZE: &str = "unknown filesize";

/// The pieces of a summary line, exposed for UIs that lay them out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionDescriptor {
    pub extension: String,
    pub resolution: String,
    pub dynamic_range: Option<String>,
    pub has_subtitles: bool,
    pub size: String,
}

impl SelectionDescriptor {
    pub fn describe(
        resolved: &ResolvedSelection<'_>,
        selection: &SelectionState,
        settings: &DownloaderSettings,
    ) -> Self {
        Self {
            extension: extension_label(resolved, settings),
            resolution: resolution_label(resolved),
            dynamic_range: dynamic_range_label(resolved),
            has_subtitles: !selection.subtitle_codes.is_empty(),
            size: size_label(resolved),
        }
    }

    /// "Auto - MP4 (1920x1080) HDR10 • ESUB • 12.5 MB"
    pub fn line(&self) -> String {
        let mut line = format!("{} ({})", self.extension, self.resolution);
        if let Some(dr) = &self.dynamic_range {
            line.push(' ');
            line.push_str(dr);
        }
        if self.has_subtitles {
            line.push_str(" • ");
            line.push_str(SUBTITLE_MARKER);
        }
        line.push_str(" • ");
        line.push_str(&self.size);
        line
    }
}

/// Final summary line, or a prompt when the selection is incomplete
pub fn summary_line(
    resolved: &ResolvedSelection<'_>,
    selection: &SelectionState,
    settings: &DownloaderSettings,
) -> String {
    match selection.mode {
        DownloadMode::Combine if !selection.combine_pair_complete() => {
            CHOOSE_PAIR_PROMPT.to_string()
        }
        DownloadMode::Selective if resolved.format.is_none() => CHOOSE_STREAM_PROMPT.to_string(),
        _ => SelectionDescriptor::describe(resolved, selection, settings).line(),
    }
}

/// Display strings for the header card of the active record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaOverview {
    pub title: String,
    pub uploader: String,
    pub duration: String,
    pub views: String,
    pub likes: String,
    pub upload_date: String,
    pub thumbnail: Option<String>,
}

impl MediaOverview {
    pub fn from_record(record: &VideoMetadata) -> Self {
        let text = |value: Option<&String>| {
            value
                .filter(|v| !v.trim().is_empty())
                .cloned()
                .unwrap_or_else(|| UNKNOWN.to_string())
        };

        let duration = match (&record.duration, &record.duration_string) {
            (Some(seconds), _) if *seconds > 0.0 => format_duration(*seconds),
            (_, Some(raw)) if !raw.is_empty() => format_duration_string(raw),
            _ => UNKNOWN.to_string(),
        };

        Self {
            title: text(record.title.as_ref()),
            uploader: text(
                record
                    .channel
                    .as_ref()
                    .filter(|c| !c.trim().is_empty())
                    .or(record.uploader.as_ref()),
            ),
            duration,
            views: record
                .view_count
                .map(format_compact_count)
                .unwrap_or_else(|| UNKNOWN.to_string()),
            likes: record
                .like_count
                .map(format_compact_count)
                .unwrap_or_else(|| UNKNOWN.to_string()),
            upload_date: record
                .upload_date
                .as_deref()
                .map(format_release_date)
                .unwrap_or_else(|| UNKNOWN.to_string()),
            thumbnail: record.thumbnail.clone(),
        }
    }
}

fn extension_label(resolved: &ResolvedSelection<'_>, settings: &DownloaderSettings) -> String {
    match resolved.mode {
        DownloadMode::Combine => {
            if let Some(forced) = settings.video_override() {
                format!("Combined - {}", forced.to_uppercase())
            } else {
                match (resolved.video, resolved.audio) {
                    (Some(video), Some(audio)) if !video.ext.is_empty() && !audio.ext.is_empty() => {
                        format!(
                            "Combined - {} + {}",
                            video.ext.to_uppercase(),
                            audio.ext.to_uppercase()
                        )
                    }
                    _ => format!("Combined - {}", UNKNOWN),
                }
            }
        }
        DownloadMode::Selective => {
            let Some(format) = resolved.format.filter(|f| !f.ext.is_empty()) else {
                return format!("Auto - {}", UNKNOWN);
            };
            let file_type = format.file_type();

            match (file_type, settings.video_override(), settings.audio_override()) {
                (ft, Some(forced), _) if ft.has_video() => {
                    format!("Forced - {}", forced.to_uppercase())
                }
                (FileType::Audio, _, Some(forced)) => format!("Forced - {}", forced.to_uppercase()),
                _ => format!("Auto - {}", format.ext.to_uppercase()),
            }
        }
    }
}

fn resolution_label(resolved: &ResolvedSelection<'_>) -> String {
    match resolved.mode {
        DownloadMode::Combine => {
            let video = resolved
                .video
                .and_then(|v| v.resolution.clone())
                .unwrap_or_else(|| UNKNOWN.to_string());
            let audio = resolved
                .audio
                .and_then(|a| a.tbr)
                .filter(|tbr| *tbr > 0.0)
                .map(format_bitrate)
                .unwrap_or_else(|| UNKNOWN.to_string());
            format!("{} + {}", video, audio)
        }
        DownloadMode::Selective => resolved
            .format
            .and_then(|f| f.resolution.clone())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string()),
    }
}

fn dynamic_range_label(resolved: &ResolvedSelection<'_>) -> Option<String> {
    let source = match resolved.mode {
        DownloadMode::Combine => resolved.video,
        DownloadMode::Selective => resolved.format,
    };
    source
        .and_then(|f| f.notable_dynamic_range())
        .map(str::to_string)
}

fn size_label(resolved: &ResolvedSelection<'_>) -> String {
    let bytes = match resolved.mode {
        DownloadMode::Combine => match (
            resolved.video.and_then(|v| v.filesize_approx),
            resolved.audio.and_then(|a| a.filesize_approx),
        ) {
            (Some(v), Some(a)) if v > 0 && a > 0 => Some(v + a),
            _ => None,
        },
        DownloadMode::Selective => resolved.format.and_then(|f| f.filesize_approx).filter(|s| *s > 0),
    };

    bytes
        .map(format_file_size)
        .unwrap_or_else(|| UNKNOWN_SIZE.to_string())
}
