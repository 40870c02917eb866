// FormatCatalog - typed format subsets for the active record
//
// Splits the raw format list of one video-like record into:
// - audio-only, video-only and muxed (video+audio) formats
// - synthesized av1+opus quality presets for allow-listed domains
//
// Every list is ordered by total bitrate, lowest first, with unknown
// bitrates last.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::config::DownloaderSettings;
use super::models::{MetadataItem, VideoFormat, VideoMetadata};

/// Notes whose presets pair with the smallest opus track
const LOW_RES_NOTES: [&str; 2] = ["144p", "240p"];

/// Selectable formats derived from one record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatCatalog {
    pub audio_only: Vec<VideoFormat>,
    pub video_only: Vec<VideoFormat>,
    pub combined: Vec<VideoFormat>,
    pub quality_presets: Vec<VideoFormat>,
}

impl FormatCatalog {
    /// Build the catalog for the record selected by `playlist_index`
    pub fn build(
        item: &MetadataItem,
        playlist_index: &str,
        settings: &DownloaderSettings,
    ) -> Self {
        let Some(record) = item.active_record(playlist_index) else {
            return Self::default();
        };

        let with_presets = settings.presets_enabled_for(item.source_domain());
        Self::from_record(record, with_presets, &settings.preset_container)
    }

    /// Build from a single record; presets only when `with_presets`
    pub fn from_record(record: &VideoMetadata, with_presets: bool, preset_container: &str) -> Self {
        let formats = &record.formats;

        let audio_only = sort_by_bitrate(
            formats
                .iter()
                .filter(|f| !f.has_video() && f.has_audio())
                .cloned()
                .collect(),
        );
        let video_only = sort_by_bitrate(
            formats
                .iter()
                .filter(|f| f.has_video() && !f.has_audio())
                .cloned()
                .collect(),
        );
        let combined = sort_by_bitrate(
            formats
                .iter()
                .filter(|f| f.has_video() && f.has_audio())
                .cloned()
                .collect(),
        );

        let quality_presets = if with_presets {
            build_quality_presets(formats, preset_container)
        } else {
            Vec::new()
        };

        Self {
            audio_only,
            video_only,
            combined,
            quality_presets,
        }
    }

    /// Combine mode needs something on both sides
    pub fn supports_combine(&self) -> bool {
        !self.video_only.is_empty() && !self.audio_only.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.audio_only.is_empty()
            && self.video_only.is_empty()
            && self.combined.is_empty()
            && self.quality_presets.is_empty()
    }

    /// Every selectable format, in lookup order
    pub fn iter(&self) -> impl Iterator<Item = &VideoFormat> {
        self.audio_only
            .iter()
            .chain(self.video_only.iter())
            .chain(self.combined.iter())
            .chain(self.quality_presets.iter())
    }

    /// First catalog entry with this `format_id`
    pub fn find(&self, format_id: &str) -> Option<&VideoFormat> {
        if format_id.is_empty() {
            return None;
        }
        self.iter().find(|f| f.format_id == format_id)
    }
}

/// Stable sort on `tbr`, unknown bitrates last
pub fn sort_by_bitrate(mut formats: Vec<VideoFormat>) -> Vec<VideoFormat> {
    formats.sort_by(|a, b| compare_bitrate(a.tbr, b.tbr));
    formats
}

fn compare_bitrate(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Pair every av1 video with an opus track: low resolutions get the
/// smallest opus track, everything else the largest.
fn build_quality_presets(formats: &[VideoFormat], container: &str) -> Vec<VideoFormat> {
    let av1_video = sort_by_bitrate(formats.iter().filter(|f| f.is_av1()).cloned().collect());
    let opus_audio = sort_by_bitrate(formats.iter().filter(|f| f.is_opus()).cloned().collect());

    let (Some(lowest), Some(highest)) = (opus_audio.first(), opus_audio.last()) else {
        return Vec::new();
    };

    av1_video
        .iter()
        .map(|video| {
            let audio = if is_low_resolution(video) { lowest } else { highest };
            synthesize_preset(video, audio, container)
        })
        .collect()
}

fn is_low_resolution(format: &VideoFormat) -> bool {
    format
        .format_note
        .as_deref()
        .map_or(false, |note| LOW_RES_NOTES.iter().any(|p| note.starts_with(p)))
}

fn join_labels(video: Option<&str>, audio: Option<&str>) -> Option<String> {
    match (video, audio) {
        (Some(v), Some(a)) => Some(format!("{}+{}", v, a)),
        (Some(v), None) => Some(v.to_string()),
        (None, Some(a)) => Some(a.to_string()),
        (None, None) => None,
    }
}

fn sum_if_both<T: std::ops::Add<Output = T>>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a + b),
        _ => None,
    }
}

fn synthesize_preset(video: &VideoFormat, audio: &VideoFormat, container: &str) -> VideoFormat {
    VideoFormat {
        format_id: format!("{}+{}", video.format_id, audio.format_id),
        format: join_labels(video.format.as_deref(), audio.format.as_deref()),
        format_note: join_labels(video.format_note.as_deref(), audio.format_note.as_deref()),
        ext: container.to_string(),
        acodec: audio.acodec.clone(),
        audio_ext: audio.audio_ext.clone(),
        filesize_approx: sum_if_both(video.filesize_approx, audio.filesize_approx),
        tbr: sum_if_both(video.tbr, audio.tbr),
        ..video.clone()
    }
}
