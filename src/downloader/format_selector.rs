// FormatSelector - resolves selection tokens against the catalog
//
// The lookup universe is the union of all catalog lists. The "best"
// sentinel bypasses the catalog and resolves to the extractor's own pick
// for the active record.

use super::catalog::FormatCatalog;
use super::models::{
    DownloadMode, FileType, MetadataItem, SelectionState, VideoFormat, VideoMetadata, BEST_FORMAT,
};

/// Formats the current selection points at
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSelection<'a> {
    pub mode: DownloadMode,
    /// Selective-mode pick (or `requested_downloads[0]` for "best")
    pub format: Option<&'a VideoFormat>,
    /// Combine-mode video side
    pub video: Option<&'a VideoFormat>,
    /// Combine-mode audio side
    pub audio: Option<&'a VideoFormat>,
}

impl ResolvedSelection<'_> {
    /// File type of the selective-mode pick
    pub fn file_type(&self) -> FileType {
        self.format.map_or(FileType::Unknown, VideoFormat::file_type)
    }
}

/// Resolves tokens for one active record and its catalog
pub struct FormatSelector<'a> {
    record: Option<&'a VideoMetadata>,
    catalog: &'a FormatCatalog,
}

impl<'a> FormatSelector<'a> {
    pub fn new(record: Option<&'a VideoMetadata>, catalog: &'a FormatCatalog) -> Self {
        Self { record, catalog }
    }

    /// Selector for the record chosen by `playlist_index`
    pub fn for_item(item: &'a MetadataItem, playlist_index: &str, catalog: &'a FormatCatalog) -> Self {
        Self::new(item.active_record(playlist_index), catalog)
    }

    /// "best" is the record's top pick; anything else must be in the catalog
    pub fn resolve_format(&self, token: &str) -> Option<&'a VideoFormat> {
        if token == BEST_FORMAT {
            return self.record.and_then(VideoMetadata::best_format);
        }
        self.catalog.find(token)
    }

    /// Independent lookups of both sides of a combine pair
    pub fn resolve_pair(
        &self,
        video_id: &str,
        audio_id: &str,
    ) -> (Option<&'a VideoFormat>, Option<&'a VideoFormat>) {
        (self.catalog.find(video_id), self.catalog.find(audio_id))
    }

    pub fn resolve(&self, selection: &SelectionState) -> ResolvedSelection<'a> {
        let (video, audio) =
            self.resolve_pair(&selection.combine_video_id, &selection.combine_audio_id);

        ResolvedSelection {
            mode: selection.mode,
            format: self.resolve_format(&selection.selected_format),
            video,
            audio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::config::DownloaderSettings;
    use crate::downloader::models::{PlaylistMetadata, CODEC_NONE};

    fn format(id: &str, vcodec: &str, acodec: &str) -> VideoFormat {
        VideoFormat {
            format_id: id.to_string(),
            format: None,
            ext: "mp4".to_string(),
            vcodec: vcodec.to_string(),
            acodec: acodec.to_string(),
            resolution: None,
            width: None,
            height: None,
            fps: None,
            tbr: None,
            abr: None,
            vbr: None,
            filesize: None,
            filesize_approx: None,
            dynamic_range: None,
            format_note: None,
            audio_ext: None,
            video_ext: None,
        }
    }

    fn record() -> VideoMetadata {
        VideoMetadata {
            formats: vec![
                format("18", "avc1", "mp4a"),
                format("137", "avc1", CODEC_NONE),
                format("140", CODEC_NONE, "mp4a"),
            ],
            requested_downloads: vec![format("18", "avc1", "mp4a")],
            ..VideoMetadata::default()
        }
    }

    #[test]
    fn test_best_resolves_to_requested_download() {
        let item = MetadataItem::Video(record());
        let catalog = FormatCatalog::build(&item, "1", &DownloaderSettings::default());
        let selector = FormatSelector::for_item(&item, "1", &catalog);

        let best = selector.resolve_format(BEST_FORMAT).unwrap();
        assert_eq!(best.format_id, "18");
        assert_eq!(best.file_type(), FileType::VideoAudio);
    }

    #[test]
    fn test_best_ignores_catalog_contents() {
        let mut video = record();
        video.requested_downloads = vec![format("299+140", "avc1", "mp4a")];
        let item = MetadataItem::Video(video);
        let empty = FormatCatalog::default();

        let selector = FormatSelector::for_item(&item, "1", &empty);
        assert_eq!(selector.resolve_format("best").unwrap().format_id, "299+140");
        assert!(selector.resolve_format("18").is_none());
    }

    #[test]
    fn test_unknown_token_is_not_found() {
        let item = MetadataItem::Video(record());
        let catalog = FormatCatalog::build(&item, "1", &DownloaderSettings::default());
        let selector = FormatSelector::for_item(&item, "1", &catalog);

        assert!(selector.resolve_format("999").is_none());
        assert_eq!(selector.resolve_format("140").unwrap().file_type(), FileType::Audio);
    }

    #[test]
    fn test_pair_sides_resolve_independently() {
        let item = MetadataItem::Video(record());
        let catalog = FormatCatalog::build(&item, "1", &DownloaderSettings::default());
        let selector = FormatSelector::for_item(&item, "1", &catalog);

        let (video, audio) = selector.resolve_pair("137", "");
        assert_eq!(video.unwrap().format_id, "137");
        assert!(audio.is_none());

        let selection = SelectionState {
            mode: DownloadMode::Combine,
            combine_video_id: "137".to_string(),
            combine_audio_id: "140".to_string(),
            ..SelectionState::default()
        };
        let resolved = selector.resolve(&selection);
        assert_eq!(resolved.video.unwrap().file_type(), FileType::Video);
        assert_eq!(resolved.audio.unwrap().file_type(), FileType::Audio);
    }

    #[test]
    fn test_best_follows_active_playlist_entry() {
        let mut second = record();
        second.requested_downloads = vec![format("22", "avc1", "mp4a")];
        let item = MetadataItem::Playlist(PlaylistMetadata {
            entries: vec![Some(record()), Some(second)],
            ..PlaylistMetadata::default()
        });
        let catalog = FormatCatalog::build(&item, "2", &DownloaderSettings::default());

        let selector = FormatSelector::for_item(&item, "2", &catalog);
        assert_eq!(selector.resolve_format(BEST_FORMAT).unwrap().format_id, "22");
    }
}
