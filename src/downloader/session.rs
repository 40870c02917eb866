// SearchSession - state of one metadata search and the selection made on it
//
// Pure state machine, no I/O. The controller drives it around the awaited
// collaborator calls:
//
//   Idle --begin_search--> Loading --finish_search--> Idle
//                             |
//                             +------cancel---------> Idle
//
// Every submission gets a ticket; completions carrying an old ticket are
// ignored so a cancelled or superseded fetch can never repopulate state.

use serde::{Deserialize, Serialize};

use super::catalog::FormatCatalog;
use super::command::DownloadCommand;
use super::config::DownloaderSettings;
use super::descriptor::{summary_line, MediaOverview};
use super::errors::DownloadError;
use super::format_selector::{FormatSelector, ResolvedSelection};
use super::models::{
    DownloadMode, FileType, MetadataItem, PlaylistHeader, SelectionState, SubtitleLanguage,
    VideoMetadata,
};
use super::utils::validate_url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SearchStatus {
    #[default]
    Idle,
    Loading,
}

/// Identifies one submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTicket(u64);

/// What a finished fetch did to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Metadata stored
    Loaded,
    /// Nothing usable; the empty-result toast is due
    Empty,
    /// The submission was cancelled or superseded, result dropped
    Stale,
}

#[derive(Debug, Clone)]
pub struct SearchSession {
    settings: DownloaderSettings,
    url: String,
    status: SearchStatus,
    metadata: Option<MetadataItem>,
    process_id: Option<u32>,
    suppress_error_toast: bool,
    selection: SelectionState,
    catalog: FormatCatalog,
    generation: u64,
    starting_download: bool,
}

impl Default for SearchSession {
    fn default() -> Self {
        Self::new(DownloaderSettings::default())
    }
}

impl SearchSession {
    pub fn new(settings: DownloaderSettings) -> Self {
        Self {
            settings,
            url: String::new(),
            status: SearchStatus::Idle,
            metadata: None,
            process_id: None,
            suppress_error_toast: false,
            selection: SelectionState::default(),
            catalog: FormatCatalog::default(),
            generation: 0,
            starting_download: false,
        }
    }

    pub fn settings(&self) -> &DownloaderSettings {
        &self.settings
    }

    /// Current input text
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    pub fn status(&self) -> SearchStatus {
        self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status == SearchStatus::Loading
    }

    pub fn metadata(&self) -> Option<&MetadataItem> {
        self.metadata.as_ref()
    }

    pub fn process_id(&self) -> Option<u32> {
        self.process_id
    }

    pub fn suppress_error_toast(&self) -> bool {
        self.suppress_error_toast
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn catalog(&self) -> &FormatCatalog {
        &self.catalog
    }

    pub fn is_starting_download(&self) -> bool {
        self.starting_download
    }

    /// Submit affordance: idle with a valid URL in the input
    pub fn can_submit(&self) -> bool {
        !self.is_loading() && validate_url(&self.url).is_ok()
    }

    // ---- search lifecycle ----

    /// Idle -> Loading. Clears metadata, process id and selection.
    pub fn begin_search(&mut self, url: &str) -> Result<SearchTicket, DownloadError> {
        if self.is_loading() {
            return Err(DownloadError::SearchInProgress);
        }
        let url = validate_url(url)?;

        self.url = url;
        self.metadata = None;
        self.process_id = None;
        self.suppress_error_toast = false;
        self.selection = SelectionState::default();
        self.catalog = FormatCatalog::default();
        self.status = SearchStatus::Loading;
        self.generation += 1;

        Ok(SearchTicket(self.generation))
    }

    /// Record the extraction pid. `false` for a cancelled or superseded
    /// ticket, whose process nobody will stop otherwise.
    pub fn attach_process(&mut self, ticket: SearchTicket, pid: u32) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.process_id = Some(pid);
        true
    }

    /// Loading -> Idle with the fetch result
    pub fn finish_search(
        &mut self,
        ticket: SearchTicket,
        result: Option<MetadataItem>,
    ) -> FetchOutcome {
        if !self.is_current(ticket) {
            tracing::debug!("[Session] Dropping result of superseded search #{}", ticket.0);
            return FetchOutcome::Stale;
        }

        self.status = SearchStatus::Idle;
        self.process_id = None;

        match result {
            Some(item) if item.is_usable() => {
                self.metadata = Some(item);
                self.rebuild_catalog();
                FetchOutcome::Loaded
            }
            _ => {
                self.metadata = None;
                FetchOutcome::Empty
            }
        }
    }

    /// Loading -> Idle immediately; returns the pid to terminate.
    /// The cancelled ticket goes stale, so its late result is dropped without
    /// a toast.
    pub fn cancel(&mut self) -> Result<Option<u32>, DownloadError> {
        if !self.is_loading() {
            return Err(DownloadError::NotLoading);
        }

        self.suppress_error_toast = true;
        self.metadata = None;
        self.status = SearchStatus::Idle;
        Ok(self.process_id.take())
    }

    fn is_current(&self, ticket: SearchTicket) -> bool {
        self.is_loading() && ticket.0 == self.generation
    }

    fn rebuild_catalog(&mut self) {
        self.catalog = match &self.metadata {
            Some(item) => FormatCatalog::build(item, &self.selection.playlist_index, &self.settings),
            None => FormatCatalog::default(),
        };
    }

    // ---- selection ----

    pub fn set_mode(&mut self, mode: DownloadMode) {
        self.selection.mode = mode;
    }

    pub fn select_format(&mut self, token: impl Into<String>) {
        self.selection.selected_format = token.into();
    }

    pub fn select_combine_video(&mut self, format_id: impl Into<String>) {
        self.selection.combine_video_id = format_id.into();
    }

    pub fn select_combine_audio(&mut self, format_id: impl Into<String>) {
        self.selection.combine_audio_id = format_id.into();
    }

    pub fn toggle_subtitle(&mut self, code: &str) {
        self.selection.toggle_subtitle(code);
    }

    pub fn set_subtitles<I, S>(&mut self, codes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selection.set_subtitles(codes);
    }

    /// Point at another playlist entry; the whole selection resets
    pub fn select_playlist_index(&mut self, index: &str) -> Result<(), DownloadError> {
        let item = self.metadata.as_ref().ok_or(DownloadError::NoMetadata)?;
        if !matches!(item, MetadataItem::Playlist(_)) || item.active_record(index).is_none() {
            return Err(DownloadError::PlaylistIndexOutOfRange(index.to_string()));
        }

        self.selection = SelectionState::for_playlist_index(index.trim());
        self.rebuild_catalog();
        Ok(())
    }

    // ---- derived views ----

    /// The video, or the selected playlist entry
    pub fn active_record(&self) -> Option<&VideoMetadata> {
        self.metadata
            .as_ref()
            .and_then(|item| item.active_record(&self.selection.playlist_index))
    }

    pub fn resolved(&self) -> ResolvedSelection<'_> {
        FormatSelector::new(self.active_record(), &self.catalog).resolve(&self.selection)
    }

    pub fn active_file_type(&self) -> FileType {
        self.resolved().file_type()
    }

    /// Summary line, `None` until metadata is loaded
    pub fn summary_line(&self) -> Option<String> {
        self.metadata.as_ref()?;
        Some(summary_line(&self.resolved(), &self.selection, &self.settings))
    }

    pub fn subtitle_languages(&self) -> Vec<SubtitleLanguage> {
        self.active_record()
            .map(VideoMetadata::subtitle_languages)
            .unwrap_or_default()
    }

    pub fn overview(&self) -> Option<MediaOverview> {
        self.active_record().map(MediaOverview::from_record)
    }

    pub fn playlist_header(&self) -> Option<PlaylistHeader> {
        self.metadata.as_ref().and_then(MetadataItem::playlist_header)
    }

    // ---- download dispatch ----

    /// Download affordance state
    pub fn can_start_download(&self) -> bool {
        if self.starting_download || self.metadata.is_none() || self.is_loading() {
            return false;
        }
        match self.selection.mode {
            DownloadMode::Combine => self.selection.combine_pair_complete(),
            DownloadMode::Selective => !self.selection.selected_format.is_empty(),
        }
    }

    /// Command for the current selection, carrying the forced container
    pub fn download_command(&self) -> Result<DownloadCommand, DownloadError> {
        let item = self.metadata.as_ref().ok_or(DownloadError::NoMetadata)?;
        let command = DownloadCommand::build(item, &self.selection)?;
        let video_override = self.settings.video_override().map(str::to_string);

        Ok(match self.selection.mode {
            DownloadMode::Combine => command.with_container_override(video_override),
            DownloadMode::Selective => match self.active_file_type() {
                FileType::Audio => command
                    .with_audio_extraction(self.settings.audio_override().map(str::to_string)),
                ft if ft.has_video() => command.with_container_override(video_override),
                _ => command,
            },
        })
    }

    /// Raise the starting flag and hand out the command
    pub fn begin_download(&mut self) -> Result<DownloadCommand, DownloadError> {
        if self.starting_download {
            return Err(DownloadError::DownloadInProgress);
        }
        let command = self.download_command()?;
        self.starting_download = true;
        Ok(command)
    }

    pub fn finish_download(&mut self) {
        self.starting_download = false;
    }
}
