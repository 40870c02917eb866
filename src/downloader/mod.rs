// Downloader module - format resolution and search-session core

pub mod backends;
pub mod catalog;
pub mod command;
pub mod config;
pub mod controller;
pub mod descriptor;
pub mod errors;
pub mod extractors;
pub mod format_selector;
pub mod formatters;
pub mod models;
pub mod session;
pub mod traits;
pub mod utils;

pub use backends::{SystemTerminator, YtDlpEngine};
pub use catalog::FormatCatalog;
pub use command::DownloadCommand;
pub use config::DownloaderSettings;
pub use controller::{AutoSearchRequest, AutoSubmitDecision, SearchController};
pub use descriptor::{MediaOverview, SelectionDescriptor};
pub use errors::DownloadError;
pub use extractors::CliMetadataFetcher;
pub use format_selector::{FormatSelector, ResolvedSelection};
pub use models::{
    DownloadMode, DownloadProgress, FileType, MetadataItem, Notice, SelectionState, VideoFormat,
    VideoMetadata,
};
pub use session::{FetchOutcome, SearchSession, SearchStatus};
pub use traits::{
    DownloadEngine, LogNotifier, MetadataFetcher, Notifier, ProcessTerminator, ProgressEmitter,
};
