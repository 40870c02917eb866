// Collaborator traits consumed by the search controller

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use super::command::DownloadCommand;
use super::errors::DownloadError;
use super::models::{DownloadProgress, MetadataItem, Notice};

/// Receives the pid of a spawned extraction process
pub type PidReporter = Box<dyn FnOnce(u32) + Send>;

/// URL-metadata extraction engine
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    /// Name of the fetcher (for logging)
    fn name(&self) -> &'static str;

    /// Fetch the metadata tree for `url`. `report_pid` is called once the
    /// external process is running so it can be cancelled out of band.
    /// `Ok(None)` means the engine produced nothing.
    async fn fetch_metadata(
        &self,
        url: &str,
        report_pid: PidReporter,
    ) -> Result<Option<MetadataItem>, DownloadError>;
}

/// Best-effort termination of an external process
#[async_trait]
pub trait ProcessTerminator: Send + Sync {
    async fn terminate(&self, pid: u32) -> Result<(), DownloadError>;
}

/// Download engine accepting a resolved command
#[async_trait]
pub trait DownloadEngine: Send + Sync {
    /// Name of the engine (for logging)
    fn name(&self) -> &'static str;

    /// Start the transfer; resolves once the engine accepted the request
    async fn start_download(&self, command: &DownloadCommand) -> Result<(), DownloadError>;
}

/// Toast presentation
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Notifier that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        tracing::warn!("[Notice] {}: {}", notice.title(), notice.description());
    }
}

/// Progress emitter helper
#[derive(Debug, Clone, Default)]
pub struct ProgressEmitter {
    sender: Option<UnboundedSender<DownloadProgress>>,
}

impl ProgressEmitter {
    pub fn new(sender: UnboundedSender<DownloadProgress>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    pub fn emit(&self, progress: DownloadProgress) {
        tracing::debug!("[Progress] {:.1}% {}", progress.percent, progress.status);
        if let Some(sender) = &self.sender {
            let _ = sender.send(progress);
        }
    }
}
