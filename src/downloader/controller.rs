// SearchController - drives a SearchSession through the collaborators
//
// Responsibilities:
// - submit: validate, fetch metadata, store or report an empty result
// - cancel: leave Loading at once, then terminate the extraction process
// - auto-submit: react to requests posted by other parts of the app
// - start_download: hand the resolved command to the download engine
//
// The session lock is never held across an await.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::command::DownloadCommand;
use super::config::DownloaderSettings;
use super::errors::DownloadError;
use super::models::Notice;
use super::session::{FetchOutcome, SearchSession, SearchStatus};
use super::traits::{
    DownloadEngine, LogNotifier, MetadataFetcher, Notifier, PidReporter, ProcessTerminator,
};
use super::utils::validate_url;

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Search request posted from outside the downloader page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoSearchRequest {
    pub id: u64,
    pub url: Option<String>,
    pub auto_submit: bool,
}

impl AutoSearchRequest {
    pub fn new(url: impl Into<String>, auto_submit: bool) -> Self {
        Self {
            id: NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed),
            url: Some(url.into()),
            auto_submit,
        }
    }
}

#[derive(Debug, Default)]
struct MailboxState {
    slot: Option<AutoSearchRequest>,
    /// Highest request id already looked at
    high_water: u64,
}

/// Single-slot, latest-wins mailbox for auto-search requests
#[derive(Debug, Default)]
pub struct AutoRequestMailbox {
    state: Mutex<MailboxState>,
}

impl AutoRequestMailbox {
    /// Store `request`; requests that were already observed are ignored
    pub fn post(&self, request: AutoSearchRequest) -> bool {
        let mut state = lock(&self.state);
        if request.id <= state.high_water {
            tracing::debug!("[AutoSearch] Ignoring already seen request #{}", request.id);
            return false;
        }
        state.slot = Some(request);
        true
    }

    pub fn current(&self) -> Option<AutoSearchRequest> {
        lock(&self.state).slot.clone()
    }

    fn observe(&self) -> Option<AutoSearchRequest> {
        let mut state = lock(&self.state);
        let request = state.slot.clone()?;
        state.high_water = state.high_water.max(request.id);
        Some(request)
    }

    fn clear_auto_submit(&self, id: u64) {
        let mut state = lock(&self.state);
        if let Some(request) = state.slot.as_mut().filter(|r| r.id == id) {
            request.auto_submit = false;
        }
    }

    /// Empty the slot unless a newer request replaced `id`
    fn clear(&self, id: u64) {
        let mut state = lock(&self.state);
        if state.slot.as_ref().map_or(false, |r| r.id == id) {
            state.slot = None;
        }
    }
}

/// A submit waiting for its delay
#[derive(Debug)]
pub struct ScheduledSubmit {
    pub request_id: u64,
    pub url: String,
    pub delay: Duration,
    token: CancellationToken,
}

impl ScheduledSubmit {
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

/// What observing the mailbox led to
#[derive(Debug)]
pub enum AutoSubmitDecision {
    /// Nothing posted
    Idle,
    /// Request consumed without a search (auto-submit not set)
    Cleared,
    /// Request refused; the matching notice was raised
    Rejected(DownloadError),
    /// Submit scheduled; run it with `run_scheduled`
    Scheduled(ScheduledSubmit),
}

pub struct SearchController {
    session: Arc<Mutex<SearchSession>>,
    fetcher: Arc<dyn MetadataFetcher>,
    terminator: Arc<dyn ProcessTerminator>,
    engine: Arc<dyn DownloadEngine>,
    notifier: Arc<dyn Notifier>,
    mailbox: AutoRequestMailbox,
    /// Request id and token of the submit waiting for its delay
    pending_submit: Mutex<Option<(u64, CancellationToken)>>,
    auto_submit_delay: Duration,
}

impl SearchController {
    pub fn new(
        settings: DownloaderSettings,
        fetcher: Arc<dyn MetadataFetcher>,
        terminator: Arc<dyn ProcessTerminator>,
        engine: Arc<dyn DownloadEngine>,
    ) -> Self {
        Self {
            auto_submit_delay: Duration::from_millis(settings.auto_submit_delay_ms),
            session: Arc::new(Mutex::new(SearchSession::new(settings))),
            fetcher,
            terminator,
            engine,
            notifier: Arc::new(LogNotifier),
            mailbox: AutoRequestMailbox::default(),
            pending_submit: Mutex::new(None),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    fn session(&self) -> MutexGuard<'_, SearchSession> {
        lock(&self.session)
    }

    /// Read access to the session
    pub fn with_session<R>(&self, f: impl FnOnce(&SearchSession) -> R) -> R {
        f(&*self.session())
    }

    /// Selection edits and other synchronous session updates
    pub fn update_session<R>(&self, f: impl FnOnce(&mut SearchSession) -> R) -> R {
        f(&mut *self.session())
    }

    pub fn status(&self) -> SearchStatus {
        self.session().status()
    }

    pub fn mailbox(&self) -> &AutoRequestMailbox {
        &self.mailbox
    }

    // ---- search ----

    /// Manual submit; supersedes a pending auto-submit
    pub async fn submit(&self, url: &str) -> Result<FetchOutcome, DownloadError> {
        self.cancel_scheduled();
        self.run_search(url).await
    }

    async fn run_search(&self, url: &str) -> Result<FetchOutcome, DownloadError> {
        let ticket = self.session().begin_search(url)?;
        let url = self.session().url().to_string();
        tracing::info!("[Search] Fetching metadata for {} via {}", url, self.fetcher.name());

        let session = Arc::clone(&self.session);
        let terminator = Arc::clone(&self.terminator);
        let report_pid: PidReporter = Box::new(move |pid| {
            if lock(&session).attach_process(ticket, pid) {
                tracing::debug!("[Search] Extraction running as pid {}", pid);
                return;
            }
            tracing::info!("[Search] Search no longer current, terminating pid {}", pid);
            tokio::spawn(async move {
                if let Err(e) = terminator.terminate(pid).await {
                    tracing::warn!("[Search] Failed to terminate pid {}: {}", pid, e);
                }
            });
        });

        let result = match self.fetcher.fetch_metadata(&url, report_pid).await {
            Ok(item) => item,
            Err(e) => {
                tracing::warn!("[Search] {} failed: {}", self.fetcher.name(), e);
                None
            }
        };

        let outcome = self.session().finish_search(ticket, result);
        match outcome {
            FetchOutcome::Loaded => tracing::info!("[Search] Metadata loaded"),
            FetchOutcome::Empty => self.notifier.notify(Notice::EmptyResult),
            FetchOutcome::Stale => tracing::debug!("[Search] Result of a cancelled search dropped"),
        }
        Ok(outcome)
    }

    /// Stop the running search. State is Idle before the terminate call.
    pub async fn cancel(&self) -> Result<(), DownloadError> {
        let pid = self.session().cancel()?;
        tracing::info!("[Search] Cancelled");

        let Some(pid) = pid else {
            tracing::debug!("[Search] No extraction process to terminate");
            return Ok(());
        };

        if let Err(e) = self.terminator.terminate(pid).await {
            tracing::warn!("[Search] Failed to terminate pid {}: {}", pid, e);
        }
        Ok(())
    }

    // ---- auto-submit ----

    pub fn post_auto_request(&self, request: AutoSearchRequest) -> bool {
        self.mailbox.post(request)
    }

    /// React to the request currently in the mailbox
    pub fn observe_auto_request(&self) -> AutoSubmitDecision {
        let Some(request) = self.mailbox.observe() else {
            return AutoSubmitDecision::Idle;
        };

        let url = request.url.clone().filter(|u| !u.trim().is_empty());
        let loading = {
            let mut session = self.session();
            if let Some(url) = url.as_deref().filter(|u| *u != session.url()) {
                session.set_url(url);
            }
            session.is_loading()
        };

        // Without both a URL and the flag there is nothing to submit
        let url = match url {
            Some(url) if request.auto_submit => url,
            _ => {
                self.mailbox.clear(request.id);
                return AutoSubmitDecision::Cleared;
            }
        };

        if loading {
            self.mailbox.clear(request.id);
            self.notifier.notify(Notice::SearchInProgress);
            return AutoSubmitDecision::Rejected(DownloadError::SearchInProgress);
        }

        let url = match validate_url(&url) {
            Ok(url) => url,
            Err(e) => {
                self.mailbox.clear(request.id);
                self.notifier.notify(Notice::InvalidUrl);
                return AutoSubmitDecision::Rejected(e);
            }
        };

        self.mailbox.clear_auto_submit(request.id);

        let token = CancellationToken::new();
        if let Some((_, previous)) = lock(&self.pending_submit).replace((request.id, token.clone())) {
            previous.cancel();
        }
        tracing::debug!(
            "[AutoSearch] Request #{} scheduled in {:?}",
            request.id,
            self.auto_submit_delay
        );

        AutoSubmitDecision::Scheduled(ScheduledSubmit {
            request_id: request.id,
            url,
            delay: self.auto_submit_delay,
            token,
        })
    }

    /// Wait out the delay, then submit. `None` if cancelled first.
    pub async fn run_scheduled(
        &self,
        scheduled: ScheduledSubmit,
    ) -> Option<Result<FetchOutcome, DownloadError>> {
        tokio::select! {
            _ = scheduled.token.cancelled() => {
                tracing::debug!("[AutoSearch] Request #{} cancelled", scheduled.request_id);
                return None;
            }
            _ = tokio::time::sleep(scheduled.delay) => {}
        }

        {
            let mut pending = lock(&self.pending_submit);
            if pending.as_ref().map_or(false, |(id, _)| *id == scheduled.request_id) {
                *pending = None;
            }
        }

        self.mailbox.clear(scheduled.request_id);
        Some(self.run_search(&scheduled.url).await)
    }

    /// Observe the mailbox and run whatever it schedules
    pub async fn pump_auto_request(&self) -> Option<Result<FetchOutcome, DownloadError>> {
        match self.observe_auto_request() {
            AutoSubmitDecision::Scheduled(scheduled) => self.run_scheduled(scheduled).await,
            AutoSubmitDecision::Rejected(e) => Some(Err(e)),
            AutoSubmitDecision::Idle | AutoSubmitDecision::Cleared => None,
        }
    }

    fn cancel_scheduled(&self) {
        if let Some((id, token)) = lock(&self.pending_submit).take() {
            tracing::debug!("[AutoSearch] Manual submit supersedes request #{}", id);
            token.cancel();
        }
    }

    // ---- download ----

    pub fn can_start_download(&self) -> bool {
        self.session().can_start_download()
    }

    /// Hand the current selection to the engine; failures raise a toast
    pub async fn start_download(&self) -> Result<DownloadCommand, DownloadError> {
        let command = self.session().begin_download()?;
        tracing::info!(
            "[Download] {} -f {} via {}",
            command.source_url,
            command.format_token,
            self.engine.name()
        );

        let result = self.engine.start_download(&command).await;
        self.session().finish_download();

        match result {
            Ok(()) => Ok(command),
            Err(e) => {
                tracing::warn!("[Download] {} rejected the request: {}", self.engine.name(), e);
                self.notifier.notify(Notice::DownloadFailed(e.to_string()));
                Err(e)
            }
        }
    }
}

// A poisoned lock still holds consistent state here; keep going with it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
