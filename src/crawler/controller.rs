//! Scan controller - crawl orchestration for one container at a time
//!
//! This module contains the scan loops and the per-container bookkeeping,
//! including:
//! - The scan state machine and its cancel token for each container
//! - The guard that keeps a second run off a busy container
//! - Smart scans (thread pages interleaved with promising-thread expansion)
//! - Deep scans (expansion of every pending thread)
//! - Progress and lifecycle reporting

use crate::analytics::{swallow, AnalyticsSink};
use crate::config::{ValidatedKey, DEFAULT_PROMISING_SCORE};
use crate::crawler::source::{CommentSource, SourceError};
use crate::state::{CancelToken, ScanMode, ScanState, ScanStatus};
use crate::storage::{Comment, ItemMetadata, LocalStore, StorageError};
use crate::{Result, SleuthError};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Tunables for scan runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSettings {
    /// Smart scans expand threads scoring strictly above this
    pub promising_score: u8,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            promising_score: DEFAULT_PROMISING_SCORE,
        }
    }
}

/// Per-container bookkeeping
struct Session {
    state: ScanState,
    cancel: CancelToken,

    /// A run future exists for this container
    active: bool,
}

struct Inner {
    source: Arc<CommentSource>,
    store: LocalStore,
    sink: Arc<dyn AnalyticsSink>,
    settings: ScanSettings,
    sessions: Mutex<HashMap<String, Session>>,
}

impl Inner {
    fn sessions(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        // Session updates are single assignments; a poisoned map is still consistent
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drives scans and tracks their state per container
///
/// Cloning yields another handle to the same sessions.
#[derive(Clone)]
pub struct ScanController {
    inner: Arc<Inner>,
}

impl ScanController {
    pub fn new(
        source: Arc<CommentSource>,
        store: LocalStore,
        sink: Arc<dyn AnalyticsSink>,
        settings: ScanSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                store,
                sink,
                settings,
                sessions: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn store(&self) -> &LocalStore {
        &self.inner.store
    }

    /// Current state of a container's scan; idle if it was never scanned
    pub fn state(&self, container_id: &str) -> ScanState {
        self.inner
            .sessions()
            .get(container_id)
            .map(|session| session.state.clone())
            .unwrap_or_default()
    }

    /// Fetches item metadata and stores it
    ///
    /// A previously stored scan stamp is carried over. `Ok(None)` means the
    /// item details could not be retrieved; scan state is not touched.
    pub async fn load_item(
        &self,
        container_id: &str,
        key: &ValidatedKey,
    ) -> Result<Option<ItemMetadata>> {
        let cancel = CancelToken::new();
        let Some(mut meta) = self
            .inner
            .source
            .fetch_item_metadata(container_id, key, &cancel)
            .await?
        else {
            tracing::warn!(container_id, "Could not retrieve item details");
            return Ok(None);
        };

        if let Some(previous) = self.inner.store.item_metadata(container_id)? {
            meta.last_scanned_at = previous.last_scanned_at;
            meta.scan_status = previous.scan_status;
        }
        self.inner.store.put_item_metadata(&meta)?;

        tracing::info!(
            container_id,
            title = %meta.title,
            comments = meta.total_comment_count,
            "Loaded item details"
        );
        Ok(Some(meta))
    }

    /// Runs a scan to its end and returns the final state
    ///
    /// `progress` is called with the size of every batch written. Failures
    /// inside the run end in an `Error` state rather than an `Err`.
    ///
    /// # Returns
    ///
    /// * `Ok(ScanState)` - The run ended complete, paused, or in error
    /// * `Err(SleuthError::ScanInProgress)` - Another run holds this container
    pub async fn start<P>(
        &self,
        container_id: &str,
        key: &ValidatedKey,
        mode: ScanMode,
        progress: P,
    ) -> Result<ScanState>
    where
        P: Fn(u64) + Send + Sync,
    {
        let guard = self.begin_run(container_id, mode)?;

        tracing::info!(container_id, %mode, "Scan started");
        swallow(
            "scan_started",
            self.inner.sink.record_scan_started(container_id, mode),
        );

        let mut run = Run {
            inner: &self.inner,
            container_id,
            key,
            cancel: guard.cancel.clone(),
            progress: &progress,
            skipped: HashSet::new(),
        };
        let outcome = match mode {
            ScanMode::Smart => run.smart().await,
            ScanMode::Deep => run.deep().await,
        };

        let state = self.finish(container_id, mode, outcome);
        drop(guard);
        Ok(state)
    }

    /// Cancels the running scan of a container
    ///
    /// The state moves to paused right away. Requests of that run still waiting
    /// in the queue are dropped; one already in flight settles first.
    ///
    /// Returns false when no scan is running.
    pub fn cancel(&self, container_id: &str) -> bool {
        let mut sessions = self.inner.sessions();
        match sessions.get_mut(container_id) {
            Some(session) if session.active && session.state.status == ScanStatus::Running => {
                session.cancel.cancel();
                session.state.pause();
                tracing::info!(container_id, "Scan cancellation requested");
                true
            }
            _ => false,
        }
    }

    /// Claims the container and moves its state to running
    fn begin_run(&self, container_id: &str, mode: ScanMode) -> Result<RunGuard> {
        let mut sessions = self.inner.sessions();
        let session = sessions
            .entry(container_id.to_string())
            .or_insert_with(|| Session {
                state: ScanState::default(),
                cancel: CancelToken::new(),
                active: false,
            });

        if session.active || !session.state.status.can_start() {
            tracing::warn!(container_id, "Rejected scan start: already running");
            return Err(SleuthError::ScanInProgress {
                container_id: container_id.to_string(),
            });
        }

        session.active = true;
        session.cancel = CancelToken::new();
        session.state.begin(mode);

        Ok(RunGuard {
            inner: Arc::clone(&self.inner),
            container_id: container_id.to_string(),
            cancel: session.cancel.clone(),
        })
    }

    /// Applies the run outcome to the state and reports it
    fn finish(
        &self,
        container_id: &str,
        mode: ScanMode,
        outcome: std::result::Result<(), Halt>,
    ) -> ScanState {
        let state = {
            let mut sessions = self.inner.sessions();
            match sessions.get_mut(container_id) {
                Some(session) => {
                    match &outcome {
                        Ok(()) => session.state.complete(),
                        Err(Halt::Cancelled) => {
                            session.state.pause();
                        }
                        Err(Halt::Failed(e)) => session.state.fail(e.to_string()),
                    }
                    session.state.clone()
                }
                None => ScanState::default(),
            }
        };

        let sink = &self.inner.sink;
        match state.status {
            ScanStatus::Complete => {
                tracing::info!(container_id, fetched = state.fetched_count, "Scan complete");
                swallow(
                    "scan_completed",
                    sink.record_scan_completed(container_id, mode, state.fetched_count),
                );
            }
            ScanStatus::Paused => {
                tracing::info!(container_id, fetched = state.fetched_count, "Scan paused");
                swallow(
                    "scan_paused",
                    sink.record_scan_paused(container_id, mode, state.fetched_count),
                );
            }
            ScanStatus::Error => {
                let message = state.error.as_deref().unwrap_or("unknown error");
                tracing::error!(container_id, error = %message, "Scan failed");
                swallow(
                    "scan_error",
                    sink.record_scan_error(container_id, None, message),
                );
            }
            ScanStatus::Idle | ScanStatus::Running => {}
        }

        if let Err(e) = self
            .inner
            .store
            .record_scan_outcome(container_id, state.status, Utc::now())
        {
            tracing::warn!(container_id, error = %e, "Failed to stamp scan outcome");
        }

        state
    }
}

/// Releases the container when a run ends, however it ends
///
/// If the run future is dropped or panics before finishing, the state is left
/// paused and the run's queued requests are cancelled.
struct RunGuard {
    inner: Arc<Inner>,
    container_id: String,
    cancel: CancelToken,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let mut sessions = self.inner.sessions();
        if let Some(session) = sessions.get_mut(&self.container_id) {
            session.active = false;
            if session.state.status == ScanStatus::Running {
                self.cancel.cancel();
                session.state.pause();
                tracing::warn!(container_id = %self.container_id, "Scan abandoned mid-run");
            }
        }
    }
}

/// Why a run stopped early
enum Halt {
    Cancelled,
    Failed(SleuthError),
}

impl From<SourceError> for Halt {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Cancelled => Halt::Cancelled,
            other => Halt::Failed(other.into()),
        }
    }
}

impl From<StorageError> for Halt {
    fn from(err: StorageError) -> Self {
        Halt::Failed(err.into())
    }
}

/// One scan run's working set
struct Run<'a, P> {
    inner: &'a Inner,
    container_id: &'a str,
    key: &'a ValidatedKey,
    cancel: CancelToken,
    progress: &'a P,

    /// Threads whose expansion failed during this run
    skipped: HashSet<String>,
}

impl<'a, P> Run<'a, P>
where
    P: Fn(u64) + Send + Sync,
{
    fn checkpoint(&self) -> std::result::Result<(), Halt> {
        if self.cancel.is_cancelled() {
            Err(Halt::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Thread pages, each followed by expansion of its promising threads
    async fn smart(&mut self) -> std::result::Result<(), Halt> {
        let promising = Some(self.inner.settings.promising_score);
        let mut page_token: Option<String> = None;
        let mut pages = 0u64;

        loop {
            self.checkpoint()?;

            let page = self
                .inner
                .source
                .fetch_thread_page(
                    self.container_id,
                    self.key,
                    page_token.as_deref(),
                    &self.cancel,
                )
                .await?;
            pages += 1;
            self.write_batch(&page.comments)?;

            let threads = self
                .inner
                .store
                .unexpanded_threads(self.container_id, promising)?;
            self.expand_all(threads).await?;

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => {
                    tracing::debug!(container_id = self.container_id, pages, "Thread pages exhausted");
                    return Ok(());
                }
            }
        }
    }

    /// Every pending thread, regardless of score
    async fn deep(&mut self) -> std::result::Result<(), Halt> {
        let threads = self
            .inner
            .store
            .unexpanded_threads(self.container_id, None)?;
        tracing::info!(
            container_id = self.container_id,
            pending = threads.len(),
            "Expanding pending threads"
        );
        self.expand_all(threads).await
    }

    async fn expand_all(&mut self, threads: Vec<Comment>) -> std::result::Result<(), Halt> {
        for thread in threads {
            if self.skipped.contains(&thread.id) {
                continue;
            }
            self.checkpoint()?;
            self.expand(&thread).await?;
        }
        Ok(())
    }

    /// Pages through one thread's replies
    ///
    /// The thread is marked fetched only once the token chain runs out. A
    /// failed page skips the thread for the rest of this run.
    async fn expand(&mut self, thread: &Comment) -> std::result::Result<(), Halt> {
        let mut page_token: Option<String> = None;

        loop {
            let result = self
                .inner
                .source
                .fetch_reply_page(
                    &thread.id,
                    self.container_id,
                    self.key,
                    page_token.as_deref(),
                    &self.cancel,
                )
                .await;

            let page = match result {
                Ok(page) => page,
                Err(
                    e @ (SourceError::QuotaExceeded { .. }
                    | SourceError::Cancelled
                    | SourceError::QueueClosed),
                ) => return Err(e.into()),
                Err(e) => {
                    tracing::warn!(
                        container_id = self.container_id,
                        thread_id = %thread.id,
                        error = %e,
                        "Skipping thread after reply fetch failure"
                    );
                    swallow(
                        "scan_error",
                        self.inner.sink.record_scan_error(
                            self.container_id,
                            Some(&thread.id),
                            &e.to_string(),
                        ),
                    );
                    self.skipped.insert(thread.id.clone());
                    return Ok(());
                }
            };

            self.write_batch(&page.comments)?;

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        self.inner.store.mark_replies_fetched(&thread.id)?;
        tracing::debug!(container_id = self.container_id, thread_id = %thread.id, "Thread expanded");
        Ok(())
    }

    /// Persists a batch and reports it
    fn write_batch(&self, batch: &[Comment]) -> std::result::Result<(), Halt> {
        if batch.is_empty() {
            return Ok(());
        }
        self.inner.store.upsert_comments(batch)?;

        let count = batch.len() as u64;
        if let Some(session) = self.inner.sessions().get_mut(self.container_id) {
            session.state.record_fetched(count);
        }
        (self.progress)(count);
        swallow(
            "comments_fetched",
            self.inner
                .sink
                .record_comments_fetched(self.container_id, count),
        );
        Ok(())
    }
}
