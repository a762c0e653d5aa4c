//! Auto-Save Engine: debounced persistence of one step slice.
//!
//! [`AutoSaveEngine::update`] merges edits into the in-memory slice and
//! returns immediately. A background worker waits for the debounce window to
//! pass with no further edits, then writes the latest snapshot once. At most
//! one write per engine is in flight; every write carries a strictly
//! increasing sequence number so the store can discard stale arrivals.
//!
//! Failed writes are retried with bounded exponential backoff. While a
//! change is not yet durable, [`SaveStatus::unsaved_changes`] stays set.
//! Dropping the engine does not cancel a pending write.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::backend::WizardBackend;
use crate::error::CoreError;
use crate::record::PatchOutcome;
use crate::slices::{merge_fields, SliceName};
use crate::types::{JsonMap, RecordId, Timestamp};

/// Quiet period after the last edit before a write fires.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Backoff schedule for failed writes.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on the delay between retries.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
    /// Consecutive failed attempts after which the engine stops retrying
    /// until the next edit or flush.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            max_attempts: 5,
        }
    }
}

impl RetryPolicy {
    /// The delay following `current`, clamped to `max_delay`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        let next_ms = (current.as_millis() as f64 * self.multiplier) as u64;
        Duration::from_millis(next_ms).min(self.max_delay)
    }

    /// Delay before retry number `failures` (1-based).
    pub fn delay_for(&self, failures: u32) -> Duration {
        let mut delay = self.initial_delay.min(self.max_delay);
        for _ in 1..failures {
            delay = self.next_delay(delay);
        }
        delay
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AutoSaveConfig {
    pub debounce: Duration,
    pub retry: RetryPolicy,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            retry: RetryPolicy::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Save state reported to the Step Controller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveStatus {
    /// A write is in flight.
    pub saving: bool,
    /// Completion time of the last successful write.
    pub last_saved_at: Option<Timestamp>,
    /// The in-memory slice holds edits that are not yet durable.
    pub unsaved_changes: bool,
    /// Consecutive failed writes since the last success or edit.
    pub failed_attempts: u32,
    /// Message of the last failed write, cleared on success.
    pub last_error: Option<String>,
}

// ---------------------------------------------------------------------------
// Engine handle
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct SliceState {
    data: JsonMap,
    /// Bumped by every edit. Revision 0 is the data as loaded.
    revision: u64,
}

enum Command {
    Edited,
    Flush(oneshot::Sender<Result<(), CoreError>>),
}

/// Handle to the auto-save worker of one slice.
pub struct AutoSaveEngine {
    record_id: RecordId,
    slice: SliceName,
    state: Arc<Mutex<SliceState>>,
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<SaveStatus>,
}

impl std::fmt::Debug for AutoSaveEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoSaveEngine")
            .field("record_id", &self.record_id)
            .field("slice", &self.slice)
            .field("status", &*self.status.borrow())
            .finish()
    }
}

impl AutoSaveEngine {
    /// Seed an engine with data loaded from the server.
    ///
    /// The seed is never written back: only edits made through
    /// [`update`](Self::update) schedule a write. Must be called inside a
    /// tokio runtime.
    pub fn spawn(
        backend: Arc<dyn WizardBackend>,
        record_id: RecordId,
        slice: SliceName,
        initial: JsonMap,
        config: AutoSaveConfig,
    ) -> Self {
        let state = Arc::new(Mutex::new(SliceState {
            data: initial,
            revision: 0,
        }));
        let (commands, rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(SaveStatus::default());

        let worker = Worker {
            backend,
            record_id,
            slice,
            state: Arc::clone(&state),
            config,
            status: status_tx,
            saved_revision: 0,
            deadline: None,
            in_flight: None,
            queued: false,
            failures: 0,
            last_seq: 0,
            waiters: Vec::new(),
        };
        tokio::spawn(worker.run(rx));

        Self {
            record_id,
            slice,
            state,
            commands,
            status,
        }
    }

    pub fn record_id(&self) -> RecordId {
        self.record_id
    }

    pub fn slice(&self) -> SliceName {
        self.slice
    }

    /// Merge `fields` into the slice and restart the debounce window.
    pub fn update(&self, fields: JsonMap) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            merge_fields(&mut state.data, fields);
            state.revision += 1;
        }
        let _ = self.commands.send(Command::Edited);
    }

    /// The current in-memory slice, including edits not yet saved.
    pub fn snapshot(&self) -> JsonMap {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .data
            .clone()
    }

    pub fn status(&self) -> SaveStatus {
        self.status.borrow().clone()
    }

    /// Watch status changes.
    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.status.clone()
    }

    /// Write pending edits now instead of waiting for the debounce window.
    ///
    /// Resolves once everything edited before the call is durable, or with
    /// the error of the write that failed. Resolves immediately when there
    /// is nothing to save.
    pub async fn flush(&self) -> Result<(), CoreError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Flush(tx))
            .map_err(|_| CoreError::Internal("Auto-save worker has stopped".into()))?;
        rx.await
            .map_err(|_| CoreError::Internal("Auto-save worker dropped a flush".into()))?
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

type WriteResult = (u64, Result<PatchOutcome, CoreError>);

struct Worker {
    backend: Arc<dyn WizardBackend>,
    record_id: RecordId,
    slice: SliceName,
    state: Arc<Mutex<SliceState>>,
    config: AutoSaveConfig,
    status: watch::Sender<SaveStatus>,
    /// Highest revision known to be durable.
    saved_revision: u64,
    /// When the next write fires (debounce or retry).
    deadline: Option<Instant>,
    in_flight: Option<JoinHandle<WriteResult>>,
    /// A write became due while another was in flight.
    queued: bool,
    failures: u32,
    last_seq: i64,
    waiters: Vec<oneshot::Sender<Result<(), CoreError>>>,
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

async fn join_write(
    in_flight: &mut Option<JoinHandle<WriteResult>>,
) -> Result<WriteResult, tokio::task::JoinError> {
    match in_flight.as_mut() {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

impl Worker {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut closed = false;

        loop {
            if closed && self.deadline.is_none() && self.in_flight.is_none() {
                break;
            }

            tokio::select! {
                command = commands.recv(), if !closed => match command {
                    Some(Command::Edited) => self.on_edit(),
                    Some(Command::Flush(reply)) => self.on_flush(reply),
                    None => closed = true,
                },
                () = wait_until(self.deadline) => {
                    self.deadline = None;
                    self.fire();
                }
                joined = join_write(&mut self.in_flight) => {
                    self.in_flight = None;
                    let (revision, result) = match joined {
                        Ok(done) => done,
                        Err(e) => (0, Err(CoreError::Internal(format!("Auto-save task failed: {e}")))),
                    };
                    self.on_write_done(revision, result);
                }
            }
        }

        tracing::debug!(record_id = %self.record_id, slice = %self.slice, "Auto-save worker stopped");
    }

    fn current_revision(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .revision
    }

    fn is_dirty(&self) -> bool {
        self.current_revision() > self.saved_revision
    }

    fn on_edit(&mut self) {
        self.failures = 0;
        self.deadline = Some(Instant::now() + self.config.debounce);
        self.status.send_modify(|s| {
            s.unsaved_changes = true;
            s.failed_attempts = 0;
        });
    }

    fn on_flush(&mut self, reply: oneshot::Sender<Result<(), CoreError>>) {
        self.waiters.push(reply);
        if !self.is_dirty() {
            if self.in_flight.is_none() {
                self.resolve_waiters(Ok(()));
            }
            return;
        }
        self.deadline = None;
        self.fire();
    }

    /// A write is due. Starts it now, or after the one in flight.
    fn fire(&mut self) {
        if self.in_flight.is_some() {
            self.queued = true;
            return;
        }
        if !self.is_dirty() {
            return;
        }

        let (data, revision) = {
            let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            (state.data.clone(), state.revision)
        };
        let seq = self.next_seq();

        tracing::debug!(
            record_id = %self.record_id,
            slice = %self.slice,
            revision,
            seq,
            "Auto-save write started",
        );
        self.status.send_modify(|s| s.saving = true);

        let backend = Arc::clone(&self.backend);
        let record_id = self.record_id;
        let slice = self.slice;
        self.in_flight = Some(tokio::spawn(async move {
            let result = backend.save_slice(record_id, slice, data, seq).await;
            (revision, result)
        }));
    }

    /// Strictly increasing, wall-clock based sequence number.
    fn next_seq(&mut self) -> i64 {
        let seq = Utc::now().timestamp_micros().max(self.last_seq + 1);
        self.last_seq = seq;
        seq
    }

    fn on_write_done(&mut self, revision: u64, result: Result<PatchOutcome, CoreError>) {
        match result {
            Ok(outcome) => {
                self.saved_revision = self.saved_revision.max(revision);
                self.failures = 0;
                if !outcome.applied {
                    tracing::debug!(
                        record_id = %self.record_id,
                        slice = %self.slice,
                        "Auto-save write superseded by a newer one",
                    );
                }
                let dirty = self.is_dirty();
                self.status.send_modify(|s| {
                    s.saving = false;
                    s.last_saved_at = Some(Utc::now());
                    s.unsaved_changes = dirty;
                    s.failed_attempts = 0;
                    s.last_error = None;
                });
                tracing::debug!(record_id = %self.record_id, slice = %self.slice, revision, "Auto-save succeeded");
            }
            Err(e) => {
                self.failures += 1;
                let failures = self.failures;
                let message = e.to_string();
                self.status.send_modify(|s| {
                    s.saving = false;
                    s.unsaved_changes = true;
                    s.failed_attempts = failures;
                    s.last_error = Some(message.clone());
                });

                if !e.is_transient() {
                    tracing::warn!(
                        record_id = %self.record_id,
                        slice = %self.slice,
                        error = %e,
                        "Auto-save rejected, not retrying until the next edit",
                    );
                } else if failures < self.config.retry.max_attempts {
                    let delay = self.config.retry.delay_for(failures);
                    tracing::warn!(
                        record_id = %self.record_id,
                        slice = %self.slice,
                        attempt = failures,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %e,
                        "Auto-save failed, retrying",
                    );
                    if self.deadline.is_none() && !self.queued {
                        self.deadline = Some(Instant::now() + delay);
                    }
                } else {
                    tracing::error!(
                        record_id = %self.record_id,
                        slice = %self.slice,
                        attempts = failures,
                        error = %e,
                        "Auto-save giving up until the next edit",
                    );
                }
                self.resolve_waiters(Err(CoreError::Persistence(message)));
            }
        }

        if self.queued {
            self.queued = false;
            self.fire();
        } else if !self.waiters.is_empty() && self.is_dirty() {
            self.fire();
        }
        if self.in_flight.is_none() && !self.is_dirty() {
            self.resolve_waiters(Ok(()));
        }
    }

    fn resolve_waiters(&mut self, result: Result<(), CoreError>) {
        for waiter in self.waiters.drain(..) {
            let reply = match &result {
                Ok(()) => Ok(()),
                Err(e) => Err(CoreError::Persistence(e.to_string())),
            };
            let _ = waiter.send(reply);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
