//! Debounced background persistence.
//!
//! The session hands over snapshots of its dirty slots; a worker task
//! coalesces them per slot and writes once the session has been quiet for
//! the configured delay. A failed write is logged and dropped; the slot is
//! written again once a later change queues a fresh snapshot of it.

use crate::data::store::StoreSlot;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Serialized content of one slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSnapshot {
    pub slot: StoreSlot,
    pub payload: String,
}

impl SlotSnapshot {
    pub fn new(slot: StoreSlot, payload: impl Into<String>) -> Self {
        Self {
            slot,
            payload: payload.into(),
        }
    }
}

/// Snapshots waiting for the quiet period to pass. Last write wins per slot.
#[derive(Debug, Clone)]
pub struct PendingWrites {
    delay: Duration,
    pending: BTreeMap<StoreSlot, String>,
    deadline: Option<Instant>,
}

impl PendingWrites {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: BTreeMap::new(),
            deadline: None,
        }
    }

    /// Queue a snapshot and restart the quiet period
    pub fn push(&mut self, snapshot: SlotSnapshot, now: Instant) {
        self.pending.insert(snapshot.slot, snapshot.payload);
        self.deadline = Some(now + self.delay);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.map_or(false, |deadline| now >= deadline)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Take everything queued, in slot order
    pub fn drain(&mut self) -> Vec<SlotSnapshot> {
        self.deadline = None;
        std::mem::take(&mut self.pending)
            .into_iter()
            .map(|(slot, payload)| SlotSnapshot { slot, payload })
            .collect()
    }
}

#[cfg(feature = "tokio-runtime")]
pub use worker::{spawn_autosave, AutosaveHandle};

#[cfg(feature = "tokio-runtime")]
mod worker {
    use super::{PendingWrites, SlotSnapshot};
    use crate::data::store::SceneStore;
    use crate::{MapError, Result};
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use tokio::sync::{mpsc, oneshot};
    use tokio::task::JoinHandle;

    enum Command {
        Save(SlotSnapshot),
        Flush(oneshot::Sender<Result<usize>>),
        Shutdown,
    }

    /// Sender side of the autosave worker
    #[derive(Debug)]
    pub struct AutosaveHandle {
        tx: mpsc::UnboundedSender<Command>,
        task: JoinHandle<()>,
    }

    impl std::fmt::Debug for Command {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Command::Save(snapshot) => write!(f, "Save({})", snapshot.slot),
                Command::Flush(_) => f.write_str("Flush"),
                Command::Shutdown => f.write_str("Shutdown"),
            }
        }
    }

    impl AutosaveHandle {
        /// Queue a snapshot. Returns false once the worker has stopped.
        pub fn save(&self, snapshot: SlotSnapshot) -> bool {
            self.tx.send(Command::Save(snapshot)).is_ok()
        }

        /// Write everything queued now and report how many slots were written
        pub async fn flush(&self) -> Result<usize> {
            let (reply, rx) = oneshot::channel();
            self.tx
                .send(Command::Flush(reply))
                .map_err(|_| MapError::Store("autosave worker stopped".to_string()))?;
            rx.await
                .map_err(|_| MapError::Store("autosave worker dropped flush".to_string()))?
        }

        /// Write anything still queued and stop the worker
        pub async fn shutdown(self) {
            let _ = self.tx.send(Command::Shutdown);
            if let Err(e) = self.task.await {
                log::error!("autosave worker panicked: {}", e);
            }
        }
    }

    /// Spawn the worker on the current tokio runtime
    pub fn spawn_autosave(store: Arc<dyn SceneStore>, delay: Duration) -> AutosaveHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        log::info!("autosave worker started (debounce {:?})", delay);
        let task = tokio::spawn(run(store, delay, rx));
        AutosaveHandle { tx, task }
    }

    async fn run(
        store: Arc<dyn SceneStore>,
        delay: Duration,
        mut rx: mpsc::UnboundedReceiver<Command>,
    ) {
        let mut pending = PendingWrites::new(delay);

        loop {
            let deadline = pending.deadline();
            let wake = tokio::time::Instant::from_std(deadline.unwrap_or_else(|| Instant::now() + delay));

            tokio::select! {
                command = rx.recv() => match command {
                    Some(Command::Save(snapshot)) => pending.push(snapshot, Instant::now()),
                    Some(Command::Flush(reply)) => {
                        let result = write_pending(store.as_ref(), &mut pending).await;
                        let _ = reply.send(result);
                    }
                    Some(Command::Shutdown) | None => {
                        if let Err(e) = write_pending(store.as_ref(), &mut pending).await {
                            log::error!("final autosave failed: {}", e);
                        }
                        break;
                    }
                },
                _ = tokio::time::sleep_until(wake), if deadline.is_some() => {
                    if let Err(e) = write_pending(store.as_ref(), &mut pending).await {
                        log::error!("autosave failed: {}", e);
                    }
                }
            }
        }
        log::info!("autosave worker stopped");
    }

    /// Write every queued slot once; the first error is returned after the
    /// others have been attempted
    async fn write_pending(store: &dyn SceneStore, pending: &mut PendingWrites) -> Result<usize> {
        let mut written = 0;
        let mut first_error = None;

        for snapshot in pending.drain() {
            match store.write(snapshot.slot, snapshot.payload.clone()).await {
                Ok(()) => written += 1,
                Err(e) => {
                    log::warn!("writing {} failed, snapshot dropped: {}", snapshot.slot, e);
                    first_error.get_or_insert(e);
                }
            }
        }
        if written > 0 {
            log::debug!("autosaved {} slot(s)", written);
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(written),
        }
    }
}
