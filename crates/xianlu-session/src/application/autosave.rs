//! Debounced autosave worker.
//!
//! Writes are queued through an [`AutosaveHandle`]. The first write to an
//! idle key opens a window of one debounce period for that key; later writes
//! replace the pending value without extending it. When the window closes
//! the latest value is handed to the store, so a burst lands as one write per
//! key, last value wins, and a busy key never holds back a quiet one. Pending
//! writes are flushed when every handle has been dropped.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};
use xianlu_core::store::PersistenceStore;

/// Default debounce window.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug)]
struct PendingWrite {
    value: String,
    due: Instant,
}

#[derive(Debug)]
enum AutosaveCommand {
    Write { key: String, value: String },
    Flush(oneshot::Sender<()>),
}

/// Cheap, cloneable sender side of the autosave worker.
#[derive(Debug, Clone)]
pub struct AutosaveHandle {
    tx: mpsc::UnboundedSender<AutosaveCommand>,
}

impl AutosaveHandle {
    /// Queues `value` under `key`. Opens the key's window if none is open.
    pub fn schedule(&self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if self
            .tx
            .send(AutosaveCommand::Write {
                key: key.clone(),
                value: value.into(),
            })
            .is_err()
        {
            warn!(%key, "autosave worker has stopped; write dropped");
        }
    }

    /// Writes everything pending right away and waits for it to finish.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(AutosaveCommand::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }
}

/// Spawns the autosave worker on the current tokio runtime.
///
/// The returned task finishes after the last handle is dropped and the final
/// flush has completed.
pub fn spawn_autosave(
    store: Arc<dyn PersistenceStore>,
    debounce: Duration,
) -> (AutosaveHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<AutosaveCommand>();

    let task = tokio::spawn(async move {
        let mut pending: BTreeMap<String, PendingWrite> = BTreeMap::new();
        loop {
            let next_due = pending.values().map(|write| write.due).min();
            let timer = async move {
                match next_due {
                    Some(at) => sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };
            tokio::select! {
                command = rx.recv() => match command {
                    Some(AutosaveCommand::Write { key, value }) => match pending.entry(key) {
                        Entry::Occupied(mut open) => open.get_mut().value = value,
                        Entry::Vacant(idle) => {
                            idle.insert(PendingWrite {
                                value,
                                due: Instant::now() + debounce,
                            });
                        }
                    },
                    Some(AutosaveCommand::Flush(done)) => {
                        write_all(store.as_ref(), std::mem::take(&mut pending)).await;
                        let _ = done.send(());
                    }
                    None => {
                        write_all(store.as_ref(), std::mem::take(&mut pending)).await;
                        debug!("autosave worker stopped");
                        break;
                    }
                },
                () = timer => {
                    let now = Instant::now();
                    let (due, waiting): (BTreeMap<_, _>, BTreeMap<_, _>) =
                        std::mem::take(&mut pending)
                            .into_iter()
                            .partition(|(_, write)| write.due <= now);
                    pending = waiting;
                    write_all(store.as_ref(), due).await;
                }
            }
        }
    });

    (AutosaveHandle { tx }, task)
}

async fn write_all(store: &dyn PersistenceStore, writes: BTreeMap<String, PendingWrite>) {
    for (key, PendingWrite { value, .. }) in writes {
        match store.save(&key, &value).await {
            Ok(()) => debug!(%key, bytes = value.len(), "autosaved"),
            Err(e) => warn!(%key, error = %e, "autosave failed"),
        }
    }
}
