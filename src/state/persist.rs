//! Write-behind persistence for the state store.
//!
//! In immediate mode every changed record is written before `dispatch`
//! returns. In debounced mode records are encoded on the caller's thread and
//! handed to a background writer that coalesces them per key and writes the
//! latest bytes once the window has passed since the first pending change.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::StoreError;
use crate::store::{self, KvBackend, RecordStore};

/// When changed records reach the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistMode {
    /// Write synchronously inside `dispatch`.
    #[default]
    Immediate,
    /// Write from a background thread at most `window` after the first
    /// unsaved change.
    Debounced(Duration),
}

/// A record that could not be written.
#[derive(Debug)]
pub struct PersistFailure {
    pub key: String,
    pub error: StoreError,
}

enum WriterMsg {
    Write { key: &'static str, bytes: Vec<u8> },
    Flush(Sender<()>),
}

struct DebouncedWriter {
    tx: Option<Sender<WriterMsg>>,
    failures: Receiver<PersistFailure>,
    handle: Option<JoinHandle<()>>,
}

impl DebouncedWriter {
    fn spawn(backend: Arc<dyn KvBackend>, window: Duration) -> Self {
        let (tx, rx) = mpsc::channel::<WriterMsg>();
        let (fail_tx, failures) = mpsc::channel::<PersistFailure>();

        let handle = std::thread::spawn(move || {
            let mut pending: BTreeMap<&'static str, Vec<u8>> = BTreeMap::new();
            let mut deadline: Option<Instant> = None;
            loop {
                let msg = match deadline {
                    Some(at) => rx.recv_timeout(at.saturating_duration_since(Instant::now())),
                    None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
                };
                match msg {
                    Ok(WriterMsg::Write { key, bytes }) => {
                        pending.insert(key, bytes);
                        deadline.get_or_insert_with(|| Instant::now() + window);
                    }
                    Ok(WriterMsg::Flush(ack)) => {
                        write_pending(backend.as_ref(), &mut pending, &fail_tx);
                        deadline = None;
                        let _ = ack.send(());
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        write_pending(backend.as_ref(), &mut pending, &fail_tx);
                        deadline = None;
                    }
                    Err(RecvTimeoutError::Disconnected) => {
                        write_pending(backend.as_ref(), &mut pending, &fail_tx);
                        break;
                    }
                }
            }
            tracing::debug!("journal writer stopped");
        });

        Self {
            tx: Some(tx),
            failures,
            handle: Some(handle),
        }
    }
}

impl Drop for DebouncedWriter {
    fn drop(&mut self) {
        // Closing the channel makes the writer drain and exit.
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn write_pending(
    backend: &dyn KvBackend,
    pending: &mut BTreeMap<&'static str, Vec<u8>>,
    failures: &Sender<PersistFailure>,
) {
    for (key, bytes) in std::mem::take(pending) {
        match backend.put(key, &bytes) {
            Ok(()) => tracing::debug!(key, bytes = bytes.len(), "record written"),
            Err(error) => {
                tracing::warn!(key, error = %error, "background record write failed");
                let _ = failures.send(PersistFailure {
                    key: key.to_string(),
                    error,
                });
            }
        }
    }
}

/// Routes record writes according to the [`PersistMode`].
pub(crate) struct Persister {
    records: RecordStore,
    writer: Option<DebouncedWriter>,
}

impl Persister {
    pub(crate) fn new(records: RecordStore, mode: PersistMode) -> Self {
        let writer = match mode {
            PersistMode::Immediate => None,
            PersistMode::Debounced(window) => {
                Some(DebouncedWriter::spawn(records.backend(), window))
            }
        };
        Self { records, writer }
    }

    pub(crate) fn records(&self) -> &RecordStore {
        &self.records
    }

    /// Write one record now, or queue it for the background writer.
    pub(crate) fn write<T: Serialize + ?Sized>(
        &self,
        key: &'static str,
        value: &T,
    ) -> Result<(), StoreError> {
        let Some(writer) = &self.writer else {
            return self.records.save(key, value);
        };
        let bytes = store::encode(key, value)?;
        match writer.tx.as_ref().map(|tx| tx.send(WriterMsg::Write { key, bytes })) {
            Some(Ok(())) => Ok(()),
            // The writer thread is gone; fall back to a synchronous write.
            Some(Err(mpsc::SendError(WriterMsg::Write { key, bytes }))) => {
                self.records.backend().put(key, &bytes)
            }
            _ => self.records.save(key, value),
        }
    }

    /// Block until every queued record has been written.
    pub(crate) fn flush(&self) {
        let Some(tx) = self.writer.as_ref().and_then(|w| w.tx.as_ref()) else {
            return;
        };
        let (ack_tx, ack_rx) = mpsc::channel();
        if tx.send(WriterMsg::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }

    /// Failures reported by the background writer since the last call.
    pub(crate) fn drain_failures(&self) -> Vec<PersistFailure> {
        match &self.writer {
            Some(writer) => writer.failures.try_iter().collect(),
            None => Vec::new(),
        }
    }
}

impl std::fmt::Debug for Persister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persister")
            .field("debounced", &self.writer.is_some())
            .finish()
    }
}
