//! Tables handed to the query engine, and the handle the read loop keeps.
//!
//! A non-empty table owns one producer task that reads the rest of its
//! cursor(s) and pushes row chunks through a bounded channel. The consumer
//! side is `ReadTable`; the read loop keeps the `TableHandle` to wait for
//! completion, force a cancel and collect statistics.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::trace;
use tsread_core::group_key::GroupKey;
use tsread_core::schema::ColMeta;
use tsread_core::stats::ScanStatistics;
use tsread_core::types::RowBatch;

use crate::error::{Result, TableError};
use crate::source::ChunkSource;

type Chunk = Result<RowBatch>;

/// A table as seen by its consumer.
pub struct ReadTable {
    key: GroupKey,
    cols: Vec<ColMeta>,
    source: TableSource,
}

enum TableSource {
    Stream {
        first: Option<RowBatch>,
        rx: mpsc::Receiver<Chunk>,
        truncated: Arc<AtomicBool>,
        finished: bool,
    },
    Materialized(Option<RowBatch>),
}

impl ReadTable {
    /// A table whose rows are all known up front. `None` means zero rows.
    pub fn materialized(key: GroupKey, cols: Vec<ColMeta>, rows: Option<RowBatch>) -> Self {
        Self {
            key,
            cols,
            source: TableSource::Materialized(rows),
        }
    }

    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    pub fn cols(&self) -> &[ColMeta] {
        &self.cols
    }

    /// Next row chunk. A cancelled table ends with `Err(TableError::Cancelled)`;
    /// a failed cursor ends with its error.
    pub async fn next_batch(&mut self) -> Option<Chunk> {
        match &mut self.source {
            TableSource::Materialized(rows) => rows.take().map(Ok),
            TableSource::Stream {
                first,
                rx,
                truncated,
                finished,
            } => {
                if let Some(batch) = first.take() {
                    return Some(Ok(batch));
                }
                if *finished {
                    return None;
                }
                match rx.recv().await {
                    Some(Err(e)) => {
                        *finished = true;
                        Some(Err(e))
                    }
                    Some(ok) => Some(ok),
                    None => {
                        *finished = true;
                        truncated
                            .load(Ordering::SeqCst)
                            .then_some(Err(TableError::Cancelled))
                    }
                }
            }
        }
    }

    /// Read every remaining chunk into one batch.
    pub async fn collect(mut self) -> Result<RowBatch> {
        let mut out = RowBatch::empty(&self.cols);
        while let Some(chunk) = self.next_batch().await {
            out.append(chunk?)?;
        }
        Ok(out)
    }
}

impl std::fmt::Debug for ReadTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadTable")
            .field("key", &self.key)
            .field("cols", &self.cols)
            .finish_non_exhaustive()
    }
}

enum HandleState {
    /// Nothing to produce; resources already released.
    Idle,
    Streaming {
        task: JoinHandle<ScanStatistics>,
        done: Option<oneshot::Receiver<()>>,
        cancel: CancellationToken,
    },
    Closed,
}

/// Read-loop side of one table.
pub struct TableHandle {
    key: GroupKey,
    table: Option<ReadTable>,
    empty: bool,
    stats: ScanStatistics,
    state: HandleState,
}

impl TableHandle {
    /// A table with no rows that is never handed to a consumer.
    pub(crate) fn empty(key: GroupKey, stats: ScanStatistics) -> Self {
        Self {
            key,
            table: None,
            empty: true,
            stats,
            state: HandleState::Idle,
        }
    }

    /// A table with no producer behind it.
    pub fn ready(table: ReadTable) -> Self {
        Self {
            key: table.key.clone(),
            table: Some(table),
            empty: false,
            stats: ScanStatistics::default(),
            state: HandleState::Idle,
        }
    }

    /// Hand `first` to the consumer directly and spawn a producer for the rest
    /// of `source`. The producer stops when `parent` is cancelled.
    pub(crate) fn spawn<S: ChunkSource>(
        key: GroupKey,
        cols: Vec<ColMeta>,
        first: RowBatch,
        source: S,
        buffer: usize,
        parent: &CancellationToken,
    ) -> Self {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let (done_tx, done_rx) = oneshot::channel();
        let cancel = parent.child_token();
        let truncated = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(produce(
            source,
            tx,
            cancel.clone(),
            Arc::clone(&truncated),
            done_tx,
        ));
        Self {
            key: key.clone(),
            table: Some(ReadTable {
                key,
                cols,
                source: TableSource::Stream {
                    first: Some(first),
                    rx,
                    truncated,
                    finished: false,
                },
            }),
            empty: false,
            stats: ScanStatistics::default(),
            state: HandleState::Streaming {
                task,
                done: Some(done_rx),
                cancel,
            },
        }
    }

    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    /// True when the table has no rows. Empty tables are not delivered.
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// Transfer the consumer side. Returns `None` after the first call.
    pub fn take_table(&mut self) -> Option<ReadTable> {
        self.table.take()
    }

    /// Resolves once the producer has written everything it will write.
    pub async fn done(&mut self) {
        if let HandleState::Streaming { done, .. } = &mut self.state {
            if let Some(rx) = done.as_mut() {
                // A dropped sender means the producer is gone as well.
                let _ = rx.await;
                *done = None;
            }
        }
    }

    /// Tell the producer to stop early. Its cursors are closed by the producer.
    pub fn cancel(&self) {
        if let HandleState::Streaming { cancel, .. } = &self.state {
            cancel.cancel();
        }
    }

    /// Stop the producer if still running, wait for it to release its
    /// resources and return the table's scan statistics.
    pub async fn close(mut self) -> Result<ScanStatistics> {
        self.table = None;
        match std::mem::replace(&mut self.state, HandleState::Closed) {
            HandleState::Streaming { task, cancel, .. } => {
                cancel.cancel();
                let stats = task
                    .await
                    .map_err(|e| TableError::Producer(e.to_string()))?;
                Ok(self.stats + stats)
            }
            HandleState::Idle | HandleState::Closed => Ok(self.stats),
        }
    }
}

impl Drop for TableHandle {
    fn drop(&mut self) {
        if let HandleState::Streaming { cancel, .. } = &self.state {
            cancel.cancel();
        }
    }
}

async fn produce<S: ChunkSource>(
    mut source: S,
    tx: mpsc::Sender<Chunk>,
    cancel: CancellationToken,
    truncated: Arc<AtomicBool>,
    done: oneshot::Sender<()>,
) -> ScanStatistics {
    loop {
        if cancel.is_cancelled() {
            truncated.store(true, Ordering::SeqCst);
            break;
        }
        let chunk = match source.next_chunk() {
            Ok(Some(batch)) => Ok(batch),
            Ok(None) => break,
            Err(e) => Err(e),
        };
        let failed = chunk.is_err();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                truncated.store(true, Ordering::SeqCst);
                break;
            }
            sent = tx.send(chunk) => {
                if sent.is_err() {
                    trace!("table consumer went away");
                    break;
                }
            }
        }
        if failed {
            break;
        }
    }
    source.close();
    drop(tx);
    let _ = done.send(());
    source.stats()
}
