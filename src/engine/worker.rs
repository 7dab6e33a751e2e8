//! Bounded queue feeding the single background writer.

use std::{
    sync::Arc,
    thread::{self, JoinHandle, ThreadId},
};

use flume::{Receiver, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};

use super::{LogRequest, Shared};
use crate::{
    bound::BoundFields,
    error::{LogError, LogResult},
    field::{Field, Timestamp},
    level::Level,
    observability::{log_debug, log_warn},
    option::OverflowPolicy,
};

const WRITER_THREAD_NAME: &str = "fieldline-writer";

/// Message dispatched to the writer loop.
pub(super) enum WorkerMsg {
    /// Render and write a captured record.
    Record(OwnedRequest),
    /// Flush the sink, then signal the waiter.
    Flush(Sender<()>),
}

/// Record copied out of the caller's stack so it can cross threads.
pub(super) struct OwnedRequest {
    level: Level,
    message: String,
    timestamp: Timestamp,
    fields: Vec<Field<'static>>,
    bound: Arc<BoundFields>,
}

impl OwnedRequest {
    fn capture(shared: &Shared, request: &LogRequest<'_>, bound: &Arc<BoundFields>) -> Self {
        let mut fields = shared.field_lists.take().unwrap_or_default();
        fields.extend(request.fields.iter().map(Field::to_static));
        OwnedRequest {
            level: request.level,
            message: request.message.to_owned(),
            timestamp: request.timestamp,
            fields,
            bound: Arc::clone(bound),
        }
    }

    fn as_request(&self) -> LogRequest<'_> {
        LogRequest::new(self.level, &self.message, self.timestamp, &self.fields)
    }

    fn recycle(self, shared: &Shared) {
        shared.field_lists.give(self.fields);
    }
}

/// Producer side of the writer queue.
///
/// `gate` holds the only long-lived sender. Producers clone it for the
/// duration of one send; shutdown takes it, so the writer sees a disconnect
/// once the last in-flight producer finishes and the queue is empty.
pub(super) struct Queue {
    gate: RwLock<Option<Sender<WorkerMsg>>>,
    steal: Receiver<WorkerMsg>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: ThreadId,
}

impl Queue {
    pub(super) fn spawn(shared: Arc<Shared>) -> LogResult<Self> {
        let (sender, receiver) = flume::bounded(shared.options.queue_capacity);
        let steal = receiver.clone();
        let worker = thread::Builder::new()
            .name(WRITER_THREAD_NAME.to_string())
            .spawn(move || run_writer_loop(shared, receiver))
            .map_err(LogError::Spawn)?;

        Ok(Queue {
            gate: RwLock::new(Some(sender)),
            steal,
            worker_id: worker.thread().id(),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Sender for one enqueue, or `None` once shut down or when called from
    /// the writer itself (e.g. by an error handler), which must never wait
    /// on its own queue.
    fn sender(&self) -> Option<Sender<WorkerMsg>> {
        if self.on_writer_thread() {
            return None;
        }
        self.gate.read().clone()
    }

    fn on_writer_thread(&self) -> bool {
        thread::current().id() == self.worker_id
    }

    /// Hand `request` to the writer under the configured overflow policy.
    ///
    /// Returns `false` when the queue is shut down or the caller is the
    /// writer; nothing was captured and the caller writes synchronously.
    pub(super) fn submit(
        &self,
        shared: &Shared,
        request: &LogRequest<'_>,
        bound: &Arc<BoundFields>,
    ) -> bool {
        let Some(sender) = self.sender() else {
            return false;
        };
        let msg = WorkerMsg::Record(OwnedRequest::capture(shared, request, bound));
        offer(shared, &sender, &self.steal, shared.options.overflow, msg);
        true
    }

    /// Wait for the writer to pass a flush marker.
    ///
    /// Returns `false` if the marker could not be delivered or was evicted,
    /// or the caller is the writer, in which case the caller flushes the
    /// sink directly.
    pub(super) fn flush(&self) -> bool {
        let Some(sender) = self.sender() else {
            return false;
        };
        let (ack_tx, ack_rx) = flume::bounded(1);
        if sender.send(WorkerMsg::Flush(ack_tx)).is_err() {
            return false;
        }
        drop(sender);
        ack_rx.recv().is_ok()
    }

    /// Stop accepting work and wait for the writer to drain and exit.
    pub(super) fn shutdown(&self) {
        drop(self.gate.write().take());
        let Some(worker) = self.worker.lock().take() else {
            return;
        };
        if self.on_writer_thread() {
            // Closed from inside the writer (e.g. by an error handler); the
            // loop exits on its own once the queue drains.
            return;
        }
        if worker.join().is_err() {
            log_warn!(event = "writer_panicked");
        }
    }
}

/// Enqueue `msg`, applying `overflow` when the queue is full.
///
/// Under `DropOldest` one queued message is evicted through `steal`; if the
/// queue is full again by the retry, the incoming message is dropped.
fn offer(
    shared: &Shared,
    sender: &Sender<WorkerMsg>,
    steal: &Receiver<WorkerMsg>,
    overflow: OverflowPolicy,
    msg: WorkerMsg,
) {
    match overflow {
        OverflowPolicy::Block => {
            if let Err(err) = sender.send(msg) {
                discard(shared, err.into_inner());
            }
        }
        OverflowPolicy::DropNewest => {
            if let Err(err) = sender.try_send(msg) {
                reject(shared, err);
            }
        }
        OverflowPolicy::DropOldest => match sender.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(msg)) => {
                if let Ok(evicted) = steal.try_recv() {
                    discard(shared, evicted);
                }
                if let Err(err) = sender.try_send(msg) {
                    reject(shared, err);
                }
            }
            Err(err @ TrySendError::Disconnected(_)) => reject(shared, err),
        },
    }
}

/// Account for a record the writer will never see.
fn discard(shared: &Shared, msg: WorkerMsg) {
    match msg {
        WorkerMsg::Record(record) => {
            shared.stats.record_drop();
            shared.report(&LogError::QueueFull);
            record.recycle(shared);
        }
        // Dropping the ack sender wakes the flusher, which then flushes
        // the sink itself.
        WorkerMsg::Flush(_) => {}
    }
}

fn reject(shared: &Shared, err: TrySendError<WorkerMsg>) {
    discard(shared, err.into_inner());
}

fn run_writer_loop(shared: Arc<Shared>, receiver: Receiver<WorkerMsg>) {
    log_debug!(
        event = "writer_started",
        queue_capacity = shared.options.queue_capacity,
        overflow = ?shared.options.overflow
    );
    let mut written: u64 = 0;
    while let Ok(msg) = receiver.recv() {
        match msg {
            WorkerMsg::Record(record) => {
                shared.write(&record.as_request(), &record.bound);
                record.recycle(&shared);
                written += 1;
            }
            WorkerMsg::Flush(ack) => {
                shared.flush_sink();
                let _ = ack.send(());
            }
        }
    }
    log_debug!(event = "writer_stopped", records = written);
}
