//! Ingest-queue drain loop and the destination registry.
//!
//! The registry is the only structure touched by more than one actor (the
//! dispatcher inserting, workers removing), so every operation on it is
//! atomic under a single lock: get-or-create on enqueue, removal with
//! drain on teardown. Per-destination queues have single producer and
//! single consumer and only need their own light lock.

use super::transcode::Transcoder;
use super::{AudioSource, DestinationId, QueueEntry, SinkConnector};
use crate::audio::worker;
use crate::constants::DISPATCH_POLL_INTERVAL;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc::{self, error::TryRecvError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Per-destination record: the pending queue and the stop flag. Owned by
/// exactly one worker while active.
pub(crate) struct DestinationState {
    queue: Mutex<VecDeque<AudioSource>>,
    stop: AtomicBool,
}

impl DestinationState {
    fn new() -> Self {
        DestinationState {
            queue: Mutex::new(VecDeque::new()),
            stop: AtomicBool::new(false),
        }
    }

    fn push(&self, source: AudioSource) {
        lock(&self.queue).push_back(source);
    }

    /// Next source in FIFO order.
    pub(crate) fn pop_next(&self) -> Option<AudioSource> {
        lock(&self.queue).pop_front()
    }

    pub(crate) fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Observes and clears the stop flag in one step.
    pub(crate) fn take_stop(&self) -> bool {
        self.stop.swap(false, Ordering::SeqCst)
    }

    #[cfg(test)]
    pub(crate) fn queued_len(&self) -> usize {
        lock(&self.queue).len()
    }
}

/// Map from destination to its live state. One state and one worker per
/// destination at any time.
pub(crate) struct Registry {
    destinations: Mutex<HashMap<DestinationId, Arc<DestinationState>>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Registry {
            destinations: Mutex::new(HashMap::new()),
        }
    }

    /// Atomic get-or-create. Appends `source` to the destination's queue
    /// and returns the freshly created state when the destination was
    /// previously unknown (the caller then owes it a worker).
    pub(crate) fn enqueue(
        &self,
        destination: DestinationId,
        source: AudioSource,
    ) -> Option<Arc<DestinationState>> {
        let mut map = lock(&self.destinations);

        match map.get(&destination) {
            Some(state) => {
                state.push(source);
                None
            }
            None => {
                let state = Arc::new(DestinationState::new());
                state.push(source);
                map.insert(destination, state.clone());
                Some(state)
            }
        }
    }

    /// Sets the stop flag when the destination is live. Returns whether it
    /// was.
    pub(crate) fn request_stop(&self, destination: DestinationId) -> bool {
        match lock(&self.destinations).get(&destination) {
            Some(state) => {
                state.request_stop();
                true
            }
            None => false,
        }
    }

    /// Removes the destination outright, handing back whatever was still
    /// queued so the caller can account for it.
    pub(crate) fn remove(&self, destination: DestinationId) -> Vec<AudioSource> {
        let state = lock(&self.destinations).remove(&destination);

        match state {
            Some(state) => lock(&state.queue).drain(..).collect(),
            None => Vec::new(),
        }
    }

    pub(crate) fn is_active(&self, destination: DestinationId) -> bool {
        lock(&self.destinations).contains_key(&destination)
    }

    #[cfg(test)]
    pub(crate) fn active_count(&self) -> usize {
        lock(&self.destinations).len()
    }
}

/// Starts the dispatcher: drain the ingest queue, create states and
/// workers for new destinations, append for known ones. Idle passes wait
/// instead of spinning; audio delivery is not latency critical here.
pub(crate) fn start(
    mut ingest: mpsc::UnboundedReceiver<QueueEntry>,
    registry: Arc<Registry>,
    connector: Arc<dyn SinkConnector>,
    transcoder: Arc<Transcoder>,
) {
    tokio::spawn(async move {
        loop {
            loop {
                match ingest.try_recv() {
                    Ok(QueueEntry {
                        destination,
                        source,
                    }) => {
                        debug!(
                            "Dispatching {} to destination {destination}",
                            source.describe()
                        );

                        if let Some(state) = registry.enqueue(destination, source) {
                            worker::spawn(
                                destination,
                                state,
                                registry.clone(),
                                connector.clone(),
                                transcoder.clone(),
                            );
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        debug!("Ingest queue closed, dispatcher exiting");
                        return;
                    }
                }
            }

            tokio::time::sleep(DISPATCH_POLL_INTERVAL).await;
        }
    });
}
