//! Background provider requests.
//!
//! Provider calls run on background threads and report back through a
//! channel that the UI thread polls once per frame. Each request slot keeps
//! a generation counter: a completion is applied only if it belongs to the
//! latest request issued for its slot, so a slow earlier fetch can never
//! overwrite fresher state. Superseded requests get their cancel token set.

use crate::error::{Result, TableError};
use crate::model::{NestedTable, Row, RowKey, Template};
use crate::providers::{CancelToken, FetchResponse};
use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Independent request streams. A new request supersedes the in-flight
/// one of the same slot only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequestSlot {
    Data,
    Children(RowKey),
    Nested(RowKey),
    Templates,
}

/// Outcome of a request, ready to be turned into state transitions.
#[derive(Debug)]
pub enum Completion {
    Data(FetchResponse),
    Children { key: RowKey, rows: Vec<Row> },
    Nested { key: RowKey, table: NestedTable },
    Templates(Vec<Template>),
    /// A real provider failure (cancellation never shows up here)
    Failed { slot: RequestSlot, error: TableError },
}

struct InFlight {
    generation: u64,
    cancel: CancelToken,
}

type Message = (RequestSlot, u64, Result<Completion>);

/// Called from the worker thread once a result is sent.
pub type Waker = Arc<dyn Fn() + Send + Sync>;

/// Tracks in-flight provider requests.
pub struct RequestTracker {
    sender: Sender<Message>,
    receiver: Receiver<Message>,
    in_flight: HashMap<RequestSlot, InFlight>,
    next_generation: u64,
    stale_dropped: u64,
    waker: Option<Waker>,
}

impl RequestTracker {
    pub fn new() -> Self {
        let (sender, receiver) = channel();
        Self {
            sender,
            receiver,
            in_flight: HashMap::new(),
            next_generation: 1,
            stale_dropped: 0,
            waker: None,
        }
    }

    /// Installs a callback run after each result, e.g. to request a repaint.
    pub fn set_waker(&mut self, waker: Waker) {
        self.waker = Some(waker);
    }

    // ===== Queries =====

    pub fn is_pending(&self, slot: &RequestSlot) -> bool {
        self.in_flight.contains_key(slot)
    }

    pub fn has_pending(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Number of completions discarded because a newer request superseded them.
    pub fn stale_dropped(&self) -> u64 {
        self.stale_dropped
    }

    // ===== Issuing =====

    /// Runs `job` on a background thread for `slot`.
    ///
    /// Any in-flight request for the same slot is cancelled and its result
    /// will be ignored.
    ///
    /// # Returns
    /// The generation assigned to this request.
    pub fn spawn<F>(&mut self, slot: RequestSlot, job: F) -> u64
    where
        F: FnOnce(&CancelToken) -> Result<Completion> + Send + 'static,
    {
        self.cancel(&slot);

        let generation = self.next_generation;
        self.next_generation += 1;
        let cancel = CancelToken::new();
        self.in_flight.insert(
            slot.clone(),
            InFlight {
                generation,
                cancel: cancel.clone(),
            },
        );
        log::debug!("request {:?} generation {} started", slot, generation);

        let sender = self.sender.clone();
        let waker = self.waker.clone();
        thread::spawn(move || {
            let result = match job(&cancel) {
                Ok(_) if cancel.is_cancelled() => Err(TableError::Aborted),
                other => other,
            };
            // The tracker may be gone; nothing to report then
            let _ = sender.send((slot, generation, result));
            if let Some(waker) = waker {
                waker();
            }
        });
        generation
    }

    /// Cancels the in-flight request of `slot`, if any.
    pub fn cancel(&mut self, slot: &RequestSlot) {
        if let Some(previous) = self.in_flight.remove(slot) {
            previous.cancel.cancel();
            log::debug!("request {:?} generation {} superseded", slot, previous.generation);
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, request) in self.in_flight.drain() {
            request.cancel.cancel();
        }
    }

    // ===== Completion =====

    /// Collects finished requests without blocking.
    pub fn poll(&mut self) -> Vec<Completion> {
        let messages: Vec<Message> = self.receiver.try_iter().collect();
        messages
            .into_iter()
            .filter_map(|message| self.accept(message))
            .collect()
    }

    /// Blocks until every in-flight request finished or `timeout` elapsed.
    pub fn wait_idle(&mut self, timeout: Duration) -> Vec<Completion> {
        let deadline = Instant::now() + timeout;
        let mut completions = Vec::new();
        while self.has_pending() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(remaining) {
                Ok(message) => completions.extend(self.accept(message)),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        completions
    }

    /// Applies the generation guard and the abort filter to one message.
    fn accept(&mut self, (slot, generation, result): Message) -> Option<Completion> {
        let current = self.in_flight.get(&slot).map(|r| r.generation);
        if current != Some(generation) {
            self.stale_dropped += 1;
            log::debug!("stale completion for {:?} generation {} dropped", slot, generation);
            return None;
        }
        self.in_flight.remove(&slot);
        match result {
            Ok(completion) => Some(completion),
            Err(error) if error.is_aborted() => None,
            Err(error) => Some(Completion::Failed { slot, error }),
        }
    }
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RequestTracker {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn data(total: usize) -> Completion {
        Completion::Data(FetchResponse {
            rows: Vec::new(),
            total: Some(total),
            columns: None,
        })
    }

    #[test]
    fn test_idle_tracker_polls_nothing() {
        let mut tracker = RequestTracker::new();
        assert!(tracker.poll().is_empty());
        assert!(!tracker.has_pending());
    }

    #[test]
    fn test_slow_earlier_request_cannot_overwrite_newer() {
        let mut tracker = RequestTracker::new();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        // First request blocks until released, then reports total 1
        tracker.spawn(RequestSlot::Data, move |_| {
            let _ = release_rx.recv();
            Ok(data(1))
        });
        tracker.spawn(RequestSlot::Data, |_| Ok(data(2)));

        let completions = tracker.wait_idle(Duration::from_secs(5));
        release_tx.send(()).unwrap();
        assert_eq!(completions.len(), 1);
        assert!(matches!(&completions[0], Completion::Data(r) if r.total == Some(2)));

        // The first request's late answer is discarded
        let deadline = Instant::now() + Duration::from_secs(5);
        while tracker.stale_dropped() == 0 && Instant::now() < deadline {
            assert!(tracker.poll().is_empty());
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(tracker.stale_dropped(), 1);
    }

    #[test]
    fn test_superseded_request_is_cancelled() {
        let mut tracker = RequestTracker::new();
        let (seen_tx, seen_rx) = mpsc::channel::<bool>();
        let (go_tx, go_rx) = mpsc::channel::<()>();
        tracker.spawn(RequestSlot::Children("a".into()), move |cancel| {
            let _ = go_rx.recv();
            let _ = seen_tx.send(cancel.is_cancelled());
            cancel.check()?;
            Ok(Completion::Children { key: "a".into(), rows: Vec::new() })
        });
        tracker.cancel(&RequestSlot::Children("a".into()));
        go_tx.send(()).unwrap();
        assert!(seen_rx.recv_timeout(Duration::from_secs(5)).unwrap());
    }

    #[test]
    fn test_abort_is_swallowed_and_failure_reported() {
        let mut tracker = RequestTracker::new();
        tracker.spawn(RequestSlot::Templates, |_| Err(TableError::Aborted));
        tracker.spawn(RequestSlot::Nested("x".into()), |_| Err(TableError::Provider("boom".into())));
        let completions = tracker.wait_idle(Duration::from_secs(5));
        assert_eq!(completions.len(), 1);
        assert!(matches!(
            &completions[0],
            Completion::Failed { slot: RequestSlot::Nested(key), .. } if key == "x"
        ));
    }

    #[test]
    fn test_slots_are_independent() {
        let mut tracker = RequestTracker::new();
        tracker.spawn(RequestSlot::Children("a".into()), |_| {
            Ok(Completion::Children { key: "a".into(), rows: vec![Row::new("a1")] })
        });
        tracker.spawn(RequestSlot::Children("b".into()), |_| {
            Ok(Completion::Children { key: "b".into(), rows: vec![Row::new("b1")] })
        });
        let completions = tracker.wait_idle(Duration::from_secs(5));
        assert_eq!(completions.len(), 2);
    }
}
