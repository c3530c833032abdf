//! Progress events published by the engine and the subscription bus that carries them.
//!
//! Delivery goes through unbounded `mpsc` channels: publishing never waits on
//! a subscriber, and subscribers that dropped their receiver are pruned on the
//! next publish.
//!
//! Each run publishes through its own [`RunSink`]. Closing the sink silences
//! that run for good, so a worker left behind by a timed-out stop cannot
//! reach the listeners of the next run.

use crate::instance::DistanceMatrix;
use crate::solution::Tour;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Notification emitted by an [`crate::engine::AntColony`] run
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ColonyEvent {
    /// Graph generated and ants seeded
    Initialized {
        distances: DistanceMatrix,
        best_tour: Tour,
        best_length: f64,
    },
    /// A strictly shorter tour was found
    NewBest {
        length: f64,
        tour: Tour,
        iteration: usize,
        elapsed_ms: u64,
    },
    /// Iteration budget exhausted
    Completed {
        length: f64,
        tour: Tour,
        elapsed_ms: u64,
    },
    /// Cancellation observed at an iteration boundary
    Stopped {
        length: f64,
        tour: Tour,
        iterations: usize,
        elapsed_ms: u64,
    },
    /// Run aborted by an internal fault
    Aborted { message: String },
}

impl ColonyEvent {
    /// Whether no further events follow this one for the current run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ColonyEvent::Completed { .. } | ColonyEvent::Stopped { .. } | ColonyEvent::Aborted { .. }
        )
    }
}

/// Identifier returned by [`EventBus::subscribe`]
pub type SubscriberId = u64;

/// Receiving end of a subscription
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    receiver: Receiver<ColonyEvent>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Block until the next event. `None` once the bus has dropped this subscriber.
    pub fn recv(&self) -> Option<ColonyEvent> {
        self.receiver.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<ColonyEvent> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn try_recv(&self) -> Option<ColonyEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Everything already queued, without blocking.
    pub fn drain(&self) -> Vec<ColonyEvent> {
        self.receiver.try_iter().collect()
    }
}

#[derive(Debug, Default)]
struct BusInner {
    next_id: SubscriberId,
    subscribers: Vec<(SubscriberId, Sender<ColonyEvent>)>,
}

/// Fan-out of engine events to any number of subscribers
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<BusInner>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BusInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::channel();
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push((id, sender));
        Subscription { id, receiver }
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut inner = self.lock();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|(sid, _)| *sid != id);
        inner.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    pub fn publish(&self, event: ColonyEvent) {
        let mut inner = self.lock();
        send_all(&mut inner, event);
    }

    /// Open a publishing handle for a single run.
    pub fn run_sink(&self) -> RunSink {
        RunSink {
            bus: self.clone(),
            active: Arc::new(AtomicBool::new(true)),
        }
    }
}

fn send_all(inner: &mut BusInner, event: ColonyEvent) {
    inner
        .subscribers
        .retain(|(_, sender)| sender.send(event.clone()).is_ok());
}

/// Publishing side of one run, shared with its worker
#[derive(Debug, Clone)]
pub struct RunSink {
    bus: EventBus,
    active: Arc<AtomicBool>,
}

impl RunSink {
    /// Deliver `event` unless the sink has been closed.
    pub fn publish(&self, event: ColonyEvent) {
        let mut inner = self.bus.lock();
        if self.active.load(Ordering::SeqCst) {
            send_all(&mut inner, event);
        }
    }

    /// Drop every later event of this run. Once this returns, no publish
    /// through any clone of the sink can be in flight.
    pub fn close(&self) {
        let _inner = self.bus.lock();
        self.active.store(false, Ordering::SeqCst);
    }

    pub fn is_open(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aborted(message: &str) -> ColonyEvent {
        ColonyEvent::Aborted {
            message: message.to_string(),
        }
    }

    #[test]
    fn test_every_subscriber_receives_events() {
        let bus = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();
        assert_ne!(a.id(), b.id());

        bus.publish(aborted("x"));
        assert!(matches!(a.try_recv(), Some(ColonyEvent::Aborted { .. })));
        assert!(matches!(b.try_recv(), Some(ColonyEvent::Aborted { .. })));
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let a = bus.subscribe();
        assert!(bus.unsubscribe(a.id()));
        assert!(!bus.unsubscribe(a.id()));

        bus.publish(aborted("x"));
        assert!(a.try_recv().is_none());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_dropped_receivers_are_pruned() {
        let bus = EventBus::new();
        let keep = bus.subscribe();
        drop(bus.subscribe());
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(aborted("x"));
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(keep.drain().len(), 1);
    }

    #[test]
    fn test_closed_sink_drops_events() {
        let bus = EventBus::new();
        let listener = bus.subscribe();
        let old_run = bus.run_sink();
        let worker_copy = old_run.clone();

        worker_copy.publish(aborted("before"));
        old_run.close();
        assert!(!worker_copy.is_open());
        worker_copy.publish(aborted("after"));

        let next_run = bus.run_sink();
        next_run.publish(aborted("next"));

        let messages: Vec<String> = listener
            .drain()
            .into_iter()
            .filter_map(|e| match e {
                ColonyEvent::Aborted { message } => Some(message),
                _ => None,
            })
            .collect();
        assert_eq!(messages, vec!["before", "next"]);
    }

    #[test]
    fn test_terminal_events_serialize_with_tag() {
        let event = ColonyEvent::Completed {
            length: 12.0,
            tour: Tour::new(vec![0, 2, 1]),
            elapsed_ms: 5,
        };
        assert!(event.is_terminal());
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"event":"completed","length":12.0,"tour":[0,2,1],"elapsed_ms":5}"#
        );
    }
}
