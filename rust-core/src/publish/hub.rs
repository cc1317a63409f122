//! Non-blocking fan-out of spectrum events
//!
//! Every subscriber owns a bounded channel. Publishing never blocks: a
//! subscriber whose queue is full misses that event and the miss is counted.
//! The subscriber list is swapped atomically, so the audio thread reads it
//! without taking a lock.

use arc_swap::ArcSwap;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Events queued per subscriber before new ones are dropped
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 64;

/// Output of one analysed block
///
/// Average loudness and band magnitudes from the same block always travel
/// together.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumFrame {
    /// Normalized loudness over all bins in the frequency range, in [0, 1]
    pub average_loudness: f32,

    /// Normalized loudness per band in [0, 1], lowest frequency first
    pub band_magnitudes: Arc<[f32]>,
}

/// Published value
#[derive(Debug, Clone, PartialEq)]
pub enum SpectrumEvent {
    /// Result of a `consume` call
    Frame(SpectrumFrame),

    /// All-zero bands emitted by `end()`
    ///
    /// Carries no average loudness; consumers keep their last average.
    Cleared { band_magnitudes: Arc<[f32]> },
}

impl SpectrumEvent {
    /// The average-loudness stream: present only for `Frame`
    pub fn average_loudness(&self) -> Option<f32> {
        match self {
            SpectrumEvent::Frame(frame) => Some(frame.average_loudness),
            SpectrumEvent::Cleared { .. } => None,
        }
    }

    /// The band-magnitude stream: present for every event
    pub fn band_magnitudes(&self) -> &[f32] {
        match self {
            SpectrumEvent::Frame(frame) => &frame.band_magnitudes,
            SpectrumEvent::Cleared { band_magnitudes } => band_magnitudes,
        }
    }
}

#[derive(Debug, Default)]
struct SubscriberState {
    closed: AtomicBool,
    dropped: AtomicU64,
}

struct SubscriberSlot {
    tx: Sender<SpectrumEvent>,
    state: Arc<SubscriberState>,
}

/// Receiving end of a subscription
///
/// Events arrive in publish order. Dropping the subscription unregisters it.
pub struct Subscription {
    rx: Receiver<SpectrumEvent>,
    state: Arc<SubscriberState>,
}

impl Subscription {
    /// Next event if one is queued
    pub fn try_recv(&self) -> Option<SpectrumEvent> {
        self.rx.try_recv().ok()
    }

    /// Wait up to `timeout` for the next event
    pub fn recv_timeout(&self, timeout: Duration) -> Option<SpectrumEvent> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// All currently queued events, oldest first
    pub fn drain(&self) -> impl Iterator<Item = SpectrumEvent> + '_ {
        self.rx.try_iter()
    }

    /// Most recent queued event, discarding older ones
    ///
    /// Useful for a UI that redraws at its own rate.
    pub fn latest(&self) -> Option<SpectrumEvent> {
        self.rx.try_iter().last()
    }

    /// Underlying channel, for `select!`
    pub fn receiver(&self) -> &Receiver<SpectrumEvent> {
        &self.rx
    }

    /// Events this subscriber missed because its queue was full
    pub fn dropped(&self) -> u64 {
        self.state.dropped.load(Ordering::Relaxed)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.state.closed.store(true, Ordering::Release);
    }
}

/// Multi-consumer event hub
pub struct SpectrumHub {
    subscribers: ArcSwap<Vec<Arc<SubscriberSlot>>>,
}

impl Default for SpectrumHub {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectrumHub {
    pub fn new() -> Self {
        Self {
            subscribers: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Register a subscriber with room for `capacity` queued events
    ///
    /// Closed subscribers are pruned here, off the publishing path.
    pub fn subscribe(&self, capacity: usize) -> Subscription {
        let (tx, rx) = bounded(capacity.max(1));
        let state = Arc::new(SubscriberState::default());
        let slot = Arc::new(SubscriberSlot {
            tx,
            state: Arc::clone(&state),
        });

        self.subscribers.rcu(|current| {
            let mut next: Vec<Arc<SubscriberSlot>> = current
                .iter()
                .filter(|s| !s.state.closed.load(Ordering::Acquire))
                .cloned()
                .collect();
            next.push(Arc::clone(&slot));
            next
        });

        let count = self.subscribers.load().len();
        debug!(subscribers = count, capacity, "spectrum subscriber added");

        Subscription { rx, state }
    }

    /// Live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .load()
            .iter()
            .filter(|s| !s.state.closed.load(Ordering::Acquire))
            .count()
    }

    /// Offer `event` to every subscriber without blocking
    ///
    /// # Arguments
    /// * `event` - Event cloned into each live queue
    ///
    /// # Returns
    /// How many subscribers accepted it
    pub fn publish(&self, event: SpectrumEvent) -> usize {
        let subscribers = self.subscribers.load();
        let mut delivered = 0;

        for slot in subscribers.iter() {
            if slot.state.closed.load(Ordering::Acquire) {
                continue;
            }
            match slot.tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    let dropped = slot.state.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    if dropped.is_power_of_two() {
                        warn!(dropped, "spectrum subscriber is lagging, dropping events");
                    }
                }
                Err(TrySendError::Disconnected(_)) => {
                    slot.state.closed.store(true, Ordering::Release);
                    debug!("spectrum subscriber disconnected, pruning on next subscribe");
                }
            }
        }

        delivered
    }
}
