//! Priority event bus.
//!
//! A small publish/subscribe hub used to hand collision outcomes to gameplay
//! code without the pipeline knowing who listens.
//!
//! - Events are wrapped in a [`GameEvent`] envelope carrying priority,
//!   timestamp, an optional source tag and a write-once `consumed` flag.
//! - Listeners subscribe to a *topic*. Every event has one exact topic plus a
//!   fixed list of supertopics (see [`BusEvent`]); a listener on a supertopic
//!   sees every event below it.
//! - [`EventBus::publish`] queues, [`EventBus::process_events`] drains the
//!   queue once per tick in priority order. Equal priorities keep publish
//!   order.
//! - Queued events older than the timeout are dropped unseen.
//!
//! # Threading
//!
//! The bus itself is meant to be driven from one thread: one caller
//! publishes, processes and subscribes. Producers on other threads, and
//! listeners that want to publish follow-up events, use a [`BusSender`]; its
//! events are stamped with the bus time when sent and join the queue at the
//! next [`EventBus::process_events`].
//!
//! # Time
//!
//! The bus has no clock of its own. The owner advances it with
//! [`EventBus::set_time`] or [`EventBus::advance`] (the ECS does this from
//! `WorldTime`), which keeps expiry deterministic in tests.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt::Debug;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use bevy_ecs::prelude::Resource;
use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, trace};
use rustc_hash::FxHashMap;
use serde::Serialize;

/// Default cap on events dispatched by one [`EventBus::process_events`].
pub const DEFAULT_MAX_EVENTS_PER_FRAME: usize = 100;
/// Default maximum age in seconds of a queued event.
pub const DEFAULT_EVENT_TIMEOUT: f64 = 5.0;

/// Payload types the bus can carry.
pub trait BusEvent: Send + Sync + 'static {
    type Topic: Copy + Eq + Hash + Debug + Send + Sync + 'static;

    /// Exact topic of this event.
    fn topic(&self) -> Self::Topic;

    /// Broader topics this event also belongs to, most specific first.
    fn supertopics(&self) -> &'static [Self::Topic] {
        &[]
    }
}

/// Envelope around a published payload.
#[derive(Debug, Clone, PartialEq)]
pub struct GameEvent<E> {
    payload: E,
    timestamp: Option<f64>,
    priority: i32,
    source: Option<String>,
    consumed: bool,
}

impl<E> GameEvent<E> {
    pub fn new(payload: E) -> Self {
        Self {
            payload,
            timestamp: None,
            priority: 0,
            source: None,
            consumed: false,
        }
    }

    /// Higher priorities are dispatched first.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Creation time in bus seconds. Events without one are stamped with the
    /// bus time when they are published.
    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }

    pub fn timestamp(&self) -> Option<f64> {
        self.timestamp
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Stop dispatch to the remaining listeners. Cannot be undone.
    pub fn consume(&mut self) {
        self.consumed = true;
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed
    }
}

/// Callback invoked for every event on a subscribed topic.
///
/// Returning `Err` logs the message; dispatch continues with the next
/// listener either way.
pub type Listener<E> = Box<dyn FnMut(&mut GameEvent<E>) -> Result<(), String> + Send + Sync>;

/// Identifies a subscription for [`EventBus::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

struct Subscription<E> {
    id: ListenerId,
    listener: Listener<E>,
}

struct Queued<E> {
    seq: u64,
    event: GameEvent<E>,
}

impl<E> Queued<E> {
    fn key(&self) -> (i32, Reverse<u64>) {
        (self.event.priority, Reverse(self.seq))
    }
}

impl<E> PartialEq for Queued<E> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl<E> Eq for Queued<E> {}

impl<E> PartialOrd for Queued<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Queued<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Bus time in seconds, shared with every [`BusSender`].
#[derive(Debug, Clone, Default)]
struct BusClock(Arc<AtomicU64>);

impl BusClock {
    fn get(&self) -> f64 {
        f64::from_bits(self.0.load(AtomicOrdering::Relaxed))
    }

    fn set(&self, now: f64) {
        self.0.store(now.to_bits(), AtomicOrdering::Relaxed);
    }
}

/// Cloneable handle for publishing into a bus from elsewhere.
pub struct BusSender<E> {
    tx: Sender<GameEvent<E>>,
    clock: BusClock,
}

impl<E> Clone for BusSender<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<E: BusEvent> BusSender<E> {
    /// Queue an event; it reaches the bus at the next `process_events`.
    ///
    /// Events without a timestamp are stamped with the bus time now, so their
    /// age counts from the send, not from the drain.
    pub fn send(&self, mut event: GameEvent<E>) -> Result<(), String> {
        if event.timestamp.is_none() {
            event.timestamp = Some(self.clock.get());
        }
        self.tx
            .send(event)
            .map_err(|_| "event bus is gone".to_string())
    }
}

/// Lifetime totals, mostly for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BusCounters {
    pub published: u64,
    pub dispatched: u64,
    pub expired: u64,
    pub listener_failures: u64,
}

/// Priority-ordered publish/subscribe hub.
#[derive(Resource)]
pub struct EventBus<E: BusEvent> {
    listeners: FxHashMap<E::Topic, Vec<Subscription<E>>>,
    queue: BinaryHeap<Queued<E>>,
    next_seq: u64,
    next_listener: u64,
    clock: BusClock,
    max_events_per_frame: usize,
    event_timeout: f64,
    immediate: bool,
    counters: BusCounters,
    tx: Sender<GameEvent<E>>,
    rx: Receiver<GameEvent<E>>,
}

impl<E: BusEvent> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: BusEvent> EventBus<E> {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            listeners: FxHashMap::default(),
            queue: BinaryHeap::new(),
            next_seq: 0,
            next_listener: 0,
            clock: BusClock::default(),
            max_events_per_frame: DEFAULT_MAX_EVENTS_PER_FRAME,
            event_timeout: DEFAULT_EVENT_TIMEOUT,
            immediate: false,
            counters: BusCounters::default(),
            tx,
            rx,
        }
    }

    // ==================== SETTINGS ====================

    pub fn with_max_events_per_frame(mut self, max: usize) -> Self {
        self.set_max_events_per_frame(max);
        self
    }

    pub fn with_event_timeout(mut self, seconds: f64) -> Self {
        self.set_event_timeout(seconds);
        self
    }

    pub fn with_immediate_mode(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    pub fn set_max_events_per_frame(&mut self, max: usize) {
        self.max_events_per_frame = max;
    }

    pub fn set_event_timeout(&mut self, seconds: f64) {
        self.event_timeout = seconds;
    }

    /// When set, [`EventBus::publish`] dispatches synchronously.
    pub fn set_immediate_mode(&mut self, immediate: bool) {
        self.immediate = immediate;
    }

    pub fn is_immediate_mode(&self) -> bool {
        self.immediate
    }

    pub fn max_events_per_frame(&self) -> usize {
        self.max_events_per_frame
    }

    pub fn event_timeout(&self) -> f64 {
        self.event_timeout
    }

    // ==================== CLOCK ====================

    pub fn now(&self) -> f64 {
        self.clock.get()
    }

    pub fn set_time(&mut self, now: f64) {
        self.clock.set(now);
    }

    pub fn advance(&mut self, seconds: f64) {
        self.clock.set(self.clock.get() + seconds);
    }

    // ==================== SUBSCRIPTIONS ====================

    /// Register `listener` for `topic`. Listeners on the same topic run in
    /// subscription order.
    pub fn subscribe<F>(&mut self, topic: E::Topic, listener: F) -> ListenerId
    where
        F: FnMut(&mut GameEvent<E>) -> Result<(), String> + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.entry(topic).or_default().push(Subscription {
            id,
            listener: Box::new(listener),
        });
        debug!(target: "eventbus", "Subscribed listener {:?} to {:?}", id, topic);
        id
    }

    /// Remove a listener. Returns `false` if it was not subscribed to `topic`.
    pub fn unsubscribe(&mut self, topic: E::Topic, id: ListenerId) -> bool {
        let Some(subscriptions) = self.listeners.get_mut(&topic) else {
            return false;
        };
        let before = subscriptions.len();
        subscriptions.retain(|s| s.id != id);
        let removed = subscriptions.len() != before;
        if subscriptions.is_empty() {
            self.listeners.remove(&topic);
        }
        removed
    }

    pub fn listener_count(&self, topic: E::Topic) -> usize {
        self.listeners.get(&topic).map_or(0, Vec::len)
    }

    pub fn has_listeners(&self, topic: E::Topic) -> bool {
        self.listener_count(topic) > 0
    }

    // ==================== PUBLISHING ====================

    /// Queue `event` for the next [`EventBus::process_events`], or dispatch it
    /// right away in immediate mode.
    pub fn publish(&mut self, event: GameEvent<E>) {
        if self.immediate {
            self.publish_immediate(event);
        } else {
            self.enqueue(event);
        }
    }

    /// Dispatch `event` to its listeners before returning.
    pub fn publish_immediate(&mut self, mut event: GameEvent<E>) {
        self.stamp(&mut event);
        self.counters.published += 1;
        self.dispatch(&mut event);
    }

    /// Handle for publishing from listeners or other threads.
    pub fn sender(&self) -> BusSender<E> {
        BusSender {
            tx: self.tx.clone(),
            clock: self.clock.clone(),
        }
    }

    fn stamp(&self, event: &mut GameEvent<E>) {
        if event.timestamp.is_none() {
            event.timestamp = Some(self.now());
        }
    }

    fn enqueue(&mut self, mut event: GameEvent<E>) {
        self.stamp(&mut event);
        self.counters.published += 1;
        trace!(
            target: "eventbus",
            "Queued {:?} event (priority {})",
            event.payload.topic(),
            event.priority
        );
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Queued { seq, event });
    }

    // ==================== PROCESSING ====================

    /// Dispatch queued events, highest priority first.
    ///
    /// At most `max_events_per_frame` events are dispatched; the rest stay
    /// queued. Events older than the timeout are dropped and do not count
    /// against the cap. Returns the number of events dispatched.
    pub fn process_events(&mut self) -> usize {
        let pending: Vec<GameEvent<E>> = self.rx.try_iter().collect();
        for event in pending {
            self.enqueue(event);
        }

        let mut dispatched = 0;
        while dispatched < self.max_events_per_frame {
            let Some(Queued { mut event, .. }) = self.queue.pop() else {
                break;
            };
            if self.is_expired(&event) {
                self.counters.expired += 1;
                debug!(
                    target: "eventbus",
                    "Dropping expired {:?} event", event.payload.topic()
                );
                continue;
            }
            self.dispatch(&mut event);
            dispatched += 1;
        }
        dispatched
    }

    fn is_expired(&self, event: &GameEvent<E>) -> bool {
        event
            .timestamp
            .is_some_and(|created| self.now() - created > self.event_timeout)
    }

    fn dispatch(&mut self, event: &mut GameEvent<E>) {
        self.counters.dispatched += 1;
        let topic = event.payload.topic();
        let supertopics = event.payload.supertopics();

        for topic in std::iter::once(topic).chain(supertopics.iter().copied()) {
            let Some(subscriptions) = self.listeners.get_mut(&topic) else {
                continue;
            };
            for subscription in subscriptions.iter_mut() {
                if event.consumed {
                    return;
                }
                let outcome =
                    panic::catch_unwind(AssertUnwindSafe(|| (subscription.listener)(event)));
                match outcome {
                    Ok(Ok(())) => {}
                    Ok(Err(message)) => {
                        self.counters.listener_failures += 1;
                        error!(
                            target: "eventbus",
                            "Listener {:?} failed on {:?}: {}", subscription.id, topic, message
                        );
                    }
                    Err(_) => {
                        self.counters.listener_failures += 1;
                        error!(
                            target: "eventbus",
                            "Listener {:?} panicked on {:?}", subscription.id, topic
                        );
                    }
                }
            }
        }
    }

    // ==================== QUERIES ====================

    /// Number of events waiting in the queue. Events sent through a
    /// [`BusSender`] are counted once they have been drained.
    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    pub fn counters(&self) -> BusCounters {
        self.counters
    }

    /// Drop every queued event and every listener.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.rx.try_iter().for_each(drop);
        self.listeners.clear();
    }
}
