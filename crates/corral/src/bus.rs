// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event Bus (§4.9): topic-per-event-kind pub/sub with per-subscription
//! backpressure. Each subscriber gets two independent bounded queues — a
//! small one for state-transition-shaped events and a larger one for the
//! high-frequency `session_data` stream — so a slow UI consumer falling
//! behind on bytes cannot also delay the transitions it's waiting to see.
//! On overflow the oldest queued event is dropped and the subscription's
//! `dropped` counter is incremented.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::event::Event;

/// Default capacity for the small, transition-shaped queue (§4.9).
pub const DEFAULT_TRANSITION_QUEUE_CAPACITY: usize = 64;
/// Default capacity for the high-frequency `session_data` queue (§4.9).
pub const DEFAULT_DATA_QUEUE_CAPACITY: usize = 1024;

struct SubscriberState {
    id: u64,
    transition: Mutex<VecDeque<Event>>,
    transition_capacity: usize,
    data: Mutex<VecDeque<Event>>,
    data_capacity: usize,
    dropped: AtomicU64,
    notify: Notify,
}

fn push_bounded(queue: &Mutex<VecDeque<Event>>, capacity: usize, event: Event, dropped: &AtomicU64) {
    let mut queue = queue.lock().unwrap_or_else(|e| e.into_inner());
    if queue.len() >= capacity {
        queue.pop_front();
        dropped.fetch_add(1, Ordering::Relaxed);
    }
    queue.push_back(event);
}

/// Multi-subscriber event bus. Cheaply cloneable; every clone shares the
/// same subscriber registry.
#[derive(Clone)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Arc<SubscriberState>>>>,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self { subscribers: Arc::new(Mutex::new(Vec::new())), next_id: Arc::new(AtomicU64::new(0)) }
    }

    /// Subscribe with the default queue capacities.
    pub fn subscribe(&self) -> Subscription {
        self.subscribe_with_capacities(DEFAULT_TRANSITION_QUEUE_CAPACITY, DEFAULT_DATA_QUEUE_CAPACITY)
    }

    pub fn subscribe_with_capacities(&self, transition_capacity: usize, data_capacity: usize) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let state = Arc::new(SubscriberState {
            id,
            transition: Mutex::new(VecDeque::new()),
            transition_capacity,
            data: Mutex::new(VecDeque::new()),
            data_capacity,
            dropped: AtomicU64::new(0),
            notify: Notify::new(),
        });
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner()).push(state.clone());
        Subscription { state, registry: self.subscribers.clone() }
    }

    /// Publish an event to every current subscriber. Within one session,
    /// callers must publish in the order they want observed (§5 ordering) —
    /// the bus itself imposes no cross-session ordering.
    pub fn publish(&self, event: Event) {
        let subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        for sub in subscribers.iter() {
            if event.kind.is_high_frequency() {
                push_bounded(&sub.data, sub.data_capacity, event.clone(), &sub.dropped);
            } else {
                push_bounded(&sub.transition, sub.transition_capacity, event.clone(), &sub.dropped);
            }
            sub.notify.notify_one();
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A single subscriber's view of the bus.
pub struct Subscription {
    state: Arc<SubscriberState>,
    registry: Arc<Mutex<Vec<Arc<SubscriberState>>>>,
}

impl Subscription {
    /// Await the next event, preferring transition-shaped events over
    /// `session_data` so a burst of output never starves a pending state
    /// change.
    pub async fn recv(&self) -> Event {
        loop {
            if let Some(event) = self.try_recv() {
                return event;
            }
            self.state.notify.notified().await;
        }
    }

    /// Non-blocking poll; returns `None` if both queues are empty.
    pub fn try_recv(&self) -> Option<Event> {
        if let Some(event) = self.state.transition.lock().unwrap_or_else(|e| e.into_inner()).pop_front() {
            return Some(event);
        }
        self.state.data.lock().unwrap_or_else(|e| e.into_inner()).pop_front()
    }

    /// Number of events dropped for this subscription due to overflow.
    pub fn dropped(&self) -> u64 {
        self.state.dropped.load(Ordering::Relaxed)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut subscribers = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.retain(|s| s.id != self.state.id);
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
