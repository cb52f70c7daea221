//! Per-session event bus: one producer, any number of subscribers.
//!
//! Events are kept in a grow-only buffer until the bus closes, so a slow
//! subscriber never causes drops and a subscriber that attaches mid-turn
//! (or reconnects) replays the turn from the start. Iteration order is push
//! order for every subscriber.

use codeloom_core::AgentEvent;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Default)]
struct BusInner {
    events: Vec<AgentEvent>,
    closed: bool,
}

pub struct EventBus {
    inner: Mutex<BusInner>,
    notify: Notify,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BusInner::default()),
            notify: Notify::new(),
        }
    }

    /// Append an event. Pushes after close are silently dropped.
    pub fn push(&self, event: AgentEvent) {
        {
            let mut inner = self.inner.lock();
            if inner.closed {
                return;
            }
            inner.events.push(event);
        }
        self.notify.notify_waiters();
    }

    /// Signal end-of-stream to all current and future subscribers.
    pub fn close(&self) {
        {
            let mut inner = self.inner.lock();
            inner.closed = true;
        }
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscribe(self: &Arc<Self>) -> BusSubscriber {
        BusSubscriber {
            bus: self.clone(),
            cursor: 0,
        }
    }
}

/// A read-only cursor over the bus. Yields every event pushed before close,
/// in push order, then `None` once the tail is drained.
pub struct BusSubscriber {
    bus: Arc<EventBus>,
    cursor: usize,
}

impl BusSubscriber {
    pub async fn next(&mut self) -> Option<AgentEvent> {
        loop {
            // Register the waiter before checking state, so a push that
            // lands between the check and the await still wakes us.
            let notified = self.bus.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let inner = self.bus.inner.lock();
                if self.cursor < inner.events.len() {
                    let event = inner.events[self.cursor].clone();
                    self.cursor += 1;
                    return Some(event);
                }
                if inner.closed {
                    return None;
                }
            }
            notified.await;
        }
    }
}
