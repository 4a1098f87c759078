//! Serialized, re-entrant event delivery.
//!
//! Events are pushed onto a FIFO queue in transition order (while the
//! monitor's state lock is held) and delivered by [`DeliveryQueue::drain`]
//! after that lock is released. Only one thread delivers at a time. A drain
//! started from inside a callback on the delivering thread returns at once;
//! the outer drain picks up whatever the callback queued.

use std::cell::Cell;
use std::collections::VecDeque;

use parking_lot::{Mutex, ReentrantMutex};

use crate::events::MonitorEvent;

/// A queued event plus the run it belongs to.
#[derive(Debug, Clone)]
pub(crate) struct Envelope {
    pub event: MonitorEvent,
    /// `None` for events that are delivered regardless of later runs
    /// (`Disconnected`).
    pub epoch: Option<u64>,
}

impl Envelope {
    pub fn tagged(event: MonitorEvent, epoch: u64) -> Self {
        Self {
            event,
            epoch: Some(epoch),
        }
    }

    pub fn untagged(event: MonitorEvent) -> Self {
        Self { event, epoch: None }
    }
}

pub(crate) struct DeliveryQueue {
    pending: Mutex<VecDeque<Envelope>>,
    delivering: ReentrantMutex<Cell<bool>>,
}

impl Default for DeliveryQueue {
    fn default() -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            delivering: ReentrantMutex::new(Cell::new(false)),
        }
    }
}

impl DeliveryQueue {
    pub fn push(&self, envelope: Envelope) {
        self.pending.lock().push_back(envelope);
    }

    /// Delivers queued envelopes in order until the queue is empty.
    ///
    /// Blocks while another thread is delivering.
    pub fn drain<F>(&self, mut deliver: F)
    where
        F: FnMut(&Envelope),
    {
        let guard = self.delivering.lock();
        if guard.replace(true) {
            // nested call from a callback
            return;
        }
        let _reset = ResetOnDrop(&*guard);

        loop {
            let next = self.pending.lock().pop_front();
            let Some(envelope) = next else {
                break;
            };
            deliver(&envelope);
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }
}

struct ResetOnDrop<'a>(&'a Cell<bool>);

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn connected(id: &str) -> MonitorEvent {
        MonitorEvent::Connected {
            account_id: id.into(),
            timestamp: 0,
        }
    }

    #[test]
    fn drains_in_fifo_order() {
        let queue = DeliveryQueue::default();
        queue.push(Envelope::tagged(connected("a"), 1));
        queue.push(Envelope::untagged(connected("b")));

        let mut seen = Vec::new();
        queue.drain(|env| seen.push(env.event.account_id().to_string()));

        assert_eq!(seen, vec!["a", "b"]);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn nested_drain_defers_to_outer_loop() {
        let queue = Arc::new(DeliveryQueue::default());
        queue.push(Envelope::untagged(connected("outer")));

        let inner_queue = Arc::clone(&queue);
        let mut seen = Vec::new();
        queue.drain(|env| {
            let id = env.event.account_id().to_string();
            if id == "outer" {
                inner_queue.push(Envelope::untagged(connected("nested")));
                // Same thread: must not recurse or deadlock.
                inner_queue.drain(|_| panic!("nested drain must not deliver"));
            }
            seen.push(id);
        });

        assert_eq!(seen, vec!["outer", "nested"]);
    }

    #[test]
    fn drain_is_reusable_after_completion() {
        let queue = DeliveryQueue::default();
        queue.push(Envelope::untagged(connected("first")));
        queue.drain(|_| {});
        queue.push(Envelope::untagged(connected("second")));

        let mut count = 0;
        queue.drain(|_| count += 1);
        assert_eq!(count, 1);
    }

    #[test]
    fn concurrent_drains_never_overlap() {
        let queue = Arc::new(DeliveryQueue::default());
        let active = Arc::new(Mutex::new(0usize));
        let max_active = Arc::new(Mutex::new(0usize));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let queue = Arc::clone(&queue);
                let active = Arc::clone(&active);
                let max_active = Arc::clone(&max_active);
                thread::spawn(move || {
                    for j in 0..25 {
                        queue.push(Envelope::tagged(connected(&format!("{}-{}", i, j)), 1));
                        queue.drain(|_| {
                            let now = {
                                let mut a = active.lock();
                                *a += 1;
                                *a
                            };
                            let mut m = max_active.lock();
                            *m = (*m).max(now);
                            drop(m);
                            *active.lock() -= 1;
                        });
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(*max_active.lock(), 1);
        assert_eq!(queue.len(), 0);
    }
}
