//! Priority queue and delayed re-enqueue.
//!
//! The queue itself is a genuine min-heap ordered on `(priority_rank,
//! sequence)`, so the priority-ordering invariant holds on real ordering,
//! not just presence-tracking.
//!
//! Delayed re-enqueue uses a single timer task holding a min-heap of
//! `(fire_at, entry)`, woken by the earliest deadline, rather than one
//! fire-and-forget task per retry — this gives clean cancellation on
//! shutdown.

use std::{
    cmp::Ordering,
    collections::BinaryHeap,
    sync::atomic::{AtomicU64, Ordering as AtomicOrdering},
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use relay_common::{tracing, Priority};
use tokio::sync::Notify;

/// One admitted item: ordered by `(priority_rank, sequence)`, lowest first.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct QueueEntry {
    pub priority_rank: u8,
    pub sequence: u64,
    pub tracking_id: String,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.priority_rank, self.sequence).cmp(&(other.priority_rank, other.sequence))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Process-wide priority queue. Multi-producer/multi-consumer; a single
/// `parking_lot::Mutex` around the heap suffices since push/pop are O(log n).
pub struct PriorityQueue {
    heap: Mutex<BinaryHeap<std::cmp::Reverse<QueueEntry>>>,
    notify: Notify,
    sequence: AtomicU64,
}

impl Default for PriorityQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl PriorityQueue {
    #[must_use]
    pub fn new() -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            notify: Notify::new(),
            sequence: AtomicU64::new(0),
        }
    }

    /// Admit an item at the tail of its priority class.
    pub fn push(&self, priority: Priority, tracking_id: String) {
        let sequence = self.sequence.fetch_add(1, AtomicOrdering::Relaxed);
        self.heap.lock().push(std::cmp::Reverse(QueueEntry {
            priority_rank: priority.rank(),
            sequence,
            tracking_id,
        }));
        self.notify.notify_one();
    }

    /// Re-admit at the *same* priority, keeping FIFO-within-priority by
    /// taking a fresh sequence number (head-of-line bypass against newly
    /// admitted same-priority notifications is acceptable).
    pub fn push_rank(&self, priority_rank: u8, tracking_id: String) {
        let sequence = self.sequence.fetch_add(1, AtomicOrdering::Relaxed);
        self.heap.lock().push(std::cmp::Reverse(QueueEntry {
            priority_rank,
            sequence,
            tracking_id,
        }));
        self.notify.notify_one();
    }

    /// Block until an item is available, then return it.
    pub async fn pop(&self) -> QueueEntry {
        loop {
            let notified = self.notify.notified();
            if let Some(std::cmp::Reverse(entry)) = self.heap.lock().pop() {
                return entry;
            }
            notified.await;
        }
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.heap.lock().len()
    }
}

#[derive(Debug, Eq, PartialEq)]
struct ScheduledRetry {
    fire_at: Instant,
    priority_rank: u8,
    tracking_id: String,
}

impl Ord for ScheduledRetry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Earliest fire_at first -> min-heap via Reverse at the call site.
        self.fire_at.cmp(&other.fire_at)
    }
}

impl PartialOrd for ScheduledRetry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Single timer task backing delayed retry re-enqueue. Holds a min-heap of
/// `(fire_at, entry)`, woken either by a new nearer deadline or by the
/// earliest deadline elapsing.
pub struct DelayWheel {
    heap: Mutex<BinaryHeap<std::cmp::Reverse<ScheduledRetry>>>,
    notify: Notify,
}

impl Default for DelayWheel {
    fn default() -> Self {
        Self::new()
    }
}

impl DelayWheel {
    #[must_use]
    pub fn new() -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            notify: Notify::new(),
        }
    }

    /// Schedule `tracking_id` to be re-enqueued at the same priority after `delay`.
    pub fn schedule(&self, delay: Duration, priority_rank: u8, tracking_id: String) {
        let fire_at = Instant::now() + delay;
        self.heap.lock().push(std::cmp::Reverse(ScheduledRetry {
            fire_at,
            priority_rank,
            tracking_id,
        }));
        self.notify.notify_one();
    }

    /// Run until `shutdown` fires, pushing due entries onto `queue`.
    pub async fn run(
        &self,
        queue: &PriorityQueue,
        mut shutdown: tokio::sync::broadcast::Receiver<relay_common::Signal>,
    ) {
        loop {
            let next_deadline = self.heap.lock().peek().map(|e| e.0.fire_at);

            let sleep = match next_deadline {
                Some(deadline) => {
                    tokio::time::sleep_until(tokio::time::Instant::from_std(deadline))
                }
                None => tokio::time::sleep(Duration::from_secs(3600)),
            };
            tokio::pin!(sleep);

            let notified = self.notify.notified();

            tokio::select! {
                () = &mut sleep => {
                    let due = {
                        let mut heap = self.heap.lock();
                        let mut due = Vec::new();
                        let now = Instant::now();
                        while let Some(entry) = heap.peek() {
                            if entry.0.fire_at <= now {
                                due.push(heap.pop().expect("just peeked").0);
                            } else {
                                break;
                            }
                        }
                        due
                    };
                    for entry in due {
                        queue.push_rank(entry.priority_rank, entry.tracking_id);
                    }
                }
                () = notified => {}
                signal = shutdown.recv() => {
                    if let Ok(relay_common::Signal::Shutdown) = signal {
                        tracing::debug!("delay wheel shutting down");
                    }
                    return;
                }
            }
        }
    }
}
