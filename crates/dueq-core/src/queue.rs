//! Timestamp-ordered single-consumer message queue.
//!
//! [`MessageQueue`] schedules delayed work items and wakes its consumer
//! exactly when the earliest-due item becomes ready. Producers call
//! [`post_message`](MessageQueue::post_message) and
//! [`invalidate`](MessageQueue::invalidate) from any thread; one dedicated
//! consumer thread loops on [`wait_message`](MessageQueue::wait_message),
//! which blocks until a due message exists, removes it, and either
//! dispatches it through the message's own hook or returns it for external
//! dispatch.
//!
//! An invalidate request always preempts normal scheduling: it delivers a
//! reserved sentinel message before any timestamped message, even one that
//! is already overdue. This keeps a "state changed, re-evaluate" signal
//! from being starved behind a backlog of scheduled work.
//!
//! # Locking
//!
//! One mutex guards the pending list and the invalidate flag; the condvar
//! is signaled once per producer call (single-consumer design, never
//! broadcast). The consumer holds the lock only while inspecting state or
//! parked on the condvar — message hooks run with the lock released, so a
//! hook may post or invalidate without deadlocking.

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::message::{Handling, Message, MessageTag};
use crate::ordered_list::{OrderedMessageList, Scheduled};

// ── Post flags ──────────────────────────────────────────────────────────────

/// Flags accompanying a post. Reserved: no flag currently changes
/// behavior, but the slot is part of the producer API surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PostFlags(u32);

impl PostFlags {
    /// No flags.
    pub const NONE: PostFlags = PostFlags(0);

    /// Raw flag bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }
}

// ── Stats ───────────────────────────────────────────────────────────────────

/// Serializable snapshot of queue activity counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStats {
    /// Messages posted since creation.
    pub posted: u64,
    /// Messages returned to `wait_message` callers (sentinel included).
    pub delivered: u64,
    /// Messages consumed internally by their own hook.
    pub consumed: u64,
    /// `invalidate` calls observed (calls collapse until delivered, so
    /// this may exceed the number of sentinel deliveries).
    pub invalidates: u64,
    /// `wait_message` calls that returned empty on timeout.
    pub timeouts: u64,
    /// Current pending depth.
    pub pending: usize,
}

#[derive(Debug, Default)]
struct Counters {
    posted: u64,
    delivered: u64,
    consumed: u64,
    invalidates: u64,
    timeouts: u64,
}

// ── Queue ───────────────────────────────────────────────────────────────────

/// Hook run on the consumer thread immediately before each blocking wait.
///
/// This is the seam for transports that buffer outbound calls: anything
/// written before the thread parks gets flushed instead of sitting in the
/// buffer for the duration of the sleep. The hook runs under the queue
/// lock and must be non-blocking and must not call back into the queue.
pub type FlushFn = dyn Fn() + Send + Sync;

struct QueueState {
    pending: OrderedMessageList,
    invalidate_requested: bool,
    counters: Counters,
}

/// Outcome of dispatching one removed candidate.
enum Dispatch {
    /// Serviced internally; keep waiting without surfacing anything.
    Consumed,
    /// Surface the message to the caller.
    Deliver(Arc<Message>),
}

/// A timestamp-ordered message queue for one consumer thread and any
/// number of producers.
///
/// # Example
///
/// ```ignore
/// let queue = MessageQueue::new(MessageTag(0xffff_ffff));
/// queue.post_message(Arc::new(Message::new(MessageTag(1))), Duration::from_millis(10));
/// let msg = queue.wait_message(None).expect("no timeout was set");
/// assert_eq!(msg.tag(), MessageTag(1));
/// ```
pub struct MessageQueue {
    state: Mutex<QueueState>,
    readable: Condvar,
    /// One long-lived sentinel reused across invalidate cycles.
    sentinel: Arc<Message>,
    flush_before_wait: Option<Box<FlushFn>>,
}

impl MessageQueue {
    /// Create a queue whose invalidate sentinel carries `invalidate_tag`
    /// and no self-handling hook (the sentinel is handed to the caller).
    #[must_use]
    pub fn new(invalidate_tag: MessageTag) -> Self {
        Self::with_invalidate_message(Arc::new(Message::new(invalidate_tag)))
    }

    /// Create a queue with a caller-built invalidate sentinel.
    ///
    /// A sentinel with a hook returning [`Handling::Consumed`] is serviced
    /// entirely inside the wait loop, so a consumer looping on
    /// `wait_message` needs no special case for it.
    #[must_use]
    pub fn with_invalidate_message(sentinel: Arc<Message>) -> Self {
        Self {
            state: Mutex::new(QueueState {
                pending: OrderedMessageList::new(),
                invalidate_requested: false,
                counters: Counters::default(),
            }),
            readable: Condvar::new(),
            sentinel,
            flush_before_wait: None,
        }
    }

    /// Attach a flush hook, run on the consumer thread right before each
    /// blocking wait. See [`FlushFn`] for the contract.
    #[must_use]
    pub fn with_flush_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.flush_before_wait = Some(Box::new(hook));
        self
    }

    /// The queue's invalidate sentinel. Consumers can recognize an
    /// invalidate delivery by pointer identity (`Arc::ptr_eq`) or by tag.
    #[must_use]
    pub fn invalidate_message(&self) -> &Arc<Message> {
        &self.sentinel
    }

    // ── Producer side ───────────────────────────────────────────────────

    /// Schedule a message `delay` from now. Always succeeds.
    ///
    /// `Duration::ZERO` means eligible immediately. The message becomes
    /// visible to the next `wait_message` evaluation as soon as this call
    /// returns; a consumer blocked on a later deadline is woken so it can
    /// recompute its wait target.
    pub fn post_message(&self, message: Arc<Message>, delay: Duration) {
        self.post_message_with_flags(message, delay, PostFlags::NONE);
    }

    /// [`post_message`](Self::post_message) with an explicit flags word.
    pub fn post_message_with_flags(&self, message: Arc<Message>, delay: Duration, _flags: PostFlags) {
        let due = Instant::now() + delay;
        let mut state = self.state.lock().unwrap();
        trace!(tag = %message.tag(), delay_ms = delay.as_millis() as u64, "post message");
        state.pending.insert(Scheduled { due, message });
        state.counters.posted += 1;
        self.readable.notify_one();
    }

    /// Request an invalidate wakeup. Always succeeds.
    ///
    /// Idempotent: calls made before the sentinel is delivered collapse
    /// into a single pending invalidate.
    pub fn invalidate(&self) {
        let mut state = self.state.lock().unwrap();
        state.invalidate_requested = true;
        state.counters.invalidates += 1;
        trace!("invalidate requested");
        self.readable.notify_one();
    }

    // ── Consumer side ───────────────────────────────────────────────────

    /// Block until a message is ready, then dispatch it.
    ///
    /// With `timeout = None` the wait is unbounded. With `Some(t)` the
    /// call returns `None` once `t` has elapsed with nothing deliverable;
    /// `Some(Duration::ZERO)` is a non-blocking poll.
    ///
    /// Delivery order: a pending invalidate first, regardless of any
    /// timestamped message's due time; then messages in non-decreasing
    /// due-time order, FIFO among equal due times. A message whose hook
    /// returns [`Handling::Consumed`] is serviced internally and the wait
    /// continues; the timeout window restarts when that happens.
    pub fn wait_message(&self, timeout: Option<Duration>) -> Option<Arc<Message>> {
        loop {
            let deadline = timeout.map(|t| Instant::now() + t);
            let Some(candidate) = self.wait_ready(deadline) else {
                self.state.lock().unwrap().counters.timeouts += 1;
                trace!("wait_message timed out");
                return None;
            };

            // Lock released from here: hooks may re-enter the queue.
            match Self::dispatch(candidate) {
                Dispatch::Deliver(message) => {
                    self.state.lock().unwrap().counters.delivered += 1;
                    return Some(message);
                }
                Dispatch::Consumed => {
                    self.state.lock().unwrap().counters.consumed += 1;
                }
            }
        }
    }

    /// Inner wait loop: block until a candidate is ready or the deadline
    /// passes. Holds the lock except while parked on the condvar.
    fn wait_ready(&self, deadline: Option<Instant>) -> Option<Arc<Message>> {
        let mut state = self.state.lock().unwrap();
        loop {
            let now = Instant::now();

            // A pending invalidate always wins, even over overdue
            // timestamped messages.
            if state.invalidate_requested {
                state.invalidate_requested = false;
                trace!(stamped = ?now, "delivering invalidate sentinel");
                return Some(Arc::clone(&self.sentinel));
            }

            if state.pending.head_due().is_some_and(|due| due <= now) {
                if let Some(entry) = state.pending.pop_head() {
                    trace!(tag = %entry.message.tag(), "head message due");
                    return Some(entry.message);
                }
            }

            if let Some(limit) = deadline {
                if limit <= now {
                    return None;
                }
            }

            // Next wake: earliest of the head's due time and the caller's
            // deadline. Neither present means an unbounded park.
            let wake_at = match (state.pending.head_due(), deadline) {
                (Some(due), Some(limit)) => Some(due.min(limit)),
                (Some(due), None) => Some(due),
                (None, Some(limit)) => Some(limit),
                (None, None) => None,
            };

            if let Some(flush) = &self.flush_before_wait {
                flush();
            }

            // Wakeups are only hints; state is re-validated from the top.
            state = match wake_at {
                Some(at) => {
                    let wait = at.saturating_duration_since(now);
                    self.readable.wait_timeout(state, wait).unwrap().0
                }
                None => self.readable.wait(state).unwrap(),
            };
        }
    }

    /// Run one removed candidate through its hook, with the lock released.
    fn dispatch(candidate: Arc<Message>) -> Dispatch {
        match candidate.handle() {
            Some(Handling::Consumed) => Dispatch::Consumed,
            // No hook, or the hook handed the message back: surface it.
            Some(Handling::Deliver) | None => Dispatch::Deliver(candidate),
        }
    }

    // ── Observation ─────────────────────────────────────────────────────

    /// Log the pending list, flagging the entry that is `marker`.
    ///
    /// Purely observational; emits one `debug!` line per entry in the
    /// order they would deliver.
    pub fn dump(&self, marker: &Arc<Message>) {
        let state = self.state.lock().unwrap();
        let now = Instant::now();
        debug!(
            pending = state.pending.len(),
            invalidate = state.invalidate_requested,
            "message queue dump"
        );
        for (index, entry) in state.pending.iter().enumerate() {
            let tick = if Arc::ptr_eq(&entry.message, marker) {
                '>'
            } else {
                ' '
            };
            debug!(
                "{tick} {index}: msg{{.tag={}, due_in={:?}}}",
                entry.message.tag(),
                entry.due.saturating_duration_since(now)
            );
        }
    }

    /// Current pending depth.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().pending.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot the activity counters.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        let state = self.state.lock().unwrap();
        QueueStats {
            posted: state.counters.posted,
            delivered: state.counters.delivered,
            consumed: state.counters.consumed,
            invalidates: state.counters.invalidates,
            timeouts: state.counters.timeouts,
            pending: state.pending.len(),
        }
    }
}

impl std::fmt::Debug for MessageQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().unwrap();
        f.debug_struct("MessageQueue")
            .field("pending", &state.pending.len())
            .field("invalidate_requested", &state.invalidate_requested)
            .field("sentinel_tag", &self.sentinel.tag())
            .finish()
    }
}
