//! Message types for the due-time queue.
//!
//! A [`Message`] is an opaque unit of scheduled work: a [`MessageTag`]
//! identifying its kind plus an optional self-handling hook. Messages carry
//! no payload of their own — callers attach state by capturing it in the
//! handler closure or by mapping tags to work on their side of the queue.
//!
//! Messages are immutable once constructed and are shared as
//! `Arc<Message>` between the queue (while pending) and any external
//! holder. The due time is not part of the message: it belongs to the
//! queue's pending entry and is stamped once at enqueue time.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a message kind.
///
/// The queue never interprets the tag; it exists so consumers can map
/// delivered messages back to work. Conventionally rendered in the
/// hex form used by `dump` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageTag(pub u32);

impl fmt::Display for MessageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Outcome of a message's self-handling hook.
///
/// Replaces a boolean "handled" flag with an exhaustive sum type: the two
/// cases a hook can produce are spelled out rather than encoded in the
/// meaning of `true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handling {
    /// The message was fully serviced inside the queue's wait loop. The
    /// queue drops its reference and keeps waiting; the caller of
    /// `wait_message` never sees this message.
    Consumed,
    /// Hand the message to the caller of `wait_message` for external
    /// dispatch. The hook may have done partial work first.
    Deliver,
}

/// Self-handling hook type. Invoked by the queue with the lock released,
/// so hooks may post new messages or invalidate without deadlocking.
pub type HandlerFn = dyn Fn(&Message) -> Handling + Send + Sync;

/// A schedulable message: a tag plus an optional self-handling hook.
///
/// A message without a hook is always handed to the caller of
/// `wait_message`. A message with a hook is dispatched through it first;
/// [`Handling::Consumed`] suppresses external delivery entirely.
pub struct Message {
    tag: MessageTag,
    handler: Option<Box<HandlerFn>>,
}

impl Message {
    /// Create a message with no self-handling hook (always handed off).
    #[must_use]
    pub fn new(tag: MessageTag) -> Self {
        Self { tag, handler: None }
    }

    /// Create a message with a self-handling hook.
    #[must_use]
    pub fn with_handler(
        tag: MessageTag,
        handler: impl Fn(&Message) -> Handling + Send + Sync + 'static,
    ) -> Self {
        Self {
            tag,
            handler: Some(Box::new(handler)),
        }
    }

    /// The message's kind tag.
    #[must_use]
    pub fn tag(&self) -> MessageTag {
        self.tag
    }

    /// Whether this message carries a self-handling hook.
    #[must_use]
    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Run the self-handling hook, if any.
    ///
    /// Returns `None` when the message has no hook. Callers must not hold
    /// the queue lock: the hook may re-enter the queue.
    pub(crate) fn handle(&self) -> Option<Handling> {
        self.handler.as_ref().map(|handler| handler(self))
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("tag", &self.tag)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}
