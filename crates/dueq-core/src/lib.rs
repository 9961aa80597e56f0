//! dueq-core: timestamp-ordered message queue with invalidate preemption.
//!
//! Producers schedule delayed work items from any thread; one dedicated
//! consumer thread blocks until the earliest-due item becomes ready and
//! dispatches it. A separate invalidate signal always preempts normal
//! scheduling, so a "state changed, re-evaluate" wakeup is never starved
//! behind a backlog of timestamped messages.
//!
//! # Architecture
//!
//! ```text
//! producers ──post_message/invalidate──▶ MessageQueue
//!                                        (mutex + condvar)
//!                                              │
//!                                     OrderedMessageList
//!                                    (sorted by due time)
//!                                              │
//! consumer  ◀────────wait_message──────────────┘
//! ```
//!
//! # Modules
//!
//! - `message`: message kinds, self-handling hooks
//! - `ordered_list`: sorted pending container
//! - `queue`: the blocking queue and its wait state machine
//! - `logging`: tracing-based logging setup for host programs
//!
//! # Safety
//!
//! This crate forbids unsafe code.

#![forbid(unsafe_code)]

pub mod logging;
pub mod message;
pub mod ordered_list;
pub mod queue;
