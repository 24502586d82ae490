#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! The worker runtime (C5) and supervisor (C6, §4.5–§4.6): one polling task per
//! `(origin, stage)` pair, and the startup/shutdown wiring that assembles every
//! other component into a running process.

mod poll_worker;
mod supervisor;

pub use poll_worker::PollWorker;
pub use supervisor::run;
