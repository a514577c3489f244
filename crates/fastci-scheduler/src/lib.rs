//! Build queue and pipeline orchestration for fastci.
//!
//! The queue is a durable filesystem mailbox written by the gateway and
//! drained by exactly one builder process, which runs each job through a
//! fixed fail-fast pipeline.

pub mod orchestrator;
pub mod queue;
pub mod worker;

pub use orchestrator::{BuildPipeline, RunOutcome, RunReport};
pub use queue::{BuildQueue, QueueError};
pub use worker::Worker;
