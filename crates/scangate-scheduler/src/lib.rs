//! Job scheduling for scangate.
//!
//! One bounded FIFO queue feeds a fixed pool of workers. Submission is
//! idempotent (create-if-absent on the client's idempotency key) and
//! fails fast with `queue_full` when the queue is at capacity. Each
//! worker drives a job through fetch -> normalize -> score -> evaluate
//! -> commit, serializing the commit per release so concurrent jobs for
//! the same release can never lose an update. A background reaper
//! removes terminal jobs after their retention window.

pub mod locks;
pub mod queue;
pub mod reaper;
pub mod scheduler;
pub mod worker;

pub use locks::ReleaseLocks;
pub use queue::{BatchSubmission, JobQueue, Submission, SubmitError, SubmitLimits};
pub use reaper::Reaper;
pub use scheduler::{Scheduler, SchedulerConfig};
pub use worker::{PipelineStages, Worker};
