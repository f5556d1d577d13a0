//! Dispatch: fan settings files out across backend endpoints.
//!
//! One worker per endpoint drains a shared FIFO of settings paths. Existing output is
//! confirmed through an [`OverwriteGate`] before any worker starts.

mod dispatcher;
mod gate;
mod queue;

pub use dispatcher::{DispatchSummary, Dispatcher, JobOutcome, JobStatus};
pub use gate::{gate_for_policy, AssumeNo, AssumeYes, InteractiveGate, OverwriteGate};
pub use queue::JobQueue;
