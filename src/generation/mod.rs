//! Generation of one job: settings, inputs, output placement and the runner tying them together.

pub mod inputs;
pub mod output;
pub mod runner;
pub mod settings;

pub use inputs::{InputPaths, PromptSet, SeedCursor, SeedPool};
pub use output::{DirectoryLocks, OutputLayout};
pub use runner::{JobReport, JobRunner, RunnerPolicy};
pub use settings::{GenerationParams, JobSettings};
