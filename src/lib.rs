//! sdbatch: Batch Image Generation Dispatcher
//!
//! Fans job settings files out across a fixed pool of Stable Diffusion WebUI backends.
//! Each job selects its model, pairs every prompt with a deterministic run of seeds and
//! appends the returned images to `generations_on_<model>/<prompt>/` without ever
//! overwriting earlier output.

pub mod backend;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod generation;
pub mod logging;
pub mod seeds;
