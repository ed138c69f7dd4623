#![forbid(unsafe_code)]

//! Trace replay front end for `jankscope-core`.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod replay;
pub mod trace;

pub use cli::{Cli, Commands, run, run_from_env};
pub use error::{HarnessError, Result};
pub use replay::{ReplayOptions, ReplayOutcome, replay};
