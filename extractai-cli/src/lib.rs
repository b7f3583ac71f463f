//! Library half of the `extractai` binary: command pipelines and the run
//! summary, kept out of `main.rs` so they can be driven with test backends.

pub mod errors;
pub mod pipeline;
pub mod summary;

pub use errors::CliError;
pub use pipeline::{run_collateral, run_land, run_report, Backends, ReportOptions, RunOutcome, RunSettings};
pub use summary::finish;
