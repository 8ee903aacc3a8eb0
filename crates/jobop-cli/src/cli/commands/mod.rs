//! CLI command handlers, one per file.

mod backoff;
mod classify;
mod evaluate;

pub use backoff::run_backoff;
pub use classify::{run_classify, ClassifyArgs};
pub use evaluate::run_evaluate;
