//! Core types for the reconciliation pipeline: builder, seek context, outcome and error handling.

pub mod builder;
pub mod context;
pub mod error;
pub mod outcome;

pub use builder::{Reconciler, ReconcilerBuilder, RunSummary};
pub use context::SeekContext;
pub use error::{Error, Result};
pub use outcome::BuildOutcome;
