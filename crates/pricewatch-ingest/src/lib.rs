//! Run orchestration for pricewatch.
//!
//! An [`Orchestrator`] walks the configured (platform, category) listings in
//! order, scrapes each one and hands the batch to a [`BatchSink`]. Failures
//! stay inside their pair; the caller always gets a [`RunSummary`].
//!
//! [`RunSummary`]: pricewatch_core::RunSummary

pub mod error;
pub mod observer;
pub mod orchestrator;
pub mod sink;

pub use error::PairError;
pub use observer::{RunObserver, TracingObserver};
pub use orchestrator::{Orchestrator, RunFilter};
pub use sink::{BatchSink, PgSink};
