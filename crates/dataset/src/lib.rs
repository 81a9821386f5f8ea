//! The rotating dataset tree: a size-capped `current/` collection of
//! thumbnail images that freezes into immutable, sequentially numbered
//! archive batches, each paired with a version tag, and mirrors to a remote
//! storage backend.
//!
//! The state machine is deliberately tiny: a run is either `Collecting`
//! (room left in `current/`) or `RotationNeeded` (at the cap), and the only
//! transition is an atomic directory rename. Everything else is
//! bookkeeping around it.

mod dataset;
pub mod error;
pub mod layout;
mod publish;
mod tag;

pub use crate::dataset::{Dataset, RotatedBatch, State};
pub use crate::publish::PublishSummary;
pub use crate::tag::VersionTag;
