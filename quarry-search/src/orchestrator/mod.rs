//! Search orchestration and result aggregation.
//!
//! [`search`] drives one request through backend selection and concurrent
//! fan-out. The remaining modules turn the raw hits that came back into the
//! final ranked list.

pub mod aggregate;
pub mod dedup;
pub mod filter;
pub mod identity;
pub mod normalize;
pub mod ranking;
pub mod search;

pub use aggregate::aggregate;
pub use search::{Orchestrator, Phase, COUNT_UNSUPPORTED};
