//! Newline-delimited JSON host surface.

pub mod contract;
pub mod stdio;
