//! Core types and pure logic for the castwatch inspection pipeline.

pub mod error;
pub mod inference;
pub mod rollup;
pub mod stats;
pub mod week;

pub use error::{Error, Result};
pub use inference::*;
pub use rollup::*;
pub use stats::StatSummary;
pub use week::*;
