//! Modelforge Core Library
//!
//! This crate provides the math primitives, error handling, and logging
//! setup shared across all modelforge components.

pub mod error;
pub mod logging;
pub mod math;

pub use error::{Error, Result, ResultExt};
pub use math::*;

/// Re-export commonly used items
pub mod prelude {
    pub use crate::error::{Error, Result, ResultExt};
    pub use crate::math::*;
}
