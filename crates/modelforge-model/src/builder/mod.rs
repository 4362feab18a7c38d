//! Per-format canonical model builders
//!
//! Each builder turns a parser's raw output into the arena model.
//! Source-format conventions (winding, axis fixes, texture V flips)
//! are all resolved here so nothing downstream knows where a model
//! came from.

mod obj;
mod ply;
mod tds;

pub use obj::build_obj;
pub use ply::build_ply;
pub use tds::build_tds;
