//! cs-core: stable foundation for carbosol.
//!
//! Contains:
//! - units (uom SI types, constructors, and solver-native conversions)
//! - numeric (Real + float helpers)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use numeric::*;
pub use units::*;
