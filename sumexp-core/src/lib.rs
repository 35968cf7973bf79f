//! Shared primitives for the sumexp container.
//!
//! - **Error types**: [`SumExpError`], [`ErrorKind`] and [`Result`]
//! - **Traits**: [`Dimnames`], implemented by every labeled matrix-like type

pub mod error;
pub mod traits;

pub use error::{ErrorKind, Result, SumExpError};
pub use traits::*;
