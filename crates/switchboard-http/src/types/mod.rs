//! Server-level types.

pub mod error;

pub use error::*;
