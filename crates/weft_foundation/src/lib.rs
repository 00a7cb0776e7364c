//! Core types, values, and errors for Weft.
//!
//! This crate provides:
//! - [`Value`] - The scalar value type carried by fact fields
//! - [`Type`] - Type descriptors for schema validation
//! - [`Error`] - Rich error types with context

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod error;
mod types;
mod value;

pub use error::{Error, ErrorContext, ErrorKind};
pub use types::Type;
pub use value::Value;

/// Convenience result type using the Weft [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
