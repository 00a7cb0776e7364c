//! Fact, token, and working-memory storage for Weft.
//!
//! This crate provides:
//! - [`Fact`] - Immutable typed facts with stable keys
//! - [`Token`] - Ordered fact bindings accumulated by joins
//! - [`WorkingMemory`] - Per-node fact/token store with cheap snapshots
//! - [`MemoryStore`] - Pluggable checkpoint backend with an in-memory
//!   reference implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod checkpoint;
mod fact;
mod memory;
mod token;

pub use checkpoint::{InMemoryStore, MemoryStore, from_bytes, to_bytes};
pub use fact::{Fact, FactKey, ID_FIELD};
pub use memory::WorkingMemory;
pub use token::{Token, TokenId};
