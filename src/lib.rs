//! Weft - Forward-chaining rule engine with tuple coordination
//!
//! This crate re-exports all layers of the Weft system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: weft_engine     — RETE node graph, condition evaluation, dispatch
//!          weft_spaces     — Xuple-spaces, selection/consumption/retention
//! Layer 1: weft_storage    — Facts, tokens, working memory, checkpoints
//! Layer 0: weft_foundation — Core types (Value, Type, Error)
//! ```
//!
//! Rule firings are the sole producers of xuples: a terminal node either
//! invokes a registered handler or publishes one tuple per firing into a
//! xuple-space, where independent agents retrieve them under the space's
//! policies.

pub use weft_engine as engine;
pub use weft_foundation as foundation;
pub use weft_spaces as spaces;
pub use weft_storage as storage;
