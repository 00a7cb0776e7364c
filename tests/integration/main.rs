//! Cross-layer integration tests for Weft
//!
//! Tests that verify the network and the xuple-space layer working
//! together, plus the end-to-end acceptance scenarios.

mod pipeline;
mod properties;
mod scenarios;
