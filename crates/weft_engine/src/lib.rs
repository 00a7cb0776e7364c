//! Incremental RETE network, condition evaluation, and action dispatch
//! for Weft.
//!
//! This crate provides:
//! - [`Expr`] and [`evaluate`] - Tagged-union condition AST and its pure
//!   evaluator
//! - [`Program`], [`TypeDef`], [`RuleDef`] - The validated program model
//! - [`Network`] - The compiled node graph with `submit_fact` /
//!   `retract_fact` as the sole write path
//! - [`Dispatcher`], [`ActionHandler`], [`ActionObserver`] - Action
//!   dispatch into handlers and xuple-spaces

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod dispatch;
mod expr;
mod network;
mod node;
mod program;

pub use dispatch::{ActionHandler, ActionObserver, Dispatcher, Firing, RecordingObserver};
pub use expr::{BinaryOp, Bindings, Expr, evaluate, evaluate_bool};
pub use network::{Network, NetworkState, NodeState};
pub use node::{Edge, Node, NodeId, NodeKind, Side, TerminalStats};
pub use program::{ActionSpec, FieldDef, Program, RuleBuilder, RuleDef, TypeDef, VarDecl};
