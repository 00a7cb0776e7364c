//! Integration tests for the RETE engine
//!
//! Tests for submission, joins, retraction, and introspection.

mod introspection;
mod retraction;
mod submission;

use std::sync::Arc;

use weft_engine::{
    BinaryOp, Dispatcher, Expr, Network, Program, RecordingObserver, RuleDef, TypeDef,
};
use weft_foundation::{Result, Type, Value};
use weft_storage::{Fact, InMemoryStore};

/// Helper: the `Person(id: string, age: number)` type keyed by id.
pub fn person_type() -> TypeDef {
    TypeDef::new("Person")
        .with_field("id", Type::String)
        .with_field("age", Type::Number)
        .with_key("id")
}

/// Helper: the `Order(id, owner, total)` type keyed by id.
pub fn order_type() -> TypeDef {
    TypeDef::new("Order")
        .with_field("id", Type::String)
        .with_field("owner", Type::String)
        .with_field("total", Type::Number)
        .with_key("id")
}

/// Helper: `adult: {p: Person} / p.age >= 18 ==> adult(p.id)`.
pub fn adult_rule() -> RuleDef {
    RuleDef::new("adult")
        .bind("p", "Person")
        .when(Expr::binary(
            BinaryOp::Ge,
            Expr::field("p", "age"),
            Expr::lit(18),
        ))
        .invoke("adult", vec![Expr::field("p", "id")])
}

pub fn person(id: &str, age: i64) -> Fact {
    Fact::new("Person")
        .with_field("id", id)
        .with_field("age", age)
}

pub fn order(id: &str, owner: &str, total: i64) -> Fact {
    Fact::new("Order")
        .with_field("id", id)
        .with_field("owner", owner)
        .with_field("total", total)
}

/// Builds a network over an in-memory store with no-op handlers for the
/// given action names and a recording observer attached.
pub fn build_network(program: &Program, handlers: &[&str]) -> (Network, Arc<RecordingObserver>) {
    let dispatcher = Dispatcher::new();
    for name in handlers {
        dispatcher.register_handler(*name, Arc::new(|_: &[Value]| -> Result<()> { Ok(()) }));
    }
    let observer = Arc::new(RecordingObserver::new());
    dispatcher.register_observer(observer.clone());

    let network = Network::build(program, Arc::new(InMemoryStore::new()), dispatcher)
        .expect("program should compile");
    (network, observer)
}
