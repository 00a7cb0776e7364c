//! End-to-end acceptance scenarios.

use std::sync::Arc;

use weft_engine::{
    BinaryOp, Dispatcher, Expr, Network, Program, RecordingObserver, RuleDef, TypeDef,
};
use weft_foundation::{Result, Type, Value};
use weft_storage::{Fact, InMemoryStore};
use weft_spaces::{Consumption, Selection, SpaceConfig, XupleManager};

/// Scenario A: `Person(id: string, age: number)`;
/// `adult: {p: Person} / p.age >= 18 ==> adult(p.id)`.
#[test]
fn scenario_a_single_rule_single_activation() {
    let program = Program::new()
        .with_type(
            TypeDef::new("Person")
                .with_field("id", Type::String)
                .with_field("age", Type::Number)
                .with_key("id"),
        )
        .with_rule(
            RuleDef::new("adult")
                .bind("p", "Person")
                .when(Expr::binary(
                    BinaryOp::Ge,
                    Expr::field("p", "age"),
                    Expr::lit(18),
                ))
                .invoke("adult", vec![Expr::field("p", "id")]),
        );

    let dispatcher = Dispatcher::new();
    dispatcher.register_handler("adult", Arc::new(|_: &[Value]| -> Result<()> { Ok(()) }));
    let observer = Arc::new(RecordingObserver::new());
    dispatcher.register_observer(observer.clone());
    let network = Network::build(&program, Arc::new(InMemoryStore::new()), dispatcher).unwrap();

    network
        .submit_fact(
            Fact::new("Person")
                .with_field("id", "p1")
                .with_field("age", 25),
        )
        .unwrap();
    network
        .submit_fact(
            Fact::new("Person")
                .with_field("id", "p2")
                .with_field("age", 15),
        )
        .unwrap();

    // Exactly 1 activation: action `adult`, argument "p1".
    let firings = observer.firings();
    assert_eq!(firings.len(), 1);
    assert_eq!(firings[0].action.as_ref(), "adult");
    assert_eq!(firings[0].args, vec![Value::from("p1")]);
}

/// Scenario B: with a=17, b=5, c=3, `((a*b)%c)+(a/b)-c` is 1.4 and
/// `(a%b)%c` is 2, evaluated through a rule's action arguments.
#[test]
fn scenario_b_arithmetic_through_a_rule() {
    let a = || Expr::field("m", "a");
    let b = || Expr::field("m", "b");
    let c = || Expr::field("m", "c");

    let mixed = Expr::binary(
        BinaryOp::Sub,
        Expr::binary(
            BinaryOp::Add,
            Expr::binary(BinaryOp::Mod, Expr::binary(BinaryOp::Mul, a(), b()), c()),
            Expr::binary(BinaryOp::Div, a(), b()),
        ),
        c(),
    );
    let nested_mod = Expr::binary(BinaryOp::Mod, Expr::binary(BinaryOp::Mod, a(), b()), c());

    let program = Program::new()
        .with_type(
            TypeDef::new("Measurement")
                .with_field("a", Type::Number)
                .with_field("b", Type::Number)
                .with_field("c", Type::Number),
        )
        .with_rule(
            RuleDef::new("compute")
                .bind("m", "Measurement")
                .invoke("report", vec![mixed, nested_mod]),
        );

    let dispatcher = Dispatcher::new();
    dispatcher.register_handler("report", Arc::new(|_: &[Value]| -> Result<()> { Ok(()) }));
    let observer = Arc::new(RecordingObserver::new());
    dispatcher.register_observer(observer.clone());
    let network = Network::build(&program, Arc::new(InMemoryStore::new()), dispatcher).unwrap();

    network
        .submit_fact(
            Fact::new("Measurement")
                .with_field("a", 17)
                .with_field("b", 5)
                .with_field("c", 3),
        )
        .unwrap();

    let firings = observer.firings();
    assert_eq!(firings.len(), 1);
    let mixed_result = firings[0].args[0].as_number().unwrap();
    assert!((mixed_result - 1.4).abs() < 0.01, "got {mixed_result}");
    assert_eq!(firings[0].args[1].as_number(), Some(2.0));
}

/// Scenario C: `selection: lifo, consumption: once`; publish X1, X2, X3
/// in order; first retrieve returns X3, second returns X2.
#[test]
fn scenario_c_lifo_once_retrieval() {
    let manager = XupleManager::new();
    let space = manager
        .create_space(
            "results",
            SpaceConfig::new()
                .with_selection(Selection::Lifo)
                .with_consumption(Consumption::Once),
        )
        .unwrap();

    for id in ["X1", "X2", "X3"] {
        manager
            .publish("results", Arc::new(Fact::new("Result").with_id(id)), Vec::new())
            .unwrap();
    }

    let first = space.retrieve("agent").unwrap().unwrap();
    let second = space.retrieve("agent").unwrap().unwrap();
    assert_eq!(first.fact().id(), Some("X3"));
    assert_eq!(second.fact().id(), Some("X2"));
}
