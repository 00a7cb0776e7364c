//! Rule firings publishing into xuple-spaces, retrieved by agents.

use std::sync::Arc;

use weft_engine::{BinaryOp, Dispatcher, Expr, Network, Program, RuleDef, TypeDef};
use weft_foundation::{Type, Value};
use weft_storage::{Fact, InMemoryStore};
use weft_spaces::{Consumption, SpaceConfig, XupleManager};

fn person_type() -> TypeDef {
    TypeDef::new("Person")
        .with_field("id", Type::String)
        .with_field("age", Type::Number)
        .with_key("id")
}

fn publish_rule() -> RuleDef {
    RuleDef::new("adult")
        .bind("p", "Person")
        .when(Expr::binary(
            BinaryOp::Ge,
            Expr::field("p", "age"),
            Expr::lit(18),
        ))
        .publish(
            "adults",
            "Adult",
            vec![
                ("person".into(), Expr::field("p", "id")),
                ("age".into(), Expr::field("p", "age")),
            ],
        )
}

fn person(id: &str, age: i64) -> Fact {
    Fact::new("Person")
        .with_field("id", id)
        .with_field("age", age)
}

fn build(config: SpaceConfig) -> (Network, Arc<XupleManager>) {
    let manager = Arc::new(XupleManager::new());
    manager.create_space("adults", config).unwrap();

    let program = Program::new()
        .with_type(person_type())
        .with_rule(publish_rule());
    let network = Network::build(
        &program,
        Arc::new(InMemoryStore::new()),
        Dispatcher::new().with_spaces(manager.clone()),
    )
    .unwrap();
    (network, manager)
}

#[test]
fn each_firing_publishes_exactly_one_xuple() {
    let (network, manager) = build(SpaceConfig::new());

    network.submit_fact(person("p1", 25)).unwrap();
    network.submit_fact(person("p2", 15)).unwrap();
    network.submit_fact(person("p3", 40)).unwrap();

    let space = manager.space("adults").unwrap();
    assert_eq!(space.count(), 2);
    assert_eq!(space.list_all().len(), 2);
}

#[test]
fn published_xuple_carries_template_fields_and_provenance() {
    let (network, manager) = build(SpaceConfig::new());
    network.submit_fact(person("p1", 25)).unwrap();

    let space = manager.space("adults").unwrap();
    let xuple = space.retrieve("consumer").unwrap().unwrap();

    let fact = xuple.fact();
    assert_eq!(fact.type_name(), "Adult");
    assert_eq!(fact.field("person"), Some(Value::from("p1")));
    assert_eq!(fact.field("age"), Some(Value::Int(25)));

    // Provenance: the triggering Person fact, for audit only.
    assert_eq!(xuple.triggering().len(), 1);
    assert_eq!(xuple.triggering()[0].key().unwrap().as_str(), "Person~p1");
}

#[test]
fn retraction_does_not_unpublish() {
    // Firings are never rolled back; a retraction after the fact leaves
    // the published xuple in place.
    let (network, manager) = build(SpaceConfig::new());
    network.submit_fact(person("p1", 25)).unwrap();
    network.retract_fact("Person~p1").unwrap();

    assert_eq!(manager.space("adults").unwrap().count(), 1);
}

#[test]
fn publish_into_full_space_fails_the_submission() {
    let (network, manager) = build(SpaceConfig::new().with_max_size(1));

    network.submit_fact(person("p1", 25)).unwrap();
    // The match happens, the publish is rejected, the error surfaces.
    let err = network.submit_fact(person("p2", 30)).unwrap_err();
    assert!(err.to_string().contains("full"));

    // The matched state stays; only the publish was refused.
    let state = network.network_state();
    assert_eq!(state.node("terminal_adult").unwrap().token_count, 2);
    assert_eq!(manager.space("adults").unwrap().count(), 1);
}

#[test]
fn independent_agents_share_per_agent_xuples() {
    let (network, manager) =
        build(SpaceConfig::new().with_consumption(Consumption::PerAgent));
    network.submit_fact(person("p1", 25)).unwrap();

    let space = manager.space("adults").unwrap();
    let first = space.retrieve("reader-1").unwrap().unwrap();
    let second = space.retrieve("reader-2").unwrap().unwrap();
    assert_eq!(first.fact().field("person"), second.fact().field("person"));
    assert!(space.retrieve("reader-1").unwrap().is_none());
}

#[test]
fn manager_lifecycle_is_explicit() {
    let (network, manager) = build(SpaceConfig::new());
    network.submit_fact(person("p1", 25)).unwrap();

    assert_eq!(manager.list_spaces(), vec!["adults"]);
    manager.close();
    assert!(manager.list_spaces().is_empty());

    // Publishing after close fails per-firing but the engine survives.
    let err = network.submit_fact(person("p2", 30)).unwrap_err();
    assert!(err.to_string().contains("not found"));
}
