//! Fact submission: validation, identifier derivation, batching.

use crate::{adult_rule, build_network, person, person_type};

use weft_engine::Program;
use weft_foundation::{ErrorKind, Type, Value};
use weft_engine::TypeDef;
use weft_storage::Fact;

#[test]
fn matching_fact_fires_once() {
    let program = Program::new()
        .with_type(person_type())
        .with_rule(adult_rule());
    let (network, observer) = build_network(&program, &["adult"]);

    network.submit_fact(person("p1", 25)).unwrap();

    let firings = observer.firings();
    assert_eq!(firings.len(), 1);
    assert_eq!(firings[0].rule.as_ref(), "adult");
    assert_eq!(firings[0].args, vec![Value::from("p1")]);
    assert_eq!(firings[0].token.facts().len(), 1);
}

#[test]
fn non_matching_fact_is_stored_but_silent() {
    let program = Program::new()
        .with_type(person_type())
        .with_rule(adult_rule());
    let (network, observer) = build_network(&program, &["adult"]);

    network.submit_fact(person("p2", 15)).unwrap();

    assert_eq!(observer.count(), 0);
    let state = network.network_state();
    // Stored at the type node, filtered before the alpha memory.
    assert_eq!(state.node("type_Person").unwrap().fact_keys.len(), 1);
    assert_eq!(state.node("alpha_0").unwrap().fact_keys.len(), 0);
}

#[test]
fn schema_errors_reach_the_submitter() {
    let program = Program::new()
        .with_type(person_type())
        .with_rule(adult_rule());
    let (network, _) = build_network(&program, &["adult"]);

    let missing = Fact::new("Person").with_field("id", "p1");
    assert!(matches!(
        network.submit_fact(missing).unwrap_err().kind,
        ErrorKind::MissingField { .. }
    ));

    let wrong_type = Fact::new("Person")
        .with_field("id", "p1")
        .with_field("age", true);
    assert!(matches!(
        network.submit_fact(wrong_type).unwrap_err().kind,
        ErrorKind::TypeMismatch { .. }
    ));

    let undeclared = person("p1", 20).with_field("height", 180);
    assert!(matches!(
        network.submit_fact(undeclared).unwrap_err().kind,
        ErrorKind::UnknownField { .. }
    ));

    let unknown = Fact::new("Robot").with_field("id", "r1");
    assert!(matches!(
        network.submit_fact(unknown).unwrap_err().kind,
        ErrorKind::UnknownType(_)
    ));
}

#[test]
fn update_is_retract_then_assert() {
    let program = Program::new()
        .with_type(person_type())
        .with_rule(adult_rule());
    let (network, observer) = build_network(&program, &["adult"]);

    network.submit_fact(person("p1", 15)).unwrap();
    assert_eq!(observer.count(), 0);

    // Same key must be retracted before the new version is asserted.
    assert!(network.submit_fact(person("p1", 19)).is_err());
    network.retract_fact("Person~p1").unwrap();
    network.submit_fact(person("p1", 19)).unwrap();

    assert_eq!(observer.count(), 1);
}

#[test]
fn batch_submission_stops_at_first_error() {
    let program = Program::new()
        .with_type(person_type())
        .with_rule(adult_rule());
    let (network, _) = build_network(&program, &["adult"]);

    let result = network.submit_facts(vec![
        person("p1", 20),
        person("p1", 21), // duplicate key
        person("p3", 22),
    ]);
    assert!(matches!(
        result.unwrap_err().kind,
        ErrorKind::DuplicateFact(_)
    ));

    // p3 was never submitted.
    let state = network.network_state();
    assert_eq!(
        state.node("type_Person").unwrap().fact_keys,
        vec!["Person~p1"]
    );
}

#[test]
fn hash_derived_ids_are_stable() {
    let event = TypeDef::new("Event").with_field("kind", Type::String);
    let program = Program::new().with_type(event).with_rule(
        weft_engine::RuleDef::new("any-event")
            .bind("e", "Event")
            .invoke("noop", vec![]),
    );
    let (network, _) = build_network(&program, &["noop"]);

    network
        .submit_fact(Fact::new("Event").with_field("kind", "boot"))
        .unwrap();

    // Identical content derives the identical id, so resubmission is a
    // duplicate rather than a second fact.
    let err = network
        .submit_fact(Fact::new("Event").with_field("kind", "boot"))
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::DuplicateFact(_)));

    network
        .submit_fact(Fact::new("Event").with_field("kind", "halt"))
        .unwrap();
    assert_eq!(network.network_state().node("type_Event").unwrap().fact_keys.len(), 2);
}

#[test]
fn supplied_ids_take_precedence() {
    let program = Program::new()
        .with_type(person_type())
        .with_rule(adult_rule());
    let (network, _) = build_network(&program, &["adult"]);

    network
        .submit_fact(person("ignored", 25).with_id("custom"))
        .unwrap();
    assert_eq!(
        network
            .network_state()
            .node("type_Person")
            .unwrap()
            .fact_keys,
        vec!["Person~custom"]
    );
}
