//! Retraction: full-cascade invalidation of facts and dependent tokens.

use crate::{adult_rule, build_network, order, order_type, person, person_type};

use weft_engine::{BinaryOp, Expr, NetworkState, Program, RuleDef};

fn fingerprint(state: &NetworkState) -> Vec<(String, Vec<String>, usize)> {
    state
        .nodes
        .iter()
        .map(|n| (n.label.clone(), n.fact_keys.clone(), n.token_count))
        .collect()
}

#[test]
fn submit_then_retract_restores_every_memory() {
    let program = Program::new()
        .with_type(person_type())
        .with_rule(adult_rule());
    let (network, _) = build_network(&program, &["adult"]);

    network.submit_fact(person("p0", 50)).unwrap();
    let before = fingerprint(&network.network_state());

    network.submit_fact(person("p1", 25)).unwrap();
    network.retract_fact("Person~p1").unwrap();

    assert_eq!(fingerprint(&network.network_state()), before);
}

#[test]
fn retraction_cascades_through_joins() {
    let rule = RuleDef::new("owner")
        .bind("p", "Person")
        .bind("o", "Order")
        .when(Expr::binary(
            BinaryOp::Eq,
            Expr::field("o", "owner"),
            Expr::field("p", "id"),
        ))
        .invoke("pair", vec![]);
    let program = Program::new()
        .with_type(person_type())
        .with_type(order_type())
        .with_rule(rule);
    let (network, _) = build_network(&program, &["pair"]);

    network.submit_fact(person("p1", 30)).unwrap();
    let before = fingerprint(&network.network_state());

    // The order joins with p1 and lands a token on the terminal.
    network.submit_fact(order("o1", "p1", 10)).unwrap();
    let terminal = network.network_state();
    assert_eq!(terminal.node("terminal_owner").unwrap().token_count, 1);

    // Retracting the order unwinds the join result everywhere.
    network.retract_fact("Order~o1").unwrap();
    assert_eq!(fingerprint(&network.network_state()), before);
}

#[test]
fn retracting_the_left_fact_destroys_join_results() {
    let rule = RuleDef::new("owner")
        .bind("p", "Person")
        .bind("o", "Order")
        .when(Expr::binary(
            BinaryOp::Eq,
            Expr::field("o", "owner"),
            Expr::field("p", "id"),
        ))
        .invoke("pair", vec![]);
    let program = Program::new()
        .with_type(person_type())
        .with_type(order_type())
        .with_rule(rule);
    let (network, _) = build_network(&program, &["pair"]);

    network.submit_fact(person("p1", 30)).unwrap();
    network.submit_fact(order("o1", "p1", 10)).unwrap();

    network.retract_fact("Person~p1").unwrap();

    let state = network.network_state();
    // Tokens bound to p1 are gone everywhere; the order fact survives on
    // the right memory.
    assert_eq!(state.node("terminal_owner").unwrap().token_count, 0);
    for node in &state.nodes {
        assert!(!node.fact_keys.contains(&"Person~p1".to_string()));
    }
    assert_eq!(
        state.node("type_Order").unwrap().fact_keys,
        vec!["Order~o1"]
    );

    // The surviving right fact joins again with a re-asserted person.
    network.submit_fact(person("p1", 35)).unwrap();
    assert_eq!(
        network
            .network_state()
            .node("terminal_owner")
            .unwrap()
            .token_count,
        1
    );
}

#[test]
fn retract_is_idempotent_per_fact() {
    let program = Program::new()
        .with_type(person_type())
        .with_rule(adult_rule());
    let (network, _) = build_network(&program, &["adult"]);

    network.submit_fact(person("p1", 25)).unwrap();
    network.retract_fact("Person~p1").unwrap();

    // A second retraction finds nothing.
    assert!(network.retract_fact("Person~p1").is_err());
}

#[test]
fn reset_clears_memories_but_keeps_graph() {
    let program = Program::new()
        .with_type(person_type())
        .with_rule(adult_rule());
    let (network, observer) = build_network(&program, &["adult"]);

    network.submit_fact(person("p1", 25)).unwrap();
    let node_count = network.node_count();

    network.reset();
    let state = network.network_state();
    assert_eq!(state.nodes.len(), node_count);
    assert!(state.nodes.iter().all(|n| n.fact_keys.is_empty() && n.token_count == 0));

    // The graph still matches fresh submissions.
    network.submit_fact(person("p2", 30)).unwrap();
    assert_eq!(observer.count(), 2);
}
