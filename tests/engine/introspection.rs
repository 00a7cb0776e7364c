//! Introspection: network state, tree printing, stats, checkpoints.

use std::sync::Arc;

use crate::{adult_rule, build_network, person, person_type};

use weft_engine::{Dispatcher, Network, Program};
use weft_foundation::{Result, Value};
use weft_storage::{InMemoryStore, MemoryStore};

#[test]
fn network_state_reports_every_node() {
    let program = Program::new()
        .with_type(person_type())
        .with_rule(adult_rule());
    let (network, _) = build_network(&program, &["adult"]);

    network.submit_fact(person("p1", 25)).unwrap();

    let state = network.network_state();
    assert_eq!(state.nodes.len(), network.node_count());

    let type_node = state.node("type_Person").unwrap();
    assert_eq!(type_node.kind, "type");
    assert_eq!(type_node.fact_keys, vec!["Person~p1"]);

    let terminal = state.node("terminal_adult").unwrap();
    assert_eq!(terminal.kind, "terminal");
    assert_eq!(terminal.token_count, 1);
}

#[test]
fn tree_printer_renders_sides_and_counts() {
    let program = Program::new()
        .with_type(person_type())
        .with_rule(adult_rule());
    let (network, _) = build_network(&program, &["adult"]);
    network.submit_fact(person("p1", 25)).unwrap();

    let tree = network.print_tree();
    assert!(tree.starts_with("root [root]"));
    assert!(tree.contains("[R] type_Person [type] facts: 1"));
    assert!(tree.contains("[R] alpha_0 [alpha] facts: 1"));
    assert!(tree.contains("[L] terminal_adult [terminal]"));
}

#[test]
fn terminal_stats_count_failures() {
    let program = Program::new()
        .with_type(person_type())
        .with_rule(adult_rule());
    // No handler registered: every firing fails but still counts.
    let network = Network::build(
        &program,
        Arc::new(InMemoryStore::new()),
        Dispatcher::new(),
    )
    .unwrap();

    assert!(network.submit_fact(person("p1", 25)).is_err());
    assert!(network.submit_fact(person("p2", 15)).is_ok());

    let stats = network.terminal_stats("adult").unwrap();
    assert_eq!(stats.firings, 1);
    assert_eq!(stats.failures, 1);
    assert!(stats.last_error.as_deref().unwrap().contains("adult"));
}

#[test]
fn checkpoint_survives_a_store_swap() {
    let program = Program::new()
        .with_type(person_type())
        .with_rule(adult_rule());
    let store: Arc<InMemoryStore> = Arc::new(InMemoryStore::new());

    let dispatcher = Dispatcher::new();
    dispatcher.register_handler("adult", Arc::new(|_: &[Value]| -> Result<()> { Ok(()) }));
    let network = Network::build(&program, store.clone(), dispatcher).unwrap();

    network.submit_fact(person("p1", 25)).unwrap();
    network.checkpoint().unwrap();

    // A second network over the same backing store picks the state up.
    let dispatcher = Dispatcher::new();
    dispatcher.register_handler("adult", Arc::new(|_: &[Value]| -> Result<()> { Ok(()) }));
    let replica = Network::build(&program, store.clone(), dispatcher).unwrap();
    replica.restore().unwrap();

    let state = replica.network_state();
    assert_eq!(
        state.node("type_Person").unwrap().fact_keys,
        vec!["Person~p1"]
    );
    assert_eq!(state.node("terminal_adult").unwrap().token_count, 1);
}

#[test]
fn delete_memory_forgets_a_node() {
    let program = Program::new()
        .with_type(person_type())
        .with_rule(adult_rule());
    let store: Arc<InMemoryStore> = Arc::new(InMemoryStore::new());

    let dispatcher = Dispatcher::new();
    dispatcher.register_handler("adult", Arc::new(|_: &[Value]| -> Result<()> { Ok(()) }));
    let network = Network::build(&program, store.clone(), dispatcher).unwrap();

    network.submit_fact(person("p1", 25)).unwrap();
    network.checkpoint().unwrap();
    assert_eq!(store.list_nodes().unwrap().len(), network.node_count());

    store.delete_memory("type_Person").unwrap();
    assert_eq!(
        store.list_nodes().unwrap().len(),
        network.node_count() - 1
    );
    assert!(store.load_memory("type_Person").unwrap().is_none());
}
