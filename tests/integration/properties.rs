//! Property tests for the engine's core guarantees.

use std::sync::Arc;

use proptest::prelude::*;

use weft_engine::{
    BinaryOp, Dispatcher, Expr, Network, Program, RecordingObserver, RuleDef, TypeDef,
};
use weft_foundation::{Result, Type, Value};
use weft_storage::{Fact, InMemoryStore};

fn owner_program() -> Program {
    Program::new()
        .with_type(
            TypeDef::new("Person")
                .with_field("id", Type::String)
                .with_field("age", Type::Number)
                .with_key("id"),
        )
        .with_type(
            TypeDef::new("Order")
                .with_field("id", Type::String)
                .with_field("owner", Type::String)
                .with_key("id"),
        )
        .with_rule(
            RuleDef::new("owner")
                .bind("p", "Person")
                .bind("o", "Order")
                .when(Expr::and(
                    Expr::binary(BinaryOp::Ge, Expr::field("p", "age"), Expr::lit(18)),
                    Expr::binary(
                        BinaryOp::Eq,
                        Expr::field("o", "owner"),
                        Expr::field("p", "id"),
                    ),
                ))
                .invoke("pair", vec![Expr::field("p", "id"), Expr::field("o", "id")]),
        )
}

fn build() -> (Network, Arc<RecordingObserver>) {
    let dispatcher = Dispatcher::new();
    dispatcher.register_handler("pair", Arc::new(|_: &[Value]| -> Result<()> { Ok(()) }));
    let observer = Arc::new(RecordingObserver::new());
    dispatcher.register_observer(observer.clone());
    let network =
        Network::build(&owner_program(), Arc::new(InMemoryStore::new()), dispatcher).unwrap();
    (network, observer)
}

fn person(i: usize, age: i64) -> Fact {
    Fact::new("Person")
        .with_field("id", format!("p{i}"))
        .with_field("age", age)
}

fn order(i: usize, owner: usize) -> Fact {
    Fact::new("Order")
        .with_field("id", format!("o{i}"))
        .with_field("owner", format!("p{owner}"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Incrementality: for any submission sequence, the terminal matches
    /// equal the from-scratch full join over all submitted facts.
    #[test]
    fn incremental_matches_equal_full_join(
        ages in proptest::collection::vec(0i64..40, 1..5),
        owners in proptest::collection::vec(0usize..5, 1..5),
        seed in 0usize..24,
    ) {
        let mut facts: Vec<Fact> = Vec::new();
        for (i, &age) in ages.iter().enumerate() {
            facts.push(person(i, age));
        }
        for (i, &owner) in owners.iter().enumerate() {
            facts.push(order(i, owner));
        }
        // A deterministic permutation derived from the seed.
        let len = facts.len();
        facts.rotate_left(seed % len);
        if seed % 2 == 1 {
            facts.reverse();
        }

        let (network, observer) = build();
        for fact in facts {
            network.submit_fact(fact).unwrap();
        }

        // Reference semantics: the full cross join over submitted facts.
        let mut expected: Vec<(String, String)> = Vec::new();
        for (p, &age) in ages.iter().enumerate() {
            for (o, &owner) in owners.iter().enumerate() {
                if age >= 18 && owner == p {
                    expected.push((format!("p{p}"), format!("o{o}")));
                }
            }
        }
        expected.sort();

        let mut actual: Vec<(String, String)> = observer
            .firings()
            .iter()
            .map(|f| {
                (
                    f.args[0].as_str().unwrap().to_string(),
                    f.args[1].as_str().unwrap().to_string(),
                )
            })
            .collect();
        actual.sort();

        prop_assert_eq!(actual, expected);
    }

    /// Retraction completeness: submitting then retracting a fact
    /// restores every node's memory, for join rules too.
    #[test]
    fn retraction_restores_state(
        ages in proptest::collection::vec(0i64..40, 1..4),
        extra_age in 0i64..40,
    ) {
        let (network, _) = build();
        for (i, &age) in ages.iter().enumerate() {
            network.submit_fact(person(i, age)).unwrap();
        }
        network.submit_fact(order(0, 0)).unwrap();

        let fingerprint = |network: &Network| -> Vec<(String, Vec<String>, usize)> {
            network
                .network_state()
                .nodes
                .iter()
                .map(|n| (n.label.clone(), n.fact_keys.clone(), n.token_count))
                .collect()
        };
        let before = fingerprint(&network);

        network.submit_fact(person(99, extra_age)).unwrap();
        network.submit_fact(order(99, 99)).unwrap();
        network.retract_fact("Order~o99").unwrap();
        network.retract_fact("Person~p99").unwrap();

        prop_assert_eq!(fingerprint(&network), before);
    }
}
