mod common;

use pretty_assertions::assert_eq;
use treevm::{BuildError, Builder, GraphConfig, RunError, ScopeError, SpecNode, Value, build};

use common::{Boom, numbers, registry};

fn under(kind: &str, limit: i32) -> SpecNode {
    SpecNode::leaf(kind).with_state(SpecNode::value(limit))
}

#[test]
fn constant_flows_into_stateful_leaf() {
    let (registry, _) = registry();
    let spec = SpecNode::component(
        vec![SpecNode::value(3)],
        vec![SpecNode::leaf("add").with_state(SpecNode::value(4))],
    );

    let graph = build(&registry, &spec).unwrap();

    assert_eq!(graph.outputs(), numbers(&[7.0]).as_slice());
}

#[test]
fn every_producer_reaches_every_consumer() {
    let (registry, _) = registry();
    let spec = SpecNode::component(
        vec![SpecNode::value(1), SpecNode::value(2)],
        vec![SpecNode::leaf("get"), SpecNode::leaf("get")],
    );

    let graph = build(&registry, &spec).unwrap();

    // Producers in order, each fanned out to the consumers in order
    assert_eq!(graph.outputs(), numbers(&[1.0, 1.0, 2.0, 2.0]).as_slice());
}

#[test]
fn pushed_value_reaches_each_consumer_input_once_in_order() {
    let (registry, _) = registry();
    let spec = SpecNode::component(
        vec![SpecNode::leaf("get")],
        vec![
            SpecNode::leaf("add").with_state(SpecNode::value(1)),
            SpecNode::leaf("add").with_state(SpecNode::value(2)),
        ],
    );
    let mut graph = build(&registry, &spec).unwrap();
    let consumers = graph.find("add");
    assert_eq!(graph.input_of(consumers[0]), None);

    graph.push(5).unwrap();

    for consumer in &consumers {
        assert_eq!(graph.input_of(*consumer), Some(&Value::from(5)));
    }
    // One emission per consumer, first declared first
    assert_eq!(graph.outputs(), numbers(&[6.0, 7.0]).as_slice());
}

#[test]
fn pushed_value_propagates_synchronously() {
    let (registry, _) = registry();
    let spec = SpecNode::component(vec![SpecNode::leaf("get")], vec![SpecNode::leaf("get")]);
    let mut graph = build(&registry, &spec).unwrap();

    graph.push(5).unwrap();

    assert_eq!(graph.outputs(), numbers(&[5.0]).as_slice());
    assert!(!graph.has_pending_work());
}

#[test]
fn broadcast_reaches_a_sibling_subtree_on_a_later_tick() {
    let (registry, _) = registry();
    let sender = SpecNode::component(
        vec![SpecNode::leaf("get")],
        vec![SpecNode::broadcast("clicks")],
    );
    let spec = SpecNode::component(
        vec![sender, SpecNode::listener("clicks")],
        vec![SpecNode::leaf("get")],
    );
    let mut graph = build(&registry, &spec).unwrap();

    graph.push(9).unwrap();
    assert!(graph.outputs().is_empty());

    assert_eq!(graph.run_tick().unwrap(), 1);
    assert_eq!(graph.outputs(), numbers(&[9.0]).as_slice());
}

#[test]
fn listener_may_precede_its_broadcast() {
    let (registry, _) = registry();
    let sender = SpecNode::component(
        vec![SpecNode::leaf("get")],
        vec![SpecNode::broadcast("clicks")],
    );
    let spec = SpecNode::component(
        vec![SpecNode::listener("clicks"), sender],
        vec![SpecNode::leaf("get")],
    );
    let mut graph = build(&registry, &spec).unwrap();

    graph.push(1).unwrap();
    graph.push(2).unwrap();
    graph.run_until_idle().unwrap();

    assert_eq!(graph.outputs(), numbers(&[1.0, 2.0]).as_slice());
}

#[test]
fn duplicate_broadcast_key_fails_the_build() {
    let (registry, _) = registry();
    let left = SpecNode::component(vec![], vec![SpecNode::broadcast("k")]);
    let right = SpecNode::component(vec![], vec![SpecNode::broadcast("k")]);
    let spec = SpecNode::component(vec![left, right], vec![]);

    let err = build(&registry, &spec).unwrap_err();
    assert!(matches!(
        err,
        BuildError::Scope(ScopeError::DuplicateKey(key)) if key == "k"
    ));
}

#[test]
fn unknown_listener_key_fails_the_build() {
    let (registry, _) = registry();
    let spec = SpecNode::component(vec![SpecNode::listener("nobody")], vec![]);

    let err = build(&registry, &spec).unwrap_err();
    assert!(matches!(
        err,
        BuildError::Scope(ScopeError::UnknownKey(key)) if key == "nobody"
    ));
}

#[test]
fn gate_stops_at_the_first_failing_condition() {
    let (registry, calls) = registry();
    let spec = SpecNode::gate(
        vec![under("first", 10), under("second", 5), under("third", 100)],
        SpecNode::leaf("get"),
    );
    let mut graph = build(&registry, &spec).unwrap();
    let counts = || (calls.first.get(), calls.second.get(), calls.third.get());

    // true, false: third is never asked
    graph.push(7).unwrap();
    assert_eq!(counts(), (1, 1, 0));
    assert!(graph.outputs().is_empty());

    // first fails: nothing after it runs
    graph.push(12).unwrap();
    assert_eq!(counts(), (2, 1, 0));

    graph.push(3).unwrap();
    assert_eq!(counts(), (3, 2, 1));
    assert_eq!(graph.outputs(), numbers(&[3.0]).as_slice());
}

#[test]
fn gate_without_conditions_always_passes() {
    let (registry, _) = registry();
    let spec = SpecNode::gate(vec![], SpecNode::leaf("get"));
    let mut graph = build(&registry, &spec).unwrap();

    graph.push(1).unwrap();
    assert_eq!(graph.outputs(), numbers(&[1.0]).as_slice());
}

#[test]
fn switch_routes_each_input_to_exactly_one_branch() {
    let (registry, _) = registry();
    let spec = SpecNode::switch(
        vec![under("first", 10)],
        SpecNode::leaf("get"),
        SpecNode::leaf("add").with_state(SpecNode::value(100)),
    );
    let mut graph = build(&registry, &spec).unwrap();

    graph.push(3).unwrap();
    graph.push(20).unwrap();

    assert_eq!(graph.outputs(), numbers(&[3.0, 120.0]).as_slice());
}

#[test]
fn switch_takes_negative_branch_even_when_conditions_were_skipped() {
    let (registry, calls) = registry();
    let spec = SpecNode::switch(
        vec![under("first", 10), under("second", 5), under("third", 100)],
        SpecNode::leaf("get"),
        SpecNode::leaf("add").with_state(SpecNode::value(1000)),
    );
    let mut graph = build(&registry, &spec).unwrap();

    graph.push(7).unwrap();
    graph.push(12).unwrap();

    // Only the negative branch ever fired, once per push
    assert_eq!(graph.outputs(), numbers(&[1007.0, 1012.0]).as_slice());
    assert_eq!(
        (calls.first.get(), calls.second.get(), calls.third.get()),
        (2, 1, 0)
    );
}

#[test]
fn constant_condition_must_be_boolean() {
    let (registry, _) = registry();
    let passing = SpecNode::gate(vec![SpecNode::value(true)], SpecNode::leaf("get"));
    let mut graph = build(&registry, &passing).unwrap();
    graph.push(1).unwrap();
    assert_eq!(graph.outputs(), numbers(&[1.0]).as_slice());

    // Rejected while building, before any input arrives
    let numeric = SpecNode::gate(vec![SpecNode::value(1)], SpecNode::leaf("get"));
    assert!(matches!(
        build(&registry, &numeric),
        Err(BuildError::WrongShape { kind, property, .. }) if kind == "value" && property == "value"
    ));
}

#[test]
fn condition_outside_a_gate_emits_its_answer() {
    let (registry, _) = registry();
    let spec = SpecNode::component(vec![SpecNode::leaf("get")], vec![under("first", 10)]);
    let mut graph = build(&registry, &spec).unwrap();

    graph.push(3).unwrap();
    graph.push(30).unwrap();

    assert_eq!(
        graph.outputs(),
        &[Value::Bool(true), Value::Bool(false)]
    );
}

#[test]
fn leaf_reads_the_state_current_at_run_time() {
    let (registry, _) = registry();
    let state = SpecNode::component(
        vec![SpecNode::value(5), SpecNode::listener("offset")],
        vec![SpecNode::leaf("get")],
    );
    let sender = SpecNode::component(
        vec![SpecNode::leaf("get")],
        vec![SpecNode::broadcast("offset")],
    );
    let spec = SpecNode::component(
        vec![SpecNode::leaf("get"), sender],
        vec![SpecNode::leaf("add").with_state(state)],
    );
    let mut graph = build(&registry, &spec).unwrap();
    let add = graph.find("add")[0];
    assert_eq!(graph.state_of(add), Some(&Value::from(5)));

    // The broadcast of 2 lands after this run has read state 5
    graph.push(2).unwrap();
    assert_eq!(graph.outputs(), numbers(&[7.0]).as_slice());

    graph.run_until_idle().unwrap();
    assert_eq!(graph.state_of(add), Some(&Value::from(2)));

    graph.push(2).unwrap();
    assert_eq!(graph.outputs(), numbers(&[7.0, 4.0]).as_slice());
}

#[test]
fn constants_fire_once_and_ignore_input() {
    let (registry, _) = registry();
    let spec = SpecNode::component(
        vec![SpecNode::value(1), SpecNode::leaf("get")],
        vec![SpecNode::leaf("get")],
    );
    let mut graph = build(&registry, &spec).unwrap();
    graph.settle().unwrap();
    assert_eq!(graph.outputs(), numbers(&[1.0]).as_slice());

    graph.push(4).unwrap();
    graph.settle().unwrap();
    assert_eq!(graph.outputs(), numbers(&[1.0, 4.0]).as_slice());
}

#[test]
fn late_tap_sees_only_later_values() {
    let (registry, _) = registry();
    let spec = SpecNode::component(
        vec![SpecNode::value(1), SpecNode::leaf("get")],
        vec![SpecNode::leaf("get")],
    );
    let mut graph = build(&registry, &spec).unwrap();
    // Consumers are allocated before producers
    let consumer = graph.find("get")[0];
    graph.take_outputs();

    assert!(graph.tap(consumer));
    graph.push(4).unwrap();

    assert_eq!(graph.outputs(), numbers(&[4.0, 4.0]).as_slice());
}

#[test]
fn unknown_kind_fails_the_build() {
    let (registry, _) = registry();
    let spec = SpecNode::component(vec![SpecNode::leaf("mystery")], vec![]);

    let err = build(&registry, &spec).unwrap_err();
    assert!(matches!(err, BuildError::UnknownKind(kind) if kind == "mystery"));
}

#[test]
fn unknown_kind_is_reported_before_anything_runs() {
    let (registry, _) = registry();
    // `fail` would error on activation if wiring were reached
    let spec = SpecNode::component(
        vec![SpecNode::value(1)],
        vec![SpecNode::leaf("fail"), SpecNode::leaf("mystery")],
    );

    assert!(matches!(
        build(&registry, &spec),
        Err(BuildError::UnknownKind(_))
    ));
}

#[test]
fn component_requires_both_lists() {
    let (registry, _) = registry();
    let spec = SpecNode::new("component").with("consumers", Vec::<SpecNode>::new());

    let err = build(&registry, &spec).unwrap_err();
    assert!(matches!(
        err,
        BuildError::MissingProperty { kind, property } if kind == "component" && property == "producers"
    ));
}

#[test]
fn process_leaf_cannot_be_a_condition() {
    let (registry, _) = registry();
    let spec = SpecNode::gate(vec![SpecNode::leaf("get")], SpecNode::leaf("get"));
    assert!(matches!(
        build(&registry, &spec),
        Err(BuildError::NotACondition(kind)) if kind == "get"
    ));

    let nested = SpecNode::gate(
        vec![SpecNode::component(vec![], vec![])],
        SpecNode::leaf("get"),
    );
    assert!(matches!(
        build(&registry, &nested),
        Err(BuildError::NotACondition(kind)) if kind == "component"
    ));
}

#[test]
fn broadcast_outside_consumers_is_misplaced() {
    let (registry, _) = registry();
    let spec = SpecNode::component(vec![SpecNode::broadcast("k")], vec![]);

    assert!(matches!(
        build(&registry, &spec),
        Err(BuildError::Misplaced { kind, .. }) if kind == "broadcast"
    ));
}

#[test]
fn leaf_errors_keep_their_source() {
    let (registry, _) = registry();
    let spec = SpecNode::component(vec![SpecNode::leaf("get")], vec![SpecNode::leaf("fail")]);
    let mut graph = build(&registry, &spec).unwrap();

    match graph.push(1) {
        Err(RunError::Leaf { kind, source }) => {
            assert_eq!(kind, "fail");
            assert!(source.downcast_ref::<Boom>().is_some());
        }
        other => panic!("expected a leaf error, got {other:?}"),
    }
}

#[test]
fn failing_activation_fails_the_build() {
    let (registry, _) = registry();
    let spec = SpecNode::component(vec![SpecNode::value(1)], vec![SpecNode::leaf("fail")]);

    assert!(matches!(
        build(&registry, &spec),
        Err(BuildError::Run(RunError::Leaf { kind, .. })) if kind == "fail"
    ));
}

#[test]
fn deep_nesting_hits_the_depth_limit() {
    let (registry, _) = registry();
    let mut spec = SpecNode::leaf("get");
    for _ in 0..32 {
        spec = SpecNode::component(vec![spec], vec![]);
    }
    let config = GraphConfig {
        max_depth: 16,
        ..GraphConfig::default()
    };
    let mut graph = Builder::new(&registry)
        .with_config(config)
        .build(&spec)
        .unwrap();

    assert!(matches!(graph.push(1), Err(RunError::DepthExceeded(16))));
}

#[test]
fn broadcast_feedback_loop_exhausts_the_tick_budget() {
    let (registry, _) = registry();
    let spec = SpecNode::component(
        vec![SpecNode::value(1), SpecNode::listener("loop")],
        vec![SpecNode::leaf("get"), SpecNode::broadcast("loop")],
    );
    let config = GraphConfig {
        max_ticks: 50,
        ..GraphConfig::default()
    };
    let mut graph = Builder::new(&registry)
        .with_config(config)
        .build(&spec)
        .unwrap();

    assert!(matches!(
        graph.settle(),
        Err(RunError::TickBudgetExhausted(50))
    ));
    assert!(graph.outputs().len() > 1);
}

#[test]
fn summary_counts_nodes_per_kind() {
    let (registry, _) = registry();
    let spec = SpecNode::component(
        vec![SpecNode::value(3)],
        vec![
            SpecNode::leaf("add").with_state(SpecNode::value(4)),
            SpecNode::broadcast("sum"),
        ],
    );
    let graph = build(&registry, &spec).unwrap();
    let summary = graph.summary();

    assert_eq!(summary.nodes, 4);
    assert_eq!(summary.kinds.get("value"), Some(&2));
    assert_eq!(summary.kinds.get("add"), Some(&1));
    assert_eq!(summary.kinds.get("component"), Some(&1));
    assert_eq!(summary.broadcast_keys, vec!["sum".to_string()]);
}

#[test]
fn teardown_releases_every_node() {
    let (registry, _) = registry();
    let spec = SpecNode::component(
        vec![SpecNode::value(3)],
        vec![SpecNode::leaf("add").with_state(SpecNode::value(4))],
    );
    let mut graph = build(&registry, &spec).unwrap();

    assert_eq!(graph.teardown(), 4);
    assert_eq!(graph.node_count(), 0);

    graph.push(1).unwrap();
    assert_eq!(graph.outputs(), numbers(&[7.0]).as_slice());
}

#[test]
fn traced_build_behaves_like_an_untraced_one() {
    let (registry, _) = registry();
    let spec = SpecNode::component(
        vec![SpecNode::value(3)],
        vec![SpecNode::leaf("add").with_state(SpecNode::value(4))],
    );
    let graph = Builder::new(&registry)
        .with_config(GraphConfig::default().with_trace(true))
        .build(&spec)
        .unwrap();

    assert!(graph.event_loop().tracer().is_enabled());
    assert_eq!(graph.outputs(), numbers(&[7.0]).as_slice());
}
