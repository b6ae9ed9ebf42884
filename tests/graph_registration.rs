use assetflow::dag::Task;
use assetflow::errors::AssetflowError;
use assetflow::types::CompositeMode;
use assetflow_test_utils::builders::GraphBuilder;

#[test]
fn composite_with_unknown_child_is_rejected() {
    let mut graph = GraphBuilder::new().leaf("a").build();

    let err = graph
        .register_composite("all", CompositeMode::Series, &["a", "missing"])
        .unwrap_err();

    assert!(matches!(err, AssetflowError::UnknownTaskError(ref msg) if msg.contains("missing")));
    assert!(!graph.contains("all"));
}

#[test]
fn composite_listing_itself_is_a_cycle() {
    let mut graph = GraphBuilder::new().leaf("a").build();

    let err = graph
        .register_composite("loop", CompositeMode::Parallel, &["a", "loop"])
        .unwrap_err();

    assert!(matches!(err, AssetflowError::CycleError(_)));
    assert!(!graph.contains("loop"));
}

#[test]
fn transitive_cycle_on_reregistration_leaves_graph_unchanged() {
    let mut graph = GraphBuilder::new()
        .leaf("a")
        .series("b", &["a"])
        .series("c", &["b"])
        .build();

    // a -> c -> b -> a
    let err = graph
        .register_composite("a", CompositeMode::Series, &["c"])
        .unwrap_err();

    assert!(matches!(err, AssetflowError::CycleError(_)), "got {err:?}");
    assert!(matches!(graph.get("a"), Some(Task::Primitive(_))));
    assert_eq!(graph.get("c").unwrap().children(), ["b".to_string()]);
}

#[test]
fn cycle_is_reported_before_unknown_children() {
    let mut graph = GraphBuilder::new().leaf("a").series("b", &["a"]).build();

    let err = graph
        .register_composite("a", CompositeMode::Series, &["b", "nowhere"])
        .unwrap_err();

    assert!(matches!(err, AssetflowError::CycleError(_)), "got {err:?}");
}

#[test]
fn reregistering_replaces_the_definition() {
    let mut graph = GraphBuilder::new()
        .leaf("a")
        .leaf("b")
        .series("all", &["a"])
        .build();

    graph
        .register_composite("all", CompositeMode::Parallel, &["a", "b"])
        .unwrap();

    match graph.get("all") {
        Some(Task::Composite(c)) => {
            assert_eq!(c.mode, CompositeMode::Parallel);
            assert_eq!(c.children, vec!["a".to_string(), "b".to_string()]);
        }
        other => panic!("expected composite, got {other:?}"),
    }
}

#[test]
fn leaves_of_lists_each_primitive_once() {
    let graph = GraphBuilder::new()
        .leaf("shared")
        .leaf("x")
        .leaf("y")
        .series("left", &["shared", "x"])
        .parallel("right", &["shared", "y"])
        .series("top", &["left", "right"])
        .build();

    let leaves: Vec<String> = graph.leaves_of("top").unwrap().into_iter().collect();
    assert_eq!(leaves, vec!["shared", "x", "y"]);
}
