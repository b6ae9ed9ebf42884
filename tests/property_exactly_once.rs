use std::collections::BTreeSet;
use std::sync::Arc;

use assetflow::dag::TaskGraph;
use assetflow_test_utils::builders::{executor, GraphBuilder};
use assetflow_test_utils::recorders::RecordingNotifier;
use assetflow_test_utils::runner::InstrumentedRunner;
use proptest::prelude::*;

/// A random composite layer over `leaves` primitives.
///
/// Composite `i` may only reference leaves and composites `< i`, so the graph
/// is acyclic by construction. The last composite is the root.
fn graph_strategy() -> impl Strategy<Value = TaskGraph> {
    (1..6usize, 1..6usize).prop_flat_map(|(leaves, composites)| {
        let children = proptest::collection::vec(
            (any::<bool>(), proptest::collection::vec(any::<usize>(), 1..5)),
            composites,
        );
        children.prop_map(move |specs| {
            let mut builder = GraphBuilder::new();
            let mut names: Vec<String> = Vec::new();
            for i in 0..leaves {
                let name = format!("leaf_{i}");
                builder = builder.leaf(&name);
                names.push(name);
            }
            for (i, (parallel, picks)) in specs.into_iter().enumerate() {
                let mut kids: Vec<String> = picks
                    .into_iter()
                    .map(|p| names[p % names.len()].clone())
                    .collect();
                kids.dedup();
                let kids: Vec<&str> = kids.iter().map(String::as_str).collect();
                let name = format!("comp_{i}");
                builder = if parallel {
                    builder.parallel(&name, &kids)
                } else {
                    builder.series(&name, &kids)
                };
                names.push(name);
            }
            builder.series("root", &[names.last().unwrap().as_str()]).build()
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_reachable_leaf_runs_exactly_once(graph in graph_strategy()) {
        let expected = graph.leaves_of("root").unwrap();
        let runner = Arc::new(InstrumentedRunner::default());

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let exec = executor(graph, runner.clone(), Arc::new(RecordingNotifier::new()));
        rt.block_on(exec.run("root")).unwrap();

        let started = runner.started();
        let distinct: BTreeSet<String> = started.iter().cloned().collect();
        prop_assert_eq!(started.len(), distinct.len());
        prop_assert_eq!(distinct, expected);
    }
}
