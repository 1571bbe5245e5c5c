// tests/scheduler_property.rs

use proptest::prelude::*;

use orchdag::graph::Scheduler;
use orchdag::types::{EdgeCondition, Role, Track};
use orchdag::TrackTemplate;
use orchdag_test_utils::builders::{instantiate, NodeBuilder, TemplateBuilder};

// Strategy to generate a valid DAG template.
// Acyclicity is guaranteed by construction: node N may only depend on
// nodes 0..N-1.
fn dag_template_strategy(max_nodes: usize) -> impl Strategy<Value = TrackTemplate> {
    (1..=max_nodes).prop_flat_map(|num_nodes| {
        let deps_strat = proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_nodes),
            num_nodes,
        );

        deps_strat.prop_map(move |raw_deps| {
            let mut builder = TemplateBuilder::new(Track::Direct);
            let mut edges: Vec<(usize, usize)> = Vec::new();

            for (i, potential_deps) in raw_deps.into_iter().enumerate() {
                builder = builder
                    .with_node(NodeBuilder::new(&format!("node_{i}"), Role::Scout).build());

                // Sanitize dependencies: only allow deps < i, at most one
                // edge per (dep, node) pair.
                let mut seen = std::collections::HashSet::new();
                for dep_idx in potential_deps {
                    if i > 0 {
                        let dep = dep_idx % i;
                        if seen.insert(dep) {
                            edges.push((dep, i));
                        }
                    }
                }
            }

            for (from, to) in edges {
                builder = builder.with_edge(
                    &format!("node_{from}"),
                    &format!("node_{to}"),
                    EdgeCondition::OnSuccess,
                );
            }

            builder.build()
        })
    })
}

proptest! {
    #[test]
    fn topological_order_is_a_permutation_consistent_with_every_edge(
        template in dag_template_strategy(12),
    ) {
        let scheduler = Scheduler::new("templates");
        let graph = instantiate(&template, "property run");

        let order = scheduler
            .topological_order(&graph)
            .expect("generated templates are acyclic");

        // Permutation: every node exactly once.
        prop_assert_eq!(order.len(), graph.nodes.len());
        let mut sorted = order.clone();
        sorted.sort();
        sorted.dedup();
        prop_assert_eq!(sorted.len(), order.len());

        // Consistency: every edge points forward in the order.
        for edge in &graph.edges {
            let from_pos = order.iter().position(|id| id == &edge.from).expect("from in order");
            let to_pos = order.iter().position(|id| id == &edge.to).expect("to in order");
            prop_assert!(
                from_pos < to_pos,
                "edge {} -> {} violated by order {:?}",
                edge.from,
                edge.to,
                order
            );
        }
    }

    #[test]
    fn ready_nodes_are_always_pending_roots_or_satisfied(
        template in dag_template_strategy(10),
    ) {
        let scheduler = Scheduler::new("templates");
        let graph = instantiate(&template, "readiness property");

        // On a fresh instance, the ready set is exactly the set of nodes
        // with no incoming edges.
        let ready: std::collections::HashSet<String> = scheduler
            .ready_nodes(&graph)
            .iter()
            .map(|n| n.id.clone())
            .collect();

        for node in &graph.nodes {
            let has_incoming = graph.edges.iter().any(|e| e.to == node.id);
            prop_assert_eq!(ready.contains(&node.id), !has_incoming);
        }
    }
}
