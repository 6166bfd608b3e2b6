//! Property-based tests for graph resolution and planning.
//!
//! Random graphs are generated with edges only towards lower topological
//! ids (so they are acyclic), then declared in shuffled insertion order.
//! Cyclic graphs get one injected back-edge on top of such a graph.

#[cfg(test)]
mod proptest_tests {
    use crate::error::Error;
    use crate::graph::ResourceGraph;
    use crate::planner::plan;
    use crate::resource::Resource;
    use crate::types::{ResourceKind, Value};
    use proptest::prelude::*;
    use std::collections::{HashMap, HashSet};

    /// `deps[i]` lists the topological ids resource `i` references
    type Deps = Vec<Vec<usize>>;

    fn name(id: usize) -> String {
        format!("R{id}")
    }

    fn node(id: usize, deps: &[usize]) -> Resource {
        let refs = deps
            .iter()
            .map(|&d| Value::reference(name(d), "arn"))
            .collect();
        Resource::new(
            name(id),
            ResourceKind::Topic,
            [("display_name", Value::List(refs))],
        )
        .unwrap()
    }

    /// Declare every resource in `order`
    fn build_graph(deps: &Deps, order: &[usize]) -> ResourceGraph {
        let mut graph = ResourceGraph::new();
        for &id in order {
            graph.add(node(id, &deps[id])).unwrap();
        }
        graph
    }

    fn deps_by_name(deps: &Deps) -> HashMap<String, HashSet<String>> {
        deps.iter()
            .enumerate()
            .map(|(id, ds)| (name(id), ds.iter().map(|&d| name(d)).collect()))
            .collect()
    }

    /// Acyclic dependency lists plus a shuffled insertion order
    fn acyclic_graph() -> impl Strategy<Value = (Deps, Vec<usize>)> {
        (1usize..12)
            .prop_flat_map(|n| {
                (
                    prop::collection::vec(
                        prop::collection::vec(any::<prop::sample::Index>(), 0..4),
                        n,
                    ),
                    Just((0..n).collect::<Vec<usize>>()).prop_shuffle(),
                )
            })
            .prop_map(|(picks, order)| {
                let deps = picks
                    .iter()
                    .enumerate()
                    .map(|(id, picks)| {
                        if id == 0 {
                            return Vec::new();
                        }
                        let mut ds: Vec<usize> = picks.iter().map(|p| p.index(id)).collect();
                        ds.sort_unstable();
                        ds.dedup();
                        ds
                    })
                    .collect();
                (deps, order)
            })
    }

    /// An acyclic graph with a back-edge closing a loop between two ids
    fn cyclic_graph() -> impl Strategy<Value = (Deps, Vec<usize>)> {
        acyclic_graph()
            .prop_flat_map(|(deps, order)| {
                let n = deps.len();
                (Just(deps), Just(order), 0..n, 0..n)
            })
            .prop_map(|(mut deps, order, a, b)| {
                let (lo, hi) = (a.min(b), a.max(b));
                if !deps[hi].contains(&lo) {
                    deps[hi].push(lo);
                }
                if !deps[lo].contains(&hi) {
                    deps[lo].push(hi);
                }
                (deps, order)
            })
    }

    proptest! {
        /// Property: every resource is planned after all resources it references
        #[test]
        fn plan_is_dependency_first((deps, order) in acyclic_graph()) {
            let mut graph = build_graph(&deps, &order);
            let plan = plan(&mut graph).unwrap();
            prop_assert_eq!(plan.len(), deps.len());

            let expected = deps_by_name(&deps);
            let mut planned: HashSet<&str> = HashSet::new();
            for step in &plan.steps {
                for dep in &expected[&step.name] {
                    prop_assert!(
                        planned.contains(dep.as_str()),
                        "'{}' planned before its dependency '{}'",
                        step.name,
                        dep
                    );
                }
                let listed: HashSet<String> = step.depends_on.iter().cloned().collect();
                prop_assert_eq!(&listed, &expected[&step.name]);
                planned.insert(step.name.as_str());
            }
        }

        /// Property: planning the same graph twice gives the same plan
        #[test]
        fn replan_is_identical((deps, order) in acyclic_graph()) {
            let mut graph = build_graph(&deps, &order);
            let first = plan(&mut graph).unwrap();
            let second = plan(&mut graph).unwrap();
            prop_assert_eq!(first, second);
        }

        /// Property: the next planned resource is always the earliest-declared
        /// one whose dependencies are all planned
        #[test]
        fn plan_keeps_insertion_order((deps, order) in acyclic_graph()) {
            let mut graph = build_graph(&deps, &order);
            let plan = plan(&mut graph).unwrap();

            let mut planned: HashSet<usize> = HashSet::new();
            for step in &plan.steps {
                let next = order
                    .iter()
                    .copied()
                    .find(|id| !planned.contains(id) && deps[*id].iter().all(|d| planned.contains(d)));
                prop_assert_eq!(next.map(name), Some(step.name.clone()));
                if let Some(id) = next {
                    planned.insert(id);
                }
            }
        }

        /// Property: a level is one more than the deepest dependency level
        #[test]
        fn levels_follow_dependencies((deps, order) in acyclic_graph()) {
            let mut graph = build_graph(&deps, &order);
            let plan = plan(&mut graph).unwrap();

            let levels: HashMap<&str, usize> =
                plan.steps.iter().map(|s| (s.name.as_str(), s.level)).collect();
            for step in &plan.steps {
                let expected = step
                    .depends_on
                    .iter()
                    .map(|d| levels[d.as_str()] + 1)
                    .max()
                    .unwrap_or(0);
                prop_assert_eq!(step.level, expected);
            }
        }

        /// Property: any cycle fails both resolution and planning, and the
        /// reported path follows real edges back to its start
        #[test]
        fn cycles_are_always_rejected((deps, order) in cyclic_graph()) {
            let expected = deps_by_name(&deps);
            let mut graph = build_graph(&deps, &order);

            match graph.resolve_references() {
                Err(Error::CyclicDependency { cycle }) => {
                    prop_assert!(cycle.len() >= 2);
                    prop_assert_eq!(cycle.first(), cycle.last());
                    for pair in cycle.windows(2) {
                        prop_assert!(
                            expected[&pair[0]].contains(&pair[1]),
                            "'{}' does not reference '{}'",
                            pair[0],
                            pair[1]
                        );
                    }
                }
                other => prop_assert!(false, "expected a cycle, got {:?}", other),
            }
            prop_assert!(!graph.is_resolved());

            let planned = plan(&mut graph);
            prop_assert!(
                matches!(planned, Err(Error::CyclicDependency { .. })),
                "expected a cycle, got {:?}",
                planned
            );
        }
    }
}
