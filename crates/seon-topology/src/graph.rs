//! Cycle detection over small dependency graphs.
//!
//! Shared by the mesh backend graph and the per-task container dependency
//! graph. Traversal order is the caller's node declaration order, so the
//! first cycle reported is deterministic for a given configuration.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    New,
    Active,
    Done,
}

/// Find a cycle in the directed graph described by `nodes` and `edges`.
///
/// Returns the participating chain, starting and ending at the same node
/// (e.g. `[a, b, a]`), or `None` when the graph is acyclic. Edges to keys
/// absent from `nodes` are followed; callers validate reference existence
/// separately.
pub fn find_cycle<K: Ord + Clone>(nodes: &[K], edges: &BTreeMap<K, Vec<K>>) -> Option<Vec<K>> {
    let mut marks: BTreeMap<&K, Mark> = BTreeMap::new();

    for start in nodes {
        if marks.get(start).copied().unwrap_or(Mark::New) != Mark::New {
            continue;
        }

        // Iterative DFS; the stack of Active nodes is the current path.
        let mut stack: Vec<(&K, usize)> = vec![(start, 0)];
        marks.insert(start, Mark::Active);

        while let Some(&(node, next)) = stack.last() {
            let children = edges.get(node).map(Vec::as_slice).unwrap_or(&[]);
            if next < children.len() {
                stack.last_mut().unwrap().1 += 1;
                let child = &children[next];
                match marks.get(child).copied().unwrap_or(Mark::New) {
                    Mark::Active => {
                        let from = stack
                            .iter()
                            .position(|(n, _)| *n == child)
                            .expect("active node must be on the path");
                        let mut chain: Vec<K> =
                            stack[from..].iter().map(|(n, _)| (*n).clone()).collect();
                        chain.push(child.clone());
                        return Some(chain);
                    }
                    Mark::New => {
                        marks.insert(child, Mark::Active);
                        stack.push((child, 0));
                    }
                    Mark::Done => {}
                }
            } else {
                marks.insert(node, Mark::Done);
                stack.pop();
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn edges(pairs: &[(&str, &str)]) -> BTreeMap<String, Vec<String>> {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (from, to) in pairs {
            map.entry(from.to_string()).or_default().push(to.to_string());
        }
        map
    }

    #[test]
    fn acyclic_graph_has_no_cycle() {
        let nodes: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let edges = edges(&[("a", "b"), ("a", "c"), ("b", "c")]);
        assert_eq!(find_cycle(&nodes, &edges), None);
    }

    #[test]
    fn two_node_cycle_reports_full_chain() {
        let nodes: Vec<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        let edges = edges(&[("a", "b"), ("b", "a")]);
        assert_eq!(
            find_cycle(&nodes, &edges),
            Some(vec!["a".to_string(), "b".to_string(), "a".to_string()])
        );
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let nodes = vec!["a".to_string()];
        let edges = edges(&[("a", "a")]);
        assert_eq!(
            find_cycle(&nodes, &edges),
            Some(vec!["a".to_string(), "a".to_string()])
        );
    }

    #[test]
    fn cycle_chain_starts_and_ends_at_same_node() {
        let nodes: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let edges = edges(&[("a", "b"), ("b", "c"), ("c", "d"), ("d", "b")]);
        let chain = find_cycle(&nodes, &edges).unwrap();
        assert_eq!(chain.first(), chain.last());
        assert!(chain.len() >= 3);
    }

    // Forward-only edge sets are acyclic by construction; closing any one
    // edge backwards must produce a detectable cycle.
    proptest! {
        #[test]
        fn forward_edges_never_cycle(adjacency in prop::collection::vec(prop::collection::vec(any::<bool>(), 8), 8)) {
            let nodes: Vec<usize> = (0..8).collect();
            let mut edges: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
            for (i, row) in adjacency.iter().enumerate() {
                for (j, &present) in row.iter().enumerate() {
                    if present && j > i {
                        edges.entry(i).or_default().push(j);
                    }
                }
            }
            prop_assert_eq!(find_cycle(&nodes, &edges), None);
        }

        #[test]
        fn reversed_edge_closes_a_loop(
            adjacency in prop::collection::vec(prop::collection::vec(any::<bool>(), 8), 8),
            from in 0usize..7,
            len in 1usize..7,
        ) {
            let to = (from + len).min(7);
            prop_assume!(to > from);

            let nodes: Vec<usize> = (0..8).collect();
            let mut edges: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
            for (i, row) in adjacency.iter().enumerate() {
                for (j, &present) in row.iter().enumerate() {
                    if present && j > i {
                        edges.entry(i).or_default().push(j);
                    }
                }
            }
            // Force the forward edge, then close the loop backwards.
            edges.entry(from).or_default().push(to);
            edges.entry(to).or_default().push(from);

            let chain = find_cycle(&nodes, &edges);
            prop_assert!(chain.is_some());
            let chain = chain.unwrap();
            prop_assert_eq!(chain.first(), chain.last());
        }
    }
}
