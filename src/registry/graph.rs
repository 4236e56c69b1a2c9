//! # Dependency-graph cycle detection.
//!
//! Depth-first visit with a "visiting" marker over the declared dependency
//! edges. Dependencies on ids absent from the map (forward declarations) are
//! treated as leaves. Iteration order is deterministic (`BTreeMap`/`BTreeSet`),
//! so the reported cycle path is stable across runs.

use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Visiting,
    Done,
}

/// Returns the first dependency cycle found, as the path of unit ids closing
/// back on its first element (`[a, b, c, a]`), or `None` for an acyclic graph.
pub(crate) fn find_cycle(edges: &BTreeMap<String, BTreeSet<String>>) -> Option<Vec<String>> {
    let mut marks: HashMap<&str, Mark> = HashMap::with_capacity(edges.len());
    let mut path: Vec<&str> = Vec::new();

    for start in edges.keys() {
        if let Some(cycle) = visit(start, edges, &mut marks, &mut path) {
            return Some(cycle);
        }
    }
    None
}

fn visit<'a>(
    node: &'a str,
    edges: &'a BTreeMap<String, BTreeSet<String>>,
    marks: &mut HashMap<&'a str, Mark>,
    path: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    match marks.get(node) {
        Some(Mark::Done) => return None,
        Some(Mark::Visiting) => {
            // Close the cycle at the first occurrence of `node` on the path.
            let from = path.iter().position(|n| *n == node).unwrap_or(0);
            let mut cycle: Vec<String> = path[from..].iter().map(|n| n.to_string()).collect();
            cycle.push(node.to_string());
            return Some(cycle);
        }
        None => {}
    }

    marks.insert(node, Mark::Visiting);
    path.push(node);

    if let Some(deps) = edges.get(node) {
        for dep in deps {
            if let Some(cycle) = visit(dep, edges, marks, path) {
                return Some(cycle);
            }
        }
    }

    path.pop();
    marks.insert(node, Mark::Done);
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(pairs: &[(&str, &[&str])]) -> BTreeMap<String, BTreeSet<String>> {
        pairs
            .iter()
            .map(|(id, deps)| {
                (
                    id.to_string(),
                    deps.iter().map(|d| d.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn acyclic_graph_passes() {
        let g = graph(&[("a", &[]), ("b", &["a"]), ("c", &["a", "b"])]);
        assert!(find_cycle(&g).is_none());
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let g = graph(&[("a", &["a"])]);
        assert_eq!(find_cycle(&g), Some(vec!["a".into(), "a".into()]));
    }

    #[test]
    fn three_cycle_names_all_ids() {
        let g = graph(&[("a", &["b"]), ("b", &["c"]), ("c", &["a"])]);
        let cycle = find_cycle(&g).unwrap();
        assert_eq!(cycle.first(), cycle.last());
        for id in ["a", "b", "c"] {
            assert!(cycle.iter().any(|n| n == id), "missing {id} in {cycle:?}");
        }
    }

    #[test]
    fn unknown_dependencies_are_leaves() {
        let g = graph(&[("a", &["ghost"])]);
        assert!(find_cycle(&g).is_none());
    }
}
