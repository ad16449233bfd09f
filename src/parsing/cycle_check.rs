//! Cycle detection over the relation graph induced by a document.
//!
//! Strongly connected components are found with an iterative Tarjan walk, so
//! deep documents cannot overflow the stack. A vertex is cyclic when its
//! component has more than one member or it carries a self-loop.

use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Vertices that participate in at least one cycle, sorted
pub fn find_cycles<'a>(edges: impl IntoIterator<Item = (&'a str, &'a str)>) -> Vec<String> {
    let mut ids: BTreeMap<&'a str, usize> = BTreeMap::new();
    let mut names: Vec<&'a str> = Vec::new();
    let mut adjacency: Vec<Vec<usize>> = Vec::new();
    let mut self_loops: Vec<bool> = Vec::new();

    let mut vertex = |name: &'a str, adjacency: &mut Vec<Vec<usize>>, self_loops: &mut Vec<bool>| -> usize {
        *ids.entry(name).or_insert_with(|| {
            names.push(name);
            adjacency.push(Vec::new());
            self_loops.push(false);
            names.len() - 1
        })
    };
    for (from, to) in edges {
        let f = vertex(from, &mut adjacency, &mut self_loops);
        let t = vertex(to, &mut adjacency, &mut self_loops);
        if f == t {
            self_loops[f] = true;
        }
        adjacency[f].push(t);
    }

    let n = adjacency.len();
    let mut index: Vec<Option<usize>> = vec![None; n];
    let mut low: Vec<usize> = vec![0; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut next = 0;
    let mut cyclic: Vec<String> = Vec::new();

    for root in 0..n {
        if index[root].is_some() {
            continue;
        }
        index[root] = Some(next);
        low[root] = next;
        next += 1;
        stack.push(root);
        on_stack[root] = true;
        let mut calls: Vec<(usize, usize)> = vec![(root, 0)];

        while let Some(frame) = calls.last_mut() {
            let v = frame.0;
            if frame.1 < adjacency[v].len() {
                let w = adjacency[v][frame.1];
                frame.1 += 1;
                match index[w] {
                    None => {
                        index[w] = Some(next);
                        low[w] = next;
                        next += 1;
                        stack.push(w);
                        on_stack[w] = true;
                        calls.push((w, 0));
                    }
                    Some(iw) if on_stack[w] => low[v] = low[v].min(iw),
                    Some(_) => {}
                }
                continue;
            }

            calls.pop();
            if let Some(&(parent, _)) = calls.last() {
                low[parent] = low[parent].min(low[v]);
            }
            if Some(low[v]) == index[v] {
                let mut component = Vec::new();
                while let Some(w) = stack.pop() {
                    on_stack[w] = false;
                    component.push(w);
                    if w == v {
                        break;
                    }
                }
                if component.len() > 1 || self_loops[v] {
                    cyclic.extend(component.into_iter().map(|w| names[w].to_string()));
                }
            }
        }
    }

    cyclic.sort();
    cyclic
}

/// `CyclicDocument` naming every cyclic vertex, if there is any
pub fn ensure_acyclic<'a>(edges: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<()> {
    let cyclic = find_cycles(edges);
    if cyclic.is_empty() {
        Ok(())
    } else {
        Err(Error::CyclicDocument(cyclic))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_cycle() {
        assert_eq!(find_cycles([("A", "B"), ("B", "A")]), vec!["A", "B"]);
    }

    #[test]
    fn test_dag_has_no_cycles() {
        let edges = [("a", "b"), ("b", "c"), ("a", "c"), ("d", "c")];
        assert!(find_cycles(edges).is_empty());
        assert!(ensure_acyclic(edges).is_ok());
    }

    #[test]
    fn test_self_loop_counts() {
        assert_eq!(find_cycles([("a", "a"), ("a", "b")]), vec!["a"]);
    }

    #[test]
    fn test_only_cycle_members_reported() {
        let edges = [("x", "a"), ("a", "b"), ("b", "c"), ("c", "a"), ("c", "y")];
        assert_eq!(find_cycles(edges), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_long_chain_does_not_overflow() {
        let names: Vec<String> = (0..50_000).map(|i| format!("n{}", i)).collect();
        let mut edges: Vec<(&str, &str)> = names.windows(2).map(|w| (w[0].as_str(), w[1].as_str())).collect();
        assert!(find_cycles(edges.iter().copied()).is_empty());

        edges.push((names[names.len() - 1].as_str(), names[0].as_str()));
        assert_eq!(find_cycles(edges).len(), names.len());
    }

    #[test]
    fn test_error_carries_vertices() {
        match ensure_acyclic([("A", "B"), ("B", "A")]) {
            Err(Error::CyclicDocument(v)) => assert_eq!(v, vec!["A", "B"]),
            other => panic!("expected cycle error, got {:?}", other),
        }
    }
}
