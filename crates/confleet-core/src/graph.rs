//! Phase dependency graph.
//!
//! Dependencies between phases are data, not code order: the graph is
//! declared up front and checked for duplicates, dangling predecessors,
//! and cycles before anything runs. A bad graph is a construction error;
//! it can never surface mid-run.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::error::GraphError;

/// A validated phase DAG with a cached topological order.
#[derive(Debug, Clone)]
pub struct PhaseGraph {
    topo: Vec<String>,
    preds: BTreeMap<String, Vec<String>>,
}

impl PhaseGraph {
    /// Build and validate a graph from (phase, predecessors) pairs.
    pub fn build(nodes: Vec<(String, Vec<String>)>) -> Result<Self, GraphError> {
        let mut preds: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, after) in nodes {
            if preds.contains_key(&name) {
                return Err(GraphError::DuplicatePhase(name));
            }
            preds.insert(name, after);
        }

        for (name, after) in &preds {
            for p in after {
                if !preds.contains_key(p) {
                    return Err(GraphError::UnknownPredecessor {
                        phase: name.clone(),
                        predecessor: p.clone(),
                    });
                }
            }
        }

        // Kahn's algorithm; leftover nodes are the cycle.
        let mut indegree: BTreeMap<&str, usize> = preds
            .iter()
            .map(|(name, after)| (name.as_str(), after.len()))
            .collect();
        let mut successors: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (name, after) in &preds {
            for p in after {
                successors.entry(p.as_str()).or_default().push(name.as_str());
            }
        }

        let mut queue: VecDeque<&str> = indegree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(name, _)| *name)
            .collect();
        let mut topo = Vec::with_capacity(preds.len());

        while let Some(name) = queue.pop_front() {
            topo.push(name.to_string());
            for succ in successors.get(name).into_iter().flatten() {
                if let Some(deg) = indegree.get_mut(succ) {
                    *deg -= 1;
                    if *deg == 0 {
                        queue.push_back(succ);
                    }
                }
            }
        }

        if topo.len() != preds.len() {
            let placed: BTreeSet<&str> = topo.iter().map(String::as_str).collect();
            let phases = preds
                .keys()
                .filter(|name| !placed.contains(name.as_str()))
                .cloned()
                .collect();
            return Err(GraphError::Cycle { phases });
        }

        Ok(Self { topo, preds })
    }

    /// Phase names in topological order.
    pub fn phases(&self) -> &[String] {
        &self.topo
    }

    pub fn predecessors(&self, phase: &str) -> &[String] {
        self.preds.get(phase).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.topo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topo.is_empty()
    }

    /// Phases that are not yet started and whose predecessors have all
    /// completed.
    pub fn ready(&self, started: &BTreeSet<String>, completed: &BTreeSet<String>) -> Vec<String> {
        self.topo
            .iter()
            .filter(|name| {
                !started.contains(*name)
                    && self
                        .predecessors(name)
                        .iter()
                        .all(|p| completed.contains(p))
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, after: &[&str]) -> (String, Vec<String>) {
        (
            name.to_string(),
            after.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn topological_order_respects_dependencies() {
        let graph = PhaseGraph::build(vec![
            node("interfaces", &[]),
            node("routing", &["interfaces"]),
            node("vlans", &["interfaces"]),
            node("backup", &["routing", "vlans"]),
        ])
        .unwrap();

        let position = |name: &str| {
            graph
                .phases()
                .iter()
                .position(|p| p == name)
                .unwrap()
        };
        assert!(position("interfaces") < position("routing"));
        assert!(position("interfaces") < position("vlans"));
        assert!(position("routing") < position("backup"));
        assert!(position("vlans") < position("backup"));
    }

    #[test]
    fn cycle_is_rejected_at_construction() {
        let err = PhaseGraph::build(vec![node("a", &["b"]), node("b", &["a"])]).unwrap_err();
        match err {
            GraphError::Cycle { phases } => {
                assert_eq!(phases, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("expected cycle error, got {other:?}"),
        }
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let err = PhaseGraph::build(vec![node("a", &["a"])]).unwrap_err();
        assert!(matches!(err, GraphError::Cycle { .. }));
    }

    #[test]
    fn unknown_predecessor_rejected() {
        let err = PhaseGraph::build(vec![node("routing", &["interfaces"])]).unwrap_err();
        assert_eq!(
            err,
            GraphError::UnknownPredecessor {
                phase: "routing".to_string(),
                predecessor: "interfaces".to_string(),
            }
        );
    }

    #[test]
    fn duplicate_phase_rejected() {
        let err = PhaseGraph::build(vec![node("a", &[]), node("a", &[])]).unwrap_err();
        assert_eq!(err, GraphError::DuplicatePhase("a".to_string()));
    }

    #[test]
    fn ready_set_tracks_completion() {
        let graph = PhaseGraph::build(vec![
            node("interfaces", &[]),
            node("routing", &["interfaces"]),
            node("vlans", &["interfaces"]),
        ])
        .unwrap();

        let none = BTreeSet::new();
        assert_eq!(graph.ready(&none, &none), vec!["interfaces".to_string()]);

        let started: BTreeSet<String> = ["interfaces".to_string()].into_iter().collect();
        assert!(graph.ready(&started, &none).is_empty());

        let completed = started.clone();
        let mut ready = graph.ready(&started, &completed);
        ready.sort();
        assert_eq!(ready, vec!["routing".to_string(), "vlans".to_string()]);
    }
}
