//! Topological scheduling of module activation
//!
//! Kahn's algorithm over the dependency graph. Among modules that are ready
//! at the same time, the one declared first in the manifest goes first, so a
//! fixed manifest always yields the same order.

use std::collections::{BTreeSet, VecDeque};
use tracing::debug;

use crate::error::{Result, WiringError};
use crate::module::graph::DependencyGraph;

/// Activation order scheduler
pub struct TopologicalScheduler;

impl TopologicalScheduler {
    /// Module names in activation order
    pub fn schedule(graph: &DependencyGraph) -> Result<Vec<String>> {
        let count = graph.len();
        let mut in_degree: Vec<usize> = (0..count).map(|i| graph.in_degree(i)).collect();

        // Ordered by declaration position
        let mut ready: BTreeSet<usize> = (0..count).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(count);

        while let Some(next) = ready.pop_first() {
            order.push(next);
            for &dependent in graph.successors(next) {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if order.len() != count {
            let remaining: Vec<usize> = (0..count).filter(|&i| in_degree[i] > 0).collect();
            let cycle = Self::shortest_cycle(graph, &remaining)
                .into_iter()
                .map(|i| graph.name(i).to_string())
                .collect();
            return Err(WiringError::Cycle { cycle });
        }

        let order: Vec<String> = order.into_iter().map(|i| graph.name(i).to_string()).collect();
        debug!("Activation order: {:?}", order);
        Ok(order)
    }

    /// Shortest cycle through the unscheduled modules, closed on its first
    /// module (`[a, b, a]`). Ties go to the earliest declared module.
    fn shortest_cycle(graph: &DependencyGraph, remaining: &[usize]) -> Vec<usize> {
        let mut best: Option<Vec<usize>> = None;
        for &start in remaining {
            if let Some(cycle) = Self::cycle_through(graph, start) {
                if best.as_ref().map_or(true, |b| cycle.len() < b.len()) {
                    best = Some(cycle);
                }
            }
        }
        // Kahn left nodes behind, so at least one of them lies on a cycle
        best.unwrap_or_else(|| remaining.to_vec())
    }

    /// BFS from `start` back to itself
    fn cycle_through(graph: &DependencyGraph, start: usize) -> Option<Vec<usize>> {
        let mut parent: Vec<Option<usize>> = vec![None; graph.len()];
        let mut visited = vec![false; graph.len()];
        let mut queue = VecDeque::from([start]);

        while let Some(node) = queue.pop_front() {
            for &next in graph.successors(node) {
                if next == start {
                    let mut path = vec![node];
                    let mut cursor = node;
                    while let Some(p) = parent[cursor] {
                        path.push(p);
                        cursor = p;
                    }
                    if cursor != start {
                        path.push(start);
                    }
                    path.reverse();
                    path.push(start);
                    return Some(path);
                }
                if !visited[next] {
                    visited[next] = true;
                    parent[next] = Some(node);
                    queue.push_back(next);
                }
            }
        }
        None
    }
}
