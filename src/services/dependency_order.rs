use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;

use crate::domain::work_item::WorkItem;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DependencyError {
    #[error("duplicate work item position {0}")]
    DuplicatePosition(u32),
    #[error("work item {position} depends on itself")]
    SelfDependency { position: u32 },
    #[error("dependency {dependency} not found for work item {position}")]
    UnresolvedDependency { position: u32, dependency: u32 },
    #[error("dependency graph has a cycle through work item {position}")]
    CyclicDependencies { position: u32 },
}

/// Returns indices into `work_items` such that every predecessor comes
/// before its dependents. Independent items keep their list order.
pub fn schedule_order(work_items: &[WorkItem]) -> Result<Vec<usize>, DependencyError> {
    let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(work_items.len(), work_items.len());
    let mut indices: HashMap<u32, NodeIndex> = HashMap::with_capacity(work_items.len());

    for (list_index, item) in work_items.iter().enumerate() {
        if indices.contains_key(&item.position) {
            return Err(DependencyError::DuplicatePosition(item.position));
        }
        indices.insert(item.position, graph.add_node(list_index));
    }

    for item in work_items {
        let Some(dependency) = item.dependency else {
            continue;
        };
        if dependency == item.position {
            return Err(DependencyError::SelfDependency {
                position: item.position,
            });
        }
        let dependency_idx =
            *indices
                .get(&dependency)
                .ok_or(DependencyError::UnresolvedDependency {
                    position: item.position,
                    dependency,
                })?;
        graph.add_edge(dependency_idx, indices[&item.position], ());
    }

    // petgraph only detects cycles here; its order does not keep list
    // order on ties, so the order itself comes from the Kahn pass below.
    toposort(&graph, None).map_err(|cycle| DependencyError::CyclicDependencies {
        position: work_items[graph[cycle.node_id()]].position,
    })?;

    let mut in_degree: Vec<usize> = graph
        .node_indices()
        .map(|idx| graph.neighbors_directed(idx, Direction::Incoming).count())
        .collect();
    let mut ready: BinaryHeap<Reverse<usize>> = graph
        .node_indices()
        .filter(|idx| in_degree[idx.index()] == 0)
        .map(|idx| Reverse(graph[idx]))
        .collect();

    let mut ordered = Vec::with_capacity(work_items.len());
    while let Some(Reverse(list_index)) = ready.pop() {
        ordered.push(list_index);
        let node = NodeIndex::new(list_index);
        for dependent in graph.neighbors_directed(node, Direction::Outgoing) {
            in_degree[dependent.index()] -= 1;
            if in_degree[dependent.index()] == 0 {
                ready.push(Reverse(graph[dependent]));
            }
        }
    }

    Ok(ordered)
}
