//! DAG validation, deterministic ordering, and wave computation.
//!
//! Uses `petgraph` to model node dependencies as a directed graph over the
//! submitted edge list. A Kahn walk produces the execution order (ties
//! broken by original node-array position, so identical submissions always
//! run in the same order) and detects cycles; depth grouping produces the
//! waves used by opt-in parallel execution.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use inkloom_types::error::WorkflowError;
use inkloom_types::workflow::WorkflowDefinition;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

// ---------------------------------------------------------------------------
// Execution plan
// ---------------------------------------------------------------------------

/// The ordered view of a validated workflow graph.
///
/// Both fields hold indices into `definition.nodes`. `order` is the
/// sequential execution order; `waves` groups the same indices by
/// dependency depth for parallel dispatch, preserving original order
/// within a wave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    pub order: Vec<usize>,
    pub waves: Vec<Vec<usize>>,
}

/// Validate the graph and compute its execution plan.
///
/// Fails fast on duplicate node ids, edges referencing unknown nodes, and
/// cycles; a rejected workflow never dispatches any node.
pub fn plan(definition: &WorkflowDefinition) -> Result<ExecutionPlan, WorkflowError> {
    let nodes = &definition.nodes;
    if nodes.is_empty() {
        return Ok(ExecutionPlan {
            order: Vec::new(),
            waves: Vec::new(),
        });
    }

    // Map node ids to original positions, rejecting duplicates.
    let mut id_to_position: HashMap<&str, usize> = HashMap::with_capacity(nodes.len());
    for (position, node) in nodes.iter().enumerate() {
        if id_to_position.insert(node.id.as_str(), position).is_some() {
            return Err(WorkflowError::DuplicateNodeId {
                id: node.id.clone(),
            });
        }
    }

    // Build directed graph: edge from source -> target. Node weights are
    // original positions, added in order so NodeIndex tracks position.
    let mut graph = DiGraph::<usize, ()>::with_capacity(nodes.len(), definition.edges.len());
    let indices: Vec<NodeIndex> = (0..nodes.len()).map(|p| graph.add_node(p)).collect();

    for edge in &definition.edges {
        let source = *id_to_position.get(edge.source.as_str()).ok_or_else(|| {
            WorkflowError::UnknownNode {
                edge_id: edge.id.clone(),
                node_id: edge.source.clone(),
            }
        })?;
        let target = *id_to_position.get(edge.target.as_str()).ok_or_else(|| {
            WorkflowError::UnknownNode {
                edge_id: edge.id.clone(),
                node_id: edge.target.clone(),
            }
        })?;
        graph.add_edge(indices[source], indices[target], ());
    }

    // Kahn walk with a min-heap over original positions: among ready nodes
    // the earliest-submitted runs first.
    let mut indegree: Vec<usize> = indices
        .iter()
        .map(|&index| graph.neighbors_directed(index, Direction::Incoming).count())
        .collect();
    let mut ready: BinaryHeap<Reverse<usize>> = indegree
        .iter()
        .enumerate()
        .filter(|&(_, &degree)| degree == 0)
        .map(|(position, _)| Reverse(position))
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    let mut placed = vec![false; nodes.len()];
    while let Some(Reverse(position)) = ready.pop() {
        order.push(position);
        placed[position] = true;
        for neighbor in graph.neighbors_directed(indices[position], Direction::Outgoing) {
            let downstream = graph[neighbor];
            indegree[downstream] -= 1;
            if indegree[downstream] == 0 {
                ready.push(Reverse(downstream));
            }
        }
    }

    if order.len() != nodes.len() {
        let nodes = nodes
            .iter()
            .enumerate()
            .filter(|(position, _)| !placed[*position])
            .map(|(_, node)| node.id.clone())
            .collect();
        return Err(WorkflowError::CycleDetected { nodes });
    }

    // Depth = longest dependency path; grouping by depth yields waves.
    let mut depths = vec![0usize; nodes.len()];
    for &position in &order {
        let depth = graph
            .neighbors_directed(indices[position], Direction::Incoming)
            .map(|predecessor| depths[graph[predecessor]] + 1)
            .max()
            .unwrap_or(0);
        depths[position] = depth;
    }
    let wave_count = depths.iter().copied().max().unwrap_or(0) + 1;
    let mut waves: Vec<Vec<usize>> = vec![Vec::new(); wave_count];
    for position in 0..nodes.len() {
        waves[depths[position]].push(position);
    }

    Ok(ExecutionPlan { order, waves })
}

/// Validate DAG-ness without keeping the plan.
pub fn validate(definition: &WorkflowDefinition) -> Result<(), WorkflowError> {
    plan(definition).map(|_| ())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
