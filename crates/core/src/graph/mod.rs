//! Dependency resolution over a pipeline's edge set.
//!
//! Every function here is pure: maps are rebuilt from the current edge
//! snapshot and nothing is cached between calls.

use cr_protocol::pipeline_models::{Edge, StageId};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// StageId -> direct upstream dependencies, in edge declaration order.
pub type DependencyMap = BTreeMap<StageId, Vec<StageId>>;

/// StageId -> direct dependents, in edge declaration order.
pub type DownstreamMap = BTreeMap<StageId, Vec<StageId>>;

/// Build the map of direct dependencies.
///
/// For every edge the source is appended to the target's list. Every edge
/// endpoint gets an entry, even when it has no dependencies.
pub fn build_dependency_map(edges: &[Edge]) -> DependencyMap {
    let mut map = DependencyMap::new();
    for edge in edges {
        map.entry(edge.source.clone()).or_default();
        let deps = map.entry(edge.target.clone()).or_default();
        if !deps.contains(&edge.source) {
            deps.push(edge.source.clone());
        }
    }
    map
}

/// Build the map of direct dependents. Inverse of [`build_dependency_map`].
pub fn build_downstream_map(edges: &[Edge]) -> DownstreamMap {
    let mut map = DownstreamMap::new();
    for edge in edges {
        map.entry(edge.target.clone()).or_default();
        let dependents = map.entry(edge.source.clone()).or_default();
        if !dependents.contains(&edge.target) {
            dependents.push(edge.target.clone());
        }
    }
    map
}

/// The node itself plus every transitive dependent, in DFS pre-order.
///
/// A visited set keeps this finite on cyclic graphs.
pub fn all_downstream_nodes(node: &str, downstream: &DownstreamMap) -> Vec<StageId> {
    closure(node, downstream)
}

/// The node itself plus every transitive dependency, in DFS pre-order.
pub fn all_upstream_nodes(node: &str, dependencies: &DependencyMap) -> Vec<StageId> {
    closure(node, dependencies)
}

fn closure(node: &str, adjacency: &BTreeMap<StageId, Vec<StageId>>) -> Vec<StageId> {
    let mut visited: HashSet<StageId> = HashSet::new();
    let mut order = Vec::new();
    let mut stack = vec![node.to_string()];

    while let Some(current) = stack.pop() {
        if !visited.insert(current.clone()) {
            continue;
        }
        if let Some(next) = adjacency.get(&current) {
            // Reverse so the first neighbour is visited first.
            for neighbour in next.iter().rev() {
                if !visited.contains(neighbour) {
                    stack.push(neighbour.clone());
                }
            }
        }
        order.push(current);
    }

    order
}

/// Order `nodes` so every node comes after all of its dependencies.
///
/// Kahn's algorithm; among nodes that are ready at the same time the one
/// declared first in `nodes` wins. Dependencies that are not listed in
/// `nodes` are ignored.
///
/// # Errors
///
/// Returns the nodes that could not be ordered when the graph has a cycle.
pub fn topological_order(
    nodes: &[StageId],
    dependencies: &DependencyMap,
) -> Result<Vec<StageId>, Vec<StageId>> {
    let position: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(index, id)| (id.as_str(), index))
        .collect();

    let mut in_degree = vec![0usize; nodes.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];

    for (index, id) in nodes.iter().enumerate() {
        for dep in dependencies.get(id).into_iter().flatten() {
            if let Some(&dep_index) = position.get(dep.as_str()) {
                in_degree[index] += 1;
                dependents[dep_index].push(index);
            }
        }
    }

    let mut ready: VecDeque<usize> = (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(index) = ready.pop_front() {
        order.push(nodes[index].clone());
        let mut unlocked = Vec::new();
        for &dependent in &dependents[index] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                unlocked.push(dependent);
            }
        }
        unlocked.sort_unstable();
        for dependent in unlocked {
            // Keep the queue sorted by declaration order.
            let at = ready
                .iter()
                .position(|&queued| queued > dependent)
                .unwrap_or(ready.len());
            ready.insert(at, dependent);
        }
    }

    if order.len() == nodes.len() {
        Ok(order)
    } else {
        let ordered: HashSet<&StageId> = order.iter().collect();
        Err(nodes
            .iter()
            .filter(|id| !ordered.contains(id))
            .cloned()
            .collect())
    }
}

/// A dependency cycle reachable from `start`.
///
/// The path starts and ends with the same node, following dependency
/// edges: `["a", "b", "a"]` means `a` depends on `b` which depends on `a`.
pub fn find_cycle(start: &str, dependencies: &DependencyMap) -> Option<Vec<StageId>> {
    fn visit(
        node: &str,
        dependencies: &DependencyMap,
        path: &mut Vec<StageId>,
        done: &mut HashSet<StageId>,
    ) -> Option<Vec<StageId>> {
        if let Some(at) = path.iter().position(|id| id == node) {
            let mut cycle = path[at..].to_vec();
            cycle.push(node.to_string());
            return Some(cycle);
        }
        if done.contains(node) {
            return None;
        }

        path.push(node.to_string());
        for dep in dependencies.get(node).into_iter().flatten() {
            if let Some(cycle) = visit(dep, dependencies, path, done) {
                return Some(cycle);
            }
        }
        path.pop();
        done.insert(node.to_string());
        None
    }

    visit(start, dependencies, &mut Vec::new(), &mut HashSet::new())
}
