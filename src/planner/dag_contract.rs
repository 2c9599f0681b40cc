use crate::error::{OrchestrationError, Result};
use std::collections::{BTreeMap, BTreeSet};

/// Dependency graph of a plan: one node per step, one edge per
/// `dependency -> dependent` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DagContract {
    pub nodes: Vec<String>,
    pub edges: Vec<(String, String)>,
}

impl DagContract {
    pub fn new(nodes: Vec<String>, edges: Vec<(String, String)>) -> Self {
        Self { nodes, edges }
    }

    pub fn validate(&self) -> Result<()> {
        let node_ids = self.validate_nodes()?;
        let adjacency = self.validate_edges(&node_ids)?;
        validate_cycle_free(&node_ids, &adjacency)
    }

    /// Kahn's algorithm with lexicographic tie-breaking, so the order is
    /// deterministic for a given graph.
    pub fn topological_sort(&self) -> Result<Vec<String>> {
        self.validate()?;

        let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
        let mut adjacency: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for node in &self.nodes {
            in_degree.insert(node.as_str(), 0);
            adjacency.insert(node.as_str(), Vec::new());
        }
        for (from, to) in &self.edges {
            if let Some(degree) = in_degree.get_mut(to.as_str()) {
                *degree += 1;
            }
            if let Some(neighbors) = adjacency.get_mut(from.as_str()) {
                neighbors.push(to.as_str());
            }
        }

        let mut queue: BTreeSet<&str> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(node, _)| *node)
            .collect();

        let mut sorted = Vec::with_capacity(self.nodes.len());
        while let Some(node) = queue.pop_first() {
            sorted.push(node.to_string());
            for neighbor in adjacency.get(node).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(neighbor) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.insert(*neighbor);
                    }
                }
            }
        }

        if sorted.len() != self.nodes.len() {
            return Err(OrchestrationError::DependencyDeadlock(
                "cycle detected while sorting steps".into(),
            ));
        }
        Ok(sorted)
    }

    fn validate_nodes(&self) -> Result<BTreeSet<&str>> {
        let mut node_ids = BTreeSet::new();
        for node in &self.nodes {
            if node.trim().is_empty() {
                return Err(OrchestrationError::InvalidPlan(
                    "step id cannot be empty".into(),
                ));
            }
            if !node_ids.insert(node.as_str()) {
                return Err(OrchestrationError::InvalidPlan(format!(
                    "duplicate step id: {node}"
                )));
            }
        }
        Ok(node_ids)
    }

    fn validate_edges<'a>(
        &'a self,
        node_ids: &BTreeSet<&'a str>,
    ) -> Result<BTreeMap<&'a str, Vec<&'a str>>> {
        let mut adjacency: BTreeMap<&str, Vec<&str>> =
            node_ids.iter().map(|id| (*id, Vec::new())).collect();
        let mut seen_edges = BTreeSet::new();

        for (from, to) in &self.edges {
            for endpoint in [from, to] {
                if !node_ids.contains(endpoint.as_str()) {
                    let known = node_ids.iter().copied().collect::<Vec<_>>().join(", ");
                    return Err(OrchestrationError::DependencyDeadlock(format!(
                        "step '{to}' depends on unknown step '{from}' (known steps: [{known}])"
                    )));
                }
            }
            if !seen_edges.insert((from.as_str(), to.as_str())) {
                return Err(OrchestrationError::InvalidPlan(format!(
                    "step '{to}' lists dependency '{from}' more than once"
                )));
            }
            adjacency.entry(from.as_str()).or_default().push(to.as_str());
        }

        for neighbors in adjacency.values_mut() {
            neighbors.sort_unstable();
        }
        Ok(adjacency)
    }
}

fn validate_cycle_free<'a>(
    node_ids: &BTreeSet<&'a str>,
    adjacency: &BTreeMap<&'a str, Vec<&'a str>>,
) -> Result<()> {
    let mut states = BTreeMap::new();
    let mut stack = Vec::new();

    for node in node_ids {
        if states.contains_key(node) {
            continue;
        }
        if let Some(path) = detect_cycle(*node, adjacency, &mut states, &mut stack) {
            return Err(OrchestrationError::DependencyDeadlock(format!(
                "cycle detected: {}",
                path.join(" -> ")
            )));
        }
    }
    Ok(())
}

fn detect_cycle<'a>(
    node: &'a str,
    adjacency: &BTreeMap<&'a str, Vec<&'a str>>,
    states: &mut BTreeMap<&'a str, NodeState>,
    stack: &mut Vec<&'a str>,
) -> Option<Vec<&'a str>> {
    states.insert(node, NodeState::Visiting);
    stack.push(node);

    for neighbor in adjacency.get(node).into_iter().flatten() {
        match states.get(neighbor) {
            Some(NodeState::Visiting) => {
                let index = stack.iter().position(|entry| entry == neighbor)?;
                let mut cycle = stack[index..].to_vec();
                cycle.push(*neighbor);
                return Some(cycle);
            }
            Some(NodeState::Visited) => {}
            None => {
                if let Some(path) = detect_cycle(*neighbor, adjacency, states, stack) {
                    return Some(path);
                }
            }
        }
    }

    stack.pop();
    states.insert(node, NodeState::Visited);
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    Visiting,
    Visited,
}
