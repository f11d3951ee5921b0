// src/dag/graph.rs

use std::collections::BTreeMap;

use crate::config::ConfigFile;

#[derive(Debug, Clone)]
struct DagNode {
    /// Units that must finish before this one when both are in a run.
    deps: Vec<String>,
    /// Units that list this one in their `after`.
    dependents: Vec<String>,
}

/// In-memory build graph keyed by unit name.
///
/// Acyclicity is checked in `config::validate`; this only keeps adjacency
/// for scheduling and dry-run output.
#[derive(Debug, Clone)]
pub struct DagGraph {
    nodes: BTreeMap<String, DagNode>,
}

impl DagGraph {
    /// Build the graph from a validated [`ConfigFile`].
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let mut nodes: BTreeMap<String, DagNode> = cfg
            .units()
            .iter()
            .map(|(name, unit)| {
                (
                    name.clone(),
                    DagNode {
                        deps: unit.after.clone(),
                        dependents: Vec::new(),
                    },
                )
            })
            .collect();

        for (name, unit) in cfg.units() {
            for dep in &unit.after {
                if let Some(dep_node) = nodes.get_mut(dep) {
                    dep_node.dependents.push(name.clone());
                }
            }
        }

        Self { nodes }
    }

    /// All unit names, in name order.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    pub fn dependents_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }
}
