//! Declared `requires` lists versus the registry and the reference graph.
//!
//! `requires` is advisory: the host does not act on it at install time.
//! It is validated for internal consistency and used to print an install
//! order, nothing more.

use std::collections::HashSet;

use {
    regcheck_common::{Finding, Section},
    regcheck_registry::Registry,
};

use crate::graph::DependencyGraph;

pub fn reconcile_declared_dependencies(
    registry: &Registry,
    graph: &DependencyGraph,
) -> Vec<Finding> {
    let mut findings = Vec::new();

    for entry in registry.plugins() {
        let Some(requires) = &entry.requires else {
            continue;
        };
        let location = registry.location(Some(&entry.name));

        for required in requires {
            if *required == entry.name {
                findings.push(
                    Finding::warning(
                        Section::Dependencies,
                        format!("plugin `{}` lists itself in `requires`", entry.name),
                    )
                    .at(location.clone()),
                );
            } else if !registry.contains(required) {
                findings.push(
                    Finding::error(
                        Section::Dependencies,
                        format!(
                            "plugin `{}` requires `{required}`, which is not registered",
                            entry.name
                        ),
                    )
                    .at(location.clone()),
                );
            }
        }

        for target in graph.targets(&entry.name) {
            if !requires.iter().any(|r| r == target) {
                findings.push(
                    Finding::warning(
                        Section::Dependencies,
                        format!(
                            "plugin `{}` references `{target}` in its documentation but does not \
                             declare it in `requires`",
                            entry.name
                        ),
                    )
                    .at(location.clone()),
                );
            }
        }
    }

    findings
}

/// Install sequence for one plugin: its requirements first, itself last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    pub plugin: String,
    pub order: Vec<String>,
    /// The requirements loop back on themselves; install `order` together.
    pub cyclic: bool,
}

/// One plan per plugin that declares requirements, in registry order.
pub fn plan_install_order(registry: &Registry) -> Vec<InstallPlan> {
    registry
        .plugins()
        .iter()
        .filter(|entry| !entry.requires().is_empty())
        .map(|entry| {
            let mut visited = HashSet::new();
            let mut active = Vec::new();
            let mut order = Vec::new();
            let mut cyclic = false;
            post_order(
                registry,
                &entry.name,
                &mut visited,
                &mut active,
                &mut order,
                &mut cyclic,
            );
            InstallPlan {
                plugin: entry.name.clone(),
                order,
                cyclic,
            }
        })
        .collect()
}

fn post_order(
    registry: &Registry,
    name: &str,
    visited: &mut HashSet<String>,
    active: &mut Vec<String>,
    order: &mut Vec<String>,
    cyclic: &mut bool,
) {
    if active.iter().any(|a| a == name) {
        *cyclic = true;
        return;
    }
    if !visited.insert(name.to_string()) {
        return;
    }

    active.push(name.to_string());
    if let Some(entry) = registry.get(name) {
        for required in entry.requires() {
            if required != name {
                post_order(registry, required, visited, active, order, cyclic);
            }
        }
    }
    active.pop();
    order.push(name.to_string());
}
