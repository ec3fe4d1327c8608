//! Cross-plugin reference graph: extraction from documentation, the
//! dependency graph, cycle detection, capability existence, and declared
//! `requires` reconciliation.

pub mod capabilities;
pub mod cycles;
pub mod declared;
pub mod error;
pub mod extract;
pub mod graph;

pub use {
    capabilities::{CapabilityIndex, validate_capabilities},
    cycles::{Cycle, cycle_findings, detect_cycles},
    declared::{InstallPlan, plan_install_order, reconcile_declared_dependencies},
    error::{Error, Result},
    extract::{Extraction, ReferenceEdge, ReferenceExtractor, documentation_files},
    graph::DependencyGraph,
};
