//! DAG structural validation: cycles, dangling inputs, duplicate
//! outputs, unknown `After` targets (`spec.md` §3 DAG invariants,
//! §4.6 "DAG built via chain-builder").
//!
//! Hand-rolled adjacency map + DFS coloring rather than a graph crate
//! — the algorithm is a few dozen lines and the node list is already
//! in hand (`spec.md` §4.6 implementation notes).

use std::collections::{HashMap, HashSet};

use perles_types::{Dag, WorkflowError};

/// Validate a DAG's structural invariants, naming `registration` (the
/// `namespace::key` pair) in any error so a multi-file load failure
/// is traceable to its source.
pub fn validate_dag(registration: &str, dag: &Dag) -> Result<(), WorkflowError> {
    let mut seen_keys = HashSet::new();
    for node in &dag.nodes {
        if !seen_keys.insert(node.key.as_str()) {
            return Err(invalid(registration, format!("duplicate node key: {}", node.key)));
        }
    }

    let mut output_owners: HashMap<&str, &str> = HashMap::new();
    for node in &dag.nodes {
        for output in &node.outputs {
            if let Some(owner) = output_owners.insert(output.file.as_str(), node.key.as_str()) {
                return Err(invalid(
                    registration,
                    format!("duplicate output filename {:?}: produced by both {owner} and {}", output.file, node.key),
                ));
            }
        }
    }

    for node in &dag.nodes {
        for after in &node.after {
            if !seen_keys.contains(after.as_str()) {
                return Err(invalid(
                    registration,
                    format!("node {} has unknown `after` target: {after}", node.key),
                ));
            }
        }
        for input in &node.inputs {
            if !output_owners.contains_key(input.file.as_str()) {
                return Err(invalid(
                    registration,
                    format!("node {} has dangling input {:?}: no sibling produces it", node.key, input.file),
                ));
            }
        }
    }

    detect_cycle(registration, dag)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

fn detect_cycle(registration: &str, dag: &Dag) -> Result<(), WorkflowError> {
    let adjacency: HashMap<&str, &[String]> =
        dag.nodes.iter().map(|n| (n.key.as_str(), n.after.as_slice())).collect();
    let mut colors: HashMap<&str, Color> = dag.nodes.iter().map(|n| (n.key.as_str(), Color::White)).collect();

    for node in &dag.nodes {
        if colors[node.key.as_str()] == Color::White {
            visit(registration, node.key.as_str(), &adjacency, &mut colors)?;
        }
    }
    Ok(())
}

fn visit<'a>(
    registration: &str,
    key: &'a str,
    adjacency: &HashMap<&'a str, &'a [String]>,
    colors: &mut HashMap<&'a str, Color>,
) -> Result<(), WorkflowError> {
    colors.insert(key, Color::Gray);
    if let Some(deps) = adjacency.get(key) {
        for dep in deps.iter() {
            match colors.get(dep.as_str()).copied() {
                Some(Color::Gray) => {
                    return Err(invalid(registration, format!("cycle detected at node {key} -> {dep}")));
                }
                Some(Color::White) => visit(registration, dep.as_str(), adjacency, colors)?,
                _ => {}
            }
        }
    }
    colors.insert(key, Color::Black);
    Ok(())
}

fn invalid(registration: &str, reason: String) -> WorkflowError {
    WorkflowError::InvalidDag { registration: registration.to_string(), reason }
}
