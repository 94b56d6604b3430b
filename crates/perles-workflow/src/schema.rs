//! The on-disk YAML schema (`spec.md` §6.3), deserialized verbatim
//! before being validated and converted into [`perles_types::WorkflowRegistration`].

use serde::Deserialize;

/// Top-level shape of a `template.yaml` file: a list of registrations
/// (in practice each file holds exactly one, but the schema allows more).
#[derive(Debug, Deserialize)]
pub struct RegistryFile {
    /// The registrations declared in this file.
    pub registry: Vec<RegistrationYaml>,
}

/// Wire shape of a single registration, one-to-one with `spec.md` §6.3.
#[derive(Debug, Deserialize)]
pub struct RegistrationYaml {
    /// Registration namespace (e.g. `"workflow"`).
    pub namespace: String,
    /// Registration key, unique within `namespace` + [`perles_types::Source`].
    pub key: String,
    /// Semver-ish version string.
    pub version: String,
    /// Display name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Epic-level template, rendered by `RenderEpicTemplate`. Optional.
    #[serde(default)]
    pub template: Option<String>,
    /// Required iff any node has a non-empty `assignee`.
    #[serde(default)]
    pub instructions: Option<String>,
    /// Prefix prepended to every rendered artifact path. Defaults to `""`.
    #[serde(default)]
    pub path: String,
    /// Free-form labels.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Declared arguments.
    #[serde(default)]
    pub arguments: Vec<ArgumentYaml>,
    /// DAG nodes.
    #[serde(default)]
    pub nodes: Vec<NodeYaml>,
}

/// Wire shape of a declared argument.
#[derive(Debug, Deserialize)]
pub struct ArgumentYaml {
    /// Argument key, unique within a registration.
    pub key: String,
    /// Display label.
    #[serde(default)]
    pub label: String,
    /// Description shown to the user.
    #[serde(default)]
    pub description: String,
    /// Argument type (`string`, `select`, `multi_select`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Whether this argument must be supplied.
    #[serde(default)]
    pub required: bool,
    /// Default value, if any.
    #[serde(default)]
    pub default: Option<String>,
    /// Valid options; required (non-empty) when `kind` is a select type.
    #[serde(default)]
    pub options: Option<Vec<String>>,
}

/// Wire shape of a DAG node.
#[derive(Debug, Deserialize)]
pub struct NodeYaml {
    /// Key unique within the owning registration.
    pub key: String,
    /// Human-readable name.
    pub name: String,
    /// Name of the `*.md` file (relative to the registration directory)
    /// rendered as this node's body.
    pub template: String,
    /// Input artifacts.
    #[serde(default)]
    pub inputs: Vec<ArtifactYaml>,
    /// Output artifacts.
    #[serde(default)]
    pub outputs: Vec<ArtifactYaml>,
    /// Sibling node keys that must complete before this one starts.
    #[serde(default)]
    pub after: Vec<String>,
    /// Optional assignee: `worker-[1..99]` or `human`.
    #[serde(default)]
    pub assignee: Option<String>,
}

/// Wire shape of an artifact reference.
#[derive(Debug, Deserialize)]
pub struct ArtifactYaml {
    /// Stable key used to address this artifact in rendering contexts.
    pub key: String,
    /// Filename, possibly a `{{ }}` template.
    pub file: String,
}

/// Select-family argument types whose `options` must be non-empty.
const SELECT_TYPES: &[&str] = &["select", "multi_select"];

impl ArgumentYaml {
    /// True iff this argument's `kind` requires non-empty `options`.
    pub fn is_select(&self) -> bool {
        SELECT_TYPES.contains(&self.kind.as_str())
    }
}

/// Maximum size, in bytes, a registration YAML file may be before it
/// is rejected outright (`spec.md` §4.6 Load validation: "YAML file
/// ≤ 1 MiB").
pub const MAX_YAML_BYTES: usize = 1024 * 1024;

/// Validate an assignee string: `worker-[1..99]` or the literal `human`.
pub fn valid_assignee(assignee: &str) -> bool {
    if assignee == "human" {
        return true;
    }
    assignee
        .strip_prefix("worker-")
        .and_then(|n| n.parse::<u32>().ok())
        .is_some_and(|n| (1..=99).contains(&n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_human_and_numbered_workers() {
        assert!(valid_assignee("human"));
        assert!(valid_assignee("worker-1"));
        assert!(valid_assignee("worker-99"));
    }

    #[test]
    fn rejects_out_of_range_or_malformed_assignees() {
        assert!(!valid_assignee("worker-0"));
        assert!(!valid_assignee("worker-100"));
        assert!(!valid_assignee("worker-"));
        assert!(!valid_assignee("worker-abc"));
        assert!(!valid_assignee("coordinator"));
    }
}
