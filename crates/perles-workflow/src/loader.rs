//! Converts on-disk YAML (`schema.rs`) into validated
//! [`WorkflowRegistration`]s (`spec.md` §4.6 Load validation).
//!
//! A single malformed *file* is logged and skipped so the rest of the
//! registry root still loads (`spec.md` §7 RegistryLoadError); a
//! structural problem *within* a registration (bad DAG, bad assignee,
//! missing template) is likewise a skip of just that registration.

use std::collections::HashSet;
use std::sync::Arc;

use perles_types::{Argument, Artifact, Dag, Node, Source, WorkflowError, WorkflowRegistration};

use crate::chain::validate_dag;
use crate::filesystem::{validate_template_path, WorkflowFilesystem};
use crate::schema::{RegistrationYaml, RegistryFile, MAX_YAML_BYTES};

const TEMPLATE_FILENAME: &str = "template.yaml";

/// Load every registration found under each registration directory of
/// `fs`, skipping (with a `tracing::warn!`) any file or registration
/// that fails validation. Returns the registrations that did load,
/// paired with `source`.
pub fn load_all(fs: &dyn WorkflowFilesystem, source: Source) -> Result<Vec<WorkflowRegistration>, WorkflowError> {
    let mut loaded = Vec::new();
    for dir in fs.list_registrations()? {
        match load_one_file(fs, &dir, source) {
            Ok(mut registrations) => loaded.append(&mut registrations),
            Err(error) => {
                tracing::warn!(filesystem = fs.label(), directory = %dir, %error, "skipping registration file");
            }
        }
    }
    Ok(loaded)
}

fn load_one_file(
    fs: &dyn WorkflowFilesystem,
    dir: &str,
    source: Source,
) -> Result<Vec<WorkflowRegistration>, WorkflowError> {
    let raw = fs.read_file(dir, TEMPLATE_FILENAME)?;
    if raw.len() > MAX_YAML_BYTES {
        return Err(WorkflowError::InvalidRegistration {
            registration: dir.to_string(),
            reason: format!("{TEMPLATE_FILENAME} exceeds {MAX_YAML_BYTES} bytes"),
        });
    }

    let file: RegistryFile = serde_yaml::from_str(&raw).map_err(|e| WorkflowError::Yaml {
        file: format!("{dir}/{TEMPLATE_FILENAME}"),
        source: e.to_string(),
    })?;

    file.registry
        .into_iter()
        .map(|yaml| convert(fs, dir, source, yaml))
        .collect()
}

fn convert(
    fs: &dyn WorkflowFilesystem,
    dir: &str,
    source: Source,
    yaml: RegistrationYaml,
) -> Result<WorkflowRegistration, WorkflowError> {
    let registration_label = format!("{}::{}", yaml.namespace, yaml.key);

    let mut argument_keys = HashSet::new();
    let mut arguments = Vec::with_capacity(yaml.arguments.len());
    for arg in yaml.arguments {
        if !argument_keys.insert(arg.key.clone()) {
            return Err(invalid(&registration_label, format!("duplicate argument key: {}", arg.key)));
        }
        if arg.is_select() && arg.options.as_ref().is_none_or(|o| o.is_empty()) {
            return Err(invalid(
                &registration_label,
                format!("argument {} is a select type but has no options", arg.key),
            ));
        }
        arguments.push(Argument {
            key: arg.key,
            label: arg.label,
            description: arg.description,
            kind: arg.kind,
            required: arg.required,
            default: arg.default,
            options: arg.options,
        });
    }

    let mut nodes = Vec::with_capacity(yaml.nodes.len());
    let mut has_assignee = false;
    for node in yaml.nodes {
        if let Some(assignee) = &node.assignee {
            if !assignee.is_empty() {
                if !crate::schema::valid_assignee(assignee) {
                    return Err(invalid(
                        &registration_label,
                        format!("node {} has invalid assignee {assignee:?}", node.key),
                    ));
                }
                has_assignee = true;
            }
        }

        validate_template_path(&node.template)
            .map_err(|reason| invalid(&registration_label, reason))?;
        if !fs.file_exists(dir, &node.template) {
            return Err(invalid(
                &registration_label,
                format!("node {} references missing template file {:?}", node.key, node.template),
            ));
        }

        nodes.push(Node {
            key: node.key,
            name: node.name,
            template: node.template,
            inputs: node.inputs.into_iter().map(|a| Artifact { key: a.key, file: a.file }).collect(),
            outputs: node.outputs.into_iter().map(|a| Artifact { key: a.key, file: a.file }).collect(),
            after: node.after,
            assignee: node.assignee.filter(|a| !a.is_empty()),
        });
    }

    if has_assignee && yaml.instructions.as_deref().unwrap_or("").is_empty() {
        return Err(invalid(
            &registration_label,
            "orchestration workflow (a node has an assignee) requires non-empty `instructions`".to_string(),
        ));
    }

    let dag = Dag { nodes };
    validate_dag(&registration_label, &dag)?;

    Ok(WorkflowRegistration {
        namespace: yaml.namespace,
        key: yaml.key,
        version: yaml.version,
        name: yaml.name,
        description: yaml.description,
        labels: yaml.labels,
        arguments,
        epic_template: yaml.template,
        instructions: yaml.instructions,
        artifact_path: yaml.path,
        source,
        registration_dir: dir.to_string(),
        dag,
    })
}

fn invalid(registration: &str, reason: String) -> WorkflowError {
    WorkflowError::InvalidRegistration { registration: registration.to_string(), reason }
}

/// Load all registrations visible from `fs`, attaching `fs` itself so
/// later template resolution re-reads from the same filesystem
/// (`spec.md` §4.6: "Each registration remembers the filesystem it
/// was loaded from").
pub fn load_all_with_filesystem(
    fs: Arc<dyn WorkflowFilesystem>,
    source: Source,
) -> Result<Vec<(WorkflowRegistration, Arc<dyn WorkflowFilesystem>)>, WorkflowError> {
    Ok(load_all(fs.as_ref(), source)?.into_iter().map(|r| (r, Arc::clone(&fs))).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::DirFilesystem;
    use std::fs;
    use tempfile::tempdir;

    fn write_registration(root: &std::path::Path, dir: &str, yaml: &str, template_files: &[(&str, &str)]) {
        let reg_dir = root.join(dir);
        fs::create_dir_all(&reg_dir).unwrap();
        fs::write(reg_dir.join(TEMPLATE_FILENAME), yaml).unwrap();
        for (name, contents) in template_files {
            fs::write(reg_dir.join(name), contents).unwrap();
        }
    }

    #[test]
    fn loads_a_valid_single_node_registration() {
        let tmp = tempdir().unwrap();
        write_registration(
            tmp.path(),
            "research",
            r#"
registry:
  - namespace: workflow
    key: research
    version: "1"
    name: Research
    nodes:
      - key: research
        name: Research
        template: research.md
"#,
            &[("research.md", "# Research {{slug}}")],
        );

        let fs = DirFilesystem::new(tmp.path(), "test");
        let loaded = load_all(&fs, Source::BuiltIn).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].key, "research");
    }

    #[test]
    fn skips_a_registration_with_a_cycle_and_keeps_going() {
        let tmp = tempdir().unwrap();
        write_registration(
            tmp.path(),
            "bad",
            r#"
registry:
  - namespace: workflow
    key: bad
    version: "1"
    name: Bad
    nodes:
      - key: a
        name: A
        template: a.md
        after: [b]
      - key: b
        name: B
        template: b.md
        after: [a]
"#,
            &[("a.md", ""), ("b.md", "")],
        );
        write_registration(
            tmp.path(),
            "good",
            r#"
registry:
  - namespace: workflow
    key: good
    version: "1"
    name: Good
    nodes:
      - key: a
        name: A
        template: a.md
"#,
            &[("a.md", "")],
        );

        let fs = DirFilesystem::new(tmp.path(), "test");
        let loaded = load_all(&fs, Source::BuiltIn).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].key, "good");
    }

    #[test]
    fn orchestration_workflow_without_instructions_is_rejected() {
        let tmp = tempdir().unwrap();
        write_registration(
            tmp.path(),
            "orch",
            r#"
registry:
  - namespace: workflow
    key: orch
    version: "1"
    name: Orch
    nodes:
      - key: a
        name: A
        template: a.md
        assignee: worker-1
"#,
            &[("a.md", "")],
        );

        let fs = DirFilesystem::new(tmp.path(), "test");
        let loaded = load_all(&fs, Source::BuiltIn).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn missing_template_file_is_rejected() {
        let tmp = tempdir().unwrap();
        write_registration(
            tmp.path(),
            "missing",
            r#"
registry:
  - namespace: workflow
    key: missing
    version: "1"
    name: Missing
    nodes:
      - key: a
        name: A
        template: ghost.md
"#,
            &[],
        );

        let fs = DirFilesystem::new(tmp.path(), "test");
        let loaded = load_all(&fs, Source::BuiltIn).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn select_argument_without_options_is_rejected() {
        let tmp = tempdir().unwrap();
        write_registration(
            tmp.path(),
            "sel",
            r#"
registry:
  - namespace: workflow
    key: sel
    version: "1"
    name: Sel
    arguments:
      - key: mode
        type: select
    nodes:
      - key: a
        name: A
        template: a.md
"#,
            &[("a.md", "")],
        );

        let fs = DirFilesystem::new(tmp.path(), "test");
        let loaded = load_all(&fs, Source::BuiltIn).unwrap();
        assert!(loaded.is_empty());
    }
}
