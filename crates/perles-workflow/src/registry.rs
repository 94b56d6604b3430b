//! The loaded, shadowed set of workflow registrations (`spec.md` §4.6).
//!
//! Built-in registrations are loaded first; user registrations with
//! the same `(namespace, key)` replace them in every lookup
//! (`spec.md` §8 property 8 "User shadowing").

use std::collections::HashMap;
use std::sync::Arc;

use perles_types::{Source, WorkflowError, WorkflowRegistration};

use crate::filesystem::{DirFilesystem, WorkflowFilesystem};
use crate::loader::load_all_with_filesystem;

type NamespaceKey = (String, String);

/// A loaded registration paired with the filesystem it came from, so
/// template resolution always re-reads from the same root.
#[derive(Clone)]
pub struct LoadedRegistration {
    /// The validated registration.
    pub registration: WorkflowRegistration,
    /// The filesystem this registration (and its templates) loaded from.
    pub filesystem: Arc<dyn WorkflowFilesystem>,
}

/// Holds every visible workflow registration after built-in/user
/// shadowing, keyed by `(namespace, key)`.
pub struct WorkflowRegistry {
    entries: HashMap<NamespaceKey, LoadedRegistration>,
}

impl WorkflowRegistry {
    /// Load the built-in registry plus, if present, the user registry
    /// at `~/.perles/workflows`, with user entries shadowing built-ins
    /// of the same `(namespace, key)`.
    ///
    /// Fails only if *zero* registrations loaded from either source
    /// combined (`spec.md` §7 RegistryLoadError).
    pub fn load_default() -> Result<Self, WorkflowError> {
        let built_in: Arc<dyn WorkflowFilesystem> = Arc::new(DirFilesystem::built_in());
        let mut sources: Vec<(Arc<dyn WorkflowFilesystem>, Source)> = vec![(built_in, Source::BuiltIn)];
        if let Some(user) = DirFilesystem::user() {
            sources.push((Arc::new(user), Source::User));
        }
        Self::load_from(sources)
    }

    /// Load from an explicit, ordered list of `(filesystem, source)`
    /// pairs; later entries shadow earlier ones with the same
    /// `(namespace, key)`. Useful for tests and for pointing at a
    /// non-default registry root.
    pub fn load_from(sources: Vec<(Arc<dyn WorkflowFilesystem>, Source)>) -> Result<Self, WorkflowError> {
        let mut entries = HashMap::new();
        for (fs, source) in &sources {
            for (registration, fs) in load_all_with_filesystem(Arc::clone(fs), *source)? {
                entries.insert(registration.namespace_key(), LoadedRegistration { registration, filesystem: fs });
            }
        }
        if entries.is_empty() {
            let labels: Vec<&str> = sources.iter().map(|(fs, _)| fs.label()).collect();
            return Err(WorkflowError::NoRegistrationsLoaded { source: labels.join(", ") });
        }
        Ok(Self { entries })
    }

    /// Look up the visible registration for `namespace::key`, after
    /// shadowing.
    pub fn get_by_key(&self, namespace: &str, key: &str) -> Option<&LoadedRegistration> {
        self.entries.get(&(namespace.to_string(), key.to_string()))
    }

    /// Every visible registration, in unspecified order.
    pub fn all(&self) -> impl Iterator<Item = &LoadedRegistration> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_foo(root: &std::path::Path, epic_template: &str) {
        let dir = root.join("foo");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("template.yaml"),
            format!(
                r#"
registry:
  - namespace: workflow
    key: foo
    version: "1"
    name: Foo
    template: "{epic_template}"
    nodes:
      - key: a
        name: A
        template: a.md
"#
            ),
        )
        .unwrap();
        fs::write(dir.join("a.md"), "body").unwrap();
    }

    #[test]
    fn user_registration_shadows_built_in_with_same_namespace_key() {
        let built_in_root = tempdir().unwrap();
        let user_root = tempdir().unwrap();
        write_foo(built_in_root.path(), "Built-in");
        write_foo(user_root.path(), "User {{name}}");

        let built_in: Arc<dyn WorkflowFilesystem> = Arc::new(DirFilesystem::new(built_in_root.path(), "built-in"));
        let user: Arc<dyn WorkflowFilesystem> = Arc::new(DirFilesystem::new(user_root.path(), "user"));
        let registry = WorkflowRegistry::load_from(vec![(built_in, Source::BuiltIn), (user, Source::User)]).unwrap();

        let loaded = registry.get_by_key("workflow", "foo").unwrap();
        assert_eq!(loaded.registration.source, Source::User);
        assert_eq!(loaded.filesystem.label(), "user");
    }

    #[test]
    fn zero_registrations_is_an_error() {
        let root = tempdir().unwrap();
        let fs: Arc<dyn WorkflowFilesystem> = Arc::new(DirFilesystem::new(root.path(), "empty"));
        let err = WorkflowRegistry::load_from(vec![(fs, Source::BuiltIn)]).unwrap_err();
        assert!(matches!(err, WorkflowError::NoRegistrationsLoaded { .. }));
    }
}
