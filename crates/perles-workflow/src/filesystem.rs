//! Abstraction over where a registration's YAML and template files
//! live, so built-in and user registries can share loading logic
//! while resolving from different roots (`spec.md` §4.6).

use std::path::{Path, PathBuf};

use perles_types::WorkflowError;

/// A read-only filesystem a [`crate::registry::WorkflowRegistry`] loads
/// registrations from. Every registration remembers which filesystem
/// loaded it; template resolution always re-reads from that same
/// filesystem (`spec.md` §4.6).
pub trait WorkflowFilesystem: Send + Sync {
    /// List the registration directory names directly under the root
    /// (each expected to contain a `template.yaml`).
    fn list_registrations(&self) -> Result<Vec<String>, WorkflowError>;

    /// Read the contents of `rel_path`, relative to `registration_dir`
    /// which is itself relative to this filesystem's root.
    fn read_file(&self, registration_dir: &str, rel_path: &str) -> Result<String, WorkflowError>;

    /// True iff `rel_path` exists under `registration_dir`.
    fn file_exists(&self, registration_dir: &str, rel_path: &str) -> bool;

    /// A human-readable label for error messages and [`crate::Source`] diagnostics.
    fn label(&self) -> &str;
}

/// A [`WorkflowFilesystem`] backed by a real directory tree
/// (`spec.md` §4.6: built-in embedded at build, user loaded from
/// `~/.perles/workflows` "through a directory filesystem").
pub struct DirFilesystem {
    root: PathBuf,
    label: String,
}

impl DirFilesystem {
    /// Root a filesystem at `root`, using `label` for diagnostics.
    pub fn new(root: impl Into<PathBuf>, label: impl Into<String>) -> Self {
        Self { root: root.into(), label: label.into() }
    }

    /// The built-in registry root bundled inside this crate at
    /// `workflows/`, resolved relative to the crate manifest so it
    /// travels with the binary regardless of the process's working
    /// directory.
    pub fn built_in() -> Self {
        Self::new(concat!(env!("CARGO_MANIFEST_DIR"), "/workflows"), "built-in")
    }

    /// The user registry root, `~/.perles/workflows`. Returns `None`
    /// if the home directory cannot be determined.
    pub fn user() -> Option<Self> {
        dirs::home_dir().map(|home| Self::new(home.join(".perles").join("workflows"), "user"))
    }

    fn resolve(&self, registration_dir: &str, rel_path: &str) -> PathBuf {
        self.root.join(registration_dir).join(rel_path)
    }
}

impl WorkflowFilesystem for DirFilesystem {
    fn list_registrations(&self) -> Result<Vec<String>, WorkflowError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let entries =
            std::fs::read_dir(&self.root).map_err(|e| WorkflowError::Io(format!("{}: {e}", self.root.display())))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| WorkflowError::Io(e.to_string()))?;
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn read_file(&self, registration_dir: &str, rel_path: &str) -> Result<String, WorkflowError> {
        let path = self.resolve(registration_dir, rel_path);
        std::fs::read_to_string(&path).map_err(|e| WorkflowError::Io(format!("{}: {e}", path.display())))
    }

    fn file_exists(&self, registration_dir: &str, rel_path: &str) -> bool {
        self.resolve(registration_dir, rel_path).is_file()
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// Reject absolute paths, Windows drive-letter paths, and any path
/// containing a `..` segment (`spec.md` §4.6 Load validation).
pub fn validate_template_path(rel_path: &str) -> Result<(), String> {
    let path = Path::new(rel_path);
    if path.is_absolute() {
        return Err(format!("template path must be relative: {rel_path}"));
    }
    if rel_path.len() >= 2 && rel_path.as_bytes()[1] == b':' && rel_path.as_bytes()[0].is_ascii_alphabetic() {
        return Err(format!("template path must not be a drive-letter path: {rel_path}"));
    }
    if path.components().any(|c| c.as_os_str() == "..") {
        return Err(format!("template path must not contain '..': {rel_path}"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_absolute_paths() {
        assert!(validate_template_path("/etc/passwd").is_err());
    }

    #[test]
    fn rejects_drive_letter_paths() {
        assert!(validate_template_path("C:\\Windows\\system.ini").is_err());
    }

    #[test]
    fn rejects_dot_dot_segments() {
        assert!(validate_template_path("../../etc/passwd").is_err());
        assert!(validate_template_path("a/../b").is_err());
    }

    #[test]
    fn accepts_plain_relative_paths() {
        assert!(validate_template_path("plan.md").is_ok());
        assert!(validate_template_path("templates/plan.md").is_ok());
    }
}
