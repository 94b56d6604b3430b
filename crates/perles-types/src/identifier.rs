//! The `namespace::key::version::chainKey` identifier grammar (`spec.md` §6.4).

use crate::error::WorkflowError;

/// A parsed four-component workflow identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    /// Registration namespace.
    pub namespace: String,
    /// Registration key.
    pub key: String,
    /// Registration version.
    pub version: String,
    /// The DAG node (chain) key.
    pub chain_key: String,
}

const SEPARATOR: &str = "::";

impl Identifier {
    /// Parse `"namespace::key::version::chainKey"`. All four components
    /// must be non-empty.
    pub fn parse(s: &str) -> Result<Self, WorkflowError> {
        let parts: Vec<&str> = s.split(SEPARATOR).collect();
        let [namespace, key, version, chain_key] = parts.as_slice() else {
            return Err(WorkflowError::InvalidIdentifier(s.to_string()));
        };
        if namespace.is_empty() || key.is_empty() || version.is_empty() || chain_key.is_empty() {
            return Err(WorkflowError::InvalidIdentifier(s.to_string()));
        }
        Ok(Self {
            namespace: namespace.to_string(),
            key: key.to_string(),
            version: version.to_string(),
            chain_key: chain_key.to_string(),
        })
    }

    /// Build the identifier string for the given components.
    pub fn build(namespace: &str, key: &str, version: &str, chain_key: &str) -> String {
        [namespace, key, version, chain_key].join(SEPARATOR)
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            Identifier::build(&self.namespace, &self.key, &self.version, &self.chain_key)
        )
    }
}
