//! Path validation and derivation (§4.1).
//!
//! A client-supplied name is either a flat filename or exactly one
//! `user/segment` pair. Anything else — traversal attempts, absolute
//! paths, or more than one separator — is rejected before it ever reaches
//! the filesystem.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// A name accepted by the validator, scoped to either the storage or
/// metadata root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedName {
    raw: String,
    /// The user segment, if the name was `user/segment`.
    pub user: Option<String>,
}

impl ValidatedName {
    /// The original client-supplied name, e.g. `alice/note` or `report`.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Resolves the path this name denotes under `root`.
    pub fn resolve(&self, root: &Path) -> PathBuf {
        root.join(&self.raw)
    }

    /// Resolves the metadata sidecar path this name denotes under `root`.
    pub fn resolve_meta(&self, root: &Path) -> PathBuf {
        let mut path = root.join(&self.raw);
        let mut file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        file_name.push_str(".meta");
        path.set_file_name(file_name);
        path
    }
}

/// Why a client-supplied name was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathValidationError {
    /// The name is empty, contains `..`, or starts with a separator.
    #[error("invalid filename")]
    Invalid,
}

/// Validates a client-supplied name per §4.1: reject `..` anywhere, reject a
/// leading separator, and accept 0 or 1 (but not more) path separators,
/// with neither side empty in the 1-separator case.
pub fn validate_name(name: &str) -> Result<ValidatedName, PathValidationError> {
    if name.is_empty() || name.contains("..") {
        return Err(PathValidationError::Invalid);
    }
    if name.starts_with('/') || name.starts_with('\\') {
        return Err(PathValidationError::Invalid);
    }

    let separators: Vec<usize> = name
        .char_indices()
        .filter(|(_, c)| *c == '/' || *c == '\\')
        .map(|(i, _)| i)
        .collect();

    match separators.len() {
        0 => Ok(ValidatedName {
            raw: name.to_string(),
            user: None,
        }),
        1 => {
            let idx = separators[0];
            let user = &name[..idx];
            let segment = &name[idx + 1..];
            if user.is_empty() || segment.is_empty() {
                return Err(PathValidationError::Invalid);
            }
            Ok(ValidatedName {
                raw: name.to_string(),
                user: Some(user.to_string()),
            })
        }
        _ => Err(PathValidationError::Invalid),
    }
}
