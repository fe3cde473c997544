//! Metadata sidecar store (§4.4).
//!
//! Every successful UPLOAD writes a `.meta` sidecar recording the stored
//! file's declared name, size, upload timestamp, and digest. Writes are
//! serialised through one mutex; this is a leaf lock, held only for the
//! duration of a single truncate-write and never nested above any other
//! lock in the system.

use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::warn;

use crate::storage::path::ValidatedName;

const SHA256_PREFIX: &str = "SHA256: ";

/// Serialises all sidecar writes behind one leaf-level mutex.
#[derive(Debug, Default, Clone)]
pub struct MetadataStore {
    write_lock: Arc<Mutex<()>>,
}

impl MetadataStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Truncate-writes the sidecar for `name` under `metadata_root`.
    ///
    /// Never fails the caller: a write error is logged and swallowed,
    /// matching the source's "log-and-continue" discipline for metadata.
    pub async fn put(&self, metadata_root: &Path, name: &ValidatedName, size: u64, digest_hex: &str) {
        let _guard = self.write_lock.lock().await;

        let path = name.resolve_meta(metadata_root);
        if let Some(parent) = path.parent() {
            if let Err(err) = tokio::fs::create_dir_all(parent).await {
                warn!(error = %err, path = %path.display(), "failed to create metadata directory");
                return;
            }
        }

        let upload_time = current_ctime_like();
        let contents = format!(
            "Filename: {}\nSize: {}\nUploadTime: {}SHA256: {}\n",
            name.as_str(),
            size,
            upload_time,
            digest_hex
        );

        match tokio::fs::File::create(&path).await {
            Ok(mut file) => {
                if let Err(err) = file.write_all(contents.as_bytes()).await {
                    warn!(error = %err, path = %path.display(), "failed to write metadata sidecar");
                }
            }
            Err(err) => {
                warn!(error = %err, path = %path.display(), "failed to create metadata sidecar");
            }
        }
    }

    /// Reads the recorded SHA-256 digest for `name`, or `None` if the
    /// sidecar is absent, unreadable, or has no `SHA256:` line.
    pub async fn get_digest(&self, metadata_root: &Path, name: &ValidatedName) -> Option<String> {
        let path = name.resolve_meta(metadata_root);
        let mut file = tokio::fs::File::open(&path).await.ok()?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).await.ok()?;

        contents.lines().find_map(|line| {
            line.strip_prefix(SHA256_PREFIX)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
    }
}

/// Produces a local-time timestamp line, ending in a newline the way the
/// original `ctime()` output did, so the sidecar's four labelled lines
/// stay byte-compatible with the source format.
fn current_ctime_like() -> String {
    format!("{}\n", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::path::validate_name;

    #[tokio::test]
    async fn put_then_get_digest_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::new();
        let name = validate_name("report").unwrap();

        store.put(dir.path(), &name, 12, "deadbeef").await;
        let digest = store.get_digest(dir.path(), &name).await;
        assert_eq!(digest.as_deref(), Some("deadbeef"));
    }

    #[tokio::test]
    async fn get_digest_missing_sidecar_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::new();
        let name = validate_name("never-uploaded").unwrap();
        assert_eq!(store.get_digest(dir.path(), &name).await, None);
    }

    #[tokio::test]
    async fn put_creates_user_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::new();
        let name = validate_name("alice/note").unwrap();
        store.put(dir.path(), &name, 3, "abc").await;
        assert!(dir.path().join("alice/note.meta").exists());
    }
}
