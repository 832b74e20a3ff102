//! Resolved disk handle.

use anyhow::Result;
use bytes::Bytes;
use std::ops::Deref;

use super::traits::{BoxedFilesystemAdapter, FilesystemAdapter};
use super::types::{PathSet, WriteConfig};

/// A disk returned by the [`StorageRegistry`](super::StorageRegistry).
///
/// Dereferences to its adapter, so every contract operation is callable
/// directly on the handle.
pub struct Filesystem {
    adapter: BoxedFilesystemAdapter,
}

impl Filesystem {
    pub fn new(adapter: impl FilesystemAdapter + 'static) -> Self {
        Self {
            adapter: Box::new(adapter),
        }
    }

    /// Write or overwrite a file depending on whether it exists.
    pub async fn put(&self, path: &str, contents: &[u8]) -> Result<String> {
        let config = WriteConfig::default();
        if self.adapter.has(path).await? {
            self.adapter.update(path, contents, &config).await
        } else {
            self.adapter.write(path, contents, &config).await
        }
    }

    /// Read a file, then delete it.
    pub async fn read_and_delete(&self, path: &str) -> Result<Bytes> {
        let contents = self.adapter.read(path).await?;
        if !self.adapter.delete(PathSet::from(path)).await? {
            tracing::warn!(path, "File was read but could not be deleted");
        }
        Ok(contents)
    }
}

impl Deref for Filesystem {
    type Target = dyn FilesystemAdapter;

    fn deref(&self) -> &Self::Target {
        self.adapter.as_ref()
    }
}

impl std::fmt::Debug for Filesystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Filesystem").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientCall, ClientSettings, MemoryClient};
    use crate::storage::BacktoryAdapter;
    use std::sync::Arc;

    fn disk() -> (MemoryClient, Filesystem) {
        let client = MemoryClient::new(ClientSettings::new(
            "id".to_string(),
            "key".to_string(),
            "sid".to_string(),
        ));
        let fs = Filesystem::new(BacktoryAdapter::new(Arc::new(client.clone()), ""));
        (client, fs)
    }

    #[test]
    fn test_put_creates_then_overwrites() {
        smol::block_on(async {
            let (client, fs) = disk();

            fs.put("d/a.txt", b"one").await.unwrap();
            fs.put("d/a.txt", b"two").await.unwrap();

            assert_eq!(client.object("d/a.txt").await.as_deref(), Some(&b"two"[..]));
            let exists_checks = client
                .calls()
                .await
                .into_iter()
                .filter(|c| matches!(c, ClientCall::Exists(_)))
                .count();
            assert_eq!(exists_checks, 2);
        });
    }

    #[test]
    fn test_read_and_delete() {
        smol::block_on(async {
            let (client, fs) = disk();
            client.insert_object("queue/job.json", "{}", 0).await;

            let contents = fs.read_and_delete("queue/job.json").await.unwrap();
            assert_eq!(&contents[..], b"{}");
            assert!(!fs.has("queue/job.json").await.unwrap());
        });
    }

    #[test]
    fn test_deref_exposes_contract() {
        smol::block_on(async {
            let (client, fs) = disk();
            client.insert_object("x.bin", "12", 0).await;
            assert_eq!(fs.get_size("x.bin").await.unwrap(), Some(2));
        });
    }
}
