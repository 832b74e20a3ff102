//! Filesystem adapter contract.
//!
//! This is the fixed method set a storage driver implements to plug into
//! the [`StorageRegistry`](super::StorageRegistry). Every disk resolves to a
//! [`Filesystem`](super::Filesystem) wrapping one of these.

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

use super::types::{ListEntry, PathSet, RenameOutcome, RenameSource, Visibility, WriteConfig};
use crate::client::{ByteStream, RemoteObject};

/// Core trait for filesystem adapters.
///
/// Operations that can legitimately answer "no" (`has`, `delete`,
/// `get_metadata` and friends) report that through their return value.
/// Everything else surfaces failures as errors.
#[async_trait]
pub trait FilesystemAdapter: Send + Sync {
    /// Write a new file.
    ///
    /// # Returns
    ///
    /// The path the file was stored under.
    async fn write(&self, path: &str, contents: &[u8], config: &WriteConfig) -> Result<String>;

    /// Write a new file from a stream.
    ///
    /// # Returns
    ///
    /// The path as given.
    async fn write_stream(
        &self,
        path: &str,
        stream: ByteStream,
        config: &WriteConfig,
    ) -> Result<String>;

    /// Update a file. Same as a full write.
    async fn update(&self, path: &str, contents: &[u8], config: &WriteConfig) -> Result<String> {
        self.write(path, contents, config).await
    }

    /// Update a file from a stream. Same as a full stream write.
    async fn update_stream(
        &self,
        path: &str,
        stream: ByteStream,
        config: &WriteConfig,
    ) -> Result<String> {
        self.write_stream(path, stream, config).await
    }

    /// Rename or move a file, or rename a batch of files.
    async fn rename(&self, source: RenameSource, new_path: &str) -> Result<RenameOutcome>;

    /// Copy a file.
    async fn copy(&self, path: &str, new_path: &str) -> Result<bool>;

    /// Delete one or more files.
    ///
    /// # Returns
    ///
    /// `true` if every path was deleted.
    async fn delete(&self, paths: PathSet) -> Result<bool>;

    /// Delete a directory and its contents.
    async fn delete_dir(&self, dirname: &str) -> Result<bool>;

    /// Create a directory.
    async fn create_dir(&self, dirname: &str, config: &WriteConfig) -> Result<RemoteObject>;

    /// Set the visibility of a file.
    ///
    /// # Returns
    ///
    /// `false` when the backend cannot store visibility.
    async fn set_visibility(&self, path: &str, visibility: Visibility) -> Result<bool>;

    /// Check whether a file exists.
    async fn has(&self, path: &str) -> Result<bool>;

    /// Read a file.
    async fn read(&self, path: &str) -> Result<Bytes>;

    /// Read a file as a stream.
    async fn read_stream(&self, path: &str) -> Result<ByteStream>;

    /// List the contents of a directory.
    ///
    /// # Arguments
    ///
    /// * `directory` - The directory to list ("/" for root)
    /// * `page` - Paging hint from the caller
    async fn list_contents(&self, directory: &str, page: bool) -> Result<Vec<ListEntry>>;

    /// Get all metadata of a file or directory, `None` if unavailable.
    async fn get_metadata(&self, path: &str) -> Result<Option<RemoteObject>>;

    /// Get the size of a file in bytes.
    async fn get_size(&self, path: &str) -> Result<Option<u64>>;

    /// Get the MIME type of a file.
    async fn get_mimetype(&self, path: &str) -> Result<Option<String>>;

    /// Get the modification time of a file in epoch seconds.
    async fn get_timestamp(&self, path: &str) -> Result<Option<i64>>;

    /// Get the visibility of a file.
    async fn get_visibility(&self, path: &str) -> Result<Option<Visibility>>;

    /// Get the public URL of a file.
    async fn get_url(&self, path: &str) -> Result<String>;
}

/// A boxed filesystem adapter for dynamic dispatch.
pub type BoxedFilesystemAdapter = Box<dyn FilesystemAdapter>;
