//! The Backtory storage client contract.
//!
//! The adapter only ever talks to the service through this trait. Transport,
//! authentication, multipart upload and URL signing live behind it.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

use super::error::BacktoryError;
use super::types::{ClientSettings, FileRename, RemoteObject, Upload};

/// Operations offered by a Backtory storage client.
///
/// Paths are relative to the storage root. A path ending in `/` names a
/// directory.
#[async_trait]
pub trait BacktoryClient: Send + Sync {
    /// Settings this client was created with.
    fn settings(&self) -> &ClientSettings;

    /// Upload an object into `directory`.
    ///
    /// Returns the paths of the uploaded objects. The object keeps the
    /// upload's name; callers rename it afterwards if needed.
    async fn put(&self, upload: Upload, directory: &str) -> Result<Vec<String>, BacktoryError>;

    /// Move an object into another directory, keeping its name.
    async fn move_file(&self, path: &str, destination: &str) -> Result<bool, BacktoryError>;

    /// Rename an object in place.
    async fn rename(&self, path: &str, new_name: &str) -> Result<bool, BacktoryError>;

    /// Rename several objects in place, one after the other.
    ///
    /// Returns the new paths. A failure stops the batch; renames already
    /// applied are kept.
    async fn rename_files(&self, renames: &[FileRename]) -> Result<Vec<String>, BacktoryError>;

    /// Copy an object to `new_path`.
    async fn copy(&self, path: &str, new_path: &str) -> Result<bool, BacktoryError>;

    /// Delete an object, or a whole directory when `path` ends with `/`.
    async fn delete(&self, path: &str) -> Result<(), BacktoryError>;

    /// Create a directory.
    async fn create_directory(&self, path: &str) -> Result<RemoteObject, BacktoryError>;

    /// Check whether an object or directory exists.
    async fn exists(&self, path: &str) -> Result<bool, BacktoryError>;

    /// Download an object.
    async fn get(&self, path: &str) -> Result<Bytes, BacktoryError>;

    /// List the direct children of a directory.
    async fn directory_info(&self, path: &str) -> Result<Vec<RemoteObject>, BacktoryError>;

    /// Metadata of a single object or directory.
    async fn file_info(&self, path: &str) -> Result<RemoteObject, BacktoryError>;

    /// Public URL of an object.
    async fn url(&self, path: &str) -> Result<String, BacktoryError>;
}

/// A shared client for dynamic dispatch.
pub type BoxedClient = Arc<dyn BacktoryClient>;

/// Creates clients from settings.
///
/// The service provider calls this once per resolved disk.
pub trait ClientConnector: Send + Sync {
    fn connect(&self, settings: ClientSettings) -> Result<BoxedClient, BacktoryError>;
}

impl<F> ClientConnector for F
where
    F: Fn(ClientSettings) -> Result<BoxedClient, BacktoryError> + Send + Sync,
{
    fn connect(&self, settings: ClientSettings) -> Result<BoxedClient, BacktoryError> {
        self(settings)
    }
}
