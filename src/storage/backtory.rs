//! Backtory filesystem adapter.
//!
//! Translates each filesystem operation into calls on an injected
//! [`BacktoryClient`](crate::client::BacktoryClient). Uploads go into a directory first and get their
//! final name through a rename, which is why writes split the target path.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream;
use uuid::Uuid;

use super::classify::recover;
use super::paths::{self, PathSplit};
use super::traits::FilesystemAdapter;
use super::types::{
    DeleteReport, ListEntry, PathSet, RenameOutcome, RenameSource, Visibility, WriteConfig,
};
use crate::client::{BoxedClient, ByteStream, FileRename, RemoteObject, Upload};

/// Filesystem adapter for Backtory Storage.
pub struct BacktoryAdapter {
    client: BoxedClient,
    prefix: String,
}

impl BacktoryAdapter {
    /// Create an adapter over `client`, rooted at `prefix` ("" for none).
    pub fn new(client: BoxedClient, prefix: &str) -> Self {
        Self {
            client,
            prefix: paths::normalize_prefix(prefix),
        }
    }

    /// The normalized path prefix.
    pub fn path_prefix(&self) -> &str {
        &self.prefix
    }

    /// Path as sent to the client.
    fn remote(&self, path: &str) -> String {
        paths::apply_prefix(&self.prefix, path)
    }

    fn temporary_name() -> String {
        format!("{}.tmp", Uuid::new_v4().simple())
    }

    /// Upload and name an object. `directory` is already prefixed.
    async fn upload(&self, upload: Upload, directory: &str, name: Option<&str>) -> Result<()> {
        let uploaded = self
            .client
            .put(upload, directory)
            .await
            .with_context(|| format!("upload into '{}' failed", directory))?;

        let Some(name) = name else {
            return Ok(());
        };
        let first = uploaded
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("upload into '{}' reported no objects", directory))?;
        self.rename_remote(RenameSource::One(first), name).await?;
        Ok(())
    }

    /// Rename with source paths already prefixed.
    ///
    /// Only a single source is tried as a move first; a batch always goes
    /// straight to the in-place batch rename.
    async fn rename_remote(&self, source: RenameSource, new_path: &str) -> Result<RenameOutcome> {
        match source {
            RenameSource::One(path) => {
                if paths::is_move_target(new_path) {
                    let destination = self.remote(new_path);
                    let moved = recover("move", &path, self.client.move_file(&path, &destination).await)?;
                    if let Some(moved) = moved {
                        return Ok(RenameOutcome::Single(moved));
                    }
                    tracing::debug!(path = %path, new_path, "Move refused, falling back to rename");
                }

                let renamed = self
                    .client
                    .rename(&path, new_path)
                    .await
                    .with_context(|| format!("rename of '{}' to '{}' failed", path, new_path))?;
                Ok(RenameOutcome::Single(renamed))
            }
            RenameSource::Batch(renames) => {
                let renamed = self
                    .client
                    .rename_files(&renames)
                    .await
                    .with_context(|| format!("batch rename of {} files failed", renames.len()))?;
                Ok(RenameOutcome::Batch(renamed))
            }
        }
    }

    /// Delete paths one after the other, stopping at the first refusal.
    ///
    /// Paths deleted before the refusal stay deleted; the report says which.
    pub async fn delete_with_report(&self, paths: PathSet) -> Result<DeleteReport> {
        let mut report = DeleteReport::default();

        for path in paths.into_vec() {
            let remote = self.remote(&path);
            match recover("delete", &remote, self.client.delete(&remote).await)? {
                Some(()) => report.deleted.push(path),
                None => {
                    report.failed = Some(path);
                    break;
                }
            }
        }

        if report.is_partial() {
            tracing::warn!(
                deleted = report.deleted.len(),
                failed = ?report.failed,
                "Delete stopped part way; earlier deletions were kept"
            );
        }

        Ok(report)
    }
}

impl std::fmt::Debug for BacktoryAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BacktoryAdapter")
            .field("storage_id", &self.client.settings().storage_id)
            .field("prefix", &self.prefix)
            .finish()
    }
}

#[async_trait]
impl FilesystemAdapter for BacktoryAdapter {
    async fn write(&self, path: &str, contents: &[u8], _config: &WriteConfig) -> Result<String> {
        let PathSplit { directory, name } = paths::split_path(path);
        let name = name.unwrap_or_else(Self::temporary_name);

        let buffer = smol::unblock(|| tempfile::Builder::new().prefix("backtory-").tempfile())
            .await
            .context("failed to create upload buffer")?;
        async_fs::write(buffer.path(), contents)
            .await
            .context("failed to fill upload buffer")?;

        tracing::debug!(path, directory = %directory, name = %name, "Writing file");
        self.upload(Upload::from_file(buffer.path()), &self.remote(&directory), Some(&name))
            .await?;

        Ok(format!("{}/{}", directory, name))
    }

    async fn write_stream(
        &self,
        path: &str,
        stream: ByteStream,
        _config: &WriteConfig,
    ) -> Result<String> {
        let PathSplit { directory, name } = paths::split_path(path);
        let directory = paths::upload_directory(&directory);

        tracing::debug!(path, directory, "Writing stream");
        self.upload(Upload::from_stream(stream), &self.remote(directory), name.as_deref())
            .await?;

        Ok(path.to_string())
    }

    async fn rename(&self, source: RenameSource, new_path: &str) -> Result<RenameOutcome> {
        let source = match source {
            RenameSource::One(path) => RenameSource::One(self.remote(&path)),
            RenameSource::Batch(renames) => RenameSource::Batch(
                renames
                    .into_iter()
                    .map(|r| FileRename::new(self.remote(&r.path), r.new_name))
                    .collect(),
            ),
        };
        self.rename_remote(source, new_path).await
    }

    async fn copy(&self, path: &str, new_path: &str) -> Result<bool> {
        self.client
            .copy(&self.remote(path), &self.remote(new_path))
            .await
            .with_context(|| format!("copy of '{}' to '{}' failed", path, new_path))
    }

    async fn delete(&self, paths: PathSet) -> Result<bool> {
        Ok(self.delete_with_report(paths).await?.is_complete())
    }

    async fn delete_dir(&self, dirname: &str) -> Result<bool> {
        self.delete(PathSet::One(paths::with_trailing_separator(dirname))).await
    }

    async fn create_dir(&self, dirname: &str, _config: &WriteConfig) -> Result<RemoteObject> {
        self.client
            .create_directory(&self.remote(dirname))
            .await
            .with_context(|| format!("creating directory '{}' failed", dirname))
    }

    async fn set_visibility(&self, _path: &str, _visibility: Visibility) -> Result<bool> {
        Ok(false)
    }

    async fn has(&self, path: &str) -> Result<bool> {
        let remote = self.remote(path);
        Ok(recover("exists", &remote, self.client.exists(&remote).await)?.unwrap_or(false))
    }

    async fn read(&self, path: &str) -> Result<Bytes> {
        self.client
            .get(&self.remote(path))
            .await
            .with_context(|| format!("reading '{}' failed", path))
    }

    async fn read_stream(&self, path: &str) -> Result<ByteStream> {
        let contents = self.read(path).await?;
        Ok(stream::once(async move { Ok(contents) }).boxed())
    }

    async fn list_contents(&self, directory: &str, _page: bool) -> Result<Vec<ListEntry>> {
        let objects = self
            .client
            .directory_info(&self.remote(directory))
            .await
            .with_context(|| format!("listing '{}' failed", directory))?;

        Ok(objects.iter().map(ListEntry::from_remote).collect())
    }

    async fn get_metadata(&self, path: &str) -> Result<Option<RemoteObject>> {
        let remote = self.remote(path);
        recover("file info", &remote, self.client.file_info(&remote).await)
    }

    async fn get_size(&self, path: &str) -> Result<Option<u64>> {
        Ok(self
            .get_metadata(path)
            .await?
            .map(|info| info.real_file_size_in_bytes))
    }

    async fn get_mimetype(&self, _path: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn get_timestamp(&self, path: &str) -> Result<Option<i64>> {
        Ok(self.get_metadata(path).await?.map(|info| info.timestamp()))
    }

    async fn get_visibility(&self, _path: &str) -> Result<Option<Visibility>> {
        Ok(None)
    }

    async fn get_url(&self, path: &str) -> Result<String> {
        self.client
            .url(&self.remote(path))
            .await
            .with_context(|| format!("resolving URL of '{}' failed", path))
    }
}
