//! Backtory client semantics on top of an OpenDAL operator.
//!
//! Lets a disk run against any OpenDAL service while keeping the exact call shapes of the remote service. Object URLs
//! are still derived from the client settings.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use opendal::layers::LoggingLayer;
use opendal::services::Memory;
use opendal::{Metadata, Operator};
use std::sync::Arc;
use url::Url;

use super::error::BacktoryError;
use super::keys;
use super::traits::{BacktoryClient, BoxedClient, ClientConnector};
use super::types::{ClientSettings, FileRename, RemoteObject, Upload};

/// Backtory client backed by an OpenDAL [`Operator`].
///
/// OpenDAL services differ in what they support natively, so copy, move and
/// rename are carried out as read + write (+ delete).
pub struct OperatorClient {
    settings: ClientSettings,
    operator: Operator,
    base_url: Url,
}

impl OperatorClient {
    /// Wrap an existing operator.
    pub fn new(operator: Operator, settings: ClientSettings) -> Result<Self, BacktoryError> {
        let base_url = Url::parse(&format!("{}/", settings.base_url()))
            .map_err(|e| BacktoryError::Config(format!("invalid domain: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(BacktoryError::Config(format!("invalid domain: {}", settings.domain())));
        }

        Ok(Self {
            settings,
            operator,
            base_url,
        })
    }

    /// Client over a fresh in-memory OpenDAL service.
    pub fn memory(settings: ClientSettings) -> Result<Self, BacktoryError> {
        let operator = Operator::new(Memory::default())
            .map_err(|e| BacktoryError::Config(e.to_string()))?
            .layer(LoggingLayer::default())
            .finish();
        Self::new(operator, settings)
    }

    /// A connector that builds clients sharing `operator`.
    pub fn connector(operator: Operator) -> impl ClientConnector + 'static {
        move |settings: ClientSettings| -> Result<BoxedClient, BacktoryError> {
            Ok(Arc::new(OperatorClient::new(operator.clone(), settings)?) as BoxedClient)
        }
    }

    /// The wrapped operator.
    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    /// Object URL with each key segment percent-encoded. A directory key
    /// keeps its trailing `/`.
    fn object_url(&self, key: &str) -> Result<String, BacktoryError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| BacktoryError::Config(format!("cannot build URL for {}", key)))?;
            segments.pop_if_empty().extend(key.split('/'));
        }
        Ok(url.to_string())
    }

    fn to_remote_object(&self, key: &str, metadata: &Metadata) -> Result<RemoteObject, BacktoryError> {
        let is_directory = metadata.is_dir();
        Ok(RemoteObject {
            url: self.object_url(key)?,
            is_directory,
            last_modification_date: metadata
                .last_modified()
                .map(|t| t.timestamp_millis())
                .unwrap_or(0),
            real_file_size_in_bytes: if is_directory { 0 } else { metadata.content_length() },
        })
    }

    /// OpenDAL lists the root as "/".
    fn list_path(dir_key: &str) -> &str {
        if dir_key.is_empty() { "/" } else { dir_key }
    }

    async fn read_key(&self, key: &str) -> Result<Bytes, BacktoryError> {
        let buffer = self
            .operator
            .read(key)
            .await
            .map_err(|e| BacktoryError::from_opendal(key, e))?;
        Ok(buffer.to_bytes())
    }

    async fn write_key(&self, key: &str, data: Bytes) -> Result<(), BacktoryError> {
        self.operator
            .write(key, data)
            .await
            .map_err(|e| BacktoryError::from_opendal(key, e))?;
        Ok(())
    }

    async fn relocate(&self, from: &str, to: &str) -> Result<(), BacktoryError> {
        if from.ends_with('/') {
            return Err(BacktoryError::Rejected(format!("{} is a directory", from)));
        }
        let data = self.read_key(from).await?;
        self.write_key(to, data).await?;
        self.operator
            .delete(from)
            .await
            .map_err(|e| BacktoryError::from_opendal(from, e))
    }

    async fn rename_key(&self, path: &str, new_name: &str) -> Result<String, BacktoryError> {
        if new_name.is_empty() || new_name.contains('/') {
            return Err(BacktoryError::Rejected(format!(
                "invalid file name '{}' for {}",
                new_name, path
            )));
        }
        let key = keys::object_key(path);
        let new_key = format!("{}{}", keys::parent(&key), new_name);
        self.relocate(&key, &new_key).await?;
        Ok(new_key)
    }

    async fn has_children(&self, dir_key: &str) -> Result<bool, BacktoryError> {
        let entries = self
            .operator
            .list(Self::list_path(dir_key))
            .await
            .map_err(|e| BacktoryError::from_opendal(dir_key, e))?;
        Ok(entries.iter().any(|e| e.path() != dir_key))
    }
}

impl std::fmt::Debug for OperatorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorClient")
            .field("settings", &self.settings)
            .field("operator", &self.operator.info().scheme())
            .finish()
    }
}

#[async_trait]
impl BacktoryClient for OperatorClient {
    fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    async fn put(&self, upload: Upload, directory: &str) -> Result<Vec<String>, BacktoryError> {
        let key = keys::join(directory, &upload.name);
        let data = upload.into_bytes().await?;
        self.write_key(&key, data).await?;
        Ok(vec![key])
    }

    async fn move_file(&self, path: &str, destination: &str) -> Result<bool, BacktoryError> {
        let key = keys::object_key(path);
        let new_key = keys::join(destination, keys::leaf(&key));
        self.relocate(&key, &new_key).await?;
        Ok(true)
    }

    async fn rename(&self, path: &str, new_name: &str) -> Result<bool, BacktoryError> {
        self.rename_key(path, new_name).await?;
        Ok(true)
    }

    async fn rename_files(&self, renames: &[FileRename]) -> Result<Vec<String>, BacktoryError> {
        let mut renamed = Vec::with_capacity(renames.len());
        for rename in renames {
            renamed.push(self.rename_key(&rename.path, &rename.new_name).await?);
        }
        Ok(renamed)
    }

    async fn copy(&self, path: &str, new_path: &str) -> Result<bool, BacktoryError> {
        let data = self.read_key(&keys::object_key(path)).await?;
        self.write_key(&keys::object_key(new_path), data).await?;
        Ok(true)
    }

    async fn delete(&self, path: &str) -> Result<(), BacktoryError> {
        if path.ends_with('/') {
            let dir_key = keys::directory_key(path);
            if !self.has_children(&dir_key).await? && !self.exists(&dir_key).await? {
                return Err(BacktoryError::NotFound(path.to_string()));
            }
            return self
                .operator
                .remove_all(Self::list_path(&dir_key))
                .await
                .map_err(|e| BacktoryError::from_opendal(path, e));
        }

        let key = keys::object_key(path);
        if !self.operator.exists(&key).await.map_err(|e| BacktoryError::from_opendal(&key, e))? {
            return Err(BacktoryError::NotFound(path.to_string()));
        }
        self.operator
            .delete(&key)
            .await
            .map_err(|e| BacktoryError::from_opendal(&key, e))
    }

    async fn create_directory(&self, path: &str) -> Result<RemoteObject, BacktoryError> {
        let dir_key = keys::directory_key(path);
        if dir_key.is_empty() {
            return Err(BacktoryError::Rejected("cannot create the root directory".to_string()));
        }

        // Object stores without directory support get directories implicitly.
        if self.operator.info().full_capability().create_dir {
            self.operator
                .create_dir(&dir_key)
                .await
                .map_err(|e| BacktoryError::from_opendal(&dir_key, e))?;
        }

        Ok(RemoteObject {
            url: self.object_url(&dir_key)?,
            is_directory: true,
            last_modification_date: chrono::Utc::now().timestamp_millis(),
            real_file_size_in_bytes: 0,
        })
    }

    async fn exists(&self, path: &str) -> Result<bool, BacktoryError> {
        let key = keys::object_key(path);
        if key.is_empty() {
            return Ok(true);
        }
        if self
            .operator
            .exists(&key)
            .await
            .map_err(|e| BacktoryError::from_opendal(&key, e))?
        {
            return Ok(true);
        }
        self.has_children(&keys::directory_key(path)).await
    }

    async fn get(&self, path: &str) -> Result<Bytes, BacktoryError> {
        self.read_key(&keys::object_key(path)).await
    }

    async fn directory_info(&self, path: &str) -> Result<Vec<RemoteObject>, BacktoryError> {
        let dir_key = keys::directory_key(path);
        let mut lister = self
            .operator
            .lister_with(Self::list_path(&dir_key))
            .await
            .map_err(|e| BacktoryError::from_opendal(path, e))?;

        let mut objects = Vec::new();
        while let Some(entry) = lister.next().await {
            let entry = entry.map_err(|e| BacktoryError::from_opendal(path, e))?;
            let entry_path = entry.path();
            if entry_path == dir_key || entry_path == "/" {
                continue;
            }

            // Services that list without file timestamps need a stat.
            let metadata = entry.metadata();
            if metadata.is_file() && metadata.last_modified().is_none() {
                let metadata = self
                    .operator
                    .stat(entry_path)
                    .await
                    .map_err(|e| BacktoryError::from_opendal(entry_path, e))?;
                objects.push(self.to_remote_object(entry_path, &metadata)?);
            } else {
                objects.push(self.to_remote_object(entry_path, metadata)?);
            }
        }

        if objects.is_empty() && !dir_key.is_empty() && !self.exists(&dir_key).await? {
            return Err(BacktoryError::NotFound(path.to_string()));
        }

        objects.sort_by(|a, b| a.url.cmp(&b.url));
        Ok(objects)
    }

    async fn file_info(&self, path: &str) -> Result<RemoteObject, BacktoryError> {
        let key = keys::object_key(path);
        match self.operator.stat(&key).await {
            Ok(metadata) => self.to_remote_object(&key, &metadata),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound && !key.ends_with('/') => {
                let dir_key = keys::directory_key(path);
                if self.has_children(&dir_key).await? {
                    let metadata = Metadata::new(opendal::EntryMode::DIR);
                    self.to_remote_object(&dir_key, &metadata)
                } else {
                    Err(BacktoryError::NotFound(path.to_string()))
                }
            }
            Err(e) => Err(BacktoryError::from_opendal(path, e)),
        }
    }

    async fn url(&self, path: &str) -> Result<String, BacktoryError> {
        self.object_url(&keys::object_key(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OperatorClient {
        OperatorClient::memory(ClientSettings::new(
            "id".to_string(),
            "key".to_string(),
            "sid".to_string(),
        ))
        .unwrap()
    }

    fn upload(data: &'static [u8]) -> Upload {
        Upload::from_stream(Box::pin(futures::stream::once(async move {
            Ok(Bytes::from_static(data))
        })))
    }

    #[test]
    fn test_invalid_domain_is_config_error() {
        let settings = ClientSettings::new("id".to_string(), "key".to_string(), "sid".to_string())
            .with_domain("not a url".to_string());
        let err = OperatorClient::memory(settings).unwrap_err();
        assert!(matches!(err, BacktoryError::Config(_)));
    }

    #[test]
    fn test_url_is_percent_encoded() {
        smol::block_on(async {
            let url = client().url("/my dir/a b.txt").await.unwrap();
            assert_eq!(url, "https://storage.backtory.com/sid/my%20dir/a%20b.txt");
        });
    }

    #[test]
    fn test_url_keeps_reserved_characters_in_path() {
        smol::block_on(async {
            let client = client();
            assert_eq!(
                client.url("x:y.txt").await.unwrap(),
                "https://storage.backtory.com/sid/x:y.txt"
            );
            assert_eq!(
                client.url("reports/report#1.txt").await.unwrap(),
                "https://storage.backtory.com/sid/reports/report%231.txt"
            );
            assert_eq!(
                client.url("q?a=1.txt").await.unwrap(),
                "https://storage.backtory.com/sid/q%3Fa=1.txt"
            );
            assert_eq!(
                client.url("dir/sub/").await.unwrap(),
                "https://storage.backtory.com/sid/dir/sub/"
            );
        });
    }

    #[test]
    fn test_listing_names_with_reserved_characters() {
        smol::block_on(async {
            let client = client();
            let a = client.put(upload(b"a"), "dir").await.unwrap();
            client.rename(&a[0], "x:y.txt").await.unwrap();
            let b = client.put(upload(b"b"), "dir").await.unwrap();
            client.rename(&b[0], "report#1.txt").await.unwrap();

            let entries = client.directory_info("dir").await.unwrap();
            let urls: Vec<&str> = entries.iter().map(|e| e.url.as_str()).collect();
            assert_eq!(
                urls,
                vec![
                    "https://storage.backtory.com/sid/dir/report%231.txt",
                    "https://storage.backtory.com/sid/dir/x:y.txt",
                ]
            );
            assert!(entries.iter().all(|e| !e.is_directory && e.real_file_size_in_bytes == 1));
        });
    }

    #[test]
    fn test_connector_shares_operator() {
        smol::block_on(async {
            let first = client();
            let connector = OperatorClient::connector(first.operator().clone());
            let settings = ClientSettings::new("id".to_string(), "key".to_string(), "other".to_string());
            let second = connector.connect(settings).unwrap();

            let paths = first.put(upload(b"shared"), "common").await.unwrap();
            assert_eq!(&second.get(&paths[0]).await.unwrap()[..], b"shared");
            assert!(second.url(&paths[0]).await.unwrap().starts_with("https://storage.backtory.com/other/"));
        });
    }

    #[test]
    fn test_put_rename_get() {
        smol::block_on(async {
            let client = client();
            let paths = client.put(upload(b"payload"), "docs").await.unwrap();

            assert!(client.rename(&paths[0], "notes.txt").await.unwrap());
            let data = client.get("docs/notes.txt").await.unwrap();
            assert_eq!(&data[..], b"payload");

            let err = client.get(&paths[0]).await.unwrap_err();
            assert!(matches!(err, BacktoryError::NotFound(_)));
        });
    }

    #[test]
    fn test_copy_and_move() {
        smol::block_on(async {
            let client = client();
            let paths = client.put(upload(b"x"), "/").await.unwrap();

            assert!(client.copy(&paths[0], "copy.bin").await.unwrap());
            assert!(client.move_file("copy.bin", "archive").await.unwrap());
            assert!(client.exists("archive/copy.bin").await.unwrap());
            assert!(!client.exists("copy.bin").await.unwrap());
        });
    }

    #[test]
    fn test_directory_info_and_file_info() {
        smol::block_on(async {
            let client = client();
            let a = client.put(upload(b"abc"), "dir").await.unwrap();
            client.rename(&a[0], "a.txt").await.unwrap();
            let b = client.put(upload(b"b"), "dir/sub").await.unwrap();
            client.rename(&b[0], "b.txt").await.unwrap();

            let entries = client.directory_info("dir").await.unwrap();
            assert_eq!(entries.len(), 2);
            let file = entries.iter().find(|e| !e.is_directory).unwrap();
            assert!(file.url.ends_with("/dir/a.txt"));
            assert_eq!(file.real_file_size_in_bytes, 3);
            assert!(entries.iter().any(|e| e.is_directory && e.url.ends_with("/dir/sub/")));

            let info = client.file_info("dir/a.txt").await.unwrap();
            assert_eq!(info.real_file_size_in_bytes, 3);

            let err = client.file_info("dir/missing.txt").await.unwrap_err();
            assert!(err.is_distinguished());
        });
    }

    #[test]
    fn test_delete_object_and_directory() {
        smol::block_on(async {
            let client = client();
            let a = client.put(upload(b"a"), "dir").await.unwrap();
            client.put(upload(b"b"), "dir/sub").await.unwrap();

            client.delete(&a[0]).await.unwrap();
            let err = client.delete(&a[0]).await.unwrap_err();
            assert!(matches!(err, BacktoryError::NotFound(_)));

            client.delete("dir/").await.unwrap();
            assert!(!client.exists("dir").await.unwrap());
        });
    }
}
