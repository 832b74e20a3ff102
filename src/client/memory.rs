//! In-process client with Backtory semantics.
//!
//! Keeps objects in memory and records every call it receives, which makes
//! it the reference double for adapter tests and a usable driver for
//! development setups without network access.

use async_lock::{Mutex, RwLock};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::error::BacktoryError;
use super::keys;
use super::traits::{BacktoryClient, BoxedClient, ClientConnector};
use super::types::{ClientSettings, FileRename, RemoteObject, Upload};

/// A call received by a [`MemoryClient`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCall {
    Put { directory: String, name: String },
    Move { path: String, destination: String },
    Rename { path: String, new_name: String },
    RenameFiles(Vec<FileRename>),
    Copy { path: String, new_path: String },
    Delete(String),
    CreateDirectory(String),
    Exists(String),
    Get(String),
    DirectoryInfo(String),
    FileInfo(String),
    Url(String),
}

/// A failure to raise whenever a call touches a given path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    NotFound,
    Rejected,
    Transport,
}

impl InjectedFailure {
    fn to_error(self, path: &str) -> BacktoryError {
        match self {
            InjectedFailure::NotFound => BacktoryError::NotFound(path.to_string()),
            InjectedFailure::Rejected => BacktoryError::Rejected(path.to_string()),
            InjectedFailure::Transport => {
                BacktoryError::Transport(format!("connection reset while accessing {}", path))
            }
        }
    }
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    modified_ms: i64,
}

#[derive(Debug, Default)]
struct MemoryState {
    /// File objects by key.
    objects: BTreeMap<String, StoredObject>,
    /// Explicitly created directory keys with their creation time.
    directories: BTreeMap<String, i64>,
}

impl MemoryState {
    fn directory_exists(&self, dir_key: &str) -> bool {
        dir_key.is_empty()
            || self.directories.keys().any(|k| k.starts_with(dir_key))
            || self.objects.keys().any(|k| k.starts_with(dir_key))
    }

    /// Newest modification time at or below a directory.
    fn directory_modified(&self, dir_key: &str) -> i64 {
        let created = self.directories.get(dir_key).copied().unwrap_or(0);
        self.objects
            .iter()
            .filter(|(k, _)| k.starts_with(dir_key))
            .map(|(_, o)| o.modified_ms)
            .fold(created, i64::max)
    }
}

/// In-memory Backtory client.
///
/// Clones share the same store and journal.
#[derive(Clone)]
pub struct MemoryClient {
    settings: ClientSettings,
    state: Arc<RwLock<MemoryState>>,
    journal: Arc<Mutex<Vec<ClientCall>>>,
    failures: Arc<Mutex<HashMap<String, InjectedFailure>>>,
}

impl MemoryClient {
    /// Create an empty store.
    pub fn new(settings: ClientSettings) -> Self {
        Self {
            settings,
            state: Arc::new(RwLock::new(MemoryState::default())),
            journal: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// A handle on the same store that reports different settings.
    pub fn with_settings(&self, settings: ClientSettings) -> Self {
        Self {
            settings,
            ..self.clone()
        }
    }

    /// A connector that hands out handles on this store.
    pub fn connector(&self) -> impl ClientConnector + 'static {
        let client = self.clone();
        move |settings: ClientSettings| -> Result<BoxedClient, BacktoryError> {
            tracing::debug!(storage_id = %settings.storage_id, "Connecting in-memory Backtory client");
            Ok(Arc::new(client.with_settings(settings)) as BoxedClient)
        }
    }

    /// Store an object with a fixed modification time.
    pub async fn insert_object(&self, path: &str, data: impl Into<Bytes>, modified_ms: i64) {
        let mut state = self.state.write().await;
        state.objects.insert(
            keys::object_key(path),
            StoredObject {
                data: data.into(),
                modified_ms,
            },
        );
    }

    /// Content of an object, if present.
    pub async fn object(&self, path: &str) -> Option<Bytes> {
        let state = self.state.read().await;
        state.objects.get(&keys::object_key(path)).map(|o| o.data.clone())
    }

    /// All file object keys, sorted.
    pub async fn object_keys(&self) -> Vec<String> {
        let state = self.state.read().await;
        state.objects.keys().cloned().collect()
    }

    /// Make every call that touches `path` fail. Moves also fail when
    /// `path` is their destination.
    pub async fn fail_on(&self, path: &str, failure: InjectedFailure) {
        let mut failures = self.failures.lock().await;
        failures.insert(keys::object_key(path), failure);
    }

    /// Calls received so far.
    pub async fn calls(&self) -> Vec<ClientCall> {
        self.journal.lock().await.clone()
    }

    pub async fn clear_calls(&self) {
        self.journal.lock().await.clear();
    }

    async fn record(&self, call: ClientCall) {
        self.journal.lock().await.push(call);
    }

    async fn check_failure(&self, path: &str) -> Result<(), BacktoryError> {
        let failures = self.failures.lock().await;
        match failures.get(&keys::object_key(path)) {
            Some(failure) => Err(failure.to_error(path)),
            None => Ok(()),
        }
    }

    fn now_ms() -> i64 {
        Utc::now().timestamp_millis()
    }

    fn file_object(&self, key: &str, object: &StoredObject) -> RemoteObject {
        RemoteObject {
            url: format!("{}/{}", self.settings.base_url(), key),
            is_directory: false,
            last_modification_date: object.modified_ms,
            real_file_size_in_bytes: object.data.len() as u64,
        }
    }

    fn directory_object(&self, dir_key: &str, modified_ms: i64) -> RemoteObject {
        RemoteObject {
            url: format!("{}/{}", self.settings.base_url(), dir_key),
            is_directory: true,
            last_modification_date: modified_ms,
            real_file_size_in_bytes: 0,
        }
    }

    async fn rename_key(&self, path: &str, new_name: &str) -> Result<String, BacktoryError> {
        self.check_failure(path).await?;
        if new_name.is_empty() || new_name.contains('/') {
            return Err(BacktoryError::Rejected(format!(
                "invalid file name '{}' for {}",
                new_name, path
            )));
        }

        let key = keys::object_key(path);
        let mut state = self.state.write().await;
        let object = state
            .objects
            .remove(&key)
            .ok_or_else(|| BacktoryError::NotFound(path.to_string()))?;
        let new_key = format!("{}{}", keys::parent(&key), new_name);
        state.objects.insert(new_key.clone(), object);
        Ok(new_key)
    }
}

impl std::fmt::Debug for MemoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryClient")
            .field("settings", &self.settings)
            .field("state", &"<MemoryState>")
            .finish()
    }
}

#[async_trait]
impl BacktoryClient for MemoryClient {
    fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    async fn put(&self, upload: Upload, directory: &str) -> Result<Vec<String>, BacktoryError> {
        self.record(ClientCall::Put {
            directory: directory.to_string(),
            name: upload.name.clone(),
        })
        .await;
        self.check_failure(directory).await?;

        let key = keys::join(directory, &upload.name);
        let data = upload.into_bytes().await?;

        let mut state = self.state.write().await;
        state.objects.insert(
            key.clone(),
            StoredObject {
                data,
                modified_ms: Self::now_ms(),
            },
        );
        Ok(vec![key])
    }

    async fn move_file(&self, path: &str, destination: &str) -> Result<bool, BacktoryError> {
        self.record(ClientCall::Move {
            path: path.to_string(),
            destination: destination.to_string(),
        })
        .await;
        self.check_failure(path).await?;
        self.check_failure(destination).await?;

        let key = keys::object_key(path);
        let mut state = self.state.write().await;
        let object = state
            .objects
            .remove(&key)
            .ok_or_else(|| BacktoryError::NotFound(path.to_string()))?;
        let new_key = keys::join(destination, keys::leaf(&key));
        state.objects.insert(new_key, object);
        Ok(true)
    }

    async fn rename(&self, path: &str, new_name: &str) -> Result<bool, BacktoryError> {
        self.record(ClientCall::Rename {
            path: path.to_string(),
            new_name: new_name.to_string(),
        })
        .await;
        self.rename_key(path, new_name).await?;
        Ok(true)
    }

    async fn rename_files(&self, renames: &[FileRename]) -> Result<Vec<String>, BacktoryError> {
        self.record(ClientCall::RenameFiles(renames.to_vec())).await;

        let mut renamed = Vec::with_capacity(renames.len());
        for rename in renames {
            renamed.push(self.rename_key(&rename.path, &rename.new_name).await?);
        }
        Ok(renamed)
    }

    async fn copy(&self, path: &str, new_path: &str) -> Result<bool, BacktoryError> {
        self.record(ClientCall::Copy {
            path: path.to_string(),
            new_path: new_path.to_string(),
        })
        .await;
        self.check_failure(path).await?;

        let mut state = self.state.write().await;
        let object = state
            .objects
            .get(&keys::object_key(path))
            .cloned()
            .ok_or_else(|| BacktoryError::NotFound(path.to_string()))?;
        state.objects.insert(
            keys::object_key(new_path),
            StoredObject {
                data: object.data,
                modified_ms: Self::now_ms(),
            },
        );
        Ok(true)
    }

    async fn delete(&self, path: &str) -> Result<(), BacktoryError> {
        self.record(ClientCall::Delete(path.to_string())).await;
        self.check_failure(path).await?;

        let mut state = self.state.write().await;
        if path.ends_with('/') {
            let dir_key = keys::directory_key(path);
            if !state.directory_exists(&dir_key) {
                return Err(BacktoryError::NotFound(path.to_string()));
            }
            state.objects.retain(|k, _| !k.starts_with(&dir_key));
            state.directories.retain(|k, _| !k.starts_with(&dir_key));
            return Ok(());
        }

        state
            .objects
            .remove(&keys::object_key(path))
            .map(|_| ())
            .ok_or_else(|| BacktoryError::NotFound(path.to_string()))
    }

    async fn create_directory(&self, path: &str) -> Result<RemoteObject, BacktoryError> {
        self.record(ClientCall::CreateDirectory(path.to_string())).await;
        self.check_failure(path).await?;

        let dir_key = keys::directory_key(path);
        if dir_key.is_empty() {
            return Err(BacktoryError::Rejected("cannot create the root directory".to_string()));
        }

        let created = Self::now_ms();
        let mut state = self.state.write().await;
        if state.objects.contains_key(dir_key.trim_end_matches('/')) {
            return Err(BacktoryError::Rejected(format!("{} is a file", path)));
        }
        state.directories.entry(dir_key.clone()).or_insert(created);
        Ok(self.directory_object(&dir_key, created))
    }

    async fn exists(&self, path: &str) -> Result<bool, BacktoryError> {
        self.record(ClientCall::Exists(path.to_string())).await;
        self.check_failure(path).await?;

        let state = self.state.read().await;
        let key = keys::object_key(path);
        Ok(state.objects.contains_key(&key) || state.directory_exists(&keys::directory_key(path)))
    }

    async fn get(&self, path: &str) -> Result<Bytes, BacktoryError> {
        self.record(ClientCall::Get(path.to_string())).await;
        self.check_failure(path).await?;

        let state = self.state.read().await;
        state
            .objects
            .get(&keys::object_key(path))
            .map(|o| o.data.clone())
            .ok_or_else(|| BacktoryError::NotFound(path.to_string()))
    }

    async fn directory_info(&self, path: &str) -> Result<Vec<RemoteObject>, BacktoryError> {
        self.record(ClientCall::DirectoryInfo(path.to_string())).await;
        self.check_failure(path).await?;

        let dir_key = keys::directory_key(path);
        let state = self.state.read().await;
        if !state.directory_exists(&dir_key) {
            return Err(BacktoryError::NotFound(path.to_string()));
        }

        let mut children: BTreeMap<String, RemoteObject> = BTreeMap::new();
        let descendants = state
            .objects
            .keys()
            .chain(state.directories.keys())
            .filter_map(|k| k.strip_prefix(dir_key.as_str()))
            .filter(|rest| !rest.is_empty());

        for rest in descendants {
            match rest.find('/') {
                Some(i) => {
                    let child = format!("{}{}", dir_key, &rest[..=i]);
                    if !children.contains_key(&child) {
                        let modified = state.directory_modified(&child);
                        children.insert(child.clone(), self.directory_object(&child, modified));
                    }
                }
                None => {
                    let child = format!("{}{}", dir_key, rest);
                    if let Some(object) = state.objects.get(&child) {
                        children.insert(child.clone(), self.file_object(&child, object));
                    }
                }
            }
        }

        Ok(children.into_values().collect())
    }

    async fn file_info(&self, path: &str) -> Result<RemoteObject, BacktoryError> {
        self.record(ClientCall::FileInfo(path.to_string())).await;
        self.check_failure(path).await?;

        let state = self.state.read().await;
        let key = keys::object_key(path);
        if !path.ends_with('/') {
            if let Some(object) = state.objects.get(&key) {
                return Ok(self.file_object(&key, object));
            }
        }

        let dir_key = keys::directory_key(path);
        if !dir_key.is_empty() && state.directory_exists(&dir_key) {
            return Ok(self.directory_object(&dir_key, state.directory_modified(&dir_key)));
        }

        Err(BacktoryError::NotFound(path.to_string()))
    }

    async fn url(&self, path: &str) -> Result<String, BacktoryError> {
        self.record(ClientCall::Url(path.to_string())).await;
        self.check_failure(path).await?;

        Ok(format!("{}/{}", self.settings.base_url(), keys::object_key(path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> MemoryClient {
        MemoryClient::new(ClientSettings::new(
            "id".to_string(),
            "key".to_string(),
            "sid".to_string(),
        ))
    }

    #[test]
    fn test_put_and_rename() {
        smol::block_on(async {
            let client = client();
            let upload = Upload::from_stream(Box::pin(futures::stream::once(async {
                Ok(Bytes::from_static(b"hello"))
            })));

            let paths = client.put(upload, "docs").await.unwrap();
            assert_eq!(paths.len(), 1);
            assert!(paths[0].starts_with("docs/"));

            client.rename(&paths[0], "readme.md").await.unwrap();
            assert_eq!(client.object("docs/readme.md").await.as_deref(), Some(&b"hello"[..]));
            assert_eq!(client.object_keys().await, vec!["docs/readme.md".to_string()]);
        });
    }

    #[test]
    fn test_put_into_root() {
        smol::block_on(async {
            let client = client();
            let upload = Upload::from_stream(Box::pin(futures::stream::empty()));
            let paths = client.put(upload, "/").await.unwrap();
            assert!(!paths[0].contains('/'));
        });
    }

    #[test]
    fn test_move_keeps_name() {
        smol::block_on(async {
            let client = client();
            client.insert_object("a/photo.png", "img", 1_000).await;

            assert!(client.move_file("a/photo.png", "b").await.unwrap());
            assert!(client.object("b/photo.png").await.is_some());
            assert!(client.object("a/photo.png").await.is_none());
        });
    }

    #[test]
    fn test_move_fails_on_destination() {
        smol::block_on(async {
            let client = client();
            client.insert_object("a/photo.png", "img", 0).await;
            client.fail_on("locked", InjectedFailure::Rejected).await;

            let err = client.move_file("a/photo.png", "locked").await.unwrap_err();
            assert!(err.is_distinguished());
            assert!(client.object("a/photo.png").await.is_some());
        });
    }

    #[test]
    fn test_rename_rejects_nested_name() {
        smol::block_on(async {
            let client = client();
            client.insert_object("a/x.txt", "x", 0).await;

            let err = client.rename("a/x.txt", "b/y.txt").await.unwrap_err();
            assert!(matches!(err, BacktoryError::Rejected(_)));
        });
    }

    #[test]
    fn test_rename_files_stops_at_first_failure() {
        smol::block_on(async {
            let client = client();
            client.insert_object("one.txt", "1", 0).await;

            let renames = vec![
                FileRename::new("one.txt", "uno.txt"),
                FileRename::new("two.txt", "dos.txt"),
            ];
            let err = client.rename_files(&renames).await.unwrap_err();
            assert!(matches!(err, BacktoryError::NotFound(_)));
            assert_eq!(client.object_keys().await, vec!["uno.txt".to_string()]);
        });
    }

    #[test]
    fn test_delete_directory_recursively() {
        smol::block_on(async {
            let client = client();
            client.insert_object("dir/a.txt", "a", 0).await;
            client.insert_object("dir/sub/b.txt", "b", 0).await;
            client.insert_object("other.txt", "c", 0).await;

            client.delete("dir/").await.unwrap();
            assert_eq!(client.object_keys().await, vec!["other.txt".to_string()]);

            let err = client.delete("dir/").await.unwrap_err();
            assert!(err.is_distinguished());
        });
    }

    #[test]
    fn test_directory_info_lists_direct_children() {
        smol::block_on(async {
            let client = client();
            client.insert_object("dir/a.txt", "aaa", 2_000).await;
            client.insert_object("dir/sub/b.txt", "b", 5_000).await;
            client.create_directory("dir/empty").await.unwrap();

            let entries = client.directory_info("dir").await.unwrap();
            let urls: Vec<&str> = entries.iter().map(|e| e.url.as_str()).collect();
            assert_eq!(
                urls,
                vec![
                    "https://storage.backtory.com/sid/dir/a.txt",
                    "https://storage.backtory.com/sid/dir/empty/",
                    "https://storage.backtory.com/sid/dir/sub/",
                ]
            );
            assert_eq!(entries[0].real_file_size_in_bytes, 3);
            assert!(entries[2].is_directory);
            assert_eq!(entries[2].last_modification_date, 5_000);
        });
    }

    #[test]
    fn test_directory_info_missing_directory() {
        smol::block_on(async {
            let err = client().directory_info("nope").await.unwrap_err();
            assert!(matches!(err, BacktoryError::NotFound(_)));
        });
    }

    #[test]
    fn test_file_info_and_exists() {
        smol::block_on(async {
            let client = client();
            client.insert_object("dir/a.txt", "abc", 1_234).await;

            let info = client.file_info("/dir/a.txt").await.unwrap();
            assert!(!info.is_directory);
            assert_eq!(info.real_file_size_in_bytes, 3);

            let dir = client.file_info("dir/").await.unwrap();
            assert!(dir.is_directory);

            assert!(client.exists("dir").await.unwrap());
            assert!(!client.exists("missing.txt").await.unwrap());
        });
    }

    #[test]
    fn test_injected_failure_and_journal() {
        smol::block_on(async {
            let client = client();
            client.fail_on("flaky.txt", InjectedFailure::Transport).await;

            let err = client.exists("flaky.txt").await.unwrap_err();
            assert!(!err.is_distinguished());
            assert_eq!(client.calls().await, vec![ClientCall::Exists("flaky.txt".to_string())]);

            client.clear_calls().await;
            assert!(client.calls().await.is_empty());
        });
    }

    #[test]
    fn test_connector_shares_store() {
        smol::block_on(async {
            let client = client();
            let connector = client.connector();
            let settings = ClientSettings::new("x".to_string(), "y".to_string(), "other".to_string());
            let connected = connector.connect(settings).unwrap();

            assert_eq!(connected.settings().storage_id, "other");
            connected.create_directory("shared").await.unwrap();
            assert!(client.exists("shared/").await.unwrap());
        });
    }
}
