//! Types exchanged with a Backtory storage client.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Default public endpoint of the Backtory storage service.
pub const DEFAULT_DOMAIN: &str = "https://storage.backtory.com";

/// A stream of byte chunks, used for uploads and streamed reads.
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Identity and request shaping for a storage client.
///
/// Built once per disk and handed to the client at construction time.
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientSettings {
    /// `X-Backtory-Authentication-Id`.
    pub authentication_id: String,
    /// `X-Backtory-Authentication-Key`.
    pub authentication_key: String,
    /// `X-Backtory-Storage-Id`.
    pub storage_id: String,
    /// Override for the service domain.
    pub domain: Option<String>,
    /// Extra headers sent with every request.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Extra query parameters sent with every request.
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

impl ClientSettings {
    /// Create settings from the three required credentials.
    pub fn new(authentication_id: String, authentication_key: String, storage_id: String) -> Self {
        Self {
            authentication_id,
            authentication_key,
            storage_id,
            domain: None,
            headers: HashMap::new(),
            parameters: HashMap::new(),
        }
    }

    pub fn with_domain(mut self, domain: String) -> Self {
        self.domain = Some(domain);
        self
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn with_parameters(mut self, parameters: HashMap<String, String>) -> Self {
        self.parameters.extend(parameters);
        self
    }

    /// The effective domain, without a trailing slash.
    pub fn domain(&self) -> &str {
        self.domain
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or(DEFAULT_DOMAIN)
            .trim_end_matches('/')
    }

    /// Public base URL under which this storage's objects are served.
    pub fn base_url(&self) -> String {
        format!("{}/{}", self.domain(), self.storage_id)
    }
}

impl std::fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSettings")
            .field("authentication_id", &self.authentication_id)
            .field("authentication_key", &"<redacted>")
            .field("storage_id", &self.storage_id)
            .field("domain", &self.domain)
            .field("headers", &self.headers)
            .field("parameters", &self.parameters)
            .finish()
    }
}

/// Metadata of a remote object or directory, as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
    /// Public URL of the object.
    pub url: String,
    /// Whether the object is a directory.
    pub is_directory: bool,
    /// Last modification time in epoch milliseconds.
    pub last_modification_date: i64,
    /// Object size in bytes.
    pub real_file_size_in_bytes: u64,
}

impl RemoteObject {
    /// Modification time in whole epoch seconds, rounded down.
    pub fn timestamp(&self) -> i64 {
        self.last_modification_date.div_euclid(1000)
    }

    /// Modification time as a UTC datetime.
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp_millis(self.last_modification_date)
    }
}

/// One entry of a batch rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRename {
    /// Current path of the object.
    pub path: String,
    /// New leaf name, kept in the same directory.
    pub new_name: String,
}

impl FileRename {
    pub fn new(path: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            new_name: new_name.into(),
        }
    }
}

/// Body of an upload.
pub enum UploadBody {
    /// A local file, read by the client when it sends the upload.
    File(PathBuf),
    /// Chunks forwarded as they arrive.
    Stream(ByteStream),
}

/// A single object to upload into a directory.
pub struct Upload {
    /// Name the uploaded object initially gets.
    pub name: String,
    pub body: UploadBody,
}

impl Upload {
    /// Upload a local file under its own file name.
    pub fn from_file(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(Self::generated_name);
        Self {
            name,
            body: UploadBody::File(path.to_path_buf()),
        }
    }

    /// Upload a stream under a generated name.
    pub fn from_stream(stream: ByteStream) -> Self {
        Self {
            name: Self::generated_name(),
            body: UploadBody::Stream(stream),
        }
    }

    fn generated_name() -> String {
        format!("{}.upload", Uuid::new_v4().simple())
    }

    /// Read the whole body into memory.
    pub async fn into_bytes(self) -> std::io::Result<Bytes> {
        use futures::TryStreamExt;

        match self.body {
            UploadBody::File(path) => Ok(Bytes::from(async_fs::read(&path).await?)),
            UploadBody::Stream(stream) => {
                let chunks: Vec<Bytes> = stream.try_collect().await?;
                Ok(Bytes::from(chunks.concat()))
            }
        }
    }
}

impl std::fmt::Debug for Upload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let body = match &self.body {
            UploadBody::File(path) => format!("file {}", path.display()),
            UploadBody::Stream(_) => "<stream>".to_string(),
        };
        f.debug_struct("Upload")
            .field("name", &self.name)
            .field("body", &body)
            .finish()
    }
}
