//! Types of the filesystem contract.
//!
//! These are the shapes the host's storage registry passes in and expects
//! back, independent of the Backtory client.

use serde::{Deserialize, Serialize};

use crate::client::{FileRename, RemoteObject};

/// Visibility of a stored file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

/// Per-call write options.
///
/// Backtory has no notion of visibility or content type, so the adapter
/// accepts these and ignores them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteConfig {
    pub visibility: Option<Visibility>,
    pub mimetype: Option<String>,
}

impl WriteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn with_mimetype(mut self, mimetype: impl Into<String>) -> Self {
        self.mimetype = Some(mimetype.into());
        self
    }
}

/// One path or several.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSet {
    One(String),
    Many(Vec<String>),
}

impl PathSet {
    /// The paths in call order.
    pub fn into_vec(self) -> Vec<String> {
        match self {
            PathSet::One(path) => vec![path],
            PathSet::Many(paths) => paths,
        }
    }
}

impl From<&str> for PathSet {
    fn from(path: &str) -> Self {
        PathSet::One(path.to_string())
    }
}

impl From<String> for PathSet {
    fn from(path: String) -> Self {
        PathSet::One(path)
    }
}

impl From<Vec<String>> for PathSet {
    fn from(paths: Vec<String>) -> Self {
        PathSet::Many(paths)
    }
}

impl From<&[&str]> for PathSet {
    fn from(paths: &[&str]) -> Self {
        PathSet::Many(paths.iter().map(|p| p.to_string()).collect())
    }
}

/// What to rename: a single object, or a batch of in-place renames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameSource {
    One(String),
    Batch(Vec<FileRename>),
}

impl From<&str> for RenameSource {
    fn from(path: &str) -> Self {
        RenameSource::One(path.to_string())
    }
}

impl From<String> for RenameSource {
    fn from(path: String) -> Self {
        RenameSource::One(path)
    }
}

impl From<Vec<FileRename>> for RenameSource {
    fn from(renames: Vec<FileRename>) -> Self {
        RenameSource::Batch(renames)
    }
}

/// The client's answer to a rename, passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    /// Result of a single move or rename.
    Single(bool),
    /// New paths reported by a batch rename.
    Batch(Vec<String>),
}

impl RenameOutcome {
    /// Best-effort success flag.
    pub fn succeeded(&self) -> bool {
        match self {
            RenameOutcome::Single(ok) => *ok,
            RenameOutcome::Batch(paths) => !paths.is_empty(),
        }
    }
}

/// Kind of a listing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Dir,
    File,
}

/// A normalized directory listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEntry {
    /// Leaf path relative to the listed directory, with a leading `/`.
    pub path: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    /// Modification time in epoch seconds.
    pub timestamp: i64,
    /// Size in bytes.
    pub size: u64,
}

impl ListEntry {
    /// Normalize a remote object into a listing entry.
    ///
    /// The path is the object's URL with the URL's own parent stripped, so
    /// `https://host/storage/dir/a.txt` becomes `/a.txt` and a directory URL
    /// `https://host/storage/dir/sub/` becomes `/sub/`.
    pub fn from_remote(object: &RemoteObject) -> Self {
        Self {
            path: strip_parent(&object.url).to_string(),
            entry_type: if object.is_directory {
                EntryType::Dir
            } else {
                EntryType::File
            },
            timestamp: object.timestamp(),
            size: object.real_file_size_in_bytes,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Dir
    }
}

fn strip_parent(url: &str) -> &str {
    let trimmed = url.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(i) if i > 0 => &url[i..],
        _ => url,
    }
}

/// Outcome of a sequential delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReport {
    /// Paths deleted before the first failure, in call order.
    pub deleted: Vec<String>,
    /// The path whose delete failed, if any. Later paths were not attempted.
    pub failed: Option<String>,
}

impl DeleteReport {
    /// Every requested path was deleted.
    pub fn is_complete(&self) -> bool {
        self.failed.is_none()
    }

    /// Some paths were deleted before a failure.
    pub fn is_partial(&self) -> bool {
        self.failed.is_some() && !self.deleted.is_empty()
    }
}
