//! Filesystem contract and the Backtory driver.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    StorageRegistry                          │
//! │  - Maps driver names to factories                           │
//! │  - Resolves and caches disks by name                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │  "backtory" (BacktoryServiceProvider)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Filesystem                               │
//! │  - Derefs to the FilesystemAdapter contract                 │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    BacktoryAdapter                          │
//! │  - Splits paths, applies the disk prefix                    │
//! │  - Classifies client errors into negative answers           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │  BoxedClient
//!              ┌───────────────┴───────────────┐
//!              ▼                               ▼
//! ┌──────────────────────────┐   ┌──────────────────────────────┐
//! │   MemoryClient           │   │   OperatorClient (OpenDAL)   │
//! └──────────────────────────┘   └──────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use backtory_storage::client::{ClientSettings, MemoryClient};
//! use backtory_storage::storage::{BacktoryServiceProvider, StorageRegistry};
//!
//! let mut registry = StorageRegistry::new();
//! BacktoryServiceProvider::new(MemoryClient::new(settings).connector()).boot(&mut registry);
//!
//! registry.configure_disks(serde_json::json!({
//!     "media": {
//!         "driver": "backtory",
//!         "X-Backtory-Authentication-Id": "...",
//!         "X-Backtory-Authentication-Key": "...",
//!         "X-Backtory-Storage-Id": "...",
//!     }
//! }))?;
//!
//! let media = registry.disk("media")?;
//! media.write("avatars/42.png", &png, &WriteConfig::default()).await?;
//! ```

mod backtory;
mod classify;
mod config;
mod factory;
mod filesystem;
mod paths;
mod traits;
mod types;

pub use backtory::BacktoryAdapter;
pub use config::{AUTHENTICATION_ID_KEY, AUTHENTICATION_KEY_KEY, DiskConfig, STORAGE_ID_KEY};
pub use factory::{BacktoryServiceProvider, DriverFactory, StorageRegistry};
pub use filesystem::Filesystem;
pub use paths::{PathSplit, split_path};
pub use traits::{BoxedFilesystemAdapter, FilesystemAdapter};
pub use types::{
    DeleteReport, EntryType, ListEntry, PathSet, RenameOutcome, RenameSource, Visibility,
    WriteConfig,
};
