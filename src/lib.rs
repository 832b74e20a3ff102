//! Backtory Storage driver for a named-disk filesystem registry.
//!
//! [`storage`] holds the filesystem contract, the Backtory adapter and the
//! service provider that registers it. [`client`] holds the client seam the
//! adapter talks to.

pub mod client;
pub mod storage;

pub use client::{BacktoryClient, BacktoryError, BoxedClient, ClientConnector, ClientSettings};
pub use storage::{
    BacktoryAdapter, BacktoryServiceProvider, Filesystem, FilesystemAdapter, StorageRegistry,
};
