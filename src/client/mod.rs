//! Backtory storage client seam.
//!
//! The adapter consumes a [`BacktoryClient`]; this module defines that
//! contract and ships two implementations that speak the same semantics
//! without a network:
//!
//! - [`MemoryClient`] keeps objects in process and journals every call
//! - [`OperatorClient`] maps the calls onto an OpenDAL operator
//!
//! Clients are constructed explicitly from [`ClientSettings`] and injected
//! into each adapter. Nothing here holds process-wide state.

mod error;
mod keys;
mod memory;
mod operator;
mod traits;
mod types;

pub use error::BacktoryError;
pub use memory::{ClientCall, InjectedFailure, MemoryClient};
pub use operator::OperatorClient;
pub use traits::{BacktoryClient, BoxedClient, ClientConnector};
pub use types::{
    ByteStream, ClientSettings, DEFAULT_DOMAIN, FileRename, RemoteObject, Upload, UploadBody,
};
