//! Remote record store adapters for Registrar.
//!
//! The backing API exposes only per-entity CRUD: list, get, create, full
//! replacement update, and delete. There are no batch calls, no
//! relationship endpoints, no transactions, and no conditional writes;
//! the last write wins.
//!
//! # Adapters
//!
//! - [`HttpStore`]: the REST API (`/students`, `/classes`, ...)
//! - [`memory::MemoryStore`]: an in-process store with fault injection,
//!   used as the injected fake in tests and demos
//!
//! Both implement [`RemoteStore`], the seam the sync layer is written
//! against.

mod config;
mod error;
mod http;
pub mod memory;
mod store;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use http::HttpStore;
pub use store::{RemoteStore, StoreOp};
