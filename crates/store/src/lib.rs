//! Pluggable key/value blob storage.
//!
//! A [`Registry`] maps driver names to constructors and resolves a
//! configuration blob into a [`StoreHandle`]: the uniform
//! [`KeyValStore`] contract plus the optional [`MetaStore`] capability
//! when the driver supports it.
//!
//! Two drivers ship with the crate:
//!
//! - **memory** — non-durable reference driver, used mostly in tests
//! - **filesystem** — maps keys to paths (optionally through a key
//!   digest) and keeps a durable metadata sidecar next to the blobs

pub mod error;
pub mod filesystem;
pub mod info;
pub mod memory;
pub mod registry;
pub mod store;

pub use error::{Result, StoreError};
pub use filesystem::{FilesystemOptions, FilesystemStore, HashMode};
pub use info::Info;
pub use memory::MemoryStore;
pub use registry::{DriverOptions, Registry};
pub use store::{BoxReader, KeyValStore, MetaStore, StoreHandle, Visitor};
