//! Model version registry
//!
//! Persistent state behind the potability service:
//! - `registry`: which versions exist and which one is current
//! - `storage`: per-version predictor and scaler blobs
//! - `incremental`: append-only user-labelled samples
//!
//! Everything lives in one versions directory. The registry file and every
//! artifact are replaced atomically (temp file + rename).

pub mod errors;
pub mod incremental;
pub mod registry;
pub mod storage;
pub mod types;

pub use errors::{RegistryError, Result};
pub use incremental::{IncrementalStore, INCREMENTAL_FILE};
pub use registry::{VersionRegistry, METADATA_FILE};
pub use storage::ModelStore;
pub use types::{VersionId, VersionRecord, VersionView};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
