//! Object storage the agent streams into and out of.
//!
//! The agent only needs two capabilities from a backend: open an object for reading by
//! key, and open an object for writing by key. Everything else (buckets, credentials,
//! the wire protocol) stays behind the [`ByteStore`] trait.
//!
//! # Key Components
//!
//! - [`ByteStore`]: Opens readable/writable byte streams addressed by key.
//! - [`ObjectWriter`]: A write stream whose object only becomes visible on [`ObjectWriter::commit`].
//! - [`FsStore`]: Directory-backed store used for `file://` URLs and plain paths.
//!
//! # URLs
//!
//! [`open`] picks a backend from the configured `lfs.url`:
//!
//! - `file:///srv/lfs/objects` or `/srv/lfs/objects`: [`FsStore`] rooted at that directory.
//! - Any other `scheme://` URL is rejected with [`StoreError::UnsupportedUrl`].
use std::{
    io::{self, Read, Write},
    path::PathBuf,
};

use thiserror::Error;

pub mod fs;

pub use fs::FsStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unsupported store url '{0}'")]
    UnsupportedUrl(String),

    #[error("invalid object key '{0}': keys must stay inside the store namespace")]
    InvalidKey(String),

    #[error("failed to open object '{key}': {source}")]
    Open {
        key: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to commit object '{key}': {source}")]
    Commit {
        key: String,
        #[source]
        source: io::Error,
    },
}

/// Write half of an object. Dropping it without calling [`ObjectWriter::commit`]
/// discards everything written so far.
pub trait ObjectWriter: Write {
    fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Capability to open byte streams by key within one namespace.
pub trait ByteStore {
    fn open_read(&self, key: &str) -> Result<Box<dyn Read + '_>, StoreError>;

    fn open_write(&self, key: &str) -> Result<Box<dyn ObjectWriter + '_>, StoreError>;
}

/// Opens the store a namespace URL points at.
pub fn open(url: &str) -> Result<Box<dyn ByteStore>, StoreError> {
    let root = match url.split_once("://") {
        Some(("file", path)) => PathBuf::from(path),
        Some(_) => return Err(StoreError::UnsupportedUrl(url.to_string())),
        None if url.is_empty() => return Err(StoreError::UnsupportedUrl(url.to_string())),
        None => PathBuf::from(url),
    };

    Ok(Box::new(FsStore::new(root)))
}
