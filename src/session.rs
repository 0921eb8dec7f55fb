use std::{
    env,
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::PathBuf,
};

use log::{info, warn};
use thiserror::Error;

use crate::{
    config::Config,
    storage::{self, ByteStore, StoreError},
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to resolve download directory: {0}")]
    DownloadDir(#[source] io::Error),
}

/// Everything a transfer needs, built once after the handshake.
pub struct Session {
    url: String,
    project: Option<String>,
    store: Box<dyn ByteStore>,
    download_dir: PathBuf,
}

impl Session {
    /// Opens the store `config.url` names. Downloads land in the working directory.
    pub fn open(config: &Config) -> Result<Self, SessionError> {
        let download_dir = env::current_dir().map_err(SessionError::DownloadDir)?;
        Self::open_in(config, download_dir)
    }

    /// Opens the store `config.url` names, writing downloads to `download_dir`.
    pub fn open_in(config: &Config, download_dir: PathBuf) -> Result<Self, SessionError> {
        let store = storage::open(&config.url)?;

        info!(
            "session opened for url {}, project {:?}",
            config.url, config.project
        );
        Ok(Self::with_store(config, store, download_dir))
    }

    pub fn with_store(config: &Config, store: Box<dyn ByteStore>, download_dir: PathBuf) -> Self {
        Self {
            url: config.url.clone(),
            project: config.project.clone(),
            store,
            download_dir,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    pub fn store(&self) -> &dyn ByteStore {
        self.store.as_ref()
    }

    /// Where a download of `oid` is written. Distinct objects never share a path.
    pub fn download_path(&self, oid: &str) -> PathBuf {
        self.download_dir.join(format!("lfs-download-{oid}.tmp"))
    }
}

/// A download destination that is deleted unless [`PartialFile::finish`] succeeds.
pub struct PartialFile {
    path: PathBuf,
    file: Option<File>,
}

impl PartialFile {
    pub fn create(path: PathBuf) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;

        Ok(Self {
            path,
            file: Some(file),
        })
    }

    /// Flushes and closes the file, keeping it on disk.
    pub fn finish(mut self) -> io::Result<PathBuf> {
        let file = self.file()?;
        file.flush()?;
        file.sync_all()?;

        self.file = None;
        Ok(std::mem::take(&mut self.path))
    }

    fn file(&mut self) -> io::Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::other("download file already closed"))
    }
}

impl Write for PartialFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file()?.flush()
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.file.take().is_none() {
            return;
        }
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("failed to remove partial download {}: {e}", self.path.display());
        }
    }
}
