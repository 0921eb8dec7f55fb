use std::{
    fs::{self, File},
    io::{self, Read, Write},
    path::{Component, Path, PathBuf},
};

use log::debug;
use tempfile::NamedTempFile;

use super::{ByteStore, ObjectWriter, StoreError};

/// Stores every object as a file named by its key under `root`.
///
/// Writes go to a temporary file next to the target and are renamed into place on
/// commit, so readers never observe a half-written object.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `key` below `root`. Only plain path components are accepted, so a key
    /// can never name a file outside the namespace.
    fn object_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(key);
        let plain = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));

        if key.is_empty() || !plain {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl ByteStore for FsStore {
    fn open_read(&self, key: &str) -> Result<Box<dyn Read + '_>, StoreError> {
        let path = self.object_path(key)?;
        debug!("reading object {}", path.display());

        let file = File::open(&path).map_err(|source| StoreError::Open {
            key: key.to_string(),
            source,
        })?;
        Ok(Box::new(file))
    }

    fn open_write(&self, key: &str) -> Result<Box<dyn ObjectWriter + '_>, StoreError> {
        let target = self.object_path(key)?;
        debug!("writing object {}", target.display());

        let open_err = |source| StoreError::Open {
            key: key.to_string(),
            source,
        };
        let dir = target.parent().unwrap_or(&self.root);
        fs::create_dir_all(dir).map_err(open_err)?;
        let file = NamedTempFile::new_in(dir).map_err(open_err)?;

        Ok(Box::new(FsObjectWriter {
            key: key.to_string(),
            file,
            target,
        }))
    }
}

struct FsObjectWriter {
    key: String,
    file: NamedTempFile,
    target: PathBuf,
}

impl Write for FsObjectWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl ObjectWriter for FsObjectWriter {
    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let FsObjectWriter { key, file, target } = *self;

        let commit_err = |source| StoreError::Commit {
            key: key.clone(),
            source,
        };
        file.as_file().sync_all().map_err(commit_err)?;
        file.persist(&target).map_err(|e| commit_err(e.error))?;

        debug!("committed object {}", target.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;

    fn read_object(store: &FsStore, key: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        store.open_read(key).unwrap().read_to_end(&mut buf).unwrap();
        buf
    }

    #[test]
    fn write_then_read() {
        let temp = TempDir::new("fs_store").unwrap();
        let store = FsStore::new(temp.path());

        let mut writer = store.open_write("abc").unwrap();
        writer.write_all(b"hello ").unwrap();
        writer.write_all(b"world").unwrap();
        writer.commit().unwrap();

        assert_eq!(read_object(&store, "abc"), b"hello world");
    }

    #[test]
    fn uncommitted_write_leaves_nothing() {
        let temp = TempDir::new("fs_store").unwrap();
        let store = FsStore::new(temp.path());

        let mut writer = store.open_write("abc").unwrap();
        writer.write_all(b"partial").unwrap();
        drop(writer);

        assert!(!temp.path().join("abc").exists());
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn commit_replaces_existing_object() {
        let temp = TempDir::new("fs_store").unwrap();
        let store = FsStore::new(temp.path());
        fs::write(temp.path().join("abc"), b"old").unwrap();

        let mut writer = store.open_write("abc").unwrap();
        writer.write_all(b"new").unwrap();
        writer.commit().unwrap();

        assert_eq!(read_object(&store, "abc"), b"new");
    }

    #[test]
    fn write_creates_missing_namespace() {
        let temp = TempDir::new("fs_store").unwrap();
        let store = FsStore::new(temp.path().join("bucket").join("prefix"));

        let mut writer = store.open_write("abc").unwrap();
        writer.write_all(b"xyz").unwrap();
        writer.commit().unwrap();

        assert_eq!(read_object(&store, "abc"), b"xyz");
        assert_eq!(store.root(), temp.path().join("bucket").join("prefix"));
    }

    #[test]
    fn keys_cannot_leave_the_namespace() {
        let temp = TempDir::new("fs_store").unwrap();
        let store = FsStore::new(temp.path().join("store"));
        let outside = temp.path().join("outside.bin");
        let absolute = outside.to_str().unwrap();

        for key in [absolute, "../outside.bin", "a/../../outside.bin", "./abc", ""] {
            assert!(
                matches!(store.open_write(key).err(), Some(StoreError::InvalidKey(k)) if k == key),
                "{key}"
            );
            assert!(
                matches!(store.open_read(key).err(), Some(StoreError::InvalidKey(_))),
                "{key}"
            );
        }
        assert!(!outside.exists());
    }

    #[test]
    fn nested_keys_stay_below_root() {
        let temp = TempDir::new("fs_store").unwrap();
        let store = FsStore::new(temp.path());

        let mut writer = store.open_write("ab/cd/abcdef").unwrap();
        writer.write_all(b"xyz").unwrap();
        writer.commit().unwrap();

        assert_eq!(fs::read(temp.path().join("ab/cd/abcdef")).unwrap(), b"xyz");
    }

    #[test]
    fn read_missing_object() {
        let temp = TempDir::new("fs_store").unwrap();
        let store = FsStore::new(temp.path());

        let err = store.open_read("missing").err().unwrap();
        assert!(matches!(err, StoreError::Open { ref key, .. } if key == "missing"));
        assert!(err.to_string().contains("missing"));
    }
}
