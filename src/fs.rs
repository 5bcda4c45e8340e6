use crate::errors::CoreError;
use std::fs::{self, Metadata};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Real-disk boundary used by the mirror and by maintenance commands.
///
/// Keeping this trait narrow makes the mirror's disk traffic easy to audit
/// and lets tests swap in a failing or recording backend.
pub trait FileSystem: Send + Sync {
    /// Returns true when path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Returns true when path is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Reads file metadata.
    fn metadata(&self, path: &Path) -> crate::Result<Metadata>;

    /// Creates a directory and all missing parent directories.
    fn create_dir_all(&self, path: &Path) -> crate::Result<()>;

    /// Writes UTF-8 text, replacing any previous content.
    fn write_to_string(&self, path: &Path, content: &str) -> crate::Result<()>;

    /// Reads UTF-8 text.
    fn read_to_string(&self, path: &Path) -> crate::Result<String>;

    /// Reads at most `limit` bytes, decoding them lossily.
    fn read_bounded(&self, path: &Path, limit: usize) -> crate::Result<String>;

    /// Removes a file.
    fn remove_file(&self, path: &Path) -> crate::Result<()>;

    /// Removes a directory and everything below it.
    fn remove_dir_all(&self, path: &Path) -> crate::Result<()>;

    /// Lists directory children as concrete paths, sorted by name.
    fn list_dir(&self, path: &Path) -> crate::Result<Vec<PathBuf>>;
}

/// Default filesystem implementation backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn metadata(&self, path: &Path) -> crate::Result<Metadata> {
        fs::metadata(path).map_err(|err| CoreError::io(path, err))
    }

    fn create_dir_all(&self, path: &Path) -> crate::Result<()> {
        fs::create_dir_all(path).map_err(|err| CoreError::io(path, err))
    }

    fn write_to_string(&self, path: &Path, content: &str) -> crate::Result<()> {
        fs::write(path, content).map_err(|err| CoreError::io(path, err))
    }

    fn read_to_string(&self, path: &Path) -> crate::Result<String> {
        fs::read_to_string(path).map_err(|err| CoreError::io(path, err))
    }

    fn read_bounded(&self, path: &Path, limit: usize) -> crate::Result<String> {
        let file = fs::File::open(path).map_err(|err| CoreError::io(path, err))?;
        let mut bytes = Vec::new();
        file.take(limit as u64)
            .read_to_end(&mut bytes)
            .map_err(|err| CoreError::io(path, err))?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        Ok(crate::helpers::truncate_at_boundary(&text, limit).to_string())
    }

    fn remove_file(&self, path: &Path) -> crate::Result<()> {
        fs::remove_file(path).map_err(|err| CoreError::io(path, err))
    }

    fn remove_dir_all(&self, path: &Path) -> crate::Result<()> {
        fs::remove_dir_all(path).map_err(|err| CoreError::io(path, err))
    }

    fn list_dir(&self, path: &Path) -> crate::Result<Vec<PathBuf>> {
        let mut entries = fs::read_dir(path)
            .map_err(|err| CoreError::io(path, err))?
            .map(|entry| entry.map(|v| v.path()))
            .collect::<Result<Vec<PathBuf>, io::Error>>()
            .map_err(|err| CoreError::io(path, err))?;
        entries.sort();
        Ok(entries)
    }
}

/// True when `err` is an I/O error of the given kind.
pub fn is_io_kind(err: &CoreError, kind: io::ErrorKind) -> bool {
    matches!(err, CoreError::Io(_, source) if source.kind() == kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_bounded_stops_at_the_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.txt");
        fs::write(&path, "abcdefghij").unwrap();

        let fs = RealFileSystem;
        assert_eq!(fs.read_bounded(&path, 4).unwrap(), "abcd");
        assert_eq!(fs.read_bounded(&path, 100).unwrap(), "abcdefghij");
    }

    #[test]
    fn missing_paths_report_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = RealFileSystem.remove_file(&dir.path().join("nope")).unwrap_err();
        assert!(is_io_kind(&err, io::ErrorKind::NotFound));
    }

    #[test]
    fn list_dir_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b"), "").unwrap();
        fs::write(dir.path().join("a"), "").unwrap();
        let names: Vec<_> = RealFileSystem
            .list_dir(dir.path())
            .unwrap()
            .into_iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
