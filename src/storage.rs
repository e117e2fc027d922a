//! Output sinks for generators.
//!
//! Generators only see the [`Storage`] trait. [`DiskStorage`] writes real files
//! under a base directory; [`MemoryStorage`] keeps them in a concurrent map so a
//! dry run can report what would be written without touching disk.

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Destination for generated files. Paths are relative to [`Storage::base_dir`].
///
/// Implementations must accept concurrent writes to distinct paths, since
/// generators of one tier run in parallel.
pub trait Storage: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    fn base_dir(&self) -> &Path;
}

/// Writes under a base directory, creating parent directories as needed.
#[derive(Debug, Clone)]
pub struct DiskStorage {
    base: PathBuf,
}

impl DiskStorage {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        DiskStorage { base: base.into() }
    }
}

impl Storage for DiskStorage {
    fn exists(&self, path: &Path) -> bool {
        self.base.join(path).exists()
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let target = self.base.join(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, contents)?;
        debug!(path = %target.display(), bytes = contents.len(), "wrote file");
        Ok(())
    }

    fn base_dir(&self) -> &Path {
        &self.base
    }
}

/// In-memory sink used for dry runs and tests.
///
/// `exists` also consults the real base directory, so generators that skip
/// already present files behave the same in a dry run.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    base: PathBuf,
    files: DashMap<PathBuf, Vec<u8>>,
}

impl MemoryStorage {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        MemoryStorage {
            base: base.into(),
            files: DashMap::new(),
        }
    }

    /// Snapshot of every written file, ordered by path.
    pub fn files(&self) -> BTreeMap<PathBuf, Vec<u8>> {
        self.files
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn read_file(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.get(path).map(|entry| entry.value().clone())
    }

    /// Convenience for tests and reports: the file as UTF-8, lossily.
    pub fn read_to_string(&self, path: impl AsRef<Path>) -> Option<String> {
        self.read_file(path.as_ref())
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl Storage for MemoryStorage {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.base.join(path).exists()
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        self.files.insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    fn base_dir(&self) -> &Path {
        &self.base
    }
}

/// One directory of a [`DryRunReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryReport {
    pub directory: PathBuf,
    /// `(file name, size in bytes)`, ordered by name
    pub files: Vec<(String, usize)>,
}

/// What a dry run would have written, grouped by directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DryRunReport {
    pub base_dir: PathBuf,
    pub directories: Vec<DirectoryReport>,
    pub total_files: usize,
    pub total_bytes: usize,
}

impl DryRunReport {
    pub fn from_storage(storage: &MemoryStorage) -> Self {
        let mut grouped: BTreeMap<PathBuf, Vec<(String, usize)>> = BTreeMap::new();
        let mut total_bytes = 0;
        let files = storage.files();
        for (path, contents) in &files {
            let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            total_bytes += contents.len();
            grouped.entry(directory).or_default().push((name, contents.len()));
        }

        DryRunReport {
            base_dir: storage.base_dir().to_path_buf(),
            directories: grouped
                .into_iter()
                .map(|(directory, files)| DirectoryReport { directory, files })
                .collect(),
            total_files: files.len(),
            total_bytes,
        }
    }

    pub fn log(&self) {
        for dir in &self.directories {
            for (name, size) in &dir.files {
                info!(
                    directory = %dir.directory.display(),
                    file = %name,
                    bytes = size,
                    "would write"
                );
            }
        }
        info!(
            base_dir = %self.base_dir.display(),
            files = self.total_files,
            bytes = self.total_bytes,
            "dry run complete"
        );
    }
}

impl fmt::Display for DryRunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dry run: would write to {}", self.base_dir.display())?;
        for dir in &self.directories {
            let label = if dir.directory.as_os_str().is_empty() {
                ".".to_string()
            } else {
                format!("{}/", dir.directory.display())
            };
            writeln!(f, "  {label}")?;
            for (name, size) in &dir.files {
                writeln!(f, "    {name} ({size} bytes)")?;
            }
        }
        write!(
            f,
            "Total: {} files, {} bytes",
            self.total_files, self.total_bytes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_disk_storage_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskStorage::new(dir.path());
        let path = Path::new("models/user.gen.go");
        assert!(!storage.exists(path));
        storage.write_file(path, b"package models\n").unwrap();
        assert!(storage.exists(path));
        assert_eq!(
            fs::read_to_string(dir.path().join(path)).unwrap(),
            "package models\n"
        );
    }

    #[test]
    fn test_memory_storage_concurrent_writes() {
        let storage = Arc::new(MemoryStorage::new("/nonexistent/out"));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let storage = Arc::clone(&storage);
                thread::spawn(move || {
                    let path = PathBuf::from(format!("gen/file_{i}.go"));
                    storage.write_file(&path, format!("{i}").as_bytes()).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(storage.len(), 8);
        assert_eq!(storage.read_to_string("gen/file_3.go").as_deref(), Some("3"));
        assert!(storage.exists(Path::new("gen/file_7.go")));
        assert!(!storage.exists(Path::new("gen/file_8.go")));
    }

    #[test]
    fn test_dry_run_report_groups_by_directory() {
        let storage = MemoryStorage::new("out");
        storage.write_file(Path::new("go.mod"), b"module x\n").unwrap();
        storage.write_file(Path::new("models/b.gen.go"), b"12345").unwrap();
        storage.write_file(Path::new("models/a.gen.go"), b"123").unwrap();

        let report = DryRunReport::from_storage(&storage);
        assert_eq!(report.total_files, 3);
        assert_eq!(report.total_bytes, 17);
        assert_eq!(report.directories.len(), 2);
        assert_eq!(report.directories[0].directory, PathBuf::new());
        assert_eq!(
            report.directories[1].files,
            vec![("a.gen.go".to_string(), 3), ("b.gen.go".to_string(), 5)]
        );

        let text = report.to_string();
        assert!(text.contains("models/"));
        assert!(text.ends_with("Total: 3 files, 17 bytes"));
    }
}
