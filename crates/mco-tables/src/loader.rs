//! Reading table files from disk.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{Result, TableError};
use crate::table_set::{TableSetBuilder, TableSetLoad};

/// Largest table file accepted, in bytes.
pub const MAX_TABLE_FILE_SIZE: u64 = 8 * 1024 * 1024;

/// Extension of table files inside a directory.
pub const TABLE_EXTENSION: &str = "tab";

/// Read a whole table file, rejecting files above [`MAX_TABLE_FILE_SIZE`].
pub fn read_table_file(path: &Path) -> Result<Vec<u8>> {
    let not_found = |err: std::io::Error| match err.kind() {
        ErrorKind::NotFound => TableError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => TableError::Io(err),
    };

    let size = fs::metadata(path).map_err(not_found)?.len();
    if size > MAX_TABLE_FILE_SIZE {
        return Err(TableError::FileTooLarge {
            path: path.to_path_buf(),
            size,
            limit: MAX_TABLE_FILE_SIZE,
        });
    }
    fs::read(path).map_err(not_found)
}

/// Lists the `.tab` files of a directory, sorted by file name.
pub fn list_table_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let directory_error = |source| TableError::DirectoryRead {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(directory_error)? {
        let path = entry.map_err(directory_error)?.path();
        if !path.is_file() {
            continue;
        }
        let is_table = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(TABLE_EXTENSION));
        if is_table {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

impl TableSetBuilder {
    /// Read and register one file.
    pub fn add_file(&mut self, path: &Path) -> Result<usize> {
        let data = read_table_file(path)?;
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());
        self.add_bytes(name, data)
    }

    /// Register every `.tab` file of `dir`.
    ///
    /// A file that fails to load is recorded and skipped; only a directory
    /// that cannot be listed is returned as an error.
    pub fn add_directory(&mut self, dir: &Path) -> Result<usize> {
        let mut tables = 0;
        for path in list_table_files(dir)? {
            match self.add_file(&path) {
                Ok(count) => tables += count,
                Err(error) => {
                    warn!(path = %path.display(), "skipping table file");
                    self.record_error(error);
                }
            }
        }
        Ok(tables)
    }

    /// Register a file or every table file of a directory.
    pub fn add_path(&mut self, path: &Path) -> Result<usize> {
        if path.is_dir() {
            self.add_directory(path)
        } else {
            self.add_file(path)
        }
    }
}

/// Load every table reachable from `paths` and build the table set.
///
/// Errors do not stop the load: they are collected in
/// [`TableSetLoad::errors`].
pub fn load_table_set<P: AsRef<Path>>(paths: &[P]) -> TableSetLoad {
    let mut builder = TableSetBuilder::new();
    for path in paths {
        if let Err(error) = builder.add_path(path.as_ref()) {
            builder.record_error(error);
        }
    }

    let load = builder.finish();
    info!(
        files = load.set.files().len(),
        tables = load.set.tables().len(),
        indexes = load.set.index_count(),
        errors = load.errors.len(),
        "loaded table set"
    );
    load
}
