//! Byte readers backing the streaming I/O seam.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use resona_core::alloc::HashMap;

use crate::error::AssetError;

/// Result type for I/O operations.
pub type IoResult<T> = Result<T, AssetError>;

/// Future type for asynchronous byte loading.
pub type BytesFuture = Pin<Box<dyn Future<Output = IoResult<Vec<u8>>> + Send + 'static>>;

/// Trait for reading bytes from pack files and loose assets.
pub trait BytesReader: Send + Sync {
    /// Read all bytes at a path.
    fn read_bytes(&self, path: &Path) -> BytesFuture;

    /// Read `len` bytes starting at `offset`.
    fn read_range(&self, path: &Path, offset: u64, len: u64) -> BytesFuture;

    /// Check whether a path exists.
    fn exists(&self, path: &Path) -> Pin<Box<dyn Future<Output = bool> + Send + 'static>>;
}

/// File reader rooted at a base path.
///
/// Uses blocking I/O wrapped in ready futures; the streaming backend's
/// worker threads absorb the latency.
pub struct FileReader {
    base_path: PathBuf,
}

impl FileReader {
    /// Create a reader rooted at `base_path`.
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }

    fn io_error(path: PathBuf, err: std::io::Error) -> AssetError {
        if err.kind() == std::io::ErrorKind::NotFound {
            AssetError::NotFound {
                path: resona_core::path::AssetPath::new(path.display().to_string()),
            }
        } else {
            AssetError::IoError { path, source: err }
        }
    }

    /// Read all bytes synchronously.
    pub fn read_bytes_sync(&self, path: &Path) -> IoResult<Vec<u8>> {
        let full_path = self.resolve_path(path);
        std::fs::read(&full_path).map_err(|err| Self::io_error(full_path, err))
    }

    /// Read a byte range synchronously.
    pub fn read_range_sync(&self, path: &Path, offset: u64, len: u64) -> IoResult<Vec<u8>> {
        use std::io::{Read, Seek, SeekFrom};

        let full_path = self.resolve_path(path);
        let mut file =
            std::fs::File::open(&full_path).map_err(|err| Self::io_error(full_path.clone(), err))?;
        file.seek(SeekFrom::Start(offset))
            .map_err(|err| Self::io_error(full_path.clone(), err))?;
        let mut buffer = vec![0u8; len as usize];
        file.read_exact(&mut buffer)
            .map_err(|err| Self::io_error(full_path, err))?;
        Ok(buffer)
    }

    /// Check whether a path exists synchronously.
    pub fn exists_sync(&self, path: &Path) -> bool {
        self.resolve_path(path).exists()
    }
}

impl BytesReader for FileReader {
    fn read_bytes(&self, path: &Path) -> BytesFuture {
        let result = self.read_bytes_sync(path);
        Box::pin(async move { result })
    }

    fn read_range(&self, path: &Path, offset: u64, len: u64) -> BytesFuture {
        let result = self.read_range_sync(path, offset, len);
        Box::pin(async move { result })
    }

    fn exists(&self, path: &Path) -> Pin<Box<dyn Future<Output = bool> + Send + 'static>> {
        let exists = self.exists_sync(path);
        Box::pin(async move { exists })
    }
}

/// In-memory bytes reader for tests and embedded packs.
#[derive(Default)]
pub struct MemoryReader {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryReader {
    /// Create an empty memory reader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add bytes for a path.
    pub fn insert(&mut self, path: impl AsRef<str>, bytes: Vec<u8>) {
        self.files.insert(path.as_ref().to_string(), bytes);
    }

    /// Check whether bytes exist for a path.
    pub fn contains(&self, path: impl AsRef<str>) -> bool {
        self.files.contains_key(path.as_ref())
    }
}

impl BytesReader for MemoryReader {
    fn read_bytes(&self, path: &Path) -> BytesFuture {
        let key = path.to_string_lossy().to_string();
        let result = self.files.get(&key).cloned().ok_or(AssetError::NotFound {
            path: resona_core::path::AssetPath::new(key),
        });
        Box::pin(async move { result })
    }

    fn read_range(&self, path: &Path, offset: u64, len: u64) -> BytesFuture {
        let key = path.to_string_lossy().to_string();
        let result = match self.files.get(&key) {
            Some(bytes) => {
                let start = offset as usize;
                let end = start + len as usize;
                if end <= bytes.len() {
                    Ok(bytes[start..end].to_vec())
                } else {
                    Err(AssetError::InvalidData {
                        message: format!(
                            "range {}..{} out of bounds for '{}' ({} bytes)",
                            start,
                            end,
                            key,
                            bytes.len()
                        ),
                    })
                }
            }
            None => Err(AssetError::NotFound {
                path: resona_core::path::AssetPath::new(key),
            }),
        };
        Box::pin(async move { result })
    }

    fn exists(&self, path: &Path) -> Pin<Box<dyn Future<Output = bool> + Send + 'static>> {
        let exists = self.contains(path.to_string_lossy().as_ref());
        Box::pin(async move { exists })
    }
}
