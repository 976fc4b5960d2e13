//! File-backed document store.
//!
//! Layout under the store root:
//!
//! ```text
//! <root>/<owner>/<folder...>/<name>/
//!     REPOSITORY          marker written by create_repository
//!     commits             zlib("<kind> <version>\0<json>")
//!     branches
//!     tags
//!     releases
//!     default_branch
//! ```

use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, error};

use super::{DocumentKind, DocumentStore, RawDocument, RepoId};
use crate::config::StoreConfig;
use crate::error::{Error, Result, StorageError};
use crate::infra::{compress, decompress, read_file, write_file_atomic};

const MARKER: &str = "REPOSITORY";

/// A [`DocumentStore`] keeping one compressed file per document.
///
/// Writes are atomic (temp file then rename). The version check and the
/// write are serialized within one `FileStore` instance; separate processes
/// sharing a root must coordinate externally.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    level: u8,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Opens a store rooted at `root` with the default compression level.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        FileStore {
            root: root.as_ref().to_path_buf(),
            level: StoreConfig::DEFAULT_COMPRESSION_LEVEL,
            write_lock: Mutex::new(()),
        }
    }

    /// Opens a store from its configuration.
    pub fn from_config(config: &StoreConfig) -> Self {
        FileStore {
            root: config.root.clone(),
            level: config.compression_level,
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the store root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the directory of a repository.
    pub fn repo_dir(&self, repo: &RepoId) -> Result<PathBuf> {
        let mut dir = self.root.clone();
        dir.push(checked_segment(repo.owner())?);
        for segment in repo.folder().split('/').filter(|s| !s.is_empty()) {
            dir.push(checked_segment(segment)?);
        }
        dir.push(checked_segment(repo.name())?);
        Ok(dir)
    }

    fn document_path(&self, repo: &RepoId, kind: DocumentKind) -> Result<PathBuf> {
        Ok(self.repo_dir(repo)?.join(kind.as_str()))
    }

    fn ensure_exists(&self, repo: &RepoId) -> Result<()> {
        if self.repository_exists(repo)? {
            Ok(())
        } else {
            Err(Error::RepositoryNotFound(repo.clone()))
        }
    }

    fn load(&self, repo: &RepoId, kind: DocumentKind) -> Result<Option<RawDocument>> {
        let path = self.document_path(repo, kind)?;
        let read = read_file(&path).map_err(|e| {
            error!(repo = %repo, document = %kind, path = %path.display(), error = %e, "failed to read document");
            Error::Storage(e)
        })?;
        let Some(compressed) = read else {
            return Ok(None);
        };
        let data = decompress(&compressed, &path).map_err(|e| {
            error!(repo = %repo, document = %kind, path = %path.display(), "document failed to decompress");
            Error::Storage(e)
        })?;
        parse_document(&data, kind, &path).map(Some).map_err(|e| {
            error!(repo = %repo, document = %kind, error = %e, "document is corrupt");
            Error::Storage(e)
        })
    }
}

impl DocumentStore for FileStore {
    fn repository_exists(&self, repo: &RepoId) -> Result<bool> {
        Ok(self.repo_dir(repo)?.join(MARKER).is_file())
    }

    fn create_repository(&self, repo: &RepoId) -> Result<()> {
        let _guard = self.write_lock.lock();
        if self.repository_exists(repo)? {
            return Err(Error::RepositoryExists(repo.clone()));
        }
        let marker = self.repo_dir(repo)?.join(MARKER);
        write_file_atomic(&marker, repo.to_string().as_bytes()).map_err(|e| {
            error!(repo = %repo, path = %marker.display(), error = %e, "failed to create repository");
            Error::Storage(e)
        })?;
        debug!(repo = %repo, root = %self.root.display(), "created repository directory");
        Ok(())
    }

    fn read(&self, repo: &RepoId, kind: DocumentKind) -> Result<Option<RawDocument>> {
        self.ensure_exists(repo)?;
        self.load(repo, kind)
    }

    fn write(
        &self,
        repo: &RepoId,
        kind: DocumentKind,
        data: Vec<u8>,
        expected: u64,
    ) -> Result<u64> {
        let _guard = self.write_lock.lock();
        self.ensure_exists(repo)?;

        let actual = self.load(repo, kind)?.map(|d| d.version).unwrap_or(0);
        if actual != expected {
            return Err(Error::ConcurrentModification {
                repo: repo.clone(),
                kind,
                expected,
                actual,
            });
        }

        let version = actual + 1;
        let mut body = format!("{} {}\0", kind.as_str(), version).into_bytes();
        body.extend_from_slice(&data);

        let path = self.document_path(repo, kind)?;
        write_file_atomic(&path, &compress(&body, self.level)).map_err(|e| {
            error!(repo = %repo, document = %kind, path = %path.display(), error = %e, "failed to write document");
            Error::Storage(e)
        })?;
        Ok(version)
    }
}

/// Rejects path segments that would escape the repository directory.
fn checked_segment(segment: &str) -> Result<&str> {
    let bad = segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\', '\0']);
    if bad {
        return Err(Error::Storage(StorageError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid repository path segment: {:?}", segment),
        ))));
    }
    Ok(segment)
}

/// Parses `<kind> <version>\0<payload>`.
fn parse_document(data: &[u8], kind: DocumentKind, path: &Path) -> std::result::Result<RawDocument, StorageError> {
    let corrupt = |reason: String| StorageError::Corrupt {
        path: path.to_path_buf(),
        reason,
    };

    let nul = data
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| corrupt("missing header terminator".to_string()))?;
    let header =
        std::str::from_utf8(&data[..nul]).map_err(|_| corrupt("header is not UTF-8".to_string()))?;

    let (name, version) = header
        .split_once(' ')
        .ok_or_else(|| corrupt(format!("malformed header: {}", header)))?;
    if name != kind.as_str() {
        return Err(corrupt(format!("expected {} document, found {}", kind, name)));
    }
    let version: u64 = version
        .parse()
        .map_err(|_| corrupt(format!("invalid version: {}", version)))?;

    Ok(RawDocument {
        data: data[nul + 1..].to_vec(),
        version,
    })
}
