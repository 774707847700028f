use std::fmt;
use std::fmt::{Debug, Formatter};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use httpd_core::protocol::FileSource;
use thiserror::Error;
use tokio::fs::File;
use tracing::trace;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("no file at {path}")]
    NotFound { path: String },

    #[error("access to {path} is forbidden")]
    Forbidden { path: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ResolveError {
    pub fn not_found<S: ToString>(str: S) -> Self {
        Self::NotFound { path: str.to_string() }
    }

    pub fn forbidden<S: ToString>(str: S) -> Self {
        Self::Forbidden { path: str.to_string() }
    }
}

/// A file ready to be served.
pub struct ResolvedFile {
    pub source: Box<dyn FileSource>,
    pub size: u64,
    pub modified: SystemTime,
}

impl Debug for ResolvedFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedFile").field("size", &self.size).field("modified", &self.modified).finish_non_exhaustive()
    }
}

/// Looks up the files a directory handler serves.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileResolver: Send + Sync {
    /// Resolves a `/`-separated path relative to the served directory.
    async fn resolve(&self, path: &str) -> Result<ResolvedFile, ResolveError>;
}

/// Serves files from a directory of the local file system.
///
/// Paths may not leave the directory: any `..` component is forbidden. Directories themselves
/// are not served.
#[derive(Debug, Clone)]
pub struct FsResolver {
    root: PathBuf,
}

impl FsResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn local_path(&self, path: &str) -> Result<PathBuf, ResolveError> {
        let mut local = self.root.clone();
        for component in Path::new(path.trim_start_matches('/')).components() {
            match component {
                Component::Normal(part) => local.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(ResolveError::forbidden(path));
                }
            }
        }
        Ok(local)
    }
}

#[async_trait]
impl FileResolver for FsResolver {
    async fn resolve(&self, path: &str) -> Result<ResolvedFile, ResolveError> {
        let local = self.local_path(path)?;
        trace!(path, local = %local.display(), "resolving file");

        let file = match File::open(&local).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(ResolveError::not_found(path)),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => return Err(ResolveError::forbidden(path)),
            Err(e) => return Err(e.into()),
        };

        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(ResolveError::not_found(path));
        }

        Ok(ResolvedFile { source: Box::new(file), size: metadata.len(), modified: metadata.modified()? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn root() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("a.txt"), b"hello").unwrap();
        dir
    }

    #[tokio::test]
    async fn resolves_files_below_root() {
        let dir = root();
        let resolver = FsResolver::new(dir.path());

        let mut file = resolver.resolve("/sub/a.txt").await.unwrap();
        assert_eq!(file.size, 5);
        assert_eq!(file.source.read_chunk(1, 3).await.unwrap().as_ref(), b"ell");

        let file = resolver.resolve("sub/./a.txt").await.unwrap();
        assert_eq!(file.size, 5);
    }

    #[tokio::test]
    async fn missing_files_and_directories_are_not_found() {
        let dir = root();
        let resolver = FsResolver::new(dir.path());

        assert!(matches!(resolver.resolve("/sub/b.txt").await, Err(ResolveError::NotFound { .. })));
        assert!(matches!(resolver.resolve("/sub").await, Err(ResolveError::NotFound { .. })));
    }

    #[tokio::test]
    async fn escaping_the_root_is_forbidden() {
        let dir = root();
        let resolver = FsResolver::new(dir.path().join("sub"));

        assert!(matches!(resolver.resolve("/../sub/a.txt").await, Err(ResolveError::Forbidden { .. })));
        assert!(matches!(resolver.resolve("/x/../../a.txt").await, Err(ResolveError::Forbidden { .. })));
    }
}
