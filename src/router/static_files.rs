//! Static file serving
//!
//! Maps request paths onto files beneath a root directory. Resolution
//! canonicalizes the candidate, following symlinks, and requires the result
//! to stay inside the canonical root.

use crate::config::StaticFilesConfig;
use crate::http::mime::content_type_for;
use crate::http::response::{Response, StatusCode};
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum StaticFileError {
    #[error("path escapes the static root")]
    PathEscapesRoot,
    #[error("file not found")]
    NotFound,
    #[error("permission denied: {0}")]
    PermissionDenied(#[source] io::Error),
    #[error("failed to read file: {0}")]
    Unreadable(#[source] io::Error),
}

impl StaticFileError {
    /// Status code this failure is reported with. Escaping the root is
    /// reported exactly like a missing file.
    pub fn status(&self) -> StatusCode {
        match self {
            StaticFileError::PathEscapesRoot | StaticFileError::NotFound => StatusCode::NotFound,
            StaticFileError::PermissionDenied(_) => StatusCode::Forbidden,
            StaticFileError::Unreadable(_) => StatusCode::InternalServerError,
        }
    }

    fn from_read(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => StaticFileError::PermissionDenied(err),
            _ => StaticFileError::Unreadable(err),
        }
    }
}

/// A file found beneath the root.
#[derive(Debug, Clone)]
pub struct ResolvedFile {
    pub path: PathBuf,
    pub size: u64,
    pub content_type: &'static str,
}

#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
    default_file: String,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>, default_file: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            default_file: default_file.into(),
        }
    }

    pub fn from_config(config: &StaticFilesConfig) -> Self {
        Self::new(config.root.clone(), config.default_file.clone())
    }

    /// Finds the file a request path refers to.
    pub async fn resolve(&self, request_path: &str) -> Result<ResolvedFile, StaticFileError> {
        // A root that does not exist has no files in it.
        let root = fs::canonicalize(&self.root)
            .await
            .map_err(|_| StaticFileError::NotFound)?;

        let relative = request_path.trim_start_matches('/');
        let relative = if relative.is_empty() {
            self.default_file.as_str()
        } else {
            relative
        };

        let mut path = Self::resolve_under(&root, &root.join(relative)).await?;

        let mut metadata = fs::metadata(&path)
            .await
            .map_err(|_| StaticFileError::NotFound)?;
        if metadata.is_dir() {
            path = Self::resolve_under(&root, &path.join(&self.default_file)).await?;
            metadata = fs::metadata(&path)
                .await
                .map_err(|_| StaticFileError::NotFound)?;
        }

        if !metadata.is_file() {
            return Err(StaticFileError::NotFound);
        }

        Ok(ResolvedFile {
            content_type: content_type_for(&path),
            size: metadata.len(),
            path,
        })
    }

    /// Serves `request_path` as a 200 response. With `head_only` the body is
    /// left empty and only `Content-Length` announces the size.
    pub async fn serve(&self, request_path: &str, head_only: bool) -> Result<Response, StaticFileError> {
        let file = self.resolve(request_path).await?;

        let mut response = Response::new(StatusCode::Ok);
        response.set_content_type(file.content_type);

        if head_only {
            response.set_header("Content-Length", file.size.to_string());
        } else {
            let bytes = fs::read(&file.path)
                .await
                .map_err(StaticFileError::from_read)?;
            response.set_body(bytes);
        }

        tracing::debug!(
            file = %file.path.display(),
            content_type = file.content_type,
            "Serving static file"
        );

        Ok(response)
    }

    /// Resolves `candidate` the way the OS would, following symlinks before
    /// applying `..`, and rejects anything that ends up outside `root`.
    /// `root` must already be canonical. A candidate that does not exist is
    /// only reported as escaping when its lexical form leaves the root.
    async fn resolve_under(root: &Path, candidate: &Path) -> Result<PathBuf, StaticFileError> {
        match fs::canonicalize(candidate).await {
            Ok(canonical) if canonical.starts_with(root) => Ok(canonical),
            Ok(_) => Err(StaticFileError::PathEscapesRoot),
            Err(_) if !normalize(candidate).starts_with(root) => Err(StaticFileError::PathEscapesRoot),
            Err(_) => Err(StaticFileError::NotFound),
        }
    }
}

/// Collapses `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
