//! Serving files from beneath the document root.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{not_found, HandlerResult};
use crate::response::Body;

/// Size of each chunk read from disk.
pub const BLOCK_SIZE: usize = 8192;

/// A lazy sequence of file chunks.
///
/// Each call to `next` reads at most [`BLOCK_SIZE`] bytes; the iterator ends
/// at end of file or after the first error.
#[derive(Debug)]
pub struct FileChunks {
    file: Option<File>,
}

impl FileChunks {
    /// Opens `path` for chunked reading.
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self {
            file: Some(File::open(path)?),
        })
    }
}

impl Iterator for FileChunks {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        let file = self.file.as_mut()?;
        let mut block = vec![0; BLOCK_SIZE];
        match file.read(&mut block) {
            Ok(0) => {
                self.file = None;
                None
            }
            Ok(n) => {
                block.truncate(n);
                Some(Ok(block))
            }
            Err(e) => {
                self.file = None;
                Some(Err(e))
            }
        }
    }
}

/// The built-in route serving `<prefix><relative path>` from disk.
///
/// Unlike placeholder routes this matches any remainder, slashes included.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    prefix: String,
}

/// A resolved static file ready to be streamed.
#[derive(Debug)]
pub struct StaticFile {
    /// Guessed content type.
    pub content_type: String,
    /// File contents.
    pub body: Body,
}

impl StaticFiles {
    /// Creates a static route for `prefix` (e.g. `/static/`).
    pub fn new(prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        if !prefix.ends_with('/') {
            prefix.push('/');
        }
        Self { prefix }
    }

    /// Returns the URL prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Matches a request path, returning the path relative to the document
    /// root (prefix included, leading `/` stripped).
    pub fn match_path(&self, path: &str) -> Option<Vec<String>> {
        let rest = path.strip_prefix(&self.prefix)?;
        if rest.is_empty() {
            return None;
        }
        Some(vec![path.trim_start_matches('/').to_string()])
    }

    /// Opens `relative` beneath `document_root`.
    ///
    /// Anything that is not a regular file inside the prefix directory,
    /// including paths escaping it through `..` or symlinks, is reported
    /// as 404.
    pub fn open(&self, document_root: &Path, relative: &str) -> HandlerResult<StaticFile> {
        let base = document_root.join(self.prefix.trim_matches('/'));
        let Some(path) = resolve(document_root, &base, relative) else {
            debug!(path = %relative, "Static file not found");
            return Err(not_found());
        };

        let content_type = mime_guess::from_path(&path)
            .first_or_octet_stream()
            .to_string();
        let chunks = FileChunks::open(&path).map_err(|_| not_found())?;

        Ok(StaticFile {
            content_type,
            body: Body::File(chunks),
        })
    }
}

fn resolve(document_root: &Path, base: &Path, relative: &str) -> Option<PathBuf> {
    let base = base.canonicalize().ok()?;
    let path = document_root.join(relative).canonicalize().ok()?;
    (path.starts_with(&base) && path.is_file()).then_some(path)
}
