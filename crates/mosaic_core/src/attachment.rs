//! Companion binary payload of a scene document.
//!
//! Every geometry-bearing node of a document refers to raw arrays stored in
//! a sibling `.bin` file by byte offset and element count. The attachment is
//! read once per load into shared immutable storage; every [`Data`] view
//! handed out keeps that storage alive, and it is released when the last
//! view goes away.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::data::{Data, DataError, DataType};

/// Errors that can occur while locating or slicing an attachment.
#[derive(Error, Debug)]
pub enum AttachmentError {
    #[error("binary attachment not found (tried {})", display_paths(.tried))]
    NotFound { tried: Vec<PathBuf> },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("attachment range error: {0}")]
    Range(#[from] DataError),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type AttachmentResult<T> = Result<T, AttachmentError>;

/// Read-only bytes backing one scene document.
#[derive(Clone, Debug)]
pub struct BinaryAttachment {
    path: PathBuf,
    storage: Arc<[u8]>,
}

impl BinaryAttachment {
    /// Candidate attachment paths for a document, in lookup order:
    /// `<document>.bin`, then the document path with its extension
    /// replaced by `.bin`.
    pub fn candidates(document_path: &Path) -> Vec<PathBuf> {
        let mut appended = document_path.as_os_str().to_owned();
        appended.push(".bin");

        let mut candidates = vec![PathBuf::from(appended)];
        let replaced = document_path.with_extension("bin");
        if !candidates.contains(&replaced) {
            candidates.push(replaced);
        }
        candidates
    }

    /// Locate the attachment of a document on disk.
    pub fn locate(document_path: &Path) -> AttachmentResult<PathBuf> {
        let tried = Self::candidates(document_path);
        match tried.iter().find(|p| p.is_file()) {
            Some(path) => Ok(path.clone()),
            None => Err(AttachmentError::NotFound { tried }),
        }
    }

    /// Locate and read the attachment of a document.
    pub fn open(document_path: &Path) -> AttachmentResult<Self> {
        let path = Self::locate(document_path)?;
        let bytes = std::fs::read(&path).map_err(|source| AttachmentError::Io {
            path: path.clone(),
            source,
        })?;

        log::info!("Opened binary attachment {} ({} bytes)", path.display(), bytes.len());

        Ok(Self {
            path,
            storage: Arc::from(bytes),
        })
    }

    /// Wrap bytes already in memory (useful for testing).
    pub fn from_bytes(name: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        Self {
            path: name.into(),
            storage: Arc::from(bytes),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the attachment in bytes.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// View `count` elements of type `ty` starting at byte `offset`.
    pub fn view(&self, offset: usize, count: usize, ty: DataType) -> AttachmentResult<Data> {
        Ok(Data::new(Arc::clone(&self.storage), offset, count, ty)?)
    }
}
