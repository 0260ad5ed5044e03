//! Reading upload files from disk into encoded documents.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::{DocumentSlot, EncodedDocument};

#[derive(Debug, Error)]
pub enum DocumentLoadError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid file type. Accepted: {accepted}")]
    UnsupportedType { accepted: String },
    #[error("File size exceeds {limit_mb}MB limit")]
    TooLarge { limit_mb: u64 },
    #[error("File is empty")]
    Empty,
}

/// Loads `path` for `slot`, enforcing the slot's accepted types and size.
///
/// The media type comes from the file extension, as a browser file picker
/// would report it.
pub fn load_document(path: &Path, slot: DocumentSlot) -> Result<EncodedDocument, DocumentLoadError> {
    let accepted = slot.accepted_types();
    let mime = mime_guess::from_path(path)
        .iter()
        .map(|m| m.essence_str().to_string())
        .find(|m| accepted.contains(&m.as_str()))
        .ok_or_else(|| DocumentLoadError::UnsupportedType {
            accepted: accepted_label(accepted),
        })?;

    let io_error = |source| DocumentLoadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let size = fs::metadata(path).map_err(io_error)?.len();
    if size > slot.max_size() {
        return Err(DocumentLoadError::TooLarge {
            limit_mb: slot.max_size() / (1024 * 1024),
        });
    }
    if size == 0 {
        return Err(DocumentLoadError::Empty);
    }

    let bytes = fs::read(path).map_err(io_error)?;
    Ok(EncodedDocument::from_bytes(&mime, &bytes))
}

fn accepted_label(accepted: &[&str]) -> String {
    accepted
        .iter()
        .map(|m| match *m {
            "application/pdf" => "PDF",
            "image/jpeg" => "JPG",
            "image/png" => "PNG",
            other => other,
        })
        .collect::<Vec<_>>()
        .join(", ")
}
