//! Error types for catalog operations.
//!
//! Per-archive failures ([`Error::Zip`], [`Error::MissingDescriptor`],
//! [`Error::MalformedDescriptor`]) are absorbed by the orchestrator, which skips
//! the archive. Only [`Error::VaultMissing`] and [`Error::OutputWrite`] abort a run.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while cataloging a mod vault.
#[derive(Error, Debug)]
pub enum Error {
    /// Filesystem I/O failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not a readable zip archive.
    #[error("unreadable archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// An icon could not be decoded or re-encoded.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// An archive entry is larger than the extraction limit.
    #[error("archive entry {name} exceeds {limit} bytes")]
    EntryTooLarge { name: String, limit: u64 },

    /// The archive has no `modDesc.xml` entry.
    #[error("missing modDesc.xml descriptor")]
    MissingDescriptor,

    /// The descriptor could not be parsed as a document.
    #[error("malformed descriptor: {0}")]
    MalformedDescriptor(String),

    /// The mod vault directory does not exist or is not a directory.
    #[error("mod vault directory not found: {0}")]
    VaultMissing(Utf8PathBuf),

    /// The report could not be written.
    #[error("failed to write report to {path}: {source}")]
    OutputWrite {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}
