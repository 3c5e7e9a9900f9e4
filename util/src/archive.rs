//! Struct archiving functionality
//!
//! To add archiving functionality to a struct implement the `Archived` trait.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use std::path::Path;
use std::fs::{File, OpenOptions};
use csv::WriterBuilder;
use csv::Writer;
use serde::Serialize;
use thiserror::Error;

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write CSV archive files.
///
/// The default archiver has no file attached and silently drops records, so
/// modules can be run without a session.
#[derive(Default)]
pub struct Archiver {
    writer: Option<Writer<File>>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur while archiving.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Cannot open the archive file: {0}")]
    FileOpenError(std::io::Error),

    #[error("Cannot write a record to the archive: {0}")]
    WriteError(csv::Error),

    #[error("Cannot flush the archive: {0}")]
    FlushError(std::io::Error)
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A trait which enables a struct to be archived as a timestamped csv.
///
/// To implement this trait, the struct shall have an `Archiver` member which
/// shall be setup in the struct's `init` or `new` functions. 
pub trait Archived {
    /// Write the archives for this struct
    fn write(&mut self) -> Result<(), ArchiveError>;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {
    /// Create a new archiver from a paricular path relative to the session's
    /// archive root.
    ///
    /// Any missing parent directories are created.
    pub fn from_path<P: AsRef<Path>>(
        session: &Session, path: P
    ) -> Result<Self, ArchiveError> {
        let session_path = session.arch_root.join(path);

        if let Some(parent) = session_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(ArchiveError::FileOpenError)?;
        }

        // Truncate any existing file, the archive belongs to this session only
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(session_path)
            .map_err(ArchiveError::FileOpenError)?;

        let w = WriterBuilder::new()
            .has_headers(true)
            .from_writer(file);

        Ok(Self {
            writer: Some(w)
        })
    }

    /// Returns true if a file is attached to this archiver.
    pub fn is_active(&self) -> bool {
        self.writer.is_some()
    }

    /// Serialise a record into the archive.
    ///
    /// Records are written as a single CSV row, so `T` should be a struct of
    /// scalar fields.
    pub fn serialise<T: Serialize>(
        &mut self, record: &T
    ) -> Result<(), ArchiveError> {
        if let Some(ref mut w) = self.writer {
            w.serialize(record).map_err(ArchiveError::WriteError)?;
            w.flush().map_err(ArchiveError::FlushError)?;
        }

        Ok(())
    }
}
