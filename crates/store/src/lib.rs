//! A protocol for the remote file store that keeps the diary's blobs.
//!
//! The store only needs four whole-file operations: look up a file by its
//! name, read it, create it, and overwrite it. Backends map their own
//! failures onto [`ErrorKind`], and callers rely on
//! [`ErrorKind::NotFound`] being reported faithfully, since a vanished file
//! is re-created rather than treated as fatal.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod error;
mod local;
mod memory;

use std::fmt::{self, Display};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

pub use error::{Error, ErrorKind};
pub use local::LocalDirStore;
pub use memory::MemoryStore;

/// An opaque handle assigned by the store when a file is created.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(String);

impl FileId {
    /// Wraps a raw identifier.
    #[inline]
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// Returns the raw identifier.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for FileId {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A remote store of whole files.
///
/// Every operation is a single round trip; callers await each one before
/// issuing the next. Implementations must be object safe so that the
/// session can hold an `Arc<dyn ObjectStore>`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Looks up a file by its exact name. Returns `None` if it is absent.
    async fn find_by_name(&self, name: &str) -> Result<Option<FileId>, Error>;

    /// Reads the whole content of a file.
    async fn read_content(&self, id: &FileId) -> Result<Bytes, Error>;

    /// Creates a new file and returns its freshly assigned identifier.
    async fn create_file(
        &self,
        name: &str,
        content: Bytes,
    ) -> Result<FileId, Error>;

    /// Replaces the whole content of an existing file.
    ///
    /// Must fail with [`ErrorKind::NotFound`] if the file no longer exists.
    async fn update_file(&self, id: &FileId, content: Bytes)
    -> Result<(), Error>;
}

#[async_trait]
impl<T: ObjectStore + ?Sized> ObjectStore for Arc<T> {
    #[inline]
    async fn find_by_name(&self, name: &str) -> Result<Option<FileId>, Error> {
        (**self).find_by_name(name).await
    }

    #[inline]
    async fn read_content(&self, id: &FileId) -> Result<Bytes, Error> {
        (**self).read_content(id).await
    }

    #[inline]
    async fn create_file(
        &self,
        name: &str,
        content: Bytes,
    ) -> Result<FileId, Error> {
        (**self).create_file(name, content).await
    }

    #[inline]
    async fn update_file(
        &self,
        id: &FileId,
        content: Bytes,
    ) -> Result<(), Error> {
        (**self).update_file(id, content).await
    }
}
