use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::{Error, FileId, ObjectStore};

/// A store that keeps files in a local directory.
///
/// The identifier of a file is its name, so a file removed from disk is
/// reported as not found and gets re-created on the next write.
#[derive(Clone, Debug)]
pub struct LocalDirStore {
    root: PathBuf,
}

impl LocalDirStore {
    /// Creates a store rooted at `root`. The directory is created lazily.
    #[inline]
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, name: &str) -> Result<PathBuf, Error> {
        let is_plain = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\']);
        if !is_plain {
            return Err(Error::invalid_input()
                .with_reason(format!("not a plain file name: {name:?}")));
        }
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl ObjectStore for LocalDirStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<FileId>, Error> {
        let path = self.path_of(name)?;
        if fs::try_exists(&path).await? {
            Ok(Some(FileId::new(name)))
        } else {
            Ok(None)
        }
    }

    async fn read_content(&self, id: &FileId) -> Result<Bytes, Error> {
        let path = self.path_of(id.as_str())?;
        let content = fs::read(&path).await?;
        Ok(Bytes::from(content))
    }

    async fn create_file(
        &self,
        name: &str,
        content: Bytes,
    ) -> Result<FileId, Error> {
        let path = self.path_of(name)?;
        fs::create_dir_all(&self.root).await?;
        self.replace(name, &path, &content).await?;
        debug!("created {}", path.display());
        Ok(FileId::new(name))
    }

    async fn update_file(
        &self,
        id: &FileId,
        content: Bytes,
    ) -> Result<(), Error> {
        let path = self.path_of(id.as_str())?;
        // A missing file surfaces as `NotFound` instead of being created.
        fs::metadata(&path).await?;
        self.replace(id.as_str(), &path, &content).await
    }
}

impl LocalDirStore {
    /// Writes `content` next to `path` and renames it over, so readers see
    /// either the old or the new content in full.
    async fn replace(
        &self,
        name: &str,
        path: &Path,
        content: &[u8],
    ) -> Result<(), Error> {
        let tmp_path = self.root.join(format!(".{name}.tmp"));
        let result = async {
            let mut tmp_file = fs::File::create(&tmp_path).await?;
            tmp_file.write_all(content).await?;
            tmp_file.sync_all().await?;
            drop(tmp_file);
            fs::rename(&tmp_path, path).await
        }
        .await;
        if let Err(err) = result {
            fs::remove_file(&tmp_path).await.ok();
            return Err(err.into());
        }
        Ok(())
    }
}
