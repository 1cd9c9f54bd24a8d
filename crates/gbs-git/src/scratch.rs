use std::path::{Path, PathBuf};

use tokio::io::{AsyncRead, AsyncWriteExt};

use crate::error::GitResult;

const PAYLOAD_NAME: &str = "payload.bundle";

/// A received payload persisted under the scratch root.
///
/// Each file lives in its own private temporary directory, so concurrent
/// requests never share a path. The directory and everything in it are
/// removed when the value is dropped, on success and failure alike.
#[derive(Debug)]
pub struct ScratchFile {
    dir: tempfile::TempDir,
    path: PathBuf,
}

impl ScratchFile {
    /// Stream `reader` to a new scratch file under `root`, returning the
    /// file and the number of bytes written.
    pub async fn from_reader<R>(root: &Path, reader: &mut R) -> GitResult<(Self, u64)>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let scratch = Self::allocate(root).await?;
        let mut file = tokio::fs::File::create(&scratch.path).await?;
        let written = tokio::io::copy(reader, &mut file).await?;
        file.flush().await?;
        file.sync_all().await?;
        tracing::trace!(path = %scratch.path.display(), bytes = written, "scratch file written");
        Ok((scratch, written))
    }

    pub async fn from_bytes(root: &Path, bytes: &[u8]) -> GitResult<Self> {
        let scratch = Self::allocate(root).await?;
        tokio::fs::write(&scratch.path, bytes).await?;
        Ok(scratch)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The private directory holding the file.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    async fn allocate(root: &Path) -> GitResult<Self> {
        tokio::fs::create_dir_all(root).await?;
        let dir = tempfile::Builder::new().prefix("bundle-").tempdir_in(root)?;
        let path = dir.path().join(PAYLOAD_NAME);
        Ok(Self { dir, path })
    }
}
