use parley_core::ParleyResult;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A uniquely named temporary directory owned by one request.
///
/// Everything written inside is removed when the value is dropped, whichever
/// way the owning request exits.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    /// Creates a fresh directory under `root`, or the system temp dir when
    /// `root` is `None`.
    pub fn create(root: Option<&Path>) -> ParleyResult<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("parley-voice-");
        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }?;
        tracing::debug!(path = %dir.path().display(), "Scratch directory created");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// A path for a new file inside this directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Removes the directory now, reporting failures instead of ignoring them.
    pub fn close(self) -> ParleyResult<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        tracing::debug!(path = %path.display(), "Scratch directory removed");
        Ok(())
    }
}
