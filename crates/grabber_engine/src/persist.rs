use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine_logging::{engine_debug, engine_warn};
use tempfile::{Builder, NamedTempFile, TempPath};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("{path} is not a directory")]
    NotADirectory { path: String },
    #[error("output directory {path} unusable: {source}")]
    OutputDir {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("cannot write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Create `dir` if needed and confirm a file can be written inside it.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    let unusable = |source: io::Error| PersistError::OutputDir {
        path: dir.display().to_string(),
        source,
    };
    if dir.exists() && !dir.is_dir() {
        return Err(PersistError::NotADirectory {
            path: dir.display().to_string(),
        });
    }
    fs::create_dir_all(dir).map_err(unusable)?;
    // The scratch file is deleted when dropped.
    NamedTempFile::new_in(dir).map_err(unusable)?;
    Ok(())
}

/// A download in flight. Bytes go to a uniquely named `.part` file beside
/// the archive; only `commit` puts them at the archive path, so jobs that
/// share a destination never delete each other's output.
///
/// Dropping an uncommitted download removes its part file.
pub struct PartialDownload {
    part: TempPath,
    target: PathBuf,
}

impl PartialDownload {
    pub fn create(target: &Path) -> Result<Self, PersistError> {
        let write_error = |source: io::Error| PersistError::Write {
            path: target.display().to_string(),
            source,
        };
        let dir = target.parent().unwrap_or_else(|| Path::new("."));
        let name = target
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let part = Builder::new()
            .prefix(&format!(".{name}."))
            .suffix(".part")
            .tempfile_in(dir)
            .map_err(write_error)?
            .into_temp_path();
        Ok(Self {
            part,
            target: target.to_path_buf(),
        })
    }

    /// Where the downloader writes.
    pub fn path(&self) -> &Path {
        &self.part
    }

    /// Move the finished bytes to the archive path, replacing any file there.
    pub fn commit(self) -> Result<PathBuf, PersistError> {
        self.part
            .persist(&self.target)
            .map_err(|err| PersistError::Write {
                path: self.target.display().to_string(),
                source: err.error,
            })?;
        engine_debug!("Committed download to {:?}", self.target);
        Ok(self.target)
    }

    /// Delete the part file of a failed or cancelled download.
    pub fn discard(self) {
        let part = self.part.to_path_buf();
        match self.part.close() {
            Ok(()) => engine_debug!("Removed partial download {:?}", part),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => engine_warn!("Failed to remove partial download {:?}: {}", part, err),
        }
    }
}
