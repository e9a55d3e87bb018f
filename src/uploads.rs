//! Disk storage for uploaded recipient photos.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::Result;

/// A photo received with a create request, fully buffered.
#[derive(Clone, Debug, PartialEq)]
pub struct PhotoUpload {
    /// Filename as sent by the client.
    pub file_name: String,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct PhotoStore {
    dir: PathBuf,
}

impl PhotoStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the upload directory if it isn't there yet.
    pub async fn ensure_dir(&self) -> Result<()> {
        if tokio::fs::try_exists(&self.dir).await? {
            return Ok(());
        }
        tokio::fs::create_dir_all(&self.dir).await?;
        info!(dir = %self.dir.display(), "uploads folder created");
        Ok(())
    }

    /// Writes the photo under a timestamped name and returns the path to
    /// record on the recipient (`<dir>/<stored name>`).
    pub async fn save(&self, upload: &PhotoUpload, timestamp_millis: i64) -> Result<String> {
        let name = stored_file_name(&upload.file_name, timestamp_millis);
        let path = self.dir.join(&name);

        let mut file = tokio::fs::File::create(&path).await?;
        file.write_all(&upload.data).await?;
        file.flush().await?;
        debug!(path = %path.display(), bytes = upload.data.len(), "stored photo");

        Ok(path.to_string_lossy().into_owned())
    }
}

/// `<millis>-<name>` where every run of whitespace in the client's
/// filename becomes a single underscore. Directory components of the
/// client's filename are dropped.
pub fn stored_file_name(original: &str, timestamp_millis: i64) -> String {
    let base = original
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(original);

    let mut name = String::with_capacity(base.len());
    let mut in_whitespace = false;
    for c in base.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                name.push('_');
            }
            in_whitespace = true;
        } else {
            name.push(c);
            in_whitespace = false;
        }
    }

    format!("{timestamp_millis}-{name}")
}
