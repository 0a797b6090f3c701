//! Startup steps that touch the filesystem.

use std::io;
use std::path::Path;

/// Make sure the working data directory exists.
///
/// Returns `true` when the directory had to be created.
pub async fn ensure_data_dir(path: &Path) -> io::Result<bool> {
    if tokio::fs::try_exists(path).await? {
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} exists and is not a directory", path.display()),
            ));
        }
        return Ok(false);
    }

    tokio::fs::create_dir_all(path).await?;
    tracing::info!(path = %path.display(), "Created data directory");
    Ok(true)
}
