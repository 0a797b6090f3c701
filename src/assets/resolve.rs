//! Resolving request paths to files under the content root.

use std::path::{Path, PathBuf};

use tokio::sync::OnceCell;

use crate::assets::path::is_within_root;
use crate::assets::policy::AssetCategory;
use crate::error::{AppError, AppResult};

/// A file that may be delivered, with its caching category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    pub path: PathBuf,
    pub category: AssetCategory,
}

/// The directory assets are served from.
#[derive(Debug, Clone)]
pub struct ContentRoot {
    root: PathBuf,
    canonical: OnceCell<PathBuf>,
    index_file: String,
}

impl ContentRoot {
    /// Open a content root, canonicalizing it when it exists.
    ///
    /// A missing root is not fatal: lookups miss until the directory
    /// appears, and it is canonicalized on the first lookup after that.
    pub async fn open(root: &Path, index_file: impl Into<String>) -> Self {
        let canonical = match tokio::fs::canonicalize(root).await {
            Ok(canonical) => OnceCell::new_with(Some(canonical)),
            Err(e) => {
                tracing::warn!(
                    root = %root.display(),
                    error = %e,
                    "Content root unavailable; asset lookups will miss until it exists"
                );
                OnceCell::new()
            }
        };

        Self {
            root: std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf()),
            canonical,
            index_file: index_file.into(),
        }
    }

    pub fn path(&self) -> &Path {
        self.canonical.get().unwrap_or(&self.root)
    }

    async fn canonical_root(&self) -> AppResult<&Path> {
        let root = self
            .canonical
            .get_or_try_init(|| tokio::fs::canonicalize(&self.root))
            .await?;
        Ok(root.as_path())
    }

    /// Map `request_path` to a regular file inside the root.
    pub async fn resolve(&self, request_path: &str) -> AppResult<ResolvedAsset> {
        let relative = is_within_root(request_path).ok_or(AppError::PathTraversalAttempt)?;
        let root = self.canonical_root().await?;
        let mut candidate = root.join(relative);

        let mut metadata = tokio::fs::metadata(&candidate).await?;
        if metadata.is_dir() {
            candidate.push(&self.index_file);
            metadata = tokio::fs::metadata(&candidate).await?;
        }
        if !metadata.is_file() {
            return Err(AppError::AssetNotFound);
        }

        // A symlink inside the root may still point outside it.
        let canonical = tokio::fs::canonicalize(&candidate).await?;
        if !canonical.starts_with(root) {
            return Err(AppError::PathTraversalAttempt);
        }

        Ok(ResolvedAsset {
            category: AssetCategory::from_path(&canonical),
            path: canonical,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
        fs::write(dir.path().join("style.css"), "body{}").unwrap();
        fs::create_dir(dir.path().join("media")).unwrap();
        fs::write(dir.path().join("media").join("clip.mp4"), [0u8; 16]).unwrap();
        fs::create_dir(dir.path().join("empty")).unwrap();
        dir
    }

    #[tokio::test]
    async fn resolves_files_with_category() {
        let dir = site();
        let root = ContentRoot::open(dir.path(), "index.html").await;

        let css = root.resolve("/style.css").await.unwrap();
        assert_eq!(css.category, AssetCategory::Other);
        assert!(css.path.ends_with("style.css"));

        let video = root.resolve("/media/clip.mp4").await.unwrap();
        assert_eq!(video.category, AssetCategory::Video);
    }

    #[tokio::test]
    async fn directories_map_to_index() {
        let dir = site();
        let root = ContentRoot::open(dir.path(), "index.html").await;

        let home = root.resolve("/").await.unwrap();
        assert_eq!(home.category, AssetCategory::Markup);
        assert!(home.path.ends_with("index.html"));

        assert!(matches!(
            root.resolve("/empty/").await,
            Err(AppError::AssetNotFound)
        ));
    }

    #[tokio::test]
    async fn missing_and_escaping_paths_miss() {
        let dir = site();
        let root = ContentRoot::open(dir.path(), "index.html").await;

        assert!(matches!(
            root.resolve("/does-not-exist.html").await,
            Err(AppError::AssetNotFound)
        ));
        assert!(matches!(
            root.resolve("/../../secret").await,
            Err(AppError::PathTraversalAttempt)
        ));
        assert!(matches!(
            root.resolve("/style.css/nested").await,
            Err(AppError::AssetNotFound)
        ));
    }

    #[tokio::test]
    async fn missing_root_resolves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let root = ContentRoot::open(&dir.path().join("absent"), "index.html").await;
        assert!(matches!(root.resolve("/").await, Err(AppError::AssetNotFound)));
    }

    #[tokio::test]
    async fn root_created_after_open_is_served() {
        let dir = tempfile::tempdir().unwrap();
        let late = dir.path().join("late");
        let root = ContentRoot::open(&late, "index.html").await;
        assert!(matches!(root.resolve("/").await, Err(AppError::AssetNotFound)));

        fs::create_dir(&late).unwrap();
        fs::write(late.join("index.html"), "<h1>late</h1>").unwrap();

        let home = root.resolve("/").await.unwrap();
        assert_eq!(home.category, AssetCategory::Markup);
        assert!(home.path.ends_with("index.html"));
        assert!(root.path().is_absolute());
    }

    #[tokio::test]
    async fn overlong_names_miss() {
        let dir = site();
        let root = ContentRoot::open(dir.path(), "index.html").await;
        let path = format!("/{}.html", "a".repeat(300));
        assert!(matches!(root.resolve(&path).await, Err(AppError::AssetNotFound)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinks_out_of_root_are_refused() {
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("secret.txt"), "top secret").unwrap();

        let dir = site();
        std::os::unix::fs::symlink(
            outside.path().join("secret.txt"),
            dir.path().join("leak.txt"),
        )
        .unwrap();

        let root = ContentRoot::open(dir.path(), "index.html").await;
        assert!(matches!(
            root.resolve("/leak.txt").await,
            Err(AppError::PathTraversalAttempt)
        ));
    }
}
