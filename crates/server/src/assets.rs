//! Per-collection asset directories on the local file system.
//!
//! Uploaded images for collection `c` live under `<root>/c/`. The paths of
//! these files are what gets embedded and stored as each record's URL, so the
//! root is kept exactly as configured (usually the relative `uploads`).

use std::io;
use std::path::{Component, Path, PathBuf};

use picsearch_core::schema::validate_collection_name;
use picsearch_core::{Result, SearchError};
use walkdir::WalkDir;

/// Root of all collection asset directories.
#[derive(Debug, Clone)]
pub struct AssetStore {
    root: PathBuf,
}

impl AssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory as configured.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding a collection's assets. The collection name is validated
    /// first so it cannot escape the root.
    pub fn collection_dir(&self, collection: &str) -> Result<PathBuf> {
        validate_collection_name(collection)?;
        Ok(self.root.join(collection))
    }

    /// Lists every file under the collection's directory, recursively, in
    /// lexical order. Directories are not listed. The walk runs on the blocking
    /// pool.
    ///
    /// Fails with [`SearchError::AssetPathNotFound`] if the directory is missing.
    pub async fn list_files(&self, collection: &str) -> Result<Vec<PathBuf>> {
        let dir = self.collection_dir(collection)?;
        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => {}
            _ => return Err(SearchError::AssetPathNotFound(dir)),
        }

        tokio::task::spawn_blocking(move || walk_files(&dir))
            .await
            .map_err(|e| SearchError::Io(io::Error::other(e)))?
    }

    /// Resolves an image reference relative to the collection's directory.
    ///
    /// The reference must be a plain relative path; absolute paths and `..`
    /// components are rejected with [`SearchError::Config`]. A missing file
    /// yields [`SearchError::AssetPathNotFound`].
    pub async fn resolve_image(&self, collection: &str, image_ref: &str) -> Result<PathBuf> {
        let relative = Path::new(image_ref);
        let plain = !image_ref.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !plain {
            return Err(SearchError::Config(format!(
                "search_img must be a relative path inside the collection, got '{image_ref}'"
            )));
        }

        let path = self.collection_dir(collection)?.join(relative);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            _ => Err(SearchError::AssetPathNotFound(path)),
        }
    }

    /// Writes an uploaded file into the collection's directory, creating it if
    /// needed. Only the final component of `file_name` is used.
    pub async fn save_upload(
        &self,
        collection: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<PathBuf> {
        let name = Path::new(file_name)
            .file_name()
            .ok_or_else(|| SearchError::Config(format!("invalid file name '{file_name}'")))?;
        let dir = self.collection_dir(collection)?;
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(name);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Removes the collection's directory. A directory that is already gone is
    /// not an error.
    pub async fn purge(&self, collection: &str) -> Result<()> {
        let dir = self.collection_dir(collection)?;
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn walk_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            SearchError::Io(
                e.into_io_error()
                    .unwrap_or_else(|| io::Error::other("directory walk loop")),
            )
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Renders a path with forward slashes, as stored in the `url` field.
///
/// Only separators change: `..` components and prefixes are kept, so the
/// result still names the same file. `.` components are dropped.
pub fn path_to_url(path: &Path) -> String {
    let mut url = String::new();
    for component in path.components() {
        let part = match component {
            Component::Prefix(p) => {
                url.push_str(&p.as_os_str().to_string_lossy());
                continue;
            }
            Component::RootDir => {
                url.push('/');
                continue;
            }
            Component::CurDir => continue,
            Component::ParentDir => "..".into(),
            Component::Normal(s) => s.to_string_lossy(),
        };
        if !url.is_empty() && !url.ends_with('/') {
            url.push('/');
        }
        url.push_str(&part);
    }
    url
}
