#![forbid(unsafe_code)]

//! Local filesystem layout: a work directory for intermediate downloads and an
//! output directory for finished artifacts.

use std::io;
use std::path::{Component, Path, PathBuf};

use tokio::fs::File;
use tracing::{debug, warn};

use crate::error::{DeliveryError, StoreError};
use crate::job::{JobId, TargetFormat};

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    output_dir: PathBuf,
    work_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(output_dir: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            work_dir: work_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Creates both directories. Called before every job so an operator can
    /// wipe them while the server runs.
    pub async fn prepare(&self) -> Result<(), StoreError> {
        for dir in [&self.output_dir, &self.work_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| StoreError::Prepare {
                    path: dir.display().to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    pub fn output_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }

    /// Scratch file for the raw download that precedes a conversion.
    pub fn intermediate_path(&self, id: JobId, extension: &str) -> PathBuf {
        self.work_dir.join(format!("{id}.{extension}"))
    }

    /// Work-directory file a job writes its final bytes into before
    /// [`promote`](Self::promote) moves them to the output directory.
    pub fn staging_path(&self, id: JobId) -> PathBuf {
        self.work_dir.join(format!("{id}.part"))
    }

    /// Moves a fully written staging file to `output`, replacing any earlier
    /// artifact of the same name in one step.
    pub async fn promote(&self, staging: &Path, output: &Path) -> Result<(), StoreError> {
        let promote_error = |source| StoreError::Promote {
            path: output.display().to_string(),
            source,
        };
        match tokio::fs::rename(staging, output).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::CrossesDevices => {
                debug!(path = %output.display(), "work and output differ in filesystem, copying");
                tokio::fs::copy(staging, output)
                    .await
                    .map_err(promote_error)?;
                remove_quietly(staging).await;
                Ok(())
            }
            Err(err) => Err(promote_error(err)),
        }
    }

    /// Resolves a client-supplied artifact name to an existing file.
    pub async fn locate(&self, name: &str) -> Result<PathBuf, DeliveryError> {
        if !is_safe_segment(name) {
            return Err(DeliveryError::NotFound(name.to_string()));
        }
        let path = self.output_dir.join(name);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(DeliveryError::NotFound(name.to_string())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(DeliveryError::NotFound(name.to_string()))
            }
            Err(source) => Err(DeliveryError::Io {
                name: name.to_string(),
                source,
            }),
        }
    }

    /// Opens an artifact for streaming, returning the handle and its size.
    pub async fn open(&self, name: &str) -> Result<(File, u64), DeliveryError> {
        let path = self.locate(name).await?;
        let io_error = |source| DeliveryError::Io {
            name: name.to_string(),
            source,
        };
        let file = File::open(&path).await.map_err(io_error)?;
        let size = file.metadata().await.map_err(io_error)?.len();
        Ok((file, size))
    }
}

/// Deletes a partial or intermediate file. Failures are logged, never raised.
pub async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "removed leftover file"),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!(path = %path.display(), "could not remove leftover file: {err}"),
    }
}

/// Final file name: sanitized title plus the format's extension.
pub fn artifact_name(title: &str, fallback: &str, format: TargetFormat) -> String {
    let stem = sanitize_title(title);
    let stem = if stem.is_empty() {
        sanitize_title(fallback)
    } else {
        stem
    };
    format!("{stem}.{}", format.extension())
}

/// Keeps ASCII letters, digits, `_`, `-`, `.` and whitespace. Whitespace runs
/// collapse to one space and the result is trimmed.
pub fn sanitize_title(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|&ch| {
            ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.') || ch.is_whitespace()
        })
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A single normal path segment; anything that could leave the output
/// directory is refused.
fn is_safe_segment(value: &str) -> bool {
    let mut components = Path::new(value).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn sanitize_title_drops_unsafe_characters() {
        assert_eq!(sanitize_title("AC/DC: Back in Black?"), "ACDC Back in Black");
        assert_eq!(sanitize_title("  multi\t\tspace\nline  "), "multi space line");
        assert_eq!(sanitize_title("keep_me-1.0"), "keep_me-1.0");
        assert_eq!(sanitize_title("日本語"), "");
    }

    #[test]
    fn artifact_name_falls_back_to_id() {
        assert_eq!(
            artifact_name("Song | Live", "abc", TargetFormat::Audio),
            "Song Live.mp3"
        );
        assert_eq!(
            artifact_name("???", "dQw4w9WgXcQ", TargetFormat::Muxed),
            "dQw4w9WgXcQ.mp4"
        );
    }

    #[test]
    fn safe_segment_rejects_traversal() {
        assert!(is_safe_segment("song.mp3"));
        assert!(!is_safe_segment(""));
        assert!(!is_safe_segment("../secret"));
        assert!(!is_safe_segment("nested/file.mp3"));
        assert!(!is_safe_segment("/etc/passwd"));
        assert!(!is_safe_segment(".."));
    }

    #[tokio::test]
    async fn prepare_creates_both_directories() -> Result<()> {
        let dir = tempdir()?;
        let store = ArtifactStore::new(dir.path().join("out"), dir.path().join("work"));
        store.prepare().await?;
        assert!(store.output_dir().is_dir());
        assert!(store.work_dir().is_dir());
        Ok(())
    }

    #[tokio::test]
    async fn locate_reports_missing_artifacts() -> Result<()> {
        let dir = tempdir()?;
        let store = ArtifactStore::new(dir.path().join("out"), dir.path().join("work"));
        store.prepare().await?;

        let err = store.locate("never-written.mp3").await.unwrap_err();
        assert!(matches!(err, DeliveryError::NotFound(_)));
        let err = store.locate("../work").await.unwrap_err();
        assert!(matches!(err, DeliveryError::NotFound(_)));

        std::fs::write(store.output_path("song.mp3"), b"ID3")?;
        let (_file, size) = store.open("song.mp3").await?;
        assert_eq!(size, 3);
        Ok(())
    }

    #[tokio::test]
    async fn prepare_reports_blocked_directory() -> Result<()> {
        let dir = tempdir()?;
        std::fs::write(dir.path().join("out"), b"not a directory")?;
        let store = ArtifactStore::new(dir.path().join("out"), dir.path().join("work"));
        let err = store.prepare().await.unwrap_err();
        assert!(matches!(err, StoreError::Prepare { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn promote_replaces_existing_artifact() -> Result<()> {
        let dir = tempdir()?;
        let store = ArtifactStore::new(dir.path().join("out"), dir.path().join("work"));
        store.prepare().await?;
        let id = JobId::new();
        let output = store.output_path("Song.mp3");
        std::fs::write(&output, b"old")?;
        std::fs::write(store.staging_path(id), b"new")?;

        store.promote(&store.staging_path(id), &output).await?;
        assert_eq!(std::fs::read(&output)?, b"new");
        assert!(!store.staging_path(id).exists());
        Ok(())
    }

    #[tokio::test]
    async fn remove_quietly_ignores_missing_files() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("partial.mp4");
        remove_quietly(&path).await;
        std::fs::write(&path, b"x")?;
        remove_quietly(&path).await;
        assert!(!path.exists());
        Ok(())
    }
}
