//! Content-addressed storage for uploaded report images.
//!
//! Files live under `{root}/reports/{report_id}/images/` and are named after
//! the BLAKE3 hash of their bytes, so uploading the same photograph twice
//! stores it once. Records keep paths relative to the root.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::UploadConfig;
use crate::docx::{sniff, ImageInfo};
use crate::error::{Error, Result};

/// Hex digits of the content hash used in file names.
const HASH_NAME_LEN: usize = 16;

/// A file written by [`MediaStore::store`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    /// Path relative to the media root.
    pub relative_path: PathBuf,
    /// Full BLAKE3 hash of the content.
    pub content_hash: String,
    /// Detected format and size.
    pub info: ImageInfo,
    /// False when identical content was already stored.
    pub newly_written: bool,
}

/// Image files on disk.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    limits: UploadConfig,
}

impl MediaStore {
    /// Create a store rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, limits: UploadConfig) -> Self {
        Self {
            root: root.into(),
            limits,
        }
    }

    /// The media root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a stored path.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Check an upload against the size and type limits.
    ///
    /// The declared content type must be allowed, and the bytes themselves
    /// must be a readable image.
    ///
    /// # Errors
    ///
    /// Returns an invalid-input error describing the first failed check.
    pub fn check_upload(&self, content_type: Option<&str>, bytes: &[u8]) -> Result<ImageInfo> {
        if bytes.is_empty() {
            return Err(Error::invalid_input("uploaded file is empty"));
        }
        if bytes.len() as u64 > self.limits.max_file_bytes {
            return Err(Error::invalid_input(format!(
                "file is {} bytes; the limit is {} bytes",
                bytes.len(),
                self.limits.max_file_bytes
            )));
        }
        if let Some(content_type) = content_type {
            let essence = content_type
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase();
            if !self.limits.allowed_content_types.iter().any(|t| *t == essence) {
                return Err(Error::invalid_input(format!(
                    "content type {essence} is not allowed"
                )));
            }
        }
        sniff(bytes).ok_or_else(|| Error::invalid_input("file is not a PNG, JPEG or GIF image"))
    }

    /// Check and write an image for a report.
    ///
    /// # Errors
    ///
    /// Returns an invalid-input error if the upload is rejected, or an I/O
    /// error if the file cannot be written.
    pub fn store(
        &self,
        report_id: i64,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<StoredMedia> {
        let info = self.check_upload(content_type, bytes)?;
        let content_hash = blake3::hash(bytes).to_hex().to_string();

        let relative_dir = PathBuf::from("reports")
            .join(report_id.to_string())
            .join("images");
        let dir = self.root.join(&relative_dir);
        fs::create_dir_all(&dir).map_err(|source| Error::DirectoryCreate {
            path: dir.clone(),
            source,
        })?;

        let file_name = format!(
            "{}.{}",
            &content_hash[..HASH_NAME_LEN],
            info.format.extension()
        );
        let path = dir.join(&file_name);
        let newly_written = !path.exists();
        if newly_written {
            fs::write(&path, bytes)?;
        }
        debug!(
            report_id,
            path = %path.display(),
            bytes = bytes.len(),
            newly_written,
            "Stored report image"
        );

        Ok(StoredMedia {
            relative_path: relative_dir.join(file_name),
            content_hash,
            info,
            newly_written,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::image::fixtures::{jpeg, png};
    use crate::docx::ImageFormat;

    fn store(dir: &Path) -> MediaStore {
        MediaStore::new(dir, UploadConfig::default())
    }

    #[test]
    fn test_store_content_addressed() {
        let dir = tempfile::tempdir().unwrap();
        let media = store(dir.path());

        let first = media.store(7, Some("image/png"), &png(64, 48)).unwrap();
        assert!(first.newly_written);
        assert_eq!(first.info.format, ImageFormat::Png);
        assert!(first.relative_path.starts_with("reports/7/images"));
        assert_eq!(
            first.relative_path.extension().and_then(|e| e.to_str()),
            Some("png")
        );
        assert!(media.resolve(&first.relative_path).exists());

        let again = media.store(7, Some("image/png"), &png(64, 48)).unwrap();
        assert!(!again.newly_written);
        assert_eq!(again.relative_path, first.relative_path);

        let other = media.store(7, None, &jpeg(10, 10)).unwrap();
        assert_ne!(other.relative_path, first.relative_path);
    }

    #[test]
    fn test_check_upload_rejections() {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStore::new(
            dir.path(),
            UploadConfig {
                max_file_bytes: 40,
                ..UploadConfig::default()
            },
        );

        assert!(media.check_upload(Some("image/png"), &[]).is_err());
        assert!(media.check_upload(Some("application/pdf"), &png(1, 1)).is_err());
        assert!(media.check_upload(Some("image/png"), b"plain text").is_err());
        assert!(media.check_upload(Some("image/png"), &[0x89; 41]).is_err());
        assert!(media
            .check_upload(Some("image/PNG; charset=binary"), &png(1, 1))
            .is_ok());
    }

    #[test]
    fn test_resolve_keeps_absolute_paths() {
        let media = store(Path::new("/srv/media"));
        assert_eq!(
            media.resolve(Path::new("reports/1/images/a.png")),
            PathBuf::from("/srv/media/reports/1/images/a.png")
        );
        assert_eq!(
            media.resolve(Path::new("/tmp/a.png")),
            PathBuf::from("/tmp/a.png")
        );
    }
}
