//! Image uploads. Files are streamed to the upload directory as `{uuid v7}.{ext}` and
//! served back under `/uploads`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use axum::extract::Multipart;
use axum::extract::multipart::Field;
use error_stack::{Report, ResultExt};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
pub const MAX_HERITAGE_IMAGES: usize = 5;

pub const NOT_AN_IMAGE: &str = "Only image files are allowed (jpeg, png, gif, webp)";
pub const IMAGE_TOO_LARGE: &str = "File too large. Maximum size is 5MB";
pub const TOO_MANY_IMAGES: &str = "Too many files. Maximum is 5";

const ACCEPTED_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

#[derive(Debug, thiserror::Error)]
#[error("failed to store uploaded file")]
pub struct UploadErr;

/// Why a multipart request could not be read.
#[derive(Debug)]
pub enum FormError {
    /// Client error, the message is returned with a 400.
    Rejected(String),
    Storage(Report<UploadErr>),
}

impl From<Report<UploadErr>> for FormError {
    fn from(value: Report<UploadErr>) -> Self {
        Self::Storage(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub filename: String,
    pub original_name: String,
    pub path: String,
    pub size: i64,
    pub mime_type: String,
}

impl StoredFile {
    /// The path the file is served from.
    pub fn public_path(&self) -> String {
        format!("/uploads/{}", self.filename)
    }
}

/// Text fields and stored files of one multipart request.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub files: Vec<StoredFile>,
}

impl MultipartForm {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn take_text(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dir(&self) -> Result<(), Report<UploadErr>> {
        fs::create_dir_all(&self.dir)
            .await
            .change_context(UploadErr)
            .attach_with(|| format!("upload dir: {}", self.dir.display()))
    }

    /// Reads every field of the request. Files are only accepted from `file_field`, at most
    /// `max_files` of them. Anything already stored is removed when reading fails.
    #[instrument(skip(self, multipart))]
    pub async fn read_form(
        &self,
        mut multipart: Multipart,
        file_field: &str,
        max_files: usize,
    ) -> Result<MultipartForm, FormError> {
        let mut form = MultipartForm::default();

        loop {
            let field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(e) => {
                    self.discard(&form.files).await;
                    return Err(FormError::Rejected(e.body_text()));
                }
            };

            let name = field.name().unwrap_or_default().to_owned();

            let outcome = if name == file_field && field.file_name().is_some() {
                if form.files.len() == max_files {
                    Err(FormError::Rejected(TOO_MANY_IMAGES.to_owned()))
                } else {
                    self.store(field).await.map(|f| form.files.push(f))
                }
            } else {
                field
                    .text()
                    .await
                    .map(|value| {
                        form.fields.insert(name, value);
                    })
                    .map_err(|e| FormError::Rejected(e.body_text()))
            };

            if let Err(e) = outcome {
                self.discard(&form.files).await;
                return Err(e);
            }
        }

        debug!("read multipart form with {} file(s)", form.files.len());
        Ok(form)
    }

    async fn store(&self, mut field: Field<'_>) -> Result<StoredFile, FormError> {
        let mime_type = field.content_type().unwrap_or_default().to_ascii_lowercase();
        let Some(ext) = extension_for(&mime_type) else {
            return Err(FormError::Rejected(NOT_AN_IMAGE.to_owned()));
        };

        let original_name = field.file_name().unwrap_or_default().to_owned();
        let filename = format!("{}.{ext}", Uuid::now_v7());
        let path = self.dir.join(&filename);

        let mut file = File::create(&path)
            .await
            .change_context(UploadErr)
            .attach_with(|| format!("path: {}", path.display()))?;

        let mut size = 0usize;
        let written: Result<(), FormError> = async {
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|e| FormError::Rejected(e.body_text()))?
            {
                size += chunk.len();
                if size > MAX_IMAGE_BYTES {
                    return Err(FormError::Rejected(IMAGE_TOO_LARGE.to_owned()));
                }
                file.write_all(&chunk).await.change_context(UploadErr)?;
            }
            file.flush().await.change_context(UploadErr)?;
            Ok(())
        }
        .await;

        if let Err(e) = written {
            remove(&path).await;
            return Err(e);
        }

        Ok(StoredFile {
            original_name,
            path: path.to_string_lossy().into_owned(),
            size: size as i64,
            mime_type,
            filename,
        })
    }

    /// Removes files whose database write did not happen.
    pub async fn discard(&self, files: &[StoredFile]) {
        for file in files {
            remove(&self.dir.join(&file.filename)).await;
        }
    }
}

async fn remove(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        warn!("failed to remove upload {}: {e}", path.display());
    }
}

fn extension_for(mime_type: &str) -> Option<&'static str> {
    ACCEPTED_TYPES
        .iter()
        .find(|(m, _)| *m == mime_type)
        .map(|(_, ext)| *ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_images_have_extensions() {
        assert_eq!(Some("jpg"), extension_for("image/jpeg"));
        assert_eq!(Some("webp"), extension_for("image/webp"));
        assert_eq!(None, extension_for("application/pdf"));
        assert_eq!(None, extension_for("image/svg+xml"));
    }

    #[test]
    fn public_path_uses_filename() {
        let file = StoredFile {
            filename: "0190.png".into(),
            original_name: "stupa.png".into(),
            path: "uploads/0190.png".into(),
            size: 4,
            mime_type: "image/png".into(),
        };

        assert_eq!("/uploads/0190.png", file.public_path());
    }
}
