use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{FromRef, FromRequest, Multipart, Request};

use super::{DiskStorage, ImageMime, IncomingFile, resolve_destination, resolve_filename};
use crate::error::UploadError;

/// Accepts at most one image per request on a single form field.
#[derive(Clone, Debug)]
pub struct ImageUploader {
    field_name: String,
    reject_unsupported: bool,
    storage: DiskStorage,
}

#[derive(Clone, Debug)]
pub struct UploadedImage {
    pub field_name: String,
    pub original_name: String,
    pub mime_type: String,
    pub destination: String,
    pub filename: String,
    pub path: PathBuf,
    pub size: usize,
}

/// Extractor result: the stored image, if any, and the text fields of the form.
#[derive(Debug, Default)]
pub struct SingleImageUpload {
    pub file: Option<UploadedImage>,
    pub fields: BTreeMap<String, String>,
}

impl ImageUploader {
    pub fn new(field_name: impl Into<String>, storage: DiskStorage) -> Self {
        Self {
            field_name: field_name.into(),
            reject_unsupported: true,
            storage,
        }
    }

    /// When disabled, unknown MIME types are stored with the `undefined` extension.
    pub fn reject_unsupported(mut self, reject: bool) -> Self {
        self.reject_unsupported = reject;
        self
    }

    pub fn storage(&self) -> &DiskStorage {
        &self.storage
    }

    /// Reads the whole form. A file stored before a later failure is removed again.
    pub async fn accept(
        &self,
        mut multipart: Multipart,
    ) -> Result<SingleImageUpload, UploadError> {
        let mut upload = SingleImageUpload::default();
        let result = self.read_parts(&mut multipart, &mut upload).await;
        if let Err(err) = result {
            if let Some(file) = upload.file.take() {
                let removed = self
                    .storage
                    .remove(&file.destination, &file.filename)
                    .await;
                if let Err(remove_err) = removed {
                    tracing::error!(
                        path = %file.path.display(),
                        error = %remove_err,
                        "failed to remove rejected upload"
                    );
                }
            }
            return Err(err);
        }
        Ok(upload)
    }

    async fn read_parts(
        &self,
        multipart: &mut Multipart,
        upload: &mut SingleImageUpload,
    ) -> Result<(), UploadError> {
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            let Some(raw_name) = field.file_name() else {
                let value = field.text().await?;
                upload.fields.insert(name, value);
                continue;
            };
            if raw_name.is_empty() {
                continue;
            }
            let original_name = base_name(raw_name);
            if original_name.is_empty() || name != self.field_name || upload.file.is_some() {
                return Err(UploadError::UnexpectedField(name));
            }

            let mime_type = field.content_type().unwrap_or_default().to_string();
            if self.reject_unsupported && ImageMime::from_mime_type(&mime_type).is_none() {
                return Err(UploadError::UnsupportedMimeType(mime_type));
            }

            let incoming = IncomingFile::new(&original_name, &mime_type);
            let destination = resolve_destination(&incoming).to_string();
            let filename = resolve_filename(&incoming);
            let size = self.storage.put_stream(&destination, &filename, field).await?;
            let path = self.storage.resolve_path(&destination, &filename);
            tracing::info!(
                path = %path.display(),
                size,
                mime_type = %mime_type,
                "image stored"
            );

            upload.file = Some(UploadedImage {
                field_name: name,
                original_name,
                mime_type,
                destination,
                filename,
                path,
                size,
            });
        }
        Ok(())
    }
}

/// Drops any directory part a client may have put in the filename.
fn base_name(file_name: &str) -> String {
    file_name
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .to_string()
}

impl<S> FromRequest<S> for SingleImageUpload
where
    S: Send + Sync,
    Arc<ImageUploader>: FromRef<S>,
{
    type Rejection = UploadError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let uploader = Arc::<ImageUploader>::from_ref(state);
        let multipart = Multipart::from_request(req, state).await?;
        uploader.accept(multipart).await
    }
}
