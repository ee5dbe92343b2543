pub mod resolver;
pub mod single;
pub mod storage;

pub use resolver::{
    IMAGES_DIR, IncomingFile, MISSING_EXTENSION, resolve_destination, resolve_filename,
    resolve_filename_at,
};
pub use single::{ImageUploader, SingleImageUpload, UploadedImage};
pub use storage::DiskStorage;

/// Image formats accepted by the upload route.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageMime {
    Jpeg,
    Png,
}

impl ImageMime {
    pub fn from_mime_type(mime_type: &str) -> Option<Self> {
        match mime_type.trim().to_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}
