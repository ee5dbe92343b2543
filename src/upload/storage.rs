use std::path::{Path, PathBuf};

use axum::body::Bytes;
use futures::{Stream, StreamExt};
use tokio::{fs, io::AsyncWriteExt};

use crate::error::UploadError;

/// Writes uploaded files under `root`, into destination directories that must already exist.
#[derive(Clone, Debug)]
pub struct DiskStorage {
    root: PathBuf,
    base_url: String,
    max_size: Option<usize>,
}

impl DiskStorage {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
            max_size: None,
        }
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_size(&self) -> Option<usize> {
        self.max_size
    }

    /// Streams `chunks` into `<root>/<destination>/<filename>` and returns the byte count.
    ///
    /// Never overwrites: an existing file with the same name fails with `AlreadyExists`.
    /// The partial file is removed if the stream fails or grows past the limit.
    pub async fn put_stream<S, E>(
        &self,
        destination: &str,
        filename: &str,
        chunks: S,
    ) -> Result<usize, UploadError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        UploadError: From<E>,
    {
        let path = self.resolve_path(destination, filename);
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        let written = match write_chunks(&mut file, chunks, self.max_size).await {
            Ok(written) => written,
            Err(err) => {
                drop(file);
                if let Err(remove_err) = fs::remove_file(&path).await {
                    tracing::error!(
                        path = %path.display(),
                        error = %remove_err,
                        "failed to remove partial upload"
                    );
                }
                return Err(err);
            }
        };
        file.flush().await?;
        Ok(written)
    }

    pub async fn remove(&self, destination: &str, filename: &str) -> Result<(), UploadError> {
        fs::remove_file(self.resolve_path(destination, filename)).await?;
        Ok(())
    }

    pub fn resolve_path(&self, destination: &str, filename: &str) -> PathBuf {
        let destination = destination.trim_start_matches('/');
        let filename = filename.trim_start_matches('/');
        self.root.join(Path::new(destination)).join(Path::new(filename))
    }

    pub fn public_url(&self, filename: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let filename = filename.trim_start_matches('/');
        format!("{base}/{filename}")
    }
}

async fn write_chunks<S, E>(
    file: &mut fs::File,
    chunks: S,
    max_size: Option<usize>,
) -> Result<usize, UploadError>
where
    S: Stream<Item = Result<Bytes, E>>,
    UploadError: From<E>,
{
    let mut chunks = std::pin::pin!(chunks);
    let mut size = 0;
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        size += chunk.len();
        if let Some(limit) = max_size {
            if size > limit {
                return Err(UploadError::FileTooLarge { limit });
            }
        }
        file.write_all(&chunk).await?;
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn chunks(parts: &'static [&'static str]) -> impl Stream<Item = Result<Bytes, std::io::Error>> {
        stream::iter(
            parts
                .iter()
                .map(|part| Ok(Bytes::from_static(part.as_bytes())))
                .collect::<Vec<_>>(),
        )
    }

    fn root_with_images() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("images")).unwrap();
        dir
    }

    #[tokio::test]
    async fn writes_all_chunks_to_destination() {
        let dir = root_with_images();
        let storage = DiskStorage::new(dir.path(), "/images");

        let size = storage
            .put_stream("images", "cat1.png", chunks(&["ab", "cd", "e"]))
            .await
            .unwrap();

        assert_eq!(size, 5);
        let written = std::fs::read(dir.path().join("images/cat1.png")).unwrap();
        assert_eq!(written, b"abcde");

        storage.remove("images", "cat1.png").await.unwrap();
        assert!(!dir.path().join("images/cat1.png").exists());
    }

    #[tokio::test]
    async fn removes_partial_file_when_limit_is_exceeded() {
        let dir = root_with_images();
        let storage = DiskStorage::new(dir.path(), "/images").with_max_size(3);

        let err = storage
            .put_stream("images", "big1.png", chunks(&["ab", "cd"]))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::FileTooLarge { limit: 3 }));
        assert!(!dir.path().join("images/big1.png").exists());
    }

    #[tokio::test]
    async fn name_collision_keeps_the_stored_file() {
        let dir = root_with_images();
        let storage = DiskStorage::new(dir.path(), "/images");
        storage
            .put_stream("images", "cat1700000000000.png", chunks(&["first"]))
            .await
            .unwrap();

        let limited = storage.clone().with_max_size(2);
        let err = limited
            .put_stream("images", "cat1700000000000.png", chunks(&["toolong"]))
            .await
            .unwrap_err();

        match err {
            UploadError::Io(io) => assert_eq!(io.kind(), std::io::ErrorKind::AlreadyExists),
            other => panic!("expected AlreadyExists, got {other:?}"),
        }
        let stored = std::fs::read(dir.path().join("images/cat1700000000000.png")).unwrap();
        assert_eq!(stored, b"first");

        let err = storage
            .put_stream("images", "cat1700000000000.png", chunks(&["second"]))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Io(_)));
        let stored = std::fs::read(dir.path().join("images/cat1700000000000.png")).unwrap();
        assert_eq!(stored, b"first");
    }

    #[tokio::test]
    async fn removes_partial_file_when_stream_fails() {
        let dir = root_with_images();
        let storage = DiskStorage::new(dir.path(), "/images");
        let failing = stream::iter(vec![
            Ok(Bytes::from_static(b"ab")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
        ]);

        let err = storage
            .put_stream("images", "broken1.png", failing)
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Io(_)));
        assert!(!dir.path().join("images/broken1.png").exists());
    }

    #[tokio::test]
    async fn does_not_create_missing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskStorage::new(dir.path(), "/images");

        let err = storage
            .put_stream("images", "a1.png", chunks(&["a"]))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Io(_)));
        assert!(!dir.path().join("images").exists());
    }

    #[test]
    fn joins_public_url_without_double_slashes() {
        let storage = DiskStorage::new(".", "http://localhost:3000/images/");
        assert_eq!(
            storage.public_url("/a1.png"),
            "http://localhost:3000/images/a1.png"
        );
        assert_eq!(
            storage.resolve_path("images", "/a1.png"),
            PathBuf::from(".").join("images").join("a1.png")
        );
    }
}
