//! Upload storage and the pending file set.
//!
//! Uploaded documents are streamed into a single flat directory under a
//! generated collision-resistant name (UUIDv4 plus the sanitized lowercase
//! extension). Files land on disk before the intake transaction runs, so
//! every file written for a request is tracked in a [`PendingFiles`] set and
//! deleted as a unit if the request aborts on any branch.

use std::path::{Path, PathBuf};

use axum::extract::multipart::Field;
use tokio::io::AsyncWriteExt;
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;

/// Boundary limits for one intake submission.
pub const MAX_FILES_PER_SUBMISSION: usize = 3;
pub const MAX_FILE_BYTES: u64 = 5 * 1024 * 1024;

/// Fixed tag stored on every document row.
pub const DOCUMENT_TYPE: &str = "resume";

const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "doc", "docx"];

/// Metadata for one file retained in upload storage, as captured during the
/// multipart stream. Becomes a document row if the intake commits.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
}

/// Handle to the flat upload directory.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    /// Opens the upload directory, creating it if necessary.
    pub async fn init(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(UploadStore { root })
    }

    pub fn path_of(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    /// Streams one multipart file part into storage.
    ///
    /// The generated name is registered in `pending` before the first byte is
    /// written, so a partial write is always covered by the cleanup path. The
    /// declared media type and the file extension must both identify a PDF or
    /// Word-processor document, and the running size is capped at
    /// [`MAX_FILE_BYTES`].
    pub async fn store_field(
        &self,
        mut field: Field<'_>,
        pending: &mut PendingFiles,
    ) -> Result<StoredFile, AppError> {
        let original_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::FileRejected("File part is missing a filename".into()))?;
        let declared = field
            .content_type()
            .map(str::to_string)
            .ok_or_else(|| AppError::FileRejected("File part is missing a content type".into()))?;

        let ext = Path::new(&original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(AppError::FileRejected(
                "Only .pdf, .doc and .docx files are accepted".into(),
            ));
        }

        // Cross-check: the declared type must agree with the extension.
        let expected = mime_guess::from_ext(&ext).first_or_octet_stream();
        if declared != expected.essence_str() {
            return Err(AppError::FileRejected(format!(
                "Declared media type '{declared}' does not match the .{ext} extension"
            )));
        }

        let filename = format!("{}.{ext}", Uuid::new_v4());
        pending.register(&filename);

        let mut file = tokio::fs::File::create(self.path_of(&filename))
            .await
            .map_err(|e| AppError::Storage(format!("Failed to create upload file: {e}")))?;

        let mut size: u64 = 0;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::BadRequest(format!("Upload read error: {e}")))?
        {
            size += chunk.len() as u64;
            if size > MAX_FILE_BYTES {
                return Err(AppError::FileRejected(format!(
                    "File exceeds the {} MiB limit",
                    MAX_FILE_BYTES / (1024 * 1024)
                )));
            }
            file.write_all(&chunk)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to write upload file: {e}")))?;
        }
        file.flush()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to flush upload file: {e}")))?;

        Ok(StoredFile {
            filename,
            original_name,
            mime_type: declared,
            size_bytes: size as i64,
        })
    }
}

/// The files physically written to storage for one in-flight intake request,
/// before the outcome is known. Consumed exactly once: [`commit`] on success,
/// [`discard`] on any abort branch.
///
/// [`commit`]: PendingFiles::commit
/// [`discard`]: PendingFiles::discard
#[derive(Debug)]
pub struct PendingFiles {
    root: PathBuf,
    names: Vec<String>,
}

impl PendingFiles {
    pub fn new(store: &UploadStore) -> Self {
        PendingFiles {
            root: store.root.clone(),
            names: Vec::new(),
        }
    }

    pub(crate) fn register(&mut self, filename: &str) {
        self.names.push(filename.to_string());
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Deletes every pending file, best-effort. A failed delete is logged and
    /// never surfaces to the caller, so it cannot mask the error that caused
    /// the abort.
    pub async fn discard(self) {
        for name in &self.names {
            let path = self.root.join(name);
            if let Err(e) = tokio::fs::remove_file(&path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to clean up pending upload {}: {e}", path.display());
                }
            }
        }
    }

    /// Marks the files as owned by their document rows; nothing is deleted.
    pub fn commit(self) {}
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::{FromRequest, Multipart, Request};
    use axum::http::header::CONTENT_TYPE;

    const BOUNDARY: &str = "test-boundary";

    fn file_part(name: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
        let mut part = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"documents\"; \
             filename=\"{name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        part.extend_from_slice(bytes);
        part.extend_from_slice(b"\r\n");
        part
    }

    async fn multipart_with_file(name: &str, content_type: &str, bytes: &[u8]) -> Multipart {
        let mut body = file_part(name, content_type, bytes);
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        let req = Request::builder()
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        // Apply the same body-limit layer the intake route uses, so the
        // oversize test is bounded by MAX_FILE_BYTES rather than axum's
        // 2 MiB default.
        let identity =
            tower::service_fn(|req: Request| async move { Ok::<_, std::convert::Infallible>(req) });
        let svc = tower::Layer::layer(&crate::candidates::handlers::intake_body_limit(), identity);
        let req = tower::ServiceExt::oneshot(svc, req).await.unwrap();
        Multipart::from_request(req, &()).await.unwrap()
    }

    async fn store_one(
        store: &UploadStore,
        pending: &mut PendingFiles,
        name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<StoredFile, AppError> {
        let mut multipart = multipart_with_file(name, content_type, bytes).await;
        let field = multipart.next_field().await.unwrap().unwrap();
        store.store_field(field, pending).await
    }

    #[tokio::test]
    async fn test_stores_file_under_generated_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::init(dir.path()).await.unwrap();
        let mut pending = PendingFiles::new(&store);

        let stored = store_one(&store, &mut pending, "resume.pdf", "application/pdf", b"%PDF-1.4")
            .await
            .unwrap();

        assert_ne!(stored.filename, "resume.pdf");
        assert!(stored.filename.ends_with(".pdf"));
        assert_eq!(stored.original_name, "resume.pdf");
        assert_eq!(stored.mime_type, "application/pdf");
        assert_eq!(stored.size_bytes, 8);
        assert_eq!(pending.len(), 1);
        assert!(store.path_of(&stored.filename).exists());
    }

    #[tokio::test]
    async fn test_rejects_disallowed_extension() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::init(dir.path()).await.unwrap();
        let mut pending = PendingFiles::new(&store);

        let err = store_one(&store, &mut pending, "script.exe", "application/pdf", b"MZ")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::FileRejected(_)));
        assert!(pending.is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_rejects_mismatched_content_type() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::init(dir.path()).await.unwrap();
        let mut pending = PendingFiles::new(&store);

        let err = store_one(&store, &mut pending, "resume.pdf", "text/html", b"<html>")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::FileRejected(_)));
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_oversize_file_but_tracks_partial_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::init(dir.path()).await.unwrap();
        let mut pending = PendingFiles::new(&store);

        let big = vec![0u8; (MAX_FILE_BYTES + 1) as usize];
        let err = store_one(&store, &mut pending, "resume.pdf", "application/pdf", &big)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::FileRejected(_)));

        // The partial write was registered; discarding removes it.
        assert_eq!(pending.len(), 1);
        pending.discard().await;
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_discard_removes_all_pending_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::init(dir.path()).await.unwrap();
        let mut pending = PendingFiles::new(&store);

        for name in ["a.pdf", "b.docx"] {
            let content_type = mime_guess::from_path(name).first_or_octet_stream();
            store_one(&store, &mut pending, name, content_type.essence_str(), b"data")
                .await
                .unwrap();
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);

        pending.discard().await;
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_discard_tolerates_already_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::init(dir.path()).await.unwrap();
        let mut pending = PendingFiles::new(&store);
        pending.register("never-written.pdf");
        pending.discard().await; // must not panic
    }

    #[tokio::test]
    async fn test_commit_retains_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::init(dir.path()).await.unwrap();
        let mut pending = PendingFiles::new(&store);

        store_one(&store, &mut pending, "resume.docx", "application/vnd.openxmlformats-officedocument.wordprocessingml.document", b"PK")
            .await
            .unwrap();
        pending.commit();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
