//! Attachment lifecycle management.
//!
//! The database record is the source of truth; external storage is cleaned
//! up on a best-effort basis. Upload-then-persist failures are compensated
//! by deleting the fresh object before the error propagates, so partial
//! failures never leak stored objects.

use async_trait::async_trait;
use rocket::http::Status;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::resp::problem::Problem;

pub mod local;

pub static ASSIGNMENT_FOLDER: &str = "assignments";
pub static AVATAR_FOLDER: &str = "avatars";

/// Path segment marking stored objects in public URLs. Anything without it
/// (e.g. the default avatar) has no deletable key.
pub static UPLOADS_MARKER: &str = "/uploads/";

pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("unable to store object '{key}': {source}")]
    Put {
        key: String,
        source: std::io::Error,
    },
    #[error("unable to delete object '{key}': {source}")]
    Delete {
        key: String,
        source: std::io::Error,
    },
}

impl From<StorageError> for Problem {
    fn from(e: StorageError) -> Self {
        tracing::error!("storage failure: {}", e);
        Problem::new_untyped(
            Status::InternalServerError,
            "File storage failed while processing request.",
        )
    }
}

/// External object storage collaborator. Keys address objects for deletion;
/// `put` returns the public URL.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8], mime_type: &str) -> Result<String, StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Metadata persisted on the owning entity. The storage key is recorded
/// explicitly at upload time instead of being re-derived from the URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StoredFile {
    pub original_name: String,
    pub key: String,
    pub url: String,
    pub mime_type: String,
}

/// An uploaded file part, read off the request before storage.
#[derive(Debug, Clone)]
pub struct Upload {
    pub original_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Accepted upload types: documents, sheets, plain text, common images and
/// zip archives.
pub fn is_accepted_mime(mime_type: &str) -> bool {
    const EXACT: &[&str] = &[
        "application/pdf",
        "application/x-pdf",
        "application/acrobat",
        "application/msword",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "application/vnd.openxmlformats-officedocument.presentationml.document",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "application/vnd.ms-powerpoint",
        "application/vnd.ms-excel",
        "application/octet-stream",
        "application/zip",
        "application/x-zip-compressed",
        "text/plain",
        "text/csv",
        "image/jpeg",
        "image/png",
        "image/gif",
    ];

    let mime_type = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    EXACT.contains(&mime_type.as_str())
}

pub fn is_image_mime(mime_type: &str) -> bool {
    matches!(
        mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
            .as_str(),
        "image/jpeg" | "image/png" | "image/gif"
    )
}

fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

/// Unique storage key: `<folder>/<random>-<sanitized original name>`.
pub fn object_key(folder: &str, original_name: &str) -> String {
    format!(
        "{}/{}-{}",
        folder,
        Uuid::new_v4().simple(),
        sanitize_file_name(original_name)
    )
}

/// Derives a storage key from a public URL for records written before keys
/// were stored explicitly. URLs without the uploads marker (the default
/// avatar in particular) yield `None` and are never deleted.
pub fn key_from_url(url: &str) -> Option<String> {
    let (_, key) = url.split_once(UPLOADS_MARKER)?;

    if key.is_empty() {
        return None;
    }

    Some(key.to_string())
}

pub mod problem {
    use crate::resp::problem::Problem;
    use rocket::http::Status;

    #[inline]
    pub fn file_too_large() -> Problem {
        Problem::new_untyped(Status::BadRequest, "File is too large.")
            .detail("Maximum upload size is 10 MiB.")
            .to_owned()
    }

    #[inline]
    pub fn unsupported_file_type(mime_type: impl ToString) -> Problem {
        Problem::new_untyped(Status::BadRequest, "Unsupported file type.")
            .detail(
                "Accepted types: PDF, DOC/DOCX, PPT/PPTX, XLS/XLSX, TXT, CSV, ZIP \
                 and common image formats (JPG, PNG, GIF).",
            )
            .insert_str("mime_type", mime_type)
            .to_owned()
    }

    #[inline]
    pub fn avatar_not_image(mime_type: impl ToString) -> Problem {
        Problem::new_untyped(Status::BadRequest, "Avatar must be an image.")
            .insert_str("mime_type", mime_type)
            .to_owned()
    }
}

/// Attachment lifecycle operations over an [`ObjectStore`].
pub struct Attachments<'a> {
    store: &'a dyn ObjectStore,
}

impl<'a> Attachments<'a> {
    pub fn new(store: &'a dyn ObjectStore) -> Attachments<'a> {
        Attachments { store }
    }

    /// Stores an upload and returns the metadata for the caller to persist
    /// on the owning entity.
    pub async fn attach(&self, folder: &str, upload: &Upload) -> Result<StoredFile, StorageError> {
        let key = object_key(folder, &upload.original_name);
        let url = self
            .store
            .put(&key, &upload.bytes, &upload.mime_type)
            .await?;

        Ok(StoredFile {
            original_name: upload.original_name.clone(),
            key,
            url,
            mime_type: upload.mime_type.clone(),
        })
    }

    /// Stores the replacement first, then best-effort deletes the
    /// superseded object.
    pub async fn replace(
        &self,
        old: Option<&StoredFile>,
        folder: &str,
        upload: &Upload,
    ) -> Result<StoredFile, StorageError> {
        let fresh = self.attach(folder, upload).await?;

        if let Some(old) = old {
            self.release(old).await;
        }

        Ok(fresh)
    }

    /// Deletes the stored object behind `file`. Used when the owning record
    /// is deleted, when metadata is superseded, and as the compensating
    /// action after a failed database write. Failures are logged, not
    /// propagated; the record state is already authoritative.
    pub async fn release(&self, file: &StoredFile) {
        let key = if file.key.is_empty() {
            match key_from_url(&file.url) {
                Some(it) => it,
                None => return,
            }
        } else {
            file.key.clone()
        };

        if let Err(e) = self.store.delete(&key).await {
            tracing::warn!("unable to clean up stored object '{}': {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory double standing in for the external storage service.
    #[derive(Default)]
    struct MemoryStore {
        objects: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl MemoryStore {
        fn contains(&self, key: &str) -> bool {
            self.objects.lock().unwrap().contains_key(key)
        }

        fn len(&self) -> usize {
            self.objects.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ObjectStore for MemoryStore {
        async fn put(
            &self,
            key: &str,
            bytes: &[u8],
            _mime_type: &str,
        ) -> Result<String, StorageError> {
            self.objects
                .lock()
                .unwrap()
                .insert(key.to_string(), bytes.to_vec());
            Ok(format!("http://localhost:8000/uploads/{}", key))
        }

        async fn delete(&self, key: &str) -> Result<(), StorageError> {
            self.objects.lock().unwrap().remove(key);
            Ok(())
        }
    }

    fn pdf_upload() -> Upload {
        Upload {
            original_name: "Baitap_chuong1.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            bytes: b"%PDF-1.4 stub".to_vec(),
        }
    }

    #[rocket::async_test]
    async fn attach_then_release_leaves_no_residual_object() {
        let store = MemoryStore::default();
        let attachments = Attachments::new(&store);

        let file = attachments
            .attach(ASSIGNMENT_FOLDER, &pdf_upload())
            .await
            .expect("attach should succeed");

        assert!(store.contains(&file.key));

        attachments.release(&file).await;

        assert!(!store.contains(&file.key));
        assert_eq!(store.len(), 0);
    }

    #[rocket::async_test]
    async fn replace_deletes_the_superseded_object() {
        let store = MemoryStore::default();
        let attachments = Attachments::new(&store);

        let first = attachments
            .attach(AVATAR_FOLDER, &pdf_upload())
            .await
            .expect("attach should succeed");

        let second = attachments
            .replace(Some(&first), AVATAR_FOLDER, &pdf_upload())
            .await
            .expect("replace should succeed");

        assert_ne!(first.key, second.key);
        assert!(!store.contains(&first.key), "old object must be deleted");
        assert!(store.contains(&second.key));
        assert_eq!(store.len(), 1);
    }

    #[rocket::async_test]
    async fn release_skips_the_default_placeholder() {
        let store = MemoryStore::default();
        let attachments = Attachments::new(&store);

        // legacy record: no key, URL outside the uploads tree
        let default_avatar = StoredFile {
            original_name: String::new(),
            key: String::new(),
            url: "/assets/default-avatar.png".to_string(),
            mime_type: "image/png".to_string(),
        };

        attachments.release(&default_avatar).await;
        assert_eq!(store.len(), 0);
    }

    #[rocket::async_test]
    async fn release_derives_key_for_legacy_records() {
        let store = MemoryStore::default();
        let attachments = Attachments::new(&store);

        let file = attachments
            .attach(AVATAR_FOLDER, &pdf_upload())
            .await
            .expect("attach should succeed");

        // legacy shape: URL survived, key did not
        let legacy = StoredFile {
            key: String::new(),
            ..file.clone()
        };

        attachments.release(&legacy).await;
        assert!(!store.contains(&file.key));
    }

    #[test]
    fn key_derivation_handles_placeholders_and_stored_objects() {
        assert_eq!(key_from_url("/assets/default-avatar.png"), None);
        assert_eq!(key_from_url(""), None);
        assert_eq!(
            key_from_url("http://localhost:8000/uploads/avatars/abc-pic.png"),
            Some("avatars/abc-pic.png".to_string())
        );
    }

    #[test]
    fn object_keys_are_unique_and_sanitized() {
        let a = object_key(ASSIGNMENT_FOLDER, "bài tập?.pdf");
        let b = object_key(ASSIGNMENT_FOLDER, "bài tập?.pdf");

        assert_ne!(a, b);
        assert!(a.starts_with("assignments/"));
        assert!(!a.contains('?'));
        assert!(!a.contains(' '));
    }

    #[test]
    fn mime_filter_accepts_documents_and_rejects_executables() {
        assert!(is_accepted_mime("application/pdf"));
        assert!(is_accepted_mime("IMAGE/PNG"));
        assert!(is_accepted_mime("text/plain; charset=utf-8"));
        assert!(!is_accepted_mime("application/x-msdownload"));
        assert!(!is_accepted_mime("video/mp4"));
    }

    #[test]
    fn image_filter_only_accepts_images() {
        assert!(is_image_mime("image/jpeg"));
        assert!(!is_image_mime("application/pdf"));
    }
}
