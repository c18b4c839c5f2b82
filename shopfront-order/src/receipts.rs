use std::path::{Path, PathBuf};
use uuid::Uuid;

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "pdf", "webp"];

#[derive(Debug, thiserror::Error)]
pub enum ReceiptError {
    #[error("unsupported receipt type: {0}")]
    UnsupportedType(String),

    #[error("receipt is empty")]
    Empty,

    #[error("receipt exceeds {max} bytes")]
    TooLarge { max: usize },

    #[error("receipt path is outside the storage root")]
    OutsideRoot,

    #[error("receipt file not found")]
    Missing,

    #[error("receipt storage failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Payment proofs on local disk, confined to one root directory
pub struct ReceiptVault {
    root: PathBuf,
    max_bytes: usize,
}

impl ReceiptVault {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self { root: root.into(), max_bytes }
    }

    /// Lowercased extension if it is an accepted receipt type
    pub fn normalize_extension(ext: &str) -> Result<String, ReceiptError> {
        let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
        if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            Ok(ext)
        } else {
            Err(ReceiptError::UnsupportedType(ext))
        }
    }

    /// Write the bytes as `order-<id>-<uuid>.<ext>` and return the stored path
    pub async fn store(&self, order_id: i64, ext: &str, bytes: &[u8]) -> Result<String, ReceiptError> {
        let ext = Self::normalize_extension(ext)?;
        if bytes.is_empty() {
            return Err(ReceiptError::Empty);
        }
        if bytes.len() > self.max_bytes {
            return Err(ReceiptError::TooLarge { max: self.max_bytes });
        }

        tokio::fs::create_dir_all(&self.root).await?;
        let path = self
            .root
            .join(format!("order-{}-{}.{}", order_id, Uuid::new_v4().simple(), ext));
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!("Stored receipt for order {} at {}", order_id, path.display());
        Ok(path.to_string_lossy().into_owned())
    }

    /// Canonical location of a stored receipt, refusing anything outside the root
    pub async fn resolve(&self, stored: &str) -> Result<PathBuf, ReceiptError> {
        if stored.is_empty() {
            return Err(ReceiptError::Missing);
        }

        let root = match tokio::fs::canonicalize(&self.root).await {
            Ok(root) => root,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(ReceiptError::Missing),
            Err(e) => return Err(e.into()),
        };
        let path = match tokio::fs::canonicalize(stored).await {
            Ok(path) => path,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(ReceiptError::Missing),
            Err(e) => return Err(e.into()),
        };

        if !path.starts_with(&root) {
            tracing::warn!("Refusing receipt path outside storage root: {}", stored);
            return Err(ReceiptError::OutsideRoot);
        }

        Ok(path)
    }

    pub async fn read(&self, stored: &str) -> Result<Vec<u8>, ReceiptError> {
        let path = self.resolve(stored).await?;
        Ok(tokio::fs::read(path).await?)
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Remove a receipt that never made it onto its order
    pub async fn discard(&self, stored: &str) {
        let path = match self.resolve(stored).await {
            Ok(path) => path,
            Err(_) => return,
        };
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!("Failed to discard receipt {}: {}", path.display(), e);
        }
    }
}

/// MIME type for a receipt file name
pub fn content_type(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}
