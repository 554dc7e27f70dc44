//! File records: resolve every blob to one local path before commit

use super::session::ImportSession;
use crate::core::checksum::verify_blob;
use crate::core::identity::ResolvedFile;
use crate::domain::context::ResultExt;
use crate::domain::{FerryError, FileRecord, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::{Path, PathBuf};

impl ImportSession {
    /// Index a file record
    ///
    /// Lookup order: blob cache, inline data, external path. A blob that
    /// cannot be found is left out of the index and surfaces as a missing
    /// file reference during verification.
    pub async fn import_file(&mut self, record: FileRecord) -> Result<()> {
        check_file_id(&record)?;
        if self.files.contains(&record.uuid) {
            return Ok(());
        }
        match self.resolve_file(&record).await? {
            Some(resolved) => {
                tracing::debug!(
                    file = %record.uuid,
                    path = %resolved.path.display(),
                    temporary = resolved.temporary,
                    "Resolved file"
                );
                self.files.insert(record.uuid.clone(), resolved);
                self.summary.files.created += 1;
            }
            None => {
                tracing::warn!(
                    file = %record.uuid,
                    filename = %record.original_filename,
                    "File content not found"
                );
                self.summary.files.skipped += 1;
            }
        }
        Ok(())
    }

    async fn resolve_file(&self, record: &FileRecord) -> Result<Option<ResolvedFile>> {
        if let Some(cached) = self.cached_file(record).await? {
            return Ok(Some(cached));
        }

        if let Some(data) = &record.data {
            let bytes = STANDARD.decode(data.as_bytes())?;
            check(record, &bytes)?;
            let path = self.options.temp_dir.join(record.uuid.as_str());
            tokio::fs::create_dir_all(&self.options.temp_dir)
                .await
                .with_context(|| {
                    format!(
                        "Failed to create temporary directory {}",
                        self.options.temp_dir.display()
                    )
                })?;
            tokio::fs::write(&path, &bytes)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            return Ok(Some(resolved(record, path, bytes.len(), true)));
        }

        if let Some(path) = &record.path {
            let path = self.external_path(path);
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
                Err(e) => {
                    return Err(FerryError::Io(format!(
                        "Failed to read {}: {}",
                        path.display(),
                        e
                    )))
                }
            };
            check(record, &bytes)?;
            return Ok(Some(resolved(record, path, bytes.len(), false)));
        }

        Ok(None)
    }

    /// A blob already present in the cache directory under the file id
    async fn cached_file(&self, record: &FileRecord) -> Result<Option<ResolvedFile>> {
        let Some(cache_dir) = &self.options.cache_dir else {
            return Ok(None);
        };
        let path = cache_dir.join(record.uuid.as_str());
        let Ok(bytes) = tokio::fs::read(&path).await else {
            return Ok(None);
        };
        match verify_blob(&bytes, &record.checksum, record.size) {
            Ok(()) => Ok(Some(resolved(record, path, bytes.len(), false))),
            Err(reason) => {
                tracing::warn!(file = %record.uuid, reason = %reason, "Ignoring stale cache entry");
                Ok(None)
            }
        }
    }

    fn external_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        match &self.options.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

/// File ids name blobs inside the temp and cache directories
fn check_file_id(record: &FileRecord) -> Result<()> {
    let id = record.uuid.as_str();
    if id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Ok(());
    }
    Err(FerryError::Validation(format!(
        "file '{id}': id may only contain letters, digits, '-' and '_'"
    )))
}

fn check(record: &FileRecord, bytes: &[u8]) -> Result<()> {
    verify_blob(bytes, &record.checksum, record.size)
        .map_err(|reason| FerryError::Validation(format!("file '{}': {}", record.uuid, reason)))
}

fn resolved(record: &FileRecord, path: PathBuf, size: usize, temporary: bool) -> ResolvedFile {
    ResolvedFile {
        path,
        mime_type: record.mime_type.clone(),
        size: size as u64,
        original_filename: record.original_filename.clone(),
        temporary,
    }
}

#[cfg(test)]
mod tests {
    use crate::adapters::store::MemoryStore;
    use crate::core::checksum::calculate_checksum_bytes;
    use crate::core::import::{ImportOptions, ImportSession, PolicyDecision};
    use crate::core::transform::TransformPipeline;
    use crate::domain::{FerryError, FileRecord, PortableId};
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn record(uuid: &str, content: &[u8]) -> FileRecord {
        FileRecord {
            uuid: PortableId::new(uuid).unwrap(),
            original_filename: "logo.png".to_string(),
            mime_type: "image/png".to_string(),
            size: content.len() as u64,
            checksum: calculate_checksum_bytes(content),
            data: None,
            path: None,
        }
    }

    async fn session(options: ImportOptions) -> ImportSession {
        ImportSession::new(
            Arc::new(MemoryStore::new()),
            TransformPipeline::new(),
            Box::new(PolicyDecision::default()),
            options,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_inline_data_is_written_to_temp_dir() {
        let temp = TempDir::new().unwrap();
        let mut session = session(ImportOptions {
            temp_dir: temp.path().to_path_buf(),
            ..ImportOptions::default()
        })
        .await;

        let mut file = record("f1", b"PNG");
        file.data = Some(STANDARD.encode(b"PNG"));
        session.import_file(file).await.unwrap();

        let resolved = session.files.get(&PortableId::new("f1").unwrap()).unwrap();
        assert!(resolved.temporary);
        assert_eq!(std::fs::read(&resolved.path).unwrap(), b"PNG");
    }

    #[tokio::test]
    async fn test_checksum_mismatch_is_fatal() {
        let temp = TempDir::new().unwrap();
        let mut session = session(ImportOptions {
            temp_dir: temp.path().to_path_buf(),
            ..ImportOptions::default()
        })
        .await;

        let mut file = record("f1", b"PNG");
        file.data = Some(STANDARD.encode(b"GIF"));
        let err = session.import_file(file).await.unwrap_err();
        assert!(matches!(err, FerryError::Validation(ref message) if message.contains("f1")));
    }

    #[tokio::test]
    async fn test_relative_path_uses_base_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("logo.png"), b"PNG").unwrap();
        let mut session = session(ImportOptions::default().with_base_dir(dir.path())).await;

        let mut file = record("f1", b"PNG");
        file.path = Some("logo.png".to_string());
        session.import_file(file).await.unwrap();

        let resolved = session.files.get(&PortableId::new("f1").unwrap()).unwrap();
        assert!(!resolved.temporary);
        assert_eq!(resolved.path, dir.path().join("logo.png"));
    }

    #[tokio::test]
    async fn test_cache_hit_wins_over_inline_data() {
        let cache = TempDir::new().unwrap();
        std::fs::write(cache.path().join("f1"), b"PNG").unwrap();
        let mut session = session(ImportOptions {
            cache_dir: Some(cache.path().to_path_buf()),
            ..ImportOptions::default()
        })
        .await;

        let mut file = record("f1", b"PNG");
        file.data = Some(STANDARD.encode(b"PNG"));
        session.import_file(file).await.unwrap();

        let resolved = session.files.get(&PortableId::new("f1").unwrap()).unwrap();
        assert_eq!(resolved.path, cache.path().join("f1"));
        assert!(!resolved.temporary);
    }

    #[tokio::test]
    async fn test_file_id_with_path_components_is_rejected() {
        let root = TempDir::new().unwrap();
        let temp_dir = root.path().join("tmp");
        let mut session = session(ImportOptions {
            dry_run: true,
            temp_dir: temp_dir.clone(),
            ..ImportOptions::default()
        })
        .await;

        for uuid in ["../escaped.txt", "nested/blob", "..", "C:\\blob"] {
            let mut file = record(uuid, b"PNG");
            file.data = Some(STANDARD.encode(b"PNG"));
            let err = session.import_file(file).await.unwrap_err();
            assert!(
                matches!(err, FerryError::Validation(ref message) if message.contains(uuid)),
                "{uuid} was accepted"
            );
        }

        assert!(!root.path().join("escaped.txt").exists());
        assert!(!temp_dir.exists());
        assert!(session.files.is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_is_skipped() {
        let mut session = session(ImportOptions::default()).await;
        let mut file = record("f1", b"PNG");
        file.path = Some("/nonexistent/ferry/logo.png".to_string());
        session.import_file(file).await.unwrap();

        assert!(session.files.is_empty());
        assert_eq!(session.summary().files.skipped, 1);
    }
}
