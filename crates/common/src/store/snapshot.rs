//! Single-file JSON snapshot of a collection
//!
//! Writes go to a sibling temp file which is fsynced and renamed over the
//! previous snapshot, so a failed write never damages the last good copy.

use super::index::MetadataIndex;
use super::StoreRecord;
use crate::errors::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Borrowed view written to disk
#[derive(Serialize)]
pub struct SnapshotView<'a> {
    pub collection: &'a str,
    pub embedding_model: &'a str,
    pub dimension: usize,
    pub saved_at: DateTime<Utc>,
    pub checksum: String,
    pub records: &'a [StoreRecord],
    pub metadata_index: &'a MetadataIndex,
}

/// Owned snapshot read back from disk
#[derive(Debug, Deserialize)]
pub struct Snapshot {
    pub collection: String,
    pub embedding_model: String,
    pub dimension: usize,
    pub saved_at: DateTime<Utc>,
    pub checksum: String,
    pub records: Vec<StoreRecord>,
    #[serde(default)]
    pub metadata_index: MetadataIndex,
}

impl Snapshot {
    /// Recompute the record checksum and compare with the stored one
    pub fn verify(&self) -> Result<bool> {
        Ok(checksum(&self.records)? == self.checksum)
    }
}

/// SHA-256 of the serialized records, hex encoded
pub fn checksum(records: &[StoreRecord]) -> Result<String> {
    let bytes = serde_json::to_vec(records)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Serialize and atomically replace the snapshot at `path`
pub async fn write(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| AppError::persistence(parent, e))?;
    }

    let tmp = temp_path(path);
    let result = async {
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp, path).await
    }
    .await;

    if let Err(e) = result {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(AppError::persistence(path, e));
    }

    Ok(())
}

/// Read a snapshot; `Ok(None)` when the file does not exist
pub async fn read(path: &Path) -> Result<Option<Snapshot>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(AppError::persistence(path, e)),
    };

    let snapshot: Snapshot = serde_json::from_slice(&bytes).map_err(|e| AppError::persistence(path, e))?;
    Ok(Some(snapshot))
}

/// Delete the snapshot if present
pub async fn remove(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AppError::persistence(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = read(&dir.path().join("absent.json")).await.unwrap();
        assert!(snapshot.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();

        let err = read(&path).await.unwrap_err();
        assert!(matches!(err, AppError::Persistence { .. }));
    }

    #[tokio::test]
    async fn test_write_replaces_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("filings.json");

        write(&path, b"first").await.unwrap();
        write(&path, b"second").await.unwrap();

        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"second");
        assert!(!temp_path(&path).exists());

        remove(&path).await.unwrap();
        remove(&path).await.unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_checksum_of_empty_records() {
        let sum = checksum(&[]).unwrap();
        // sha256("[]")
        assert_eq!(sum, "4f53cda18c2baa0c0354bb5f9a3ecbe5ed12ab4d8e11ba873c2f11161202b945");
    }
}
