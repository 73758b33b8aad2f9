//! Local persistence of fetched orders and inbound documents

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::transport::OrderRecord;
use crate::{Error, Result};

/// Sub-directory of the storage directory holding raw inbound documents
pub const INBOUND_ARCHIVE_DIR: &str = "inbound";

/// Writes order payloads and archived documents under one directory
#[derive(Debug, Clone)]
pub struct OrderStore {
    dir: PathBuf,
    file_prefix: String,
}

impl OrderStore {
    pub fn new(dir: impl Into<PathBuf>, file_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            file_prefix: file_prefix.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path the payload of order `id` is written to
    pub fn order_path(&self, id: &str) -> PathBuf {
        self.dir
            .join(format!("{}_{}.json", self.file_prefix, encode_file_name(id)))
    }

    /// Write the order payload as pretty JSON, replacing any earlier copy.
    pub fn persist(&self, record: &OrderRecord) -> Result<PathBuf> {
        let path = self.order_path(&record.id);
        let body = serde_json::to_string_pretty(&record.payload).map_err(|e| {
            Error::io(
                "serialize order",
                path.display().to_string(),
                e.to_string(),
            )
        })?;

        write_file(&self.dir, &path, body.as_bytes(), "write order")?;
        debug!(id = %record.id, path = %path.display(), "Stored order");
        Ok(path)
    }

    /// Keep a raw copy of an inbound document under `inbound/`
    pub fn archive_inbound(&self, name: &str, content: &[u8]) -> Result<PathBuf> {
        let dir = self.dir.join(INBOUND_ARCHIVE_DIR);
        let path = dir.join(encode_file_name(name));
        write_file(&dir, &path, content, "archive inbound document")?;
        debug!(name, path = %path.display(), "Archived inbound document");
        Ok(path)
    }
}

fn write_file(dir: &Path, path: &Path, content: &[u8], operation: &str) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| {
        Error::io(
            "create storage directory",
            dir.display().to_string(),
            e.to_string(),
        )
    })?;
    fs::write(path, content)
        .map_err(|e| Error::io(operation, path.display().to_string(), e.to_string()))
}

/// Percent-encode every byte outside `[A-Za-z0-9._-]` so an identifier is a
/// safe file name. Distinct identifiers always get distinct names.
pub fn encode_file_name(id: &str) -> String {
    let mut encoded = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'-') {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }

    // "." and ".." name directories; a lone "%" is never produced otherwise
    match encoded.as_str() {
        "" => "%".to_string(),
        "." | ".." => encoded.replace('.', "%2E"),
        _ => encoded,
    }
}
