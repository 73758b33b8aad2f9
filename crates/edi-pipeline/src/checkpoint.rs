//! Durable order-feed watermark
//!
//! The checkpoint is a single JSON record, `{"lastControlNumber": "..."}`,
//! stored as `checkpoint.json` inside the storage directory. A missing file
//! is the empty watermark and is created on first load.
//!
//! Saves go through a temporary file and a rename, so a crash mid-write
//! leaves either the previous checkpoint or the new one, never a torn file.
//! The file is not guarded against concurrent writers.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{Error, Result};

/// File name of the checkpoint inside the storage directory
pub const CHECKPOINT_FILE: &str = "checkpoint.json";

const CHECKPOINT_TEMP_FILE: &str = "checkpoint.json.tmp";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckpointRecord {
    last_control_number: String,
}

/// Watermark persisted in a storage directory
#[derive(Debug, Clone)]
pub struct Checkpoint {
    dir: PathBuf,
}

impl Checkpoint {
    /// Checkpoint kept in `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Full path of the checkpoint file
    pub fn path(&self) -> PathBuf {
        self.dir.join(CHECKPOINT_FILE)
    }

    /// Read the watermark, creating an empty checkpoint if none exists.
    pub fn load(&self) -> Result<String> {
        let path = self.path();

        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.save("")?;
                info!(path = %path.display(), "Created default checkpoint");
                return Ok(String::new());
            }
            Err(e) => {
                return Err(Error::io(
                    "read checkpoint",
                    path.display().to_string(),
                    e.to_string(),
                ));
            }
        };

        let record: CheckpointRecord =
            serde_json::from_str(&raw).map_err(|e| Error::CorruptCheckpoint {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        debug!(watermark = %record.last_control_number, "Loaded checkpoint");
        Ok(record.last_control_number)
    }

    /// Overwrite the checkpoint with `watermark`.
    pub fn save(&self, watermark: &str) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            Error::io(
                "create storage directory",
                self.dir.display().to_string(),
                e.to_string(),
            )
        })?;

        let record = CheckpointRecord {
            last_control_number: watermark.to_string(),
        };
        let mut body = serde_json::to_string_pretty(&record).map_err(|e| {
            Error::io(
                "serialize checkpoint",
                self.path().display().to_string(),
                e.to_string(),
            )
        })?;
        body.push('\n');

        let temp_path = self.dir.join(CHECKPOINT_TEMP_FILE);
        fs::write(&temp_path, body).map_err(|e| {
            Error::io(
                "write checkpoint",
                temp_path.display().to_string(),
                e.to_string(),
            )
        })?;

        let path = self.path();
        fs::rename(&temp_path, &path).map_err(|e| {
            Error::io(
                "replace checkpoint",
                path.display().to_string(),
                e.to_string(),
            )
        })?;

        debug!(watermark, "Saved checkpoint");
        Ok(())
    }
}

/// Load the watermark stored in `dir`.
pub fn load(dir: &Path) -> Result<String> {
    Checkpoint::new(dir).load()
}

/// Save `watermark` as the checkpoint in `dir`.
pub fn save(dir: &Path, watermark: &str) -> Result<()> {
    Checkpoint::new(dir).save(watermark)
}
