#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # edi-adapter-mailbox
//!
//! A trading partner mailbox kept in two local directories: the partner drops
//! purchase orders into the inbound directory and picks acknowledgments up
//! from the outbound one. Works for a mounted SFTP share as well as a plain
//! drop folder.

use std::fs;
use std::path::{Path, PathBuf};

use edi_pipeline::{Error, InboundDocument, Mailbox, Result};
use tracing::debug;

/// Mailbox over an inbound and an outbound directory
#[derive(Debug, Clone)]
pub struct DirectoryMailbox {
    inbound_dir: PathBuf,
    outbound_dir: PathBuf,
}

impl DirectoryMailbox {
    pub fn new(inbound_dir: impl Into<PathBuf>, outbound_dir: impl Into<PathBuf>) -> Self {
        Self {
            inbound_dir: inbound_dir.into(),
            outbound_dir: outbound_dir.into(),
        }
    }

    pub fn inbound_dir(&self) -> &Path {
        &self.inbound_dir
    }

    pub fn outbound_dir(&self) -> &Path {
        &self.outbound_dir
    }
}

fn transport_error(operation: &str, path: &Path, e: std::io::Error) -> Error {
    Error::transport(operation, path.display().to_string(), e.to_string())
}

impl Mailbox for DirectoryMailbox {
    /// Regular files of the inbound directory, sorted by name
    fn list_inbound(&self) -> Result<Vec<InboundDocument>> {
        let entries = fs::read_dir(&self.inbound_dir)
            .map_err(|e| transport_error("list", &self.inbound_dir, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| transport_error("list", &self.inbound_dir, e))?;
            let path = entry.path();
            let file_type = entry
                .file_type()
                .map_err(|e| transport_error("stat", &path, e))?;
            if !file_type.is_file() {
                continue;
            }
            files.push((entry.file_name().to_string_lossy().into_owned(), path));
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));

        let mut documents = Vec::with_capacity(files.len());
        for (name, path) in files {
            let content = fs::read(&path).map_err(|e| transport_error("get", &path, e))?;
            documents.push(InboundDocument::new(name, content));
        }

        debug!(dir = %self.inbound_dir.display(), count = documents.len(), "Listed mailbox");
        Ok(documents)
    }

    fn put_outbound(&self, name: &str, content: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.outbound_dir)
            .map_err(|e| transport_error("create outbound directory", &self.outbound_dir, e))?;

        let path = self.outbound_dir.join(name);
        // Hidden while partial so the partner never picks up a torn file
        let temp_path = self.outbound_dir.join(format!(".{name}.part"));
        fs::write(&temp_path, content).map_err(|e| transport_error("put", &temp_path, e))?;
        fs::rename(&temp_path, &path).map_err(|e| transport_error("put", &path, e))?;

        debug!(path = %path.display(), bytes = content.len(), "Put outbound file");
        Ok(())
    }

    fn delete_inbound(&self, name: &str) -> Result<()> {
        let path = self.inbound_dir.join(name);
        fs::remove_file(&path).map_err(|e| transport_error("delete", &path, e))?;
        debug!(path = %path.display(), "Deleted inbound file");
        Ok(())
    }
}
