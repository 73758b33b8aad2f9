#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # edi-pipeline
//!
//! One synchronization cycle between a trading partner and local storage.
//!
//! The inbound phase acknowledges every purchase order found in the partner
//! mailbox with a 997. The order feed phase polls the partner API and keeps
//! only orders newer than the stored checkpoint watermark.

pub mod checkpoint;
pub mod filter;
pub mod inventory;
pub mod orchestrator;
pub mod policies;
pub mod storage;
pub mod transport;

pub use checkpoint::Checkpoint;
pub use filter::{IdOrdering, Partition, SyncFilter};
pub use inventory::{InventoryFeed, InventoryItem};
pub use orchestrator::{
    CycleConfig, CycleReport, InboundSummary, OrderSummary, SkippedDocument, TransferOrchestrator,
};
pub use policies::{Integrations, Verbosity};
pub use storage::OrderStore;
pub use transport::{InboundDocument, Mailbox, OrderBatch, OrderFeed, OrderRecord};

use thiserror::Error;

/// Errors that abort a synchronization cycle
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("IO error during {operation} for '{path}': {message}")]
    Io {
        operation: String,
        path: String,
        message: String,
    },

    #[error("Corrupt checkpoint '{path}': {message}")]
    CorruptCheckpoint { path: String, message: String },

    #[error("Transport error during {operation} for '{target}': {message}")]
    Transport {
        operation: String,
        target: String,
        message: String,
    },

    #[error("Inventory feed error for '{path}': {message}")]
    Inventory { path: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a structured I/O error with operation/path context.
    pub fn io(
        operation: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Io {
            operation: operation.into(),
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a transport error with operation/target context.
    pub fn transport(
        operation: impl Into<String>,
        target: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Transport {
            operation: operation.into(),
            target: target.into(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::io("io", "<unknown>", e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
