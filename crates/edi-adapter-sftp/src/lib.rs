#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # edi-adapter-sftp
//!
//! The trading partner mailbox on the partner's SFTP server. One SSH session
//! with public key authentication is opened per cycle; purchase orders are
//! read from the remote inbound directory and acknowledgments written to the
//! remote outbound one.

pub mod mailbox;

pub use mailbox::{SftpConfig, SftpMailbox, remote_path};

use thiserror::Error;

/// Errors opening or using an SFTP session
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("private key '{path}' is not readable: {message}")]
    Key { path: String, message: String },

    #[error("cannot connect to {address}: {message}")]
    Connect { address: String, message: String },

    #[error("SSH authentication as '{username}' failed: {message}")]
    Auth { username: String, message: String },

    #[error("SFTP {operation} of '{path}' failed: {message}")]
    Sftp {
        operation: String,
        path: String,
        message: String,
    },
}

impl Error {
    pub fn sftp(
        operation: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Sftp {
            operation: operation.into(),
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<Error> for edi_pipeline::Error {
    fn from(e: Error) -> Self {
        let (operation, target) = match &e {
            Error::Key { path, .. } => ("read private key".to_string(), path.clone()),
            Error::Connect { address, .. } => ("connect".to_string(), address.clone()),
            Error::Auth { username, .. } => ("authenticate".to_string(), username.clone()),
            Error::Sftp {
                operation, path, ..
            } => (operation.clone(), path.clone()),
        };
        edi_pipeline::Error::transport(operation, target, e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
