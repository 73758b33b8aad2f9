#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # edi-adapter-spapi
//!
//! Purchase order feed backed by the Selling Partner API.
//!
//! The client trades a refresh token for an access token once per fetch,
//! then walks the paginated purchase order endpoint. Calls are blocking;
//! a cycle makes them one after another.

pub mod client;
pub mod orders;

pub use client::{SpApiClient, SpApiConfig};
pub use orders::{OrderPage, parse_page};

use thiserror::Error;

/// Errors talking to the Selling Partner API
#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request to '{url}' failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("token request rejected with status {status}: {body}")]
    Auth { status: u16, body: String },

    #[error("order request to '{url}' failed with status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("invalid response from '{url}': {message}")]
    InvalidResponse { url: String, message: String },
}

impl From<Error> for edi_pipeline::Error {
    fn from(e: Error) -> Self {
        let (operation, target) = match &e {
            Error::Http { url, .. } => ("request", url.clone()),
            Error::Auth { .. } => ("authenticate", "token endpoint".to_string()),
            Error::Status { url, .. } => ("fetch orders", url.clone()),
            Error::InvalidResponse { url, .. } => ("decode response", url.clone()),
        };
        edi_pipeline::Error::transport(operation, target, e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
