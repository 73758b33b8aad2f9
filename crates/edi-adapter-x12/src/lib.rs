#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # edi-adapter-x12
//!
//! X12 envelope extraction and 997 functional acknowledgment rendering.
//!
//! This crate reads the interchange (ISA), functional group (GS) and
//! transaction set (ST) headers of an inbound 850 purchase order and renders
//! the matching 997 acknowledgment that echoes their control numbers.

pub mod acknowledgment;
pub mod envelopes;
pub mod syntax;

pub use acknowledgment::{Acknowledgment, AcknowledgmentBuilder};
pub use envelopes::{EnvelopeIds, FunctionalGroup, InterchangeEnvelope, TransactionSet, extract};

use thiserror::Error;

/// Errors that can occur when reading X12 envelopes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid ISA segment: {0}")]
    InvalidEnvelope(String),

    #[error("invalid GS segment: {0}")]
    InvalidGroup(String),

    #[error("invalid ST segment: {0}")]
    InvalidTransactionSet(String),
}

pub type Result<T> = std::result::Result<T, Error>;
