//! Collaborator boundary for remote transfers
//!
//! The cycle never speaks a transfer protocol itself. It consumes a
//! [`Mailbox`] for inbound documents and outbound acknowledgments, and an
//! [`OrderFeed`] for already-authenticated order batches.

use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::{Error, Result};

/// A document listed in the partner's inbound location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundDocument {
    /// File name as listed by the transport
    pub name: String,
    /// Raw document bytes
    pub content: Vec<u8>,
}

impl InboundDocument {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// One order from the remote feed
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    /// Order identifier, compared against the checkpoint watermark
    pub id: String,
    /// Order body exactly as received
    pub payload: Value,
}

impl OrderRecord {
    pub fn new(id: impl Into<String>, payload: Value) -> Self {
        Self {
            id: id.into(),
            payload,
        }
    }
}

/// Orders returned by one fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderBatch {
    pub records: Vec<OrderRecord>,
    /// The feed had more pages than were fetched
    pub truncated: bool,
}

impl OrderBatch {
    /// Batch holding the whole feed
    pub fn complete(records: Vec<OrderRecord>) -> Self {
        Self {
            records,
            truncated: false,
        }
    }

    /// Batch cut short before the end of the feed
    pub fn truncated(records: Vec<OrderRecord>) -> Self {
        Self {
            records,
            truncated: true,
        }
    }
}

/// File-transfer endpoint of the trading partner
pub trait Mailbox {
    /// List inbound documents in the order they should be acknowledged
    fn list_inbound(&self) -> Result<Vec<InboundDocument>>;

    /// Store `content` as `name` in the outbound location
    fn put_outbound(&self, name: &str, content: &[u8]) -> Result<()>;

    /// Remove an inbound document once it has been handled
    fn delete_inbound(&self, name: &str) -> Result<()>;
}

/// Remote purchase-order feed
pub trait OrderFeed {
    /// Fetch the current batch of orders
    fn fetch_orders(&self) -> Result<Vec<OrderRecord>>;

    /// Fetch the current batch, flagging a feed that was only partly read.
    ///
    /// Feeds that always return everything can rely on the default.
    fn fetch_batch(&self) -> Result<OrderBatch> {
        Ok(OrderBatch::complete(self.fetch_orders()?))
    }
}

impl<M: Mailbox + ?Sized> Mailbox for Box<M> {
    fn list_inbound(&self) -> Result<Vec<InboundDocument>> {
        (**self).list_inbound()
    }

    fn put_outbound(&self, name: &str, content: &[u8]) -> Result<()> {
        (**self).put_outbound(name, content)
    }

    fn delete_inbound(&self, name: &str) -> Result<()> {
        (**self).delete_inbound(name)
    }
}

impl<M: Mailbox + ?Sized> Mailbox for Arc<M> {
    fn list_inbound(&self) -> Result<Vec<InboundDocument>> {
        (**self).list_inbound()
    }

    fn put_outbound(&self, name: &str, content: &[u8]) -> Result<()> {
        (**self).put_outbound(name, content)
    }

    fn delete_inbound(&self, name: &str) -> Result<()> {
        (**self).delete_inbound(name)
    }
}

impl<F: OrderFeed + ?Sized> OrderFeed for Arc<F> {
    fn fetch_orders(&self) -> Result<Vec<OrderRecord>> {
        (**self).fetch_orders()
    }

    fn fetch_batch(&self) -> Result<OrderBatch> {
        (**self).fetch_batch()
    }
}

/// In-memory mailbox, mainly for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryMailbox {
    inbound: Mutex<Vec<InboundDocument>>,
    outbound: Mutex<Vec<InboundDocument>>,
}

impl MemoryMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mailbox pre-filled with inbound documents
    pub fn with_inbound(documents: Vec<InboundDocument>) -> Self {
        Self {
            inbound: Mutex::new(documents),
            outbound: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of the documents still waiting inbound
    pub fn inbound(&self) -> Vec<InboundDocument> {
        self.inbound.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Snapshot of everything put outbound, in put order
    pub fn outbound(&self) -> Vec<InboundDocument> {
        self.outbound.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

impl Mailbox for MemoryMailbox {
    fn list_inbound(&self) -> Result<Vec<InboundDocument>> {
        self.inbound
            .lock()
            .map(|g| g.clone())
            .map_err(|e| Error::transport("list", "memory", e.to_string()))
    }

    fn put_outbound(&self, name: &str, content: &[u8]) -> Result<()> {
        let mut outbound = self
            .outbound
            .lock()
            .map_err(|e| Error::transport("put", name, e.to_string()))?;
        outbound.retain(|doc| doc.name != name);
        outbound.push(InboundDocument::new(name, content));
        Ok(())
    }

    fn delete_inbound(&self, name: &str) -> Result<()> {
        let mut inbound = self
            .inbound
            .lock()
            .map_err(|e| Error::transport("delete", name, e.to_string()))?;
        let before = inbound.len();
        inbound.retain(|doc| doc.name != name);
        if inbound.len() == before {
            return Err(Error::transport("delete", name, "no such inbound document"));
        }
        Ok(())
    }
}

/// Order feed returning a fixed batch on every call
#[derive(Debug, Clone, Default)]
pub struct StaticOrderFeed {
    orders: Vec<OrderRecord>,
    truncated: bool,
}

impl StaticOrderFeed {
    pub fn new(orders: Vec<OrderRecord>) -> Self {
        Self {
            orders,
            truncated: false,
        }
    }

    /// Report every batch as cut short
    #[must_use]
    pub fn with_truncation(mut self) -> Self {
        self.truncated = true;
        self
    }
}

impl OrderFeed for StaticOrderFeed {
    fn fetch_orders(&self) -> Result<Vec<OrderRecord>> {
        Ok(self.orders.clone())
    }

    fn fetch_batch(&self) -> Result<OrderBatch> {
        Ok(OrderBatch {
            records: self.orders.clone(),
            truncated: self.truncated,
        })
    }
}
