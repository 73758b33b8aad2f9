//! One synchronization cycle
//!
//! The inbound phase acknowledges every purchase order waiting in the
//! mailbox. A document whose envelope cannot be read is logged and skipped;
//! it never stops the documents behind it. The order phase loads the
//! watermark, fetches a batch, stores the orders newer than the watermark
//! and saves the watermark once the whole batch has been stored. A batch the
//! feed cut short is stored but leaves the watermark where it was, since
//! orders on the pages not fetched may sort below the batch maximum.
//!
//! Every other failure (transport, checkpoint, storage) aborts the cycle
//! with the error. The cycle keeps no state between runs besides the
//! checkpoint file.

use std::path::PathBuf;

use chrono::{NaiveDateTime, Utc};
use edi_adapter_x12::{Acknowledgment, AcknowledgmentBuilder, extract};
use tracing::{debug, info, warn};

use crate::checkpoint::Checkpoint;
use crate::filter::{IdOrdering, SyncFilter};
use crate::policies::{Integrations, Verbosity};
use crate::storage::OrderStore;
use crate::transport::{Mailbox, OrderFeed};
use crate::{Error, Result};

/// Settings for a cycle, resolved once at startup
#[derive(Debug, Clone)]
pub struct CycleConfig {
    pub integrations: Integrations,
    /// Our identity in acknowledgments
    pub sender_id: String,
    /// Trading partner identity in acknowledgments
    pub partner_id: String,
    /// Directory for the checkpoint, stored orders and archived documents
    pub storage_dir: PathBuf,
    /// Prefix of stored order files
    pub file_prefix: String,
    /// Remove inbound documents once acknowledged
    pub delete_after_ack: bool,
    /// Keep a raw copy of every inbound document
    pub archive_inbound: bool,
    pub id_ordering: IdOrdering,
    pub verbosity: Verbosity,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            integrations: Integrations::Both,
            sender_id: String::new(),
            partner_id: edi_adapter_x12::acknowledgment::DEFAULT_PARTNER_ID.to_string(),
            storage_dir: PathBuf::from("output"),
            file_prefix: "data_dump".to_string(),
            delete_after_ack: false,
            archive_inbound: true,
            id_ordering: IdOrdering::default(),
            verbosity: Verbosity::default(),
        }
    }
}

/// An inbound document that was not acknowledged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDocument {
    pub name: String,
    pub reason: String,
}

/// Outcome of the inbound phase
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundSummary {
    /// Names of the acknowledgments put outbound
    pub acknowledged: Vec<String>,
    pub skipped: Vec<SkippedDocument>,
    /// Inbound documents removed after acknowledgment
    pub deleted: usize,
}

/// Outcome of the order phase
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderSummary {
    /// Size of the fetched batch
    pub fetched: usize,
    /// Files written for new orders, in batch order
    pub stored: Vec<PathBuf>,
    pub previous_watermark: String,
    /// Watermark stored after the phase
    pub watermark: String,
    /// The feed had pages left over; the watermark was held back
    pub truncated: bool,
}

impl OrderSummary {
    pub fn advanced(&self) -> bool {
        self.watermark != self.previous_watermark
    }
}

/// What a cycle did; a phase that did not run is `None`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub inbound: Option<InboundSummary>,
    pub orders: Option<OrderSummary>,
}

impl CycleReport {
    /// No inbound document was skipped and the order feed was read to the end
    pub fn is_clean(&self) -> bool {
        self.inbound
            .as_ref()
            .is_none_or(|summary| summary.skipped.is_empty())
            && self.orders.as_ref().is_none_or(|summary| !summary.truncated)
    }
}

fn utc_now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Runs synchronization cycles against a mailbox and an order feed
pub struct TransferOrchestrator {
    config: CycleConfig,
    mailbox: Option<Box<dyn Mailbox>>,
    order_feed: Option<Box<dyn OrderFeed>>,
    clock: fn() -> NaiveDateTime,
}

impl TransferOrchestrator {
    pub fn new(config: CycleConfig) -> Self {
        Self {
            config,
            mailbox: None,
            order_feed: None,
            clock: utc_now,
        }
    }

    /// Mailbox used by the inbound phase
    pub fn with_mailbox(mut self, mailbox: impl Mailbox + 'static) -> Self {
        self.mailbox = Some(Box::new(mailbox));
        self
    }

    /// Feed used by the order phase
    pub fn with_order_feed(mut self, feed: impl OrderFeed + 'static) -> Self {
        self.order_feed = Some(Box::new(feed));
        self
    }

    /// Replace the UTC clock stamped into acknowledgments
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &CycleConfig {
        &self.config
    }

    /// Run both enabled phases once, inbound first.
    pub fn run_cycle(&self) -> Result<CycleReport> {
        if self.config.integrations == Integrations::None {
            return Err(Error::Config("no integration enabled".to_string()));
        }

        let mut report = CycleReport::default();

        if self.config.integrations.includes_edi() {
            report.inbound = Some(self.run_inbound()?);
        }

        if self.config.integrations.includes_api() {
            report.orders = Some(self.run_orders()?);
        }

        Ok(report)
    }

    /// Acknowledge every readable inbound document.
    pub fn run_inbound(&self) -> Result<InboundSummary> {
        let mailbox = self
            .mailbox
            .as_deref()
            .ok_or_else(|| Error::Config("EDI integration enabled without a mailbox".to_string()))?;
        let store = self.store();
        let builder = AcknowledgmentBuilder::new(self.config.sender_id.as_str())
            .with_partner_id(self.config.partner_id.as_str());

        let documents = mailbox.list_inbound()?;
        info!(count = documents.len(), "Listed inbound documents");

        let mut summary = InboundSummary::default();
        for document in documents {
            if self.config.archive_inbound {
                store.archive_inbound(&document.name, &document.content)?;
            }

            let ids = match extract(&document.content) {
                Ok(ids) => ids,
                Err(e) => {
                    warn!(document = %document.name, error = %e, "Skipping unreadable document");
                    summary.skipped.push(SkippedDocument {
                        name: document.name,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let ack = builder.build(&ids, (self.clock)());
            let ack_name = Acknowledgment::file_name_for(&document.name);
            mailbox.put_outbound(&ack_name, &ack.to_bytes())?;
            if self.config.verbosity.is_verbose() {
                debug!(name = %ack_name, body = %ack.render(), "Put acknowledgment");
            }
            info!(
                document = %document.name,
                acknowledgment = %ack_name,
                interchange = %ids.interchange.control_number,
                "Acknowledged purchase order"
            );

            if self.config.delete_after_ack {
                mailbox.delete_inbound(&document.name)?;
                summary.deleted += 1;
            }
            summary.acknowledged.push(ack_name);
        }

        info!(
            acknowledged = summary.acknowledged.len(),
            skipped = summary.skipped.len(),
            "Inbound phase complete"
        );
        Ok(summary)
    }

    /// Store orders newer than the checkpoint and advance it.
    pub fn run_orders(&self) -> Result<OrderSummary> {
        let feed = self.order_feed.as_deref().ok_or_else(|| {
            Error::Config("API integration enabled without an order feed".to_string())
        })?;
        let checkpoint = Checkpoint::new(&self.config.storage_dir);
        let store = self.store();

        let previous_watermark = checkpoint.load()?;
        let batch = feed.fetch_batch()?;
        let records = batch.records;
        let partition =
            SyncFilter::new(self.config.id_ordering).partition(&previous_watermark, &records);

        info!(
            fetched = records.len(),
            truncated = batch.truncated,
            new = partition.new_records.len(),
            watermark = %previous_watermark,
            "Filtered order batch"
        );

        let mut stored = Vec::with_capacity(partition.new_records.len());
        for record in &partition.new_records {
            if self.config.verbosity.is_verbose() {
                debug!(id = %record.id, payload = %record.payload, "New order");
            }
            stored.push(store.persist(record)?);
        }

        let watermark = if batch.truncated {
            warn!(
                held = %previous_watermark,
                fetched_max = %partition.new_watermark,
                "Order feed truncated; checkpoint held until the feed is read to the end"
            );
            previous_watermark.clone()
        } else if partition.advanced(&previous_watermark) {
            checkpoint.save(&partition.new_watermark)?;
            info!(watermark = %partition.new_watermark, "Advanced checkpoint");
            partition.new_watermark
        } else {
            debug!("Checkpoint unchanged");
            partition.new_watermark
        };

        Ok(OrderSummary {
            fetched: records.len(),
            stored,
            previous_watermark,
            watermark,
            truncated: batch.truncated,
        })
    }

    fn store(&self) -> OrderStore {
        OrderStore::new(&self.config.storage_dir, self.config.file_prefix.as_str())
    }
}
