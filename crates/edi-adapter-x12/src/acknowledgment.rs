//! 997 functional acknowledgment rendering
//!
//! The acknowledgment always reports acceptance: nothing beyond the envelope
//! is validated, so there is no rejection path.

use chrono::NaiveDateTime;
use tracing::debug;

use crate::envelopes::{EnvelopeIds, PURCHASE_ORDER_GROUP};
use crate::syntax::{Segment, Separators, pad_field};

/// Trading partner identity used when none is configured
pub const DEFAULT_PARTNER_ID: &str = "AMAZON";

/// Extension appended to the inbound file name to address the acknowledgment
pub const ACK_FILE_EXTENSION: &str = "997";

const ISA_AUTHORIZATION_QUALIFIER: &str = "00";
const ISA_SECURITY_QUALIFIER: &str = "00";
const ISA_ID_QUALIFIER: &str = "ZZ";
const ISA_STANDARDS_ID: &str = "U";
const ISA_VERSION: &str = "00400";
const ISA_ACK_REQUESTED: &str = "0";
const ISA_USAGE_TEST: &str = "T";
const GS_FUNCTIONAL_ACK: &str = "FA";
const GS_AGENCY: &str = "X";
const GS_VERSION: &str = "004010";
const ACK_SET: &str = "997";

/// A rendered 997 document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acknowledgment {
    segments: Vec<Segment>,
    separators: Separators,
}

impl Acknowledgment {
    /// Segments in output order (ISA, GS, ST, AK1, AK9, SE, GE, IEA)
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Render as text. Each segment ends with the terminator; segments are
    /// separated by a line feed and the last one has none.
    pub fn render(&self) -> String {
        self.segments
            .iter()
            .map(|segment| segment.render(&self.separators))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Render as bytes ready for upload
    pub fn to_bytes(&self) -> Vec<u8> {
        self.render().into_bytes()
    }

    /// File name under which the acknowledgment of `source_name` is stored
    pub fn file_name_for(source_name: &str) -> String {
        format!("{source_name}.{ACK_FILE_EXTENSION}")
    }
}

/// Builds 997 acknowledgments for a given acknowledging party
#[derive(Debug, Clone)]
pub struct AcknowledgmentBuilder {
    sender_id: String,
    partner_id: String,
    separators: Separators,
}

impl AcknowledgmentBuilder {
    /// Create a builder acknowledging as `sender_id` to the default partner
    pub fn new(sender_id: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            partner_id: DEFAULT_PARTNER_ID.to_string(),
            separators: Separators::default(),
        }
    }

    /// Address acknowledgments to a different trading partner
    pub fn with_partner_id(mut self, partner_id: impl Into<String>) -> Self {
        self.partner_id = partner_id.into();
        self
    }

    /// Build the acknowledgment for `ids`.
    ///
    /// The interchange header carries `now` as its own date and time; every
    /// control number is echoed from the inbound document. Group date and
    /// time are echoed from the inbound GS.
    pub fn build(&self, ids: &EnvelopeIds, now: NaiveDateTime) -> Acknowledgment {
        let interchange_ctrl = ids.interchange.control_number.as_str();
        let group_ctrl = ids.group.control_number.as_str();
        let set_ctrl = ids.transaction_set.control_number.as_str();

        let isa = Segment::new(
            "ISA",
            [
                ISA_AUTHORIZATION_QUALIFIER.to_string(),
                pad_field("", 10),
                ISA_SECURITY_QUALIFIER.to_string(),
                pad_field("", 10),
                ISA_ID_QUALIFIER.to_string(),
                self.sender_id.clone(),
                ISA_ID_QUALIFIER.to_string(),
                pad_field(&self.partner_id, 15),
                now.format("%y%m%d").to_string(),
                now.format("%H%M").to_string(),
                ISA_STANDARDS_ID.to_string(),
                ISA_VERSION.to_string(),
                interchange_ctrl.to_string(),
                ISA_ACK_REQUESTED.to_string(),
                ISA_USAGE_TEST.to_string(),
                self.separators.subelement.to_string(),
            ],
        );

        let gs = Segment::new(
            "GS",
            [
                GS_FUNCTIONAL_ACK,
                self.partner_id.as_str(),
                self.sender_id.as_str(),
                ids.group.date.as_str(),
                ids.group.time.as_str(),
                group_ctrl,
                GS_AGENCY,
                GS_VERSION,
            ],
        );

        let st = Segment::new("ST", [ACK_SET, set_ctrl]);
        let ak1 = Segment::new("AK1", [PURCHASE_ORDER_GROUP, group_ctrl]);
        let ak9 = Segment::new("AK9", ["A", "1", "1", "1"]);
        // ST through SE inclusive
        let se = Segment::new("SE", ["6", set_ctrl]);
        let ge = Segment::new("GE", ["1", group_ctrl]);
        let iea = Segment::new("IEA", ["1", interchange_ctrl]);

        debug!(
            interchange = interchange_ctrl,
            group = group_ctrl,
            transaction_set = set_ctrl,
            "Built 997 acknowledgment"
        );

        Acknowledgment {
            segments: vec![isa, gs, st, ak1, ak9, se, ge, iea],
            separators: self.separators,
        }
    }
}

/// Render the 997 for `ids` as bytes, acknowledging as `sender_id`.
pub fn build(ids: &EnvelopeIds, sender_id: &str, now: NaiveDateTime) -> Vec<u8> {
    AcknowledgmentBuilder::new(sender_id).build(ids, now).to_bytes()
}
