//! X12 envelope extraction (ISA, GS, ST)
//!
//! Only the first interchange header, functional group header and
//! transaction set header of a document are read. Everything after them is
//! ignored, so multi-envelope documents acknowledge their first interchange.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::{debug, trace};

use crate::{Error, Result};

/// Transaction set type accepted for acknowledgment (purchase order)
pub const PURCHASE_ORDER_SET: &str = "850";

/// Functional identifier code of a purchase-order group
pub const PURCHASE_ORDER_GROUP: &str = "PO";

// Segment tags may start the document or follow a terminator plus optional
// line breaks.
static ISA_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    compile(concat!(
        r"(?:^|~)\s*ISA\*00\*[^*~]*\*00\*[^*~]*",
        r"\*ZZ\*([^*~]+)\*ZZ\*([^*~]+)",
        r"\*([0-9]{6})\*([0-9]{4})\*U\*00400\*([0-9]+)\*",
    ))
});

static GS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    compile(concat!(
        r"(?:^|~)\s*GS\*PO\*([^*~]+)\*([^*~]+)",
        r"\*([0-9]{8})\*([0-9]{4})\*([0-9]+)\*X",
    ))
});

static ST_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?:^|~)\s*ST\*850\*([0-9]+)(?:[*~\s]|$)"));

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("envelope patterns are static and valid")
}

/// Interchange header (ISA) values needed for acknowledgment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterchangeEnvelope {
    /// Interchange sender ID (ISA06), padding removed
    pub sender_id: String,
    /// Interchange receiver ID (ISA08), padding removed
    pub receiver_id: String,
    /// Interchange date, YYMMDD
    pub date: String,
    /// Interchange time, HHMM
    pub time: String,
    /// Interchange control number (ISA13), echoed verbatim
    pub control_number: String,
}

/// Functional group header (GS) values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionalGroup {
    /// Application sender code (GS02)
    pub sender_id: String,
    /// Application receiver code (GS03)
    pub receiver_id: String,
    /// Group date, YYYYMMDD
    pub date: String,
    /// Group time, HHMM
    pub time: String,
    /// Group control number (GS06)
    pub control_number: String,
}

/// Transaction set header (ST) values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSet {
    /// Transaction set identifier code, always "850" once extracted
    pub type_code: String,
    /// Transaction set control number (ST02)
    pub control_number: String,
}

/// The three envelope identifiers of an inbound purchase order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeIds {
    pub interchange: InterchangeEnvelope,
    pub group: FunctionalGroup,
    pub transaction_set: TransactionSet,
}

/// Extract the envelope identifiers from a raw X12 document.
///
/// Headers are checked in ISA, GS, ST order and the first failure is
/// returned. Bytes that are not valid UTF-8 are replaced, since the headers
/// themselves are plain ASCII.
pub fn extract(document: &[u8]) -> Result<EnvelopeIds> {
    let decoded = String::from_utf8_lossy(document);
    let text = decoded.strip_prefix('\u{FEFF}').unwrap_or(&*decoded);

    let interchange = parse_isa(text)?;
    let group = parse_gs(text)?;
    let transaction_set = parse_st(text)?;

    debug!(
        interchange = %interchange.control_number,
        group = %group.control_number,
        transaction_set = %transaction_set.control_number,
        "Extracted envelope identifiers"
    );

    Ok(EnvelopeIds {
        interchange,
        group,
        transaction_set,
    })
}

fn parse_isa(text: &str) -> Result<InterchangeEnvelope> {
    let caps = ISA_PATTERN
        .captures(text)
        .ok_or_else(|| Error::InvalidEnvelope(describe_miss(text, "ISA")))?;
    trace!("Matched ISA segment");

    Ok(InterchangeEnvelope {
        sender_id: capture(&caps, 1).trim_end().to_string(),
        receiver_id: capture(&caps, 2).trim_end().to_string(),
        date: capture(&caps, 3).to_string(),
        time: capture(&caps, 4).to_string(),
        control_number: capture(&caps, 5).to_string(),
    })
}

fn parse_gs(text: &str) -> Result<FunctionalGroup> {
    let caps = GS_PATTERN
        .captures(text)
        .ok_or_else(|| Error::InvalidGroup(describe_miss(text, "GS")))?;
    trace!("Matched GS segment");

    Ok(FunctionalGroup {
        sender_id: capture(&caps, 1).trim_end().to_string(),
        receiver_id: capture(&caps, 2).trim_end().to_string(),
        date: capture(&caps, 3).to_string(),
        time: capture(&caps, 4).to_string(),
        control_number: capture(&caps, 5).to_string(),
    })
}

fn parse_st(text: &str) -> Result<TransactionSet> {
    let caps = ST_PATTERN
        .captures(text)
        .ok_or_else(|| Error::InvalidTransactionSet(describe_miss(text, "ST")))?;
    trace!("Matched ST segment");

    Ok(TransactionSet {
        type_code: PURCHASE_ORDER_SET.to_string(),
        control_number: capture(&caps, 1).to_string(),
    })
}

fn capture<'t>(caps: &Captures<'t>, index: usize) -> &'t str {
    caps.get(index).map_or("", |m| m.as_str())
}

/// Distinguish a missing header from one that is present but malformed.
fn describe_miss(text: &str, tag: &str) -> String {
    let present = text
        .split('~')
        .any(|segment| segment.trim_start().starts_with(&format!("{tag}*")));

    match (present, tag) {
        (false, _) => format!("{tag} header not found"),
        (true, "ISA") => "expected sender, receiver, 6-digit date, 4-digit time and numeric \
                          control number"
            .to_string(),
        (true, "GS") => format!(
            "expected {PURCHASE_ORDER_GROUP} group with sender, receiver, 8-digit date, \
             4-digit time and numeric control number"
        ),
        (true, _) => format!(
            "expected transaction set {PURCHASE_ORDER_SET} with a numeric control number"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PURCHASE_ORDER: &str = "ISA*00*          *00*          *ZZ*AMAZON         *ZZ*VENDOR123      *240315*1022*U*00400*900000014*0*P*>~\n\
        GS*PO*AMAZON*VENDOR123*20240315*1022*900000014*X*004010~\n\
        ST*850*0001~\n\
        BEG*00*NE*PO12345**20240315~\n\
        SE*3*0001~\n\
        GE*1*900000014~\n\
        IEA*1*900000014~";

    #[test]
    fn test_extract_after_byte_order_mark() {
        let with_bom = format!("\u{FEFF}{PURCHASE_ORDER}");
        let ids = extract(with_bom.as_bytes()).unwrap();

        assert_eq!(ids.interchange.control_number, "900000014");
        assert_eq!(ids.group.control_number, "900000014");
        assert_eq!(ids.transaction_set.control_number, "0001");
    }

    #[test]
    fn test_extract_purchase_order() {
        let ids = extract(PURCHASE_ORDER.as_bytes()).unwrap();

        assert_eq!(ids.interchange.sender_id, "AMAZON");
        assert_eq!(ids.interchange.receiver_id, "VENDOR123");
        assert_eq!(ids.interchange.date, "240315");
        assert_eq!(ids.interchange.time, "1022");
        assert_eq!(ids.interchange.control_number, "900000014");

        assert_eq!(ids.group.sender_id, "AMAZON");
        assert_eq!(ids.group.receiver_id, "VENDOR123");
        assert_eq!(ids.group.date, "20240315");
        assert_eq!(ids.group.time, "1022");
        assert_eq!(ids.group.control_number, "900000014");

        assert_eq!(ids.transaction_set.type_code, "850");
        assert_eq!(ids.transaction_set.control_number, "0001");
    }

    #[test]
    fn test_extract_is_deterministic() {
        let first = extract(PURCHASE_ORDER.as_bytes()).unwrap();
        let second = extract(PURCHASE_ORDER.as_bytes()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_extract_single_line_document() {
        let doc = PURCHASE_ORDER.replace('\n', "");
        let ids = extract(doc.as_bytes()).unwrap();
        assert_eq!(ids.transaction_set.control_number, "0001");
    }

    #[test]
    fn test_missing_isa() {
        let doc = "GS*PO*A*B*20240315*1022*1*X*004010~ST*850*0001~";
        let err = extract(doc.as_bytes()).unwrap_err();
        assert_eq!(err, Error::InvalidEnvelope("ISA header not found".to_string()));
    }

    #[test]
    fn test_isa_with_short_date() {
        let doc = PURCHASE_ORDER.replace("*240315*", "*24031*");
        let err = extract(doc.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::InvalidEnvelope(msg) if msg.contains("6-digit date")));
    }

    #[test]
    fn test_isa_with_non_numeric_control_number() {
        let doc = PURCHASE_ORDER.replace("*00400*900000014*", "*00400*ABC*");
        assert!(matches!(
            extract(doc.as_bytes()),
            Err(Error::InvalidEnvelope(_))
        ));
    }

    #[test]
    fn test_gs_with_wrong_functional_code() {
        let doc = PURCHASE_ORDER.replace("GS*PO*", "GS*IN*");
        let err = extract(doc.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::InvalidGroup(msg) if msg.contains("PO group")));
    }

    #[test]
    fn test_gs_with_six_digit_date() {
        let doc = PURCHASE_ORDER.replace("*20240315*1022*", "*240315*1022*");
        assert!(matches!(extract(doc.as_bytes()), Err(Error::InvalidGroup(_))));
    }

    #[test]
    fn test_wrong_transaction_set_type() {
        let doc = PURCHASE_ORDER.replace("ST*850*", "ST*810*");
        let err = extract(doc.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::InvalidTransactionSet(msg) if msg.contains("850")));
    }

    #[test]
    fn test_transaction_set_without_control_number() {
        let doc = PURCHASE_ORDER.replace("ST*850*0001~", "ST*850*~");
        let err = extract(doc.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::InvalidTransactionSet(msg) if msg.contains("850")));
    }

    #[test]
    fn test_isa_checked_before_gs_and_st() {
        let err = extract(b"not an edi document").unwrap_err();
        assert!(matches!(err, Error::InvalidEnvelope(_)));
    }

    #[test]
    fn test_first_interchange_wins() {
        let second = PURCHASE_ORDER
            .replace("900000014", "900000099")
            .replace("0001", "0002");
        let doc = format!("{PURCHASE_ORDER}\n{second}");

        let ids = extract(doc.as_bytes()).unwrap();
        assert_eq!(ids.interchange.control_number, "900000014");
        assert_eq!(ids.group.control_number, "900000014");
        assert_eq!(ids.transaction_set.control_number, "0001");
    }

    #[test]
    fn test_tag_inside_element_is_not_a_header() {
        let doc = PURCHASE_ORDER.replace("ST*850*0001~", "REF*XST*850*0001~");
        let err = extract(doc.as_bytes()).unwrap_err();
        assert_eq!(
            err,
            Error::InvalidTransactionSet("ST header not found".to_string())
        );
    }

    #[test]
    fn test_non_utf8_payload_is_tolerated() {
        let mut doc = PURCHASE_ORDER.as_bytes().to_vec();
        doc.extend_from_slice(&[0xff, 0xfe, b'~']);
        assert!(extract(&doc).is_ok());
    }
}
