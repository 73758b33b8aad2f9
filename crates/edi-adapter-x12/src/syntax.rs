//! X12 delimiters and segment rendering
//!
//! Inbound documents and generated acknowledgments use the conventional
//! `*` element separator, `~` segment terminator and `>` sub-element
//! separator.

/// Default X12 separators
pub const DEFAULT_ELEMENT_SEPARATOR: char = '*';
pub const DEFAULT_SEGMENT_TERMINATOR: char = '~';
pub const DEFAULT_SUBELEMENT_SEPARATOR: char = '>';

/// Separators used when rendering X12 segments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Separators {
    /// Element separator (default '*')
    pub element: char,
    /// Segment terminator (default '~')
    pub segment: char,
    /// Sub-element separator (default '>'), carried in ISA16
    pub subelement: char,
}

impl Default for Separators {
    fn default() -> Self {
        Self {
            element: DEFAULT_ELEMENT_SEPARATOR,
            segment: DEFAULT_SEGMENT_TERMINATOR,
            subelement: DEFAULT_SUBELEMENT_SEPARATOR,
        }
    }
}

/// A segment ready to be rendered: tag plus positional elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Segment tag (e.g. "ISA", "GS", "AK1")
    pub tag: &'static str,
    /// Data elements in positional order
    pub elements: Vec<String>,
}

impl Segment {
    /// Create a segment from a tag and its elements
    pub fn new<I, S>(tag: &'static str, elements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tag,
            elements: elements.into_iter().map(Into::into).collect(),
        }
    }

    /// Render the segment including its terminator
    pub fn render(&self, separators: &Separators) -> String {
        let mut out = String::from(self.tag);
        for element in &self.elements {
            out.push(separators.element);
            out.push_str(element);
        }
        out.push(separators.segment);
        out
    }
}

/// Left-justify `value` in a field of `width` characters, as ISA requires
/// for its fixed-width identifiers. Longer values are kept intact.
pub fn pad_field(value: &str, width: usize) -> String {
    format!("{value:<width$}")
}
